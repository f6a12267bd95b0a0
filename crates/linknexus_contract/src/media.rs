use std::fmt;
use std::str::FromStr;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

pub const DEFAULT_API_ROOT: &str = "https://api.telegram.org";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Video,
    Audio,
    Image,
}

impl MediaKind {
    /// Classifies a MIME type by its top-level type. Anything that is not
    /// audio or image is sent as video.
    pub fn from_mime(mime_type: &str) -> Self {
        match mime_type.parse::<mime::Mime>() {
            Ok(parsed) if parsed.type_() == mime::AUDIO => MediaKind::Audio,
            Ok(parsed) if parsed.type_() == mime::IMAGE => MediaKind::Image,
            _ => MediaKind::Video,
        }
    }

    pub fn type_tag(self) -> &'static str {
        match self {
            MediaKind::Video => "video",
            MediaKind::Audio => "audio",
            MediaKind::Image => "image",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_tag())
    }
}

impl FromStr for MediaKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "video" => Ok(MediaKind::Video),
            "audio" => Ok(MediaKind::Audio),
            "image" | "photo" => Ok(MediaKind::Image),
            other => Err(format!("unknown media type tag '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Operation {
    SendVideo,
    SendAudio,
    SendPhoto,
}

impl Operation {
    pub fn method_name(self) -> &'static str {
        match self {
            Operation::SendVideo => "sendVideo",
            Operation::SendAudio => "sendAudio",
            Operation::SendPhoto => "sendPhoto",
        }
    }

    pub fn field_name(self) -> &'static str {
        match self {
            Operation::SendVideo => "video",
            Operation::SendAudio => "audio",
            Operation::SendPhoto => "photo",
        }
    }

    pub fn type_tag(self) -> &'static str {
        match self {
            Operation::SendVideo => "video",
            Operation::SendAudio => "audio",
            Operation::SendPhoto => "image",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TransferPath {
    Direct,
    Relayed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferPlan {
    pub path: TransferPath,
    pub operation: Operation,
}

/// Credentials from the local configuration record. There is no mode flag:
/// the transfer path is derived from which fields are present.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Credentials {
    #[serde(default, alias = "botToken")]
    pub bot_token: Option<String>,
    #[serde(default, alias = "chatId")]
    pub chat_id: Option<String>,
    #[serde(default, alias = "apiRoot")]
    pub api_root: Option<String>,
}

impl Credentials {
    pub fn new(bot_token: impl Into<String>, chat_id: impl Into<String>) -> Self {
        Self {
            bot_token: Some(bot_token.into()),
            chat_id: Some(chat_id.into()),
            api_root: None,
        }
    }

    pub fn with_api_root(mut self, api_root: impl Into<String>) -> Self {
        self.api_root = Some(api_root.into());
        self
    }

    /// Returns the bot token and chat id only when both are non-blank.
    pub fn direct_pair(&self) -> Option<(&str, &str)> {
        let token = non_blank(self.bot_token.as_deref())?;
        let chat = non_blank(self.chat_id.as_deref())?;
        Some((token, chat))
    }

    pub fn api_root(&self) -> &str {
        non_blank(self.api_root.as_deref())
            .map(|root| root.trim_end_matches('/'))
            .unwrap_or(DEFAULT_API_ROOT)
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|inner| !inner.is_empty())
}

#[derive(Debug, Clone)]
pub struct TransferRequest {
    pub file_name: String,
    pub file_bytes: Bytes,
    pub file_size_bytes: u64,
    pub media_kind: MediaKind,
    pub caption: String,
    pub credentials: Credentials,
}

impl TransferRequest {
    pub fn new(
        file_name: impl Into<String>,
        file_bytes: impl Into<Bytes>,
        media_kind: MediaKind,
        caption: impl Into<String>,
        credentials: Credentials,
    ) -> Self {
        let file_bytes = file_bytes.into();
        Self {
            file_name: file_name.into(),
            file_size_bytes: file_bytes.len() as u64,
            file_bytes,
            media_kind,
            caption: caption.into(),
            credentials,
        }
    }
}
