use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct PlatformReply {
    pub ok: bool,
    #[serde(default)]
    pub result: Option<SentMessage>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub error_code: Option<i64>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Chat {
    pub id: i64,
    #[serde(default)]
    pub username: Option<String>,
}

impl Chat {
    /// Public handle of the chat, when it has a non-empty one.
    pub fn public_handle(&self) -> Option<&str> {
        self.username.as_deref().filter(|name| !name.is_empty())
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct FileRef {
    pub file_id: String,
    #[serde(default)]
    pub file_unique_id: Option<String>,
    #[serde(default)]
    pub file_size: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct PhotoSize {
    pub file_id: String,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub file_size: Option<u64>,
}

/// The stored media attached to a sent message. The platform fills a
/// different field depending on the method and on how it re-classified the
/// upload; at most one shape is kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageMedia {
    Video(FileRef),
    Audio(FileRef),
    Document(FileRef),
    /// Size variants in ascending order, largest last.
    Photo(Vec<PhotoSize>),
    None,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(from = "RawSentMessage")]
pub struct SentMessage {
    pub message_id: i64,
    pub chat: Chat,
    pub media: MessageMedia,
}

#[derive(Debug, Deserialize)]
struct RawSentMessage {
    message_id: i64,
    chat: Chat,
    #[serde(default)]
    video: Option<FileRef>,
    #[serde(default)]
    audio: Option<FileRef>,
    #[serde(default)]
    document: Option<FileRef>,
    #[serde(default)]
    photo: Option<Vec<PhotoSize>>,
}

impl From<RawSentMessage> for SentMessage {
    fn from(raw: RawSentMessage) -> Self {
        let media = match (raw.video, raw.audio, raw.document, raw.photo) {
            (Some(video), _, _, _) => MessageMedia::Video(video),
            (None, Some(audio), _, _) => MessageMedia::Audio(audio),
            (None, None, Some(document), _) => MessageMedia::Document(document),
            (None, None, None, Some(sizes)) if !sizes.is_empty() => MessageMedia::Photo(sizes),
            (None, None, None, _) => MessageMedia::None,
        };

        Self {
            message_id: raw.message_id,
            chat: raw.chat,
            media,
        }
    }
}
