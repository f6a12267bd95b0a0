use serde::{Deserialize, Serialize};

use crate::reply::{MessageMedia, SentMessage};

pub const PLATFORM_LINK_HOST: &str = "t.me";

/// Prefix the platform puts in front of supergroup and channel ids.
const SUPERGROUP_PREFIX: &str = "-100";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TransferLink {
    pub link: String,
    pub file_id: String,
}

pub fn normalize(message: &SentMessage) -> TransferLink {
    TransferLink {
        link: message_link(message),
        file_id: file_id(&message.media),
    }
}

fn message_link(message: &SentMessage) -> String {
    match message.chat.public_handle() {
        Some(username) => format!(
            "https://{PLATFORM_LINK_HOST}/{username}/{}",
            message.message_id
        ),
        None => {
            let raw_id = message.chat.id.to_string();
            let stripped = raw_id.strip_prefix(SUPERGROUP_PREFIX).unwrap_or(&raw_id);
            format!(
                "https://{PLATFORM_LINK_HOST}/c/{stripped}/{}",
                message.message_id
            )
        }
    }
}

fn file_id(media: &MessageMedia) -> String {
    match media {
        MessageMedia::Video(file) | MessageMedia::Audio(file) | MessageMedia::Document(file) => {
            file.file_id.clone()
        }
        MessageMedia::Photo(sizes) => sizes
            .last()
            .map(|largest| largest.file_id.clone())
            .unwrap_or_default(),
        MessageMedia::None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::normalize;
    use crate::reply::{PlatformReply, SentMessage};
    use serde_json::{json, Value};

    fn message(result: Value) -> SentMessage {
        let reply: PlatformReply =
            serde_json::from_value(json!({ "ok": true, "result": result })).expect("parse reply");
        reply.result.expect("result present")
    }

    #[test]
    fn public_chat_links_by_username() {
        let normalized = normalize(&message(json!({
            "message_id": 42,
            "chat": { "id": -1009876543210_i64, "username": "alice" },
            "video": { "file_id": "VID" }
        })));

        assert!(normalized.link.ends_with("/alice/42"));
        assert_eq!(normalized.link, "https://t.me/alice/42");
        assert_eq!(normalized.file_id, "VID");
    }

    #[test]
    fn private_supergroup_strips_prefix() {
        let normalized = normalize(&message(json!({
            "message_id": 7,
            "chat": { "id": -1001234567890_i64 },
            "audio": { "file_id": "AUD" }
        })));

        assert!(normalized.link.contains("/c/1234567890/7"));
        assert_eq!(normalized.file_id, "AUD");
    }

    #[test]
    fn empty_username_counts_as_private() {
        let normalized = normalize(&message(json!({
            "message_id": 3,
            "chat": { "id": -1005, "username": "" },
            "document": { "file_id": "DOC" }
        })));

        assert_eq!(normalized.link, "https://t.me/c/5/3");
        assert_eq!(normalized.file_id, "DOC");
    }

    #[test]
    fn plain_group_id_keeps_its_sign() {
        let normalized = normalize(&message(json!({
            "message_id": 11,
            "chat": { "id": -4242 },
        })));

        assert_eq!(normalized.link, "https://t.me/c/-4242/11");
    }

    #[test]
    fn photo_uses_largest_variant() {
        let normalized = normalize(&message(json!({
            "message_id": 5,
            "chat": { "id": 100, "username": "gallery" },
            "photo": [
                { "file_id": "small", "width": 90, "height": 60 },
                { "file_id": "medium", "width": 320, "height": 240 },
                { "file_id": "large", "width": 1280, "height": 960 }
            ]
        })));

        assert_eq!(normalized.file_id, "large");
    }

    #[test]
    fn video_wins_over_document_thumbnail_shapes() {
        let normalized = normalize(&message(json!({
            "message_id": 8,
            "chat": { "id": 1, "username": "clips" },
            "document": { "file_id": "DOC" },
            "video": { "file_id": "VID" }
        })));

        assert_eq!(normalized.file_id, "VID");
    }

    #[test]
    fn missing_media_yields_empty_file_id_and_usable_link() {
        let normalized = normalize(&message(json!({
            "message_id": 12,
            "chat": { "id": -1007, "username": "notes" }
        })));

        assert_eq!(normalized.file_id, "");
        assert_eq!(normalized.link, "https://t.me/notes/12");
    }
}
