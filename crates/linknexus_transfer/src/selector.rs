use linknexus_contract::{Credentials, MediaKind, Operation, TransferPath, TransferPlan};

/// Decides the transfer path and the platform operation for a request.
/// The path is derived from the credentials every time; it is never stored.
pub fn select(credentials: &Credentials, media_kind: MediaKind) -> TransferPlan {
    TransferPlan {
        path: transfer_path(credentials),
        operation: operation_for(media_kind),
    }
}

pub fn transfer_path(credentials: &Credentials) -> TransferPath {
    match credentials.direct_pair() {
        Some(_) => TransferPath::Direct,
        None => TransferPath::Relayed,
    }
}

pub fn operation_for(media_kind: MediaKind) -> Operation {
    match media_kind {
        MediaKind::Video => Operation::SendVideo,
        MediaKind::Audio => Operation::SendAudio,
        MediaKind::Image => Operation::SendPhoto,
    }
}

#[cfg(test)]
mod tests {
    use super::select;
    use linknexus_contract::{Credentials, MediaKind, Operation, TransferPath};

    fn credentials(token: Option<&str>, chat: Option<&str>) -> Credentials {
        Credentials {
            bot_token: token.map(str::to_string),
            chat_id: chat.map(str::to_string),
            api_root: None,
        }
    }

    #[test]
    fn both_fields_present_selects_direct() {
        let plan = select(&credentials(Some("123:abc"), Some("-10042")), MediaKind::Video);
        assert_eq!(plan.path, TransferPath::Direct);
    }

    #[test]
    fn any_missing_or_blank_field_selects_relayed() {
        let cases = [
            credentials(None, None),
            credentials(Some("123:abc"), None),
            credentials(None, Some("-10042")),
            credentials(Some(""), Some("-10042")),
            credentials(Some("123:abc"), Some("")),
            credentials(Some("  "), Some("\t")),
        ];

        for case in cases {
            assert_eq!(
                select(&case, MediaKind::Audio).path,
                TransferPath::Relayed,
                "{case:?}"
            );
        }
    }

    #[test]
    fn api_root_alone_does_not_enable_direct() {
        let mut with_root = credentials(None, None);
        with_root.api_root = Some("http://127.0.0.1:8081".to_string());
        assert_eq!(select(&with_root, MediaKind::Image).path, TransferPath::Relayed);
    }

    #[test]
    fn operation_follows_media_kind_on_both_paths() {
        let table = [
            (MediaKind::Video, Operation::SendVideo),
            (MediaKind::Audio, Operation::SendAudio),
            (MediaKind::Image, Operation::SendPhoto),
        ];

        for creds in [credentials(Some("t"), Some("c")), credentials(None, None)] {
            for (kind, expected) in table {
                assert_eq!(select(&creds, kind).operation, expected);
            }
        }
    }
}
