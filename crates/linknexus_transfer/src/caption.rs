use crate::describe::MediaMetadata;

pub const CAPTION_LIMIT: usize = 1024;

pub fn compose_caption(file_name: &str, size_bytes: u64, metadata: Option<&MediaMetadata>) -> String {
    let footer = format!(
        "Filename: `{}`\nSize: `{:.2}MB`",
        file_name.replace('`', "'"),
        size_bytes as f64 / 1024.0 / 1024.0
    );

    let caption = match metadata {
        Some(meta) => {
            let hashtags = meta
                .tags
                .iter()
                .map(|tag| tag.trim().trim_start_matches('#').replace(char::is_whitespace, ""))
                .filter(|tag| !tag.is_empty())
                .map(|tag| format!("#{tag}"))
                .collect::<Vec<_>>()
                .join(" ");

            let mut header = format!("*{}*", meta.title.replace('*', ""));
            if !meta.description.trim().is_empty() {
                header.push('\n');
                header.push_str(meta.description.trim());
            }
            if !hashtags.is_empty() {
                header.push('\n');
                header.push_str(&hashtags);
            }
            format!("{header}\n\n{footer}")
        }
        None => footer,
    };

    truncate_chars(caption, CAPTION_LIMIT)
}

fn truncate_chars(text: String, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((cut, _)) => text[..cut].to_string(),
        None => text,
    }
}
