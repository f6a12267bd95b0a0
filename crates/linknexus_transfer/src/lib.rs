pub mod caption;
pub mod describe;
pub mod direct;
pub mod dispatcher;
pub mod history;
pub mod progress;
pub mod relayed;
pub mod selector;

pub use caption::compose_caption;
pub use describe::{ContentDescriber, DescribeError, GeminiDescriber, MediaMetadata};
pub use direct::{DirectExecutor, OFFICIAL_API_LIMIT_BYTES, SELF_HOSTED_LIMIT_BYTES};
pub use dispatcher::{Dispatcher, MAX_TRANSFER_BYTES};
pub use history::HttpHistoryLog;
pub use progress::ProgressReporter;
pub use relayed::{RelayedExecutor, DEFAULT_RELAY_LIMIT_BYTES, RELAY_MILESTONES, RELAY_UPLOAD_PATH};
pub use selector::{operation_for, select, transfer_path};

pub fn guess_mime(file_name: &str) -> Option<String> {
    mime_guess::from_path(file_name)
        .first()
        .map(|guessed| guessed.essence_str().to_string())
}
