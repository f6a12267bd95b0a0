pub mod error;
pub mod history;
pub mod media;
pub mod normalize;
pub mod reply;

pub use error::{ErrorKind, TransferError, TransferOutcome};
pub use history::{HistoryLog, HistoryRecord};
pub use media::{
    Credentials, MediaKind, Operation, TransferPath, TransferPlan, TransferRequest,
    DEFAULT_API_ROOT,
};
pub use normalize::{normalize, TransferLink, PLATFORM_LINK_HOST};
pub use reply::{Chat, FileRef, MessageMedia, PhotoSize, PlatformReply, SentMessage};
