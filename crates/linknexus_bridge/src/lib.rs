pub mod http;
pub mod memory;
pub mod transport;

pub use http::HttpUploadTransport;
pub use memory::{InMemoryUploadTransport, RecordedUpload};
pub use transport::{
    ByteProgress, FilePart, TransportError, TransportReply, UploadForm, UploadTransport,
};
