pub mod app;

pub use app::{build_router, AppState, RelayLimits, DEFAULT_HISTORY_LIMIT};
