//! HTTP API for ladle-ri

mod health;
mod import;
mod sse;

pub use health::health;
pub use import::submit_import;
pub use sse::import_event_stream;
