pub mod backend;
pub mod client;
pub mod error;
pub mod sse;

pub use backend::{ChatBackend, ChatRequest};
pub use client::HubClient;
pub use error::{ApiError, StreamError};
pub use sse::{ByteStream, DATA_PREFIX, DataLineStream, data_lines};
