use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::api::error::ApiError;
use crate::api::sse::ByteStream;
use crate::catalog::AgentId;
use crate::message_store::Message;

/// Body of `POST /api/chat`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub agent_id: AgentId,
    pub messages: Vec<Message>,
}

/// Source of streamed chat responses.
///
/// Implementations return once response headers are available; the body is
/// handed back undecoded so the caller owns framing and cancellation of the
/// read loop.
#[async_trait]
pub trait ChatBackend: Send + Sync + 'static {
    async fn stream_chat(
        &self,
        request: ChatRequest,
        token: CancellationToken,
    ) -> Result<ByteStream, ApiError>;
}
