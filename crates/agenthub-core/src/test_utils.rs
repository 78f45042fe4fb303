//! Test utilities for agenthub-core
//!
//! [`ScriptedBackend`] replays canned response bodies per agent so the
//! workspace can be exercised without a server.

use async_trait::async_trait;
use serde_json::json;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::{Mutex, Notify};
use tokio_util::bytes::Bytes;
use tokio_util::sync::CancellationToken;

use crate::api::backend::{ChatBackend, ChatRequest};
use crate::api::error::ApiError;
use crate::api::sse::{ByteStream, DATA_PREFIX};
use crate::catalog::{Agent, AgentId, AgentStatus};

pub enum ScriptStep {
    /// Raw bytes of the response body.
    Chunk(Bytes),
    /// Read error surfaced by the body.
    Fail(String),
    /// Body stalls until the notify is signalled.
    WaitFor(Arc<Notify>),
    /// Response headers are withheld until the notify is signalled. Only
    /// meaningful as the first step.
    HoldHeaders(Arc<Notify>),
    /// Body never yields again.
    Hang,
}

pub fn data_line(payload: &serde_json::Value) -> ScriptStep {
    ScriptStep::Chunk(Bytes::from(format!("{DATA_PREFIX}{payload}\n")))
}

pub fn delta(text: &str) -> ScriptStep {
    data_line(&json!({ "content": text }))
}

pub fn done() -> ScriptStep {
    data_line(&json!({ "done": true }))
}

pub fn error(message: &str) -> ScriptStep {
    data_line(&json!({ "error": message }))
}

pub fn raw(text: &str) -> ScriptStep {
    ScriptStep::Chunk(Bytes::from(text.to_string()))
}

pub fn test_agent(id: &str, status: AgentStatus) -> Agent {
    Agent {
        id: AgentId::from(id),
        display_name: format!("{id} agent"),
        color: "#6366f1".to_string(),
        icon: String::new(),
        model: "test-model".to_string(),
        status,
        group: "Test".to_string(),
    }
}

#[derive(Default)]
pub struct ScriptedBackend {
    scripts: Mutex<HashMap<AgentId, VecDeque<Vec<ScriptStep>>>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues one response body for `agent`. Each request consumes one.
    pub fn with_script(mut self, agent: &str, steps: Vec<ScriptStep>) -> Self {
        self.scripts
            .get_mut()
            .entry(AgentId::from(agent))
            .or_default()
            .push_back(steps);
        self
    }

    pub async fn push_script(&self, agent: &str, steps: Vec<ScriptStep>) {
        self.scripts
            .lock()
            .await
            .entry(AgentId::from(agent))
            .or_default()
            .push_back(steps);
    }

    pub async fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().await.clone()
    }
}

#[async_trait]
impl ChatBackend for ScriptedBackend {
    async fn stream_chat(
        &self,
        request: ChatRequest,
        token: CancellationToken,
    ) -> Result<ByteStream, ApiError> {
        let script = self
            .scripts
            .lock()
            .await
            .get_mut(&request.agent_id)
            .and_then(VecDeque::pop_front);
        let agent_id = request.agent_id.clone();
        self.requests.lock().await.push(request);

        let Some(mut steps) = script else {
            return Err(ApiError::InvalidRequest {
                status_code: 404,
                details: format!("no scripted response for {agent_id}"),
            });
        };

        if let Some(ScriptStep::HoldHeaders(_)) = steps.first()
            && let ScriptStep::HoldHeaders(gate) = steps.remove(0)
        {
            tokio::select! {
                biased;
                () = token.cancelled() => return Err(ApiError::Cancelled),
                () = gate.notified() => {}
            }
        }

        let body = futures::stream::unfold(steps.into_iter(), |mut steps| async move {
            loop {
                let Some(step) = steps.next() else {
                    return None;
                };
                match step {
                    ScriptStep::Chunk(bytes) => return Some((Ok(bytes), steps)),
                    ScriptStep::Fail(message) => {
                        return Some((Err(std::io::Error::other(message)), steps));
                    }
                    ScriptStep::WaitFor(gate) | ScriptStep::HoldHeaders(gate) => {
                        gate.notified().await;
                    }
                    ScriptStep::Hang => std::future::pending::<()>().await,
                }
            }
        });

        Ok(Box::pin(body))
    }
}
