//! Consumption of streamed chat responses.
//!
//! A [`StreamConsumer`] reads `data: ` payloads, yields content deltas in
//! arrival order and ends with exactly one terminal step. Payloads that are
//! not valid JSON, or carry none of the known fields, are skipped: keep-alive
//! noise on the wire must not end a healthy stream.

use futures_util::StreamExt;
use serde::Deserialize;
use std::fmt;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::api::sse::DataLineStream;
use crate::catalog::AgentId;
use crate::error::{Error, Result};

/// Monotonic identifier of one send. Later sends always compare greater.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionToken(pub u64);

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    Delta(String),
    Done,
    Error(String),
}

#[derive(Debug, Deserialize)]
struct StreamRecord {
    content: Option<String>,
    done: Option<bool>,
    error: Option<String>,
}

/// Decodes one payload. `None` means the record should be skipped.
pub fn parse_record(payload: &str) -> Option<StreamEvent> {
    let record: StreamRecord = serde_json::from_str(payload).ok()?;
    if let Some(content) = record.content {
        Some(StreamEvent::Delta(content))
    } else if record.done == Some(true) {
        Some(StreamEvent::Done)
    } else {
        record.error.map(StreamEvent::Error)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamFailure {
    /// The backend sent an `error` record.
    Remote(String),
    /// The connection failed or closed before a terminal record.
    Transport(String),
}

impl fmt::Display for StreamFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamFailure::Remote(message) => f.write_str(message),
            StreamFailure::Transport(details) => write!(f, "transport error: {details}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamOutcome {
    Done,
    Failed(StreamFailure),
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsumerStep {
    Delta(String),
    Settled(StreamOutcome),
}

pub struct StreamConsumer {
    lines: Option<DataLineStream>,
    cancel: CancellationToken,
}

impl StreamConsumer {
    pub fn new(lines: DataLineStream, cancel: CancellationToken) -> Self {
        Self {
            lines: Some(lines),
            cancel,
        }
    }

    pub fn is_settled(&self) -> bool {
        self.lines.is_none()
    }

    /// Next delta, or the terminal step. Returns `None` once settled.
    pub async fn next(&mut self) -> Option<ConsumerStep> {
        loop {
            let lines = self.lines.as_mut()?;
            let read = tokio::select! {
                biased;
                () = self.cancel.cancelled() => None,
                line = lines.next() => Some(line),
            };
            let Some(line) = read else {
                return Some(self.settle(StreamOutcome::Cancelled));
            };

            let payload = match line {
                Some(Ok(payload)) => payload,
                Some(Err(e)) => {
                    return Some(self.settle(StreamOutcome::Failed(StreamFailure::Transport(
                        e.to_string(),
                    ))));
                }
                None => {
                    return Some(self.settle(StreamOutcome::Failed(StreamFailure::Transport(
                        "stream closed before completion".to_string(),
                    ))));
                }
            };

            match parse_record(&payload) {
                Some(StreamEvent::Delta(text)) => return Some(ConsumerStep::Delta(text)),
                Some(StreamEvent::Done) => return Some(self.settle(StreamOutcome::Done)),
                Some(StreamEvent::Error(message)) => {
                    return Some(self.settle(StreamOutcome::Failed(StreamFailure::Remote(
                        message,
                    ))));
                }
                None => {
                    debug!(payload = %payload, "Skipping unrecognised stream record");
                }
            }
        }
    }

    /// Drives the stream to its end, handing each delta to `on_delta`.
    pub async fn run<F>(mut self, mut on_delta: F) -> StreamOutcome
    where
        F: FnMut(&str),
    {
        while let Some(step) = self.next().await {
            match step {
                ConsumerStep::Delta(text) => on_delta(&text),
                ConsumerStep::Settled(outcome) => return outcome,
            }
        }
        // `next` only returns `None` after a settled step was produced.
        StreamOutcome::Cancelled
    }

    fn settle(&mut self, outcome: StreamOutcome) -> ConsumerStep {
        // Dropping the line stream stops further reads from the body.
        self.lines = None;
        ConsumerStep::Settled(outcome)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Active,
    Done,
    Errored(StreamFailure),
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SessionState::Active)
    }
}

/// One in-flight (or settled) request for an agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamSession {
    agent_id: AgentId,
    token: SessionToken,
    accumulated: String,
    state: SessionState,
}

impl StreamSession {
    pub fn new(agent_id: AgentId, token: SessionToken) -> Self {
        Self {
            agent_id,
            token,
            accumulated: String::new(),
            state: SessionState::Active,
        }
    }

    pub fn agent_id(&self) -> &AgentId {
        &self.agent_id
    }

    pub fn token(&self) -> SessionToken {
        self.token
    }

    pub fn accumulated(&self) -> &str {
        &self.accumulated
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn apply_delta(&mut self, fragment: &str) -> Result<()> {
        self.ensure_active()?;
        self.accumulated.push_str(fragment);
        Ok(())
    }

    /// Moves to `Done` or `Errored`. Cancellation has no terminal state; a
    /// cancelled session is simply released.
    pub fn settle(&mut self, outcome: &StreamOutcome) -> Result<()> {
        self.ensure_active()?;
        self.state = match outcome {
            StreamOutcome::Done => SessionState::Done,
            StreamOutcome::Failed(failure) => SessionState::Errored(failure.clone()),
            StreamOutcome::Cancelled => {
                return Err(Error::InvalidState(format!(
                    "session {} was cancelled, not settled",
                    self.token
                )));
            }
        };
        Ok(())
    }

    fn ensure_active(&self) -> Result<()> {
        if self.state.is_terminal() {
            return Err(Error::InvalidState(format!(
                "session {} for {} already settled",
                self.token, self.agent_id
            )));
        }
        Ok(())
    }
}
