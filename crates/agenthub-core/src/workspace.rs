//! Multi-agent workspace controller.
//!
//! A [`Workspace`] owns the per-agent histories, the pane layout, the agent
//! catalog and at most one active stream per agent. Each send runs on its own
//! task; every mutation that task makes is checked against the session token
//! it was started with, so a cancelled or superseded stream can never write
//! into a history again.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{Mutex, broadcast};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::api::backend::{ChatBackend, ChatRequest};
use crate::api::error::ApiError;
use crate::api::sse::data_lines;
use crate::catalog::{Agent, AgentCatalog, AgentId, AgentStatus};
use crate::error::{Error, Result};
use crate::message_store::{AssistantHandle, Message, MessageStore, Role};
use crate::panes::{GridShape, LayoutMode, PaneLayout};
use crate::stream::{
    ConsumerStep, SessionToken, StreamConsumer, StreamFailure, StreamOutcome, StreamSession,
};

const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Notifications for observers of a workspace. Lagging receivers lose
/// events, never state: the workspace itself is always authoritative.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkspaceEvent {
    AgentsLoaded { count: usize },
    PanesChanged(PaneLayout),
    MessageAppended { agent_id: AgentId, role: Role },
    DeltaApplied {
        agent_id: AgentId,
        token: SessionToken,
        fragment: String,
    },
    StreamSettled {
        agent_id: AgentId,
        token: SessionToken,
        outcome: StreamOutcome,
    },
}

/// Returned by [`Workspace::send_message`] once the request is underway.
#[derive(Debug)]
pub struct SendReceipt {
    agent_id: AgentId,
    token: SessionToken,
    task: JoinHandle<StreamOutcome>,
}

impl SendReceipt {
    pub fn agent_id(&self) -> &AgentId {
        &self.agent_id
    }

    pub fn token(&self) -> SessionToken {
        self.token
    }

    /// Waits for the stream to settle. A stream that was cancelled, or whose
    /// result arrived after it had been released, reports `Cancelled`.
    pub async fn wait(self) -> Result<StreamOutcome> {
        let agent_id = self.agent_id;
        self.task
            .await
            .map_err(|e| Error::InvalidState(format!("stream task for {agent_id} failed: {e}")))
    }
}

struct ActiveSession {
    session: StreamSession,
    handle: AssistantHandle,
    cancel: CancellationToken,
}

#[derive(Default)]
struct WorkspaceState {
    catalog: AgentCatalog,
    store: MessageStore,
    panes: PaneLayout,
    active: HashMap<AgentId, ActiveSession>,
    /// Last session per agent that reached `Done` or `Errored`.
    settled: HashMap<AgentId, StreamSession>,
}

impl WorkspaceState {
    fn ensure_known(&self, agent_id: &AgentId) -> Result<()> {
        // An empty catalog means agents were never loaded; accept any id.
        if !self.catalog.is_empty() && !self.catalog.contains(agent_id) {
            return Err(Error::UnknownAgent(agent_id.clone()));
        }
        Ok(())
    }
}

struct Inner {
    backend: Arc<dyn ChatBackend>,
    state: Mutex<WorkspaceState>,
    events: broadcast::Sender<WorkspaceEvent>,
    next_token: AtomicU64,
}

impl Inner {
    fn emit(&self, event: WorkspaceEvent) {
        // No receivers is fine.
        let _ = self.events.send(event);
    }

    fn emit_panes(&self, state: &WorkspaceState) {
        self.emit(WorkspaceEvent::PanesChanged(state.panes.clone()));
    }

    /// Cancels and releases the active session for `agent_id`, if any.
    fn release_locked(&self, state: &mut WorkspaceState, agent_id: &AgentId) -> bool {
        let Some(active) = state.active.remove(agent_id) else {
            return false;
        };
        active.cancel.cancel();
        if let Err(e) = state.store.finalize(&active.handle) {
            debug!(agent_id = %agent_id, error = %e, "Placeholder already finalized");
        }
        let token = active.session.token();
        info!(agent_id = %agent_id, token = %token, "Chat stream cancelled");
        self.emit(WorkspaceEvent::StreamSettled {
            agent_id: agent_id.clone(),
            token,
            outcome: StreamOutcome::Cancelled,
        });
        true
    }

    async fn apply_delta(&self, agent_id: &AgentId, token: SessionToken, fragment: String) {
        let mut guard = self.state.lock().await;
        let WorkspaceState { active, store, .. } = &mut *guard;

        let Some(current) = active
            .get_mut(agent_id)
            .filter(|a| a.session.token() == token)
        else {
            debug!(agent_id = %agent_id, token = %token, "Dropping delta for released session");
            return;
        };
        if let Err(e) = current.session.apply_delta(&fragment) {
            debug!(agent_id = %agent_id, error = %e, "Dropping delta");
            return;
        }
        if let Err(e) = store.append_delta(&current.handle, &fragment) {
            warn!(agent_id = %agent_id, error = %e, "History rejected delta");
            return;
        }

        self.emit(WorkspaceEvent::DeltaApplied {
            agent_id: agent_id.clone(),
            token,
            fragment,
        });
    }

    /// Returns false when the session had already been released.
    async fn settle(
        &self,
        agent_id: &AgentId,
        token: SessionToken,
        outcome: &StreamOutcome,
    ) -> bool {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;

        let is_current = state
            .active
            .get(agent_id)
            .is_some_and(|a| a.session.token() == token);
        if !is_current {
            debug!(agent_id = %agent_id, token = %token, "Ignoring outcome for released session");
            return false;
        }
        let Some(mut active) = state.active.remove(agent_id) else {
            return false;
        };

        if let Err(e) = state.store.finalize(&active.handle) {
            debug!(agent_id = %agent_id, error = %e, "Placeholder already finalized");
        }
        match active.session.settle(outcome) {
            Ok(()) => {
                state.settled.insert(agent_id.clone(), active.session);
            }
            Err(e) => {
                debug!(agent_id = %agent_id, error = %e, "Session released without settling");
            }
        }

        match outcome {
            StreamOutcome::Done => info!(agent_id = %agent_id, token = %token, "Chat stream done"),
            StreamOutcome::Failed(failure) => {
                warn!(agent_id = %agent_id, token = %token, error = %failure, "Chat stream failed");
            }
            StreamOutcome::Cancelled => {
                info!(agent_id = %agent_id, token = %token, "Chat stream cancelled");
            }
        }
        self.emit(WorkspaceEvent::StreamSettled {
            agent_id: agent_id.clone(),
            token,
            outcome: outcome.clone(),
        });
        true
    }
}

async fn run_session(
    inner: Arc<Inner>,
    request: ChatRequest,
    token: SessionToken,
    cancel: CancellationToken,
) -> StreamOutcome {
    let agent_id = request.agent_id.clone();
    debug!(
        agent_id = %agent_id,
        token = %token,
        messages = request.messages.len(),
        "Opening chat stream"
    );

    let outcome = match inner.backend.stream_chat(request, cancel.clone()).await {
        Ok(body) => {
            let mut consumer = StreamConsumer::new(data_lines(body), cancel);
            loop {
                match consumer.next().await {
                    Some(ConsumerStep::Delta(fragment)) => {
                        inner.apply_delta(&agent_id, token, fragment).await;
                    }
                    Some(ConsumerStep::Settled(outcome)) => break outcome,
                    None => break StreamOutcome::Cancelled,
                }
            }
        }
        Err(ApiError::Cancelled) => StreamOutcome::Cancelled,
        Err(e) => StreamOutcome::Failed(StreamFailure::Transport(e.to_string())),
    };

    if inner.settle(&agent_id, token, &outcome).await {
        outcome
    } else {
        StreamOutcome::Cancelled
    }
}

/// Cheap to clone; clones share the same state.
#[derive(Clone)]
pub struct Workspace {
    inner: Arc<Inner>,
}

impl Workspace {
    pub fn new(backend: Arc<dyn ChatBackend>) -> Self {
        Self::with_layout_mode(backend, LayoutMode::default())
    }

    pub fn with_layout_mode(backend: Arc<dyn ChatBackend>, mode: LayoutMode) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let state = WorkspaceState {
            panes: PaneLayout::new(mode),
            ..WorkspaceState::default()
        };
        Self {
            inner: Arc::new(Inner {
                backend,
                state: Mutex::new(state),
                events,
                next_token: AtomicU64::new(1),
            }),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WorkspaceEvent> {
        self.inner.events.subscribe()
    }

    /// Replaces the catalog. Panes for agents that disappeared are closed
    /// and their streams cancelled; the closed ids are returned.
    pub async fn load_agents(&self, agents: Vec<Agent>) -> Vec<AgentId> {
        let mut guard = self.inner.state.lock().await;
        let state = &mut *guard;

        state.catalog = AgentCatalog::new(agents);
        let catalog = &state.catalog;
        let removed = state.panes.retain(|id| catalog.contains(id));

        let stale: Vec<AgentId> = state
            .active
            .keys()
            .filter(|id| !state.catalog.contains(id))
            .cloned()
            .collect();
        for agent_id in &stale {
            self.inner.release_locked(state, agent_id);
        }

        info!(count = state.catalog.len(), closed = removed.len(), "Agent catalog loaded");
        self.inner.emit(WorkspaceEvent::AgentsLoaded {
            count: state.catalog.len(),
        });
        if !removed.is_empty() {
            self.inner.emit_panes(state);
        }
        removed
    }

    pub async fn catalog(&self) -> AgentCatalog {
        self.inner.state.lock().await.catalog.clone()
    }

    /// Declared status, overridden to `Computing` while a stream is active.
    pub async fn effective_status(&self, agent_id: &AgentId) -> Option<AgentStatus> {
        let state = self.inner.state.lock().await;
        let streaming = state.active.contains_key(agent_id);
        state
            .catalog
            .get(agent_id)
            .map(|agent| agent.effective_status(streaming))
    }

    pub async fn panes(&self) -> PaneLayout {
        self.inner.state.lock().await.panes.clone()
    }

    pub async fn grid(&self) -> GridShape {
        self.inner.state.lock().await.panes.grid()
    }

    pub async fn open_pane(&self, agent_id: &AgentId) -> Result<()> {
        let mut state = self.inner.state.lock().await;
        state.ensure_known(agent_id)?;
        if state.panes.open(agent_id) {
            self.inner.emit_panes(&state);
        }
        Ok(())
    }

    /// Closing a pane cancels any stream it was showing.
    pub async fn close_pane(&self, agent_id: &AgentId) -> bool {
        let mut guard = self.inner.state.lock().await;
        let state = &mut *guard;
        if !state.panes.close(agent_id) {
            return false;
        }
        self.inner.release_locked(state, agent_id);
        self.inner.emit_panes(state);
        true
    }

    /// Returns whether the pane is open afterwards.
    pub async fn toggle_pane(&self, agent_id: &AgentId) -> Result<bool> {
        let mut guard = self.inner.state.lock().await;
        let state = &mut *guard;
        if !state.panes.is_open(agent_id) {
            state.ensure_known(agent_id)?;
        }
        let open = state.panes.toggle(agent_id);
        if !open {
            self.inner.release_locked(state, agent_id);
        }
        self.inner.emit_panes(state);
        Ok(open)
    }

    pub async fn maximize(&self, agent_id: &AgentId) -> Result<()> {
        let mut state = self.inner.state.lock().await;
        state.panes.maximize(agent_id)?;
        self.inner.emit_panes(&state);
        Ok(())
    }

    pub async fn toggle_maximize(&self, agent_id: &AgentId) -> Result<()> {
        let mut state = self.inner.state.lock().await;
        state.panes.toggle_maximize(agent_id)?;
        self.inner.emit_panes(&state);
        Ok(())
    }

    pub async fn restore(&self) {
        let mut state = self.inner.state.lock().await;
        if state.panes.maximized().is_some() {
            state.panes.restore();
            self.inner.emit_panes(&state);
        }
    }

    pub async fn set_layout_mode(&self, mode: LayoutMode) {
        let mut state = self.inner.state.lock().await;
        if state.panes.layout_mode() != mode {
            state.panes.set_layout_mode(mode);
            self.inner.emit_panes(&state);
        }
    }

    /// Opens a pane for every catalog agent, in catalog order.
    pub async fn show_all(&self) {
        let mut guard = self.inner.state.lock().await;
        let state = &mut *guard;
        let ids = state.catalog.ids();
        state.panes.open_all(ids);
        self.inner.emit_panes(state);
    }

    pub async fn close_all(&self) {
        let mut guard = self.inner.state.lock().await;
        let state = &mut *guard;
        let open: Vec<AgentId> = state.panes.open_order().to_vec();
        state.panes.close_all();
        for agent_id in &open {
            self.inner.release_locked(state, agent_id);
        }
        self.inner.emit_panes(state);
    }

    /// Appends the user message and an empty assistant placeholder, then
    /// starts streaming the reply on a background task.
    ///
    /// Rejections (`InvalidInput`, `UnknownAgent`, `SessionConflict`) leave
    /// the history untouched.
    pub async fn send_message(&self, agent_id: &AgentId, text: &str) -> Result<SendReceipt> {
        let text = text.trim();
        if text.is_empty() {
            return Err(Error::InvalidInput("message text is empty".to_string()));
        }

        let mut guard = self.inner.state.lock().await;
        let state = &mut *guard;
        state.ensure_known(agent_id)?;
        if state.active.contains_key(agent_id) || state.store.has_open_turn(agent_id) {
            return Err(Error::SessionConflict(agent_id.clone()));
        }

        state.store.append_user(agent_id, text)?;
        let handle = state.store.begin_assistant(agent_id)?;

        // The request carries everything before the placeholder.
        let mut messages: Vec<Message> = state.store.history(agent_id);
        messages.truncate(handle.index());

        let token = SessionToken(self.inner.next_token.fetch_add(1, Ordering::Relaxed));
        let cancel = CancellationToken::new();
        // A previous turn's outcome no longer describes this agent.
        state.settled.remove(agent_id);
        state.active.insert(
            agent_id.clone(),
            ActiveSession {
                session: StreamSession::new(agent_id.clone(), token),
                handle,
                cancel: cancel.clone(),
            },
        );
        self.inner.emit(WorkspaceEvent::MessageAppended {
            agent_id: agent_id.clone(),
            role: Role::User,
        });
        self.inner.emit(WorkspaceEvent::MessageAppended {
            agent_id: agent_id.clone(),
            role: Role::Assistant,
        });
        drop(guard);

        info!(agent_id = %agent_id, token = %token, "Sending message");
        let request = ChatRequest {
            agent_id: agent_id.clone(),
            messages,
        };
        let task = tokio::spawn(run_session(
            Arc::clone(&self.inner),
            request,
            token,
            cancel,
        ));

        Ok(SendReceipt {
            agent_id: agent_id.clone(),
            token,
            task,
        })
    }

    /// Stops the active stream for `agent_id`. Content received so far stays
    /// in the history. Returns false when nothing was streaming.
    pub async fn cancel(&self, agent_id: &AgentId) -> bool {
        let mut guard = self.inner.state.lock().await;
        self.inner.release_locked(&mut guard, agent_id)
    }

    pub async fn cancel_all(&self) -> usize {
        let mut guard = self.inner.state.lock().await;
        let state = &mut *guard;
        let agents: Vec<AgentId> = state.active.keys().cloned().collect();
        agents
            .iter()
            .filter(|agent_id| self.inner.release_locked(state, agent_id))
            .count()
    }

    /// Cancels every stream. Session tasks observe the cancellation and exit
    /// on their own.
    pub async fn shutdown(&self) {
        let cancelled = self.cancel_all().await;
        info!(cancelled, "Workspace shut down");
    }

    pub async fn history(&self, agent_id: &AgentId) -> Vec<Message> {
        self.inner.state.lock().await.store.history(agent_id)
    }

    /// The active session, or else the last one that settled.
    pub async fn session(&self, agent_id: &AgentId) -> Option<StreamSession> {
        let state = self.inner.state.lock().await;
        state
            .active
            .get(agent_id)
            .map(|a| a.session.clone())
            .or_else(|| state.settled.get(agent_id).cloned())
    }

    pub async fn is_busy(&self, agent_id: &AgentId) -> bool {
        self.inner.state.lock().await.active.contains_key(agent_id)
    }

    pub async fn busy_agents(&self) -> Vec<AgentId> {
        let state = self.inner.state.lock().await;
        let mut busy: Vec<AgentId> = state.active.keys().cloned().collect();
        busy.sort();
        busy
    }
}
