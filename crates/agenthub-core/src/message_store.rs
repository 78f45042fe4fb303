//! Per-agent conversation history.
//!
//! Histories are append-only: messages are never reordered or removed. An
//! assistant turn is opened as an empty placeholder and grows in place as
//! stream deltas arrive, until it is finalized through its handle.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use strum::Display;

use crate::catalog::AgentId;
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Targets one open assistant placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssistantHandle {
    agent_id: AgentId,
    index: usize,
    turn: u64,
}

impl AssistantHandle {
    pub fn agent_id(&self) -> &AgentId {
        &self.agent_id
    }

    /// Position of the placeholder in the agent's history.
    pub fn index(&self) -> usize {
        self.index
    }
}

#[derive(Debug, Default)]
pub struct MessageStore {
    histories: HashMap<AgentId, Vec<Message>>,
    open_turns: HashMap<AgentId, u64>,
    next_turn: u64,
}

impl MessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append_user(&mut self, agent_id: &AgentId, text: &str) -> Result<()> {
        if text.trim().is_empty() {
            return Err(Error::InvalidInput("message text is empty".to_string()));
        }
        self.histories
            .entry(agent_id.clone())
            .or_default()
            .push(Message::user(text));
        Ok(())
    }

    pub fn begin_assistant(&mut self, agent_id: &AgentId) -> Result<AssistantHandle> {
        if self.open_turns.contains_key(agent_id) {
            return Err(Error::SessionConflict(agent_id.clone()));
        }
        let history = self.histories.entry(agent_id.clone()).or_default();
        history.push(Message::assistant(String::new()));

        self.next_turn += 1;
        let turn = self.next_turn;
        self.open_turns.insert(agent_id.clone(), turn);

        Ok(AssistantHandle {
            agent_id: agent_id.clone(),
            index: history.len() - 1,
            turn,
        })
    }

    pub fn append_delta(&mut self, handle: &AssistantHandle, fragment: &str) -> Result<()> {
        let message = self.open_message_mut(handle)?;
        message.content.push_str(fragment);
        Ok(())
    }

    pub fn finalize(&mut self, handle: &AssistantHandle) -> Result<()> {
        self.open_message_mut(handle)?;
        self.open_turns.remove(&handle.agent_id);
        Ok(())
    }

    pub fn history(&self, agent_id: &AgentId) -> Vec<Message> {
        self.histories.get(agent_id).cloned().unwrap_or_default()
    }

    pub fn len(&self, agent_id: &AgentId) -> usize {
        self.histories.get(agent_id).map_or(0, Vec::len)
    }

    pub fn has_open_turn(&self, agent_id: &AgentId) -> bool {
        self.open_turns.contains_key(agent_id)
    }

    /// Current content behind a handle, whether or not it is still open.
    pub fn content(&self, handle: &AssistantHandle) -> Option<&str> {
        self.histories
            .get(&handle.agent_id)
            .and_then(|h| h.get(handle.index))
            .map(|m| m.content.as_str())
    }

    /// Agents with at least one message, in no particular order.
    pub fn agents(&self) -> impl Iterator<Item = &AgentId> {
        self.histories.keys()
    }

    fn open_message_mut(&mut self, handle: &AssistantHandle) -> Result<&mut Message> {
        if self.open_turns.get(&handle.agent_id) != Some(&handle.turn) {
            return Err(Error::StaleHandle(handle.agent_id.clone()));
        }
        self.histories
            .get_mut(&handle.agent_id)
            .and_then(|h| h.get_mut(handle.index))
            .ok_or_else(|| Error::StaleHandle(handle.agent_id.clone()))
    }
}
