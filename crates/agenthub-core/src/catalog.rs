//! Agent records as served by the backend catalog.
//!
//! The core never mutates an [`Agent`]. The only derived value is the
//! *effective* status, which reads as [`AgentStatus::Computing`] while a
//! response is streaming for that agent.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use strum::{Display, EnumIter, IntoEnumIterator};

/// Pseudo-group that matches every agent.
pub const ALL_GROUPS: &str = "All";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentId(String);

impl AgentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AgentId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for AgentId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter, Default,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AgentStatus {
    Active,
    Computing,
    #[default]
    Idle,
    Blocked,
    Waiting,
}

impl AgentStatus {
    pub fn label(self) -> &'static str {
        match self {
            AgentStatus::Active => "Active",
            AgentStatus::Computing => "Computing",
            AgentStatus::Idle => "Idle",
            AgentStatus::Blocked => "Blocked",
            AgentStatus::Waiting => "Waiting",
        }
    }

    /// Statuses rendered with a pulsing indicator.
    pub fn is_pulsing(self) -> bool {
        matches!(
            self,
            AgentStatus::Active | AgentStatus::Computing | AgentStatus::Blocked
        )
    }

    /// Counted towards the "N active" summary.
    pub fn is_live(self) -> bool {
        matches!(self, AgentStatus::Active | AgentStatus::Computing)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub id: AgentId,
    #[serde(rename = "name", alias = "displayName")]
    pub display_name: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub status: AgentStatus,
    #[serde(default)]
    pub group: String,
}

impl Agent {
    pub fn effective_status(&self, streaming: bool) -> AgentStatus {
        if streaming {
            AgentStatus::Computing
        } else {
            self.status
        }
    }
}

/// Ordered, read-only view over the fetched agent list.
#[derive(Debug, Clone, Default)]
pub struct AgentCatalog {
    agents: Vec<Agent>,
    index: HashMap<AgentId, usize>,
}

impl AgentCatalog {
    /// Builds a catalog, keeping the first record when ids repeat.
    pub fn new(agents: Vec<Agent>) -> Self {
        let mut kept = Vec::with_capacity(agents.len());
        let mut index = HashMap::with_capacity(agents.len());
        for agent in agents {
            if index.contains_key(&agent.id) {
                tracing::warn!(agent_id = %agent.id, "Duplicate agent id in catalog, ignoring");
                continue;
            }
            index.insert(agent.id.clone(), kept.len());
            kept.push(agent);
        }
        Self {
            agents: kept,
            index,
        }
    }

    pub fn get(&self, id: &AgentId) -> Option<&Agent> {
        self.index.get(id).and_then(|&i| self.agents.get(i))
    }

    pub fn contains(&self, id: &AgentId) -> bool {
        self.index.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Agent> {
        self.agents.iter()
    }

    pub fn ids(&self) -> Vec<AgentId> {
        self.agents.iter().map(|a| a.id.clone()).collect()
    }

    /// `"All"` followed by each distinct group in first-seen order.
    pub fn groups(&self) -> Vec<String> {
        let mut groups = vec![ALL_GROUPS.to_string()];
        for agent in &self.agents {
            if !groups.iter().any(|g| g == &agent.group) {
                groups.push(agent.group.clone());
            }
        }
        groups
    }

    pub fn filtered(&self, group: &str) -> Vec<&Agent> {
        if group == ALL_GROUPS {
            return self.agents.iter().collect();
        }
        self.agents.iter().filter(|a| a.group == group).collect()
    }

    /// Number of agents per declared status, in status order, skipping zeroes.
    pub fn status_counts(&self) -> Vec<(AgentStatus, usize)> {
        AgentStatus::iter()
            .map(|status| {
                let count = self.agents.iter().filter(|a| a.status == status).count();
                (status, count)
            })
            .filter(|(_, count)| *count > 0)
            .collect()
    }

    pub fn live_count(&self) -> usize {
        self.agents.iter().filter(|a| a.status.is_live()).count()
    }
}
