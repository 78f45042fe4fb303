// Core Agent Hub functionality without UI dependencies

pub mod api;
pub mod catalog;
pub mod config;
pub mod error;
pub mod message_store;
pub mod panes;
pub mod stream;
pub mod test_utils;
pub mod utils;
pub mod workspace;

pub use catalog::{Agent, AgentCatalog, AgentId, AgentStatus};
pub use error::{Error, Result};
pub use workspace::{SendReceipt, Workspace, WorkspaceEvent};
