use thiserror::Error;

use crate::api::ApiError;
use crate::catalog::AgentId;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("A response is already streaming for agent {0}")]
    SessionConflict(AgentId),
    #[error("Stale handle for agent {0}")]
    StaleHandle(AgentId),
    #[error("Invalid state: {0}")]
    InvalidState(String),
    #[error("Unknown agent: {0}")]
    UnknownAgent(AgentId),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl Error {
    /// True for rejections that happen before any state is touched.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Error::InvalidInput(_)
                | Error::SessionConflict(_)
                | Error::InvalidState(_)
                | Error::UnknownAgent(_)
        )
    }
}
