use async_trait::async_trait;
use eyre::Result;

pub mod agents;
pub mod auth;
pub mod chat;
pub mod grid;
pub mod repl;
pub mod status;
pub mod workspace;

#[async_trait]
pub trait Command {
    async fn execute(&self) -> Result<()>;
}
