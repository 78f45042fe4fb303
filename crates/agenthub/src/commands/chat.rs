use agenthub_core::catalog::AgentId;
use agenthub_core::stream::{StreamFailure, StreamOutcome};
use agenthub_core::{Workspace, WorkspaceEvent};
use async_trait::async_trait;
use colored::Colorize;
use eyre::{Result, bail};
use std::io::Write;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::debug;

use super::Command;
use crate::session::HubOptions;

pub struct ChatCommand {
    pub options: HubOptions,
    pub agent: String,
    pub message: String,
}

#[async_trait]
impl Command for ChatCommand {
    async fn execute(&self) -> Result<()> {
        let client = self.options.connect().await?;
        let agents = client.list_agents().await?;

        let workspace = Workspace::new(Arc::new(client));
        workspace.load_agents(agents).await;
        let agent_id = AgentId::from(self.agent.as_str());

        let mut events = workspace.subscribe();
        let receipt = workspace.send_message(&agent_id, &self.message).await?;
        let token = receipt.token();

        let mut stdout = std::io::stdout();
        loop {
            let event = tokio::select! {
                event = events.recv() => event,
                _ = tokio::signal::ctrl_c() => {
                    workspace.cancel(&agent_id).await;
                    continue;
                }
            };
            match event {
                Ok(WorkspaceEvent::DeltaApplied {
                    token: t, fragment, ..
                }) if t == token => {
                    write!(stdout, "{fragment}")?;
                    stdout.flush()?;
                }
                Ok(WorkspaceEvent::StreamSettled { token: t, .. }) if t == token => break,
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => debug!(skipped, "Event receiver lagged"),
                Err(RecvError::Closed) => break,
            }
        }
        writeln!(stdout)?;

        match receipt.wait().await? {
            StreamOutcome::Done => Ok(()),
            StreamOutcome::Cancelled => {
                writeln!(stdout, "{}", "[cancelled]".yellow())?;
                Ok(())
            }
            StreamOutcome::Failed(StreamFailure::Remote(message)) => {
                bail!("{} replied with an error: {message}", agent_id)
            }
            StreamOutcome::Failed(StreamFailure::Transport(details)) => {
                bail!("Connection to {} failed: {details}", agent_id)
            }
        }
    }
}
