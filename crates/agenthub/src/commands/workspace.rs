use agenthub_core::api::HubClient;
use agenthub_core::catalog::AgentId;
use agenthub_core::message_store::Role;
use agenthub_core::panes::LayoutMode;
use agenthub_core::stream::{StreamFailure, StreamOutcome};
use agenthub_core::{Workspace, WorkspaceEvent};
use async_trait::async_trait;
use colored::Colorize;
use eyre::Result;
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::debug;

use super::Command;
use super::repl::{self, ReplCommand};
use crate::render;
use crate::session::HubOptions;

pub struct WorkspaceCommand {
    pub options: HubOptions,
    pub layout: Option<LayoutMode>,
    pub agents: Vec<String>,
}

#[async_trait]
impl Command for WorkspaceCommand {
    async fn execute(&self) -> Result<()> {
        let client = self.options.connect().await?;
        let agents = client.list_agents().await?;

        let mode = self.layout.unwrap_or(self.options.config.default_layout);
        let workspace = Workspace::with_layout_mode(Arc::new(client.clone()), mode);
        workspace.load_agents(agents).await;

        let mut stdout = std::io::stdout();
        let initial = if self.agents.is_empty() {
            &self.options.config.open_on_start
        } else {
            &self.agents
        };
        for agent in initial {
            if let Err(e) = workspace.open_pane(&AgentId::from(agent.as_str())).await {
                writeln!(stdout, "{}", e.to_string().red())?;
            }
        }

        writeln!(
            stdout,
            "{}",
            render::status_summary(&workspace.catalog().await)
        )?;
        print_panes(&workspace).await?;
        writeln!(stdout, "{}", "Type /help for commands.".dimmed())?;

        let printer = spawn_printer(workspace.clone());
        let result = run_loop(&workspace, &client).await;

        workspace.shutdown().await;
        printer.abort();
        result
    }
}

async fn run_loop(workspace: &Workspace, client: &HubClient) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = std::io::stdout();

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => {
                let cancelled = workspace.cancel_all().await;
                writeln!(
                    stdout,
                    "{}",
                    format!("[cancelled {cancelled} stream(s)]").yellow()
                )?;
                continue;
            }
        };
        let Some(line) = line else {
            return Ok(());
        };

        let command = match repl::parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(message) => {
                writeln!(stdout, "{}", message.red())?;
                continue;
            }
        };

        match command {
            ReplCommand::Quit => return Ok(()),
            ReplCommand::Logout => {
                workspace.shutdown().await;
                client.logout().await?;
                writeln!(stdout, "Logged out.")?;
                return Ok(());
            }
            command => {
                if let Err(e) = apply(workspace, command).await {
                    writeln!(stdout, "{}", e.to_string().red())?;
                }
            }
        }
    }
}

async fn apply(workspace: &Workspace, command: ReplCommand) -> Result<()> {
    let mut stdout = std::io::stdout();
    match command {
        ReplCommand::Send { agent_id, text } => {
            // Sending to a closed pane opens it first.
            workspace.open_pane(&agent_id).await?;
            workspace.send_message(&agent_id, &text).await?;
        }
        ReplCommand::Open(agent_id) => {
            workspace.open_pane(&agent_id).await?;
            print_panes(workspace).await?;
        }
        ReplCommand::Close(agent_id) => {
            workspace.close_pane(&agent_id).await;
            print_panes(workspace).await?;
        }
        ReplCommand::Toggle(agent_id) => {
            workspace.toggle_pane(&agent_id).await?;
            print_panes(workspace).await?;
        }
        ReplCommand::Maximize(agent_id) => {
            workspace.toggle_maximize(&agent_id).await?;
            print_panes(workspace).await?;
        }
        ReplCommand::Restore => {
            workspace.restore().await;
            print_panes(workspace).await?;
        }
        ReplCommand::Layout(mode) => {
            workspace.set_layout_mode(mode).await;
            print_panes(workspace).await?;
        }
        ReplCommand::ShowAll => {
            workspace.show_all().await;
            print_panes(workspace).await?;
        }
        ReplCommand::CloseAll => {
            workspace.close_all().await;
            print_panes(workspace).await?;
        }
        ReplCommand::Panes => print_panes(workspace).await?,
        ReplCommand::Agents => {
            let catalog = workspace.catalog().await;
            for agent in catalog.iter() {
                let status = workspace
                    .effective_status(&agent.id)
                    .await
                    .unwrap_or(agent.status);
                writeln!(
                    stdout,
                    "{:<16} {:<24} {}",
                    agent.id.as_str(),
                    agent.display_name,
                    render::status_text(status)
                )?;
            }
            writeln!(stdout, "{}", render::status_summary(&catalog))?;
        }
        ReplCommand::History(agent_id) => {
            let history = workspace.history(&agent_id).await;
            if history.is_empty() {
                writeln!(stdout, "No messages with {agent_id} yet.")?;
            }
            for message in history {
                let speaker = match message.role {
                    Role::User => "you".bold(),
                    Role::Assistant => agent_id.as_str().cyan().bold(),
                };
                writeln!(stdout, "{speaker}: {}", message.content)?;
            }
        }
        ReplCommand::Cancel(Some(agent_id)) => {
            if !workspace.cancel(&agent_id).await {
                writeln!(stdout, "{agent_id} is not streaming.")?;
            }
        }
        ReplCommand::Cancel(None) => {
            let cancelled = workspace.cancel_all().await;
            writeln!(stdout, "Cancelled {cancelled} stream(s).")?;
        }
        ReplCommand::Help => writeln!(stdout, "{}", repl::HELP)?,
        ReplCommand::Logout | ReplCommand::Quit => {}
    }
    Ok(())
}

async fn print_panes(workspace: &Workspace) -> Result<()> {
    let panes = workspace.panes().await;
    let busy = workspace.busy_agents().await;
    let mut stdout = std::io::stdout();

    writeln!(stdout, "{}", render::layout_header(&panes).bold())?;
    for row in render::pane_rows(&panes) {
        writeln!(stdout, "  {row}")?;
    }
    if !busy.is_empty() {
        let names: Vec<&str> = busy.iter().map(AgentId::as_str).collect();
        writeln!(stdout, "  streaming: {}", names.join(", ").cyan())?;
    }
    Ok(())
}

/// Prints each reply once its stream settles. Replies stream concurrently,
/// so printing whole turns keeps agents from interleaving mid-line.
fn spawn_printer(workspace: Workspace) -> JoinHandle<()> {
    let mut events = workspace.subscribe();
    tokio::spawn(async move {
        loop {
            let (agent_id, outcome) = match events.recv().await {
                Ok(WorkspaceEvent::StreamSettled {
                    agent_id, outcome, ..
                }) => (agent_id, outcome),
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    debug!(skipped, "Printer lagged behind workspace events");
                    continue;
                }
                Err(RecvError::Closed) => return,
            };

            let reply = workspace
                .history(&agent_id)
                .await
                .into_iter()
                .rev()
                .find(|m| m.role == Role::Assistant)
                .map(|m| m.content)
                .unwrap_or_default();
            let footer = match &outcome {
                StreamOutcome::Done => None,
                StreamOutcome::Cancelled => Some("[cancelled]".yellow()),
                StreamOutcome::Failed(StreamFailure::Remote(message)) => {
                    Some(format!("[error: {message}]").red())
                }
                StreamOutcome::Failed(StreamFailure::Transport(details)) => {
                    Some(format!("[connection failed: {details}]").red())
                }
            };

            let mut stdout = std::io::stdout();
            let _ = writeln!(stdout, "{} {reply}", format!("{agent_id}:").cyan().bold());
            if let Some(footer) = footer {
                let _ = writeln!(stdout, "  {footer}");
            }
        }
    })
}
