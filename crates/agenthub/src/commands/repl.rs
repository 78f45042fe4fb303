//! Line commands understood by the interactive workspace.

use agenthub_core::catalog::AgentId;
use agenthub_core::panes::LayoutMode;
use std::str::FromStr;

pub const HELP: &str = "\
@<agent> <text>   send a message
/open <agent>     open a pane
/close <agent>    close a pane (cancels its stream)
/toggle <agent>   open or close a pane
/max <agent>      maximize a pane (again to restore)
/restore          leave the focused view
/layout <mode>    grid, columns or rows
/all              open every agent
/none             close every pane
/panes            show the pane grid
/agents           list agents and their status
/history <agent>  print a conversation
/cancel [agent]   stop one stream, or all of them
/logout           end the server session and leave
/help             this text
/quit             leave";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    Send { agent_id: AgentId, text: String },
    Open(AgentId),
    Close(AgentId),
    Toggle(AgentId),
    Maximize(AgentId),
    Restore,
    Layout(LayoutMode),
    ShowAll,
    CloseAll,
    Panes,
    Agents,
    History(AgentId),
    Cancel(Option<AgentId>),
    Help,
    Logout,
    Quit,
}

/// `Ok(None)` for blank lines.
pub fn parse(line: &str) -> Result<Option<ReplCommand>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    if let Some(rest) = line.strip_prefix('@') {
        let (agent, text) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
        if agent.is_empty() {
            return Err("usage: @<agent> <text>".to_string());
        }
        return Ok(Some(ReplCommand::Send {
            agent_id: AgentId::from(agent),
            text: text.trim().to_string(),
        }));
    }

    let Some(rest) = line.strip_prefix('/') else {
        return Err("messages start with @<agent>; /help lists commands".to_string());
    };
    let mut words = rest.split_whitespace();
    let name = words.next().unwrap_or_default();
    let arg = words.next();
    if words.next().is_some() {
        return Err(format!("too many arguments for /{name}"));
    }

    let agent = |usage: &str| {
        arg.map(AgentId::from)
            .ok_or_else(|| format!("usage: /{name} {usage}"))
    };

    let command = match name {
        "open" => ReplCommand::Open(agent("<agent>")?),
        "close" => ReplCommand::Close(agent("<agent>")?),
        "toggle" => ReplCommand::Toggle(agent("<agent>")?),
        "max" | "maximize" => ReplCommand::Maximize(agent("<agent>")?),
        "restore" => ReplCommand::Restore,
        "layout" => {
            let mode = arg.ok_or_else(|| "usage: /layout <grid|columns|rows>".to_string())?;
            ReplCommand::Layout(
                LayoutMode::from_str(mode).map_err(|_| format!("unknown layout {mode:?}"))?,
            )
        }
        "all" => ReplCommand::ShowAll,
        "none" => ReplCommand::CloseAll,
        "panes" => ReplCommand::Panes,
        "agents" => ReplCommand::Agents,
        "history" => ReplCommand::History(agent("<agent>")?),
        "cancel" => ReplCommand::Cancel(arg.map(AgentId::from)),
        "help" | "?" => ReplCommand::Help,
        "logout" => ReplCommand::Logout,
        "quit" | "exit" | "q" => ReplCommand::Quit,
        other => return Err(format!("unknown command /{other}; /help lists commands")),
    };
    Ok(Some(command))
}
