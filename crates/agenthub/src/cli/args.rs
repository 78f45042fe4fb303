use agenthub_core::panes::LayoutMode;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Chat with several Agent Hub agents side by side from the terminal.
#[derive(Parser)]
#[command(version, about, long_about = None, author)]
pub struct Cli {
    /// Base URL of the Agent Hub server (overrides the config file)
    #[arg(long, env = "AGENTHUB_URL", global = true)]
    pub url: Option<String>,

    /// Path to the config file (defaults to <config dir>/agenthub/config.toml)
    #[arg(long, env = "AGENTHUB_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Username used when a command needs to log in
    #[arg(short, long, env = "AGENTHUB_USERNAME", global = true)]
    pub username: Option<String>,

    /// Write logs to this file instead of stderr
    #[arg(long, env = "AGENTHUB_LOG_FILE", global = true)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Clone, Debug)]
pub enum Commands {
    /// Show the server address and whether the session is authenticated
    Status,
    /// Log in and remember the username in the config file
    Login,
    /// List the agent catalog
    Agents {
        /// Only show agents in this group
        #[arg(long)]
        group: Option<String>,
    },
    /// Send one message to an agent and stream the reply
    Chat {
        /// Agent id
        agent: String,
        /// Message text
        #[arg(required = true, trailing_var_arg = true)]
        message: Vec<String>,
    },
    /// Print the grid shape for a number of panes
    Grid {
        /// Number of visible panes
        count: usize,
        /// Layout mode
        #[arg(long, default_value_t = LayoutMode::Grid)]
        mode: LayoutMode,
        /// Treat one pane as maximized
        #[arg(long)]
        maximized: bool,
    },
    /// Interactive multi-agent workspace
    Workspace {
        /// Layout mode (overrides the config file)
        #[arg(long)]
        layout: Option<LayoutMode>,
        /// Agents to open on start (overrides the config file)
        agents: Vec<String>,
    },
}
