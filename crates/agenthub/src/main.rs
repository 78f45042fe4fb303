use agenthub::cli::{Cli, Commands};
use agenthub::commands::{
    Command, agents::AgentsCommand, auth::LoginCommand, chat::ChatCommand, grid::GridCommand,
    status::StatusCommand, workspace::WorkspaceCommand,
};
use agenthub::session::HubOptions;
use clap::Parser;
use eyre::Result;

#[tokio::main]
async fn main() -> Result<()> {
    // Install color-eyre for better error reports
    color_eyre::install()?;

    // Load .env before parsing so it can feed env-backed flags
    agenthub::cli::config::load_env()?;

    let cli = Cli::parse();

    let options = HubOptions::load(cli.url, cli.config, cli.username, cli.log_file)?;

    // Level comes from RUST_LOG; the guard flushes the log file on exit
    let _log_guard = agenthub_core::utils::tracing::init_tracing(options.log_file())?;

    let command: Box<dyn Command> = match cli.command {
        Commands::Status => Box::new(StatusCommand { options }),
        Commands::Login => Box::new(LoginCommand { options }),
        Commands::Agents { group } => Box::new(AgentsCommand { options, group }),
        Commands::Chat { agent, message } => Box::new(ChatCommand {
            options,
            agent,
            message: message.join(" "),
        }),
        Commands::Grid {
            count,
            mode,
            maximized,
        } => Box::new(GridCommand {
            count,
            mode,
            maximized,
        }),
        Commands::Workspace { layout, agents } => Box::new(WorkspaceCommand {
            options,
            layout,
            agents,
        }),
    };

    command.execute().await
}
