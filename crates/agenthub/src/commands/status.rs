use async_trait::async_trait;
use colored::Colorize;
use eyre::Result;
use std::io::Write;

use super::Command;
use crate::session::HubOptions;

pub struct StatusCommand {
    pub options: HubOptions,
}

#[async_trait]
impl Command for StatusCommand {
    async fn execute(&self) -> Result<()> {
        let client = self.options.client()?;
        let authenticated = client.auth_status().await?;

        let mut stdout = std::io::stdout();
        writeln!(stdout, "Server:   {}", client.base_url())?;
        writeln!(stdout, "Config:   {}", self.options.config_path.display())?;
        writeln!(
            stdout,
            "Username: {}",
            self.options.username.as_deref().unwrap_or("-")
        )?;
        let session = if authenticated {
            "authenticated".green()
        } else {
            "not logged in".yellow()
        };
        writeln!(stdout, "Session:  {session}")?;
        Ok(())
    }
}
