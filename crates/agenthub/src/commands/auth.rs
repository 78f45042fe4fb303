use async_trait::async_trait;
use eyre::Result;
use std::io::Write;
use tracing::warn;

use super::Command;
use crate::session::{self, HubOptions};

pub struct LoginCommand {
    pub options: HubOptions,
}

#[async_trait]
impl Command for LoginCommand {
    async fn execute(&self) -> Result<()> {
        let username = match self.options.username.clone() {
            Some(username) => username,
            None => session::prompt_line("Username: ")?,
        };
        if username.is_empty() {
            eyre::bail!("Username is required");
        }

        let client = self.options.client()?;
        session::login(&client, &username).await?;

        let mut config = self.options.config.clone();
        if config.username.as_deref() != Some(username.as_str()) {
            config.username = Some(username.clone());
            if let Err(e) = config.save_to(&self.options.config_path) {
                warn!(error = %e, "Could not remember username");
            }
        }

        let mut stdout = std::io::stdout();
        writeln!(stdout, "Logged in to {} as {username}", client.base_url())?;
        Ok(())
    }
}
