//! Resolving the hub connection for a command.
//!
//! The server session lives only in the client's cookie jar, so every
//! process logs in again when a command needs it. Only the username is
//! remembered, in the config file.

use agenthub_core::api::HubClient;
use agenthub_core::config::Config;
use eyre::{Result, bail};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;
use zeroize::Zeroizing;

pub const PASSWORD_ENV: &str = "AGENTHUB_PASSWORD";

#[derive(Debug, Clone)]
pub struct HubOptions {
    pub config: Config,
    pub config_path: PathBuf,
    pub username: Option<String>,
}

impl HubOptions {
    /// Loads the config file and applies command-line overrides on top.
    pub fn load(
        url: Option<String>,
        config_path: Option<PathBuf>,
        username: Option<String>,
        log_file: Option<PathBuf>,
    ) -> Result<Self> {
        let config_path = match config_path {
            Some(path) => path,
            None => Config::config_path()?,
        };
        let mut config = Config::load_from(&config_path)?;
        if let Some(url) = url {
            config.base_url = url;
        }
        if log_file.is_some() {
            config.log_file = log_file;
        }
        let username = username.or_else(|| config.username.clone());

        Ok(Self {
            config,
            config_path,
            username,
        })
    }

    pub fn log_file(&self) -> Option<&Path> {
        self.config.log_file.as_deref()
    }

    pub fn client(&self) -> Result<HubClient> {
        Ok(HubClient::from_config(&self.config)?)
    }

    /// Returns an authenticated client, logging in when the server reports
    /// no session and a username is known.
    pub async fn connect(&self) -> Result<HubClient> {
        let client = self.client()?;
        if client.auth_status().await? {
            debug!("Session already authenticated");
            return Ok(client);
        }
        let Some(username) = self.username.as_deref() else {
            bail!(
                "Not logged in to {}. Pass --username or run `agenthub login` first.",
                self.config.base_url
            );
        };
        login(&client, username).await?;
        Ok(client)
    }
}

pub async fn login(client: &HubClient, username: &str) -> Result<()> {
    let password = read_password(username)?;
    client.login(username, &password).await?;
    Ok(())
}

fn read_password(username: &str) -> Result<Zeroizing<String>> {
    if let Ok(password) = std::env::var(PASSWORD_ENV) {
        return Ok(Zeroizing::new(password));
    }
    let password = rpassword::prompt_password(format!("Password for {username}: "))?;
    Ok(Zeroizing::new(password))
}

/// Reads one line from the terminal, trimmed.
pub fn prompt_line(prompt: &str) -> Result<String> {
    let mut stdout = std::io::stdout();
    write!(stdout, "{prompt}")?;
    stdout.flush()?;

    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn overrides_apply_over_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        Config {
            username: Some("ada".to_string()),
            ..Config::default()
        }
        .save_to(&path)
        .unwrap();

        let options = HubOptions::load(
            Some("http://hub.internal:9000".to_string()),
            Some(path.clone()),
            None,
            Some(PathBuf::from("/tmp/agenthub.log")),
        )
        .unwrap();
        assert_eq!(options.config.base_url, "http://hub.internal:9000");
        assert_eq!(options.username.as_deref(), Some("ada"));
        assert_eq!(options.log_file(), Some(Path::new("/tmp/agenthub.log")));

        let options =
            HubOptions::load(None, Some(path), Some("grace".to_string()), None).unwrap();
        assert_eq!(options.username.as_deref(), Some("grace"));
        assert_eq!(options.log_file(), None);
    }
}
