use async_trait::async_trait;
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use url::Url;

use crate::api::backend::{ChatBackend, ChatRequest};
use crate::api::error::ApiError;
use crate::api::sse::ByteStream;
use crate::catalog::Agent;
use crate::config::Config;

const AUTH_STATUS_PATH: &str = "api/auth/status";
const LOGIN_PATH: &str = "api/auth/login";
const LOGOUT_PATH: &str = "api/auth/logout";
const AGENTS_PATH: &str = "api/agents";
const CHAT_PATH: &str = "api/chat";

#[derive(Debug, Deserialize)]
struct AuthStatusResponse {
    authenticated: bool,
}

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    success: bool,
    #[serde(default)]
    error: Option<String>,
}

/// HTTP client for the Agent Hub backend.
///
/// The session credential lives in the client's cookie store, so every
/// request made through one `HubClient` after a successful login is
/// authenticated.
#[derive(Debug, Clone)]
pub struct HubClient {
    http_client: reqwest::Client,
    base_url: Url,
}

impl HubClient {
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        Self::with_connect_timeout(base_url, Duration::from_secs(10))
    }

    pub fn from_config(config: &Config) -> Result<Self, ApiError> {
        Self::with_connect_timeout(&config.base_url, config.connect_timeout())
    }

    /// Only the connect phase is bounded; response bodies may stay open
    /// indefinitely.
    pub fn with_connect_timeout(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let mut base_url = Url::parse(base_url)?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let http_client = reqwest::Client::builder()
            .cookie_store(true)
            .connect_timeout(timeout)
            .build()?;

        Ok(Self {
            http_client,
            base_url,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        Ok(self.base_url.join(path)?)
    }

    pub async fn auth_status(&self) -> Result<bool, ApiError> {
        let response = self
            .http_client
            .get(self.endpoint(AUTH_STATUS_PATH)?)
            .send()
            .await?;
        let response = check_status(response).await?;
        let status: AuthStatusResponse = parse_json(response).await?;
        Ok(status.authenticated)
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<(), ApiError> {
        let response = self
            .http_client
            .post(self.endpoint(LOGIN_PATH)?)
            .json(&LoginRequest { username, password })
            .send()
            .await?;

        // Rejected credentials may come back as 401 with a JSON body.
        let status = response.status();
        let body = response.text().await?;
        let parsed: Option<LoginResponse> = serde_json::from_str(&body).ok();

        match parsed {
            Some(LoginResponse { success: true, .. }) if status.is_success() => {
                info!(username, "Logged in");
                Ok(())
            }
            Some(LoginResponse { error, .. }) => Err(ApiError::LoginRejected(
                error.unwrap_or_else(|| "Login failed".to_string()),
            )),
            None if status.is_success() => Err(ApiError::ResponseParsingError {
                details: format!("unexpected login response: {body}"),
            }),
            None => Err(ApiError::from_status(status.as_u16(), body)),
        }
    }

    pub async fn logout(&self) -> Result<(), ApiError> {
        let response = self
            .http_client
            .post(self.endpoint(LOGOUT_PATH)?)
            .send()
            .await?;
        check_status(response).await?;
        info!("Logged out");
        Ok(())
    }

    pub async fn list_agents(&self) -> Result<Vec<Agent>, ApiError> {
        let response = self
            .http_client
            .get(self.endpoint(AGENTS_PATH)?)
            .send()
            .await?;
        let response = check_status(response).await?;
        let agents: Vec<Agent> = parse_json(response).await?;
        debug!(count = agents.len(), "Fetched agent catalog");
        Ok(agents)
    }
}

#[async_trait]
impl ChatBackend for HubClient {
    async fn stream_chat(
        &self,
        request: ChatRequest,
        token: CancellationToken,
    ) -> Result<ByteStream, ApiError> {
        let request_builder = self
            .http_client
            .post(self.endpoint(CHAT_PATH)?)
            .json(&request);

        let response = tokio::select! {
            biased;
            () = token.cancelled() => {
                return Err(ApiError::Cancelled);
            }
            res = request_builder.send() => {
                res?
            }
        };

        let response = check_status(response).await?;
        debug!(agent_id = %request.agent_id, "Chat stream opened");

        let byte_stream = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(std::io::Error::other));
        Ok(Box::pin(byte_stream))
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let error_text = response.text().await?;
    Err(ApiError::from_status(status.as_u16(), error_text))
}

async fn parse_json<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, ApiError> {
    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|e| ApiError::ResponseParsingError {
        details: e.to_string(),
    })
}
