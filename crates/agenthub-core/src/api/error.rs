use thiserror::Error;
use tokio_util::codec::LinesCodecError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid backend URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Authentication failed: {details}")]
    AuthenticationFailed { details: String },

    #[error("Login rejected: {0}")]
    LoginRejected(String),

    #[error("Invalid request (Status: {status_code}): {details}")]
    InvalidRequest { status_code: u16, details: String },

    #[error("Server error (Status: {status_code}): {details}")]
    ServerError { status_code: u16, details: String },

    #[error("Unexpected response (Status: {status_code}): {details}")]
    Unknown { status_code: u16, details: String },

    #[error("Failed to parse response: {details}")]
    ResponseParsingError { details: String },

    #[error("Request cancelled")]
    Cancelled,
}

impl ApiError {
    pub fn from_status(status_code: u16, details: String) -> Self {
        match status_code {
            401 | 403 => ApiError::AuthenticationFailed { details },
            400..=499 => ApiError::InvalidRequest {
                status_code,
                details,
            },
            500..=599 => ApiError::ServerError {
                status_code,
                details,
            },
            _ => ApiError::Unknown {
                status_code,
                details,
            },
        }
    }
}

/// Failures while reading a chat response body.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StreamError {
    #[error("UTF-8 error: {details}")]
    Decode { details: String },
    #[error("Transport error: {details}")]
    Transport { details: String },
}

impl From<LinesCodecError> for StreamError {
    fn from(err: LinesCodecError) -> Self {
        match err {
            LinesCodecError::Io(err) if err.kind() == std::io::ErrorKind::InvalidData => {
                Self::Decode {
                    details: err.to_string(),
                }
            }
            LinesCodecError::Io(err) => Self::Transport {
                details: err.to_string(),
            },
            LinesCodecError::MaxLineLengthExceeded => Self::Decode {
                details: "line too long".to_string(),
            },
        }
    }
}
