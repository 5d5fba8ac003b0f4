use reqwest::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Config loading error: {0}")]
    Config(#[from] fastkv_config::ConfigError),

    #[error("Invalid cache key: {0:?}")]
    InvalidKey(String),

    #[error("KV store responded with {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("Request timed out: {0}")]
    Timeout(reqwest::Error),

    #[error("HTTP transport error: {0}")]
    Transport(reqwest::Error),
}

impl CacheError {
    /// Status code of the remote response, if one was received.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            CacheError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(StatusCode::NOT_FOUND)
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, CacheError::Timeout(_))
    }
}

impl From<reqwest::Error> for CacheError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            CacheError::Timeout(err)
        } else {
            CacheError::Transport(err)
        }
    }
}
