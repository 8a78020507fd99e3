use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("request timed out")]
    Timeout,

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("HTTP status {status}: {message}")]
    Http { status: u16, message: String },

    #[error("API returned an empty result")]
    EmptyResult,

    #[error("network error: {0}")]
    Network(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("watcher error: {0}")]
    Watcher(String),

    #[error("{0}")]
    General(String),
}

impl AppError {
    /// Whether the remote-call retry loop may attempt this call again.
    /// Auth, config and parse failures are final; resending the same
    /// request cannot fix them.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AppError::Timeout
                | AppError::Http { .. }
                | AppError::EmptyResult
                | AppError::Network(_)
        )
    }
}

/// Classify an upstream error message: provider errors that name a 401 or
/// the API key are credential problems no matter which field carried them.
pub fn is_auth_message(message: &str) -> bool {
    message.contains("401") || message.to_lowercase().contains("api key")
}

impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}
