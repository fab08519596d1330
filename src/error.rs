use thiserror::Error;

impl From<serde_json::Error> for BackportError {
    fn from(err: serde_json::Error) -> Self {
        Self::GitHubError(format!("JSON serialization error: {}", err))
    }
}

impl From<octocrab::Error> for BackportError {
    fn from(err: octocrab::Error) -> Self {
        Self::GitHubError(format!("HTTP request failed: {}", err))
    }
}

impl From<config::ConfigError> for BackportError {
    fn from(err: config::ConfigError) -> Self {
        Self::ConfigError(err.to_string())
    }
}

#[derive(Error, Debug)]
pub enum BackportError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{message} Got status {status} and body {body}")]
    UpstreamError {
        message: String,
        status: u16,
        body: String,
    },

    #[error("GitHub API error: {0}")]
    GitHubError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Signature verification failed: {0}")]
    SignatureError(String),

    #[error("{0}")]
    PermissionDenied(String),
}

pub type Result<T> = std::result::Result<T, BackportError>;

impl BackportError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Builds an upstream error, substituting a placeholder for an empty body.
    pub fn upstream(message: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        let body = body.into();
        Self::UpstreamError {
            message: message.into(),
            status,
            body: if body.is_empty() {
                "<empty body>".to_string()
            } else {
                body
            },
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
