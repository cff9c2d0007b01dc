use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("{0}")]
    Configuration(String),
    #[error("{0}")]
    Authentication(String),
    #[error("{0}")]
    RateLimited(String),
    #[error("{0}")]
    Transport(String),
    #[error("{0}")]
    InvalidResponse(String),
    #[error("{0}")]
    Other(String),
}

impl ProviderError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        ProviderError::Configuration(msg.into())
    }

    pub fn transport(msg: impl Into<String>) -> Self {
        ProviderError::Transport(msg.into())
    }

    pub fn invalid_response(msg: impl Into<String>) -> Self {
        ProviderError::InvalidResponse(msg.into())
    }

    /// Map a non-success HTTP status to the matching error kind.
    pub fn from_status(status: u16, body: &str) -> Self {
        let msg = format!("{status}: {body}");
        match status {
            401 | 403 => ProviderError::Authentication(msg),
            429 => ProviderError::RateLimited(msg),
            _ => ProviderError::Transport(msg),
        }
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, ProviderError::Configuration(_))
    }
}
