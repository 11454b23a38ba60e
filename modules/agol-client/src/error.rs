use thiserror::Error;

pub type Result<T> = std::result::Result<T, AgolError>;

#[derive(Debug, Error)]
pub enum AgolError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Item not queryable: {0}")]
    NotQueryable(String),
}

impl From<reqwest::Error> for AgolError {
    fn from(err: reqwest::Error) -> Self {
        AgolError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for AgolError {
    fn from(err: serde_json::Error) -> Self {
        AgolError::Parse(err.to_string())
    }
}
