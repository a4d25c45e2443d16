use crate::slack::{LookupKind, Response};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SlackApiError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Authentication failed with response: {response}")]
    Authentication { response: Response },

    #[error("For {url} API returned this bad response {response}")]
    Api { url: String, response: Response },

    #[error("Unknown {kind}: \"{key}\"")]
    NotFound { kind: LookupKind, key: String },

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SlackApiError>;
