use thiserror::Error;

#[derive(Debug, Error)]
pub enum ComposeError {
    #[error("invalid JSON in defaults: {0}")]
    InvalidDefaults(#[from] serde_json::Error),

    #[error("reference error: {0}")]
    Reference(String),
}
