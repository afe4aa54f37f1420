use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Unauthorized: {0}")]
    Authentication(String),

    #[error("Network error: {0}")]
    TransientNetwork(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("{service} returned HTTP {status}")]
    ExternalService { service: String, status: u16 },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Persistence error: {0}")]
    Persistence(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    JsonSerialization(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Fails with a validation error naming the first blank field.
pub(crate) fn require_non_blank(fields: &[(&str, &str)]) -> Result<()> {
    for (name, value) in fields {
        if value.trim().is_empty() {
            return Err(Error::Validation(format!("missing required field: {name}")));
        }
    }
    Ok(())
}

pub(crate) fn require_round(round: u32) -> Result<()> {
    if round == 0 {
        return Err(Error::Validation("round must be a positive integer".to_string()));
    }
    Ok(())
}
