// PromptDeck: Application errors

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    /// Missing or malformed caller input. Never retried.
    #[error("{0}")]
    Validation(String),
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation(message.into())
    }

    pub fn not_found(entity: &'static str, id: i64) -> Self {
        AppError::NotFound { entity, id }
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        assert_eq!(AppError::not_found("tool", 7).to_string(), "tool 7 not found");
        assert_eq!(
            AppError::validation("name is required").to_string(),
            "name is required"
        );
    }
}
