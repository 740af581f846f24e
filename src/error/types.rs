// src/error/types.rs
use crate::domain::DomainError;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Pool error: {0}")]
    Pool(String),

    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Resource not found")]
    NotFound,

    #[error("Other error: {0}")]
    Other(String),
}

/// Failure of a call to the generation gateway, or of the task wrapping it.
///
/// Cloneable so a single failed task can hand the same error to every caller
/// that joined it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    #[error("transport failure: {0}")]
    Transport(String),

    #[error("could not parse generator output: {0}")]
    Parse(String),

    #[error("generator reported an error: {0}")]
    Service(String),

    #[error("generator returned no cards")]
    EmptyResult,

    #[error("generation stream ended before completion")]
    Interrupted,

    #[error("could not persist generated content: {0}")]
    Persistence(String),
}

impl AppError {
    /// True when retrying the same request later could succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            AppError::Generation(GenerationError::Persistence(_)) => false,
            AppError::Generation(_) | AppError::Pool(_) => true,
            _ => false,
        }
    }
}

impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl From<uuid::Error> for AppError {
    fn from(err: uuid::Error) -> Self {
        AppError::Other(format!("UUID error: {}", err))
    }
}

impl From<chrono::ParseError> for AppError {
    fn from(err: chrono::ParseError) -> Self {
        AppError::Other(format!("Date parse error: {}", err))
    }
}

impl From<r2d2::Error> for AppError {
    fn from(err: r2d2::Error) -> Self {
        AppError::Pool(err.to_string())
    }
}

impl From<reqwest::Error> for GenerationError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            GenerationError::Parse(err.to_string())
        } else {
            GenerationError::Transport(err.to_string())
        }
    }
}

impl From<AppError> for GenerationError {
    fn from(err: AppError) -> Self {
        match err {
            AppError::Generation(inner) => inner,
            other => GenerationError::Persistence(other.to_string()),
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;

pub type GenerationResult<T> = Result<T, GenerationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_errors_are_retryable() {
        let err = AppError::from(GenerationError::Transport("connection reset".to_string()));
        assert!(err.is_retryable());
        assert!(!AppError::NotFound.is_retryable());
    }

    #[test]
    fn test_app_error_folds_back_into_generation_error() {
        let original = GenerationError::Service("quota exceeded".to_string());
        let round: GenerationError = AppError::Generation(original.clone()).into();
        assert_eq!(round, original);

        let persisted: GenerationError = AppError::Other("disk full".to_string()).into();
        assert!(matches!(persisted, GenerationError::Persistence(_)));
    }
}
