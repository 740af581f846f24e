// src/application/error_handling.rs
//
// Error Handling at the engine boundary
//
// ARCHITECTURE:
// - Maps internal errors → caller-facing responses
// - Provides a consistent error format for the CLI and embedding UIs
// - Never exposes internal implementation details
// - Logs errors for debugging

use serde::{Deserialize, Serialize};

use crate::error::{AppError, GenerationError};

/// Standard error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error_type: ErrorType,
    pub message: String,
    pub details: Option<String>,
    /// Repeating the same request later may succeed
    pub retryable: bool,
}

/// Error categories
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorType {
    /// Resource not found (404)
    NotFound,

    /// Invalid input/validation error (400)
    Validation,

    /// Domain invariant violation (422)
    DomainError,

    /// Database/persistence error (500)
    Database,

    /// Generation service error (502)
    ExternalService,

    /// File system error (500)
    FileSystem,

    /// Other/unknown error (500)
    Internal,
}

impl ErrorResponse {
    fn new(error_type: ErrorType, message: impl Into<String>, details: Option<String>) -> Self {
        Self {
            success: false,
            error_type,
            message: message.into(),
            details,
            retryable: false,
        }
    }

    /// Create error response from AppError
    pub fn from_app_error(error: AppError) -> Self {
        let retryable = error.is_retryable();

        let response = match error {
            AppError::NotFound => Self::new(ErrorType::NotFound, "Resource not found", None),

            AppError::Domain(domain_error) => Self::new(
                ErrorType::DomainError,
                "Domain validation failed",
                Some(domain_error.to_string()),
            ),

            AppError::Generation(GenerationError::Persistence(details)) => {
                log::error!("Generated content could not be stored: {}", details);
                Self::new(
                    ErrorType::Database,
                    "Generated content could not be stored",
                    Some(details),
                )
            }

            AppError::Generation(generation_error) => {
                log::warn!("Generation failed: {}", generation_error);
                Self::new(
                    ErrorType::ExternalService,
                    "Content generation failed",
                    Some(generation_error.to_string()),
                )
            }

            AppError::Database(db_error) => {
                // Log full error for debugging
                log::error!("Database error: {:?}", db_error);
                Self::new(
                    ErrorType::Database,
                    "Database operation failed",
                    Some("Check logs for details".to_string()),
                )
            }

            AppError::Pool(pool_error) => {
                log::error!("Connection pool error: {}", pool_error);
                Self::new(ErrorType::Database, "Database connection failed", None)
            }

            AppError::Serialization(serde_error) => {
                log::error!("Serialization error: {:?}", serde_error);
                Self::new(ErrorType::Internal, "Data serialization failed", None)
            }

            AppError::Io(io_error) => {
                log::error!("IO error: {:?}", io_error);
                Self::new(
                    ErrorType::FileSystem,
                    "File system operation failed",
                    Some(io_error.to_string()),
                )
            }

            AppError::Other(message) => {
                log::error!("Other error: {}", message);
                Self::new(ErrorType::Internal, message, None)
            }
        };

        Self {
            retryable,
            ..response
        }
    }

    /// Create validation error
    pub fn validation(message: String) -> Self {
        Self::new(ErrorType::Validation, message, None)
    }

    /// Create not found error
    pub fn not_found(resource: &str) -> Self {
        Self::new(ErrorType::NotFound, format!("{} not found", resource), None)
    }
}

/// Helper trait to convert Results to ErrorResponse
pub trait ToErrorResponse<T> {
    fn to_error_response(self) -> Result<T, String>;
}

impl<T> ToErrorResponse<T> for Result<T, AppError> {
    fn to_error_response(self) -> Result<T, String> {
        self.map_err(|e| {
            let error_response = ErrorResponse::from_app_error(e);
            serde_json::to_string(&error_response)
                .unwrap_or_else(|_| "Internal error".to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DomainError;

    #[test]
    fn test_not_found_error() {
        let error = ErrorResponse::from_app_error(AppError::NotFound);
        assert_eq!(error.error_type, ErrorType::NotFound);
        assert_eq!(error.message, "Resource not found");
        assert!(!error.retryable);
    }

    #[test]
    fn test_generation_failure_is_retryable() {
        let error = ErrorResponse::from_app_error(AppError::Generation(
            GenerationError::Transport("timed out".to_string()),
        ));
        assert_eq!(error.error_type, ErrorType::ExternalService);
        assert!(error.retryable);
        assert!(error.details.unwrap().contains("timed out"));
    }

    #[test]
    fn test_persistence_failure_is_a_database_error() {
        let error = ErrorResponse::from_app_error(AppError::Generation(
            GenerationError::Persistence("disk full".to_string()),
        ));
        assert_eq!(error.error_type, ErrorType::Database);
        assert!(!error.retryable);
    }

    #[test]
    fn test_locked_tier_is_a_domain_error() {
        let error = ErrorResponse::from_app_error(AppError::Domain(
            DomainError::InvalidStateTransition("tier is locked".to_string()),
        ));
        assert_eq!(error.error_type, ErrorType::DomainError);
    }

    #[test]
    fn test_validation_error() {
        let error = ErrorResponse::validation("Invalid input".to_string());
        assert_eq!(error.error_type, ErrorType::Validation);
        assert_eq!(error.message, "Invalid input");
    }

    #[test]
    fn test_serialization() {
        let error = ErrorResponse::not_found("Deck");
        let json = serde_json::to_string(&error).unwrap();
        assert!(json.contains("not_found"));
        assert!(json.contains("Deck not found"));
    }

    #[test]
    fn test_result_conversion() {
        let result: Result<(), AppError> = Err(AppError::NotFound);
        let message = result.to_error_response().unwrap_err();
        assert!(message.contains("\"error_type\":\"not_found\""));
    }
}
