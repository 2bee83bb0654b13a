//! Application error types

use thiserror::Error;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Transport-level failure (connection refused, timeout, bad body)
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Server answered with `success: false`
    #[error("{0}")]
    Application(String),

    #[error("Validation error: {0}")]
    Validation(String),

    /// Id is not present in the local company cache
    #[error("Company not found in cache: {0}")]
    StaleReference(i64),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Whether the failure happened before any request left the client
    pub fn is_client_side(&self) -> bool {
        matches!(
            self,
            AppError::Validation(_) | AppError::StaleReference(_) | AppError::InvalidState(_)
        )
    }
}

/// Stable code plus message shown to the operator
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

impl From<&AppError> for ErrorResponse {
    fn from(err: &AppError) -> Self {
        let code = match err {
            AppError::Network(_) => "NETWORK_ERROR",
            AppError::Application(_) => "APPLICATION_ERROR",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::StaleReference(_) => "NOT_FOUND",
            AppError::InvalidState(_) => "INVALID_STATE",
            AppError::Serialization(_) => "SERIALIZATION_ERROR",
            AppError::Url(_) => "CONFIG_ERROR",
            AppError::Config(_) => "CONFIG_ERROR",
            AppError::Io(_) => "IO_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        };

        ErrorResponse {
            code: code.to_string(),
            message: err.to_string(),
        }
    }
}

impl From<AppError> for ErrorResponse {
    fn from(err: AppError) -> Self {
        ErrorResponse::from(&err)
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let resp = ErrorResponse::from(AppError::Validation("bad symbol".to_string()));
        assert_eq!(resp.code, "VALIDATION_ERROR");
        assert!(resp.message.contains("bad symbol"));

        let resp = ErrorResponse::from(AppError::StaleReference(42));
        assert_eq!(resp.code, "NOT_FOUND");
        assert!(resp.message.contains("42"));
    }

    #[test]
    fn test_application_error_keeps_server_message() {
        let err = AppError::Application("企業が見つかりません".to_string());
        assert_eq!(err.to_string(), "企業が見つかりません");
        assert!(!err.is_client_side());
    }

    #[test]
    fn test_io_error_code() {
        let err = AppError::from(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        assert_eq!(ErrorResponse::from(&err).code, "IO_ERROR");
        assert!(!err.is_client_side());
    }
}
