//! Centralized error types for the CityWeather service.
//!
//! This module provides a typed error hierarchy that:
//! - Separates client mistakes (bad input) from server-side failures
//! - Maps every failure onto exactly one HTTP status code
//! - Preserves the underlying cause for logging

use thiserror::Error;

/// Top-level error type for one request.
///
/// Every component error converts into this type. Only the request handler
/// decides what the caller sees, via `status_code()`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Upstream fetch error: {0}")]
    Upstream(#[from] UpstreamError),

    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AppError {
    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// HTTP status code reported to the caller for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            AppError::Validation(_) => 400,
            AppError::Config(_)
            | AppError::Upstream(_)
            | AppError::Persistence(_)
            | AppError::Serialization(_) => 500,
        }
    }

    /// Whether the request itself was at fault.
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status_code())
    }
}

/// Configuration errors surfaced while serving a request.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Missing required setting: {0}")]
    MissingSetting(String),
}

/// Errors talking to the upstream weather provider.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Transport failure: {0}")]
    Transport(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Provider returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Failed to decode provider response: {0}")]
    Decode(String),
}

/// Durable store errors.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Store connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Data corruption detected: {0}")]
    Corruption(String),

    #[error("Store task failed: {0}")]
    TaskFailed(String),
}

/// Extension trait for converting reqwest errors to our error types.
pub trait ReqwestErrorExt {
    fn into_upstream_error(self) -> UpstreamError;
}

impl ReqwestErrorExt for reqwest::Error {
    fn into_upstream_error(self) -> UpstreamError {
        if self.is_timeout() {
            UpstreamError::Timeout
        } else if self.is_decode() {
            UpstreamError::Decode(self.to_string())
        } else if let Some(status) = self.status() {
            UpstreamError::Status {
                status: status.as_u16(),
                body: self.to_string(),
            }
        } else {
            UpstreamError::Transport(self.to_string())
        }
    }
}

/// Extension trait for converting rusqlite errors to our error types.
pub trait RusqliteErrorExt {
    fn into_persistence_error(self) -> PersistenceError;
}

impl RusqliteErrorExt for rusqlite::Error {
    fn into_persistence_error(self) -> PersistenceError {
        match &self {
            rusqlite::Error::SqliteFailure(_, Some(msg)) if msg.contains("corrupt") => {
                PersistenceError::Corruption(self.to_string())
            }
            rusqlite::Error::FromSqlConversionFailure(..) => {
                PersistenceError::Corruption(self.to_string())
            }
            rusqlite::Error::SqliteFailure(err, _)
                if err.code == rusqlite::ErrorCode::CannotOpen =>
            {
                PersistenceError::ConnectionFailed(self.to_string())
            }
            _ => PersistenceError::QueryFailed(self.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn test_validation_maps_to_400() {
        let err = AppError::validation("city is required");
        assert_eq!(err.status_code(), 400);
        assert!(err.is_client_error());
    }

    #[test]
    fn test_server_side_errors_map_to_500() {
        let errors = vec![
            AppError::Config(ConfigError::MissingSetting("provider.api_key".into())),
            AppError::Upstream(UpstreamError::Timeout),
            AppError::Persistence(PersistenceError::QueryFailed("disk full".into())),
        ];

        for err in errors {
            assert_eq!(err.status_code(), 500, "{err}");
            assert!(!err.is_client_error());
        }
    }

    #[test]
    fn test_upstream_status_in_message() {
        let err = UpstreamError::Status {
            status: 429,
            body: "Too Many Requests".into(),
        };
        assert!(err.to_string().contains("429"));
        assert!(err.to_string().contains("Too Many Requests"));
    }

    #[test]
    fn test_config_error_conversion() {
        let err: UpstreamError = ConfigError::MissingSetting("provider.api_key".into()).into();
        let app_err: AppError = err.into();
        assert!(matches!(
            app_err,
            AppError::Upstream(UpstreamError::Config(ConfigError::MissingSetting(_)))
        ));
        assert!(app_err.to_string().contains("provider.api_key"));
    }

    #[test]
    fn test_rusqlite_error_maps_to_query_failed() {
        let err = rusqlite::Error::QueryReturnedNoRows.into_persistence_error();
        assert!(matches!(err, PersistenceError::QueryFailed(_)));
    }

    #[test]
    fn test_unreadable_column_maps_to_corruption() {
        let cause = "not a timestamp".parse::<i64>().unwrap_err();
        let err = rusqlite::Error::FromSqlConversionFailure(
            5,
            rusqlite::types::Type::Text,
            Box::new(cause),
        )
        .into_persistence_error();
        assert!(matches!(err, PersistenceError::Corruption(_)), "{err:?}");
    }
}
