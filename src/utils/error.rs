// src/utils/error.rs

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

pub type PulseResult<T> = Result<T, PulseError>;

/// Custom error details for additional context
pub type ErrorDetails = HashMap<String, serde_json::Value>;

/// Main error type for the monitoring core
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PulseError {
    pub message: String,
    pub details: Option<Box<ErrorDetails>>,
    pub status: Option<u16>,
    pub error_code: Option<String>,
    pub operation: Option<String>,
    pub kind: ErrorKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    #[default]
    UnknownError,
    ProbeError,
    NetworkError,
    DatabaseError,
    ValidationError,
    ConfigurationError,
    SerializationError,
    TimeoutError,
    NotFoundError,
    AuthorizationError,
    NotificationError,
    SchedulerError,
    Internal,
}

impl fmt::Display for PulseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for PulseError {}

impl PulseError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            details: None,
            status: None,
            error_code: None,
            operation: None,
            kind,
        }
    }

    pub fn with_details(mut self, details: ErrorDetails) -> Self {
        self.details = Some(Box::new(details));
        self
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_code(mut self, error_code: impl Into<String>) -> Self {
        self.error_code = Some(error_code.into());
        self
    }

    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = Some(operation.into());
        self
    }

    // Convenience constructors for common error types
    pub fn probe_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ProbeError, message).with_code("PROBE_ERROR")
    }

    pub fn network_error<T: Into<String>>(message: T) -> Self {
        Self::new(ErrorKind::NetworkError, message)
            .with_status(503)
            .with_code("NETWORK_ERROR")
    }

    pub fn database_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::DatabaseError, message)
            .with_status(500)
            .with_code("DATABASE_ERROR")
    }

    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ValidationError, message)
            .with_status(400)
            .with_code("VALIDATION_ERROR")
    }

    pub fn configuration_error<T: Into<String>>(message: T) -> Self {
        Self::new(ErrorKind::ConfigurationError, message)
            .with_status(500)
            .with_code("CONFIG_ERROR")
    }

    pub fn serialization_error<T: Into<String>>(message: T) -> Self {
        Self::new(ErrorKind::SerializationError, message)
            .with_status(400)
            .with_code("SERIALIZATION_ERROR")
    }

    pub fn timeout_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TimeoutError, message)
            .with_status(408)
            .with_code("TIMEOUT_ERROR")
    }

    pub fn not_found<T: Into<String>>(message: T) -> Self {
        Self::new(ErrorKind::NotFoundError, message)
            .with_status(404)
            .with_code("NOT_FOUND")
    }

    pub fn access_denied(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::AuthorizationError, message)
            .with_status(403)
            .with_code("ACCESS_DENIED")
    }

    pub fn notification_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotificationError, message)
            .with_status(502)
            .with_code("NOTIFICATION_ERROR")
    }

    pub fn scheduler_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::SchedulerError, message).with_code("SCHEDULER_ERROR")
    }

    pub fn internal_error<T: Into<String>>(message: T) -> Self {
        Self::new(ErrorKind::Internal, message)
            .with_status(500)
            .with_code("INTERNAL_ERROR")
    }
}

// Implement From conversions for common error types
impl From<serde_json::Error> for PulseError {
    fn from(err: serde_json::Error) -> Self {
        PulseError::serialization_error(format!("JSON error: {}", err))
    }
}

impl From<url::ParseError> for PulseError {
    fn from(err: url::ParseError) -> Self {
        PulseError::configuration_error(format!("URL parse error: {}", err))
    }
}

impl From<reqwest::Error> for PulseError {
    fn from(err: reqwest::Error) -> Self {
        let mut error = PulseError::network_error(format!("HTTP error: {}", err));
        if let Some(status) = err.status() {
            error = error.with_status(status.as_u16());
        }
        error
    }
}

impl From<String> for PulseError {
    fn from(err: String) -> Self {
        Self::validation_error(err)
    }
}

impl From<&str> for PulseError {
    fn from(err: &str) -> Self {
        Self::validation_error(err.to_string())
    }
}
