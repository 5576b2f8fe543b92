use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Faults raised by the crate's adapters, configuration and plumbing.
#[derive(Error, Debug)]
pub enum CseError {
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Configuration error: {0}")]
    ConfigError(#[from] config::ConfigError),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Invalid encryption key: {0}")]
    InvalidKey(String),
    #[error("Telemetry error: {0}")]
    TelemetryError(String),
    #[error("Callback executor is closed")]
    ExecutorClosed,
    #[error("Unexpected fault: {0}")]
    Fault(String),
}

pub type Result<T> = std::result::Result<T, CseError>;

/// Failure reported by an [`EncryptionService`](crate::domain::ports::EncryptionService).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// The service could not be reached or refused the request.
    #[error("request failed: {0}")]
    Request(String),
    /// The cryptographic transform itself failed.
    #[error("encryption failed: {0}")]
    Encryption(String),
}

/// Codes carried by an [`EncryptException`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EncryptExceptionCode {
    ValidationFailed,
    UnknownException,
    RequestFailed,
    EncryptionFailed,
    RequestInFlight,
}

impl EncryptExceptionCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ValidationFailed => "VALIDATION_FAILED",
            Self::UnknownException => "UNKNOWN_EXCEPTION",
            Self::RequestFailed => "REQUEST_FAILED",
            Self::EncryptionFailed => "ENCRYPTION_FAILED",
            Self::RequestInFlight => "REQUEST_IN_FLIGHT",
        }
    }
}

impl fmt::Display for EncryptExceptionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

type Cause = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The single error type delivered to an encrypt callback.
///
/// Field-level validation details are not carried here; they are exposed by
/// the orchestrator's `errors()` accessor.
#[derive(Error, Debug)]
#[error("{code}: {message}")]
pub struct EncryptException {
    code: EncryptExceptionCode,
    message: String,
    #[source]
    cause: Option<Cause>,
}

impl EncryptException {
    pub fn new(code: EncryptExceptionCode) -> Self {
        let message = match code {
            EncryptExceptionCode::ValidationFailed => "Validation failed",
            EncryptExceptionCode::UnknownException => "Unknown exception",
            EncryptExceptionCode::RequestFailed => "Request failed",
            EncryptExceptionCode::EncryptionFailed => "Encryption failed",
            EncryptExceptionCode::RequestInFlight => "An encryption request is already in flight",
        };
        Self {
            code,
            message: message.to_string(),
            cause: None,
        }
    }

    /// Wraps an underlying error, appending its description to the message.
    pub fn with_cause<E>(code: EncryptExceptionCode, cause: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        let mut exception = Self::new(code);
        exception.message = format!("{}: {}", exception.message, cause);
        exception.cause = Some(Box::new(cause));
        exception
    }

    pub fn code(&self) -> EncryptExceptionCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn cause(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        self.cause.as_deref()
    }
}

impl From<ServiceError> for EncryptException {
    fn from(err: ServiceError) -> Self {
        let code = match err {
            ServiceError::Request(_) => EncryptExceptionCode::RequestFailed,
            ServiceError::Encryption(_) => EncryptExceptionCode::EncryptionFailed,
        };
        Self::with_cause(code, err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exception_codes_render_as_wire_names() {
        assert_eq!(
            EncryptExceptionCode::ValidationFailed.to_string(),
            "VALIDATION_FAILED"
        );
        assert_eq!(
            EncryptExceptionCode::UnknownException.to_string(),
            "UNKNOWN_EXCEPTION"
        );
        assert_eq!(
            serde_json::to_string(&EncryptExceptionCode::RequestInFlight).unwrap(),
            "\"REQUEST_IN_FLIGHT\""
        );
    }

    #[test]
    fn test_service_error_maps_to_exception_code() {
        let request: EncryptException = ServiceError::Request("timeout".into()).into();
        assert_eq!(request.code(), EncryptExceptionCode::RequestFailed);
        assert!(request.message().contains("timeout"));
        assert!(request.cause().is_some());

        let encryption: EncryptException = ServiceError::Encryption("bad key".into()).into();
        assert_eq!(encryption.code(), EncryptExceptionCode::EncryptionFailed);
    }

    #[test]
    fn test_plain_exception_has_no_cause() {
        let e = EncryptException::new(EncryptExceptionCode::ValidationFailed);
        assert!(e.cause().is_none());
        assert_eq!(e.to_string(), "VALIDATION_FAILED: Validation failed");
    }
}
