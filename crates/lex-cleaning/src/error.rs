//! Error types for the cleaning pipeline.
//!
//! Only ingestion failures and cancellation abort a run. Everything that goes
//! wrong inside a cleaning stage is downgraded to a stage report by the
//! orchestrator, so the variants below mostly describe what can reach a caller
//! of [`Pipeline::process`](crate::pipeline::Pipeline::process) or
//! [`apply_filter`](crate::query::apply_filter).
//!
//! Errors serialize to `{code, message}` so they can be handed straight to a
//! JSON consumer. The message is the user-facing one from
//! [`CleaningError::user_message`], which never leaks engine internals.

use crate::config::ConfigValidationError;
use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CleaningError {
    /// The cancellation token was set while the run was in flight.
    #[error("Cleaning was cancelled")]
    Cancelled,

    /// The uploaded content could not be decoded into a frame.
    #[error("File could not be read: {message}")]
    Ingestion {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("No column named '{0}'")]
    ColumnNotFound(String),

    #[error("Configuration rejected: {0}")]
    InvalidConfig(String),

    #[error("Unexpected failure: {0}")]
    Internal(String),

    #[error("I/O failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("Frame operation failed: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("JSON encoding failed: {0}")]
    Json(#[from] serde_json::Error),

    /// Another error plus a note on what was being attempted.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<CleaningError>,
    },
}

impl CleaningError {
    /// Ingestion error that keeps the decoder's error as its source.
    pub fn ingestion<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Ingestion {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Ingestion error with no underlying cause.
    pub fn ingestion_msg(message: impl Into<String>) -> Self {
        Self::Ingestion {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_context(self, context: impl Into<String>) -> Self {
        Self::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Stable machine-readable code. Context wrappers report their source's code.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Cancelled => "CANCELLED",
            Self::Ingestion { .. } => "INGESTION_FAILED",
            Self::ColumnNotFound(_) => "COLUMN_NOT_FOUND",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::Internal(_) => "INTERNAL_ERROR",
            Self::Io(_) => "IO_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        match self {
            Self::Cancelled => true,
            Self::WithContext { source, .. } => source.is_cancelled(),
            _ => false,
        }
    }

    /// Single descriptive message suitable for end users.
    ///
    /// Ingestion and validation messages are surfaced verbatim. Engine
    /// failures (Polars, IO, internal) collapse to a generic sentence.
    pub fn user_message(&self) -> String {
        match self {
            Self::Cancelled
            | Self::Ingestion { .. }
            | Self::ColumnNotFound(_)
            | Self::InvalidConfig(_) => self.to_string(),
            Self::Internal(_) | Self::Io(_) | Self::Polars(_) | Self::Json(_) => {
                "The file could not be processed due to an internal error".to_string()
            }
            Self::WithContext { source, .. } => source.user_message(),
        }
    }
}

impl From<ConfigValidationError> for CleaningError {
    fn from(err: ConfigValidationError) -> Self {
        Self::InvalidConfig(err.to_string())
    }
}

impl Serialize for CleaningError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut fields = serializer.serialize_struct("CleaningError", 2)?;
        fields.serialize_field("code", self.error_code())?;
        fields.serialize_field("message", &self.user_message())?;
        fields.end()
    }
}

pub type Result<T> = std::result::Result<T, CleaningError>;

/// Attach a context note to a failing result.
pub trait ResultExt<T> {
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T, E: Into<CleaningError>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.into().with_context(context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        assert_eq!(CleaningError::Cancelled.error_code(), "CANCELLED");
        assert_eq!(
            CleaningError::ingestion_msg("empty").error_code(),
            "INGESTION_FAILED"
        );
        let wrapped = CleaningError::Cancelled.with_context("between stages");
        assert_eq!(wrapped.error_code(), "CANCELLED");
        assert!(wrapped.is_cancelled());
        assert!(!CleaningError::Internal("x".to_string()).is_cancelled());
    }

    #[test]
    fn test_ingestion_keeps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::InvalidData, "bad header");
        let error = CleaningError::ingestion("bad header", io);
        assert_eq!(error.user_message(), "File could not be read: bad header");
        assert!(std::error::Error::source(&error).is_some());
    }

    #[test]
    fn test_engine_details_stay_internal() {
        let error = CleaningError::Internal("thread pool poisoned".to_string());
        assert!(!error.user_message().contains("poisoned"));
    }

    #[test]
    fn test_serializes_code_and_message() {
        let value = serde_json::to_value(CleaningError::ColumnNotFound("Age".to_string())).unwrap();
        assert_eq!(value["code"], "COLUMN_NOT_FOUND");
        assert_eq!(value["message"], "No column named 'Age'");
    }

    #[test]
    fn test_config_errors_convert() {
        let error = CleaningError::from(ConfigValidationError::EmptyTableName);
        assert_eq!(error.error_code(), "INVALID_CONFIG");
    }

    #[test]
    fn test_context_on_foreign_errors() {
        let failed: std::result::Result<(), std::io::Error> = Err(std::io::Error::other("disk"));
        let error = failed.context("Writing export").unwrap_err();
        assert_eq!(error.to_string(), "Writing export: I/O failure: disk");
        assert_eq!(error.error_code(), "IO_ERROR");
    }
}
