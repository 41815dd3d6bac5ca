//! Error types and error codes for Tollgate
//!
//! This module defines:
//! - `TollgateError`: review workflow error enum
//! - `AppError`: Wrapper for integration with web frameworks
//! - `ErrorCode`: Structured error codes for API responses

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

/// Review workflow error types
#[derive(thiserror::Error, Debug)]
pub enum TollgateError {
    /// Input rejected before any write (missing user, empty table list, ...)
    #[error("caused: {0}")]
    Validation(String),

    /// The submitted snapshots contain no changed record
    #[error("no changes detected")]
    NoChanges,

    /// One or more target tables are held by a pending change request
    #[error("table(s) locked by a pending change request: {}", .0.join(", "))]
    TableLocked(Vec<String>),

    #[error("{0} not found")]
    NotFound(String),

    /// Underlying store operation failed
    #[error("database error: {0}")]
    Persistence(anyhow::Error),

    /// Table decisions were recorded but the follow-up step failed
    #[error("partial apply on change request '{request_id}': {message}")]
    PartialApply { request_id: String, message: String },
}

impl TollgateError {
    pub fn validation(message: impl Into<String>) -> Self {
        TollgateError::Validation(message.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        TollgateError::NotFound(what.into())
    }

    /// Structured error code for API envelopes
    pub fn error_code(&self) -> ErrorCode<'static> {
        match self {
            TollgateError::Validation(_) => PARAMETER_VALIDATE_ERROR,
            TollgateError::NoChanges => NO_CHANGES_DETECTED,
            TollgateError::TableLocked(_) => TABLE_LOCKED,
            TollgateError::NotFound(_) => RESOURCE_NOT_FOUND,
            TollgateError::Persistence(_) => DATA_ACCESS_ERROR,
            TollgateError::PartialApply { .. } => PARTIAL_APPLY,
        }
    }

    /// HTTP status the error is surfaced with
    pub fn http_status(&self) -> u16 {
        match self {
            TollgateError::Validation(_) => 400,
            // informational, the request was well formed
            TollgateError::NoChanges => 200,
            TollgateError::TableLocked(_) => 409,
            TollgateError::NotFound(_) => 404,
            TollgateError::Persistence(_) | TollgateError::PartialApply { .. } => 500,
        }
    }

    /// Whether the error is a user-facing message rather than a failure
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            TollgateError::Validation(_)
                | TollgateError::NoChanges
                | TollgateError::TableLocked(_)
                | TollgateError::NotFound(_)
        )
    }
}

/// Typed errors travel through `anyhow` across the persistence seam and are
/// recovered here; everything else is a store failure.
impl From<anyhow::Error> for TollgateError {
    fn from(value: anyhow::Error) -> Self {
        match value.downcast::<TollgateError>() {
            Ok(e) => e,
            Err(e) => TollgateError::Persistence(e),
        }
    }
}

/// Wrapper for application errors
#[derive(Debug)]
pub struct AppError {
    inner: anyhow::Error,
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.inner)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(value: anyhow::Error) -> Self {
        AppError { inner: value }
    }
}

impl From<TollgateError> for AppError {
    fn from(value: TollgateError) -> Self {
        AppError {
            inner: anyhow::Error::new(value),
        }
    }
}

impl AppError {
    pub fn inner(&self) -> &anyhow::Error {
        &self.inner
    }

    pub fn downcast_ref<E: std::error::Error + Send + Sync + 'static>(&self) -> Option<&E> {
        self.inner.downcast_ref::<E>()
    }
}

/// Error code structure for API responses
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorCode<'a> {
    pub code: i32,
    pub message: &'a str,
}

pub const SUCCESS: ErrorCode<'static> = ErrorCode {
    code: 0,
    message: "success",
};

pub const PARAMETER_MISSING: ErrorCode<'static> = ErrorCode {
    code: 10000,
    message: "parameter missing",
};

pub const ACCESS_DENIED: ErrorCode<'static> = ErrorCode {
    code: 10001,
    message: "access denied",
};

pub const DATA_ACCESS_ERROR: ErrorCode<'static> = ErrorCode {
    code: 10002,
    message: "data access error",
};

pub const PARAMETER_VALIDATE_ERROR: ErrorCode<'static> = ErrorCode {
    code: 20002,
    message: "parameter validate error",
};

pub const RESOURCE_NOT_FOUND: ErrorCode<'static> = ErrorCode {
    code: 20004,
    message: "resource not found",
};

pub const TABLE_LOCKED: ErrorCode<'static> = ErrorCode {
    code: 30001,
    message: "table locked by a pending change request",
};

pub const NO_CHANGES_DETECTED: ErrorCode<'static> = ErrorCode {
    code: 30002,
    message: "no changes detected",
};

pub const PARTIAL_APPLY: ErrorCode<'static> = ErrorCode {
    code: 30003,
    message: "change request partially applied",
};

pub const SERVER_ERROR: ErrorCode<'static> = ErrorCode {
    code: 30000,
    message: "server error",
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_locked_message_names_tables() {
        let err = TollgateError::TableLocked(vec![
            "bulletin_pricing".to_string(),
            "program_config".to_string(),
        ]);
        assert_eq!(
            err.to_string(),
            "table(s) locked by a pending change request: bulletin_pricing, program_config"
        );
        assert_eq!(err.http_status(), 409);
        assert_eq!(err.error_code(), TABLE_LOCKED);
    }

    #[test]
    fn test_typed_error_survives_anyhow_roundtrip() {
        let wrapped: anyhow::Error = TollgateError::TableLocked(vec!["t1".to_string()]).into();
        let recovered = TollgateError::from(wrapped);
        assert!(matches!(recovered, TollgateError::TableLocked(ref t) if t == &["t1"]));
    }

    #[test]
    fn test_untyped_anyhow_becomes_persistence() {
        let recovered = TollgateError::from(anyhow::anyhow!("connection reset"));
        assert!(matches!(recovered, TollgateError::Persistence(_)));
        assert_eq!(recovered.to_string(), "database error: connection reset");
        assert!(!recovered.is_user_facing());
    }

    #[test]
    fn test_no_changes_is_informational() {
        let err = TollgateError::NoChanges;
        assert_eq!(err.http_status(), 200);
        assert!(err.is_user_facing());
    }

    #[test]
    fn test_app_error_downcast() {
        let app: AppError = TollgateError::not_found("change request 'abc'").into();
        let inner = app.downcast_ref::<TollgateError>().unwrap();
        assert_eq!(inner.to_string(), "change request 'abc' not found");
    }
}
