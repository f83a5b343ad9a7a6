//! Domain-level error types.
//!
//! These errors are transport agnostic. Inbound adapters map each
//! [`ErrorCode`] to a protocol status (see `inbound::http::error`) and
//! serialise the payload as
//! `{ "code": ..., "message": ..., "details": [...] }`.
//!
//! Errors promoted from unexpected failures keep their original cause in a
//! private, never-serialised slot so adapters can log it while clients only
//! see the generic [`INTERNAL_MESSAGE`].

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Message returned to clients for every [`ErrorCode::Internal`] error.
pub const INTERNAL_MESSAGE: &str = "Internal Error";

const NOT_FOUND_MESSAGE: &str = "Not Found";

/// Closed set of failure categories.
///
/// Every code maps to exactly one HTTP status; the mapping is an exhaustive
/// `match`, so adding a variant without a status fails to compile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// The client specified an invalid argument regardless of system state.
    InvalidArgument,
    /// The system is not in a state required for the operation.
    FailedPrecondition,
    /// The requested entity was not found.
    NotFound,
    /// The entity a client tried to create already exists.
    AlreadyExists,
    /// The caller lacks valid authentication credentials.
    Unauthenticated,
    /// The caller may not execute the operation.
    PermissionDenied,
    /// The caller exhausted a rate limit or quota.
    TooManyRequests,
    /// Part of the underlying system is broken.
    Internal,
    /// The failure could not be classified.
    Unknown,
    /// The service is temporarily unavailable; retry with backoff.
    Unavailable,
}

impl ErrorCode {
    /// Every code, in declaration order.
    pub const ALL: [Self; 10] = [
        Self::InvalidArgument,
        Self::FailedPrecondition,
        Self::NotFound,
        Self::AlreadyExists,
        Self::Unauthenticated,
        Self::PermissionDenied,
        Self::TooManyRequests,
        Self::Internal,
        Self::Unknown,
        Self::Unavailable,
    ];

    /// Wire representation of the code.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidArgument => "INVALID_ARGUMENT",
            Self::FailedPrecondition => "FAILED_PRECONDITION",
            Self::NotFound => "NOT_FOUND",
            Self::AlreadyExists => "ALREADY_EXISTS",
            Self::Unauthenticated => "UNAUTHENTICATED",
            Self::PermissionDenied => "PERMISSION_DENIED",
            Self::TooManyRequests => "TOO_MANY_REQUESTS",
            Self::Internal => "INTERNAL",
            Self::Unknown => "UNKNOWN",
            Self::Unavailable => "UNAVAILABLE",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single field-scoped validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldViolation {
    pub field: String,
    pub description: String,
}

impl FieldViolation {
    pub fn new(field: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            description: description.into(),
        }
    }
}

/// Structured detail attached to an [`Error`], tagged by `@type`.
///
/// ```json
/// { "@type": "BAD_REQUEST", "fieldViolations": [{ "field": "title", "description": "..." }] }
/// { "@type": "ERROR_INFO", "reason": "...", "metadata": {} }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "@type")]
pub enum ErrorDetail {
    #[serde(rename = "BAD_REQUEST")]
    BadRequest {
        #[serde(rename = "fieldViolations")]
        field_violations: Vec<FieldViolation>,
    },
    #[serde(rename = "ERROR_INFO")]
    ErrorInfo {
        reason: String,
        #[serde(default)]
        metadata: Map<String, Value>,
    },
}

impl ErrorDetail {
    /// Build an `ERROR_INFO` detail with empty metadata.
    pub fn error_info(reason: impl Into<String>) -> Self {
        Self::ErrorInfo {
            reason: reason.into(),
            metadata: Map::new(),
        }
    }
}

/// Classified application failure.
///
/// # Examples
/// ```
/// use snippetbox::domain::{Error, ErrorCode, FieldViolation};
///
/// let err = Error::bad_request(
///     "invalid form",
///     [FieldViolation::new("expires", "invalid digit found in string")],
/// );
/// assert_eq!(err.code(), ErrorCode::InvalidArgument);
/// assert_eq!(err.details().len(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Error {
    code: ErrorCode,
    message: String,
    #[serde(default)]
    details: Vec<ErrorDetail>,
    #[serde(skip)]
    cause: Option<String>,
}

impl Error {
    /// Create an error with the given code and client-visible message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: Vec::new(),
            cause: None,
        }
    }

    /// `INVALID_ARGUMENT` carrying one `BAD_REQUEST` detail when
    /// `violations` is non-empty.
    pub fn bad_request(
        message: impl Into<String>,
        violations: impl IntoIterator<Item = FieldViolation>,
    ) -> Self {
        let field_violations: Vec<FieldViolation> = violations.into_iter().collect();
        let err = Self::new(ErrorCode::InvalidArgument, message);
        if field_violations.is_empty() {
            err
        } else {
            err.with_detail(ErrorDetail::BadRequest { field_violations })
        }
    }

    /// `NOT_FOUND`; an empty message falls back to `"Not Found"`.
    pub fn not_found(
        message: impl Into<String>,
        details: impl IntoIterator<Item = ErrorDetail>,
    ) -> Self {
        let message = message.into();
        let message = if message.trim().is_empty() {
            NOT_FOUND_MESSAGE.to_owned()
        } else {
            message
        };
        let mut err = Self::new(ErrorCode::NotFound, message);
        err.details.extend(details);
        err
    }

    /// `INTERNAL` with the fixed generic message.
    pub fn internal() -> Self {
        Self::new(ErrorCode::Internal, INTERNAL_MESSAGE)
    }

    /// `INTERNAL` remembering `cause` for server-side logging only.
    pub fn internal_from(cause: impl fmt::Display) -> Self {
        Self::internal().with_cause(cause)
    }

    /// Convenience constructor for [`ErrorCode::FailedPrecondition`].
    pub fn failed_precondition(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::FailedPrecondition, message)
    }

    /// Convenience constructor for [`ErrorCode::AlreadyExists`].
    pub fn already_exists(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::AlreadyExists, message)
    }

    /// Convenience constructor for [`ErrorCode::Unauthenticated`].
    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthenticated, message)
    }

    /// Convenience constructor for [`ErrorCode::PermissionDenied`].
    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::PermissionDenied, message)
    }

    /// Convenience constructor for [`ErrorCode::TooManyRequests`].
    pub fn too_many_requests(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::TooManyRequests, message)
    }

    /// Convenience constructor for [`ErrorCode::Unavailable`].
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unavailable, message)
    }

    /// Stable machine-readable error code.
    pub fn code(&self) -> ErrorCode {
        self.code
    }

    /// Client-visible message.
    pub fn message(&self) -> &str {
        self.message.as_str()
    }

    /// Structured details in insertion order.
    pub fn details(&self) -> &[ErrorDetail] {
        &self.details
    }

    /// Server-side cause, never serialised.
    pub fn cause(&self) -> Option<&str> {
        self.cause.as_deref()
    }

    /// Append a structured detail.
    pub fn with_detail(mut self, detail: ErrorDetail) -> Self {
        self.details.push(detail);
        self
    }

    /// Record the server-side cause of this error.
    pub fn with_cause(mut self, cause: impl fmt::Display) -> Self {
        self.cause = Some(cause.to_string());
        self
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.cause {
            Some(cause) => write!(f, "{}: {} ({cause})", self.code, self.message),
            None => write!(f, "{}: {}", self.code, self.message),
        }
    }
}

impl std::error::Error for Error {}
