//! Unified error type.
//!
//! Every failure a dispatch can hit, routing, handler resolution, container
//! lookups, view rendering or the handler itself, is an [`Error`]. The
//! dispatcher never recovers from one locally: they all travel up to the
//! error boundary in [`App::dispatch`](crate::App::dispatch), which turns
//! them into exactly one error response.

use std::fmt;
use std::io;
use std::panic::Location;
use std::path::PathBuf;

use serde::Serialize;

use crate::method::Method;
use crate::status::Status;

/// What went wrong.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ErrorKind {
    /// No registered route matches the URI.
    #[error("404 Not Found")]
    RouteNotFound,

    /// A route matches the URI but was declared for another verb.
    #[error("Invalid HTTP method. Expected {expected}")]
    MethodMismatch { expected: Method, actual: Method },

    /// The request carried a verb no route can be registered under.
    #[error("Invalid HTTP method `{0}`")]
    UnsupportedMethod(String),

    /// A controller or one of its actions is missing from the registry.
    #[error("{0}")]
    HandlerNotFound(String),

    #[error("Container not found: {0}")]
    ContainerKeyNotFound(String),

    #[error("Container {0} does not hold the requested type")]
    ContainerType(String),

    /// Raised by a handler or middleware, or a panic caught while running one.
    #[error("{0}")]
    HandlerExecution(String),

    /// A handler-chosen failure with an explicit status code.
    #[error("{message}")]
    Http { status: u16, message: String },

    #[error("invalid route pattern `{template}`: {reason}")]
    InvalidPattern { template: String, reason: String },

    /// No repository or service is bound for the requested interface.
    #[error("{kind} not found: {interface}")]
    InterfaceNotFound { kind: &'static str, interface: String },

    /// The requested interface does not carry its kind in its name, e.g. a
    /// repository lookup for `dyn Mailer`.
    #[error("Invalid interface or missing '{}' keyword: {interface}", kind.to_lowercase())]
    InvalidInterface { kind: &'static str, interface: String },

    /// A `multipart/form-data` body that could not be read.
    #[error("multipart: {0}")]
    Multipart(#[from] multer::Error),

    #[error("view `{}` could not be read: {source}", path.display())]
    View {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("io: {0}")]
    Io(#[from] io::Error),

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
}

/// The error type returned by sprig's fallible operations.
///
/// Carries the source line it was created on, reported to clients as
/// `error_line` in the JSON error payload.
#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    line: u32,
}

impl Error {
    #[track_caller]
    pub fn new(kind: ErrorKind) -> Self {
        Self { kind, line: Location::caller().line() }
    }

    /// A failure raised from handler code. Surfaced as `500`.
    #[track_caller]
    pub fn handler(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::HandlerExecution(message.into()))
    }

    /// A failure with a status of the handler's choosing, e.g. `401` from an
    /// authentication middleware.
    #[track_caller]
    pub fn http(status: Status, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Http { status: status.into(), message: message.into() })
    }

    pub fn kind(&self) -> &ErrorKind { &self.kind }
    pub fn line(&self) -> u32 { self.line }

    /// The HTTP status this error is surfaced as.
    pub fn code(&self) -> u16 {
        match &self.kind {
            ErrorKind::RouteNotFound => Status::NotFound.into(),
            ErrorKind::MethodMismatch { .. } | ErrorKind::UnsupportedMethod(_) => {
                Status::MethodNotAllowed.into()
            }
            ErrorKind::Multipart(_) => Status::BadRequest.into(),
            ErrorKind::Http { status, .. } => *status,
            _ => Status::InternalServerError.into(),
        }
    }

    /// The structured body written by the error boundary.
    pub fn payload(&self) -> ErrorPayload {
        ErrorPayload {
            data: None,
            message: self.to_string(),
            error_line: self.line,
            code: self.code(),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.kind, f)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        std::error::Error::source(&self.kind)
    }
}

impl From<ErrorKind> for Error {
    #[track_caller]
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}

impl From<io::Error> for Error {
    #[track_caller]
    fn from(e: io::Error) -> Self {
        Self::new(ErrorKind::Io(e))
    }
}

impl From<serde_json::Error> for Error {
    #[track_caller]
    fn from(e: serde_json::Error) -> Self {
        Self::new(ErrorKind::Json(e))
    }
}

impl From<multer::Error> for Error {
    #[track_caller]
    fn from(e: multer::Error) -> Self {
        Self::new(ErrorKind::Multipart(e))
    }
}

/// `{"data": null, "message": …, "error_line": …, "code": …}`
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ErrorPayload {
    pub data: Option<()>,
    pub message: String,
    pub error_line: u32,
    pub code: u16,
}

impl ErrorPayload {
    pub fn to_json(&self) -> Vec<u8> {
        serde_json::to_vec_pretty(self).unwrap_or_default()
    }
}
