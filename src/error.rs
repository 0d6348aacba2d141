//! Error types
//!
//! `Error` covers misuse of the emulation API (bad header names, unknown
//! statuses, invalid cookie directives). `TransferError` is the terminal
//! failure of a single file transfer and always maps to an HTTP status.

use std::io;
use thiserror::Error;

/// Crate-wide result alias
pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("unknown status: {0}")]
    UnknownStatus(String),

    #[error("invalid cookie directive: {0}")]
    InvalidDirective(String),

    #[error("invalid cookie name: {0}")]
    InvalidCookieName(String),

    #[error("invalid header `{name}`")]
    InvalidHeader { name: String },

    #[error("cannot modify response: headers already sent")]
    HeadersSent,

    #[error("invalid duration: {0}")]
    InvalidDuration(String),

    #[error("failed to serialize body: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("logger error: {0}")]
    Logger(String),
}

/// Terminal failure of a transfer
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransferError {
    #[error("malformed path")]
    MalformedPath,

    #[error("path traversal rejected")]
    Traversal,

    #[error("dotfile access denied")]
    DotfileDenied,

    #[error("directory access forbidden")]
    DirectoryForbidden,

    #[error("not found")]
    NotFound,

    #[error("precondition failed")]
    PreconditionFailed,

    #[error("range not satisfiable for length {length}")]
    UnsatisfiableRange { length: u64 },

    #[error("stat failed: {message}")]
    StatFailure { kind: io::ErrorKind, message: String },

    #[error("stream failed: {message}")]
    StreamFailure { message: String },

    #[error("cannot set headers after they are sent")]
    HeadersSent,

    #[error("transfer aborted")]
    Aborted,
}

impl TransferError {
    /// HTTP status reported for this failure
    pub const fn status(&self) -> u16 {
        match self {
            Self::MalformedPath | Self::Aborted => 400,
            Self::Traversal | Self::DotfileDenied | Self::DirectoryForbidden => 403,
            Self::NotFound => 404,
            Self::PreconditionFailed => 412,
            Self::UnsatisfiableRange { .. } => 416,
            Self::StatFailure { .. } | Self::StreamFailure { .. } | Self::HeadersSent => 500,
        }
    }

    /// Classify a stat error: missing or unreachable names are 404, the rest 500
    pub fn from_stat(err: &io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound
            | io::ErrorKind::NotADirectory
            | io::ErrorKind::InvalidFilename => Self::NotFound,
            kind => Self::StatFailure {
                kind,
                message: err.to_string(),
            },
        }
    }

    pub fn from_stream(err: &io::Error) -> Self {
        Self::StreamFailure {
            message: err.to_string(),
        }
    }

    /// Headers the protocol requires on the error response
    pub fn mandated_headers(&self) -> Vec<(&'static str, String)> {
        match self {
            Self::UnsatisfiableRange { length } => {
                vec![("content-range", format!("bytes */{length}"))]
            }
            _ => Vec::new(),
        }
    }
}
