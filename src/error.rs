// Error taxonomy for user-facing operations.
//
// `RemoteError` describes what went wrong on the wire; `Error` is what the
// shells see, always carrying the operation and its target so the message
// printed to the user is self-explanatory.

use std::path::PathBuf;
use thiserror::Error;

/// Failure talking to the remote service.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The service answered with a non-success HTTP status.
    #[error("remote returned {status}: {message}")]
    Status { status: u16, message: String },
    /// The request never produced a response (DNS, TLS, timeout, ...).
    #[error(transparent)]
    Transport(#[from] reqwest::Error),
    /// A response arrived but did not have the expected shape.
    #[error("unexpected response: {0}")]
    Decode(String),
}

impl RemoteError {
    pub fn status(&self) -> Option<u16> {
        match self {
            RemoteError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    pub fn is_auth(&self) -> bool {
        matches!(self.status(), Some(400) | Some(401) | Some(403))
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("API key rejected: {0}")]
    Auth(String),

    #[error("no API key configured for this session; configure one first")]
    NotConfigured,

    #[error("unsupported file format `{extension}` for {} (expected pdf, txt, docx, csv or json)", path.display())]
    UnsupportedFormat { path: PathBuf, extension: String },

    #[error("could not read {}", path.display())]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("upload of {} failed", path.display())]
    Upload {
        path: PathBuf,
        #[source]
        source: RemoteError,
    },

    #[error("search in {file} failed: {reason}")]
    Search {
        file: String,
        reason: String,
        #[source]
        source: Option<RemoteError>,
    },

    #[error("{operation} {target}: not found")]
    NotFound {
        operation: &'static str,
        target: String,
        #[source]
        source: RemoteError,
    },

    #[error("{operation} {target} failed")]
    Network {
        operation: &'static str,
        target: String,
        #[source]
        source: RemoteError,
    },

    #[error("could not export history to {}", path.display())]
    Export {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

/// Render an error with its full cause chain on one line, for stderr and
/// the interactive shell.
pub fn describe(err: &(dyn std::error::Error + 'static)) -> String {
    let mut message = err.to_string();
    let mut cause = err.source();
    while let Some(inner) = cause {
        message.push_str(": ");
        message.push_str(&inner.to_string());
        cause = inner.source();
    }
    message
}
