//! Defines the custom `Error` and `Result` types for the server.

use std::fmt;

/// The primary error type for the server.
///
/// Transport-level failures (unknown sessions, closed channels) are resolved
/// by the message endpoint; tool-level failures are turned into error payloads
/// by the dispatcher. Only bootstrap failures are expected to reach `main`.
#[derive(Debug)]
pub enum Error {
    /// An error that occurred during I/O (stdio pipe, listener bind).
    Io(std::io::Error),

    /// An error that occurred during JSON serialization or deserialization.
    Serialization(serde_json::Error),

    /// The HTTP request to the content platform could not be completed.
    Http(reqwest::Error),

    /// The content platform answered with a non-success status.
    Api { status: u16, message: String },

    /// Missing or invalid configuration.
    Config(String),

    /// A content-platform call was made before `authenticate` succeeded.
    NotAuthenticated,

    /// A session with this id is already registered.
    SessionExists(String),

    /// A request with this id is already awaiting a reply on the session.
    DuplicateRequest(String),

    /// A session channel was closed, usually because its stream went away.
    ChannelClosed,

    /// A general-purpose error for miscellaneous issues.
    Other(String),
}

/// A specialized `Result` type for the server.
pub type Result<T> = std::result::Result<T, Error>;

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::Serialization(e) => write!(f, "Serialization error: {}", e),
            Error::Http(e) => write!(f, "HTTP error: {}", e),
            Error::Api { status, message } => {
                write!(f, "Medium API error (status {}): {}", status, message)
            }
            Error::Config(msg) => write!(f, "Configuration error: {}", msg),
            Error::NotAuthenticated => write!(f, "Not authenticated with Medium"),
            Error::SessionExists(id) => write!(f, "Session '{}' is already registered", id),
            Error::DuplicateRequest(id) => {
                write!(f, "Request id {} is already in flight on this session", id)
            }
            Error::ChannelClosed => write!(f, "Session channel closed"),
            Error::Other(msg) => write!(f, "An internal error occurred: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::Serialization(e) => Some(e),
            Error::Http(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err)
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Http(err)
    }
}

impl<T> From<tokio::sync::mpsc::error::SendError<T>> for Error {
    fn from(_: tokio::sync::mpsc::error::SendError<T>) -> Self {
        Error::ChannelClosed
    }
}

impl From<tokio::sync::oneshot::error::RecvError> for Error {
    fn from(_: tokio::sync::oneshot::error::RecvError) -> Self {
        Error::ChannelClosed
    }
}

impl From<String> for Error {
    fn from(msg: String) -> Self {
        Error::Other(msg)
    }
}

impl From<&str> for Error {
    fn from(msg: &str) -> Self {
        Error::Other(msg.to_string())
    }
}
