//! Error types for td operations.

use std::fmt;
use std::io;

use crate::remote::RemoteError;

/// All possible td errors.
#[derive(Debug)]
pub enum TdError {
    /// A local file system read, write, copy or rename failed.
    Storage(io::Error),
    /// The settings file could not be parsed or written.
    Json(serde_json::Error),
    /// The remote store rejected or failed a request.
    Remote(RemoteError),
    /// The named topic is not in the index.
    UnknownTopic {
        name: String,
        /// Known names close to the one requested, best match first.
        suggestions: Vec<String>,
    },
    /// The topic is indexed locally but has no remote id to address it by.
    NoRemoteId(String),
    /// A topic with this name is already in the index.
    TopicExists(String),
    /// The name cannot be used as a mirror file name.
    InvalidName(String),
    /// Neither `$TD` nor `$HOME` is set.
    MissingEnvironment,
    /// Could not acquire the store lock within the timeout.
    LockTimeout,
    /// Invalid or incomplete configuration.
    Config(String),
}

impl fmt::Display for TdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TdError::Storage(e) => write!(f, "storage error: {e}"),
            TdError::Json(e) => write!(f, "JSON error: {e}"),
            TdError::Remote(e) => write!(f, "remote error: {e}"),
            TdError::UnknownTopic { name, .. } => write!(f, "the topic '{name}' does not exist"),
            TdError::NoRemoteId(name) => {
                write!(f, "the topic '{name}' has no remote id, run `td fetch` first")
            }
            TdError::TopicExists(name) => write!(f, "the topic '{name}' already exists"),
            TdError::InvalidName(name) => write!(f, "'{name}' is not a valid topic name"),
            TdError::MissingEnvironment => {
                write!(f, "you don't have the $HOME environment variable set")
            }
            TdError::LockTimeout => write!(f, "could not acquire the store lock within timeout"),
            TdError::Config(msg) => write!(f, "configuration error: {msg}"),
        }
    }
}

impl std::error::Error for TdError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TdError::Storage(e) => Some(e),
            TdError::Json(e) => Some(e),
            TdError::Remote(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for TdError {
    fn from(e: io::Error) -> Self {
        TdError::Storage(e)
    }
}

impl From<serde_json::Error> for TdError {
    fn from(e: serde_json::Error) -> Self {
        TdError::Json(e)
    }
}

impl From<RemoteError> for TdError {
    fn from(e: RemoteError) -> Self {
        TdError::Remote(e)
    }
}

/// Convenience alias for Results in td.
pub type TdResult<T> = Result<T, TdError>;
