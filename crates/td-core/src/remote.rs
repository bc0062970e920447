//! Remote — the authoritative topic store td synchronizes with.
//!
//! The engine only talks to the [`Remote`] trait. Transport details live
//! in the implementations (see [`crate::http::HttpRemote`]).

use std::fmt;

use crate::topic::Topic;

/// A failed remote call.
///
/// Transport and semantic failures are kept apart for reporting, but the
/// engine treats them the same way: the operation on that topic failed.
#[derive(Debug)]
pub enum RemoteError {
    /// The request never got a response (unreachable host, timeout, TLS).
    Transport(String),
    /// The remote answered with a non-success status.
    Status { code: u16, message: String },
    /// The response body could not be decoded.
    Decode(String),
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemoteError::Transport(msg) => write!(f, "transport failure: {msg}"),
            RemoteError::Status { code, message } if message.is_empty() => {
                write!(f, "remote answered {code}")
            }
            RemoteError::Status { code, message } => write!(f, "remote answered {code}: {message}"),
            RemoteError::Decode(msg) => write!(f, "invalid response: {msg}"),
        }
    }
}

impl std::error::Error for RemoteError {}

pub type RemoteResult<T> = Result<T, RemoteError>;

/// Operations the remote topic store provides.
///
/// Implementations own their timeouts; calls are expected to return
/// rather than block forever.
pub trait Remote: Send + Sync {
    /// Every topic, with bodies.
    fn list_topics(&self) -> RemoteResult<Vec<Topic>>;

    /// Create a topic; the remote assigns `id` and `created_at`.
    fn create_topic(&self, name: &str) -> RemoteResult<Topic>;

    fn update_topic_body(&self, id: &str, body: &str) -> RemoteResult<()>;

    fn update_topic_name(&self, id: &str, name: &str) -> RemoteResult<()>;

    fn delete_topic(&self, id: &str) -> RemoteResult<()>;
}
