use std::io;

use thiserror::Error;

/// Failure to deliver text to one participant.
///
/// Send failures are reported to the caller and never terminate the
/// participant on their own; only the hub decides when a participant goes away.
#[derive(Debug, Error)]
pub enum SendError {
    #[error("connection already terminated")]
    Closed,
    #[error("delivery timed out")]
    TimedOut,
    #[error("stream write failed: {0}")]
    Io(#[from] io::Error),
    #[error("websocket write failed: {0}")]
    WebSocket(#[from] axum::Error),
}

/// Raised when the hub loop has stopped and no longer accepts arrivals.
#[derive(Debug, Error)]
#[error("hub is no longer accepting participants")]
pub struct HubClosed;

/// Reasons a display name is refused at the transport boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NameError {
    #[error("Usernames cannot be empty")]
    Empty,
    #[error("Usernames cannot be more than {max} characters")]
    TooLong { max: usize },
}
