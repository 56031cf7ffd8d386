use std::{fmt, io};

use thiserror::Error;

/// Errors raised while talking to the livestatus socket.
///
/// Every variant belongs to one of three families (see [`ErrorKind`]):
/// the connection could not be established, the query could not be sent,
/// or the response could not be read or reported a failure.
#[derive(Error, Debug)]
pub enum LivestatusError {
    /// The socket path is missing, is not a socket, or did not accept a
    /// connection within the configured wait.
    #[error("Failed to connect to livestatus socket {path}: {source}")]
    Connect {
        path: String,
        #[source]
        source: io::Error,
    },

    /// Writing the query (or half-closing the write side) failed.
    #[error("Failed to send livestatus query: {source}")]
    Query {
        #[source]
        source: io::Error,
    },

    /// Reading from the socket failed or the peer closed the stream early.
    #[error("Failed to read data from livestatus: {reason}")]
    Receive {
        reason: String,
        #[source]
        source: Option<io::Error>,
    },

    /// Livestatus answered with a non-200 status code.
    /// The payload of such a response is the error text.
    #[error("Livestatus error: {code}: {message}")]
    Status { code: u16, message: String },

    /// The response header or payload did not have the expected shape.
    #[error("Malformed livestatus response: {0}")]
    Malformed(String),
}

/// Coarse classification of a [`LivestatusError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Connect,
    Query,
    Response,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Connect => write!(f, "connect"),
            ErrorKind::Query => write!(f, "query"),
            ErrorKind::Response => write!(f, "response"),
        }
    }
}

impl LivestatusError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LivestatusError::Connect { .. } => ErrorKind::Connect,
            LivestatusError::Query { .. } => ErrorKind::Query,
            LivestatusError::Receive { .. }
            | LivestatusError::Status { .. }
            | LivestatusError::Malformed(_) => ErrorKind::Response,
        }
    }
}

/// Result alias used by the livestatus client.
pub type LivestatusResult<T> = std::result::Result<T, LivestatusError>;
