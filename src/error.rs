//! Error types for stats aggregation

use std::error::Error;
use std::fmt;

/// Failure talking to a remote collaborator
#[derive(Debug)]
pub enum TransportError {
    /// The request never produced a response
    Network(String),
    /// The remote answered with a non-success HTTP status
    Status { status: u16, message: String },
    /// The response body was not valid JSON
    Decode(String),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::Network(msg) => write!(f, "Network error: {msg}"),
            TransportError::Status { status, message } => {
                write!(f, "HTTP {status}: {message}")
            }
            TransportError::Decode(msg) => write!(f, "Failed to decode response: {msg}"),
        }
    }
}

impl Error for TransportError {}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            TransportError::Decode(e.to_string())
        } else {
            TransportError::Network(e.to_string())
        }
    }
}

/// Everything that can stop `fetch_stats` from producing a record.
///
/// Remote failures are all-or-nothing: once any request fails, no partial
/// record is returned.
#[derive(Debug)]
pub enum StatsError {
    MissingUsername,
    /// Rejected before any request is sent
    InvalidUsername,
    /// First entry of a GraphQL `errors` list, message kept verbatim
    Remote {
        message: String,
        kind: Option<String>,
    },
    /// The GraphQL response carried neither errors nor a user
    UserNotFound,
    /// The commit search answered with an error or without a count
    CommitFetch,
    /// A required field was missing from a remote payload
    MalformedResponse(String),
    Transport(TransportError),
}

impl StatsError {
    /// True when the failure came from a remote round-trip rather than
    /// from validating the caller's input.
    pub fn is_remote(&self) -> bool {
        !matches!(self, StatsError::MissingUsername | StatsError::InvalidUsername)
    }
}

impl fmt::Display for StatsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatsError::MissingUsername => write!(f, "Missing required parameter: username"),
            StatsError::InvalidUsername => write!(f, "Invalid username provided."),
            StatsError::Remote { message, .. } => write!(f, "{message}"),
            StatsError::UserNotFound => write!(f, "Could not fetch user."),
            StatsError::CommitFetch => write!(f, "Could not fetch total commits."),
            StatsError::MalformedResponse(msg) => write!(f, "Malformed response: {msg}"),
            StatsError::Transport(e) => write!(f, "{e}"),
        }
    }
}

impl Error for StatsError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            StatsError::Transport(e) => Some(e),
            _ => None,
        }
    }
}

impl From<TransportError> for StatsError {
    fn from(e: TransportError) -> Self {
        StatsError::Transport(e)
    }
}
