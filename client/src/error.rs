//! Client errors

/// Failure of a backend call as seen by the front end
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    /// The backend answered with a failure envelope
    #[error("{message}")]
    Api { status: u16, message: String },

    /// The request was sent but nothing came back
    #[error("No response from server")]
    NoResponse,

    /// A response arrived but could not be decoded
    #[error("Unexpected response from server: {0}")]
    Decode(String),

    /// Rejected before any request was made
    #[error("{0}")]
    Invalid(String),
}

impl ClientError {
    /// HTTP status of an API failure
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}
