use std::fmt;

/// Error type shared by the store, repository, query service and pin sources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PinError {
    /// Malformed viewport or radius query. Rejected before reaching storage.
    InvalidQuery(String),
    /// A pin draft or patch failed validation.
    InvalidPin(String),
    /// Lookup on an unknown id. Store and repository return `Ok(None)` instead;
    /// this variant is produced at the transport boundary.
    NotFound(String),
    /// The backing store is unavailable or rejected the write.
    Storage(String),
    /// Network or protocol failure while talking to a remote pin source.
    Transport(String),
}

impl PinError {
    pub(crate) fn lock_poisoned(operation: &str) -> Self {
        PinError::Storage(format!("lock poisoned during {}", operation))
    }

    /// Map this error to an HTTP-style status code.
    pub fn status_code(&self) -> u16 {
        match self {
            PinError::InvalidQuery(_) => 400,
            PinError::InvalidPin(_) => 400,
            PinError::NotFound(_) => 404,
            PinError::Storage(_) => 500,
            PinError::Transport(_) => 502,
        }
    }
}

impl fmt::Display for PinError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PinError::InvalidQuery(msg) => write!(f, "invalid query: {}", msg),
            PinError::InvalidPin(msg) => write!(f, "invalid pin: {}", msg),
            PinError::NotFound(id) => write!(f, "pin not found: {}", id),
            PinError::Storage(msg) => write!(f, "storage failure: {}", msg),
            PinError::Transport(msg) => write!(f, "transport failure: {}", msg),
        }
    }
}

impl std::error::Error for PinError {}

impl From<serde_json::Error> for PinError {
    fn from(err: serde_json::Error) -> Self {
        PinError::InvalidPin(err.to_string())
    }
}
