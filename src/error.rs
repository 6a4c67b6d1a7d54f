use thiserror::Error;

/// Message surfaced when the liveness probe fails
pub const BACKEND_UNAVAILABLE_MESSAGE: &str = "Cannot connect to backend server";

/// Message surfaced when an analysis response does not have the expected shape
pub const INVALID_RESPONSE_MESSAGE: &str = "Invalid response format from analysis API";

/// Everything that can end an attempt to talk to Spotify or the analysis backend
#[derive(Error, Debug, Clone, PartialEq)]
pub enum VibeError {
    /// Missing or rejected credential; the user has to sign in again
    #[error("{0}")]
    Auth(String),

    #[error("Cannot connect to backend server")]
    BackendUnavailable,

    #[error("HTTP {status}: {detail}")]
    Http { status: u16, detail: String },

    #[error("{0}")]
    MalformedResponse(String),

    #[error("Network error: {0}")]
    Network(String),
}

impl VibeError {
    /// The single line shown to the user when an analysis fails.
    ///
    /// HTTP failures surface the remote `detail` verbatim.
    pub fn user_message(&self) -> String {
        match self {
            VibeError::Http { detail, .. } => detail.clone(),
            other => other.to_string(),
        }
    }

    pub fn missing_credential() -> Self {
        VibeError::Auth("No access token available. Please sign in again.".to_string())
    }
}

impl From<ureq::Transport> for VibeError {
    fn from(err: ureq::Transport) -> Self {
        VibeError::Network(err.to_string())
    }
}
