use thiserror::Error;

/// Message fragments that mark a failure as transient
const RETRYABLE_MARKERS: [&str; 5] = ["503", "429", "overloaded", "unavailable", "timeout"];

/// HTTP statuses treated as transient without looking at the message
const RETRYABLE_STATUSES: [u16; 4] = [408, 429, 503, 504];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Worth another attempt with the same key after a backoff
    Transient,
    /// Move on to the next key
    Permanent,
}

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("no credentials configured")]
    Configuration,

    #[error("image payload is empty")]
    InvalidImage,

    #[error("provider error ({status}): {message}")]
    Provider { status: u16, message: String },

    #[error("transport error: {message}")]
    Transport { timeout: bool, message: String },

    #[error("failed to parse nutrition response: {0}")]
    Parse(String),

    #[error("{0}")]
    Message(String),

    #[error("unable to analyze image after exhausting all available credentials")]
    Exhausted {
        #[source]
        last: Option<Box<AnalysisError>>,
    },
}

impl AnalysisError {
    pub fn message(message: impl Into<String>) -> Self {
        AnalysisError::Message(message.into())
    }

    /// Structured fields decide when present; otherwise the message text does.
    pub fn kind(&self) -> ErrorKind {
        let transient = match self {
            AnalysisError::Provider { status, message } => {
                RETRYABLE_STATUSES.contains(status) || is_retryable_message(message)
            }
            AnalysisError::Transport { timeout: true, .. } => true,
            AnalysisError::Transport { message, .. } => is_retryable_message(message),
            AnalysisError::Message(message) => is_retryable_message(message),
            AnalysisError::Configuration
            | AnalysisError::InvalidImage
            | AnalysisError::Parse(_)
            | AnalysisError::Exhausted { .. } => false,
        };

        if transient {
            ErrorKind::Transient
        } else {
            ErrorKind::Permanent
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Transient
    }

    /// The failure that ended the last attempt, for exhausted runs
    pub fn last_cause(&self) -> Option<&AnalysisError> {
        match self {
            AnalysisError::Exhausted { last } => last.as_deref(),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for AnalysisError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => AnalysisError::Provider {
                status: status.as_u16(),
                message: err.to_string(),
            },
            None => AnalysisError::Transport {
                timeout: err.is_timeout(),
                message: err.to_string(),
            },
        }
    }
}

impl From<serde_json::Error> for AnalysisError {
    fn from(err: serde_json::Error) -> Self {
        AnalysisError::Parse(err.to_string())
    }
}

pub fn is_retryable_message(message: &str) -> bool {
    let lower = message.to_lowercase();
    RETRYABLE_MARKERS.iter().any(|marker| lower.contains(marker))
}
