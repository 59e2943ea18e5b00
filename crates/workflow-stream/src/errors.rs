/// Errors returned before a workflow event stream is established.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TriggerError {
    /// Invalid trigger configuration (missing endpoint or key, bad client settings).
    #[error("config error: {0}")]
    Config(String),
    /// Invalid input to the trigger API.
    #[error("validation error: {0}")]
    Validation(String),
    /// The HTTP request could not be sent.
    #[error("request failed: {0}")]
    Request(String),
    /// The service answered with a non-success status.
    #[error("workflow service returned status {status}: {body}")]
    Status { status: u16, body: String },
}

impl TriggerError {
    /// Returns the HTTP status code when the service rejected the request.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Read failure on an already-open event stream.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, serde::Serialize, serde::Deserialize)]
#[error("stream read failed: {message}")]
pub struct TransportError {
    pub message: String,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Reason a stream stopped before end-of-stream.
///
/// Interruptions never discard the aggregated state; they travel next to the
/// partial report in `RunOutcome`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, serde::Serialize, serde::Deserialize)]
pub enum Interruption {
    /// The transport failed mid-stream.
    #[error(transparent)]
    Transport(TransportError),
    /// The caller aborted the run.
    #[error("run cancelled")]
    Cancelled,
}

impl From<TransportError> for Interruption {
    fn from(value: TransportError) -> Self {
        Interruption::Transport(value)
    }
}
