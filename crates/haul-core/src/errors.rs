use crate::task::{TaskId, TaskStatus};

/// Errors from the consumed backend API surface.
/// Classifies failures into what the engine does with them: transport
/// failures degrade a component, auth failures end the session, the rest
/// propagate to the caller of the specific operation.
#[derive(Clone, Debug, thiserror::Error)]
pub enum ApiError {
    // Recovered locally via fallback to cached or sample data
    #[error("transport error: {0}")]
    Transport(String),

    // Fatal to the session; triggers external re-authentication
    #[error("authentication failed: {0}")]
    Auth(String),

    // Surfaced to the caller, no state change
    #[error("not found: {0}")]
    NotFound(String),
    #[error("invalid request: {0}")]
    Validation(String),
}

impl ApiError {
    /// Transport failures never surface as hard errors; the owning
    /// component degrades and keeps serving its previous data.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Auth(_))
    }

    /// A missing optional endpoint means "feature unavailable", which
    /// takes the same fallback path as a transport failure.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::NotFound(_))
    }

    /// Short classification string for logging.
    pub fn error_kind(&self) -> &'static str {
        match self {
            Self::Transport(_) => "transport",
            Self::Auth(_) => "auth",
            Self::NotFound(_) => "not_found",
            Self::Validation(_) => "validation",
        }
    }

    /// Classify an HTTP status code into the appropriate error variant.
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            401 | 403 => Self::Auth(body),
            404 => Self::NotFound(body),
            400 | 422 => Self::Validation(body),
            408 | 429 => Self::Transport(format!("status {status}: {body}")),
            500..=599 => Self::Transport(format!("status {status}: {body}")),
            _ => Self::Validation(format!("unexpected status {status}: {body}")),
        }
    }
}

/// Errors raised by the coordination engine's own operations.
#[derive(Clone, Debug, thiserror::Error)]
pub enum EngineError {
    #[error("invalid transition: {from} -> {to}")]
    InvalidTransition { from: TaskStatus, to: TaskStatus },
    #[error("task {0} not found")]
    TaskNotFound(TaskId),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error(transparent)]
    Api(#[from] ApiError),
}

impl EngineError {
    /// Short classification string for logging.
    pub fn error_kind(&self) -> &'static str {
        match self {
            Self::InvalidTransition { .. } => "invalid_transition",
            Self::TaskNotFound(_) => "task_not_found",
            Self::Validation(_) => "validation",
            Self::Api(e) => e.error_kind(),
        }
    }
}
