use thiserror::Error;

/// The error taxonomy from the engine's error-handling design: every
/// variant maps to one of the recoverable outcomes the mirror engine logs
/// and persists as a skip/failure event, except [`EngineError::Fatal`]
/// which the supervisor treats as a refusal to start.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("malformed inbound frame: {0}")]
    Parse(#[from] fix_codec::CodecError),

    #[error("unknown entity: {0}")]
    UnknownEntity(String),

    #[error("rule excluded order: {0}")]
    RuleExcluded(String),

    #[error("shadow session {0} is not available")]
    SessionUnavailable(String),

    #[error("outbound queue for session {0} is saturated")]
    Saturated(String),

    #[error("locate failed: {0}")]
    LocateFailure(String),

    #[error("store operation failed: {0}")]
    StoreFailure(#[from] sqlx::Error),

    #[error("fatal: {0}")]
    Fatal(String),
}

impl EngineError {
    /// Whether this kind represents a skip (no outbound action, order not
    /// otherwise affected) as opposed to a failure that blocks mirroring.
    pub fn is_skip(&self) -> bool {
        matches!(
            self,
            EngineError::UnknownEntity(_) | EngineError::RuleExcluded(_) | EngineError::Saturated(_)
        )
    }
}
