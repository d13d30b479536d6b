/// Typed failures of a single session operation.
///
/// All variants are recoverable: the request is rejected and the session is
/// left exactly as it was loaded.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl EngineError {
    /// Short classification string for logging.
    pub fn error_kind(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::InvalidState(_) => "invalid_state",
            Self::InvalidInput(_) => "invalid_input",
        }
    }

    pub(crate) fn round_not_started() -> Self {
        Self::InvalidState("round has not been started".into())
    }
}
