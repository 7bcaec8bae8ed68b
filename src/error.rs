use thiserror::Error;

/// Errors returned by the clustering engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Shape, type or range violation detected before any clustering work.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Working memory or worker threads could not be obtained.
    #[error("allocation failure: {0}")]
    AllocationFailure(String),

    /// The size or type constraints cannot be met for the data and policy.
    #[error("infeasible constraint: {0}")]
    InfeasibleConstraint(String),

    /// Unexpected fault inside the engine.
    #[error("internal engine error: {0}")]
    InternalEngineError(String),
}

impl Error {
    pub(crate) fn invalid<S: Into<String>>(message: S) -> Self {
        Error::InvalidInput(message.into())
    }

    pub(crate) fn infeasible<S: Into<String>>(message: S) -> Self {
        Error::InfeasibleConstraint(message.into())
    }
}

/// Result type used by this crate.
pub type Result<T> = std::result::Result<T, Error>;
