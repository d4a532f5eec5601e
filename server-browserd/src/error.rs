use thiserror::Error;

/// Expected, recoverable outcomes of a secured store operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// No entry with that id; the caller should re-register
    #[error("not registered")]
    NotFound,

    /// The supplied secret does not match
    #[error("invalid secret key")]
    Forbidden,

    /// An entry could not be parsed; the whole batch was rejected
    #[error("invalid network: {0}")]
    InvalidInput(String),

    /// No secret was supplied at all
    #[error("no secret key supplied")]
    MissingCredential,
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;
