use thiserror::Error;

pub type SessionResult<T> = Result<T, SessionError>;

/// Failures reported by a [`ReactiveSession`](crate::traits::session::ReactiveSession).
///
/// Generated repositories hand these back to the caller untouched, and add
/// [`SessionError::ResultOutOfRange`] when a count does not fit the declared
/// return type.
#[derive(Error, Debug)]
pub enum SessionError {
    #[cfg(feature = "sled")]
    #[error("Sled Error: {0}")]
    Sled(#[from] sled::Error),

    #[error("Encode Error: {0}")]
    Encode(#[from] bincode::error::EncodeError),

    #[error("Decode Error: {0}")]
    Decode(#[from] bincode::error::DecodeError),

    #[error("Identifier space exhausted for entity `{entity}`")]
    IdentifierExhausted { entity: &'static str },

    #[error("Result {value} does not fit in `{target}`")]
    ResultOutOfRange { value: u64, target: &'static str },

    #[error("{0}")]
    Other(String),
}
