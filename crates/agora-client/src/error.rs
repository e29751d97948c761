use agora_shared::FieldErrors;
use thiserror::Error;

/// A failed API call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// The server answered with a non-2xx status.
    #[error("{message}")]
    Http { status: u16, message: String },

    /// The request never got an answer (connection, timeout, ...).
    #[error("{0}")]
    Transport(String),

    /// The answer could not be decoded into the expected type.
    #[error("Invalid response: {0}")]
    Decode(String),

    /// An in-flight read was cancelled before it could land in the cache.
    #[error("Query cancelled")]
    Cancelled,
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// A failed create mutation.
#[derive(Debug, Error)]
pub enum MutationError {
    /// Input was rejected before anything was sent.
    #[error("Validation failed: {0}")]
    Validation(FieldErrors),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Failed to encode pending entity: {0}")]
    Encode(#[from] serde_json::Error),
}

impl MutationError {
    pub fn field_errors(&self) -> Option<&FieldErrors> {
        match self {
            MutationError::Validation(errors) => Some(errors),
            _ => None,
        }
    }
}
