use thiserror::Error;

#[derive(Error, Debug)]
pub enum KonsulError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Already exists: {0}")]
    Conflict(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Handler error: {0}")]
    Handler(#[from] HandlerError),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl KonsulError {
    /// True for failures caused by the caller (bad input, missing rights, conflicts, unknown ids).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            KonsulError::Validation(_)
                | KonsulError::Conflict(_)
                | KonsulError::NotFound(_)
                | KonsulError::Unauthorized(_)
                | KonsulError::Forbidden(_)
                | KonsulError::Handler(_)
        )
    }
}

#[derive(Error, Debug)]
pub enum HandlerError {
    #[error("Unauthorized access")]
    Unauthorized,

    #[error("Sender mismatch: connection user {expected}, message sender {actual}")]
    SenderMismatch { expected: String, actual: String },

    #[error("State error: {0}")]
    State(String),
}

pub type Result<T> = std::result::Result<T, KonsulError>;
