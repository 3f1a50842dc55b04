use crate::matcher::NoCandidatesCause;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AssignError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("No candidates ({cause}): {message}")]
    NoCandidates {
        cause: NoCandidatesCause,
        message: String,
    },

    #[error("Capacity exceeded for '{user_id}': {open} open of {max} allowed")]
    CapacityExceeded { user_id: String, open: u32, max: u32 },

    #[error("Assignment '{assignment_id}' not found")]
    AssignmentNotFound { assignment_id: String },

    #[error("Person '{user_id}' is not on the roster")]
    UnknownPerson { user_id: String },

    #[error("Invalid record: {reason}")]
    InvalidRecord { reason: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type AssignResult<T> = Result<T, AssignError>;
