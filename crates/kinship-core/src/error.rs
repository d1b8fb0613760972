use crate::person::PersonId;
use thiserror::Error;

/// Errors raised while loading or validating a tree snapshot.
#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid snapshot JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Two person records share one id, so neither identity can be trusted.
    #[error("duplicate person id: {0}")]
    DuplicatePerson(PersonId),
}

pub type Result<T> = std::result::Result<T, SnapshotError>;
