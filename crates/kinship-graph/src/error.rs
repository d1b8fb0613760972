use kinship_core::{PersonId, SnapshotError, TreeId};
use serde::Serialize;
use thiserror::Error;

/// Errors surfaced by index building and relationship resolution.
///
/// "Not connected" and "depth exceeded" are answers, not errors; they
/// travel as [`crate::PathOutcome`] variants instead.
#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("unknown person: {0}")]
    UnknownPerson(PersonId),

    #[error("tree scope contains no persons")]
    EmptyScope,

    #[error("unknown tree: {0}")]
    UnknownTree(TreeId),

    #[error("snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),

    /// A person is (transitively) their own ancestor.
    #[error("parent-child cycle detected through {0}")]
    CycleDetected(PersonId),

    #[error("ambiguous common-ancestor pivot: {0}")]
    AmbiguousPivot(String),
}

/// Coarse error taxonomy for callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    /// Bad request input; retrying unchanged will not help.
    Input,
    /// The recorded data breaks a genealogical invariant.
    Invariant,
}

impl ResolveError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::UnknownPerson(_)
            | Self::EmptyScope
            | Self::UnknownTree(_)
            | Self::Snapshot(_) => ErrorClass::Input,
            Self::CycleDetected(_) | Self::AmbiguousPivot(_) => ErrorClass::Invariant,
        }
    }
}

pub type Result<T> = std::result::Result<T, ResolveError>;
