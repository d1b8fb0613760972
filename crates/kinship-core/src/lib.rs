//! Kinship Core - Genealogical record model
//!
//! This crate defines the records the relationship resolver reads:
//! persons, parent-child links and unions, grouped into per-tree
//! snapshots. The records are owned by the record-management side of
//! the system; nothing here mutates them once loaded.
//!
//! # Example
//!
//! ```
//! use kinship_core::{ParentChildEdge, Person, Sex, TreeSnapshot};
//!
//! let mut snapshot = TreeSnapshot::default();
//! snapshot.persons.push(Person::new("ada", "Ada").with_sex(Sex::Female));
//! snapshot.persons.push(Person::new("ben", "Ben").with_sex(Sex::Male));
//! snapshot.parent_child_edges.push(ParentChildEdge::biological("ada", "ben"));
//!
//! assert!(snapshot.validate().is_ok());
//! ```

mod error;
mod person;
mod relation;
mod snapshot;

pub use error::{Result, SnapshotError};
pub use person::{Person, PersonId, Sex};
pub use relation::{ParentChildEdge, ParentChildKind, UnionEdge, UnionKind};
pub use snapshot::{TreeId, TreeScope, TreeSnapshot};
