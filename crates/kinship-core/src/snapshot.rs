//! Tree snapshots: the read-only input surface of the resolver.
//!
//! A snapshot is everything recorded for one tree at one moment. Scopes
//! spanning several trees are answered from a merged snapshot.

use crate::error::{Result, SnapshotError};
use crate::person::{Person, PersonId};
use crate::relation::{ParentChildEdge, UnionEdge, UnionKind};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Identifier of a family tree.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TreeId(String);

impl TreeId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TreeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TreeId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Which trees a resolution runs over.
///
/// Serialized as a bare tree id, or as a list of ids for a merged scope.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TreeScope {
    Tree(TreeId),
    Merged(Vec<TreeId>),
}

impl TreeScope {
    /// Builds a merged scope. A single id collapses to `Tree`.
    pub fn merged(trees: impl IntoIterator<Item = TreeId>) -> Self {
        Self::Merged(trees.into_iter().collect()).normalized()
    }

    /// Canonical form: sorted, deduplicated, singletons collapsed.
    pub fn normalized(&self) -> Self {
        match self {
            Self::Tree(id) => Self::Tree(id.clone()),
            Self::Merged(ids) => {
                let mut ids = ids.clone();
                ids.sort();
                ids.dedup();
                if ids.len() == 1 {
                    Self::Tree(ids.remove(0))
                } else {
                    Self::Merged(ids)
                }
            }
        }
    }

    /// Trees covered by the scope.
    pub fn trees(&self) -> Vec<&TreeId> {
        match self {
            Self::Tree(id) => vec![id],
            Self::Merged(ids) => ids.iter().collect(),
        }
    }

    pub fn contains(&self, tree: &TreeId) -> bool {
        self.trees().contains(&tree)
    }
}

impl fmt::Display for TreeScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tree(id) => write!(f, "{}", id),
            Self::Merged(ids) => {
                let names: Vec<&str> = ids.iter().map(|id| id.as_str()).collect();
                write!(f, "[{}]", names.join(", "))
            }
        }
    }
}

/// All records of one tree (or a merge of several).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeSnapshot {
    #[serde(default)]
    pub persons: Vec<Person>,
    #[serde(default)]
    pub parent_child_edges: Vec<ParentChildEdge>,
    #[serde(default)]
    pub union_edges: Vec<UnionEdge>,
}

impl TreeSnapshot {
    /// Parses and validates a snapshot document.
    pub fn from_json(source: &str) -> Result<Self> {
        let snapshot: TreeSnapshot = serde_json::from_str(source)?;
        snapshot.validate()?;
        Ok(snapshot)
    }

    /// Reads a snapshot document from disk.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let source = fs::read_to_string(path.as_ref())?;
        debug!("Loaded snapshot from {}", path.as_ref().display());
        Self::from_json(&source)
    }

    /// Checks identity uniqueness.
    ///
    /// Dangling edges are tolerated here: scopes may be partial, and the
    /// graph index skips edges whose endpoints are missing.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::with_capacity(self.persons.len());
        for person in &self.persons {
            if !seen.insert(&person.id) {
                return Err(SnapshotError::DuplicatePerson(person.id.clone()));
            }
        }
        Ok(())
    }

    /// Unions several snapshots.
    ///
    /// Persons are deduplicated by id (first occurrence wins), edges by
    /// value. Union ids are only unique within a tree, so unions are
    /// deduplicated by id, member set and kind together.
    pub fn merge(snapshots: impl IntoIterator<Item = TreeSnapshot>) -> Self {
        let mut merged = TreeSnapshot::default();
        let mut person_ids: HashSet<PersonId> = HashSet::new();
        let mut lineage: HashSet<ParentChildEdge> = HashSet::new();
        let mut unions: HashSet<(String, Vec<PersonId>, UnionKind)> = HashSet::new();

        for snapshot in snapshots {
            for person in snapshot.persons {
                if person_ids.insert(person.id.clone()) {
                    merged.persons.push(person);
                }
            }
            for edge in snapshot.parent_child_edges {
                if lineage.insert(edge.clone()) {
                    merged.parent_child_edges.push(edge);
                }
            }
            for union in snapshot.union_edges {
                let mut members = union.members.clone();
                members.sort();
                members.dedup();
                if unions.insert((union.id.clone(), members, union.kind)) {
                    merged.union_edges.push(union);
                }
            }
        }

        merged
    }

    pub fn is_empty(&self) -> bool {
        self.persons.is_empty()
    }

    pub fn person(&self, id: &PersonId) -> Option<&Person> {
        self.persons.iter().find(|p| &p.id == id)
    }
}
