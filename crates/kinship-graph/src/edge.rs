//! Edge types for the relationship graph.
//!
//! A hop is always read from the current person towards the next one:
//! `Parent` means "the next person is a parent of the current one".

use crate::graph::NodeId;
use kinship_core::{ParentChildKind, UnionKind};
use serde::{Deserialize, Serialize};

/// What the next person on a hop IS relative to the current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeDirection {
    Parent,
    Child,
    Spouse,
}

impl EdgeDirection {
    /// The same hop read from the other end.
    ///
    /// Only the path splice in bidirectional search needs this.
    pub fn invert(self) -> Self {
        match self {
            Self::Parent => Self::Child,
            Self::Child => Self::Parent,
            Self::Spouse => Self::Spouse,
        }
    }

    /// Visit order within one BFS layer.
    pub(crate) fn rank(self) -> u8 {
        match self {
            Self::Parent => 0,
            Self::Child => 1,
            Self::Spouse => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Parent => "parent",
            Self::Child => "child",
            Self::Spouse => "spouse",
        }
    }
}

impl std::fmt::Display for EdgeDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The record behind a hop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeMeta {
    ParentChild(ParentChildKind),
    Union { union_id: String, kind: UnionKind },
}

impl EdgeMeta {
    pub fn lineage(&self) -> Option<ParentChildKind> {
        match self {
            Self::ParentChild(kind) => Some(*kind),
            Self::Union { .. } => None,
        }
    }
}

/// An adjacency entry: `node` is the `direction` of the owning person.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Neighbor {
    pub node: NodeId,
    pub direction: EdgeDirection,
    pub meta: EdgeMeta,
}

/// One hop of a found path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub direction: EdgeDirection,
    pub meta: EdgeMeta,
}

impl Link {
    pub fn new(direction: EdgeDirection, meta: EdgeMeta) -> Self {
        Self { direction, meta }
    }

    pub(crate) fn inverted(&self) -> Self {
        Self {
            direction: self.direction.invert(),
            meta: self.meta.clone(),
        }
    }
}

impl From<&Neighbor> for Link {
    fn from(neighbor: &Neighbor) -> Self {
        Self::new(neighbor.direction, neighbor.meta.clone())
    }
}
