//! Relationship records: parent-child links and unions.
//!
//! These are the only edges the resolver knows about. Nothing is
//! inferred beyond what is recorded here.

use crate::person::PersonId;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How a child is linked to a parent.
///
/// Variant order matters: when a path mixes kinds, the greatest one
/// qualifies the whole relationship (a single step link makes it "step").
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ParentChildKind {
    #[default]
    Biological,
    Adoptive,
    Foster,
    Step,
}

impl fmt::Display for ParentChildKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Biological => "biological",
            Self::Adoptive => "adoptive",
            Self::Foster => "foster",
            Self::Step => "step",
        };
        write!(f, "{}", s)
    }
}

/// A directed parent → child link.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParentChildEdge {
    pub parent: PersonId,
    pub child: PersonId,
    #[serde(default)]
    pub kind: ParentChildKind,
}

impl ParentChildEdge {
    pub fn new(
        parent: impl Into<PersonId>,
        child: impl Into<PersonId>,
        kind: ParentChildKind,
    ) -> Self {
        Self {
            parent: parent.into(),
            child: child.into(),
            kind,
        }
    }

    /// Shorthand for the common biological case.
    pub fn biological(parent: impl Into<PersonId>, child: impl Into<PersonId>) -> Self {
        Self::new(parent, child, ParentChildKind::Biological)
    }
}

/// The kind of a union between partners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnionKind {
    #[default]
    Marriage,
    Partnership,
    Engagement,
    Other,
}

impl fmt::Display for UnionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Marriage => "marriage",
            Self::Partnership => "partnership",
            Self::Engagement => "engagement",
            Self::Other => "other",
        };
        write!(f, "{}", s)
    }
}

/// An undirected union among two or more members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnionEdge {
    pub id: String,
    pub members: Vec<PersonId>,
    #[serde(default)]
    pub kind: UnionKind,
    #[serde(default)]
    pub start: Option<NaiveDate>,
    #[serde(default)]
    pub end: Option<NaiveDate>,
}

impl UnionEdge {
    pub fn new(id: impl Into<String>, members: Vec<PersonId>, kind: UnionKind) -> Self {
        Self {
            id: id.into(),
            members,
            kind,
            start: None,
            end: None,
        }
    }

    /// A marriage between two persons.
    pub fn marriage(
        id: impl Into<String>,
        first: impl Into<PersonId>,
        second: impl Into<PersonId>,
    ) -> Self {
        Self::new(id, vec![first.into(), second.into()], UnionKind::Marriage)
    }

    /// Members with duplicates removed, in recorded order.
    pub fn distinct_members(&self) -> Vec<&PersonId> {
        let mut seen = Vec::with_capacity(self.members.len());
        for member in &self.members {
            if !seen.contains(&member) {
                seen.push(member);
            }
        }
        seen
    }
}
