//! Common-ancestor detection on a found path.
//!
//! A blood path climbs (`Parent` hops) to a pivot and descends (`Child`
//! hops) from it. The pivot and every other person who is a recorded
//! parent of both people flanking it are common ancestors, all at the
//! same generation distances. Spouse hops either wrap a blood segment
//! (in-law and step shapes) or break the blood relation entirely.

use crate::edge::EdgeDirection;
use crate::error::{ResolveError, Result};
use crate::graph::GraphIndex;
use crate::path::RelationshipPath;
use kinship_core::PersonId;
use serde::Serialize;
use std::collections::BTreeSet;

/// The structural shape of a path's direction tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum PathShape {
    /// Zero hops.
    Trivial,
    /// A single spouse hop.
    Spouse,
    /// `Parent^up Child^down`.
    Blood { up: usize, down: usize },
    /// A blood segment followed by a spouse hop.
    ViaTargetSpouse { up: usize, down: usize },
    /// A spouse hop followed by a blood segment.
    ViaSourceSpouse { up: usize, down: usize },
    /// `Parent^up Spouse Child^down`, both sides at least one hop.
    Bridged { up: usize, down: usize },
    /// `Child Parent`: two parents of one child.
    CoParent,
    /// Anything else.
    Distant { hops: usize },
}

impl PathShape {
    /// Classifies a sequence of direction tags.
    pub fn of(tags: &[EdgeDirection]) -> Self {
        use EdgeDirection::{Child, Parent, Spouse};

        match tags {
            [] => return Self::Trivial,
            [Spouse] => return Self::Spouse,
            [Child, Parent] => return Self::CoParent,
            _ => {}
        }

        let hops = tags.len();
        let lead = tags[0] == Spouse;
        let trail = tags[hops - 1] == Spouse;
        let spouses = tags.iter().filter(|t| **t == Spouse).count();
        let distant = Self::Distant { hops };

        match (lead, trail, spouses) {
            (false, false, 0) => match peak(tags) {
                Some((up, down)) => Self::Blood { up, down },
                None => distant,
            },
            (false, true, 1) => match peak(&tags[..hops - 1]) {
                Some((up, down)) => Self::ViaTargetSpouse { up, down },
                None => distant,
            },
            (true, false, 1) => match peak(&tags[1..]) {
                Some((up, down)) => Self::ViaSourceSpouse { up, down },
                None => distant,
            },
            (false, false, 1) => {
                let split = tags.iter().position(|t| *t == Spouse).unwrap_or(0);
                let (left, right) = (&tags[..split], &tags[split + 1..]);
                let climbs = left.iter().all(|t| *t == Parent);
                let descends = right.iter().all(|t| *t == Child);
                if climbs && descends {
                    Self::Bridged {
                        up: left.len(),
                        down: right.len(),
                    }
                } else {
                    distant
                }
            }
            _ => distant,
        }
    }

    /// Where the blood segment starts in the path and how it climbs and
    /// descends, for shapes that have one.
    fn blood_segment(&self) -> Option<(usize, usize, usize, bool)> {
        match *self {
            Self::Blood { up, down } => Some((0, up, down, false)),
            Self::ViaTargetSpouse { up, down } => Some((0, up, down, true)),
            Self::ViaSourceSpouse { up, down } => Some((1, up, down, true)),
            _ => None,
        }
    }
}

/// Splits `Parent^up Child^down`; `None` for any other tag sequence.
fn peak(tags: &[EdgeDirection]) -> Option<(usize, usize)> {
    let up = tags
        .iter()
        .take_while(|t| **t == EdgeDirection::Parent)
        .count();
    let rest = &tags[up..];
    if rest.iter().all(|t| *t == EdgeDirection::Child) {
        Some((up, rest.len()))
    } else {
        None
    }
}

/// A shared ancestor with its distance from each end of the blood segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommonAncestor {
    pub person_id: PersonId,
    pub generations_from_person1: usize,
    pub generations_from_person2: usize,
    /// The ancestor belongs to a spouse's family, not to both persons.
    pub by_marriage: bool,
}

/// Shape of a path plus its common ancestors, deduplicated and ordered by id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AncestorAnalysis {
    pub shape: PathShape,
    pub ancestors: Vec<CommonAncestor>,
}

/// Extracts pivots from paths found over one index.
pub struct CommonAncestorResolver<'a> {
    index: &'a GraphIndex,
}

impl<'a> CommonAncestorResolver<'a> {
    pub fn new(index: &'a GraphIndex) -> Self {
        Self { index }
    }

    /// Finds the common ancestors of the path's endpoints.
    ///
    /// # Errors
    /// `AmbiguousPivot` when the pivot is not a recorded parent of both
    /// flanking persons, which means the path does not match the index.
    pub fn resolve(&self, path: &RelationshipPath) -> Result<AncestorAnalysis> {
        let shape = PathShape::of(&path.directions());

        let ancestors = match shape.blood_segment() {
            Some((offset, up, down, by_marriage)) => {
                self.shared_ancestors(path.persons(), offset, up, down, by_marriage)?
            }
            None => Vec::new(),
        };

        Ok(AncestorAnalysis { shape, ancestors })
    }

    fn shared_ancestors(
        &self,
        persons: &[PersonId],
        offset: usize,
        up: usize,
        down: usize,
        by_marriage: bool,
    ) -> Result<Vec<CommonAncestor>> {
        let pivot_at = offset + up;
        let pivot = persons.get(pivot_at).ok_or_else(|| {
            ResolveError::AmbiguousPivot(format!("pivot position {} is off the path", pivot_at))
        })?;

        let ancestor = |person_id: PersonId| CommonAncestor {
            person_id,
            generations_from_person1: up,
            generations_from_person2: down,
            by_marriage,
        };

        // Direct lineage: the upper endpoint is the only ancestor.
        if up == 0 || down == 0 {
            return Ok(vec![ancestor(pivot.clone())]);
        }

        let left = &persons[pivot_at - 1];
        let right = persons.get(pivot_at + 1).ok_or_else(|| {
            ResolveError::AmbiguousPivot(format!("{} has no descending neighbor", pivot))
        })?;

        let left_parents: BTreeSet<&PersonId> = self.index.parents_of(left)?.into_iter().collect();
        let right_parents: BTreeSet<&PersonId> =
            self.index.parents_of(right)?.into_iter().collect();
        let shared: Vec<&PersonId> = left_parents.intersection(&right_parents).copied().collect();

        if !shared.contains(&pivot) {
            return Err(ResolveError::AmbiguousPivot(format!(
                "{} is not a recorded parent of both {} and {}",
                pivot, left, right
            )));
        }

        Ok(shared.into_iter().cloned().map(ancestor).collect())
    }
}
