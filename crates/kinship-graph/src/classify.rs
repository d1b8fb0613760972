//! Relationship classification.
//!
//! Turns a path's shape and generation distances into a relationship
//! kind. Kinds are symmetric: "aunt/uncle ↔ niece/nephew" is one kind,
//! and which end is senior is read from the generation distances.

use crate::ancestors::{AncestorAnalysis, PathShape};
use crate::error::{ResolveError, Result};
use crate::path::RelationshipPath;
use kinship_core::ParentChildKind;
use serde::Serialize;

/// Kind of relationship between two persons.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RelationshipKind {
    #[serde(rename = "self")]
    Oneself,
    Spouse,
    ParentChild,
    Sibling {
        half: bool,
    },
    GrandparentGrandchild {
        greats: usize,
    },
    AuntUncleNieceNephew {
        greats: usize,
    },
    Cousin {
        degree: usize,
        removal: usize,
    },
    /// A blood relative's spouse, or a spouse's blood relative.
    InLaw {
        blood: Box<RelationshipKind>,
    },
    /// Related through a spouse of one's ancestor or a spouse's descendant.
    Step {
        blood: Box<RelationshipKind>,
    },
    CoParent,
    Distant {
        hops: usize,
    },
}

impl RelationshipKind {
    /// Blood kind for a pivot `g1` generations above person 1 and `g2`
    /// above person 2.
    pub fn from_generations(g1: usize, g2: usize, shared_ancestors: usize) -> Self {
        let (low, high) = (g1.min(g2), g1.max(g2));
        match (low, high) {
            (0, 0) => Self::Oneself,
            (0, 1) => Self::ParentChild,
            (0, n) => Self::GrandparentGrandchild { greats: n - 2 },
            (1, 1) => Self::Sibling {
                half: shared_ancestors < 2,
            },
            (1, n) => Self::AuntUncleNieceNephew { greats: n - 2 },
            (low, high) => Self::Cousin {
                degree: low - 1,
                removal: high - low,
            },
        }
    }

    /// Stable name of the kind, used in label keys and logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Oneself => "self",
            Self::Spouse => "spouse",
            Self::ParentChild => "parent_child",
            Self::Sibling { .. } => "sibling",
            Self::GrandparentGrandchild { .. } => "grandparent_grandchild",
            Self::AuntUncleNieceNephew { .. } => "aunt_uncle_niece_nephew",
            Self::Cousin { .. } => "cousin",
            Self::InLaw { .. } => "in_law",
            Self::Step { .. } => "step",
            Self::CoParent => "co_parent",
            Self::Distant { .. } => "distant",
        }
    }
}

impl std::fmt::Display for RelationshipKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sibling { half: true } => write!(f, "half sibling"),
            Self::GrandparentGrandchild { greats } | Self::AuntUncleNieceNephew { greats }
                if *greats > 0 =>
            {
                write!(f, "{} (greats: {})", self.name(), greats)
            }
            Self::Cousin { degree, removal } => {
                write!(f, "cousin (degree {}, removed {})", degree, removal)
            }
            Self::InLaw { blood } => write!(f, "{} in-law", blood),
            Self::Step { blood } => write!(f, "step {}", blood),
            Self::Distant { hops } => write!(f, "distant ({} hops)", hops),
            other => write!(f, "{}", other.name()),
        }
    }
}

/// The full classification of a resolved path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Classification {
    pub kind: RelationshipKind,
    /// Hops from person 1 (or their spouse, for in-law shapes) up to the pivot.
    pub generations_from_person1: usize,
    /// Hops from person 2 (or their spouse) up to the pivot.
    pub generations_from_person2: usize,
    /// Strongest non-biological link on the path.
    pub lineage: ParentChildKind,
}

impl Classification {
    /// Whether person 2 sits in an older generation than person 1.
    pub fn person2_is_senior(&self) -> bool {
        self.generations_from_person2 < self.generations_from_person1
    }
}

/// Maps path shapes to relationship kinds.
pub struct RelationshipClassifier;

impl RelationshipClassifier {
    /// Classifies a path given its ancestor analysis.
    ///
    /// # Errors
    /// `AmbiguousPivot` when the ancestors disagree with the shape. This
    /// is a consistency check; it never picks one of several pivots.
    pub fn classify(path: &RelationshipPath, analysis: &AncestorAnalysis) -> Result<Classification> {
        Self::check_pivots(analysis)?;

        let lineage = path
            .links()
            .iter()
            .filter_map(|link| link.meta.lineage())
            .max()
            .unwrap_or_default();
        let shared = analysis.ancestors.len();

        let (kind, g1, g2) = match analysis.shape {
            PathShape::Trivial => (RelationshipKind::Oneself, 0, 0),
            PathShape::Spouse => (RelationshipKind::Spouse, 0, 0),
            PathShape::Blood { up, down } => {
                (RelationshipKind::from_generations(up, down, shared), up, down)
            }
            PathShape::ViaTargetSpouse { up, down } => {
                let blood = Box::new(RelationshipKind::from_generations(up, down, 2));
                // The spouse of one's own ancestor is a step relative.
                let kind = if down == 0 {
                    RelationshipKind::Step { blood }
                } else {
                    RelationshipKind::InLaw { blood }
                };
                (kind, up, down)
            }
            PathShape::ViaSourceSpouse { up, down } => {
                let blood = Box::new(RelationshipKind::from_generations(up, down, 2));
                let kind = if up == 0 {
                    RelationshipKind::Step { blood }
                } else {
                    RelationshipKind::InLaw { blood }
                };
                (kind, up, down)
            }
            PathShape::Bridged { up, down } => {
                let blood = Box::new(RelationshipKind::from_generations(up, down, 2));
                (RelationshipKind::Step { blood }, up, down)
            }
            PathShape::CoParent => (RelationshipKind::CoParent, 0, 0),
            PathShape::Distant { hops } => (RelationshipKind::Distant { hops }, 0, 0),
        };

        Ok(Classification {
            kind,
            generations_from_person1: g1,
            generations_from_person2: g2,
            lineage,
        })
    }

    /// Every reported ancestor must sit at the shape's generation
    /// distances, and a climbing-and-descending blood segment needs at
    /// least one.
    fn check_pivots(analysis: &AncestorAnalysis) -> Result<()> {
        let expected = match analysis.shape {
            PathShape::Blood { up, down }
            | PathShape::ViaTargetSpouse { up, down }
            | PathShape::ViaSourceSpouse { up, down } => Some((up, down)),
            _ => None,
        };

        match expected {
            Some((up, down)) => {
                if analysis.ancestors.is_empty() {
                    return Err(ResolveError::AmbiguousPivot(format!(
                        "no common ancestor for a {}-up/{}-down path",
                        up, down
                    )));
                }
                if let Some(odd) = analysis.ancestors.iter().find(|a| {
                    a.generations_from_person1 != up || a.generations_from_person2 != down
                }) {
                    return Err(ResolveError::AmbiguousPivot(format!(
                        "{} sits at {}/{} generations, expected {}/{}",
                        odd.person_id,
                        odd.generations_from_person1,
                        odd.generations_from_person2,
                        up,
                        down
                    )));
                }
            }
            None => {
                if let Some(stray) = analysis.ancestors.first() {
                    return Err(ResolveError::AmbiguousPivot(format!(
                        "{} reported as ancestor on a {:?} path",
                        stray.person_id, analysis.shape
                    )));
                }
            }
        }

        Ok(())
    }
}
