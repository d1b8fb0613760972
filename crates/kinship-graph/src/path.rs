//! Shortest-path search between two persons.
//!
//! This module runs a bidirectional BFS: one frontier grows from the
//! source, one from the target, a layer at a time and alternately, until
//! a person turns up in both visited sets. Family graphs fan out quickly
//! through in-laws, so meeting in the middle keeps both frontiers small.
//!
//! Within a layer, neighbors are visited parents first, then children,
//! then spouses, each ordered by person id. The layer in which the two
//! sides first meet is finished, so every shortest path through it is
//! seen. The one with the fewest spouse hops wins, and remaining ties go
//! to the first meeting person under the visit order.

use crate::edge::{EdgeDirection, Link};
use crate::error::{ResolveError, Result};
use crate::graph::{GraphIndex, NodeId};
use kinship_core::PersonId;
use serde::Serialize;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::{debug, error};

/// Default search bound, in hops.
pub const DEFAULT_MAX_DEPTH: usize = 20;

/// Bounds on a single search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchLimits {
    /// Longest path considered. The source side gets the odd half.
    pub max_depth: usize,
    /// Wall-clock budget, checked between layers.
    pub time_budget: Option<Duration>,
}

impl Default for SearchLimits {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            time_budget: None,
        }
    }
}

impl SearchLimits {
    pub fn with_max_depth(max_depth: usize) -> Self {
        Self {
            max_depth,
            ..Self::default()
        }
    }
}

/// An ordered walk from source to target.
///
/// `links[i]` joins `persons[i]` to `persons[i + 1]` and says what
/// `persons[i + 1]` is relative to `persons[i]`. No person repeats.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelationshipPath {
    persons: Vec<PersonId>,
    links: Vec<Link>,
}

impl RelationshipPath {
    /// The zero-length path from a person to themselves.
    pub fn trivial(person: PersonId) -> Self {
        Self {
            persons: vec![person],
            links: Vec::new(),
        }
    }

    /// Assembles a path from its parts.
    ///
    /// Returns `None` unless there is exactly one link between each pair
    /// of consecutive persons.
    pub fn from_parts(persons: Vec<PersonId>, links: Vec<Link>) -> Option<Self> {
        if persons.is_empty() || persons.len() != links.len() + 1 {
            return None;
        }
        Some(Self { persons, links })
    }

    pub fn persons(&self) -> &[PersonId] {
        &self.persons
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    /// Number of hops.
    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn source(&self) -> &PersonId {
        &self.persons[0]
    }

    pub fn target(&self) -> &PersonId {
        &self.persons[self.persons.len() - 1]
    }

    /// Direction tags in path order.
    pub fn directions(&self) -> Vec<EdgeDirection> {
        self.links.iter().map(|l| l.direction).collect()
    }
}

/// Result of a search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathOutcome {
    Found(RelationshipPath),
    /// One side ran out of persons to visit before meeting the other.
    NotConnected,
    /// Both sides hit their share of `max_depth` (or the time budget ran
    /// out) before meeting. A larger bound may still find a path.
    DepthExceeded { max_depth: usize },
}

/// One side of the bidirectional search.
struct Frontier {
    /// Visited nodes with the node and hop they were reached through.
    visited: HashMap<NodeId, Option<(NodeId, Link)>>,
    layer: Vec<NodeId>,
    rounds: usize,
    limit: usize,
}

impl Frontier {
    fn new(root: NodeId, limit: usize) -> Self {
        let mut visited = HashMap::new();
        visited.insert(root, None);
        Self {
            visited,
            layer: vec![root],
            rounds: 0,
            limit,
        }
    }

    fn exhausted(&self) -> bool {
        self.layer.is_empty()
    }

    fn can_expand(&self) -> bool {
        self.rounds < self.limit && !self.layer.is_empty()
    }

    /// Expands one BFS layer.
    ///
    /// Returns the newly reached nodes the other side has already visited,
    /// in visit order.
    fn expand(&mut self, index: &GraphIndex, other: &Frontier) -> Vec<NodeId> {
        self.rounds += 1;
        let layer = std::mem::take(&mut self.layer);
        let mut next = Vec::new();
        let mut meetings = Vec::new();

        for current in layer {
            for neighbor in index.neighbors(current) {
                if self.visited.contains_key(&neighbor.node) {
                    continue;
                }
                self.visited
                    .insert(neighbor.node, Some((current, Link::from(neighbor))));
                if other.visited.contains_key(&neighbor.node) {
                    meetings.push(neighbor.node);
                }
                next.push(neighbor.node);
            }
        }

        self.layer = next;
        meetings
    }
}

/// Finds canonical shortest paths over a GraphIndex.
pub struct PathFinder<'a> {
    index: &'a GraphIndex,
}

impl<'a> PathFinder<'a> {
    pub fn new(index: &'a GraphIndex) -> Self {
        Self { index }
    }

    /// Finds the canonical shortest path from `source` to `target`.
    ///
    /// # Errors
    /// `UnknownPerson` for ids outside the index; `CycleDetected` when an
    /// endpoint or any person on the found path is their own ancestor.
    pub fn find_path(
        &self,
        source: &PersonId,
        target: &PersonId,
        limits: &SearchLimits,
    ) -> Result<PathOutcome> {
        let started = Instant::now();
        let src = self.index.require(source)?;
        let tgt = self.index.require(target)?;

        self.check_acyclic(&[src, tgt])?;

        if src == tgt {
            return Ok(PathOutcome::Found(RelationshipPath::trivial(source.clone())));
        }

        let mut forward = Frontier::new(src, limits.max_depth - limits.max_depth / 2);
        let mut backward = Frontier::new(tgt, limits.max_depth / 2);
        let mut forward_turn = true;

        loop {
            if forward.exhausted() || backward.exhausted() {
                debug!("Search {} -> {}: not connected", source, target);
                return Ok(PathOutcome::NotConnected);
            }

            let forward_ok = forward.can_expand();
            let backward_ok = backward.can_expand();
            let out_of_time = limits
                .time_budget
                .is_some_and(|budget| started.elapsed() >= budget);

            if (!forward_ok && !backward_ok) || out_of_time {
                debug!(
                    "Search {} -> {}: bound reached after {}+{} layers",
                    source, target, forward.rounds, backward.rounds
                );
                return Ok(PathOutcome::DepthExceeded {
                    max_depth: limits.max_depth,
                });
            }

            let expand_forward = if forward_ok && backward_ok {
                forward_turn
            } else {
                forward_ok
            };

            let meetings = if expand_forward {
                forward.expand(self.index, &backward)
            } else {
                backward.expand(self.index, &forward)
            };

            // Every meeting in one layer gives a path of the same length.
            let best = meetings
                .into_iter()
                .map(|meeting| splice(meeting, &forward, &backward))
                .min_by_key(|(_, links)| {
                    links
                        .iter()
                        .filter(|link| link.direction == EdgeDirection::Spouse)
                        .count()
                });

            if let Some((nodes, links)) = best {
                self.check_acyclic(&nodes)?;
                let persons = nodes
                    .iter()
                    .filter_map(|n| self.index.get(*n).map(|p| p.id.clone()))
                    .collect();
                debug!(
                    "Search {} -> {}: {} hops, met after {}+{} layers",
                    source,
                    target,
                    links.len(),
                    forward.rounds,
                    backward.rounds
                );
                return Ok(PathOutcome::Found(RelationshipPath { persons, links }));
            }

            forward_turn = !expand_forward;
        }
    }

    fn check_acyclic(&self, nodes: &[NodeId]) -> Result<()> {
        for &node in nodes {
            if self.index.is_on_cycle(node) {
                let person = self
                    .index
                    .get(node)
                    .map(|p| p.id.clone())
                    .unwrap_or_else(|| PersonId::new(format!("#{}", node.index())));
                error!("Parent-child cycle through {} blocks resolution", person);
                return Err(ResolveError::CycleDetected(person));
            }
        }
        Ok(())
    }
}

/// Joins the two half-paths at the meeting node.
///
/// Hops recorded by the target side point away from the target, so they
/// are inverted to read from source to target.
fn splice(meeting: NodeId, forward: &Frontier, backward: &Frontier) -> (Vec<NodeId>, Vec<Link>) {
    let mut nodes = vec![meeting];
    let mut links = Vec::new();

    let mut current = meeting;
    while let Some(Some((prev, link))) = forward.visited.get(&current) {
        links.push(link.clone());
        nodes.push(*prev);
        current = *prev;
    }
    nodes.reverse();
    links.reverse();

    current = meeting;
    while let Some(Some((prev, link))) = backward.visited.get(&current) {
        links.push(link.inverted());
        nodes.push(*prev);
        current = *prev;
    }

    (nodes, links)
}

#[cfg(test)]
mod tests {
    use super::*;
    use kinship_core::{ParentChildEdge, Person, TreeSnapshot, UnionEdge};

    fn snapshot(persons: &[&str], lineage: &[(&str, &str)], unions: &[(&str, &str)]) -> TreeSnapshot {
        TreeSnapshot {
            persons: persons.iter().map(|id| Person::new(*id, *id)).collect(),
            parent_child_edges: lineage
                .iter()
                .map(|(p, c)| ParentChildEdge::biological(*p, *c))
                .collect(),
            union_edges: unions
                .iter()
                .enumerate()
                .map(|(i, (a, b))| UnionEdge::marriage(format!("u{}", i), *a, *b))
                .collect(),
        }
    }

    fn find(index: &GraphIndex, a: &str, b: &str, depth: usize) -> PathOutcome {
        PathFinder::new(index)
            .find_path(&a.into(), &b.into(), &SearchLimits::with_max_depth(depth))
            .unwrap()
    }

    fn ids(path: &RelationshipPath) -> Vec<&str> {
        path.persons().iter().map(|p| p.as_str()).collect()
    }

    #[test]
    fn test_self_path() {
        let index = GraphIndex::build(&snapshot(&["a"], &[], &[])).unwrap();
        match find(&index, "a", "a", 20) {
            PathOutcome::Found(path) => {
                assert!(path.is_empty());
                assert_eq!(ids(&path), vec!["a"]);
            }
            other => panic!("expected trivial path, got {:?}", other),
        }
    }

    #[test]
    fn test_aunt_nephew_path() {
        let index = GraphIndex::build(&snapshot(
            &["ada", "ben", "cora", "dev"],
            &[("ada", "ben"), ("ada", "cora"), ("ben", "dev")],
            &[],
        ))
        .unwrap();

        let PathOutcome::Found(path) = find(&index, "cora", "dev", 20) else {
            panic!("expected a path");
        };
        assert_eq!(ids(&path), vec!["cora", "ada", "ben", "dev"]);
        assert_eq!(
            path.directions(),
            vec![EdgeDirection::Parent, EdgeDirection::Child, EdgeDirection::Child]
        );
    }

    #[test]
    fn test_spouse_path() {
        let index = GraphIndex::build(&snapshot(&["a", "b"], &[], &[("a", "b")])).unwrap();
        let PathOutcome::Found(path) = find(&index, "a", "b", 20) else {
            panic!("expected a path");
        };
        assert_eq!(path.directions(), vec![EdgeDirection::Spouse]);
    }

    #[test]
    fn test_tie_break_prefers_lower_parent_id() {
        // Full siblings share two parents; the lower id wins.
        let index = GraphIndex::build(&snapshot(
            &["mum", "dad", "x", "y"],
            &[("mum", "x"), ("dad", "x"), ("mum", "y"), ("dad", "y")],
            &[("mum", "dad")],
        ))
        .unwrap();

        for _ in 0..5 {
            let PathOutcome::Found(path) = find(&index, "x", "y", 20) else {
                panic!("expected a path");
            };
            assert_eq!(ids(&path), vec!["x", "dad", "y"]);
        }
    }

    #[test]
    fn test_parent_preferred_over_spouse_route() {
        // b's parents p and s are both one hop from a; the target side
        // reaches p first since "p" < "s".
        let index = GraphIndex::build(&snapshot(
            &["a", "p", "b", "s"],
            &[("p", "a"), ("p", "b"), ("s", "b")],
            &[("a", "s")],
        ))
        .unwrap();
        let PathOutcome::Found(path) = find(&index, "a", "b", 20) else {
            panic!("expected a path");
        };
        assert_eq!(ids(&path), vec!["a", "p", "b"]);
    }

    #[test]
    fn test_blood_route_wins_over_spouse_route() {
        // b's parents p and s are both one hop from a, and "p" > "f".
        // The spouse route through f is met first but the blood route
        // through p is kept, whichever end the search starts from.
        let index = GraphIndex::build(&snapshot(
            &["a", "p", "b", "f"],
            &[("p", "a"), ("p", "b"), ("f", "b")],
            &[("a", "f")],
        ))
        .unwrap();

        let PathOutcome::Found(forward) = find(&index, "a", "b", 20) else {
            panic!("expected a path");
        };
        assert_eq!(ids(&forward), vec!["a", "p", "b"]);

        let PathOutcome::Found(backward) = find(&index, "b", "a", 20) else {
            panic!("expected a path");
        };
        assert_eq!(ids(&backward), vec!["b", "p", "a"]);
    }

    #[test]
    fn test_unbounded_depth_does_not_overflow() {
        let index = GraphIndex::build(&snapshot(&["a", "b"], &[("a", "b")], &[])).unwrap();
        let PathOutcome::Found(path) = find(&index, "a", "b", usize::MAX) else {
            panic!("expected a path");
        };
        assert_eq!(path.directions(), vec![EdgeDirection::Child]);
    }

    #[test]
    fn test_disconnected() {
        let index = GraphIndex::build(&snapshot(
            &["a", "b", "c", "d"],
            &[("a", "b"), ("c", "d")],
            &[],
        ))
        .unwrap();
        assert_eq!(find(&index, "a", "d", 20), PathOutcome::NotConnected);
    }

    #[test]
    fn test_depth_exceeded() {
        // a -> b -> c -> d -> e, a straight line of descent.
        let index = GraphIndex::build(&snapshot(
            &["a", "b", "c", "d", "e"],
            &[("a", "b"), ("b", "c"), ("c", "d"), ("d", "e")],
            &[],
        ))
        .unwrap();

        assert_eq!(
            find(&index, "a", "e", 3),
            PathOutcome::DepthExceeded { max_depth: 3 }
        );
        let PathOutcome::Found(path) = find(&index, "a", "e", 4) else {
            panic!("expected a path at depth 4");
        };
        assert_eq!(path.len(), 4);
    }

    #[test]
    fn test_odd_depth_gives_source_the_extra_hop() {
        let index = GraphIndex::build(&snapshot(&["a", "b"], &[("a", "b")], &[])).unwrap();
        assert!(matches!(find(&index, "a", "b", 1), PathOutcome::Found(_)));
        assert_eq!(
            find(&index, "a", "b", 0),
            PathOutcome::DepthExceeded { max_depth: 0 }
        );
    }

    #[test]
    fn test_time_budget_reports_depth_exceeded() {
        let index = GraphIndex::build(&snapshot(&["a", "b"], &[("a", "b")], &[])).unwrap();
        let limits = SearchLimits {
            max_depth: 20,
            time_budget: Some(Duration::ZERO),
        };
        let outcome = PathFinder::new(&index)
            .find_path(&"a".into(), &"b".into(), &limits)
            .unwrap();
        assert_eq!(outcome, PathOutcome::DepthExceeded { max_depth: 20 });
    }

    #[test]
    fn test_path_has_no_repeats() {
        let index = GraphIndex::build(&snapshot(
            &["g", "p1", "p2", "c1", "c2", "s"],
            &[("g", "p1"), ("g", "p2"), ("p1", "c1"), ("p2", "c2")],
            &[("c1", "s"), ("s", "c2")],
        ))
        .unwrap();
        let PathOutcome::Found(path) = find(&index, "c1", "c2", 20) else {
            panic!("expected a path");
        };
        let mut seen = ids(&path);
        seen.sort();
        seen.dedup();
        assert_eq!(seen.len(), path.persons().len());
        assert_eq!(path.len(), 2);
    }

    #[test]
    fn test_cycle_surfaces_error() {
        let index = GraphIndex::build(&snapshot(
            &["a", "b", "c"],
            &[("a", "b"), ("b", "c"), ("c", "a")],
            &[],
        ))
        .unwrap();
        let err = PathFinder::new(&index)
            .find_path(&"a".into(), &"c".into(), &SearchLimits::default())
            .unwrap_err();
        assert!(matches!(err, ResolveError::CycleDetected(_)));
    }

    #[test]
    fn test_unknown_endpoint() {
        let index = GraphIndex::build(&snapshot(&["a"], &[], &[])).unwrap();
        let err = PathFinder::new(&index)
            .find_path(&"a".into(), &"zz".into(), &SearchLimits::default())
            .unwrap_err();
        assert!(matches!(err, ResolveError::UnknownPerson(id) if id.as_str() == "zz"));
    }
}
