//! Graph builder for constructing the index from tree records.
//!
//! The builder handles the two-pass process:
//! 1. Add all persons to the graph
//! 2. Resolve recorded edges against those persons, then freeze the
//!    sorted adjacency and the cycle set

use crate::edge::{EdgeDirection, EdgeMeta, Neighbor};
use crate::error::{ResolveError, Result};
use crate::graph::{GraphIndex, NodeId};
use chrono::Utc;
use kinship_core::{ParentChildEdge, ParentChildKind, Person, PersonId, TreeSnapshot, UnionEdge};
use petgraph::graph::DiGraph;
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

/// Builds a GraphIndex from persons, lineage edges and unions.
pub struct IndexBuilder {
    graph: DiGraph<Person, ParentChildKind>,
    id_index: HashMap<PersonId, NodeId>,
    /// Edges wait here until every person is known.
    pending_lineage: Vec<ParentChildEdge>,
    pending_unions: Vec<UnionEdge>,
}

impl Default for IndexBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl IndexBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            id_index: HashMap::new(),
            pending_lineage: Vec::new(),
            pending_unions: Vec::new(),
        }
    }

    /// Adds persons. A repeated id keeps the first record.
    pub fn add_persons(&mut self, persons: Vec<Person>) {
        for person in persons {
            if self.id_index.contains_key(&person.id) {
                debug!("Skipping duplicate person {}", person.id);
                continue;
            }
            let id = person.id.clone();
            let index = self.graph.add_node(person);
            self.id_index.insert(id, index);
        }
    }

    pub fn add_lineage(&mut self, edges: Vec<ParentChildEdge>) {
        self.pending_lineage.extend(edges);
    }

    pub fn add_unions(&mut self, unions: Vec<UnionEdge>) {
        self.pending_unions.extend(unions);
    }

    /// Adds every record of a snapshot.
    pub fn add_snapshot(&mut self, snapshot: TreeSnapshot) {
        self.add_persons(snapshot.persons);
        self.add_lineage(snapshot.parent_child_edges);
        self.add_unions(snapshot.union_edges);
    }

    /// Resolves edges and freezes the index.
    pub fn build(mut self) -> Result<GraphIndex> {
        if self.graph.node_count() == 0 {
            return Err(ResolveError::EmptyScope);
        }

        let mut skipped = 0usize;

        for edge in std::mem::take(&mut self.pending_lineage) {
            let (parent, child) = match (
                self.id_index.get(&edge.parent),
                self.id_index.get(&edge.child),
            ) {
                (Some(p), Some(c)) => (*p, *c),
                _ => {
                    warn!(
                        "Skipping parent-child edge {} -> {}: endpoint outside scope",
                        edge.parent, edge.child
                    );
                    skipped += 1;
                    continue;
                }
            };
            if self.graph.find_edge(parent, child).is_some() {
                continue;
            }
            self.graph.add_edge(parent, child, edge.kind);
        }

        let mut spouse_links: Vec<(NodeId, Neighbor)> = Vec::new();
        let mut spouse_pairs = 0usize;

        for union in std::mem::take(&mut self.pending_unions) {
            let members: Vec<NodeId> = union
                .distinct_members()
                .into_iter()
                .filter_map(|id| {
                    let index = self.id_index.get(id).copied();
                    if index.is_none() {
                        warn!("Union {} member {} is outside scope", union.id, id);
                        skipped += 1;
                    }
                    index
                })
                .collect();

            for (i, &a) in members.iter().enumerate() {
                for &b in &members[i + 1..] {
                    let meta = EdgeMeta::Union {
                        union_id: union.id.clone(),
                        kind: union.kind,
                    };
                    spouse_links.push((
                        a,
                        Neighbor {
                            node: b,
                            direction: EdgeDirection::Spouse,
                            meta: meta.clone(),
                        },
                    ));
                    spouse_links.push((
                        b,
                        Neighbor {
                            node: a,
                            direction: EdgeDirection::Spouse,
                            meta,
                        },
                    ));
                    spouse_pairs += 1;
                }
            }
        }

        let adjacency = self.sorted_adjacency(spouse_links);
        let on_cycle = self.cycle_members();

        if !on_cycle.is_empty() {
            warn!(
                "Lineage contains a cycle through {} person(s)",
                on_cycle.len()
            );
        }

        info!(
            "Built graph index: {} persons, {} lineage edges, {} spouse pairs",
            self.graph.node_count(),
            self.graph.edge_count(),
            spouse_pairs
        );

        Ok(GraphIndex {
            lineage: self.graph,
            id_index: self.id_index,
            adjacency,
            on_cycle,
            spouse_pairs,
            skipped_edges: skipped,
            built_at: Utc::now(),
        })
    }

    /// Collects parents, children and spouses per node and sorts them
    /// into traversal order.
    fn sorted_adjacency(&self, spouse_links: Vec<(NodeId, Neighbor)>) -> Vec<Vec<Neighbor>> {
        let mut adjacency: Vec<Vec<Neighbor>> = vec![Vec::new(); self.graph.node_count()];

        for node in self.graph.node_indices() {
            let entry = &mut adjacency[node.index()];
            for edge_ref in self.graph.edges_directed(node, Direction::Incoming) {
                entry.push(Neighbor {
                    node: edge_ref.source(),
                    direction: EdgeDirection::Parent,
                    meta: EdgeMeta::ParentChild(*edge_ref.weight()),
                });
            }
            for edge_ref in self.graph.edges_directed(node, Direction::Outgoing) {
                entry.push(Neighbor {
                    node: edge_ref.target(),
                    direction: EdgeDirection::Child,
                    meta: EdgeMeta::ParentChild(*edge_ref.weight()),
                });
            }
        }

        for (owner, neighbor) in spouse_links {
            adjacency[owner.index()].push(neighbor);
        }

        for entry in &mut adjacency {
            entry.sort_by(|a, b| {
                a.direction
                    .rank()
                    .cmp(&b.direction.rank())
                    .then_with(|| self.graph[a.node].id.cmp(&self.graph[b.node].id))
            });
            // Repeated unions between the same pair collapse to the first.
            entry.dedup_by(|a, b| a.direction == b.direction && a.node == b.node);
        }

        adjacency
    }

    /// Nodes on a parent-child cycle: members of non-trivial strongly
    /// connected components, plus self-parents.
    fn cycle_members(&self) -> HashSet<NodeId> {
        let mut members = HashSet::new();
        for component in petgraph::algo::tarjan_scc(&self.graph) {
            if component.len() > 1 {
                members.extend(component);
            } else if let Some(&node) = component.first() {
                if self.graph.contains_edge(node, node) {
                    members.insert(node);
                }
            }
        }
        members
    }
}
