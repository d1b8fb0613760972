//! Core graph data structure.
//!
//! The GraphIndex wraps a petgraph lineage graph and adds the indexes the
//! resolver needs: id lookups, pre-sorted adjacency lists and the set of
//! persons caught in a parent-child cycle. Once built it never changes,
//! so it can be shared freely between concurrent resolutions.

use crate::builder::IndexBuilder;
use crate::edge::{EdgeDirection, EdgeMeta, Neighbor};
use crate::error::{ResolveError, Result};
use chrono::{DateTime, Utc};
use kinship_core::{ParentChildKind, Person, PersonId, TreeSnapshot};
use petgraph::graph::{DiGraph, NodeIndex};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// Unique identifier of a person inside one index.
pub type NodeId = NodeIndex;

/// Read-only adjacency view over one tree scope.
#[derive(Debug)]
pub struct GraphIndex {
    /// Parent → child lineage edges.
    pub(crate) lineage: DiGraph<Person, ParentChildKind>,

    /// Maps person ids to graph node indexes.
    pub(crate) id_index: HashMap<PersonId, NodeId>,

    /// Neighbors per node, in traversal tie-break order.
    pub(crate) adjacency: Vec<Vec<Neighbor>>,

    /// Persons that are (transitively) their own ancestor.
    pub(crate) on_cycle: HashSet<NodeId>,

    /// Spouse pairs contributed by unions.
    pub(crate) spouse_pairs: usize,

    /// Edges dropped because an endpoint is outside the scope.
    pub(crate) skipped_edges: usize,

    pub(crate) built_at: DateTime<Utc>,
}

impl GraphIndex {
    /// Builds an index over a snapshot.
    ///
    /// Fails with `EmptyScope` when the snapshot has no persons.
    pub fn build(snapshot: &TreeSnapshot) -> Result<Self> {
        let mut builder = IndexBuilder::new();
        builder.add_snapshot(snapshot.clone());
        builder.build()
    }

    /// Gets the node index for a person id.
    pub fn get_index(&self, id: &PersonId) -> Option<NodeId> {
        self.id_index.get(id).copied()
    }

    /// Like `get_index`, but an absent person is an input error.
    pub fn require(&self, id: &PersonId) -> Result<NodeId> {
        self.get_index(id)
            .ok_or_else(|| ResolveError::UnknownPerson(id.clone()))
    }

    /// Gets a person by graph index.
    pub fn get(&self, index: NodeId) -> Option<&Person> {
        self.lineage.node_weight(index)
    }

    /// Gets a person by id.
    pub fn get_by_id(&self, id: &PersonId) -> Option<&Person> {
        self.get(self.get_index(id)?)
    }

    pub fn contains(&self, id: &PersonId) -> bool {
        self.id_index.contains_key(id)
    }

    /// Adjacency of a node: parents, then children, then spouses, each
    /// group ordered by person id.
    pub fn neighbors(&self, index: NodeId) -> &[Neighbor] {
        self.adjacency
            .get(index.index())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Adjacency of a person, addressed by id.
    pub fn neighbors_of(&self, id: &PersonId) -> Result<Vec<(&PersonId, EdgeDirection, &EdgeMeta)>> {
        let index = self.require(id)?;
        Ok(self
            .neighbors(index)
            .iter()
            .filter_map(|n| Some((&self.get(n.node)?.id, n.direction, &n.meta)))
            .collect())
    }

    /// Recorded parents of a node, ordered by id.
    pub fn parents(&self, index: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.neighbors(index)
            .iter()
            .filter(|n| n.direction == EdgeDirection::Parent)
            .map(|n| n.node)
    }

    /// Recorded parents of a person, ordered by id.
    pub fn parents_of(&self, id: &PersonId) -> Result<Vec<&PersonId>> {
        let index = self.require(id)?;
        Ok(self
            .parents(index)
            .filter_map(|p| self.get(p).map(|person| &person.id))
            .collect())
    }

    /// Whether a node sits on a parent-child cycle.
    pub fn is_on_cycle(&self, index: NodeId) -> bool {
        self.on_cycle.contains(&index)
    }

    /// Persons caught in parent-child cycles, ordered by id.
    pub fn cycle_members(&self) -> Vec<&PersonId> {
        let mut members: Vec<&PersonId> = self
            .on_cycle
            .iter()
            .filter_map(|idx| self.get(*idx).map(|p| &p.id))
            .collect();
        members.sort();
        members
    }

    /// Returns the number of persons.
    pub fn person_count(&self) -> usize {
        self.lineage.node_count()
    }

    /// Returns the number of parent-child edges.
    pub fn lineage_edge_count(&self) -> usize {
        self.lineage.edge_count()
    }

    /// Iterates over all persons.
    pub fn persons(&self) -> impl Iterator<Item = &Person> {
        self.lineage.node_weights()
    }

    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }
}

/// Index statistics for the info endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexStats {
    pub person_count: usize,
    pub lineage_edge_count: usize,
    pub spouse_pair_count: usize,
    pub skipped_edge_count: usize,
    pub cycle_members: Vec<PersonId>,
    pub built_at: DateTime<Utc>,
}

impl GraphIndex {
    /// Returns index statistics.
    pub fn stats(&self) -> IndexStats {
        IndexStats {
            person_count: self.person_count(),
            lineage_edge_count: self.lineage_edge_count(),
            spouse_pair_count: self.spouse_pairs,
            skipped_edge_count: self.skipped_edges,
            cycle_members: self.cycle_members().into_iter().cloned().collect(),
            built_at: self.built_at,
        }
    }
}
