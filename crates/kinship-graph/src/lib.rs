//! Kinship Graph - Relationship resolution
//!
//! This crate answers "how are these two people related?" over a tree
//! snapshot. It builds an immutable index of parent, child and spouse
//! links, finds the canonical shortest path between two persons, extracts
//! their common ancestors and names the relationship.
//!
//! # Architecture
//!
//! The index uses petgraph for the parent → child lineage graph, with
//! extra structures for:
//! - Id lookups
//! - Pre-sorted adjacency (parents, children, spouses; each by id)
//! - Persons caught in a parent-child cycle
//!
//! A resolution runs `PathFinder` → `CommonAncestorResolver` →
//! `RelationshipClassifier` → `LabelRenderer`.
//!
//! # Example
//!
//! ```
//! use kinship_core::{ParentChildEdge, Person, Sex, TreeSnapshot};
//! use kinship_graph::{GraphIndex, RelationshipResolver, ResolveRequest};
//!
//! let mut snapshot = TreeSnapshot::default();
//! for (id, sex) in [("ada", Sex::Female), ("ben", Sex::Male), ("cora", Sex::Female), ("dev", Sex::Male)] {
//!     snapshot.persons.push(Person::new(id, id).with_sex(sex));
//! }
//! snapshot.parent_child_edges.push(ParentChildEdge::biological("ada", "ben"));
//! snapshot.parent_child_edges.push(ParentChildEdge::biological("ada", "cora"));
//! snapshot.parent_child_edges.push(ParentChildEdge::biological("ben", "dev"));
//!
//! let index = GraphIndex::build(&snapshot).unwrap();
//! let response = RelationshipResolver::default()
//!     .resolve(&index, &ResolveRequest::new("cora", "dev"))
//!     .unwrap();
//!
//! assert_eq!(response.relationship_label.as_deref(), Some("nephew"));
//! ```

mod ancestors;
mod builder;
mod cache;
mod classify;
mod config;
mod edge;
mod error;
mod graph;
mod labels;
mod path;
mod query;
mod resolver;

pub use ancestors::{AncestorAnalysis, CommonAncestor, CommonAncestorResolver, PathShape};
pub use builder::IndexBuilder;
pub use cache::{DirectorySource, IndexCache, MemorySource, SnapshotSource, DEFAULT_MAX_SCOPES};
pub use classify::{Classification, RelationshipClassifier, RelationshipKind};
pub use config::ResolverConfig;
pub use edge::{EdgeDirection, EdgeMeta, Link, Neighbor};
pub use error::{ErrorClass, ResolveError, Result};
pub use graph::{GraphIndex, IndexStats, NodeId};
pub use labels::{LabelPatterns, LabelRenderer, LabelTable, RenderedLabel};
pub use path::{PathFinder, PathOutcome, RelationshipPath, SearchLimits, DEFAULT_MAX_DEPTH};
pub use query::{DisplayFields, EdgeToNext, PathNode, ResolutionResponse, ResolveRequest};
pub use resolver::RelationshipResolver;
