//! End-to-end resolution: path, pivots, kind and labels.

use crate::ancestors::CommonAncestorResolver;
use crate::cache::{IndexCache, SnapshotSource};
use crate::classify::RelationshipClassifier;
use crate::config::ResolverConfig;
use crate::error::{ErrorClass, ResolveError, Result};
use crate::graph::GraphIndex;
use crate::labels::LabelRenderer;
use crate::path::{PathFinder, PathOutcome, RelationshipPath};
use crate::query::{DisplayFields, EdgeToNext, PathNode, ResolutionResponse, ResolveRequest};
use kinship_core::{PersonId, Sex, TreeScope};
use std::time::Instant;
use tracing::{debug, error, info};

/// Answers relationship questions over built indexes.
pub struct RelationshipResolver {
    config: ResolverConfig,
    labels: LabelRenderer,
}

impl Default for RelationshipResolver {
    fn default() -> Self {
        Self::new(ResolverConfig::default(), LabelRenderer::default())
    }
}

impl RelationshipResolver {
    pub fn new(config: ResolverConfig, labels: LabelRenderer) -> Self {
        Self { config, labels }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub fn labels(&self) -> &LabelRenderer {
        &self.labels
    }

    /// Resolves a request against a cached index. A request without a
    /// scope runs over every tree the source knows, merged.
    pub fn resolve_cached<S: SnapshotSource>(
        &self,
        cache: &IndexCache<S>,
        request: &ResolveRequest,
    ) -> Result<ResolutionResponse> {
        let scope = match &request.tree_scope {
            Some(scope) => scope.clone(),
            None => TreeScope::merged(cache.source().trees()?),
        };
        let index = cache.get(&scope)?;
        self.resolve(&index, request)
    }

    /// Resolves a request against one index.
    ///
    /// "Not connected" and "depth exceeded" come back as `Ok` with
    /// `path_found == false`. Invariant violations are logged and
    /// returned as errors.
    pub fn resolve(&self, index: &GraphIndex, request: &ResolveRequest) -> Result<ResolutionResponse> {
        let started = Instant::now();
        let result = self.resolve_inner(index, request);

        match &result {
            Ok(response) => debug!(
                "Resolved {} -> {} in {:?}: found={} hops={}",
                request.person1_id,
                request.person2_id,
                started.elapsed(),
                response.path_found,
                response.path_length
            ),
            Err(err) if err.class() == ErrorClass::Invariant => error!(
                "Resolution {} -> {} violates an invariant: {}",
                request.person1_id, request.person2_id, err
            ),
            Err(err) => debug!("Rejected {} -> {}: {}", request.person1_id, request.person2_id, err),
        }

        result
    }

    fn resolve_inner(&self, index: &GraphIndex, request: &ResolveRequest) -> Result<ResolutionResponse> {
        let limits = self.config.limits(request.max_search_depth);
        let language = request
            .language
            .as_deref()
            .unwrap_or(self.config.default_language.as_str());

        let outcome =
            PathFinder::new(index).find_path(&request.person1_id, &request.person2_id, &limits)?;

        let path = match outcome {
            PathOutcome::Found(path) => path,
            PathOutcome::NotConnected => {
                return Ok(ResolutionResponse::not_found(format!(
                    "{} and {} are not connected",
                    request.person1_id, request.person2_id
                )));
            }
            PathOutcome::DepthExceeded { max_depth } => {
                return Ok(ResolutionResponse::not_found(format!(
                    "no path within {} hops; retry with a larger maxSearchDepth",
                    max_depth
                )));
            }
        };

        let analysis = CommonAncestorResolver::new(index).resolve(&path)?;
        let classification = RelationshipClassifier::classify(&path, &analysis)?;
        let label = self.labels.render(
            &classification,
            sex_of(index, path.target()),
            Some(language),
        );

        info!(
            "{} -> {}: {} ({})",
            request.person1_id, request.person2_id, classification.kind, label.text
        );

        Ok(ResolutionResponse {
            path_found: true,
            path: self.path_nodes(index, &path, language)?,
            common_ancestors: analysis.ancestors,
            relationship_kind: Some(classification.kind),
            relationship_label_key: Some(label.key),
            relationship_label: Some(label.text),
            lineage: Some(classification.lineage),
            path_length: path.len(),
            error_message: None,
        })
    }

    fn path_nodes(
        &self,
        index: &GraphIndex,
        path: &RelationshipPath,
        language: &str,
    ) -> Result<Vec<PathNode>> {
        let persons = path.persons();
        persons
            .iter()
            .enumerate()
            .map(|(i, id)| {
                let person = index
                    .get_by_id(id)
                    .ok_or_else(|| ResolveError::UnknownPerson(id.clone()))?;
                let link = path.links().get(i);
                let relation_to_next = match (link, persons.get(i + 1)) {
                    (Some(link), Some(next)) => Some(
                        self.labels
                            .render_step(link.direction, sex_of(index, next), Some(language))
                            .text,
                    ),
                    _ => None,
                };
                Ok(PathNode {
                    person_id: id.clone(),
                    display_fields: DisplayFields::from(person),
                    edge_to_next: link.map_or(EdgeToNext::None, |l| l.direction.into()),
                    relation_to_next,
                })
            })
            .collect()
    }
}

fn sex_of(index: &GraphIndex, id: &PersonId) -> Sex {
    index.get_by_id(id).map(|p| p.sex).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemorySource;
    use crate::classify::RelationshipKind;
    use crate::labels::LabelTable;
    use kinship_core::{ParentChildEdge, ParentChildKind, Person, TreeSnapshot, UnionEdge};
    use std::time::Duration;

    fn ada_family() -> TreeSnapshot {
        TreeSnapshot {
            persons: vec![
                Person::new("ada", "Ada").with_sex(Sex::Female),
                Person::new("ben", "Ben").with_sex(Sex::Male),
                Person::new("cora", "Cora").with_sex(Sex::Female),
                Person::new("dev", "Dev").with_sex(Sex::Male),
                Person::new("eve", "Eve").with_sex(Sex::Female),
                Person::new("kai", "Kai"),
                Person::new("lone", "Lone"),
            ],
            parent_child_edges: vec![
                ParentChildEdge::biological("ada", "ben"),
                ParentChildEdge::biological("ada", "cora"),
                ParentChildEdge::biological("ben", "dev"),
                ParentChildEdge::new("eve", "kai", ParentChildKind::Adoptive),
            ],
            union_edges: vec![UnionEdge::marriage("u1", "ben", "eve")],
        }
    }

    fn resolve(request: ResolveRequest) -> Result<ResolutionResponse> {
        let index = GraphIndex::build(&ada_family()).unwrap();
        RelationshipResolver::default().resolve(&index, &request)
    }

    #[test]
    fn test_aunt_nephew_response() {
        let response = resolve(ResolveRequest::new("cora", "dev")).unwrap();

        assert!(response.path_found);
        assert_eq!(response.path_length, 3);
        let ids: Vec<&str> = response.path.iter().map(|n| n.person_id.as_str()).collect();
        assert_eq!(ids, vec!["cora", "ada", "ben", "dev"]);
        let edges: Vec<EdgeToNext> = response.path.iter().map(|n| n.edge_to_next).collect();
        assert_eq!(
            edges,
            vec![EdgeToNext::Parent, EdgeToNext::Child, EdgeToNext::Child, EdgeToNext::None]
        );
        assert_eq!(response.path[0].relation_to_next.as_deref(), Some("mother"));
        assert_eq!(response.path[1].relation_to_next.as_deref(), Some("son"));
        assert!(response.path[3].relation_to_next.is_none());

        assert_eq!(response.common_ancestors.len(), 1);
        assert_eq!(response.common_ancestors[0].person_id.as_str(), "ada");
        assert_eq!(
            response.relationship_kind,
            Some(RelationshipKind::AuntUncleNieceNephew { greats: 0 })
        );
        assert_eq!(response.relationship_label.as_deref(), Some("nephew"));
        assert_eq!(response.relationship_label_key.as_deref(), Some("niece_nephew.male"));
    }

    #[test]
    fn test_self_resolution() {
        let response = resolve(ResolveRequest::new("ada", "ada")).unwrap();
        assert!(response.path_found);
        assert_eq!(response.path_length, 0);
        assert_eq!(response.relationship_kind, Some(RelationshipKind::Oneself));
        assert_eq!(response.path[0].edge_to_next, EdgeToNext::None);
    }

    #[test]
    fn test_not_connected_is_an_answer() {
        let response = resolve(ResolveRequest::new("ada", "lone")).unwrap();
        assert!(!response.path_found);
        assert!(response.path.is_empty());
        assert!(response.common_ancestors.is_empty());
        assert!(response.error_message.unwrap().contains("not connected"));
    }

    #[test]
    fn test_depth_exceeded_suggests_retry() {
        let response = resolve(ResolveRequest::new("cora", "dev").with_max_depth(2)).unwrap();
        assert!(!response.path_found);
        assert!(response.error_message.unwrap().contains("maxSearchDepth"));
    }

    #[test]
    fn test_unknown_person_is_input_error() {
        let err = resolve(ResolveRequest::new("ada", "ghost")).unwrap_err();
        assert_eq!(err.class(), ErrorClass::Input);
    }

    #[test]
    fn test_adoptive_step_and_in_law_labels() {
        // Ben's wife Eve adopted Kai: Kai is Ben's step-child.
        let response = resolve(ResolveRequest::new("ben", "kai")).unwrap();
        assert_eq!(response.relationship_label.as_deref(), Some("step-child"));

        let response = resolve(ResolveRequest::new("eve", "kai")).unwrap();
        assert_eq!(response.lineage, Some(ParentChildKind::Adoptive));
        assert_eq!(response.relationship_label.as_deref(), Some("adoptive child"));

        let response = resolve(ResolveRequest::new("eve", "ada")).unwrap();
        assert_eq!(response.relationship_label.as_deref(), Some("mother-in-law"));
        assert!(response.common_ancestors[0].by_marriage);
    }

    #[test]
    fn test_language_selection() {
        let fixture = LabelTable::from_json(
            r#"{ "language": "xx", "terms": { "niece_nephew.male": "NEPHEW" } }"#,
        )
        .unwrap();
        let resolver = RelationshipResolver::new(
            ResolverConfig::default(),
            LabelRenderer::default().with_table(fixture),
        );
        let index = GraphIndex::build(&ada_family()).unwrap();

        let response = resolver
            .resolve(&index, &ResolveRequest::new("cora", "dev").with_language("xx"))
            .unwrap();
        assert_eq!(response.relationship_label.as_deref(), Some("NEPHEW"));

        let response = resolver
            .resolve(&index, &ResolveRequest::new("cora", "dev").with_language("zz"))
            .unwrap();
        assert_eq!(response.relationship_label.as_deref(), Some("nephew"));
    }

    #[test]
    fn test_resolve_cached_merges_all_trees() {
        let source = MemorySource::new();
        source.put(
            "left",
            TreeSnapshot {
                persons: vec![Person::new("a", "A"), Person::new("b", "B")],
                parent_child_edges: vec![ParentChildEdge::biological("a", "b")],
                union_edges: Vec::new(),
            },
        );
        source.put(
            "right",
            TreeSnapshot {
                persons: vec![Person::new("b", "B"), Person::new("c", "C")],
                parent_child_edges: vec![ParentChildEdge::biological("b", "c")],
                union_edges: Vec::new(),
            },
        );
        let cache = IndexCache::new(source, Duration::from_secs(60));
        let resolver = RelationshipResolver::default();

        let response = resolver
            .resolve_cached(&cache, &ResolveRequest::new("a", "c"))
            .unwrap();
        assert_eq!(
            response.relationship_kind,
            Some(RelationshipKind::GrandparentGrandchild { greats: 0 })
        );

        let err = resolver
            .resolve_cached(
                &cache,
                &ResolveRequest::new("a", "c").with_scope(TreeScope::Tree("left".into())),
            )
            .unwrap_err();
        assert!(matches!(err, ResolveError::UnknownPerson(_)));
    }
}
