//! Request handlers for protocol methods.
//!
//! Each handler implements one method. Index builds and searches are
//! CPU-bound, so they run on the blocking pool.

use crate::protocol::{codes, Response, TreeParams};
use kinship_core::{TreeId, TreeScope};
use kinship_graph::{
    ErrorClass, IndexCache, IndexStats, RelationshipResolver, ResolveError, ResolveRequest,
    SnapshotSource,
};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error};

/// Everything a connection needs to answer requests.
pub struct ServiceState {
    pub cache: IndexCache<Box<dyn SnapshotSource>>,
    pub resolver: RelationshipResolver,
}

impl ServiceState {
    pub fn new(source: Box<dyn SnapshotSource>, resolver: RelationshipResolver) -> Self {
        let config = resolver.config();
        let cache = IndexCache::new(source, config.cache_ttl())
            .with_max_scopes(config.cache_max_scopes);
        Self {
            cache,
            resolver,
        }
    }
}

/// Shared state across connections.
pub type SharedState = Arc<ServiceState>;

/// Maps a resolver error onto a JSON-RPC error.
pub fn error_response(id: Option<Value>, err: &ResolveError) -> Response {
    match err.class() {
        ErrorClass::Input => Response::error(id, codes::INPUT_ERROR, err.to_string())
            .with_data(json!({ "class": ErrorClass::Input })),
        ErrorClass::Invariant => Response::error(id, codes::INTERNAL_ERROR, err.to_string())
            .with_data(json!({ "class": ErrorClass::Invariant })),
    }
}

async fn blocking<T, F>(id: &Option<Value>, work: F) -> Result<T, Response>
where
    T: Send + 'static,
    F: FnOnce() -> kinship_graph::Result<T> + Send + 'static,
{
    match tokio::task::spawn_blocking(work).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(error_response(id.clone(), &err)),
        Err(join) => {
            error!("Worker task failed: {}", join);
            Err(Response::error(
                id.clone(),
                codes::INTERNAL_ERROR,
                "worker task failed",
            ))
        }
    }
}

/// Handles the graph.info method.
pub async fn handle_info(state: SharedState, id: Option<Value>) -> Response {
    #[derive(Serialize)]
    struct InfoResult {
        version: &'static str,
        trees: Vec<TreeId>,
        #[serde(rename = "cachedScopes")]
        cached_scopes: Vec<TreeScope>,
        languages: Vec<String>,
    }

    let trees = match state.cache.source().trees() {
        Ok(trees) => trees,
        Err(err) => return error_response(id, &err),
    };

    Response::success(
        id,
        InfoResult {
            version: env!("CARGO_PKG_VERSION"),
            trees,
            cached_scopes: state.cache.cached_scopes(),
            languages: state
                .resolver
                .labels()
                .languages()
                .into_iter()
                .map(String::from)
                .collect(),
        },
    )
}

/// Handles the tree.info method.
pub async fn handle_tree_info(state: SharedState, id: Option<Value>, params: TreeParams) -> Response {
    #[derive(Serialize)]
    #[serde(rename_all = "camelCase")]
    struct TreeInfo {
        tree: TreeId,
        generation: u64,
        #[serde(flatten)]
        stats: IndexStats,
        query_time: u64,
    }

    let start = Instant::now();
    debug!("Tree info: {}", params.tree);

    let worker = Arc::clone(&state);
    let tree = params.tree.clone();
    let result = blocking(&id, move || {
        let generation = worker.cache.source().generation(&tree)?;
        let index = worker.cache.get(&TreeScope::Tree(tree))?;
        Ok((generation, index.stats()))
    })
    .await;

    match result {
        Ok((generation, stats)) => Response::success(
            id,
            TreeInfo {
                tree: params.tree,
                generation,
                stats,
                query_time: start.elapsed().as_millis() as u64,
            },
        ),
        Err(response) => response,
    }
}

/// Handles the tree.invalidate method.
pub async fn handle_tree_invalidate(
    state: SharedState,
    id: Option<Value>,
    params: TreeParams,
) -> Response {
    let dropped = state.cache.invalidate(&params.tree);
    Response::success(
        id,
        json!({
            "tree": params.tree,
            "droppedScopes": dropped
        }),
    )
}

/// Handles the relationship.resolve method.
pub async fn handle_resolve(
    state: SharedState,
    id: Option<Value>,
    request: ResolveRequest,
) -> Response {
    debug!(
        "Resolve {} -> {} in {:?}",
        request.person1_id, request.person2_id, request.tree_scope
    );

    let worker = Arc::clone(&state);
    let result = blocking(&id, move || {
        worker.resolver.resolve_cached(&worker.cache, &request)
    })
    .await;

    match result {
        Ok(response) => Response::success(id, response),
        Err(response) => response,
    }
}
