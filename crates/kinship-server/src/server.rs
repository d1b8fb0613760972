//! WebSocket server implementation.
//!
//! Handles client connections and routes messages to handlers.

use crate::handlers::{
    handle_info, handle_resolve, handle_tree_info, handle_tree_invalidate, ServiceState,
    SharedState,
};
use crate::protocol::{Request, Response, TreeParams};
use futures_util::{SinkExt, StreamExt};
use kinship_graph::{RelationshipResolver, ResolveRequest, SnapshotSource};
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Default listening port.
pub const DEFAULT_PORT: u16 = 7433;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to.
    pub addr: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from((Ipv4Addr::LOCALHOST, DEFAULT_PORT)),
        }
    }
}

/// The Kinship WebSocket server.
pub struct KinshipServer {
    config: ServerConfig,
    state: SharedState,
}

impl KinshipServer {
    /// Creates a server reading trees from `source`.
    pub fn new(
        source: Box<dyn SnapshotSource>,
        resolver: RelationshipResolver,
        config: ServerConfig,
    ) -> Self {
        Self {
            config,
            state: Arc::new(ServiceState::new(source, resolver)),
        }
    }

    /// Returns a handle to the shared state.
    pub fn state(&self) -> SharedState {
        Arc::clone(&self.state)
    }

    /// Runs the server, accepting connections forever.
    pub async fn run(&self) -> Result<(), ServerError> {
        let listener = TcpListener::bind(&self.config.addr).await?;
        info!("Kinship server listening on {}", self.config.addr);

        loop {
            match listener.accept().await {
                Ok((stream, addr)) => {
                    debug!("New connection from {}", addr);
                    let state = self.state();
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, addr, state).await {
                            error!("Connection error from {}: {}", addr, e);
                        }
                    });
                }
                Err(e) => {
                    error!("Accept error: {}", e);
                }
            }
        }
    }
}

/// Handles a single WebSocket connection.
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    state: SharedState,
) -> Result<(), ServerError> {
    let ws_stream = accept_async(stream).await?;
    let connection = Uuid::new_v4();
    info!("WebSocket connection {} established with {}", connection, addr);

    let (mut write, mut read) = ws_stream.split();

    while let Some(msg) = read.next().await {
        let msg = match msg {
            Ok(m) => m,
            Err(e) => {
                warn!("Message error on {}: {}", connection, e);
                break;
            }
        };

        if msg.is_close() {
            debug!("Client {} disconnected", connection);
            break;
        }

        if msg.is_ping() {
            write.send(Message::Pong(msg.into_data())).await?;
            continue;
        }

        if msg.is_text() {
            let text = msg.to_text().unwrap_or("");
            let response = process_message(text, state.clone()).await;
            let json = serde_json::to_string(&response)?;
            write.send(Message::Text(json)).await?;
        }
    }

    info!("Connection {} closed", connection);
    Ok(())
}

/// Processes a JSON-RPC message and returns a response.
pub async fn process_message(text: &str, state: SharedState) -> Response {
    let request: Request = match serde_json::from_str(text) {
        Ok(r) => r,
        Err(_) => return Response::parse_error(),
    };

    let id = request.id.clone();
    let method = request.method.as_str();

    debug!("Processing method: {}", method);

    match method {
        "graph.info" => handle_info(state, id).await,

        "tree.info" => match serde_json::from_value::<TreeParams>(request.params) {
            Ok(params) => handle_tree_info(state, id, params).await,
            Err(e) => Response::invalid_params(id, e.to_string()),
        },

        "tree.invalidate" => match serde_json::from_value::<TreeParams>(request.params) {
            Ok(params) => handle_tree_invalidate(state, id, params).await,
            Err(e) => Response::invalid_params(id, e.to_string()),
        },

        "relationship.resolve" => match serde_json::from_value::<ResolveRequest>(request.params) {
            Ok(params) => handle_resolve(state, id, params).await,
            Err(e) => Response::invalid_params(id, e.to_string()),
        },

        _ => Response::method_not_found(id, method),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::codes;
    use kinship_core::{ParentChildEdge, Person, Sex, TreeSnapshot};
    use kinship_graph::MemorySource;
    use serde_json::{json, Value};

    fn state() -> (SharedState, Arc<MemorySource>) {
        let source = Arc::new(MemorySource::new());
        source.put(
            "smiths",
            TreeSnapshot {
                persons: vec![
                    Person::new("ada", "Ada").with_sex(Sex::Female),
                    Person::new("ben", "Ben").with_sex(Sex::Male),
                    Person::new("cora", "Cora").with_sex(Sex::Female),
                    Person::new("dev", "Dev").with_sex(Sex::Male),
                ],
                parent_child_edges: vec![
                    ParentChildEdge::biological("ada", "ben"),
                    ParentChildEdge::biological("ada", "cora"),
                    ParentChildEdge::biological("ben", "dev"),
                ],
                union_edges: Vec::new(),
            },
        );
        let state = Arc::new(ServiceState::new(
            Box::new(Arc::clone(&source)),
            RelationshipResolver::default(),
        ));
        (state, source)
    }

    async fn call(state: &SharedState, request: Value) -> Value {
        let response = process_message(&request.to_string(), Arc::clone(state)).await;
        serde_json::to_value(response).unwrap()
    }

    #[tokio::test]
    async fn test_resolve_method() {
        let (state, _) = state();
        let value = call(
            &state,
            json!({
                "jsonrpc": "2.0",
                "id": 1,
                "method": "relationship.resolve",
                "params": { "person1Id": "cora", "person2Id": "dev", "treeScope": "smiths" }
            }),
        )
        .await;

        let result = &value["result"];
        assert_eq!(result["pathFound"], true);
        assert_eq!(result["pathLength"], 3);
        assert_eq!(result["path"][0]["edgeToNext"], "parent");
        assert_eq!(result["path"][3]["edgeToNext"], "none");
        assert_eq!(result["commonAncestors"][0]["personId"], "ada");
        assert_eq!(result["relationshipKind"]["kind"], "aunt_uncle_niece_nephew");
        assert_eq!(result["relationshipLabel"], "nephew");
    }

    #[tokio::test]
    async fn test_unknown_person_is_input_error() {
        let (state, _) = state();
        let value = call(
            &state,
            json!({
                "jsonrpc": "2.0",
                "id": 2,
                "method": "relationship.resolve",
                "params": { "person1Id": "cora", "person2Id": "ghost" }
            }),
        )
        .await;
        assert_eq!(value["error"]["code"], codes::INPUT_ERROR);
        assert_eq!(value["error"]["data"]["class"], "input");
    }

    #[tokio::test]
    async fn test_tree_info_and_invalidate() {
        let (state, source) = state();
        let info = call(
            &state,
            json!({ "jsonrpc": "2.0", "id": 3, "method": "tree.info", "params": { "tree": "smiths" } }),
        )
        .await;
        assert_eq!(info["result"]["personCount"], 4);
        assert_eq!(info["result"]["generation"], 1);

        source.put("smiths", TreeSnapshot::default());
        let dropped = call(
            &state,
            json!({ "jsonrpc": "2.0", "id": 4, "method": "tree.invalidate", "params": { "tree": "smiths" } }),
        )
        .await;
        assert_eq!(dropped["result"]["droppedScopes"], 1);

        let graph = call(&state, json!({ "jsonrpc": "2.0", "id": 5, "method": "graph.info" })).await;
        assert_eq!(graph["result"]["trees"], json!(["smiths"]));
        assert_eq!(graph["result"]["cachedScopes"], json!([]));
    }

    #[tokio::test]
    async fn test_protocol_errors() {
        let (state, _) = state();
        let parse = process_message("not json", Arc::clone(&state)).await;
        assert_eq!(parse.error.map(|e| e.code), Some(codes::PARSE_ERROR));

        let missing = call(&state, json!({ "jsonrpc": "2.0", "id": 6, "method": "nope" })).await;
        assert_eq!(missing["error"]["code"], codes::METHOD_NOT_FOUND);

        let bad = call(
            &state,
            json!({ "jsonrpc": "2.0", "id": 7, "method": "tree.info", "params": {} }),
        )
        .await;
        assert_eq!(bad["error"]["code"], codes::INVALID_PARAMS);
    }
}
