//! JSON-RPC 2.0 message types.

use kinship_core::TreeId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Error codes beyond the JSON-RPC reserved range.
pub mod codes {
    pub const PARSE_ERROR: i32 = -32700;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL_ERROR: i32 = -32603;
    /// Unknown person, unknown tree or empty scope.
    pub const INPUT_ERROR: i32 = -32001;
}

/// An incoming request.
#[derive(Debug, Clone, Deserialize)]
pub struct Request {
    #[serde(default)]
    pub jsonrpc: String,
    pub method: String,
    #[serde(default)]
    pub params: Value,
    #[serde(default)]
    pub id: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i32,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// An outgoing response: exactly one of `result` and `error` is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
    pub id: Option<Value>,
}

impl Response {
    pub fn success<T: Serialize>(id: Option<Value>, result: T) -> Self {
        match serde_json::to_value(result) {
            Ok(value) => Self {
                jsonrpc: "2.0".to_string(),
                result: Some(value),
                error: None,
                id,
            },
            Err(e) => Self::error(id, codes::INTERNAL_ERROR, e.to_string()),
        }
    }

    pub fn error(id: Option<Value>, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            result: None,
            error: Some(RpcError {
                code,
                message: message.into(),
                data: None,
            }),
            id,
        }
    }

    /// Attaches structured detail to an error response.
    pub fn with_data(mut self, data: Value) -> Self {
        if let Some(error) = self.error.as_mut() {
            error.data = Some(data);
        }
        self
    }

    pub fn parse_error() -> Self {
        Self::error(None, codes::PARSE_ERROR, "Parse error")
    }

    pub fn invalid_params(id: Option<Value>, message: impl Into<String>) -> Self {
        Self::error(id, codes::INVALID_PARAMS, message)
    }

    pub fn method_not_found(id: Option<Value>, method: &str) -> Self {
        Self::error(
            id,
            codes::METHOD_NOT_FOUND,
            format!("Method not found: {}", method),
        )
    }
}

/// Params of the per-tree methods.
#[derive(Debug, Clone, Deserialize)]
pub struct TreeParams {
    pub tree: TreeId,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_success_shape() {
        let response = Response::success(Some(json!(1)), json!({ "ok": true }));
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["jsonrpc"], "2.0");
        assert_eq!(value["result"]["ok"], true);
        assert!(value.get("error").is_none());
    }

    #[test]
    fn test_error_shape() {
        let response = Response::method_not_found(Some(json!("a")), "nope").with_data(json!(7));
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["error"]["code"], codes::METHOD_NOT_FOUND);
        assert_eq!(value["error"]["data"], 7);
        assert!(value.get("result").is_none());
    }

    #[test]
    fn test_request_without_params() {
        let request: Request =
            serde_json::from_str(r#"{"jsonrpc":"2.0","method":"graph.info","id":3}"#).unwrap();
        assert_eq!(request.method, "graph.info");
        assert!(request.params.is_null());
    }
}
