//! Wire protocol types
//!
//! Frames are JSON-RPC style objects, one per line. Requests carry an `id`
//! and get exactly one response; notifications carry none and get nothing.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::error::BridgeError;

pub const JSONRPC_VERSION: &str = "2.0";

pub const PARSE_ERROR: i64 = -32700;
pub const INVALID_REQUEST: i64 = -32600;
pub const METHOD_NOT_FOUND: i64 = -32601;
pub const INVALID_PARAMS: i64 = -32602;
pub const INTERNAL_ERROR: i64 = -32603;
pub const UNKNOWN_VIEW: i64 = -32001;
pub const CACHE_REJECTED: i64 = -32002;

pub const INITIALIZE: &str = "initialize";
pub const NEW_BUFFER: &str = "new_buffer";
pub const UPDATE: &str = "update";
pub const DID_SAVE: &str = "did_save";
pub const DID_CLOSE: &str = "did_close";
pub const SHUTDOWN: &str = "shutdown";
pub const EDIT: &str = "edit";

/// Methods the bridge accepts from the host
pub const INBOUND_METHODS: &[&str] = &[INITIALIZE, NEW_BUFFER, UPDATE, DID_SAVE, DID_CLOSE, SHUTDOWN];

/// Methods the bridge sends to the host
pub const OUTBOUND_METHODS: &[&str] = &[EDIT];

/// Request identifier, echoed verbatim in the response
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    Number(i64),
    String(String),
}

/// JSON-RPC error object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// A frame received from the host
#[derive(Debug, Clone, PartialEq)]
pub enum Incoming {
    Request {
        id: RequestId,
        method: String,
        params: Value,
    },
    Notification {
        method: String,
        params: Value,
    },
    /// Reply to something we sent; the bridge never issues requests
    Response { id: RequestId },
}

impl Incoming {
    pub fn request(id: RequestId, method: impl Into<String>, params: Value) -> Self {
        Incoming::Request {
            id,
            method: method.into(),
            params,
        }
    }

    pub fn notification(method: impl Into<String>, params: Value) -> Self {
        Incoming::Notification {
            method: method.into(),
            params,
        }
    }

    /// Parses one line of input
    ///
    /// Input that is not JSON fails with [`BridgeError::MalformedFrame`].
    /// JSON that is not a usable frame fails with
    /// [`BridgeError::InvalidFrame`], carrying the frame's `id` when it had
    /// a readable one so the sender can still be answered.
    pub fn parse(line: &str) -> Result<Self, BridgeError> {
        let frame: Value =
            serde_json::from_str(line).map_err(|e| BridgeError::MalformedFrame(e.to_string()))?;
        let Value::Object(mut frame) = frame else {
            return Err(invalid(None, "frame is not an object"));
        };

        let id = match frame.remove("id") {
            None | Some(Value::Null) => None,
            Some(id) => Some(
                serde_json::from_value::<RequestId>(id)
                    .map_err(|e| invalid(None, format!("invalid id: {}", e)))?,
            ),
        };
        let method = match frame.remove("method") {
            None => None,
            Some(Value::String(method)) => Some(method),
            Some(_) => return Err(invalid(id, "method must be a string")),
        };
        let params = frame.remove("params").unwrap_or(Value::Null);

        match (id, method) {
            (Some(id), Some(method)) => Ok(Incoming::Request { id, method, params }),
            (None, Some(method)) => Ok(Incoming::Notification { method, params }),
            (Some(id), None) if is_response(&frame) => Ok(Incoming::Response { id }),
            (id, None) => Err(invalid(id, "frame has neither a method nor a result")),
        }
    }

    pub fn method(&self) -> Option<&str> {
        match self {
            Incoming::Request { method, .. } | Incoming::Notification { method, .. } => {
                Some(method)
            }
            Incoming::Response { .. } => None,
        }
    }
}

fn is_response(frame: &Map<String, Value>) -> bool {
    frame.contains_key("result") || frame.contains_key("error")
}

fn invalid(id: Option<RequestId>, reason: impl Into<String>) -> BridgeError {
    BridgeError::InvalidFrame {
        id,
        reason: reason.into(),
    }
}

/// Response to a host request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Response {
    pub jsonrpc: &'static str,
    /// `null` only when answering a frame whose id could not be read
    pub id: Option<RequestId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl Response {
    pub fn success(id: RequestId, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id: Some(id),
            result: Some(result),
            error: None,
        }
    }

    pub fn error(id: RequestId, error: RpcError) -> Self {
        Self::rejected(Some(id), error)
    }

    /// Error response to a frame that could not be handled at all
    pub fn rejected(id: Option<RequestId>, error: RpcError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            result: None,
            error: Some(error),
        }
    }
}

/// Notification sent to the host
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub jsonrpc: &'static str,
    pub method: String,
    pub params: Value,
}

impl Notification {
    pub fn new(method: impl Into<String>, params: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            method: method.into(),
            params,
        }
    }
}

/// Manifest declaring what the plugin speaks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginManifest {
    pub name: String,
    pub version: String,
    pub description: String,

    /// Methods accepted from the host
    pub inbound: Vec<String>,

    /// Methods sent to the host
    pub outbound: Vec<String>,
}

impl PluginManifest {
    /// Manifest for this build
    pub fn current() -> Self {
        Self {
            name: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            description: env!("CARGO_PKG_DESCRIPTION").to_string(),
            inbound: INBOUND_METHODS.iter().map(|m| m.to_string()).collect(),
            outbound: OUTBOUND_METHODS.iter().map(|m| m.to_string()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_request() {
        let msg = Incoming::parse(r#"{"jsonrpc":"2.0","id":3,"method":"update","params":{"rev":1}}"#)
            .unwrap();

        assert_eq!(
            msg,
            Incoming::request(RequestId::Number(3), "update", json!({"rev": 1}))
        );
        assert_eq!(msg.method(), Some("update"));
    }

    #[test]
    fn parse_notification_without_jsonrpc_member() {
        let msg = Incoming::parse(r#"{"method":"initialize","params":{"plugin_id":1}}"#).unwrap();
        assert_eq!(
            msg,
            Incoming::notification("initialize", json!({"plugin_id": 1}))
        );
    }

    #[test]
    fn parse_string_id_and_missing_params() {
        let msg = Incoming::parse(r#"{"id":"abc","method":"update"}"#).unwrap();
        assert_eq!(
            msg,
            Incoming::request(RequestId::String("abc".to_string()), "update", Value::Null)
        );
    }

    #[test]
    fn parse_response() {
        let msg = Incoming::parse(r#"{"id":9,"result":null}"#).unwrap();
        assert_eq!(msg, Incoming::Response { id: RequestId::Number(9) });
        assert_eq!(msg.method(), None);
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(matches!(
            Incoming::parse("not json"),
            Err(BridgeError::MalformedFrame(_))
        ));
        assert!(matches!(
            Incoming::parse(r#"{"params":{}}"#),
            Err(BridgeError::InvalidFrame { id: None, .. })
        ));
        assert!(matches!(
            Incoming::parse(r#"{"id":1.5,"method":"update"}"#),
            Err(BridgeError::InvalidFrame { id: None, .. })
        ));
        assert!(matches!(
            Incoming::parse("[1, 2]"),
            Err(BridgeError::InvalidFrame { id: None, .. })
        ));
    }

    #[test]
    fn parse_keeps_id_of_rejected_requests() {
        assert!(matches!(
            Incoming::parse(r#"{"id":7,"method":5}"#),
            Err(BridgeError::InvalidFrame { id: Some(RequestId::Number(7)), .. })
        ));
        assert!(matches!(
            Incoming::parse(r#"{"id":"x"}"#),
            Err(BridgeError::InvalidFrame { id: Some(RequestId::String(ref s)), .. }) if s == "x"
        ));
    }

    #[test]
    fn response_serialization() {
        let ok = serde_json::to_value(Response::success(RequestId::Number(1), json!(0))).unwrap();
        assert_eq!(ok, json!({"jsonrpc": "2.0", "id": 1, "result": 0}));

        let err = Response::error(
            RequestId::String("x".to_string()),
            RpcError {
                code: METHOD_NOT_FOUND,
                message: "method not found: foo".to_string(),
                data: None,
            },
        );
        let err = serde_json::to_value(err).unwrap();
        assert_eq!(err["error"]["code"], METHOD_NOT_FOUND);
        assert!(err.get("result").is_none());

        let rejected = Response::rejected(
            None,
            RpcError {
                code: PARSE_ERROR,
                message: "malformed frame".to_string(),
                data: None,
            },
        );
        let rejected = serde_json::to_value(rejected).unwrap();
        assert_eq!(rejected["id"], Value::Null);
        assert_eq!(rejected["error"]["code"], PARSE_ERROR);
    }

    #[test]
    fn manifest_lists_methods() {
        let manifest = PluginManifest::current();

        assert_eq!(manifest.name, "plugin-bridge");
        assert!(manifest.inbound.contains(&"update".to_string()));
        assert_eq!(manifest.outbound, vec!["edit".to_string()]);
    }
}
