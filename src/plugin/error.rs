//! Bridge error types

use thiserror::Error;

use super::protocol::{
    RequestId, RpcError, CACHE_REJECTED, INTERNAL_ERROR, INVALID_PARAMS, INVALID_REQUEST, METHOD_NOT_FOUND,
    PARSE_ERROR, UNKNOWN_VIEW,
};
use crate::domain::CacheError;

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("malformed frame: {0}")]
    MalformedFrame(String),

    #[error("invalid frame: {reason}")]
    InvalidFrame {
        id: Option<RequestId>,
        reason: String,
    },

    #[error("failed to decode {method} params: {source}")]
    Decode {
        method: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("unknown view: {0}")]
    UnknownView(String),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error("hook panicked: {0}")]
    Hook(String),

    #[error("method not found: {0}")]
    MethodNotFound(String),

    #[error("no plugin id has been assigned yet")]
    NotInitialized,

    #[error("failed to encode message: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),
}

impl BridgeError {
    /// Whom to answer when a frame is rejected before dispatch
    ///
    /// `Some(None)` answers with a `null` id, as for input that was not JSON.
    /// `None` means the frame cannot be answered and is only logged.
    pub fn rejection_id(&self) -> Option<Option<RequestId>> {
        match self {
            BridgeError::MalformedFrame(_) => Some(None),
            BridgeError::InvalidFrame { id: Some(id), .. } => Some(Some(id.clone())),
            _ => None,
        }
    }

    /// Error object sent back to the host for this fault
    pub fn to_rpc_error(&self) -> RpcError {
        let code = match self {
            BridgeError::MalformedFrame(_) => PARSE_ERROR,
            BridgeError::InvalidFrame { .. } => INVALID_REQUEST,
            BridgeError::Decode { .. } => INVALID_PARAMS,
            BridgeError::UnknownView(_) => UNKNOWN_VIEW,
            BridgeError::Cache(_) => CACHE_REJECTED,
            BridgeError::MethodNotFound(_) => METHOD_NOT_FOUND,
            BridgeError::NotInitialized => INVALID_REQUEST,
            BridgeError::Hook(_) | BridgeError::Encode(_) | BridgeError::Transport(_) => {
                INTERNAL_ERROR
            }
        };

        let data = match self {
            BridgeError::UnknownView(view_id) => Some(serde_json::json!({ "view_id": view_id })),
            BridgeError::Cache(CacheError::StaleRevision { current, requested }) => {
                Some(serde_json::json!({ "current": current, "requested": requested }))
            }
            _ => None,
        };

        RpcError {
            code,
            message: self.to_string(),
            data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_view_maps_to_its_code() {
        let err = BridgeError::UnknownView("v9".to_string()).to_rpc_error();

        assert_eq!(err.code, UNKNOWN_VIEW);
        assert_eq!(err.message, "unknown view: v9");
        assert_eq!(err.data.unwrap()["view_id"], "v9");
    }

    #[test]
    fn rejected_frames_map_to_request_errors() {
        let malformed = BridgeError::MalformedFrame("eof".to_string());
        assert_eq!(malformed.to_rpc_error().code, PARSE_ERROR);
        assert_eq!(malformed.rejection_id(), Some(None));

        let invalid = BridgeError::InvalidFrame {
            id: Some(RequestId::Number(8)),
            reason: "no method".to_string(),
        };
        assert_eq!(invalid.to_rpc_error().code, INVALID_REQUEST);
        assert_eq!(invalid.rejection_id(), Some(Some(RequestId::Number(8))));

        let anonymous = BridgeError::InvalidFrame {
            id: None,
            reason: "no method".to_string(),
        };
        assert_eq!(anonymous.rejection_id(), None);
    }

    #[test]
    fn stale_revision_carries_both_revisions() {
        let err = BridgeError::from(CacheError::StaleRevision {
            current: 5,
            requested: 3,
        })
        .to_rpc_error();

        assert_eq!(err.code, CACHE_REJECTED);
        let data = err.data.unwrap();
        assert_eq!(data["current"], 5);
        assert_eq!(data["requested"], 3);
    }
}
