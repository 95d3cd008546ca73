use std::time::Duration;

use thiserror::Error;

/// `RPC_MISC_ERROR`
pub const RPC_MISC_ERROR: i64 = -1;
/// `RPC_INVALID_ADDRESS_OR_KEY`: unknown txid, unknown block hash, bad address.
pub const RPC_INVALID_ADDRESS_OR_KEY: i64 = -5;
/// `RPC_INVALID_PARAMETER`: e.g. block height out of range.
pub const RPC_INVALID_PARAMETER: i64 = -8;
/// `RPC_DESERIALIZATION_ERROR`: e.g. undecodable raw transaction.
pub const RPC_DESERIALIZATION_ERROR: i64 = -22;
/// JSON-RPC "method not found".
pub const RPC_METHOD_NOT_FOUND: i64 = -32601;

/// Failure of a single node gateway call.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NodeError {
    /// Transport-level failure: connection refused, reset, DNS, ...
    #[error("node unreachable: {0}")]
    Unreachable(String),

    #[error("node call `{method}` timed out after {timeout:?}")]
    Timeout { method: String, timeout: Duration },

    #[error("node rejected the configured credentials")]
    Unauthorized,

    /// The node answered with a JSON-RPC error object.
    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },

    /// The node answered, but reported the operation as not completed.
    #[error("node reported `{method}` as incomplete")]
    Incomplete { method: String },

    #[error("malformed node response: {0}")]
    Decode(String),
}

impl NodeError {
    pub fn rpc(code: i64, message: impl Into<String>) -> Self {
        NodeError::Rpc {
            code,
            message: message.into(),
        }
    }

    /// Connection-level failures that may succeed on a later attempt.
    pub fn is_transient(&self) -> bool {
        matches!(self, NodeError::Unreachable(_) | NodeError::Timeout { .. })
    }

    /// The node could not serve the request at all.
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            NodeError::Unreachable(_)
                | NodeError::Timeout { .. }
                | NodeError::Unauthorized
                | NodeError::Incomplete { .. }
                | NodeError::Decode(_)
        )
    }

    /// The referenced block, transaction or address does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            NodeError::Rpc { code, .. }
                if *code == RPC_INVALID_ADDRESS_OR_KEY || *code == RPC_INVALID_PARAMETER
        )
    }
}
