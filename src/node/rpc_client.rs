use std::sync::atomic::{AtomicU64, Ordering};

use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::runtime::Runtime;

use crate::config::RpcConfig;
use crate::node::api::NodeGateway;
use crate::node::error::NodeError;

// =====================================================================
// Wire envelope
// =====================================================================

#[derive(Debug, Deserialize)]
struct RpcEnvelope {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    #[serde(default)]
    message: String,
}

/// Decode a JSON-RPC 1.0 response body.
///
/// The node answers RPC errors with a non-2xx status *and* a JSON body, so
/// the body is decoded regardless of status; the status only matters when
/// the body is not JSON.
pub(crate) fn decode_envelope(method: &str, status: u16, body: &str) -> Result<Value, NodeError> {
    let envelope: RpcEnvelope = serde_json::from_str(body).map_err(|e| {
        NodeError::Decode(format!("{method}: HTTP {status}: {e}"))
    })?;

    if let Some(error) = envelope.error {
        return Err(NodeError::Rpc {
            code: error.code,
            message: error.message,
        });
    }

    Ok(envelope.result.unwrap_or(Value::Null))
}

// =====================================================================
// Public Client (blocking facade)
// =====================================================================

/// JSON-RPC client for the local node.
///
/// Every call is a single HTTP POST with Basic auth, driven to completion on
/// a private current-thread runtime and bounded by the configured timeout.
pub struct RpcClient {
    runtime: Runtime,
    http: reqwest::Client,
    config: RpcConfig,
    next_id: AtomicU64,
}

impl RpcClient {
    pub fn new(config: RpcConfig) -> Result<Self, NodeError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| NodeError::Unreachable(format!("failed to start io runtime: {e}")))?;

        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| NodeError::Unreachable(format!("failed to build http client: {e}")))?;

        log::info!("[GATEWAY] Node RPC endpoint {}", config.url);

        Ok(Self {
            runtime,
            http,
            config,
            next_id: AtomicU64::new(1),
        })
    }

    async fn post(&self, id: u64, method: &str, params: &[Value]) -> Result<Value, NodeError> {
        let body = json!({
            "jsonrpc": "1.0",
            "id": id,
            "method": method,
            "params": params,
        });

        let response = self
            .http
            .post(&self.config.url)
            .basic_auth(&self.config.user, Some(&self.config.password))
            .json(&body)
            .send()
            .await
            .map_err(|e| NodeError::Unreachable(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(NodeError::Unauthorized);
        }

        let text = response
            .text()
            .await
            .map_err(|e| NodeError::Unreachable(e.to_string()))?;
        log::trace!("[GATEWAY] <<< #{} {} {}", id, status, text.trim());

        decode_envelope(method, status.as_u16(), &text)
    }
}

impl NodeGateway for RpcClient {
    fn call(&self, method: &str, params: &[Value]) -> Result<Value, NodeError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let timeout = self.config.timeout;
        log::trace!("[GATEWAY] >>> #{} {} {:?}", id, method, params);

        self.runtime.block_on(async {
            match tokio::time::timeout(timeout, self.post(id, method, params)).await {
                Ok(result) => result,
                Err(_) => {
                    log::warn!("[GATEWAY] {} timed out after {:?}", method, timeout);
                    Err(NodeError::Timeout {
                        method: method.to_string(),
                        timeout,
                    })
                }
            }
        })
    }
}
