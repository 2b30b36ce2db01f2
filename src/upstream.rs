use crate::config::{HealthConfig, UpstreamConfig};
use crate::error::ProviderError;
use crate::rpc_provider::RpcTransport;
use crate::types::{RpcRequest, RpcResponse};
use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NodeCondition {
    Healthy,
    Unhealthy,
}

/// Represents a single upstream RPC node with circuit breaker logic
pub struct UpstreamNode {
    pub config: UpstreamConfig,
    status: RwLock<NodeState>,
    consecutive_failures: AtomicUsize,
    next_id: AtomicU64,
    max_consecutive_failures: usize,
    cooldown: Duration,
    client: reqwest::Client,
}

#[derive(Debug, Clone)]
struct NodeState {
    health_status: NodeCondition,
    last_failure_time: Option<Instant>,
}

impl UpstreamNode {
    pub fn new(config: UpstreamConfig, health: &HealthConfig) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(health.request_timeout())
            .build()
            .map_err(|e| ProviderError::Transport(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            config,
            status: RwLock::new(NodeState {
                health_status: NodeCondition::Healthy,
                last_failure_time: None,
            }),
            consecutive_failures: AtomicUsize::new(0),
            next_id: AtomicU64::new(1),
            max_consecutive_failures: health.max_consecutive_failures,
            cooldown: health.cooldown(),
            client,
        })
    }

    /// Healthy nodes, and unhealthy ones whose cooldown has elapsed, may take traffic.
    pub fn is_healthy(&self) -> bool {
        let state = self.status.read();
        match state.health_status {
            NodeCondition::Healthy => true,
            NodeCondition::Unhealthy => state
                .last_failure_time
                .is_some_and(|last_failure| last_failure.elapsed() >= self.cooldown),
        }
    }

    /// Perform a health check by calling eth_blockNumber
    pub async fn check_health(&self) -> bool {
        self.call("eth_blockNumber", Value::Array(vec![])).await.is_ok()
    }

    /// Call the upstream RPC node. Transport and HTTP failures count against
    /// the node; JSON-RPC error replies do not.
    pub async fn call(&self, method: &str, params: Value) -> Result<Value, ProviderError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = RpcRequest::new(Value::from(id), method, params);

        let response = match self.call_rpc_internal(&request).await {
            Ok(response) => {
                self.mark_success();
                response
            }
            Err(e) => {
                self.mark_failure();
                return Err(e);
            }
        };

        if let Some(error) = response.error {
            return Err(ProviderError::Rpc {
                code: error.code,
                message: error.message,
                data: error.data,
            });
        }
        Ok(response.result.unwrap_or(Value::Null))
    }

    async fn call_rpc_internal(&self, request: &RpcRequest) -> Result<RpcResponse, ProviderError> {
        let response = self
            .client
            .post(&self.config.url)
            .json(request)
            .send()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ProviderError::Http(response.status().as_u16()));
        }

        response
            .json()
            .await
            .map_err(|e| ProviderError::Decode(format!("failed to parse response: {e}")))
    }

    fn mark_success(&self) {
        self.consecutive_failures.swap(0, Ordering::SeqCst);
        let mut state = self.status.write();
        if state.health_status == NodeCondition::Unhealthy {
            tracing::info!("Upstream {} recovered", self.config.name);
            state.health_status = NodeCondition::Healthy;
            state.last_failure_time = None;
        }
    }

    fn mark_failure(&self) {
        let failures = self.consecutive_failures.fetch_add(1, Ordering::SeqCst) + 1;

        if failures >= self.max_consecutive_failures {
            let mut state = self.status.write();
            if state.health_status == NodeCondition::Healthy {
                tracing::warn!(
                    "Upstream {} marked unhealthy after {} consecutive failures",
                    self.config.name,
                    failures
                );
                state.health_status = NodeCondition::Unhealthy;
            }
            // A failed half-open probe restarts the cooldown.
            state.last_failure_time = Some(Instant::now());
        }
    }

    pub fn get_name(&self) -> &str {
        &self.config.name
    }

    pub fn get_status(&self) -> NodeCondition {
        self.status.read().health_status
    }
}

#[async_trait]
impl RpcTransport for UpstreamNode {
    async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderError> {
        self.call(method, params).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Json, Router, routing::post};
    use serde_json::json;

    async fn mock_node(reply: fn(RpcRequest) -> Value) -> String {
        let app = Router::new().route(
            "/",
            post(move |Json(request): Json<RpcRequest>| async move { Json(reply(request)) }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn node(url: String, health: &HealthConfig) -> UpstreamNode {
        UpstreamNode::new(
            UpstreamConfig {
                name: "test".to_string(),
                url,
            },
            health,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_call_returns_result() {
        let url = mock_node(|request| {
            json!({
                "jsonrpc": "2.0",
                "id": request.id,
                "result": format!("{}:{}", request.method, request.params),
            })
        })
        .await;
        let node = node(url, &HealthConfig::default());

        let result = node.call("eth_chainId", json!([])).await.unwrap();

        assert_eq!(result, json!("eth_chainId:[]"));
        assert!(node.check_health().await);
    }

    #[tokio::test]
    async fn test_null_result_is_preserved() {
        let url = mock_node(|request| json!({ "jsonrpc": "2.0", "id": request.id, "result": null }))
            .await;
        let node = node(url, &HealthConfig::default());

        let result = node.call("eth_getTransactionByHash", json!(["0x00"])).await.unwrap();
        assert_eq!(result, Value::Null);
    }

    #[tokio::test]
    async fn test_rpc_error_does_not_trip_breaker() {
        let url = mock_node(|request| {
            json!({
                "jsonrpc": "2.0",
                "id": request.id,
                "error": { "code": -32000, "message": "execution reverted", "data": "0x08c379a0" },
            })
        })
        .await;
        let health = HealthConfig {
            max_consecutive_failures: 1,
            ..HealthConfig::default()
        };
        let node = node(url, &health);

        let err = node.call("eth_call", json!([])).await.unwrap_err();

        assert!(matches!(
            err,
            ProviderError::Rpc { code: -32000, ref message, data: Some(_) } if message == "execution reverted"
        ));
        assert_eq!(node.get_status(), NodeCondition::Healthy);
    }

    #[tokio::test]
    async fn test_transport_failures_trip_breaker() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let health = HealthConfig {
            max_consecutive_failures: 2,
            cooldown_secs: 3600,
            request_timeout_secs: 1,
            ..HealthConfig::default()
        };
        let node = node(format!("http://{addr}"), &health);

        assert!(matches!(
            node.call("eth_blockNumber", json!([])).await,
            Err(ProviderError::Transport(_))
        ));
        assert!(node.is_healthy());

        assert!(!node.check_health().await);
        assert_eq!(node.get_status(), NodeCondition::Unhealthy);
        assert!(!node.is_healthy());
    }

    #[test]
    fn test_cooldown_allows_half_open_probe() {
        let health = HealthConfig {
            max_consecutive_failures: 1,
            cooldown_secs: 0,
            ..HealthConfig::default()
        };
        let node = node("http://127.0.0.1:1".to_string(), &health);

        node.mark_failure();
        assert_eq!(node.get_status(), NodeCondition::Unhealthy);
        assert!(node.is_healthy());

        node.mark_success();
        assert_eq!(node.get_status(), NodeCondition::Healthy);
    }
}
