use crate::config::{HealthConfig, UpstreamConfig};
use crate::error::ProviderError;
use crate::rpc_provider::RpcTransport;
use crate::upstream::{NodeCondition, UpstreamNode};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::time;

/// Round-robin over the healthy upstream nodes.
pub struct LoadBalancer {
    nodes: Vec<Arc<UpstreamNode>>,
    next_index: AtomicUsize,
    health_check_interval: Duration,
}

impl LoadBalancer {
    pub fn new(configs: &[UpstreamConfig], health: &HealthConfig) -> Result<Self, ProviderError> {
        let nodes = configs
            .iter()
            .map(|config| UpstreamNode::new(config.clone(), health).map(Arc::new))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            nodes,
            next_index: AtomicUsize::new(0),
            health_check_interval: health.interval(),
        })
    }

    pub fn choose_healthy_node(&self) -> Option<Arc<UpstreamNode>> {
        if self.nodes.is_empty() {
            return None;
        }

        let total_nodes = self.nodes.len();
        let start_index = self.next_index.fetch_add(1, Ordering::SeqCst) % total_nodes;

        (0..total_nodes)
            .map(|i| &self.nodes[(start_index + i) % total_nodes])
            .find(|node| node.is_healthy())
            .map(Arc::clone)
    }

    pub fn start_health_checker(self: Arc<Self>) {
        tokio::spawn(async move {
            let mut interval = time::interval(self.health_check_interval);

            loop {
                interval.tick().await;

                for node in &self.nodes {
                    let node = Arc::clone(node);
                    tokio::spawn(async move {
                        let is_healthy = node.check_health().await;
                        let status = if is_healthy { "HEALTHY" } else { "UNHEALTHY" };
                        tracing::info!("Health check result for {}: {}", node.get_name(), status);
                    });
                }
            }
        });
    }

    pub fn get_nodes_status(&self) -> Vec<(String, String)> {
        self.nodes
            .iter()
            .map(|node| {
                let status = match node.get_status() {
                    NodeCondition::Healthy => "HEALTHY",
                    NodeCondition::Unhealthy => "UNHEALTHY",
                };
                (node.get_name().to_string(), status.to_string())
            })
            .collect()
    }
}

#[async_trait]
impl RpcTransport for LoadBalancer {
    async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderError> {
        let node = self
            .choose_healthy_node()
            .ok_or(ProviderError::NoHealthyUpstream)?;

        tracing::debug!("Forwarding {} to {}", method, node.get_name());
        node.call(method, params).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upstreams(n: usize) -> Vec<UpstreamConfig> {
        (1..=n)
            .map(|i| UpstreamConfig {
                name: format!("Node {i}"),
                url: format!("http://127.0.0.1:{}", 18540 + i),
            })
            .collect()
    }

    #[test]
    fn test_round_robin() {
        let balancer = LoadBalancer::new(&upstreams(3), &HealthConfig::default()).unwrap();

        let picks: Vec<String> = (0..4)
            .map(|_| balancer.choose_healthy_node().unwrap().get_name().to_string())
            .collect();

        assert_eq!(picks, vec!["Node 1", "Node 2", "Node 3", "Node 1"]);
    }

    #[tokio::test]
    async fn test_skips_unhealthy_nodes() {
        let health = HealthConfig {
            max_consecutive_failures: 1,
            cooldown_secs: 3600,
            request_timeout_secs: 1,
            ..HealthConfig::default()
        };
        let balancer = LoadBalancer::new(&upstreams(2), &health).unwrap();

        // Nothing listens on these ports, so the probe trips the first node.
        assert!(!balancer.nodes[0].check_health().await);

        for _ in 0..3 {
            assert_eq!(balancer.choose_healthy_node().unwrap().get_name(), "Node 2");
        }
        assert_eq!(
            balancer.get_nodes_status(),
            vec![
                ("Node 1".to_string(), "UNHEALTHY".to_string()),
                ("Node 2".to_string(), "HEALTHY".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_no_nodes() {
        let balancer = LoadBalancer::new(&[], &HealthConfig::default()).unwrap();

        assert!(balancer.choose_healthy_node().is_none());
        assert!(matches!(
            balancer.request("eth_blockNumber", Value::Array(vec![])).await,
            Err(ProviderError::NoHealthyUpstream)
        ));
    }
}
