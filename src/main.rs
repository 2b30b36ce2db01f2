mod adapter;
mod cache;
mod config;
mod encoding;
mod error;
mod load_balancer;
mod provider;
mod rpc_provider;
#[cfg(test)]
mod test_utils;
mod transaction;
mod types;
mod upstream;

use adapter::ProtocolAdapter;
use anyhow::Context;
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use cache::Cache;
use clap::Parser;
use config::{Cli, Config};
use error::{AdapterError, ProviderError};
use load_balancer::LoadBalancer;
use rpc_provider::JsonRpcProvider;
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceBuilder;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use types::{RpcRequest, RpcResponse};

/// EIP-1193 "Unsupported Method".
const UNSUPPORTED_METHOD: i64 = 4200;
const INVALID_PARAMS: i64 = -32602;
const INTERNAL_ERROR: i64 = -32603;

#[derive(Clone)]
struct AppState {
    adapter: Arc<ProtocolAdapter>,
    load_balancer: Arc<LoadBalancer>,
    cache: Arc<Cache>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "eip1193_gateway=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting EIP-1193 gateway");

    let cli = Cli::parse();
    let config = Config::load(&cli).context("Failed to load configuration")?;

    tracing::info!("Configured {} upstream nodes", config.upstreams.len());
    for upstream in &config.upstreams {
        tracing::info!("  - {}: {}", upstream.name, upstream.url);
    }
    if config.adapter.legacy_get_code {
        tracing::warn!("eth_getCode will return block objects (legacy_get_code)");
    }

    // Create load balancer and start health checker
    let load_balancer = Arc::new(
        LoadBalancer::new(&config.upstreams, &config.health)
            .context("Failed to create upstream clients")?,
    );
    Arc::clone(&load_balancer).start_health_checker();

    let provider = Arc::new(JsonRpcProvider::new(load_balancer.clone()));
    let state = AppState {
        adapter: Arc::new(ProtocolAdapter::new(provider, config.adapter.clone())),
        load_balancer,
        cache: Arc::new(Cache::new(&config.cache)),
    };

    let listener = tokio::net::TcpListener::bind(&config.listen)
        .await
        .with_context(|| format!("Failed to bind to {}", config.listen))?;

    tracing::info!("Listening on http://{}", config.listen);

    axum::serve(listener, router(state))
        .await
        .context("Server failed")?;

    Ok(())
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/", post(handle_rpc_request))
        .route("/health", get(health_check))
        .route("/status", get(status_check))
        .with_state(state)
        .layer(ServiceBuilder::new().layer(tower_http::trace::TraceLayer::new_for_http()))
}

async fn handle_rpc_request(
    State(state): State<AppState>,
    Json(request): Json<RpcRequest>,
) -> impl IntoResponse {
    let (status, response) = process(&state, request).await;
    (status, Json(response))
}

async fn process(state: &AppState, rpc: RpcRequest) -> (StatusCode, RpcResponse) {
    tracing::info!("Received RPC request: method={}", rpc.method);

    let id = rpc.id.clone();
    let method = rpc.method.clone();
    let request = match rpc.into_request() {
        Ok(request) => request,
        Err(reason) => {
            tracing::warn!("Rejected {}: {}", method, reason);
            return error_response(id, AdapterError::invalid_params(&method, reason));
        }
    };

    let cache_key = Cache::key_for(&request);
    if let Some(ref key) = cache_key {
        if let Some(cached_result) = state.cache.get(key) {
            tracing::debug!("Serving {} from cache", key);
            return (StatusCode::OK, RpcResponse::success(id, cached_result));
        }
    }

    match state.adapter.request(request).await {
        Ok(result) => {
            if let Some(key) = cache_key {
                state.cache.put(key, result.clone());
            }
            (StatusCode::OK, RpcResponse::success(id, result))
        }
        Err(e @ AdapterError::Provider(_)) => {
            tracing::error!("Failed to serve {}: {}", method, e);
            error_response(id, e)
        }
        Err(e) => {
            tracing::debug!("Rejected {}: {}", method, e);
            error_response(id, e)
        }
    }
}

fn error_response(id: Value, err: AdapterError) -> (StatusCode, RpcResponse) {
    let message = err.to_string();
    match err {
        AdapterError::Unsupported { method, params, .. } => (
            StatusCode::OK,
            RpcResponse::error(
                id,
                UNSUPPORTED_METHOD,
                message,
                Some(json!({ "method": method, "params": params })),
            ),
        ),
        AdapterError::InvalidParams { .. } => (
            StatusCode::OK,
            RpcResponse::error(id, INVALID_PARAMS, message, None),
        ),
        AdapterError::Provider(ProviderError::Rpc {
            code,
            message,
            data,
        }) => (StatusCode::OK, RpcResponse::error(id, code, message, data)),
        AdapterError::Provider(
            ProviderError::Transport(_) | ProviderError::Http(_) | ProviderError::NoHealthyUpstream,
        ) => (
            StatusCode::SERVICE_UNAVAILABLE,
            RpcResponse::error(id, INTERNAL_ERROR, format!("Internal error: {message}"), None),
        ),
        AdapterError::Provider(ProviderError::Decode(_)) => (
            StatusCode::OK,
            RpcResponse::error(id, INTERNAL_ERROR, format!("Internal error: {message}"), None),
        ),
    }
}

/// Health check endpoint
async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// Status check endpoint - returns status of all upstream nodes
async fn status_check(State(state): State<AppState>) -> impl IntoResponse {
    let nodes_status = state.load_balancer.get_nodes_status();
    let status_json = json!({
        "nodes": nodes_status.iter().map(|(name, status)| {
            json!({
                "name": name,
                "status": status
            })
        }).collect::<Vec<_>>()
    });

    (StatusCode::OK, Json(status_json))
}
