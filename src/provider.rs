use crate::error::ProviderError;
use crate::transaction::TransactionRequest;
use alloy_primitives::U256;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub type ProviderResult<T> = Result<T, ProviderError>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Network {
    pub chain_id: u64,
}

/// Typed query and submission operations against a blockchain node.
///
/// Block identifiers are tags (`latest`, `pending`, ...), hex block numbers or
/// block hashes. Block, transaction and receipt objects are returned as raw
/// JSON, `null` when the node does not know them.
#[async_trait]
pub trait NodeProvider: Send + Sync {
    async fn get_gas_price(&self) -> ProviderResult<U256>;

    async fn get_block_number(&self) -> ProviderResult<u64>;

    async fn get_network(&self) -> ProviderResult<Network>;

    async fn get_balance(&self, address: &str, block: &str) -> ProviderResult<U256>;

    async fn get_storage_at(&self, address: &str, slot: U256, block: &str)
        -> ProviderResult<String>;

    async fn get_transaction_count(&self, address: &str, block: &str) -> ProviderResult<u64>;

    async fn get_code(&self, address: &str, block: &str) -> ProviderResult<String>;

    /// Block with transaction hashes only.
    async fn get_block(&self, block: &str) -> ProviderResult<Value>;

    /// Block with full transaction objects.
    async fn get_block_with_transactions(&self, block: &str) -> ProviderResult<Value>;

    async fn send_transaction(&self, signed: &str) -> ProviderResult<Value>;

    async fn call(&self, tx: &TransactionRequest, block: &str) -> ProviderResult<String>;

    async fn estimate_gas(&self, tx: &TransactionRequest) -> ProviderResult<U256>;

    async fn get_transaction(&self, hash: &str) -> ProviderResult<Value>;

    async fn get_transaction_receipt(&self, hash: &str) -> ProviderResult<Value>;

    /// Raw request channel, if this provider has one.
    fn passthrough(&self) -> Option<&dyn Passthrough> {
        None
    }
}

/// Forwards a method and its params to the node unmodified.
#[async_trait]
pub trait Passthrough: Send + Sync {
    async fn send(&self, method: &str, params: &[Value]) -> ProviderResult<Value>;
}
