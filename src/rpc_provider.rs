use crate::encoding::{is_block_hash, parse_quantity, parse_u64_quantity, to_minimal_hex};
use crate::error::ProviderError;
use crate::provider::{Network, NodeProvider, Passthrough, ProviderResult};
use crate::transaction::TransactionRequest;
use alloy_primitives::U256;
use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Arc;

/// Something that can carry a JSON-RPC call to a node.
#[async_trait]
pub trait RpcTransport: Send + Sync {
    async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderError>;
}

/// [`NodeProvider`] backed by standard `eth_*` JSON-RPC calls.
pub struct JsonRpcProvider {
    transport: Arc<dyn RpcTransport>,
}

impl JsonRpcProvider {
    pub fn new(transport: Arc<dyn RpcTransport>) -> Self {
        Self { transport }
    }

    async fn quantity(&self, method: &str, params: Value) -> ProviderResult<U256> {
        let result = self.transport.request(method, params).await?;
        parse_quantity(&result).map_err(|e| ProviderError::Decode(format!("{method}: {e}")))
    }

    async fn u64_quantity(&self, method: &str, params: Value) -> ProviderResult<u64> {
        let result = self.transport.request(method, params).await?;
        parse_u64_quantity(&result).map_err(|e| ProviderError::Decode(format!("{method}: {e}")))
    }

    async fn data(&self, method: &str, params: Value) -> ProviderResult<String> {
        match self.transport.request(method, params).await? {
            Value::String(data) => Ok(data),
            other => Err(ProviderError::Decode(format!(
                "{method}: expected hex data, got {other}"
            ))),
        }
    }

    async fn block(&self, block: &str, full_transactions: bool) -> ProviderResult<Value> {
        let method = if is_block_hash(block) {
            "eth_getBlockByHash"
        } else {
            "eth_getBlockByNumber"
        };
        self.transport
            .request(method, json!([block, full_transactions]))
            .await
    }
}

#[async_trait]
impl NodeProvider for JsonRpcProvider {
    async fn get_gas_price(&self) -> ProviderResult<U256> {
        self.quantity("eth_gasPrice", json!([])).await
    }

    async fn get_block_number(&self) -> ProviderResult<u64> {
        self.u64_quantity("eth_blockNumber", json!([])).await
    }

    async fn get_network(&self) -> ProviderResult<Network> {
        let chain_id = self.u64_quantity("eth_chainId", json!([])).await?;
        Ok(Network { chain_id })
    }

    async fn get_balance(&self, address: &str, block: &str) -> ProviderResult<U256> {
        self.quantity("eth_getBalance", json!([address, block])).await
    }

    async fn get_storage_at(
        &self,
        address: &str,
        slot: U256,
        block: &str,
    ) -> ProviderResult<String> {
        self.data("eth_getStorageAt", json!([address, to_minimal_hex(slot), block]))
            .await
    }

    async fn get_transaction_count(&self, address: &str, block: &str) -> ProviderResult<u64> {
        self.u64_quantity("eth_getTransactionCount", json!([address, block]))
            .await
    }

    async fn get_code(&self, address: &str, block: &str) -> ProviderResult<String> {
        self.data("eth_getCode", json!([address, block])).await
    }

    async fn get_block(&self, block: &str) -> ProviderResult<Value> {
        self.block(block, false).await
    }

    async fn get_block_with_transactions(&self, block: &str) -> ProviderResult<Value> {
        self.block(block, true).await
    }

    async fn send_transaction(&self, signed: &str) -> ProviderResult<Value> {
        self.transport
            .request("eth_sendRawTransaction", json!([signed]))
            .await
    }

    async fn call(&self, tx: &TransactionRequest, block: &str) -> ProviderResult<String> {
        self.data("eth_call", json!([tx, block])).await
    }

    async fn estimate_gas(&self, tx: &TransactionRequest) -> ProviderResult<U256> {
        self.quantity("eth_estimateGas", json!([tx])).await
    }

    async fn get_transaction(&self, hash: &str) -> ProviderResult<Value> {
        self.transport
            .request("eth_getTransactionByHash", json!([hash]))
            .await
    }

    async fn get_transaction_receipt(&self, hash: &str) -> ProviderResult<Value> {
        self.transport
            .request("eth_getTransactionReceipt", json!([hash]))
            .await
    }

    fn passthrough(&self) -> Option<&dyn Passthrough> {
        Some(self)
    }
}

#[async_trait]
impl Passthrough for JsonRpcProvider {
    async fn send(&self, method: &str, params: &[Value]) -> ProviderResult<Value> {
        self.transport
            .request(method, Value::Array(params.to_vec()))
            .await
    }
}
