use crate::error::ProviderError;
use crate::provider::{Network, NodeProvider, Passthrough, ProviderResult};
use crate::transaction::TransactionRequest;
use alloy_primitives::U256;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Value, json};

/// NodeProvider double that records every call it receives.
pub struct MockProvider {
    pub gas_price: U256,
    pub block_number: u64,
    pub chain_id: u64,
    pub balance: U256,
    pub storage: String,
    pub nonce: u64,
    pub code: String,
    pub block: Value,
    pub block_with_transactions: Value,
    pub call_result: String,
    pub gas_estimate: U256,
    pub transaction: Value,
    pub receipt: Value,
    /// Result of the raw channel; `None` means no passthrough is exposed.
    pub passthrough_result: Option<Value>,
    /// When set, every operation fails with this error.
    pub failure: Option<ProviderError>,
    pub calls: Mutex<Vec<String>>,
}

impl Default for MockProvider {
    fn default() -> Self {
        Self {
            gas_price: U256::from(21_000_000_000u64),
            block_number: 17_000_000,
            chain_id: 1,
            balance: U256::from(1_000_000_000_000_000_000u64),
            storage: format!("0x{}", "0".repeat(63) + "1"),
            nonce: 10,
            code: "0x6080604052".to_string(),
            block: json!({
                "hash": "0x1111111111111111111111111111111111111111111111111111111111111111",
                "number": "0x10",
                "transactions": ["0xaa", "0xbb", "0xcc"],
            }),
            block_with_transactions: json!({
                "hash": "0x1111111111111111111111111111111111111111111111111111111111111111",
                "number": "0x10",
                "transactions": [{ "hash": "0xaa" }, { "hash": "0xbb" }, { "hash": "0xcc" }],
            }),
            call_result: "0x0000000000000000000000000000000000000000000000000000000000000001"
                .to_string(),
            gas_estimate: U256::from(21_000u64),
            transaction: json!({ "hash": "0xaa", "nonce": "0x1" }),
            receipt: json!({ "transactionHash": "0xaa", "status": "0x1" }),
            passthrough_result: None,
            failure: None,
            calls: Mutex::new(Vec::new()),
        }
    }
}

impl MockProvider {
    pub fn with_passthrough(result: Value) -> Self {
        Self {
            passthrough_result: Some(result),
            ..Self::default()
        }
    }

    pub fn failing(error: ProviderError) -> Self {
        Self {
            failure: Some(error),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    fn record<T>(&self, call: String, value: T) -> ProviderResult<T> {
        self.calls.lock().push(call);
        match &self.failure {
            Some(err) => Err(err.clone()),
            None => Ok(value),
        }
    }
}

#[async_trait]
impl NodeProvider for MockProvider {
    async fn get_gas_price(&self) -> ProviderResult<U256> {
        self.record("get_gas_price()".into(), self.gas_price)
    }

    async fn get_block_number(&self) -> ProviderResult<u64> {
        self.record("get_block_number()".into(), self.block_number)
    }

    async fn get_network(&self) -> ProviderResult<Network> {
        self.record("get_network()".into(), Network { chain_id: self.chain_id })
    }

    async fn get_balance(&self, address: &str, block: &str) -> ProviderResult<U256> {
        self.record(format!("get_balance({address},{block})"), self.balance)
    }

    async fn get_storage_at(
        &self,
        address: &str,
        slot: U256,
        block: &str,
    ) -> ProviderResult<String> {
        self.record(
            format!("get_storage_at({address},{slot},{block})"),
            self.storage.clone(),
        )
    }

    async fn get_transaction_count(&self, address: &str, block: &str) -> ProviderResult<u64> {
        self.record(format!("get_transaction_count({address},{block})"), self.nonce)
    }

    async fn get_code(&self, address: &str, block: &str) -> ProviderResult<String> {
        self.record(format!("get_code({address},{block})"), self.code.clone())
    }

    async fn get_block(&self, block: &str) -> ProviderResult<Value> {
        self.record(format!("get_block({block})"), self.block.clone())
    }

    async fn get_block_with_transactions(&self, block: &str) -> ProviderResult<Value> {
        self.record(
            format!("get_block_with_transactions({block})"),
            self.block_with_transactions.clone(),
        )
    }

    async fn send_transaction(&self, signed: &str) -> ProviderResult<Value> {
        self.record(format!("send_transaction({signed})"), json!({ "hash": "0xaa" }))
    }

    async fn call(&self, tx: &TransactionRequest, block: &str) -> ProviderResult<String> {
        let tx = serde_json::to_string(tx).unwrap();
        self.record(format!("call({tx},{block})"), self.call_result.clone())
    }

    async fn estimate_gas(&self, tx: &TransactionRequest) -> ProviderResult<U256> {
        let tx = serde_json::to_string(tx).unwrap();
        self.record(format!("estimate_gas({tx})"), self.gas_estimate)
    }

    async fn get_transaction(&self, hash: &str) -> ProviderResult<Value> {
        self.record(format!("get_transaction({hash})"), self.transaction.clone())
    }

    async fn get_transaction_receipt(&self, hash: &str) -> ProviderResult<Value> {
        self.record(format!("get_transaction_receipt({hash})"), self.receipt.clone())
    }

    fn passthrough(&self) -> Option<&dyn Passthrough> {
        self.passthrough_result.as_ref().map(|_| self as &dyn Passthrough)
    }
}

#[async_trait]
impl Passthrough for MockProvider {
    async fn send(&self, method: &str, params: &[Value]) -> ProviderResult<Value> {
        let params = Value::Array(params.to_vec());
        let result = self.passthrough_result.clone().unwrap_or(Value::Null);
        self.record(format!("send({method},{params})"), result)
    }
}
