//! EIP-1193 `request({ method, params })` on top of a [`NodeProvider`].
//!
//! Every method name maps to one [`Handler`] in a static table. Direct
//! handlers are served from the provider's typed operations and re-encoded;
//! everything else is forwarded through the provider's raw channel when it has
//! one, optionally coercing the result.

use crate::config::AdapterConfig;
use crate::encoding::{
    LATEST, block_id, is_truthy, parse_quantity, to_minimal_hex, to_padded_hex,
};
use crate::error::{AdapterError, ProviderError};
use crate::provider::NodeProvider;
use crate::transaction::TransactionRequest;
use crate::types::Request;
use alloy_primitives::U256;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

type Coercion = fn(Value) -> Result<Value, ProviderError>;

#[derive(Debug, Clone, Copy)]
enum Handler {
    Unsupported(&'static str),
    Direct(Op),
    Coerce(Coercion),
    Passthrough,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    GasPrice,
    BlockNumber,
    ChainId,
    Balance,
    StorageAt,
    TransactionCount,
    BlockTransactionCount,
    Code,
    SendRawTransaction,
    Call,
    EstimateGas,
    Block,
    Transaction,
    TransactionReceipt,
}

static HANDLERS: LazyLock<HashMap<&'static str, Handler>> = LazyLock::new(|| {
    use Handler::*;

    HashMap::from([
        ("eth_gasPrice", Direct(Op::GasPrice)),
        ("eth_accounts", Unsupported("eth_accounts")),
        ("eth_blockNumber", Direct(Op::BlockNumber)),
        ("eth_chainId", Direct(Op::ChainId)),
        ("eth_getBalance", Direct(Op::Balance)),
        ("eth_getStorageAt", Direct(Op::StorageAt)),
        ("eth_getTransactionCount", Direct(Op::TransactionCount)),
        ("eth_getBlockTransactionCountByHash", Direct(Op::BlockTransactionCount)),
        ("eth_getBlockTransactionCountByNumber", Direct(Op::BlockTransactionCount)),
        ("eth_getCode", Direct(Op::Code)),
        ("eth_sendRawTransaction", Direct(Op::SendRawTransaction)),
        ("eth_call", Direct(Op::Call)),
        ("eth_estimateGas", Direct(Op::EstimateGas)),
        ("estimateGas", Direct(Op::EstimateGas)),
        ("eth_getBlockByHash", Direct(Op::Block)),
        ("eth_getBlockByNumber", Direct(Op::Block)),
        ("eth_getTransactionByHash", Direct(Op::Transaction)),
        ("eth_getTransactionReceipt", Direct(Op::TransactionReceipt)),
        ("eth_sign", Unsupported("eth_sign")),
        (
            "eth_sendTransaction",
            Unsupported("eth_sendTransaction requires an account"),
        ),
        ("eth_getUncleCountByBlockHash", Coerce(quantity_to_hex)),
        ("eth_getUncleCountByBlockNumber", Coerce(quantity_to_hex)),
        ("eth_getTransactionByBlockHashAndIndex", Passthrough),
        ("eth_getTransactionByBlockNumberAndIndex", Passthrough),
        ("eth_getUncleByBlockHashAndIndex", Passthrough),
        ("eth_getUncleByBlockNumberAndIndex", Passthrough),
        ("eth_newFilter", Passthrough),
        ("eth_newBlockFilter", Passthrough),
        ("eth_newPendingTransactionFilter", Passthrough),
        ("eth_uninstallFilter", Passthrough),
        ("eth_getFilterChanges", Passthrough),
        ("eth_getFilterLogs", Passthrough),
        ("eth_getLogs", Passthrough),
    ])
});

fn identity(value: Value) -> Result<Value, ProviderError> {
    Ok(value)
}

/// Unknown blocks stay null.
fn quantity_to_hex(value: Value) -> Result<Value, ProviderError> {
    if value.is_null() {
        return Ok(Value::Null);
    }
    let quantity = parse_quantity(&value).map_err(ProviderError::Decode)?;
    Ok(Value::String(to_minimal_hex(quantity)))
}

/// Stateless translator from EIP-1193 requests to [`NodeProvider`] calls.
pub struct ProtocolAdapter {
    provider: Arc<dyn NodeProvider>,
    config: AdapterConfig,
}

impl ProtocolAdapter {
    pub fn new(provider: Arc<dyn NodeProvider>, config: AdapterConfig) -> Self {
        Self { provider, config }
    }

    pub async fn request(&self, request: Request) -> Result<Value, AdapterError> {
        self.send(&request.method, &request.params).await
    }

    pub async fn send(&self, method: &str, params: &[Value]) -> Result<Value, AdapterError> {
        tracing::debug!("Dispatching {} with {} params", method, params.len());

        let mut coerce: Coercion = identity;

        match HANDLERS.get(method).copied() {
            Some(Handler::Unsupported(reason)) => {
                tracing::warn!("Rejecting unsupported method {}", method);
                return Err(AdapterError::unsupported(reason, method, params));
            }
            Some(Handler::Direct(op)) => {
                return self.direct(op, Positional { method, params }).await;
            }
            Some(Handler::Coerce(post)) => coerce = post,
            Some(Handler::Passthrough) | None => {}
        }

        match self.provider.passthrough() {
            Some(raw) => {
                let result = raw.send(method, params).await?;
                Ok(coerce(result)?)
            }
            None => {
                tracing::warn!("No passthrough channel for {}", method);
                Err(AdapterError::unsupported(
                    format!("unsupported method: {method}"),
                    method,
                    params,
                ))
            }
        }
    }

    async fn direct(&self, op: Op, args: Positional<'_>) -> Result<Value, AdapterError> {
        let provider = &self.provider;

        let result = match op {
            Op::GasPrice => Value::String(to_padded_hex(provider.get_gas_price().await?)),
            Op::BlockNumber => Value::from(provider.get_block_number().await?),
            Op::ChainId => Value::from(provider.get_network().await?.chain_id),
            Op::Balance => {
                let address = args.string(0)?;
                let block = args.block(1)?;
                Value::String(to_padded_hex(provider.get_balance(address, &block).await?))
            }
            Op::StorageAt => {
                let address = args.string(0)?;
                let slot = args.quantity(1)?;
                let block = args.block(2)?;
                Value::String(provider.get_storage_at(address, slot, &block).await?)
            }
            Op::TransactionCount => {
                let address = args.string(0)?;
                let block = args.block(1)?;
                let count = provider.get_transaction_count(address, &block).await?;
                Value::String(to_minimal_hex(U256::from(count)))
            }
            Op::BlockTransactionCount => {
                let block = provider.get_block(&args.block(0)?).await?;
                transaction_count(&block)?
            }
            Op::Code if self.config.legacy_get_code => provider.get_block(&args.block(0)?).await?,
            Op::Code => {
                let address = args.string(0)?;
                let block = args.block(1)?;
                Value::String(provider.get_code(address, &block).await?)
            }
            Op::SendRawTransaction => provider.send_transaction(args.string(0)?).await?,
            Op::Call => {
                let tx = args.transaction(0)?;
                let block = args.block(1)?;
                Value::String(provider.call(&tx, &block).await?)
            }
            Op::EstimateGas => {
                if is_truthy(args.get(1)) && args.get(1).and_then(Value::as_str) != Some(LATEST) {
                    return Err(AdapterError::unsupported(
                        "estimateGas does not support blockTag",
                        args.method,
                        args.params,
                    ));
                }
                let tx = args.transaction(0)?;
                Value::String(to_padded_hex(provider.estimate_gas(&tx).await?))
            }
            Op::Block => {
                let block = args.block(0)?;
                if is_truthy(args.get(1)) {
                    provider.get_block_with_transactions(&block).await?
                } else {
                    provider.get_block(&block).await?
                }
            }
            Op::Transaction => provider.get_transaction(args.string(0)?).await?,
            Op::TransactionReceipt => provider.get_transaction_receipt(args.string(0)?).await?,
        };

        Ok(result)
    }
}

/// Number of entries in a block's `transactions`, as minimal hex. Unknown blocks stay null.
fn transaction_count(block: &Value) -> Result<Value, ProviderError> {
    if block.is_null() {
        return Ok(Value::Null);
    }
    let transactions = block
        .get("transactions")
        .and_then(Value::as_array)
        .ok_or_else(|| ProviderError::Decode("block has no transactions array".to_string()))?;
    Ok(Value::String(to_minimal_hex(U256::from(transactions.len() as u64))))
}

/// Typed access to positional params, failing with `InvalidParams`.
struct Positional<'a> {
    method: &'a str,
    params: &'a [Value],
}

impl<'a> Positional<'a> {
    fn get(&self, index: usize) -> Option<&'a Value> {
        self.params.get(index)
    }

    fn string(&self, index: usize) -> Result<&'a str, AdapterError> {
        self.get(index).and_then(Value::as_str).ok_or_else(|| {
            AdapterError::invalid_params(self.method, format!("param {index} must be a string"))
        })
    }

    fn block(&self, index: usize) -> Result<String, AdapterError> {
        block_id(self.get(index)).map_err(|e| AdapterError::invalid_params(self.method, e))
    }

    fn quantity(&self, index: usize) -> Result<U256, AdapterError> {
        let value = self.get(index).ok_or_else(|| {
            AdapterError::invalid_params(self.method, format!("param {index} is required"))
        })?;
        parse_quantity(value).map_err(|e| AdapterError::invalid_params(self.method, e))
    }

    fn transaction(&self, index: usize) -> Result<TransactionRequest, AdapterError> {
        let value = self.get(index).ok_or_else(|| {
            AdapterError::invalid_params(self.method, format!("param {index} is required"))
        })?;
        TransactionRequest::normalize(value)
            .map_err(|e| AdapterError::invalid_params(self.method, e))
    }
}
