use crate::encoding::{hexlify, parse_quantity, to_minimal_hex};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

const QUANTITY_KEYS: [&str; 9] = [
    "chainId",
    "gas",
    "gasLimit",
    "gasPrice",
    "type",
    "maxFeePerGas",
    "maxPriorityFeePerGas",
    "nonce",
    "value",
];

const DATA_KEYS: [&str; 4] = ["from", "to", "data", "input"];

/// Transaction request in the canonical hex-encoded shape a node expects.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gas: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gas_price: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_fee_per_gas: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_priority_fee_per_gas: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub tx_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_list: Option<Value>,
}

impl TransactionRequest {
    /// Normalizes a caller-supplied transaction object. Quantities may be JSON
    /// integers, decimal strings or hex strings; they come out as minimal hex.
    /// `gasLimit` is emitted as `gas` and `input` as `data`.
    pub fn normalize(value: &Value) -> Result<Self, String> {
        let object = value
            .as_object()
            .ok_or_else(|| format!("transaction must be an object, got {value}"))?;

        if let Some(key) = object.keys().find(|key| {
            !QUANTITY_KEYS.contains(&key.as_str())
                && !DATA_KEYS.contains(&key.as_str())
                && key.as_str() != "accessList"
        }) {
            return Err(format!("invalid transaction key: {key}"));
        }

        let gas = match quantity(object, "gasLimit")? {
            Some(gas) => Some(gas),
            None => quantity(object, "gas")?,
        };
        let data = match bytes(object, "data")? {
            Some(data) => Some(data),
            None => bytes(object, "input")?,
        };

        Ok(Self {
            chain_id: quantity(object, "chainId")?,
            from: bytes(object, "from")?,
            to: bytes(object, "to")?,
            gas,
            gas_price: quantity(object, "gasPrice")?,
            max_fee_per_gas: quantity(object, "maxFeePerGas")?,
            max_priority_fee_per_gas: quantity(object, "maxPriorityFeePerGas")?,
            nonce: quantity(object, "nonce")?,
            value: quantity(object, "value")?,
            data,
            tx_type: quantity(object, "type")?,
            access_list: object.get("accessList").filter(|v| !v.is_null()).cloned(),
        })
    }
}

fn quantity(object: &Map<String, Value>, key: &str) -> Result<Option<String>, String> {
    match object.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => parse_quantity(value)
            .map(|q| Some(to_minimal_hex(q)))
            .map_err(|e| format!("{key}: {e}")),
    }
}

fn bytes(object: &Map<String, Value>, key: &str) -> Result<Option<String>, String> {
    match object.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => hexlify(s).map(Some).map_err(|e| format!("{key}: {e}")),
        Some(other) => Err(format!("{key}: expected hex string, got {other}")),
    }
}
