//! Quantity, byte and block-identifier encodings shared by the adapter and the
//! JSON-RPC provider.

use alloy_primitives::{U256, hex};
use serde_json::Value;

pub const LATEST: &str = "latest";

/// `0x`-prefixed lowercase hex with no leading zeros. Zero is `0x0`.
pub fn to_minimal_hex(value: U256) -> String {
    format!("0x{value:x}")
}

/// `0x`-prefixed lowercase hex padded to a whole number of bytes. Zero is `0x00`.
pub fn to_padded_hex(value: U256) -> String {
    let digits = format!("{value:x}");
    if digits.len() % 2 == 1 {
        format!("0x0{digits}")
    } else {
        format!("0x{digits}")
    }
}

/// Accepts JSON integers, `0x` hex strings and decimal strings.
pub fn parse_quantity(value: &Value) -> Result<U256, String> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .map(U256::from)
            .ok_or_else(|| format!("not an unsigned integer: {n}")),
        Value::String(s) => parse_quantity_str(s),
        other => Err(format!("expected a quantity, got {other}")),
    }
}

fn parse_quantity_str(s: &str) -> Result<U256, String> {
    let (digits, radix) = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(digits) => (digits, 16),
        None => (s, 10),
    };
    if digits.is_empty() {
        return Err(format!("invalid quantity {s:?}"));
    }
    U256::from_str_radix(digits, radix).map_err(|e| format!("invalid quantity {s:?}: {e}"))
}

pub fn parse_u64_quantity(value: &Value) -> Result<u64, String> {
    let quantity = parse_quantity(value)?;
    if quantity > U256::from(u64::MAX) {
        return Err(format!("quantity {quantity} does not fit in 64 bits"));
    }
    Ok(quantity.as_limbs()[0])
}

/// Validates a hex byte string and returns it lowercased with a `0x` prefix.
pub fn hexlify(s: &str) -> Result<String, String> {
    let digits = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .ok_or_else(|| format!("hex data must start with 0x: {s:?}"))?;
    let bytes = hex::decode(digits).map_err(|e| format!("invalid hex data {s:?}: {e}"))?;
    Ok(hex::encode_prefixed(bytes))
}

/// Block tag, hex number or hash. Integers become minimal hex; absent means `latest`.
pub fn block_id(value: Option<&Value>) -> Result<String, String> {
    match value {
        None | Some(Value::Null) => Ok(LATEST.to_string()),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Number(n)) => n
            .as_u64()
            .map(|n| to_minimal_hex(U256::from(n)))
            .ok_or_else(|| format!("invalid block number {n}")),
        Some(other) => Err(format!("invalid block identifier {other}")),
    }
}

/// Loose truthiness used for optional flag parameters.
pub fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}

/// True when the identifier is a 32-byte hash rather than a tag or number.
pub fn is_block_hash(id: &str) -> bool {
    id.len() == 66 && id.starts_with("0x")
}
