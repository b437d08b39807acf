//! Explorer Data Structures
//!
//! Typed view over the tonapi `/blockchain/accounts/{id}/transactions` payload.
//! Only the fields the pipeline reads are typed; everything else on a message
//! is carried through untouched so it can be emitted verbatim.
//!
//! Created: 2026-10-18

use bigdecimal::BigDecimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Account reference as returned by the explorer (`source` / `destination`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccountRef {
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Inbound or outbound message of a transaction
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Fixed-width hex opcode, e.g. "0x7362d09c"
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub op_code: Option<String>,
    /// Decoded body as produced by the explorer's ABI decoder
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decoded_body: Option<Value>,
    #[serde(default, deserialize_with = "lenient_account", skip_serializing_if = "Option::is_none")]
    pub source: Option<AccountRef>,
    #[serde(default, deserialize_with = "lenient_account", skip_serializing_if = "Option::is_none")]
    pub destination: Option<AccountRef>,
    /// Remaining upstream fields (value, fwd_fee, created_lt, ...)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Message {
    pub fn op_code(&self) -> Option<&str> {
        self.op_code.as_deref()
    }

    /// Walk a nested path through the decoded body.
    /// Returns None as soon as a segment is missing or not an object.
    pub fn body_field(&self, path: &FieldPath) -> Option<&Value> {
        let mut current = self.decoded_body.as_ref()?;
        for segment in path.segments() {
            current = current.as_object()?.get(segment)?;
        }
        Some(current)
    }

    /// Decoded body field rendered as a non-empty string.
    /// Strings are trimmed, numbers are rendered in decimal, anything else is absent.
    pub fn body_str(&self, path: &FieldPath) -> Option<String> {
        self.body_field(path).and_then(value_to_string)
    }

    /// Decoded body field parsed as an arbitrary-precision decimal
    pub fn body_decimal(&self, path: &FieldPath) -> Option<BigDecimal> {
        self.body_field(path).and_then(parse_decimal)
    }

    pub fn source_address(&self) -> Option<&str> {
        self.source
            .as_ref()
            .and_then(|s| s.address.as_deref())
            .filter(|a| !a.is_empty())
    }
}

/// One account transaction (immutable once fetched).
/// Fields of the wrong type decode as absent instead of failing the transaction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    #[serde(default, deserialize_with = "lenient_hash")]
    pub hash: String,
    /// Logical time
    #[serde(default, deserialize_with = "lenient_u64")]
    pub lt: u64,
    /// Unix time (seconds)
    #[serde(default, deserialize_with = "lenient_i64")]
    pub utime: i64,
    #[serde(default, deserialize_with = "lenient_message")]
    pub in_msg: Option<Message>,
    #[serde(default, deserialize_with = "lenient_messages")]
    pub out_msgs: Vec<Message>,
}

// ── Field paths ─────────────────────────────────────────────────────────

/// Dotted path into a decoded message body, e.g. "ref_coins_data.amount0_out"
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPath(Vec<String>);

impl FieldPath {
    pub fn new(path: &str) -> Self {
        Self(
            path.split('.')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl FromStr for FieldPath {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("."))
    }
}

impl<'de> Deserialize<'de> for FieldPath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::new(&raw))
    }
}

// ── Value helpers ───────────────────────────────────────────────────────

/// Render a scalar JSON value as a non-empty string
pub fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Parse a JSON string or number as an arbitrary-precision decimal.
/// Non-numeric or empty input yields None; digits are never truncated.
pub fn parse_decimal(value: &Value) -> Option<BigDecimal> {
    let raw = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };

    if raw.is_empty() {
        return None;
    }

    BigDecimal::from_str(&raw).ok()
}

/// Serialize an optional decimal as a plain JSON string (scale preserved) or null
pub fn serialize_opt_decimal<S: Serializer>(
    value: &Option<BigDecimal>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match value {
        Some(d) => serializer.serialize_str(&d.to_plain_string()),
        None => serializer.serialize_none(),
    }
}

fn lenient_u64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_u64().unwrap_or(0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
        _ => 0,
    })
}

fn lenient_i64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_i64().unwrap_or(0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
        _ => 0,
    })
}

fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        _ => None,
    })
}

fn lenient_hash<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(lenient_string(deserializer)?.unwrap_or_default())
}

fn lenient_account<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<AccountRef>, D::Error> {
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(value @ Value::Object(_)) => serde_json::from_value(value).ok(),
        _ => None,
    })
}

fn lenient_message<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Message>, D::Error> {
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(value @ Value::Object(_)) => serde_json::from_value(value).ok(),
        _ => None,
    })
}

/// null or a non-array decodes as no messages; non-object entries are skipped
fn lenient_messages<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Message>, D::Error> {
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Array(items)) => items
            .into_iter()
            .filter(Value::is_object)
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect(),
        _ => Vec::new(),
    })
}
