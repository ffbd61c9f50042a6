//! Opaque JSON payloads.
//!
//! Remote settings objects have no fixed shape, so they are carried as
//! canonical JSON text and only decoded into a concrete type where they are
//! used. Two payloads are compared by their parsed trees, never by their text:
//! the remote service does not keep key order stable between reads.
//!
//! # Example
//!
//! ```
//! use hemmer_segment_state::json::JsonPayload;
//! use serde_json::json;
//!
//! let a = JsonPayload::from_raw(&json!({"a": 1, "b": 2}), "settings").unwrap();
//! let b = JsonPayload::from_text(r#"{ "b": 2, "a": 1.0 }"#, "settings").unwrap();
//! assert!(JsonPayload::equivalent(&a, &b));
//! ```

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Number};

use crate::error::MappingError;
use crate::value::Value;

/// Maximum nesting depth accepted for a payload.
pub const MAX_DEPTH: usize = 128;

/// JSON text stored as an opaque scalar.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct JsonPayload(Value<String>);

impl JsonPayload {
    /// The absent payload. Distinct from a payload holding `{}`.
    pub fn null() -> Self {
        Self(Value::Null)
    }

    /// A payload whose content is not known yet.
    pub fn unknown() -> Self {
        Self(Value::Unknown)
    }

    /// Serialize any value into canonical payload text.
    pub fn from_raw<T: Serialize + ?Sized>(raw: &T, path: &str) -> Result<Self, MappingError> {
        let tree = serde_json::to_value(raw).map_err(|e| MappingError::encoding(path, e))?;
        Self::from_tree(&tree, path)
    }

    /// Build a payload from an optional unstructured map.
    ///
    /// `None` gives the null payload, `Some` of an empty map gives `{}`.
    pub fn from_map(map: Option<&Map<String, serde_json::Value>>, path: &str) -> Result<Self, MappingError> {
        match map {
            None => Ok(Self::null()),
            Some(map) => Self::from_raw(map, path),
        }
    }

    /// Parse JSON text and store it in canonical form.
    pub fn from_text(text: &str, path: &str) -> Result<Self, MappingError> {
        let tree: serde_json::Value =
            serde_json::from_str(text).map_err(|e| MappingError::decoding(path, e))?;
        Self::from_tree(&tree, path)
    }

    fn from_tree(tree: &serde_json::Value, path: &str) -> Result<Self, MappingError> {
        if depth(tree) > MAX_DEPTH {
            return Err(MappingError::encoding(
                path,
                format!("payload nests deeper than {} levels", MAX_DEPTH),
            ));
        }
        let text = serde_json::to_string(tree).map_err(|e| MappingError::encoding(path, e))?;
        Ok(Self(Value::Known(text)))
    }

    /// Whether the payload is absent.
    pub fn is_null(&self) -> bool {
        self.0.is_null()
    }

    /// Whether the payload is not yet known.
    pub fn is_unknown(&self) -> bool {
        self.0.is_unknown()
    }

    /// The payload text, if known.
    pub fn as_text(&self) -> Option<&str> {
        self.0.as_known().map(String::as_str)
    }

    /// The payload as a tri-state string.
    pub fn as_value(&self) -> &Value<String> {
        &self.0
    }

    /// Decode the payload into `T`.
    pub fn decode<T: DeserializeOwned>(&self, path: &str) -> Result<T, MappingError> {
        match &self.0 {
            Value::Known(text) => {
                serde_json::from_str(text).map_err(|e| MappingError::decoding(path, e))
            },
            Value::Null => Err(MappingError::decoding(path, "payload is null")),
            Value::Unknown => Err(MappingError::incomplete(path)),
        }
    }

    /// Decode the payload into an unstructured map. `Null` gives `None`.
    pub fn decode_map(
        &self,
        path: &str,
    ) -> Result<Option<Map<String, serde_json::Value>>, MappingError> {
        if self.is_null() {
            return Ok(None);
        }
        self.decode(path).map(Some)
    }

    /// Semantic equality of two payloads.
    ///
    /// Key order and numeric spelling (`1` versus `1.0`) are ignored. Two null
    /// payloads are equivalent; anything that fails to parse, or is unknown,
    /// is not equivalent to anything.
    pub fn equivalent(a: &Self, b: &Self) -> bool {
        match (&a.0, &b.0) {
            (Value::Null, Value::Null) => true,
            (Value::Known(x), Value::Known(y)) => {
                match (parse_normalized(x), parse_normalized(y)) {
                    (Some(x), Some(y)) => x == y,
                    _ => false,
                }
            },
            _ => false,
        }
    }

    /// Keep `prior` when it is equivalent to `fresh`, otherwise take `fresh`.
    ///
    /// Used after a remote read so that a reordered response does not replace
    /// the text the configuration layer last stored.
    pub fn reconcile(prior: &Self, fresh: Self) -> Self {
        if Self::equivalent(prior, &fresh) {
            tracing::trace!("payload unchanged, keeping prior text");
            prior.clone()
        } else {
            fresh
        }
    }
}

impl From<Value<String>> for JsonPayload {
    fn from(value: Value<String>) -> Self {
        Self(value)
    }
}

impl Serialize for JsonPayload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for JsonPayload {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::<String>::deserialize(deserializer).map(Self)
    }
}

fn parse_normalized(text: &str) -> Option<serde_json::Value> {
    serde_json::from_str(text).ok().map(normalize)
}

/// Rewrite integral floats as integers so `1.0` and `1` compare equal.
fn normalize(value: serde_json::Value) -> serde_json::Value {
    use serde_json::Value as Json;
    match value {
        Json::Number(n) => Json::Number(normalize_number(n)),
        Json::Array(items) => Json::Array(items.into_iter().map(normalize).collect()),
        Json::Object(map) => Json::Object(map.into_iter().map(|(k, v)| (k, normalize(v))).collect()),
        other => other,
    }
}

/// 2^63 and 2^64, both exact in an f64. The integer ranges are half-open:
/// `i64::MAX as f64` rounds up to 2^63, which does not fit.
const I64_END: f64 = 9_223_372_036_854_775_808.0;
const U64_END: f64 = 18_446_744_073_709_551_616.0;

fn normalize_number(n: Number) -> Number {
    match n.as_f64() {
        Some(f) if n.is_f64() && f.fract() == 0.0 => {
            if (0.0..U64_END).contains(&f) {
                Number::from(f as u64)
            } else if (-I64_END..0.0).contains(&f) {
                Number::from(f as i64)
            } else {
                n
            }
        },
        _ => n,
    }
}

fn depth(value: &serde_json::Value) -> usize {
    match value {
        serde_json::Value::Array(items) => 1 + items.iter().map(depth).max().unwrap_or(0),
        serde_json::Value::Object(map) => 1 + map.values().map(depth).max().unwrap_or(0),
        _ => 0,
    }
}
