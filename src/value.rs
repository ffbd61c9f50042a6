//! Tri-state scalar values.
//!
//! A [`Value`] is either known, explicitly null, or not yet determined. The
//! last case only ever appears on the plan side, for computed attributes the
//! remote service has not resolved yet; values produced from a remote read
//! are always `Known` or `Null`.
//!
//! `Null` and `Unknown` mean different things ("explicitly absent" versus
//! "not known yet") and are never coerced into one another.

use std::collections::BTreeSet;

use serde::de::{Deserialize, Deserializer};
use serde::ser::{Error as _, Serialize, Serializer};

use crate::error::MappingError;

/// A value that is known, null, or unknown.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Value<T> {
    /// The value is present.
    Known(T),
    /// The value is explicitly absent.
    #[default]
    Null,
    /// The value will only be known after the remote service resolves it.
    Unknown,
}

/// A tri-state string.
pub type StringValue = Value<String>;
/// A tri-state boolean.
pub type BoolValue = Value<bool>;
/// A tri-state 64-bit integer.
pub type Int64Value = Value<i64>;
/// A tri-state 64-bit float, the configuration layer's decimal type.
pub type Float64Value = Value<f64>;
/// An ordered tri-state collection.
pub type ListValue<T> = Value<Vec<T>>;
/// An unordered tri-state collection.
pub type SetValue<T> = Value<BTreeSet<T>>;

impl<T> Value<T> {
    /// Create a known value.
    pub fn known(value: T) -> Self {
        Self::Known(value)
    }

    /// Create a null value.
    pub fn null() -> Self {
        Self::Null
    }

    /// Create an unknown value.
    pub fn unknown() -> Self {
        Self::Unknown
    }

    /// Map an optional field: `None` becomes `Null`.
    pub fn from_option(value: Option<T>) -> Self {
        match value {
            Some(v) => Self::Known(v),
            None => Self::Null,
        }
    }

    /// Whether the value is known.
    pub fn is_known(&self) -> bool {
        matches!(self, Self::Known(_))
    }

    /// Whether the value is explicitly null.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Whether the value is not yet known.
    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown)
    }

    /// Borrow the known value.
    ///
    /// # Panics
    ///
    /// Panics if the value is null or unknown. Callers branch on
    /// [`is_null`](Self::is_null) and [`is_unknown`](Self::is_unknown) first;
    /// reaching this panic means a converter skipped that check.
    #[track_caller]
    pub fn value(&self) -> &T {
        match self {
            Self::Known(v) => v,
            Self::Null => panic!("invalid state: value() called on a null value"),
            Self::Unknown => panic!("invalid state: value() called on an unknown value"),
        }
    }

    /// Borrow the known value, or fail with [`MappingError::InvalidState`].
    pub fn try_value(&self, path: &str) -> Result<&T, MappingError> {
        match self {
            Self::Known(v) => Ok(v),
            Self::Null | Self::Unknown => Err(MappingError::InvalidState {
                path: path.to_string(),
                found: self.state_name(),
            }),
        }
    }

    /// The known value, if any.
    pub fn as_known(&self) -> Option<&T> {
        match self {
            Self::Known(v) => Some(v),
            _ => None,
        }
    }

    /// Transform the known value, leaving `Null` and `Unknown` untouched.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Value<U> {
        match self {
            Self::Known(v) => Value::Known(f(v)),
            Self::Null => Value::Null,
            Self::Unknown => Value::Unknown,
        }
    }

    /// `"known"`, `"null"` or `"unknown"`.
    pub fn state_name(&self) -> &'static str {
        match self {
            Self::Known(_) => "known",
            Self::Null => "null",
            Self::Unknown => "unknown",
        }
    }
}

impl<T: Clone> Value<T> {
    /// The known value cloned, `None` for null or unknown.
    ///
    /// This is the conversion for fields where the remote service applies a
    /// default: both null and unknown are simply omitted.
    pub fn known_or_none(&self) -> Option<T> {
        self.as_known().cloned()
    }
}

impl<T: Clone + Default> Value<T> {
    /// The known value cloned, or the zero value.
    ///
    /// For attributes the remote service computes: a plan may not know them
    /// yet, and the service ignores what it is sent for them anyway.
    pub fn known_or_default(&self) -> T {
        self.known_or_none().unwrap_or_default()
    }
}

impl<T: PartialEq> Value<T> {
    /// Value equality that only holds when both sides are known.
    pub fn same_known(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Known(a), Self::Known(b)) => a == b,
            _ => false,
        }
    }
}

impl<T> From<T> for Value<T> {
    fn from(value: T) -> Self {
        Self::Known(value)
    }
}

impl From<&str> for Value<String> {
    fn from(value: &str) -> Self {
        Self::Known(value.to_string())
    }
}

impl<T: Serialize> Serialize for Value<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Known(v) => v.serialize(serializer),
            Self::Null => serializer.serialize_none(),
            Self::Unknown => Err(S::Error::custom(
                "cannot serialize an unknown value; state must be fully resolved",
            )),
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Value<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Option::<T>::deserialize(deserializer)?.map_or(Self::Null, Self::Known))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_constructors_and_predicates() {
        let known = Value::known("a".to_string());
        assert!(known.is_known());
        assert!(!known.is_null());
        assert!(!known.is_unknown());

        let null: StringValue = Value::null();
        assert!(null.is_null());
        assert!(!null.is_unknown());

        let unknown: StringValue = Value::unknown();
        assert!(unknown.is_unknown());
        assert!(!unknown.is_null());
    }

    #[test]
    fn test_null_and_unknown_are_distinct() {
        let null: BoolValue = Value::Null;
        let unknown: BoolValue = Value::Unknown;
        assert_ne!(null, unknown);
        assert_eq!(null.state_name(), "null");
        assert_eq!(unknown.state_name(), "unknown");
    }

    #[test]
    fn test_from_option() {
        assert_eq!(Value::from_option(Some(3_i64)), Value::Known(3));
        assert_eq!(Value::<i64>::from_option(None), Value::Null);
    }

    #[test]
    fn test_value_on_known() {
        let v = Value::known(42_i64);
        assert_eq!(*v.value(), 42);
        assert_eq!(v.try_value("count"), Ok(&42));
    }

    #[test]
    #[should_panic(expected = "invalid state")]
    fn test_value_on_null_panics() {
        let v: StringValue = Value::Null;
        let _ = v.value();
    }

    #[test]
    #[should_panic(expected = "unknown value")]
    fn test_value_on_unknown_panics() {
        let v: StringValue = Value::Unknown;
        let _ = v.value();
    }

    #[test]
    fn test_try_value_reports_state() {
        let v: StringValue = Value::Unknown;
        let err = v.try_value("slug").unwrap_err();
        assert_eq!(
            err,
            MappingError::InvalidState {
                path: "slug".to_string(),
                found: "unknown",
            }
        );
    }

    #[test]
    fn test_same_known() {
        let a = Value::known(1_i64);
        assert!(a.same_known(&Value::known(1)));
        assert!(!a.same_known(&Value::known(2)));
        assert!(!Value::<i64>::Null.same_known(&Value::Null));
        assert!(!Value::<i64>::Unknown.same_known(&Value::Unknown));
    }

    #[test]
    fn test_known_or_none() {
        assert_eq!(Value::known(true).known_or_none(), Some(true));
        assert_eq!(BoolValue::Null.known_or_none(), None);
        assert_eq!(BoolValue::Unknown.known_or_none(), None);
    }

    #[test]
    fn test_serde() {
        assert_eq!(serde_json::to_value(Value::known("x")).unwrap(), json!("x"));
        assert_eq!(serde_json::to_value(StringValue::Null).unwrap(), json!(null));
        assert!(serde_json::to_value(StringValue::Unknown).is_err());

        let v: StringValue = serde_json::from_value(json!("y")).unwrap();
        assert_eq!(v, Value::known("y".to_string()));
        let v: StringValue = serde_json::from_value(json!(null)).unwrap();
        assert_eq!(v, Value::Null);
    }
}
