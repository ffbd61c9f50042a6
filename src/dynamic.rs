//! Generic attribute values for plan objects.
//!
//! Nested blocks in a plan are carried as untyped [`Object`]s and only
//! decoded into a concrete shape by the converter that owns them. Decoding
//! early would flatten "block not set" and "block set with every field null"
//! into the same typed value.
//!
//! Typed shapes bind to attribute names explicitly: a [`FromAttributes`]
//! implementation calls one [`AttributeReader`] method per field, and a
//! [`ToAttributes`] implementation writes one entry per field.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};

use serde_json::Number;

use crate::error::MappingError;
use crate::json::JsonPayload;
use crate::value::{ListValue, SetValue, Value};

/// Attributes of an object, keyed by attribute name.
pub type Attributes = BTreeMap<String, Dynamic>;

/// A tri-state object of not-yet-decoded shape.
pub type Object = Value<Attributes>;

/// An attribute value of any type.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Dynamic {
    /// Explicitly null.
    #[default]
    Null,
    /// Not yet known.
    Unknown,
    /// A boolean.
    Bool(bool),
    /// A number.
    Number(Number),
    /// A string.
    String(String),
    /// An ordered list.
    List(Vec<Dynamic>),
    /// An unordered set.
    Set(Vec<Dynamic>),
    /// An object.
    Object(Attributes),
}

static NULL: Dynamic = Dynamic::Null;

impl Dynamic {
    /// Name of the value's type, for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Unknown => "unknown",
            Self::Bool(_) => "bool",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::List(_) => "list",
            Self::Set(_) => "set",
            Self::Object(_) => "object",
        }
    }

    /// Whether the value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Whether the value is unknown.
    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown)
    }

    /// Encode a typed record as an object value.
    pub fn record<T: ToAttributes>(record: &T) -> Self {
        Self::Object(record.to_attributes())
    }

    /// Encode an optional typed record.
    pub fn optional_record<T: ToAttributes>(record: &Value<T>) -> Self {
        match record {
            Value::Known(r) => Self::record(r),
            Value::Null => Self::Null,
            Value::Unknown => Self::Unknown,
        }
    }

    /// Encode typed records as a list of objects.
    pub fn records<T: ToAttributes>(records: &[T]) -> Self {
        Self::List(records.iter().map(Self::record).collect())
    }

    /// Encode typed records as a set of objects.
    pub fn record_set<T: ToAttributes>(records: &[T]) -> Self {
        Self::Set(records.iter().map(Self::record).collect())
    }

    /// Convert into plain JSON. Fails if any nested value is unknown.
    pub fn to_json(&self, path: &str) -> Result<serde_json::Value, MappingError> {
        use serde_json::Value as Json;
        Ok(match self {
            Self::Null => Json::Null,
            Self::Unknown => return Err(MappingError::incomplete(path)),
            Self::Bool(b) => Json::Bool(*b),
            Self::Number(n) => Json::Number(n.clone()),
            Self::String(s) => Json::String(s.clone()),
            Self::List(items) | Self::Set(items) => Json::Array(
                items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| item.to_json(&index_path(path, i)))
                    .collect::<Result<_, _>>()?,
            ),
            Self::Object(attrs) => Json::Object(
                attrs
                    .iter()
                    .map(|(k, v)| -> Result<(String, Json), MappingError> {
                        Ok((k.clone(), v.to_json(&join_path(path, k))?))
                    })
                    .collect::<Result<_, _>>()?,
            ),
        })
    }
}

impl From<serde_json::Value> for Dynamic {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value as Json;
        match value {
            Json::Null => Self::Null,
            Json::Bool(b) => Self::Bool(b),
            Json::Number(n) => Self::Number(n),
            Json::String(s) => Self::String(s),
            Json::Array(items) => Self::List(items.into_iter().map(Self::from).collect()),
            Json::Object(map) => {
                Self::Object(map.into_iter().map(|(k, v)| (k, Self::from(v))).collect())
            },
        }
    }
}

impl From<bool> for Dynamic {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Dynamic {
    fn from(value: i64) -> Self {
        Self::Number(Number::from(value))
    }
}

impl From<f64> for Dynamic {
    fn from(value: f64) -> Self {
        Number::from_f64(value).map_or(Self::Null, Self::Number)
    }
}

impl From<String> for Dynamic {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<&str> for Dynamic {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<Attributes> for Dynamic {
    fn from(value: Attributes) -> Self {
        Self::Object(value)
    }
}

impl<T: Into<Dynamic>> From<Vec<T>> for Dynamic {
    fn from(value: Vec<T>) -> Self {
        Self::List(value.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Dynamic>> From<BTreeSet<T>> for Dynamic {
    fn from(value: BTreeSet<T>) -> Self {
        Self::Set(value.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Dynamic>> From<Value<T>> for Dynamic {
    fn from(value: Value<T>) -> Self {
        match value {
            Value::Known(v) => v.into(),
            Value::Null => Self::Null,
            Value::Unknown => Self::Unknown,
        }
    }
}

impl From<JsonPayload> for Dynamic {
    fn from(value: JsonPayload) -> Self {
        value.as_value().clone().into()
    }
}

/// Decode a typed shape from attributes.
pub trait FromAttributes: Sized {
    /// Read every field of `Self` from `reader`.
    ///
    /// Field errors are collected by the reader, so implementations read
    /// each field in turn and never stop early. Error paths are relative to
    /// the object being decoded.
    fn from_attributes(reader: &AttributeReader<'_>) -> Result<Self, MappingError>;

    /// Decode from a plain attribute map, returning the first error.
    fn decode(attrs: &Attributes) -> Result<Self, MappingError> {
        let reader = AttributeReader::new(attrs);
        let decoded = Self::from_attributes(&reader)?;
        match reader.into_errors().into_iter().next() {
            Some(err) => Err(err),
            None => Ok(decoded),
        }
    }

    /// Decode from a plain attribute map, returning every field error.
    fn decode_all(attrs: &Attributes) -> Result<Self, Vec<MappingError>> {
        let reader = AttributeReader::new(attrs);
        let decoded = Self::from_attributes(&reader);
        let mut errors = reader.into_errors();
        match decoded {
            Ok(value) if errors.is_empty() => Ok(value),
            Ok(_) => Err(errors),
            Err(err) => {
                errors.push(err);
                Err(errors)
            },
        }
    }
}

/// Encode a typed shape as attributes.
pub trait ToAttributes {
    /// Write every field of `self`.
    fn to_attributes(&self) -> Attributes;
}

/// Decode a tri-state object into a tri-state typed shape.
///
/// Errors are reported under `path`.
pub fn decode_object<T: FromAttributes>(object: &Object, path: &str) -> Result<Value<T>, MappingError> {
    match object {
        Value::Known(attrs) => T::decode(attrs)
            .map(Value::Known)
            .map_err(|e| e.within(path)),
        Value::Null => Ok(Value::Null),
        Value::Unknown => Ok(Value::Unknown),
    }
}

/// Typed, name-by-name access to an object's attributes.
///
/// A missing attribute reads as null. A field that does not match the
/// requested type also reads as null, and its error is kept until
/// [`into_errors`](Self::into_errors).
pub struct AttributeReader<'a> {
    attrs: &'a Attributes,
    errors: RefCell<Vec<MappingError>>,
}

impl<'a> AttributeReader<'a> {
    /// Wrap an attribute map.
    pub fn new(attrs: &'a Attributes) -> Self {
        Self {
            attrs,
            errors: RefCell::new(Vec::new()),
        }
    }

    /// The raw attribute value.
    pub fn get(&self, name: &str) -> &'a Dynamic {
        self.attrs.get(name).unwrap_or(&NULL)
    }

    /// Whether any field failed to read so far.
    pub fn has_errors(&self) -> bool {
        !self.errors.borrow().is_empty()
    }

    /// The field errors, in read order.
    pub fn into_errors(self) -> Vec<MappingError> {
        self.errors.into_inner()
    }

    fn record<T>(&self, read: Result<Value<T>, MappingError>) -> Value<T> {
        read.unwrap_or_else(|err| {
            self.errors.borrow_mut().push(err);
            Value::Null
        })
    }

    /// Read a string attribute.
    pub fn string(&self, name: &str) -> Value<String> {
        self.record(as_string(self.get(name), name))
    }

    /// Read a boolean attribute.
    pub fn bool(&self, name: &str) -> Value<bool> {
        self.record(match self.get(name) {
            Dynamic::Bool(b) => Ok(Value::Known(*b)),
            other => scalar_state(other, name, "bool"),
        })
    }

    /// Read an integer attribute.
    pub fn int64(&self, name: &str) -> Value<i64> {
        self.record(match self.get(name) {
            Dynamic::Number(n) => n.as_i64().map(Value::Known).ok_or_else(|| {
                MappingError::decoding(name, format!("expected int64, got {}", n))
            }),
            other => scalar_state(other, name, "int64"),
        })
    }

    /// Read a decimal attribute.
    pub fn float64(&self, name: &str) -> Value<f64> {
        self.record(match self.get(name) {
            Dynamic::Number(n) => n.as_f64().map(Value::Known).ok_or_else(|| {
                MappingError::decoding(name, format!("expected float64, got {}", n))
            }),
            other => scalar_state(other, name, "float64"),
        })
    }

    /// Read a nested object without decoding it.
    pub fn object(&self, name: &str) -> Object {
        self.record(as_object(self.get(name), name))
    }

    /// Read a list (or set) of nested objects without decoding them.
    pub fn objects(&self, name: &str) -> ListValue<Object> {
        self.collection(name, as_object)
    }

    /// Read an ordered list of strings.
    pub fn strings(&self, name: &str) -> ListValue<String> {
        match self.collection(name, as_string) {
            Value::Known(items) => match known_elements(items, name) {
                Ok(items) => Value::Known(items),
                Err(errors) => {
                    self.errors.borrow_mut().extend(errors);
                    Value::Null
                },
            },
            Value::Null => Value::Null,
            Value::Unknown => Value::Unknown,
        }
    }

    /// Read an unordered set of strings.
    pub fn string_set(&self, name: &str) -> SetValue<String> {
        self.strings(name)
            .map(|items| items.into_iter().collect::<BTreeSet<_>>())
    }

    /// Read a JSON payload attribute.
    ///
    /// Accepts JSON text or an inline object; either way the payload is
    /// stored canonicalized.
    pub fn json(&self, name: &str) -> JsonPayload {
        let read = match self.get(name) {
            Dynamic::Null => Ok(JsonPayload::null()),
            Dynamic::Unknown => Ok(JsonPayload::unknown()),
            Dynamic::String(text) => JsonPayload::from_text(text, name),
            other @ (Dynamic::Object(_) | Dynamic::List(_)) => other
                .to_json(name)
                .and_then(|raw| JsonPayload::from_raw(&raw, name)),
            other => Err(MappingError::decoding(
                name,
                format!("expected JSON text, got {}", other.type_name()),
            )),
        };
        read.unwrap_or_else(|err| {
            self.errors.borrow_mut().push(err);
            JsonPayload::null()
        })
    }

    /// Every element is checked; a collection with any bad element reads
    /// as null, with one error per bad element.
    fn collection<T>(
        &self,
        name: &str,
        element: impl Fn(&Dynamic, &str) -> Result<T, MappingError>,
    ) -> ListValue<T> {
        match self.get(name) {
            Dynamic::List(items) | Dynamic::Set(items) => {
                let mut converted = Vec::with_capacity(items.len());
                let mut failed = false;
                for (i, item) in items.iter().enumerate() {
                    match element(item, &index_path(name, i)) {
                        Ok(value) => converted.push(value),
                        Err(err) => {
                            failed = true;
                            self.errors.borrow_mut().push(err);
                        },
                    }
                }
                if failed {
                    Value::Null
                } else {
                    Value::Known(converted)
                }
            },
            Dynamic::Null => Value::Null,
            Dynamic::Unknown => Value::Unknown,
            other => self.record(Err(MappingError::decoding(
                name,
                format!("expected list, got {}", other.type_name()),
            ))),
        }
    }
}

/// Builder for [`ToAttributes`] implementations.
#[derive(Debug, Default)]
pub struct AttributeWriter {
    attrs: Attributes,
}

impl AttributeWriter {
    /// Start an empty attribute map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an attribute.
    pub fn with(mut self, name: &str, value: impl Into<Dynamic>) -> Self {
        self.attrs.insert(name.to_string(), value.into());
        self
    }

    /// Finish building.
    pub fn finish(self) -> Attributes {
        self.attrs
    }
}

fn as_string(value: &Dynamic, path: &str) -> Result<Value<String>, MappingError> {
    match value {
        Dynamic::String(s) => Ok(Value::Known(s.clone())),
        other => scalar_state(other, path, "string"),
    }
}

fn as_object(value: &Dynamic, path: &str) -> Result<Object, MappingError> {
    match value {
        Dynamic::Object(attrs) => Ok(Value::Known(attrs.clone())),
        other => scalar_state(other, path, "object"),
    }
}

fn scalar_state<T>(value: &Dynamic, path: &str, expected: &str) -> Result<Value<T>, MappingError> {
    match value {
        Dynamic::Null => Ok(Value::Null),
        Dynamic::Unknown => Ok(Value::Unknown),
        other => Err(MappingError::decoding(
            path,
            format!("expected {}, got {}", expected, other.type_name()),
        )),
    }
}

fn known_elements<T>(items: Vec<Value<T>>, path: &str) -> Result<Vec<T>, Vec<MappingError>> {
    let mut known = Vec::with_capacity(items.len());
    let mut errors = Vec::new();
    for (i, item) in items.into_iter().enumerate() {
        match item {
            Value::Known(v) => known.push(v),
            Value::Null => errors.push(MappingError::decoding(
                index_path(path, i),
                "collection elements must not be null",
            )),
            Value::Unknown => errors.push(MappingError::incomplete(index_path(path, i))),
        }
    }
    if errors.is_empty() {
        Ok(known)
    } else {
        Err(errors)
    }
}

pub(crate) fn join_path(base: &str, name: &str) -> String {
    if base.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", base, name)
    }
}

pub(crate) fn index_path(base: &str, index: usize) -> String {
    format!("{}.{}", base, index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn attrs(value: serde_json::Value) -> Attributes {
        match Dynamic::from(value) {
            Dynamic::Object(attrs) => attrs,
            other => panic!("expected object, got {}", other.type_name()),
        }
    }

    #[derive(Debug, PartialEq)]
    struct Track {
        allow_unplanned: Value<bool>,
        common_event: Value<String>,
    }

    impl FromAttributes for Track {
        fn from_attributes(r: &AttributeReader<'_>) -> Result<Self, MappingError> {
            Ok(Self {
                allow_unplanned: r.bool("allow_unplanned"),
                common_event: r.string("common_event"),
            })
        }
    }

    impl ToAttributes for Track {
        fn to_attributes(&self) -> Attributes {
            AttributeWriter::new()
                .with("allow_unplanned", self.allow_unplanned.clone())
                .with("common_event", self.common_event.clone())
                .finish()
        }
    }

    #[test]
    fn test_missing_attribute_reads_as_null() {
        let a = attrs(json!({}));
        let r = AttributeReader::new(&a);
        assert_eq!(r.string("name"), Value::Null);
        assert_eq!(r.bool("enabled"), Value::Null);
        assert_eq!(r.objects("labels"), Value::Null);
        assert!(r.json("settings").is_null());
        assert!(r.into_errors().is_empty());
    }

    #[test]
    fn test_unknown_is_preserved() {
        let mut a = attrs(json!({"name": "x"}));
        a.insert("id".to_string(), Dynamic::Unknown);
        a.insert("keys".to_string(), Dynamic::Unknown);
        let r = AttributeReader::new(&a);
        assert_eq!(r.string("id"), Value::Unknown);
        assert_eq!(r.strings("keys"), Value::Unknown);
        assert_eq!(r.string("name"), Value::known("x".to_string()));
    }

    #[test]
    fn test_type_mismatch_is_a_decoding_error() {
        let a = attrs(json!({"enabled": "yes", "count": 1.5}));
        let r = AttributeReader::new(&a);
        assert_eq!(r.bool("enabled"), Value::Null);
        assert_eq!(r.int64("count"), Value::Null);
        assert_eq!(r.float64("count"), Value::known(1.5));

        let errors = r.into_errors();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].path(), "enabled");
        assert!(errors[0].to_string().contains("expected bool, got string"));
        assert_eq!(errors[1].path(), "count");
    }

    #[test]
    fn test_strings_and_sets() {
        let a = attrs(json!({"keys": ["b", "a", "b"], "bad": ["a", 1, null]}));
        let r = AttributeReader::new(&a);
        assert_eq!(
            r.strings("keys"),
            Value::known(vec!["b".to_string(), "a".to_string(), "b".to_string()])
        );
        let set = r.string_set("keys");
        assert_eq!(set.value().len(), 2);
        assert!(!r.has_errors());

        assert_eq!(r.strings("bad"), Value::Null);
        let paths: Vec<_> = r.into_errors().iter().map(|e| e.path().to_string()).collect();
        assert_eq!(paths, vec!["bad.1", "bad.2"]);
    }

    #[test]
    fn test_json_attribute_accepts_text_and_objects() {
        let a = attrs(json!({"text": "{\"b\": 1, \"a\": 2}", "inline": {"b": 1, "a": 2}, "bad": "{"}));
        let r = AttributeReader::new(&a);
        let text = r.json("text");
        let inline = r.json("inline");
        assert_eq!(text.as_text(), Some(r#"{"a":2,"b":1}"#));
        assert!(JsonPayload::equivalent(&text, &inline));

        assert!(r.json("bad").is_null());
        assert!(r.has_errors());
    }

    #[test]
    fn test_decode_all_reports_every_bad_field() {
        let a = attrs(json!({"allow_unplanned": "x", "common_event": 5}));
        let errors = Track::decode_all(&a).unwrap_err();
        let paths: Vec<_> = errors.iter().map(|e| e.path()).collect();
        assert_eq!(paths, vec!["allow_unplanned", "common_event"]);

        let first = Track::decode(&a).unwrap_err();
        assert_eq!(first.path(), "allow_unplanned");
    }

    #[test]
    fn test_decode_object_preserves_null_block() {
        let null: Object = Value::Null;
        assert_eq!(decode_object::<Track>(&null, "track").unwrap(), Value::Null);

        let empty: Object = Value::Known(Attributes::new());
        let decoded = decode_object::<Track>(&empty, "track").unwrap();
        assert_eq!(
            decoded,
            Value::Known(Track {
                allow_unplanned: Value::Null,
                common_event: Value::Null,
            })
        );
    }

    #[test]
    fn test_decode_object_prefixes_errors() {
        let bad: Object = Value::Known(attrs(json!({"allow_unplanned": "nope"})));
        let err = decode_object::<Track>(&bad, "schema_settings.track").unwrap_err();
        assert_eq!(err.path(), "schema_settings.track.allow_unplanned");
    }

    #[test]
    fn test_to_attributes_round_trip() {
        let track = Track {
            allow_unplanned: Value::known(true),
            common_event: Value::Null,
        };
        let decoded = Track::decode(&track.to_attributes()).unwrap();
        assert_eq!(decoded, track);
    }

    #[test]
    fn test_to_json_rejects_unknown() {
        let value = Dynamic::List(vec![Dynamic::from("a"), Dynamic::Unknown]);
        let err = value.to_json("keys").unwrap_err();
        assert_eq!(err, MappingError::incomplete("keys.1"));

        let value = Dynamic::from(json!({"a": [1, true]}));
        assert_eq!(value.to_json("").unwrap(), json!({"a": [1, true]}));
    }
}
