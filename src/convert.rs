//! Scoped context for plan → remote conversions.
//!
//! A [`ConvertContext`] carries the attribute path of the value being
//! converted and the [`Diagnostics`] collector shared by the whole conversion
//! tree. Its helpers encode the per-field policies for values that are null
//! or unknown:
//!
//! | Helper | Unknown | Null |
//! |--------|---------|------|
//! | [`require`](ConvertContext::require) | `IncompleteValue`, entity aborts | zero value |
//! | [`Value::known_or_none`] | omitted | omitted |
//! | [`Value::known_or_default`] | zero value | zero value |
//! | [`nullable`](ConvertContext::nullable) | unset | explicit null |
//! | [`block`](ConvertContext::block) | omitted | omitted |
//! | [`required_block`](ConvertContext::required_block) | `IncompleteValue`, entity aborts | zero value |
//! | [`list`](ConvertContext::list) | `IncompleteValue`, entity aborts | empty |
//! | [`json_map`](ConvertContext::json_map) | omitted | omitted |
//!
//! Converters gather every field first and only then assemble the remote
//! value with `?`, so one pass reports every problem before giving up.

use serde_json::Map;
use tracing::warn;

use crate::api::Nullable;
use crate::diagnostics::Diagnostics;
use crate::dynamic::{index_path, join_path, Attributes, FromAttributes, Object};
use crate::error::MappingError;
use crate::json::JsonPayload;
use crate::numeric::narrow_f64;
use crate::value::{ListValue, Value};

/// How element failures in a collection of nested objects are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionPolicy {
    /// Failing elements are reported and dropped; the rest are kept.
    SkipInvalid,
    /// Every element is attempted, but any failure fails the collection and
    /// aborts the enclosing entity.
    Atomic,
}

/// Path scope and diagnostics sink for one conversion.
pub struct ConvertContext<'a> {
    path: String,
    diagnostics: &'a mut Diagnostics,
}

impl<'a> ConvertContext<'a> {
    /// Start a conversion at the root of an entity.
    pub fn new(diagnostics: &'a mut Diagnostics) -> Self {
        Self {
            path: String::new(),
            diagnostics,
        }
    }

    /// The current attribute path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The diagnostics recorded so far.
    pub fn diagnostics(&self) -> &Diagnostics {
        &*self.diagnostics
    }

    /// Whether any error has been recorded so far.
    pub fn has_error(&self) -> bool {
        self.diagnostics.has_error()
    }

    /// A child context for the attribute `name`.
    pub fn scoped(&mut self, name: &str) -> ConvertContext<'_> {
        ConvertContext {
            path: join_path(&self.path, name),
            diagnostics: &mut *self.diagnostics,
        }
    }

    fn at(&self, name: &str) -> String {
        join_path(&self.path, name)
    }

    /// Record an error whose path is relative to this context.
    pub fn report(&mut self, err: MappingError) {
        self.diagnostics.push_error(err.within(&self.path));
    }

    /// A field without a remote default.
    ///
    /// `Unknown` records an `IncompleteValue` error and yields `None`; `Null`
    /// yields the zero value, which is how the remote model spells absence.
    pub fn require<T: Clone + Default>(&mut self, name: &str, value: &Value<T>) -> Option<T> {
        match value {
            Value::Known(v) => Some(v.clone()),
            Value::Null => Some(T::default()),
            Value::Unknown => {
                self.report(MappingError::incomplete(name));
                None
            },
        }
    }

    /// A field the remote model declares as explicitly nullable.
    pub fn nullable<T: Clone>(&self, value: &Value<T>) -> Nullable<T> {
        match value {
            Value::Known(v) => Nullable::Value(v.clone()),
            Value::Null => Nullable::Null,
            Value::Unknown => Nullable::Unset,
        }
    }

    /// Decode attributes into `T`, reporting every field error under this
    /// context.
    pub fn decode<T: FromAttributes>(&mut self, attrs: &Attributes) -> Option<T> {
        match T::decode_all(attrs) {
            Ok(v) => Some(v),
            Err(errors) => {
                for err in errors {
                    self.report(err);
                }
                None
            },
        }
    }

    /// Decode the nested block `name` on demand.
    ///
    /// A null or unknown block yields `None`, as does a block that fails to
    /// decode; the failure is recorded and sibling fields carry on.
    pub fn block<T: FromAttributes>(&mut self, name: &str, object: &Object) -> Option<T> {
        match object {
            Value::Known(attrs) => {
                let decoded = self.scoped(name).decode(attrs);
                if decoded.is_none() {
                    warn!(path = %self.at(name), "nested block failed to decode");
                }
                decoded
            },
            Value::Null | Value::Unknown => None,
        }
    }

    /// Convert the nested block `name`, which the entity can't be sent without.
    ///
    /// Follows [`require`](Self::require): an unknown block records an
    /// `IncompleteValue` error and yields `None`, a null block yields the zero
    /// value. A block that fails to decode or convert also yields `None`.
    pub fn required_block<T: FromAttributes, U: Default>(
        &mut self,
        name: &str,
        object: &Object,
        convert: impl FnOnce(&T, &mut ConvertContext<'_>) -> Option<U>,
    ) -> Option<U> {
        match object {
            Value::Known(attrs) => {
                let mut scoped = self.scoped(name);
                let block = scoped.decode::<T>(attrs)?;
                convert(&block, &mut scoped)
            },
            Value::Null => Some(U::default()),
            Value::Unknown => {
                self.report(MappingError::incomplete(name));
                None
            },
        }
    }

    /// Convert the collection of nested objects `name`, element by element.
    ///
    /// `convert` receives each element's attributes and a context scoped to
    /// `name.<index>`. An element fails when `convert` returns `None` or
    /// records an error. See [`CollectionPolicy`] for what happens next.
    pub fn list<T>(
        &mut self,
        name: &str,
        list: &ListValue<Object>,
        policy: CollectionPolicy,
        mut convert: impl FnMut(&Attributes, &mut ConvertContext<'_>) -> Option<T>,
    ) -> Option<Vec<T>> {
        let elements = match list {
            Value::Known(elements) => elements,
            Value::Null => return Some(Vec::new()),
            Value::Unknown => {
                self.report(MappingError::incomplete(name));
                return None;
            },
        };

        let mut converted = Vec::with_capacity(elements.len());
        let mut failed = false;
        for (i, element) in elements.iter().enumerate() {
            let element_path = index_path(name, i);
            let result = match element {
                Value::Known(attrs) => {
                    let errors_before = self.diagnostics.errors().count();
                    let mut scoped = self.scoped(&element_path);
                    let result = convert(attrs, &mut scoped);
                    if self.diagnostics.errors().count() > errors_before {
                        None
                    } else {
                        result
                    }
                },
                Value::Null => {
                    self.report(MappingError::decoding(
                        element_path.as_str(),
                        "collection elements must not be null",
                    ));
                    None
                },
                Value::Unknown => {
                    self.report(MappingError::incomplete(element_path.as_str()));
                    None
                },
            };
            match result {
                Some(value) => converted.push(value),
                None => {
                    failed = true;
                    warn!(path = %self.at(&element_path), ?policy, "collection element failed to convert");
                },
            }
        }

        match policy {
            CollectionPolicy::Atomic if failed => None,
            _ => Some(converted),
        }
    }

    /// Decode the payload `name` into an unstructured map.
    ///
    /// Null and unknown payloads yield `None` (no settings object); a payload
    /// that fails to decode is reported and also yields `None`.
    pub fn json_map(
        &mut self,
        name: &str,
        payload: &JsonPayload,
    ) -> Option<Map<String, serde_json::Value>> {
        if payload.is_unknown() {
            return None;
        }
        match payload.decode_map(name) {
            Ok(map) => map,
            Err(e) => {
                self.report(e);
                None
            },
        }
    }

    /// Decode the payload `name` into an arbitrary JSON value.
    pub fn json_value(&mut self, name: &str, payload: &JsonPayload) -> Option<serde_json::Value> {
        if payload.is_null() || payload.is_unknown() {
            return None;
        }
        match payload.decode(name) {
            Ok(value) => Some(value),
            Err(e) => {
                self.report(e);
                None
            },
        }
    }

    /// Narrow the decimal `name` to the remote model's `f32` via its text.
    pub fn narrow(&mut self, name: &str, value: &Value<f64>) -> Option<f32> {
        let v = value.as_known()?;
        match narrow_f64(*v, name) {
            Ok(narrowed) => Some(narrowed),
            Err(e) => {
                self.report(e);
                None
            },
        }
    }
}
