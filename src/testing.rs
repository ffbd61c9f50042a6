//! Testing utilities for resource mappings.
//!
//! Helpers to author plans from JSON, run converters without a remote
//! service, and assert on the resulting diagnostics.
//!
//! # Example
//!
//! ```
//! use hemmer_segment_state::resources::LabelResource;
//! use hemmer_segment_state::testing::{plan_from_json, to_remote};
//! use serde_json::json;
//!
//! let plan = plan_from_json::<LabelResource>(json!({"key": "env", "value": "prod"}));
//! let label = to_remote::<LabelResource>(&plan).unwrap();
//! assert_eq!(label.key, "env");
//! ```

use std::fmt::Debug;

use serde::Serialize;

use crate::convert::ConvertContext;
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::dynamic::{Attributes, Dynamic, FromAttributes};
use crate::json::JsonPayload;
use crate::resource::Resource;

/// Build plan attributes from a JSON object.
///
/// # Panics
///
/// Panics if `value` is not a JSON object.
pub fn attributes(value: serde_json::Value) -> Attributes {
    match Dynamic::from(value) {
        Dynamic::Object(attrs) => attrs,
        other => panic!("Expected a JSON object for plan attributes, got {}", other.type_name()),
    }
}

/// Decode a plan for `R` from a JSON object, the way configuration is read.
///
/// # Panics
///
/// Panics if the JSON does not decode into `R::Plan`.
pub fn plan_from_json<R: Resource>(value: serde_json::Value) -> R::Plan {
    match R::Plan::decode(&attributes(value)) {
        Ok(plan) => plan,
        Err(e) => panic!("Plan for {} failed to decode: {}", R::TYPE_NAME, e),
    }
}

/// Error returned by [`to_remote`].
#[derive(Debug)]
pub enum TestError {
    /// The conversion finished with error diagnostics.
    Diagnostics(Vec<Diagnostic>),
    /// The conversion produced no remote value and reported no error.
    Aborted,
}

impl std::fmt::Display for TestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TestError::Diagnostics(diags) => {
                writeln!(f, "Conversion failed with {} diagnostic(s):", diags.len())?;
                for diag in diags {
                    write!(f, "  [{:?}] {}", diag.severity, diag.summary)?;
                    if let Some(detail) = &diag.detail {
                        write!(f, ": {}", detail)?;
                    }
                    if let Some(attr) = &diag.attribute {
                        write!(f, " (at {})", attr)?;
                    }
                    writeln!(f)?;
                }
                Ok(())
            },
            TestError::Aborted => write!(f, "Conversion aborted without diagnostics"),
        }
    }
}

impl std::error::Error for TestError {}

/// Run `R`'s plan converter with a fresh collector.
///
/// Any error diagnostic fails the conversion, even when a value was
/// produced.
pub fn to_remote<R: Resource>(plan: &R::Plan) -> Result<R::Remote, TestError> {
    let mut diagnostics = Diagnostics::new();
    let remote = R::to_remote(plan, &mut ConvertContext::new(&mut diagnostics));
    if diagnostics.has_error() {
        return Err(TestError::Diagnostics(diagnostics.errors().cloned().collect()));
    }
    remote.ok_or(TestError::Aborted)
}

/// Assert that `fill → to_plan → to_remote → fill` reproduces the first state,
/// and that the regenerated remote value matches the original on the wire.
///
/// The wire comparison drops null fields on both sides. A `Nullable` field
/// that the original left unset fills as null and is written back as an
/// explicit null, so absent and null compare equal.
///
/// # Panics
///
/// Panics if any step fails, the two states differ, or the two remote
/// values serialize differently.
pub fn assert_round_trip<R>(remote: &R::Remote)
where
    R: Resource,
    R::Remote: Serialize,
    R::State: Debug + PartialEq,
{
    let state = R::fill(remote).unwrap_or_else(|e| panic!("First fill failed: {}", e));
    let plan = R::to_plan(&state).unwrap_or_else(|e| panic!("State did not read back as a plan: {}", e));
    let written = to_remote::<R>(&plan).unwrap_or_else(|e| panic!("{}", e));
    let refilled = R::fill(&written).unwrap_or_else(|e| panic!("Second fill failed: {}", e));
    assert_eq!(refilled, state, "Round trip through {} changed the state", R::TYPE_NAME);

    let before = wire_payload::<R>(remote);
    let after = wire_payload::<R>(&written);
    assert!(
        JsonPayload::equivalent(&before, &after),
        "Round trip through {} changed the remote value:\n  before: {}\n  after:  {}",
        R::TYPE_NAME,
        before.as_text().unwrap_or("null"),
        after.as_text().unwrap_or("null"),
    );
}

fn wire_payload<R>(remote: &R::Remote) -> JsonPayload
where
    R: Resource,
    R::Remote: Serialize,
{
    let wire = serde_json::to_value(remote)
        .unwrap_or_else(|e| panic!("{} did not serialize: {}", R::TYPE_NAME, e));
    JsonPayload::from_raw(&drop_nulls(wire), R::TYPE_NAME).unwrap_or_else(|e| panic!("{}", e))
}

fn drop_nulls(value: serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::Object(map) => serde_json::Value::Object(
            map.into_iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k, drop_nulls(v)))
                .collect(),
        ),
        serde_json::Value::Array(items) => {
            serde_json::Value::Array(items.into_iter().map(drop_nulls).collect())
        },
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api;
    use crate::resources::{FunctionResource, LabelResource};
    use crate::value::Value;
    use serde_json::json;

    #[test]
    fn test_attributes_from_json() {
        let attrs = attributes(json!({"key": "env", "nested": {"a": [1]}}));
        assert_eq!(attrs.len(), 2);
        assert!(matches!(attrs["nested"], Dynamic::Object(_)));
    }

    #[test]
    #[should_panic(expected = "Expected a JSON object")]
    fn test_attributes_rejects_non_object() {
        attributes(json!([1, 2]));
    }

    #[test]
    fn test_to_remote_reports_diagnostics() {
        let mut plan = plan_from_json::<LabelResource>(json!({"value": "prod"}));
        plan.key = Value::Unknown;

        let err = to_remote::<LabelResource>(&plan).unwrap_err();
        let text = err.to_string();
        assert!(text.contains("1 diagnostic(s)"));
        assert!(text.contains("(at key)"));
    }

    #[test]
    fn test_round_trip_helper() {
        assert_round_trip::<LabelResource>(&api::Label {
            key: "env".to_string(),
            value: "prod".to_string(),
            description: Some(String::new()),
        });
    }

    #[test]
    fn test_round_trip_treats_unset_as_null() {
        assert_round_trip::<FunctionResource>(&api::Function {
            id: "fn_1".to_string(),
            resource_type: "SOURCE".to_string(),
            code: "async function onTrack(event) {}".to_string(),
            display_name: "Enricher".to_string(),
            description: api::Nullable::Unset,
            logo_url: api::Nullable::Null,
            ..Default::default()
        });
    }

    #[test]
    fn test_drop_nulls_is_recursive() {
        let cleaned = drop_nulls(json!({"a": null, "b": {"c": null, "d": 1}, "e": [{"f": null}]}));
        assert_eq!(cleaned, json!({"b": {"d": 1}, "e": [{}]}));
    }

    #[test]
    fn test_assert_no_errors_passes() {
        let diagnostics = vec![Diagnostic::warning("Just a warning")];
        assert_no_errors(&diagnostics);
    }

    #[test]
    #[should_panic(expected = "Expected no errors")]
    fn test_assert_no_errors_fails() {
        let diagnostics = vec![Diagnostic::error("An error")];
        assert_no_errors(&diagnostics);
    }

    #[test]
    fn test_assert_has_errors_passes() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.error("An error", "with detail");
        assert_has_errors(&diagnostics);
    }

    #[test]
    #[should_panic(expected = "Expected at least one error")]
    fn test_assert_has_errors_fails() {
        assert_has_errors(Diagnostics::new());
    }

    #[test]
    fn test_assert_error_contains_passes() {
        let diagnostics = vec![Diagnostic::error("Value is not yet known").with_detail("at slug")];
        assert_error_contains(&diagnostics, "not yet known");
        assert_error_contains(&diagnostics, "at slug");
    }

    #[test]
    #[should_panic(expected = "Expected an error containing")]
    fn test_assert_error_contains_fails() {
        let diagnostics = vec![Diagnostic::error("Some other error")];
        assert_error_contains(&diagnostics, "not yet known");
    }

    #[test]
    fn test_assert_error_at() {
        let diagnostics = vec![Diagnostic::error("Bad").with_attribute("rules.1.type")];
        assert_error_at(&diagnostics, "rules.1.type");
    }

    #[test]
    #[should_panic(expected = "Expected an error at 'rules.0'")]
    fn test_assert_error_at_fails() {
        let diagnostics = vec![Diagnostic::warning("Bad").with_attribute("rules.0")];
        assert_error_at(&diagnostics, "rules.0");
    }
}
