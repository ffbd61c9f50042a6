//! Workspace labels.
//!
//! A label is a standalone resource and also appears nested in sources and
//! user permissions; the nested occurrences share this module's shapes and
//! converters.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::api;
use crate::convert::{CollectionPolicy, ConvertContext};
use crate::dynamic::{
    AttributeReader, AttributeWriter, Attributes, FromAttributes, Object, ToAttributes,
};
use crate::error::MappingError;
use crate::resource::Resource;
use crate::schema::{Attribute, Schema};
use crate::value::{ListValue, StringValue, Value};

/// Persisted state of a label.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LabelState {
    pub key: StringValue,
    pub value: StringValue,
    pub description: StringValue,
}

impl ToAttributes for LabelState {
    fn to_attributes(&self) -> Attributes {
        AttributeWriter::new()
            .with("key", self.key.clone())
            .with("value", self.value.clone())
            .with("description", self.description.clone())
            .finish()
    }
}

/// Planned label.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelPlan {
    pub key: StringValue,
    pub value: StringValue,
    pub description: StringValue,
}

impl FromAttributes for LabelPlan {
    fn from_attributes(r: &AttributeReader<'_>) -> Result<Self, MappingError> {
        Ok(Self {
            key: r.string("key"),
            value: r.string("value"),
            description: r.string("description"),
        })
    }
}

/// Fill label state from the remote label.
pub fn fill_label(label: &api::Label) -> LabelState {
    LabelState {
        key: Value::known(label.key.clone()),
        value: Value::known(label.value.clone()),
        description: Value::from_option(label.description.clone()),
    }
}

/// Build the remote label from a plan.
pub fn label_to_remote(plan: &LabelPlan, ctx: &mut ConvertContext<'_>) -> Option<api::Label> {
    let key = ctx.require("key", &plan.key);
    let value = ctx.require("value", &plan.value);
    let description = plan.description.known_or_none();

    Some(api::Label {
        key: key?,
        value: value?,
        description,
    })
}

/// Convert a nested `labels` collection. Invalid labels are skipped.
pub(crate) fn labels_to_remote(
    name: &str,
    labels: &ListValue<Object>,
    ctx: &mut ConvertContext<'_>,
) -> Option<Vec<api::Label>> {
    ctx.list(name, labels, CollectionPolicy::SkipInvalid, |attrs, ctx| {
        let plan: LabelPlan = ctx.decode(attrs)?;
        label_to_remote(&plan, ctx)
    })
}

/// The `segment_label` resource.
pub struct LabelResource;

impl Resource for LabelResource {
    const TYPE_NAME: &'static str = "segment_label";
    const IMPORT_ID_FORMAT: &'static str = "<key>:<value>";

    type Remote = api::Label;
    type State = LabelState;
    type Plan = LabelPlan;

    fn schema() -> Schema {
        Schema::v0()
            .with_description("A key/value label that can be attached to sources")
            .with_attribute(
                "key",
                Attribute::required_string()
                    .with_description("The label's key")
                    .with_force_new(),
            )
            .with_attribute(
                "value",
                Attribute::required_string()
                    .with_description("The label's value")
                    .with_force_new(),
            )
            .with_attribute("description", Attribute::optional_string())
    }

    fn fill(remote: &api::Label) -> Result<LabelState, MappingError> {
        Ok(fill_label(remote))
    }

    fn to_remote(plan: &LabelPlan, ctx: &mut ConvertContext<'_>) -> Option<api::Label> {
        debug!(resource = Self::TYPE_NAME, "converting plan");
        label_to_remote(plan, ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Diagnostics;
    use crate::testing::{assert_error_at, assert_round_trip, plan_from_json};
    use serde_json::json;

    #[test]
    fn test_round_trip() {
        assert_round_trip::<LabelResource>(&api::Label {
            key: "env".to_string(),
            value: "prod".to_string(),
            description: None,
        });
        assert_round_trip::<LabelResource>(&api::Label {
            key: "team".to_string(),
            value: "growth".to_string(),
            description: Some("Owning team".to_string()),
        });
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let mut plan = plan_from_json::<LabelResource>(json!({"value": "prod"}));
        plan.key = Value::Unknown;

        let mut diags = Diagnostics::new();
        let remote = LabelResource::to_remote(&plan, &mut ConvertContext::new(&mut diags));
        assert!(remote.is_none());
        assert_error_at(&diags, "key");
    }

    #[test]
    fn test_unknown_description_is_omitted() {
        let mut plan = plan_from_json::<LabelResource>(json!({"key": "env", "value": "prod"}));
        plan.description = Value::Unknown;

        let mut diags = Diagnostics::new();
        let remote = LabelResource::to_remote(&plan, &mut ConvertContext::new(&mut diags)).unwrap();
        assert_eq!(remote.description, None);
        assert!(diags.is_empty());
    }

    #[test]
    fn test_nested_labels_skip_invalid() {
        let attrs = crate::testing::attributes(json!({
            "labels": [
                {"key": "env", "value": "prod"},
                {"key": 1, "value": "x"},
                {"key": "team", "value": "growth"}
            ]
        }));
        let labels = AttributeReader::new(&attrs).objects("labels");

        let mut diags = Diagnostics::new();
        let converted = labels_to_remote("labels", &labels, &mut ConvertContext::new(&mut diags)).unwrap();
        assert_eq!(converted.len(), 2);
        assert_eq!(converted[1].key, "team");
        assert_error_at(&diags, "labels.1.key");
    }

    #[test]
    fn test_import_instructions() {
        assert!(LabelResource::import_instructions().contains("segment_label.example <key>:<value>"));
    }
}
