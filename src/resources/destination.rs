//! Destinations attached to a source.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{fill_logos, logos_to_remote, planned_id, LogosPlan, LogosState};
use crate::api;
use crate::convert::ConvertContext;
use crate::dynamic::{
    AttributeReader, AttributeWriter, Attributes, Dynamic, FromAttributes, Object, ToAttributes,
};
use crate::error::MappingError;
use crate::json::JsonPayload;
use crate::resource::Resource;
use crate::schema::{logos_block, Attribute, Block, NestedBlock, Schema};
use crate::value::{BoolValue, ListValue, StringValue, Value};

/// Persisted state of a destination.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DestinationState {
    pub id: StringValue,
    pub name: StringValue,
    pub enabled: BoolValue,
    pub source_id: StringValue,
    pub metadata: Value<DestinationMetadataState>,
    pub settings: JsonPayload,
}

/// Catalog metadata of the destination's integration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DestinationMetadataState {
    pub id: StringValue,
    pub slug: StringValue,
    pub name: StringValue,
    pub description: StringValue,
    pub categories: Vec<String>,
    pub website: StringValue,
    pub logos: Value<LogosState>,
}

impl ToAttributes for DestinationState {
    fn to_attributes(&self) -> Attributes {
        AttributeWriter::new()
            .with("id", self.id.clone())
            .with("name", self.name.clone())
            .with("enabled", self.enabled.clone())
            .with("source_id", self.source_id.clone())
            .with("metadata", Dynamic::optional_record(&self.metadata))
            .with("settings", self.settings.clone())
            .finish()
    }
}

impl ToAttributes for DestinationMetadataState {
    fn to_attributes(&self) -> Attributes {
        AttributeWriter::new()
            .with("id", self.id.clone())
            .with("slug", self.slug.clone())
            .with("name", self.name.clone())
            .with("description", self.description.clone())
            .with("categories", self.categories.clone())
            .with("website", self.website.clone())
            .with("logos", Dynamic::optional_record(&self.logos))
            .finish()
    }
}

/// Planned destination.
#[derive(Debug, Clone, PartialEq)]
pub struct DestinationPlan {
    pub id: StringValue,
    pub name: StringValue,
    pub enabled: BoolValue,
    pub source_id: StringValue,
    pub metadata: Object,
    pub settings: JsonPayload,
}

impl FromAttributes for DestinationPlan {
    fn from_attributes(r: &AttributeReader<'_>) -> Result<Self, MappingError> {
        Ok(Self {
            id: r.string("id"),
            name: r.string("name"),
            enabled: r.bool("enabled"),
            source_id: r.string("source_id"),
            metadata: r.object("metadata"),
            settings: r.json("settings"),
        })
    }
}

/// Planned `metadata` block.
#[derive(Debug, Clone, PartialEq)]
pub struct DestinationMetadataPlan {
    pub id: StringValue,
    pub slug: StringValue,
    pub name: StringValue,
    pub description: StringValue,
    pub categories: ListValue<String>,
    pub website: StringValue,
    pub logos: Object,
}

impl FromAttributes for DestinationMetadataPlan {
    fn from_attributes(r: &AttributeReader<'_>) -> Result<Self, MappingError> {
        Ok(Self {
            id: r.string("id"),
            slug: r.string("slug"),
            name: r.string("name"),
            description: r.string("description"),
            categories: r.strings("categories"),
            website: r.string("website"),
            logos: r.object("logos"),
        })
    }
}

/// Fill destination state from a remote read.
pub fn fill_destination(remote: &api::Destination) -> Result<DestinationState, MappingError> {
    let metadata = &remote.metadata;
    Ok(DestinationState {
        id: Value::known(remote.id.clone()),
        name: Value::from_option(remote.name.clone()),
        enabled: Value::known(remote.enabled),
        source_id: Value::known(remote.source_id.clone()),
        metadata: Value::known(DestinationMetadataState {
            id: Value::known(metadata.id.clone()),
            slug: Value::known(metadata.slug.clone()),
            name: Value::known(metadata.name.clone()),
            description: Value::known(metadata.description.clone()),
            categories: metadata.categories.clone(),
            website: Value::known(metadata.website.clone()),
            logos: fill_logos(metadata.logos.as_ref()),
        }),
        settings: JsonPayload::from_map(remote.settings.as_ref(), "settings")?,
    })
}

/// Build the remote destination from a plan.
pub fn destination_to_remote(
    plan: &DestinationPlan,
    ctx: &mut ConvertContext<'_>,
) -> Option<api::Destination> {
    let id = planned_id(ctx, &plan.id);
    let enabled = ctx.require("enabled", &plan.enabled);
    let source_id = ctx.require("source_id", &plan.source_id);
    let metadata = ctx.required_block("metadata", &plan.metadata, metadata_to_remote);
    let settings = ctx.json_map("settings", &plan.settings);

    Some(api::Destination {
        id,
        name: plan.name.known_or_none(),
        enabled: enabled?,
        source_id: source_id?,
        metadata: metadata?,
        settings,
    })
}

fn metadata_to_remote(
    plan: &DestinationMetadataPlan,
    ctx: &mut ConvertContext<'_>,
) -> Option<api::DestinationMetadata> {
    let id = ctx.require("id", &plan.id);
    let logos = ctx.block::<LogosPlan>("logos", &plan.logos);

    Some(api::DestinationMetadata {
        id: id?,
        slug: plan.slug.known_or_default(),
        name: plan.name.known_or_default(),
        description: plan.description.known_or_default(),
        categories: plan.categories.known_or_default(),
        website: plan.website.known_or_default(),
        logos: logos.as_ref().map(logos_to_remote),
    })
}

/// The `segment_destination` resource.
pub struct DestinationResource;

impl Resource for DestinationResource {
    const TYPE_NAME: &'static str = "segment_destination";
    const IMPORT_ID_FORMAT: &'static str = "<destination_id>";

    type Remote = api::Destination;
    type State = DestinationState;
    type Plan = DestinationPlan;

    fn schema() -> Schema {
        Schema::v0()
            .with_description("A destination receiving events from a source")
            .with_attribute("id", Attribute::computed_string())
            .with_attribute("name", Attribute::optional_string())
            .with_attribute("enabled", Attribute::required_bool())
            .with_attribute(
                "source_id",
                Attribute::required_string()
                    .with_description("The source feeding this destination")
                    .with_force_new(),
            )
            .with_attribute(
                "settings",
                Attribute::optional_json()
                    .with_description("Integration settings as a JSON object")
                    .sensitive(),
            )
            .with_block(
                "metadata",
                NestedBlock::single(
                    Block::new()
                        .with_attribute("id", Attribute::required_string().with_force_new())
                        .with_attribute("slug", Attribute::computed_string())
                        .with_attribute("name", Attribute::computed_string())
                        .with_attribute("description", Attribute::computed_string())
                        .with_attribute("categories", Attribute::computed_strings())
                        .with_attribute("website", Attribute::computed_string())
                        .with_block("logos", logos_block()),
                )
                .with_min_items(1),
            )
    }

    fn fill(remote: &api::Destination) -> Result<DestinationState, MappingError> {
        fill_destination(remote)
    }

    fn to_remote(plan: &DestinationPlan, ctx: &mut ConvertContext<'_>) -> Option<api::Destination> {
        debug!(resource = Self::TYPE_NAME, "converting plan");
        destination_to_remote(plan, ctx)
    }

    fn reconcile(prior: &DestinationState, fresh: DestinationState) -> DestinationState {
        DestinationState {
            settings: JsonPayload::reconcile(&prior.settings, fresh.settings),
            ..fresh
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Diagnostics;
    use crate::testing::{assert_error_at, assert_round_trip, plan_from_json, to_remote};
    use serde_json::json;

    fn remote_destination() -> api::Destination {
        let settings = match json!({"apiKey": "secret", "regions": ["us", "eu"]}) {
            serde_json::Value::Object(map) => map,
            _ => unreachable!(),
        };
        api::Destination {
            id: "dst_1".to_string(),
            name: None,
            enabled: false,
            source_id: "src_1".to_string(),
            metadata: api::DestinationMetadata {
                id: "cat_webhooks".to_string(),
                slug: "webhooks".to_string(),
                name: "Webhooks".to_string(),
                description: String::new(),
                categories: vec![],
                website: "https://example.com".to_string(),
                logos: None,
            },
            settings: Some(settings),
        }
    }

    #[test]
    fn test_round_trip() {
        assert_round_trip::<DestinationResource>(&remote_destination());

        let mut without_settings = remote_destination();
        without_settings.settings = None;
        assert_round_trip::<DestinationResource>(&without_settings);
    }

    #[test]
    fn test_fill() {
        let state = fill_destination(&remote_destination()).unwrap();
        assert_eq!(state.name, Value::Null);
        assert_eq!(state.enabled, Value::known(false));
        assert_eq!(state.metadata.value().logos, Value::Null);
        assert_eq!(
            state.settings.as_text(),
            Some(r#"{"apiKey":"secret","regions":["us","eu"]}"#)
        );
    }

    #[test]
    fn test_unknown_source_id_aborts() {
        let mut plan = plan_from_json::<DestinationResource>(json!({
            "enabled": true,
            "metadata": {"id": "cat_webhooks"}
        }));
        plan.source_id = Value::Unknown;
        plan.enabled = Value::Unknown;

        let mut diags = Diagnostics::new();
        let remote = DestinationResource::to_remote(&plan, &mut ConvertContext::new(&mut diags));
        assert!(remote.is_none());
        assert_eq!(diags.errors().count(), 2);
        assert_error_at(&diags, "source_id");
        assert_error_at(&diags, "enabled");
    }

    #[test]
    fn test_unknown_metadata_aborts() {
        let mut plan = plan_from_json::<DestinationResource>(json!({
            "enabled": true,
            "source_id": "src_1"
        }));
        plan.metadata = Value::Unknown;

        let mut diags = Diagnostics::new();
        let remote = DestinationResource::to_remote(&plan, &mut ConvertContext::new(&mut diags));
        assert!(remote.is_none());
        assert_error_at(&diags, "metadata");
    }

    #[test]
    fn test_null_fields_use_zero_values() {
        let plan = plan_from_json::<DestinationResource>(json!({
            "source_id": "src_1",
            "enabled": null,
            "settings": "{}"
        }));
        let remote = to_remote::<DestinationResource>(&plan).unwrap();
        assert!(!remote.enabled);
        assert_eq!(remote.metadata, api::DestinationMetadata::default());
        assert_eq!(remote.settings, Some(api::JsonMap::new()));
    }

    #[test]
    fn test_settings_must_be_an_object() {
        let plan = plan_from_json::<DestinationResource>(json!({
            "source_id": "src_1",
            "enabled": true,
            "settings": "[1, 2]"
        }));
        let mut diags = Diagnostics::new();
        let remote = DestinationResource::to_remote(&plan, &mut ConvertContext::new(&mut diags)).unwrap();
        assert_eq!(remote.settings, None);
        assert_error_at(&diags, "settings");
    }
}
