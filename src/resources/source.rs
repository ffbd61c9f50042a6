//! Event sources and their schema settings.
//!
//! The remote service keeps a source's schema settings behind a separate
//! endpoint, so the remote shape here is the composite
//! [`api::SourceWithSettings`]. A source without schema settings reads as a
//! null `schema_settings` block.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::label::{fill_label, labels_to_remote, LabelState};
use super::{fill_logos, logos_to_remote, planned_id, reconcile_unordered, LogosPlan, LogosState};
use crate::api;
use crate::convert::ConvertContext;
use crate::dynamic::{
    AttributeReader, AttributeWriter, Attributes, Dynamic, FromAttributes, Object, ToAttributes,
};
use crate::error::MappingError;
use crate::json::JsonPayload;
use crate::resource::Resource;
use crate::schema::{labels_block, logos_block, Attribute, Block, NestedBlock, Schema};
use crate::value::{BoolValue, ListValue, StringValue, Value};

/// Persisted state of a source.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SourceState {
    pub id: StringValue,
    pub slug: StringValue,
    pub name: StringValue,
    pub enabled: BoolValue,
    pub workspace_id: StringValue,
    pub write_keys: Vec<String>,
    pub metadata: Value<SourceMetadataState>,
    pub settings: JsonPayload,
    pub labels: Vec<LabelState>,
    pub schema_settings: Value<SchemaSettingsState>,
}

/// Catalog metadata of the source's integration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SourceMetadataState {
    pub id: StringValue,
    pub slug: StringValue,
    pub name: StringValue,
    pub description: StringValue,
    pub categories: Vec<String>,
    pub is_cloud_event_source: BoolValue,
    pub logos: Value<LogosState>,
}

/// How tracked events are checked against the connected tracking plan.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SchemaSettingsState {
    pub track: Value<TrackState>,
    pub identify: Value<TraitsState>,
    pub group: Value<TraitsState>,
    pub forwarding_violations_to: StringValue,
    pub forwarding_blocked_events_to: StringValue,
}

/// Settings for `track` calls.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TrackState {
    pub allow_unplanned_events: BoolValue,
    pub allow_unplanned_event_properties: BoolValue,
    pub allow_event_on_violations: BoolValue,
    pub allow_properties_on_violations: BoolValue,
    pub common_event_on_violations: StringValue,
}

/// Settings for `identify` and `group` calls, which share one shape.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TraitsState {
    pub allow_traits_on_violations: BoolValue,
    pub allow_unplanned_traits: BoolValue,
    pub common_event_on_violations: StringValue,
}

impl ToAttributes for SourceState {
    fn to_attributes(&self) -> Attributes {
        AttributeWriter::new()
            .with("id", self.id.clone())
            .with("slug", self.slug.clone())
            .with("name", self.name.clone())
            .with("enabled", self.enabled.clone())
            .with("workspace_id", self.workspace_id.clone())
            .with("write_keys", self.write_keys.clone())
            .with("metadata", Dynamic::optional_record(&self.metadata))
            .with("settings", self.settings.clone())
            .with("labels", Dynamic::record_set(&self.labels))
            .with("schema_settings", Dynamic::optional_record(&self.schema_settings))
            .finish()
    }
}

impl ToAttributes for SourceMetadataState {
    fn to_attributes(&self) -> Attributes {
        AttributeWriter::new()
            .with("id", self.id.clone())
            .with("slug", self.slug.clone())
            .with("name", self.name.clone())
            .with("description", self.description.clone())
            .with("categories", self.categories.clone())
            .with("is_cloud_event_source", self.is_cloud_event_source.clone())
            .with("logos", Dynamic::optional_record(&self.logos))
            .finish()
    }
}

impl ToAttributes for SchemaSettingsState {
    fn to_attributes(&self) -> Attributes {
        AttributeWriter::new()
            .with("track", Dynamic::optional_record(&self.track))
            .with("identify", Dynamic::optional_record(&self.identify))
            .with("group", Dynamic::optional_record(&self.group))
            .with("forwarding_violations_to", self.forwarding_violations_to.clone())
            .with("forwarding_blocked_events_to", self.forwarding_blocked_events_to.clone())
            .finish()
    }
}

impl ToAttributes for TrackState {
    fn to_attributes(&self) -> Attributes {
        AttributeWriter::new()
            .with("allow_unplanned_events", self.allow_unplanned_events.clone())
            .with("allow_unplanned_event_properties", self.allow_unplanned_event_properties.clone())
            .with("allow_event_on_violations", self.allow_event_on_violations.clone())
            .with("allow_properties_on_violations", self.allow_properties_on_violations.clone())
            .with("common_event_on_violations", self.common_event_on_violations.clone())
            .finish()
    }
}

impl ToAttributes for TraitsState {
    fn to_attributes(&self) -> Attributes {
        AttributeWriter::new()
            .with("allow_traits_on_violations", self.allow_traits_on_violations.clone())
            .with("allow_unplanned_traits", self.allow_unplanned_traits.clone())
            .with("common_event_on_violations", self.common_event_on_violations.clone())
            .finish()
    }
}

/// Planned source. Nested blocks stay undecoded until conversion.
#[derive(Debug, Clone, PartialEq)]
pub struct SourcePlan {
    pub id: StringValue,
    pub slug: StringValue,
    pub name: StringValue,
    pub enabled: BoolValue,
    pub workspace_id: StringValue,
    pub write_keys: ListValue<String>,
    pub metadata: Object,
    pub settings: JsonPayload,
    pub labels: ListValue<Object>,
    pub schema_settings: Object,
}

impl FromAttributes for SourcePlan {
    fn from_attributes(r: &AttributeReader<'_>) -> Result<Self, MappingError> {
        Ok(Self {
            id: r.string("id"),
            slug: r.string("slug"),
            name: r.string("name"),
            enabled: r.bool("enabled"),
            workspace_id: r.string("workspace_id"),
            write_keys: r.strings("write_keys"),
            metadata: r.object("metadata"),
            settings: r.json("settings"),
            labels: r.objects("labels"),
            schema_settings: r.object("schema_settings"),
        })
    }
}

/// Planned `metadata` block.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceMetadataPlan {
    pub id: StringValue,
    pub slug: StringValue,
    pub name: StringValue,
    pub description: StringValue,
    pub categories: ListValue<String>,
    pub is_cloud_event_source: BoolValue,
    pub logos: Object,
}

impl FromAttributes for SourceMetadataPlan {
    fn from_attributes(r: &AttributeReader<'_>) -> Result<Self, MappingError> {
        Ok(Self {
            id: r.string("id"),
            slug: r.string("slug"),
            name: r.string("name"),
            description: r.string("description"),
            categories: r.strings("categories"),
            is_cloud_event_source: r.bool("is_cloud_event_source"),
            logos: r.object("logos"),
        })
    }
}

/// Planned `schema_settings` block.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaSettingsPlan {
    pub track: Object,
    pub identify: Object,
    pub group: Object,
    pub forwarding_violations_to: StringValue,
    pub forwarding_blocked_events_to: StringValue,
}

impl FromAttributes for SchemaSettingsPlan {
    fn from_attributes(r: &AttributeReader<'_>) -> Result<Self, MappingError> {
        Ok(Self {
            track: r.object("track"),
            identify: r.object("identify"),
            group: r.object("group"),
            forwarding_violations_to: r.string("forwarding_violations_to"),
            forwarding_blocked_events_to: r.string("forwarding_blocked_events_to"),
        })
    }
}

/// Planned `track` block.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackPlan {
    pub allow_unplanned_events: BoolValue,
    pub allow_unplanned_event_properties: BoolValue,
    pub allow_event_on_violations: BoolValue,
    pub allow_properties_on_violations: BoolValue,
    pub common_event_on_violations: StringValue,
}

impl FromAttributes for TrackPlan {
    fn from_attributes(r: &AttributeReader<'_>) -> Result<Self, MappingError> {
        Ok(Self {
            allow_unplanned_events: r.bool("allow_unplanned_events"),
            allow_unplanned_event_properties: r.bool("allow_unplanned_event_properties"),
            allow_event_on_violations: r.bool("allow_event_on_violations"),
            allow_properties_on_violations: r.bool("allow_properties_on_violations"),
            common_event_on_violations: r.string("common_event_on_violations"),
        })
    }
}

/// Planned `identify` or `group` block.
#[derive(Debug, Clone, PartialEq)]
pub struct TraitsPlan {
    pub allow_traits_on_violations: BoolValue,
    pub allow_unplanned_traits: BoolValue,
    pub common_event_on_violations: StringValue,
}

impl FromAttributes for TraitsPlan {
    fn from_attributes(r: &AttributeReader<'_>) -> Result<Self, MappingError> {
        Ok(Self {
            allow_traits_on_violations: r.bool("allow_traits_on_violations"),
            allow_unplanned_traits: r.bool("allow_unplanned_traits"),
            common_event_on_violations: r.string("common_event_on_violations"),
        })
    }
}

/// Fill source state from a remote read.
///
/// Fails only if the settings payload can't be encoded.
pub fn fill_source(remote: &api::SourceWithSettings) -> Result<SourceState, MappingError> {
    let source = &remote.source;
    Ok(SourceState {
        id: Value::known(source.id.clone()),
        slug: Value::known(source.slug.clone()),
        name: Value::from_option(source.name.clone()),
        enabled: Value::known(source.enabled),
        workspace_id: Value::known(source.workspace_id.clone()),
        write_keys: source.write_keys.clone(),
        metadata: Value::known(fill_metadata(&source.metadata)),
        settings: JsonPayload::from_map(source.settings.as_ref(), "settings")?,
        labels: source.labels.iter().map(fill_label).collect(),
        schema_settings: Value::from_option(remote.schema_settings.as_ref().map(fill_schema_settings)),
    })
}

fn fill_metadata(metadata: &api::SourceMetadata) -> SourceMetadataState {
    SourceMetadataState {
        id: Value::known(metadata.id.clone()),
        slug: Value::known(metadata.slug.clone()),
        name: Value::known(metadata.name.clone()),
        description: Value::known(metadata.description.clone()),
        categories: metadata.categories.clone(),
        is_cloud_event_source: Value::known(metadata.is_cloud_event_source),
        logos: fill_logos(metadata.logos.as_ref()),
    }
}

fn fill_schema_settings(settings: &api::SchemaSettings) -> SchemaSettingsState {
    SchemaSettingsState {
        track: Value::from_option(settings.track.as_ref().map(|t| TrackState {
            allow_unplanned_events: Value::from_option(t.allow_unplanned_events),
            allow_unplanned_event_properties: Value::from_option(t.allow_unplanned_event_properties),
            allow_event_on_violations: Value::from_option(t.allow_event_on_violations),
            allow_properties_on_violations: Value::from_option(t.allow_properties_on_violations),
            common_event_on_violations: Value::from_option(t.common_event_on_violations.clone()),
        })),
        identify: Value::from_option(settings.identify.as_ref().map(|i| TraitsState {
            allow_traits_on_violations: Value::from_option(i.allow_traits_on_violations),
            allow_unplanned_traits: Value::from_option(i.allow_unplanned_traits),
            common_event_on_violations: Value::from_option(i.common_event_on_violations.clone()),
        })),
        group: Value::from_option(settings.group.as_ref().map(|g| TraitsState {
            allow_traits_on_violations: Value::from_option(g.allow_traits_on_violations),
            allow_unplanned_traits: Value::from_option(g.allow_unplanned_traits),
            common_event_on_violations: Value::from_option(g.common_event_on_violations.clone()),
        })),
        forwarding_violations_to: settings.forwarding_violations_to.clone().into_value(),
        forwarding_blocked_events_to: settings.forwarding_blocked_events_to.clone().into_value(),
    }
}

/// Build the remote source (and its schema settings) from a plan.
pub fn source_to_remote(
    plan: &SourcePlan,
    ctx: &mut ConvertContext<'_>,
) -> Option<api::SourceWithSettings> {
    let id = planned_id(ctx, &plan.id);
    let slug = ctx.require("slug", &plan.slug);
    let enabled = ctx.require("enabled", &plan.enabled);
    let metadata = ctx.required_block("metadata", &plan.metadata, metadata_to_remote);
    let settings = ctx.json_map("settings", &plan.settings);
    let labels = labels_to_remote("labels", &plan.labels, ctx);
    let schema_settings = ctx
        .block::<SchemaSettingsPlan>("schema_settings", &plan.schema_settings)
        .map(|s| schema_settings_to_remote(&s, &id, &mut ctx.scoped("schema_settings")));

    let source = api::Source {
        id,
        slug: slug?,
        name: plan.name.known_or_none(),
        enabled: enabled?,
        workspace_id: plan.workspace_id.known_or_default(),
        write_keys: plan.write_keys.known_or_default(),
        metadata: metadata?,
        settings,
        labels: labels?,
    };
    Some(api::SourceWithSettings {
        source,
        schema_settings,
    })
}

fn metadata_to_remote(
    plan: &SourceMetadataPlan,
    ctx: &mut ConvertContext<'_>,
) -> Option<api::SourceMetadata> {
    let id = ctx.require("id", &plan.id);
    let logos = ctx.block::<LogosPlan>("logos", &plan.logos);

    Some(api::SourceMetadata {
        id: id?,
        slug: plan.slug.known_or_default(),
        name: plan.name.known_or_default(),
        description: plan.description.known_or_default(),
        categories: plan.categories.known_or_default(),
        is_cloud_event_source: plan.is_cloud_event_source.known_or_default(),
        logos: logos.as_ref().map(logos_to_remote),
    })
}

fn schema_settings_to_remote(
    plan: &SchemaSettingsPlan,
    source_id: &str,
    ctx: &mut ConvertContext<'_>,
) -> api::SchemaSettings {
    let track = ctx.block::<TrackPlan>("track", &plan.track).map(|t| api::TrackSettings {
        allow_unplanned_events: t.allow_unplanned_events.known_or_none(),
        allow_unplanned_event_properties: t.allow_unplanned_event_properties.known_or_none(),
        allow_event_on_violations: t.allow_event_on_violations.known_or_none(),
        allow_properties_on_violations: t.allow_properties_on_violations.known_or_none(),
        common_event_on_violations: t.common_event_on_violations.known_or_none(),
    });
    let identify = ctx.block::<TraitsPlan>("identify", &plan.identify).map(|i| api::IdentifySettings {
        allow_traits_on_violations: i.allow_traits_on_violations.known_or_none(),
        allow_unplanned_traits: i.allow_unplanned_traits.known_or_none(),
        common_event_on_violations: i.common_event_on_violations.known_or_none(),
    });
    let group = ctx.block::<TraitsPlan>("group", &plan.group).map(|g| api::GroupSettings {
        allow_traits_on_violations: g.allow_traits_on_violations.known_or_none(),
        allow_unplanned_traits: g.allow_unplanned_traits.known_or_none(),
        common_event_on_violations: g.common_event_on_violations.known_or_none(),
    });

    api::SchemaSettings {
        source_id: source_id.to_string(),
        track,
        identify,
        group,
        forwarding_violations_to: ctx.nullable(&plan.forwarding_violations_to),
        forwarding_blocked_events_to: ctx.nullable(&plan.forwarding_blocked_events_to),
    }
}

fn traits_block(description: &str) -> NestedBlock {
    NestedBlock::single(
        Block::new()
            .with_description(description)
            .with_attribute("allow_traits_on_violations", Attribute::optional_bool())
            .with_attribute("allow_unplanned_traits", Attribute::optional_bool())
            .with_attribute("common_event_on_violations", Attribute::optional_string()),
    )
}

/// The `segment_source` resource.
pub struct SourceResource;

impl Resource for SourceResource {
    const TYPE_NAME: &'static str = "segment_source";
    const IMPORT_ID_FORMAT: &'static str = "<source_id>";

    type Remote = api::SourceWithSettings;
    type State = SourceState;
    type Plan = SourcePlan;

    fn schema() -> Schema {
        Schema::v0()
            .with_description("A source of events sent to the workspace")
            .with_attribute("id", Attribute::computed_string())
            .with_attribute(
                "slug",
                Attribute::required_string()
                    .with_description("The source's slug, unique within the workspace")
                    .with_force_new(),
            )
            .with_attribute("name", Attribute::optional_string())
            .with_attribute("enabled", Attribute::required_bool())
            .with_attribute("workspace_id", Attribute::computed_string())
            .with_attribute("write_keys", Attribute::computed_strings().sensitive())
            .with_attribute(
                "settings",
                Attribute::optional_json().with_description("Integration settings as a JSON object"),
            )
            .with_block(
                "metadata",
                NestedBlock::single(
                    Block::new()
                        .with_attribute(
                            "id",
                            Attribute::required_string()
                                .with_description("The catalog id of the source integration")
                                .with_force_new(),
                        )
                        .with_attribute("slug", Attribute::computed_string())
                        .with_attribute("name", Attribute::computed_string())
                        .with_attribute("description", Attribute::computed_string())
                        .with_attribute("categories", Attribute::computed_strings())
                        .with_attribute("is_cloud_event_source", Attribute::computed_bool())
                        .with_block("logos", logos_block()),
                )
                .with_min_items(1),
            )
            .with_block("labels", labels_block())
            .with_block(
                "schema_settings",
                NestedBlock::single(
                    Block::new()
                        .with_block(
                            "track",
                            NestedBlock::single(
                                Block::new()
                                    .with_attribute("allow_unplanned_events", Attribute::optional_bool())
                                    .with_attribute(
                                        "allow_unplanned_event_properties",
                                        Attribute::optional_bool(),
                                    )
                                    .with_attribute("allow_event_on_violations", Attribute::optional_bool())
                                    .with_attribute(
                                        "allow_properties_on_violations",
                                        Attribute::optional_bool(),
                                    )
                                    .with_attribute(
                                        "common_event_on_violations",
                                        Attribute::optional_string(),
                                    ),
                            ),
                        )
                        .with_block("identify", traits_block("Settings for identify calls"))
                        .with_block("group", traits_block("Settings for group calls"))
                        .with_attribute("forwarding_violations_to", Attribute::optional_string())
                        .with_attribute("forwarding_blocked_events_to", Attribute::optional_string()),
                ),
            )
    }

    fn fill(remote: &api::SourceWithSettings) -> Result<SourceState, MappingError> {
        fill_source(remote)
    }

    fn to_remote(plan: &SourcePlan, ctx: &mut ConvertContext<'_>) -> Option<api::SourceWithSettings> {
        debug!(resource = Self::TYPE_NAME, "converting plan");
        source_to_remote(plan, ctx)
    }

    fn reconcile(prior: &SourceState, fresh: SourceState) -> SourceState {
        SourceState {
            settings: JsonPayload::reconcile(&prior.settings, fresh.settings),
            labels: reconcile_unordered(&prior.labels, fresh.labels),
            ..fresh
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Nullable;
    use crate::diagnostics::Diagnostics;
    use crate::testing::{
        assert_error_at, assert_error_contains, assert_no_errors, assert_round_trip, attributes,
        plan_from_json, to_remote,
    };
    use serde_json::json;

    fn settings(value: serde_json::Value) -> api::JsonMap {
        match value {
            serde_json::Value::Object(map) => map,
            other => panic!("expected object, got {}", other),
        }
    }

    fn remote_source() -> api::SourceWithSettings {
        api::SourceWithSettings {
            source: api::Source {
                id: "src_1".to_string(),
                slug: "web".to_string(),
                name: Some("Web".to_string()),
                enabled: true,
                workspace_id: "ws_1".to_string(),
                write_keys: vec!["wk_1".to_string()],
                metadata: api::SourceMetadata {
                    id: "cat_js".to_string(),
                    slug: "javascript".to_string(),
                    name: "Javascript".to_string(),
                    description: "Browser tracking".to_string(),
                    categories: vec!["Website".to_string()],
                    is_cloud_event_source: false,
                    logos: Some(api::Logos {
                        default: "https://cdn/js.svg".to_string(),
                        mark: None,
                        alt: None,
                    }),
                },
                settings: Some(settings(json!({"trackNamedPages": true, "sampleRate": 0.5}))),
                labels: vec![
                    api::Label {
                        key: "env".to_string(),
                        value: "prod".to_string(),
                        description: None,
                    },
                    api::Label {
                        key: "team".to_string(),
                        value: "growth".to_string(),
                        description: Some("Owning team".to_string()),
                    },
                ],
            },
            schema_settings: Some(api::SchemaSettings {
                source_id: "src_1".to_string(),
                track: Some(api::TrackSettings {
                    allow_unplanned_events: Some(false),
                    common_event_on_violations: Some("ALLOW".to_string()),
                    ..Default::default()
                }),
                identify: None,
                group: Some(api::GroupSettings {
                    allow_traits_on_violations: Some(true),
                    ..Default::default()
                }),
                forwarding_violations_to: Nullable::Value("src_violations".to_string()),
                forwarding_blocked_events_to: Nullable::Null,
            }),
        }
    }

    fn minimal_plan() -> serde_json::Value {
        json!({
            "slug": "web",
            "enabled": true,
            "metadata": {"id": "cat_js"}
        })
    }

    #[test]
    fn test_round_trip() {
        assert_round_trip::<SourceResource>(&remote_source());

        let mut bare = remote_source();
        bare.schema_settings = None;
        bare.source.settings = None;
        bare.source.labels.clear();
        assert_round_trip::<SourceResource>(&bare);
    }

    #[test]
    fn test_fill() {
        let state = fill_source(&remote_source()).unwrap();
        assert_eq!(state.slug, Value::known("web".to_string()));
        assert_eq!(
            state.settings.as_text(),
            Some(r#"{"sampleRate":0.5,"trackNamedPages":true}"#)
        );
        assert_eq!(state.labels.len(), 2);

        let schema_settings = state.schema_settings.value();
        assert_eq!(schema_settings.identify, Value::Null);
        assert_eq!(
            schema_settings.track.value().allow_unplanned_events,
            Value::known(false)
        );
        assert_eq!(schema_settings.track.value().allow_event_on_violations, Value::Null);
        assert_eq!(schema_settings.forwarding_blocked_events_to, Value::Null);
    }

    #[test]
    fn test_null_and_empty_settings_stay_distinct() {
        let mut remote = remote_source();
        remote.source.settings = None;
        let null_state = fill_source(&remote).unwrap();
        assert!(null_state.settings.is_null());

        remote.source.settings = Some(api::JsonMap::new());
        let empty_state = fill_source(&remote).unwrap();
        assert_eq!(empty_state.settings.as_text(), Some("{}"));

        let null_plan = SourceResource::to_plan(&null_state).unwrap();
        let empty_plan = SourceResource::to_plan(&empty_state).unwrap();
        let null_remote = to_remote::<SourceResource>(&null_plan).unwrap();
        let empty_remote = to_remote::<SourceResource>(&empty_plan).unwrap();
        assert_eq!(null_remote.source.settings, None);
        assert_eq!(empty_remote.source.settings, Some(api::JsonMap::new()));
    }

    #[test]
    fn test_fill_rejects_runaway_settings() {
        let mut nested = json!(1);
        for _ in 0..200 {
            nested = json!({"next": nested});
        }
        let mut remote = remote_source();
        remote.source.settings = Some(settings(nested));
        let err = fill_source(&remote).unwrap_err();
        assert!(matches!(err, MappingError::Encoding { .. }));
        assert_eq!(err.path(), "settings");
    }

    #[test]
    fn test_unknown_slug_aborts() {
        let mut plan = plan_from_json::<SourceResource>(minimal_plan());
        plan.slug = Value::Unknown;

        let mut diags = Diagnostics::new();
        let remote = SourceResource::to_remote(&plan, &mut ConvertContext::new(&mut diags));
        assert!(remote.is_none());
        assert_error_at(&diags, "slug");
        assert_error_contains(&diags, "not yet known");
    }

    #[test]
    fn test_unknown_metadata_id_aborts() {
        let mut attrs = attributes(minimal_plan());
        attrs.insert(
            "metadata".to_string(),
            Dynamic::Object(Attributes::from([("id".to_string(), Dynamic::Unknown)])),
        );
        let plan = SourcePlan::decode(&attrs).unwrap();

        let mut diags = Diagnostics::new();
        assert!(SourceResource::to_remote(&plan, &mut ConvertContext::new(&mut diags)).is_none());
        assert_error_at(&diags, "metadata.id");
    }

    #[test]
    fn test_unknown_metadata_aborts() {
        let mut attrs = attributes(minimal_plan());
        attrs.insert("metadata".to_string(), Dynamic::Unknown);
        let plan = SourcePlan::decode(&attrs).unwrap();

        let mut diags = Diagnostics::new();
        assert!(SourceResource::to_remote(&plan, &mut ConvertContext::new(&mut diags)).is_none());
        assert_error_at(&diags, "metadata");
        assert_error_contains(&diags, "not yet known");
    }

    #[test]
    fn test_computed_values_may_be_unknown() {
        let mut attrs = attributes(minimal_plan());
        attrs.insert("id".to_string(), Dynamic::Unknown);
        attrs.insert("write_keys".to_string(), Dynamic::Unknown);
        attrs.insert("workspace_id".to_string(), Dynamic::Unknown);
        attrs.insert("settings".to_string(), Dynamic::Unknown);
        let plan = SourcePlan::decode(&attrs).unwrap();

        let remote = to_remote::<SourceResource>(&plan).unwrap();
        assert_eq!(remote.source.id, "");
        assert!(remote.source.write_keys.is_empty());
        assert_eq!(remote.source.settings, None);
        assert_eq!(remote.schema_settings, None);
    }

    #[test]
    fn test_bad_schema_settings_block_keeps_siblings() {
        let mut plan_json = minimal_plan();
        plan_json["schema_settings"] = json!({
            "track": {"allow_unplanned_events": "sometimes", "common_event_on_violations": 5},
            "group": {"allow_unplanned_traits": true},
            "forwarding_violations_to": null
        });
        let plan = plan_from_json::<SourceResource>(plan_json);

        let mut diags = Diagnostics::new();
        let remote = SourceResource::to_remote(&plan, &mut ConvertContext::new(&mut diags)).unwrap();
        assert_error_at(&diags, "schema_settings.track.allow_unplanned_events");
        assert_error_at(&diags, "schema_settings.track.common_event_on_violations");
        assert_eq!(diags.errors().count(), 2);

        let schema_settings = remote.schema_settings.unwrap();
        assert_eq!(schema_settings.track, None);
        assert_eq!(schema_settings.group.unwrap().allow_unplanned_traits, Some(true));
        assert_eq!(schema_settings.forwarding_violations_to, Nullable::Null);
        assert_eq!(schema_settings.forwarding_blocked_events_to, Nullable::Null);
    }

    #[test]
    fn test_unknown_forwarding_target_is_unset() {
        let mut plan_json = minimal_plan();
        plan_json["schema_settings"] = json!({});
        let mut attrs = attributes(plan_json);
        if let Some(Dynamic::Object(settings)) = attrs.get_mut("schema_settings") {
            settings.insert("forwarding_violations_to".to_string(), Dynamic::Unknown);
        }
        let plan = SourcePlan::decode(&attrs).unwrap();

        let remote = to_remote::<SourceResource>(&plan).unwrap();
        let schema_settings = remote.schema_settings.unwrap();
        assert!(schema_settings.forwarding_violations_to.is_unset());
        assert_eq!(schema_settings.source_id, "");
    }

    #[test]
    fn test_settings_inline_object_or_text() {
        let mut text_plan = minimal_plan();
        text_plan["settings"] = json!("{\"b\": 1, \"a\": [1, 2]}");
        let mut inline_plan = minimal_plan();
        inline_plan["settings"] = json!({"a": [1, 2], "b": 1});

        let a = to_remote::<SourceResource>(&plan_from_json::<SourceResource>(text_plan)).unwrap();
        let b = to_remote::<SourceResource>(&plan_from_json::<SourceResource>(inline_plan)).unwrap();
        assert_eq!(a.source.settings, b.source.settings);
    }

    #[test]
    fn test_reconcile_keeps_prior_settings_text_and_label_order() {
        let fresh = fill_source(&remote_source()).unwrap();
        let mut prior = fresh.clone();
        prior.settings = JsonPayload::from(Value::known(
            r#"{"trackNamedPages": true, "sampleRate": 0.5}"#.to_string(),
        ));
        prior.labels.reverse();

        let reconciled = SourceResource::reconcile(&prior, fresh.clone());
        assert_eq!(reconciled.settings, prior.settings);
        assert_eq!(reconciled.labels, prior.labels);
        assert_eq!(reconciled.slug, fresh.slug);

        let mut changed = fresh.clone();
        changed.settings = JsonPayload::from_text(r#"{"trackNamedPages": false}"#, "settings").unwrap();
        let reconciled = SourceResource::reconcile(&prior, changed.clone());
        assert_eq!(reconciled.settings, changed.settings);
    }

    #[test]
    fn test_validate() {
        assert_no_errors(SourceResource::validate(&attributes(minimal_plan())));

        let diagnostics = SourceResource::validate(&attributes(json!({"enabled": true})));
        assert_error_at(&diagnostics, "slug");
        assert_error_contains(&diagnostics, "Missing required block 'metadata'");
    }

    #[test]
    fn test_state_serialization() {
        let state = fill_source(&remote_source()).unwrap();
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["slug"], "web");
        assert_eq!(json["schema_settings"]["identify"], serde_json::Value::Null);

        let back: SourceState = serde_json::from_value(json).unwrap();
        assert_eq!(back, state);
    }
}
