//! Warehouses.

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
use crate::value::{BoolValue, StringValue, Value};

/// Persisted state of a warehouse.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WarehouseState {
    pub id: StringValue,
    pub name: StringValue,
    pub enabled: BoolValue,
    pub workspace_id: StringValue,
    pub metadata: Value<WarehouseMetadataState>,
    pub settings: JsonPayload,
}

/// Catalog metadata of the warehouse's integration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WarehouseMetadataState {
    pub id: StringValue,
    pub slug: StringValue,
    pub name: StringValue,
    pub description: StringValue,
    pub logos: Value<LogosState>,
}

impl ToAttributes for WarehouseState {
    fn to_attributes(&self) -> Attributes {
        AttributeWriter::new()
            .with("id", self.id.clone())
            .with("name", self.name.clone())
            .with("enabled", self.enabled.clone())
            .with("workspace_id", self.workspace_id.clone())
            .with("metadata", Dynamic::optional_record(&self.metadata))
            .with("settings", self.settings.clone())
            .finish()
    }
}

impl ToAttributes for WarehouseMetadataState {
    fn to_attributes(&self) -> Attributes {
        AttributeWriter::new()
            .with("id", self.id.clone())
            .with("slug", self.slug.clone())
            .with("name", self.name.clone())
            .with("description", self.description.clone())
            .with("logos", Dynamic::optional_record(&self.logos))
            .finish()
    }
}

/// Planned warehouse.
#[derive(Debug, Clone, PartialEq)]
pub struct WarehousePlan {
    pub id: StringValue,
    pub name: StringValue,
    pub enabled: BoolValue,
    pub workspace_id: StringValue,
    pub metadata: Object,
    pub settings: JsonPayload,
}

impl FromAttributes for WarehousePlan {
    fn from_attributes(r: &AttributeReader<'_>) -> Result<Self, MappingError> {
        Ok(Self {
            id: r.string("id"),
            name: r.string("name"),
            enabled: r.bool("enabled"),
            workspace_id: r.string("workspace_id"),
            metadata: r.object("metadata"),
            settings: r.json("settings"),
        })
    }
}

/// Planned `metadata` block.
#[derive(Debug, Clone, PartialEq)]
pub struct WarehouseMetadataPlan {
    pub id: StringValue,
    pub slug: StringValue,
    pub name: StringValue,
    pub description: StringValue,
    pub logos: Object,
}

impl FromAttributes for WarehouseMetadataPlan {
    fn from_attributes(r: &AttributeReader<'_>) -> Result<Self, MappingError> {
        Ok(Self {
            id: r.string("id"),
            slug: r.string("slug"),
            name: r.string("name"),
            description: r.string("description"),
            logos: r.object("logos"),
        })
    }
}

/// Fill warehouse state from a remote read.
pub fn fill_warehouse(remote: &api::Warehouse) -> Result<WarehouseState, MappingError> {
    let metadata = &remote.metadata;
    Ok(WarehouseState {
        id: Value::known(remote.id.clone()),
        name: Value::from_option(remote.name.clone()),
        enabled: Value::known(remote.enabled),
        workspace_id: Value::known(remote.workspace_id.clone()),
        metadata: Value::known(WarehouseMetadataState {
            id: Value::known(metadata.id.clone()),
            slug: Value::known(metadata.slug.clone()),
            name: Value::known(metadata.name.clone()),
            description: Value::known(metadata.description.clone()),
            logos: fill_logos(metadata.logos.as_ref()),
        }),
        settings: JsonPayload::from_map(remote.settings.as_ref(), "settings")?,
    })
}

/// Build the remote warehouse from a plan.
pub fn warehouse_to_remote(
    plan: &WarehousePlan,
    ctx: &mut ConvertContext<'_>,
) -> Option<api::Warehouse> {
    let id = planned_id(ctx, &plan.id);
    let enabled = ctx.require("enabled", &plan.enabled);
    let metadata = ctx.required_block("metadata", &plan.metadata, metadata_to_remote);
    let settings = ctx.json_map("settings", &plan.settings);

    Some(api::Warehouse {
        id,
        name: plan.name.known_or_none(),
        enabled: enabled?,
        workspace_id: plan.workspace_id.known_or_default(),
        metadata: metadata?,
        settings,
    })
}

fn metadata_to_remote(
    plan: &WarehouseMetadataPlan,
    ctx: &mut ConvertContext<'_>,
) -> Option<api::WarehouseMetadata> {
    let id = ctx.require("id", &plan.id);
    let logos = ctx.block::<LogosPlan>("logos", &plan.logos);

    Some(api::WarehouseMetadata {
        id: id?,
        slug: plan.slug.known_or_default(),
        name: plan.name.known_or_default(),
        description: plan.description.known_or_default(),
        logos: logos.as_ref().map(logos_to_remote),
    })
}

/// The `segment_warehouse` resource.
pub struct WarehouseResource;

impl Resource for WarehouseResource {
    const TYPE_NAME: &'static str = "segment_warehouse";
    const IMPORT_ID_FORMAT: &'static str = "<warehouse_id>";

    type Remote = api::Warehouse;
    type State = WarehouseState;
    type Plan = WarehousePlan;

    fn schema() -> Schema {
        Schema::v0()
            .with_description("A data warehouse connected to the workspace")
            .with_attribute("id", Attribute::computed_string())
            .with_attribute("name", Attribute::optional_string())
            .with_attribute("enabled", Attribute::required_bool())
            .with_attribute("workspace_id", Attribute::computed_string())
            .with_attribute(
                "settings",
                Attribute::optional_json()
                    .with_description("Connection settings as a JSON object")
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
                        .with_block("logos", logos_block()),
                )
                .with_min_items(1),
            )
    }

    fn fill(remote: &api::Warehouse) -> Result<WarehouseState, MappingError> {
        fill_warehouse(remote)
    }

    fn to_remote(plan: &WarehousePlan, ctx: &mut ConvertContext<'_>) -> Option<api::Warehouse> {
        debug!(resource = Self::TYPE_NAME, "converting plan");
        warehouse_to_remote(plan, ctx)
    }

    fn reconcile(prior: &WarehouseState, fresh: WarehouseState) -> WarehouseState {
        WarehouseState {
            settings: JsonPayload::reconcile(&prior.settings, fresh.settings),
            ..fresh
        }
    }
}
