//! Custom functions.
//!
//! `description` and `logo_url` are nullable on the wire: sending `null`
//! clears them, leaving them out keeps whatever the service has.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{fill_each, planned_id};
use crate::api;
use crate::convert::{CollectionPolicy, ConvertContext};
use crate::dynamic::{
    AttributeReader, AttributeWriter, Attributes, Dynamic, FromAttributes, Object, ToAttributes,
};
use crate::error::MappingError;
use crate::resource::Resource;
use crate::schema::{Attribute, AttributeFlags, AttributeType, Block, NestedBlock, Schema};
use crate::value::{BoolValue, ListValue, StringValue, Value};

/// Persisted state of a function.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FunctionState {
    pub id: StringValue,
    pub resource_type: StringValue,
    pub code: StringValue,
    pub display_name: StringValue,
    pub description: StringValue,
    pub logo_url: StringValue,
    pub preview_webhook_url: StringValue,
    pub catalog_id: StringValue,
    pub settings: Vec<FunctionSettingState>,
}

/// A setting the function declares.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FunctionSettingState {
    pub name: StringValue,
    pub label: StringValue,
    pub description: StringValue,
    #[serde(rename = "type")]
    pub setting_type: StringValue,
    pub required: BoolValue,
    pub sensitive: BoolValue,
}

impl ToAttributes for FunctionState {
    fn to_attributes(&self) -> Attributes {
        AttributeWriter::new()
            .with("id", self.id.clone())
            .with("resource_type", self.resource_type.clone())
            .with("code", self.code.clone())
            .with("display_name", self.display_name.clone())
            .with("description", self.description.clone())
            .with("logo_url", self.logo_url.clone())
            .with("preview_webhook_url", self.preview_webhook_url.clone())
            .with("catalog_id", self.catalog_id.clone())
            .with("settings", Dynamic::records(&self.settings))
            .finish()
    }
}

impl ToAttributes for FunctionSettingState {
    fn to_attributes(&self) -> Attributes {
        AttributeWriter::new()
            .with("name", self.name.clone())
            .with("label", self.label.clone())
            .with("description", self.description.clone())
            .with("type", self.setting_type.clone())
            .with("required", self.required.clone())
            .with("sensitive", self.sensitive.clone())
            .finish()
    }
}

/// Planned function.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionPlan {
    pub id: StringValue,
    pub resource_type: StringValue,
    pub code: StringValue,
    pub display_name: StringValue,
    pub description: StringValue,
    pub logo_url: StringValue,
    pub preview_webhook_url: StringValue,
    pub catalog_id: StringValue,
    pub settings: ListValue<Object>,
}

impl FromAttributes for FunctionPlan {
    fn from_attributes(r: &AttributeReader<'_>) -> Result<Self, MappingError> {
        Ok(Self {
            id: r.string("id"),
            resource_type: r.string("resource_type"),
            code: r.string("code"),
            display_name: r.string("display_name"),
            description: r.string("description"),
            logo_url: r.string("logo_url"),
            preview_webhook_url: r.string("preview_webhook_url"),
            catalog_id: r.string("catalog_id"),
            settings: r.objects("settings"),
        })
    }
}

/// Planned function setting.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionSettingPlan {
    pub name: StringValue,
    pub label: StringValue,
    pub description: StringValue,
    pub setting_type: StringValue,
    pub required: BoolValue,
    pub sensitive: BoolValue,
}

impl FromAttributes for FunctionSettingPlan {
    fn from_attributes(r: &AttributeReader<'_>) -> Result<Self, MappingError> {
        Ok(Self {
            name: r.string("name"),
            label: r.string("label"),
            description: r.string("description"),
            setting_type: r.string("type"),
            required: r.bool("required"),
            sensitive: r.bool("sensitive"),
        })
    }
}

/// Fill function state from a remote read.
pub fn fill_function(remote: &api::Function) -> Result<FunctionState, MappingError> {
    Ok(FunctionState {
        id: Value::known(remote.id.clone()),
        resource_type: Value::known(remote.resource_type.clone()),
        code: Value::known(remote.code.clone()),
        display_name: Value::known(remote.display_name.clone()),
        description: remote.description.clone().into_value(),
        logo_url: remote.logo_url.clone().into_value(),
        preview_webhook_url: Value::from_option(remote.preview_webhook_url.clone()),
        catalog_id: Value::from_option(remote.catalog_id.clone()),
        settings: fill_each("settings", &remote.settings, |setting| {
            Ok(FunctionSettingState {
                name: Value::known(setting.name.clone()),
                label: Value::known(setting.label.clone()),
                description: Value::known(setting.description.clone()),
                setting_type: Value::known(setting.setting_type.clone()),
                required: Value::known(setting.required),
                sensitive: Value::known(setting.sensitive),
            })
        })?,
    })
}

/// Build the remote function from a plan.
///
/// Settings convert atomically since the service replaces the whole list.
pub fn function_to_remote(plan: &FunctionPlan, ctx: &mut ConvertContext<'_>) -> Option<api::Function> {
    let id = planned_id(ctx, &plan.id);
    let resource_type = ctx.require("resource_type", &plan.resource_type);
    let code = ctx.require("code", &plan.code);
    let display_name = ctx.require("display_name", &plan.display_name);
    let settings = ctx.list("settings", &plan.settings, CollectionPolicy::Atomic, |attrs, ctx| {
        let setting: FunctionSettingPlan = ctx.decode(attrs)?;
        let name = ctx.require("name", &setting.name);
        let label = ctx.require("label", &setting.label);
        let setting_type = ctx.require("type", &setting.setting_type);
        Some(api::FunctionSetting {
            name: name?,
            label: label?,
            description: setting.description.known_or_default(),
            setting_type: setting_type?,
            required: setting.required.known_or_default(),
            sensitive: setting.sensitive.known_or_default(),
        })
    });

    Some(api::Function {
        id,
        resource_type: resource_type?,
        code: code?,
        display_name: display_name?,
        description: ctx.nullable(&plan.description),
        logo_url: ctx.nullable(&plan.logo_url),
        preview_webhook_url: plan.preview_webhook_url.known_or_none(),
        catalog_id: plan.catalog_id.known_or_none(),
        settings: settings?,
    })
}

/// The `segment_function` resource.
pub struct FunctionResource;

impl Resource for FunctionResource {
    const TYPE_NAME: &'static str = "segment_function";
    const IMPORT_ID_FORMAT: &'static str = "<function_id>";

    type Remote = api::Function;
    type State = FunctionState;
    type Plan = FunctionPlan;

    fn schema() -> Schema {
        Schema::v0()
            .with_description("A custom source or destination function")
            .with_attribute("id", Attribute::computed_string())
            .with_attribute(
                "resource_type",
                Attribute::required_string()
                    .with_description("SOURCE, DESTINATION or INSERT_DESTINATION")
                    .with_force_new(),
            )
            .with_attribute("code", Attribute::required_string())
            .with_attribute("display_name", Attribute::required_string())
            .with_attribute("description", Attribute::optional_string())
            .with_attribute("logo_url", Attribute::optional_string())
            .with_attribute("preview_webhook_url", Attribute::computed_string())
            .with_attribute("catalog_id", Attribute::computed_string())
            .with_block(
                "settings",
                NestedBlock::list(
                    Block::new()
                        .with_attribute("name", Attribute::required_string())
                        .with_attribute("label", Attribute::required_string())
                        .with_attribute("description", Attribute::optional_string())
                        .with_attribute("type", Attribute::required_string())
                        .with_attribute(
                            "required",
                            Attribute::new(AttributeType::Bool, AttributeFlags::optional_computed()),
                        )
                        .with_attribute(
                            "sensitive",
                            Attribute::new(AttributeType::Bool, AttributeFlags::optional_computed()),
                        ),
                ),
            )
    }

    fn fill(remote: &api::Function) -> Result<FunctionState, MappingError> {
        fill_function(remote)
    }

    fn to_remote(plan: &FunctionPlan, ctx: &mut ConvertContext<'_>) -> Option<api::Function> {
        debug!(resource = Self::TYPE_NAME, "converting plan");
        function_to_remote(plan, ctx)
    }
}
