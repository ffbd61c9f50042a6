//! Remote wire model.
//!
//! These records mirror the remote service's published schema. They are the
//! external contract of the mapping layer: remote reads arrive in these
//! shapes and remote writes are built in them. Conventions:
//!
//! - `Option<T>` is a field the service may omit.
//! - `Option<Map>` is an unstructured settings object; `None` and an empty
//!   map mean different things to the service.
//! - [`Nullable<T>`] is a field that can be absent, explicitly `null`, or set.
//! - `f32` fields are the service's lower-precision numerics.

use serde::de::{Deserialize, Deserializer};
use serde::ser::{Serialize, Serializer};
use serde_json::Map;

use crate::value::Value;

/// An unstructured JSON object.
pub type JsonMap = Map<String, serde_json::Value>;

/// A wire field that distinguishes "not sent" from "sent as null".
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Nullable<T> {
    /// The field is absent from the message.
    #[default]
    Unset,
    /// The field is present and `null`.
    Null,
    /// The field is present with a value.
    Value(T),
}

impl<T> Nullable<T> {
    /// Whether the field is absent.
    pub fn is_unset(&self) -> bool {
        matches!(self, Self::Unset)
    }

    /// Read the field into a tri-state value. Unset and null both read as null.
    pub fn into_value(self) -> Value<T> {
        match self {
            Self::Value(v) => Value::Known(v),
            Self::Unset | Self::Null => Value::Null,
        }
    }
}

impl<T: Serialize> Serialize for Nullable<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Value(v) => v.serialize(serializer),
            Self::Unset | Self::Null => serializer.serialize_none(),
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Nullable<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Option::<T>::deserialize(deserializer)?.map_or(Self::Null, Self::Value))
    }
}

/// A key/value label.
#[derive(Debug, Clone, PartialEq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Label {
    pub key: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Catalog logos attached to integration metadata.
#[derive(Debug, Clone, PartialEq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Logos {
    pub default: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mark: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
}

/// Catalog metadata for a source integration.
#[derive(Debug, Clone, PartialEq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceMetadata {
    pub id: String,
    pub slug: String,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub categories: Vec<String>,
    pub is_cloud_event_source: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logos: Option<Logos>,
}

/// A source as returned by the remote service.
#[derive(Debug, Clone, PartialEq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Source {
    pub id: String,
    pub slug: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub enabled: bool,
    pub workspace_id: String,
    #[serde(default)]
    pub write_keys: Vec<String>,
    pub metadata: SourceMetadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<JsonMap>,
    #[serde(default)]
    pub labels: Vec<Label>,
}

/// Schema validation settings for `track` calls.
#[derive(Debug, Clone, PartialEq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_unplanned_events: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_unplanned_event_properties: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_event_on_violations: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_properties_on_violations: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub common_event_on_violations: Option<String>,
}

/// Schema validation settings for `identify` calls.
#[derive(Debug, Clone, PartialEq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentifySettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_traits_on_violations: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_unplanned_traits: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub common_event_on_violations: Option<String>,
}

/// Schema validation settings for `group` calls.
#[derive(Debug, Clone, PartialEq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_traits_on_violations: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_unplanned_traits: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub common_event_on_violations: Option<String>,
}

/// A source's schema validation settings, fetched separately from the source.
#[derive(Debug, Clone, PartialEq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaSettings {
    pub source_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub track: Option<TrackSettings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identify: Option<IdentifySettings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<GroupSettings>,
    #[serde(default, skip_serializing_if = "Nullable::is_unset")]
    pub forwarding_violations_to: Nullable<String>,
    #[serde(default, skip_serializing_if = "Nullable::is_unset")]
    pub forwarding_blocked_events_to: Nullable<String>,
}

/// A source together with its separately fetched schema settings.
#[derive(Debug, Clone, PartialEq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceWithSettings {
    pub source: Source,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_settings: Option<SchemaSettings>,
}

/// Catalog metadata for a destination integration.
#[derive(Debug, Clone, PartialEq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DestinationMetadata {
    pub id: String,
    pub slug: String,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub website: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logos: Option<Logos>,
}

/// A destination.
#[derive(Debug, Clone, PartialEq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Destination {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub enabled: bool,
    pub source_id: String,
    pub metadata: DestinationMetadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<JsonMap>,
}

/// One action applied by a destination filter.
#[derive(Debug, Clone, PartialEq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterAction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub action_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percent: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<JsonMap>,
}

/// A destination filter.
#[derive(Debug, Clone, PartialEq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DestinationFilter {
    pub id: String,
    pub source_id: String,
    pub destination_id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "if")]
    pub if_expr: String,
    pub enabled: bool,
    #[serde(default)]
    pub actions: Vec<FilterAction>,
}

/// Catalog metadata for a warehouse integration.
#[derive(Debug, Clone, PartialEq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WarehouseMetadata {
    pub id: String,
    pub slug: String,
    pub name: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logos: Option<Logos>,
}

/// A warehouse.
#[derive(Debug, Clone, PartialEq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Warehouse {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub enabled: bool,
    pub workspace_id: String,
    pub metadata: WarehouseMetadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<JsonMap>,
}

/// A tracking plan rule.
#[derive(Debug, Clone, PartialEq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    #[serde(rename = "type")]
    pub rule_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json_schema: Option<serde_json::Value>,
    pub version: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deprecated_at: Option<String>,
}

/// A tracking plan.
#[derive(Debug, Clone, PartialEq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingPlan {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub plan_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub rules: Vec<Rule>,
}

/// A resource a permission applies to.
#[derive(Debug, Clone, PartialEq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionResource {
    pub id: String,
    #[serde(rename = "type")]
    pub resource_type: String,
    #[serde(default)]
    pub labels: Vec<Label>,
}

/// A role grant held by a user.
#[derive(Debug, Clone, PartialEq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Permission {
    pub role_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role_name: Option<String>,
    #[serde(default)]
    pub resources: Vec<PermissionResource>,
    #[serde(default)]
    pub labels: Vec<Label>,
}

/// A workspace user.
#[derive(Debug, Clone, PartialEq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub permissions: Vec<Permission>,
}

/// A workspace role.
#[derive(Debug, Clone, PartialEq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A setting declared by a function.
#[derive(Debug, Clone, PartialEq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionSetting {
    pub name: String,
    pub label: String,
    pub description: String,
    #[serde(rename = "type")]
    pub setting_type: String,
    pub required: bool,
    pub sensitive: bool,
}

/// A custom function.
#[derive(Debug, Clone, PartialEq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Function {
    pub id: String,
    pub resource_type: String,
    pub code: String,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Nullable::is_unset")]
    pub description: Nullable<String>,
    #[serde(default, skip_serializing_if = "Nullable::is_unset")]
    pub logo_url: Nullable<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview_webhook_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog_id: Option<String>,
    #[serde(default)]
    pub settings: Vec<FunctionSetting>,
}
