//! Destination filters.
//!
//! A filter's actions run in order, so a plan whose actions don't all
//! convert is rejected as a whole rather than sent with gaps.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{fill_each, planned_id};
use crate::api;
use crate::convert::{CollectionPolicy, ConvertContext};
use crate::dynamic::{
    AttributeReader, AttributeWriter, Attributes, Dynamic, FromAttributes, Object, ToAttributes,
};
use crate::error::MappingError;
use crate::json::JsonPayload;
use crate::numeric::widen_f32;
use crate::resource::Resource;
use crate::schema::{Attribute, Block, NestedBlock, Schema};
use crate::value::{BoolValue, Float64Value, ListValue, StringValue, Value};

/// Persisted state of a destination filter.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FilterState {
    pub id: StringValue,
    pub source_id: StringValue,
    pub destination_id: StringValue,
    pub title: StringValue,
    pub description: StringValue,
    #[serde(rename = "if")]
    pub if_expr: StringValue,
    pub enabled: BoolValue,
    pub actions: Vec<FilterActionState>,
}

/// One filter action.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FilterActionState {
    pub id: StringValue,
    #[serde(rename = "type")]
    pub action_type: StringValue,
    pub percent: Float64Value,
    pub path: StringValue,
    pub fields: JsonPayload,
}

impl ToAttributes for FilterState {
    fn to_attributes(&self) -> Attributes {
        AttributeWriter::new()
            .with("id", self.id.clone())
            .with("source_id", self.source_id.clone())
            .with("destination_id", self.destination_id.clone())
            .with("title", self.title.clone())
            .with("description", self.description.clone())
            .with("if", self.if_expr.clone())
            .with("enabled", self.enabled.clone())
            .with("actions", Dynamic::records(&self.actions))
            .finish()
    }
}

impl ToAttributes for FilterActionState {
    fn to_attributes(&self) -> Attributes {
        AttributeWriter::new()
            .with("id", self.id.clone())
            .with("type", self.action_type.clone())
            .with("percent", self.percent.clone())
            .with("path", self.path.clone())
            .with("fields", self.fields.clone())
            .finish()
    }
}

/// Planned destination filter.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterPlan {
    pub id: StringValue,
    pub source_id: StringValue,
    pub destination_id: StringValue,
    pub title: StringValue,
    pub description: StringValue,
    pub if_expr: StringValue,
    pub enabled: BoolValue,
    pub actions: ListValue<Object>,
}

impl FromAttributes for FilterPlan {
    fn from_attributes(r: &AttributeReader<'_>) -> Result<Self, MappingError> {
        Ok(Self {
            id: r.string("id"),
            source_id: r.string("source_id"),
            destination_id: r.string("destination_id"),
            title: r.string("title"),
            description: r.string("description"),
            if_expr: r.string("if"),
            enabled: r.bool("enabled"),
            actions: r.objects("actions"),
        })
    }
}

/// Planned filter action.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterActionPlan {
    pub id: StringValue,
    pub action_type: StringValue,
    pub percent: Float64Value,
    pub path: StringValue,
    pub fields: JsonPayload,
}

impl FromAttributes for FilterActionPlan {
    fn from_attributes(r: &AttributeReader<'_>) -> Result<Self, MappingError> {
        Ok(Self {
            id: r.string("id"),
            action_type: r.string("type"),
            percent: r.float64("percent"),
            path: r.string("path"),
            fields: r.json("fields"),
        })
    }
}

/// Fill filter state from a remote read.
pub fn fill_filter(remote: &api::DestinationFilter) -> Result<FilterState, MappingError> {
    Ok(FilterState {
        id: Value::known(remote.id.clone()),
        source_id: Value::known(remote.source_id.clone()),
        destination_id: Value::known(remote.destination_id.clone()),
        title: Value::known(remote.title.clone()),
        description: Value::from_option(remote.description.clone()),
        if_expr: Value::known(remote.if_expr.clone()),
        enabled: Value::known(remote.enabled),
        actions: fill_each("actions", &remote.actions, fill_action)?,
    })
}

fn fill_action(action: &api::FilterAction) -> Result<FilterActionState, MappingError> {
    Ok(FilterActionState {
        id: Value::from_option(action.id.clone()),
        action_type: Value::known(action.action_type.clone()),
        percent: Value::from_option(action.percent.map(widen_f32)),
        path: Value::from_option(action.path.clone()),
        fields: JsonPayload::from_map(action.fields.as_ref(), "fields")?,
    })
}

/// Build the remote filter from a plan.
///
/// Actions convert atomically: one bad action fails the filter, after every
/// action has been checked.
pub fn filter_to_remote(
    plan: &FilterPlan,
    ctx: &mut ConvertContext<'_>,
) -> Option<api::DestinationFilter> {
    let id = planned_id(ctx, &plan.id);
    let source_id = ctx.require("source_id", &plan.source_id);
    let destination_id = ctx.require("destination_id", &plan.destination_id);
    let title = ctx.require("title", &plan.title);
    let if_expr = ctx.require("if", &plan.if_expr);
    let enabled = ctx.require("enabled", &plan.enabled);
    let actions = ctx.list("actions", &plan.actions, CollectionPolicy::Atomic, |attrs, ctx| {
        let action: FilterActionPlan = ctx.decode(attrs)?;
        action_to_remote(&action, ctx)
    });

    Some(api::DestinationFilter {
        id,
        source_id: source_id?,
        destination_id: destination_id?,
        title: title?,
        description: plan.description.known_or_none(),
        if_expr: if_expr?,
        enabled: enabled?,
        actions: actions?,
    })
}

fn action_to_remote(plan: &FilterActionPlan, ctx: &mut ConvertContext<'_>) -> Option<api::FilterAction> {
    let action_type = ctx.require("type", &plan.action_type);
    let percent = ctx.narrow("percent", &plan.percent);
    let fields = ctx.json_map("fields", &plan.fields);

    Some(api::FilterAction {
        id: plan.id.known_or_none(),
        action_type: action_type?,
        percent,
        path: plan.path.known_or_none(),
        fields,
    })
}

/// The `segment_destination_filter` resource.
pub struct FilterResource;

impl Resource for FilterResource {
    const TYPE_NAME: &'static str = "segment_destination_filter";
    const IMPORT_ID_FORMAT: &'static str = "<source_id>:<destination_id>:<filter_id>";

    type Remote = api::DestinationFilter;
    type State = FilterState;
    type Plan = FilterPlan;

    fn schema() -> Schema {
        Schema::v0()
            .with_description("A filter applied to events before they reach a destination")
            .with_attribute("id", Attribute::computed_string())
            .with_attribute("source_id", Attribute::required_string().with_force_new())
            .with_attribute("destination_id", Attribute::required_string().with_force_new())
            .with_attribute("title", Attribute::required_string())
            .with_attribute("description", Attribute::optional_string())
            .with_attribute(
                "if",
                Attribute::required_string().with_description("FQL condition selecting the events to act on"),
            )
            .with_attribute("enabled", Attribute::required_bool())
            .with_block(
                "actions",
                NestedBlock::list(
                    Block::new()
                        .with_attribute("id", Attribute::computed_string())
                        .with_attribute(
                            "type",
                            Attribute::required_string()
                                .with_description("One of DROP, SAMPLE, ALLOW_PROPERTIES or DROP_PROPERTIES"),
                        )
                        .with_attribute(
                            "percent",
                            Attribute::optional_float64().with_description("Fraction of events kept by SAMPLE"),
                        )
                        .with_attribute("path", Attribute::optional_string())
                        .with_attribute("fields", Attribute::optional_json()),
                )
                .with_min_items(1),
            )
    }

    fn fill(remote: &api::DestinationFilter) -> Result<FilterState, MappingError> {
        fill_filter(remote)
    }

    fn to_remote(plan: &FilterPlan, ctx: &mut ConvertContext<'_>) -> Option<api::DestinationFilter> {
        debug!(resource = Self::TYPE_NAME, "converting plan");
        filter_to_remote(plan, ctx)
    }

    fn reconcile(prior: &FilterState, fresh: FilterState) -> FilterState {
        let actions = if prior.actions.len() == fresh.actions.len() {
            fresh
                .actions
                .into_iter()
                .zip(&prior.actions)
                .map(|(action, prior_action)| FilterActionState {
                    fields: JsonPayload::reconcile(&prior_action.fields, action.fields),
                    ..action
                })
                .collect()
        } else {
            fresh.actions
        };
        FilterState { actions, ..fresh }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Diagnostics;
    use crate::testing::{assert_error_at, assert_round_trip, plan_from_json, to_remote};
    use serde_json::json;

    fn remote_filter() -> api::DestinationFilter {
        api::DestinationFilter {
            id: "flt_1".to_string(),
            source_id: "src_1".to_string(),
            destination_id: "dst_1".to_string(),
            title: "Sample page views".to_string(),
            description: None,
            if_expr: "type = \"page\"".to_string(),
            enabled: true,
            actions: vec![
                api::FilterAction {
                    id: Some("act_1".to_string()),
                    action_type: "SAMPLE".to_string(),
                    percent: Some(3.14),
                    path: Some("userId".to_string()),
                    fields: None,
                },
                api::FilterAction {
                    id: None,
                    action_type: "DROP_PROPERTIES".to_string(),
                    percent: None,
                    path: None,
                    fields: Some(serde_json::Map::from_iter([(
                        "properties".to_string(),
                        json!(["email", "phone"]),
                    )])),
                },
            ],
        }
    }

    fn plan_json() -> serde_json::Value {
        json!({
            "source_id": "src_1",
            "destination_id": "dst_1",
            "title": "Filter",
            "if": "all",
            "enabled": true,
            "actions": [
                {"type": "DROP"},
                {"type": "SAMPLE", "percent": 0.1},
                {"type": "DROP_PROPERTIES", "fields": {"properties": ["email"]}}
            ]
        })
    }

    #[test]
    fn test_round_trip() {
        assert_round_trip::<FilterResource>(&remote_filter());
    }

    #[test]
    fn test_percent_widens_through_text() {
        let state = fill_filter(&remote_filter()).unwrap();
        assert_eq!(state.actions[0].percent, Value::known(3.14));
        assert_eq!(state.actions[1].percent, Value::Null);

        let plan = FilterResource::to_plan(&state).unwrap();
        let remote = to_remote::<FilterResource>(&plan).unwrap();
        assert_eq!(remote.actions[0].percent, Some(3.14_f32));
    }

    #[test]
    fn test_to_remote() {
        let remote = to_remote::<FilterResource>(&plan_from_json::<FilterResource>(plan_json())).unwrap();
        assert_eq!(remote.if_expr, "all");
        assert_eq!(remote.id, "");
        assert_eq!(remote.actions.len(), 3);
        assert_eq!(remote.actions[1].percent, Some(0.1_f32));
        assert_eq!(remote.actions[2].fields.as_ref().unwrap()["properties"], json!(["email"]));
    }

    #[test]
    fn test_actions_are_atomic() {
        let mut plan = plan_json();
        plan["actions"][0] = json!({"type": 5});
        plan["actions"][2] = json!({"type": "SAMPLE", "percent": 1e300});
        let plan = plan_from_json::<FilterResource>(plan);

        let mut diags = Diagnostics::new();
        let remote = FilterResource::to_remote(&plan, &mut ConvertContext::new(&mut diags));
        assert!(remote.is_none());
        assert_eq!(diags.errors().count(), 2);
        assert_error_at(&diags, "actions.0.type");
        assert_error_at(&diags, "actions.2.percent");
    }

    #[test]
    fn test_unknown_actions_abort() {
        let mut plan = plan_from_json::<FilterResource>(plan_json());
        plan.actions = Value::Unknown;

        let mut diags = Diagnostics::new();
        assert!(FilterResource::to_remote(&plan, &mut ConvertContext::new(&mut diags)).is_none());
        assert_error_at(&diags, "actions");
    }

    #[test]
    fn test_reconcile_action_fields() {
        let fresh = fill_filter(&remote_filter()).unwrap();
        let mut prior = fresh.clone();
        prior.actions[1].fields =
            JsonPayload::from(Value::known(r#"{ "properties": ["email", "phone"] }"#.to_string()));

        let reconciled = FilterResource::reconcile(&prior, fresh.clone());
        assert_eq!(reconciled.actions[1].fields, prior.actions[1].fields);
        assert_eq!(reconciled.actions[0], fresh.actions[0]);
    }

    #[test]
    fn test_state_uses_wire_names() {
        let state = fill_filter(&remote_filter()).unwrap();
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["if"], "type = \"page\"");
        assert_eq!(json["actions"][0]["type"], "SAMPLE");
    }
}
