//! Tracking plans and their rules.
//!
//! Rules are independent of one another: a rule that fails to convert is
//! reported and left out, and the rest of the plan is still written.

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
use crate::value::{Float64Value, ListValue, StringValue, Value};

/// Persisted state of a tracking plan.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TrackingPlanState {
    pub id: StringValue,
    pub name: StringValue,
    pub slug: StringValue,
    pub description: StringValue,
    #[serde(rename = "type")]
    pub plan_type: StringValue,
    pub created_at: StringValue,
    pub updated_at: StringValue,
    pub rules: Vec<RuleState>,
}

/// One rule of a tracking plan.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RuleState {
    #[serde(rename = "type")]
    pub rule_type: StringValue,
    pub key: StringValue,
    pub json_schema: JsonPayload,
    pub version: Float64Value,
    pub created_at: StringValue,
    pub updated_at: StringValue,
    pub deprecated_at: StringValue,
}

impl ToAttributes for TrackingPlanState {
    fn to_attributes(&self) -> Attributes {
        AttributeWriter::new()
            .with("id", self.id.clone())
            .with("name", self.name.clone())
            .with("slug", self.slug.clone())
            .with("description", self.description.clone())
            .with("type", self.plan_type.clone())
            .with("created_at", self.created_at.clone())
            .with("updated_at", self.updated_at.clone())
            .with("rules", Dynamic::records(&self.rules))
            .finish()
    }
}

impl ToAttributes for RuleState {
    fn to_attributes(&self) -> Attributes {
        AttributeWriter::new()
            .with("type", self.rule_type.clone())
            .with("key", self.key.clone())
            .with("json_schema", self.json_schema.clone())
            .with("version", self.version.clone())
            .with("created_at", self.created_at.clone())
            .with("updated_at", self.updated_at.clone())
            .with("deprecated_at", self.deprecated_at.clone())
            .finish()
    }
}

/// Planned tracking plan.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackingPlanPlan {
    pub id: StringValue,
    pub name: StringValue,
    pub slug: StringValue,
    pub description: StringValue,
    pub plan_type: StringValue,
    pub created_at: StringValue,
    pub updated_at: StringValue,
    pub rules: ListValue<Object>,
}

impl FromAttributes for TrackingPlanPlan {
    fn from_attributes(r: &AttributeReader<'_>) -> Result<Self, MappingError> {
        Ok(Self {
            id: r.string("id"),
            name: r.string("name"),
            slug: r.string("slug"),
            description: r.string("description"),
            plan_type: r.string("type"),
            created_at: r.string("created_at"),
            updated_at: r.string("updated_at"),
            rules: r.objects("rules"),
        })
    }
}

/// Planned rule.
#[derive(Debug, Clone, PartialEq)]
pub struct RulePlan {
    pub rule_type: StringValue,
    pub key: StringValue,
    pub json_schema: JsonPayload,
    pub version: Float64Value,
    pub created_at: StringValue,
    pub updated_at: StringValue,
    pub deprecated_at: StringValue,
}

impl FromAttributes for RulePlan {
    fn from_attributes(r: &AttributeReader<'_>) -> Result<Self, MappingError> {
        Ok(Self {
            rule_type: r.string("type"),
            key: r.string("key"),
            json_schema: r.json("json_schema"),
            version: r.float64("version"),
            created_at: r.string("created_at"),
            updated_at: r.string("updated_at"),
            deprecated_at: r.string("deprecated_at"),
        })
    }
}

/// Fill tracking plan state from a remote read.
pub fn fill_tracking_plan(remote: &api::TrackingPlan) -> Result<TrackingPlanState, MappingError> {
    Ok(TrackingPlanState {
        id: Value::known(remote.id.clone()),
        name: Value::known(remote.name.clone()),
        slug: Value::from_option(remote.slug.clone()),
        description: Value::from_option(remote.description.clone()),
        plan_type: Value::known(remote.plan_type.clone()),
        created_at: Value::from_option(remote.created_at.clone()),
        updated_at: Value::from_option(remote.updated_at.clone()),
        rules: fill_each("rules", &remote.rules, fill_rule)?,
    })
}

fn fill_rule(rule: &api::Rule) -> Result<RuleState, MappingError> {
    let json_schema = match &rule.json_schema {
        Some(schema) => JsonPayload::from_raw(schema, "json_schema")?,
        None => JsonPayload::null(),
    };
    Ok(RuleState {
        rule_type: Value::known(rule.rule_type.clone()),
        key: Value::from_option(rule.key.clone()),
        json_schema,
        version: Value::known(widen_f32(rule.version)),
        created_at: Value::from_option(rule.created_at.clone()),
        updated_at: Value::from_option(rule.updated_at.clone()),
        deprecated_at: Value::from_option(rule.deprecated_at.clone()),
    })
}

/// Build the remote tracking plan from a plan.
///
/// Rules that fail are skipped with a diagnostic at `rules.<index>`.
pub fn tracking_plan_to_remote(
    plan: &TrackingPlanPlan,
    ctx: &mut ConvertContext<'_>,
) -> Option<api::TrackingPlan> {
    let id = planned_id(ctx, &plan.id);
    let name = ctx.require("name", &plan.name);
    let plan_type = ctx.require("type", &plan.plan_type);
    let rules = ctx.list("rules", &plan.rules, CollectionPolicy::SkipInvalid, |attrs, ctx| {
        let rule: RulePlan = ctx.decode(attrs)?;
        rule_to_remote(&rule, ctx)
    });

    Some(api::TrackingPlan {
        id,
        name: name?,
        slug: plan.slug.known_or_none(),
        description: plan.description.known_or_none(),
        plan_type: plan_type?,
        created_at: plan.created_at.known_or_none(),
        updated_at: plan.updated_at.known_or_none(),
        rules: rules?,
    })
}

fn rule_to_remote(plan: &RulePlan, ctx: &mut ConvertContext<'_>) -> Option<api::Rule> {
    let rule_type = ctx.require("type", &plan.rule_type);
    let json_schema = ctx.json_value("json_schema", &plan.json_schema);
    let version = ctx
        .require("version", &plan.version)
        .and_then(|version| ctx.narrow("version", &Value::known(version)));

    Some(api::Rule {
        rule_type: rule_type?,
        key: plan.key.known_or_none(),
        json_schema,
        version: version?,
        created_at: plan.created_at.known_or_none(),
        updated_at: plan.updated_at.known_or_none(),
        deprecated_at: plan.deprecated_at.known_or_none(),
    })
}

/// The `segment_tracking_plan` resource.
pub struct TrackingPlanResource;

impl Resource for TrackingPlanResource {
    const TYPE_NAME: &'static str = "segment_tracking_plan";
    const IMPORT_ID_FORMAT: &'static str = "<tracking_plan_id>";

    type Remote = api::TrackingPlan;
    type State = TrackingPlanState;
    type Plan = TrackingPlanPlan;

    fn schema() -> Schema {
        Schema::v0()
            .with_description("A tracking plan describing the events a source may send")
            .with_attribute("id", Attribute::computed_string())
            .with_attribute("name", Attribute::required_string())
            .with_attribute("slug", Attribute::computed_string())
            .with_attribute("description", Attribute::optional_string())
            .with_attribute(
                "type",
                Attribute::required_string()
                    .with_description("LIVE, RULE_BASED or ENGAGE")
                    .with_force_new(),
            )
            .with_attribute("created_at", Attribute::computed_string())
            .with_attribute("updated_at", Attribute::computed_string())
            .with_block(
                "rules",
                NestedBlock::list(
                    Block::new()
                        .with_attribute("type", Attribute::required_string())
                        .with_attribute("key", Attribute::optional_string())
                        .with_attribute(
                            "json_schema",
                            Attribute::optional_json().with_description("JSON Schema the event must satisfy"),
                        )
                        .with_attribute("version", Attribute::required_float64())
                        .with_attribute("created_at", Attribute::computed_string())
                        .with_attribute("updated_at", Attribute::computed_string())
                        .with_attribute("deprecated_at", Attribute::computed_string()),
                ),
            )
    }

    fn fill(remote: &api::TrackingPlan) -> Result<TrackingPlanState, MappingError> {
        fill_tracking_plan(remote)
    }

    fn to_remote(plan: &TrackingPlanPlan, ctx: &mut ConvertContext<'_>) -> Option<api::TrackingPlan> {
        debug!(resource = Self::TYPE_NAME, "converting plan");
        tracking_plan_to_remote(plan, ctx)
    }

    fn reconcile(prior: &TrackingPlanState, fresh: TrackingPlanState) -> TrackingPlanState {
        let rules = fresh
            .rules
            .into_iter()
            .map(|rule| {
                let matching = prior
                    .rules
                    .iter()
                    .find(|p| p.rule_type == rule.rule_type && p.key == rule.key);
                match matching {
                    Some(prior_rule) => RuleState {
                        json_schema: JsonPayload::reconcile(&prior_rule.json_schema, rule.json_schema),
                        ..rule
                    },
                    None => rule,
                }
            })
            .collect();
        TrackingPlanState { rules, ..fresh }
    }
}
