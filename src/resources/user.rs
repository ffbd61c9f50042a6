//! Workspace users and their permissions.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::label::{fill_label, labels_to_remote, LabelState};
use super::{planned_id, reconcile_unordered};
use crate::api;
use crate::convert::{CollectionPolicy, ConvertContext};
use crate::dynamic::{
    AttributeReader, AttributeWriter, Attributes, Dynamic, FromAttributes, Object, ToAttributes,
};
use crate::error::MappingError;
use crate::resource::Resource;
use crate::schema::{labels_block, Attribute, Block, NestedBlock, Schema};
use crate::value::{ListValue, StringValue, Value};

/// Persisted state of a user.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct UserState {
    pub id: StringValue,
    pub name: StringValue,
    pub email: StringValue,
    pub permissions: Vec<PermissionState>,
}

/// A role granted to the user over a set of resources.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PermissionState {
    pub role_id: StringValue,
    pub role_name: StringValue,
    pub resources: Vec<PermissionResourceState>,
    pub labels: Vec<LabelState>,
}

/// A resource a permission applies to.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PermissionResourceState {
    pub id: StringValue,
    #[serde(rename = "type")]
    pub resource_type: StringValue,
    pub labels: Vec<LabelState>,
}

impl ToAttributes for UserState {
    fn to_attributes(&self) -> Attributes {
        AttributeWriter::new()
            .with("id", self.id.clone())
            .with("name", self.name.clone())
            .with("email", self.email.clone())
            .with("permissions", Dynamic::record_set(&self.permissions))
            .finish()
    }
}

impl ToAttributes for PermissionState {
    fn to_attributes(&self) -> Attributes {
        AttributeWriter::new()
            .with("role_id", self.role_id.clone())
            .with("role_name", self.role_name.clone())
            .with("resources", Dynamic::record_set(&self.resources))
            .with("labels", Dynamic::record_set(&self.labels))
            .finish()
    }
}

impl ToAttributes for PermissionResourceState {
    fn to_attributes(&self) -> Attributes {
        AttributeWriter::new()
            .with("id", self.id.clone())
            .with("type", self.resource_type.clone())
            .with("labels", Dynamic::record_set(&self.labels))
            .finish()
    }
}

/// Planned user.
#[derive(Debug, Clone, PartialEq)]
pub struct UserPlan {
    pub id: StringValue,
    pub name: StringValue,
    pub email: StringValue,
    pub permissions: ListValue<Object>,
}

impl FromAttributes for UserPlan {
    fn from_attributes(r: &AttributeReader<'_>) -> Result<Self, MappingError> {
        Ok(Self {
            id: r.string("id"),
            name: r.string("name"),
            email: r.string("email"),
            permissions: r.objects("permissions"),
        })
    }
}

/// Planned permission.
#[derive(Debug, Clone, PartialEq)]
pub struct PermissionPlan {
    pub role_id: StringValue,
    pub role_name: StringValue,
    pub resources: ListValue<Object>,
    pub labels: ListValue<Object>,
}

impl FromAttributes for PermissionPlan {
    fn from_attributes(r: &AttributeReader<'_>) -> Result<Self, MappingError> {
        Ok(Self {
            role_id: r.string("role_id"),
            role_name: r.string("role_name"),
            resources: r.objects("resources"),
            labels: r.objects("labels"),
        })
    }
}

/// Planned permission resource.
#[derive(Debug, Clone, PartialEq)]
pub struct PermissionResourcePlan {
    pub id: StringValue,
    pub resource_type: StringValue,
    pub labels: ListValue<Object>,
}

impl FromAttributes for PermissionResourcePlan {
    fn from_attributes(r: &AttributeReader<'_>) -> Result<Self, MappingError> {
        Ok(Self {
            id: r.string("id"),
            resource_type: r.string("type"),
            labels: r.objects("labels"),
        })
    }
}

/// Fill user state from a remote read.
pub fn fill_user(remote: &api::User) -> Result<UserState, MappingError> {
    Ok(UserState {
        id: Value::known(remote.id.clone()),
        name: Value::known(remote.name.clone()),
        email: Value::known(remote.email.clone()),
        permissions: remote.permissions.iter().map(fill_permission).collect(),
    })
}

fn fill_permission(permission: &api::Permission) -> PermissionState {
    PermissionState {
        role_id: Value::known(permission.role_id.clone()),
        role_name: Value::from_option(permission.role_name.clone()),
        resources: permission
            .resources
            .iter()
            .map(|resource| PermissionResourceState {
                id: Value::known(resource.id.clone()),
                resource_type: Value::known(resource.resource_type.clone()),
                labels: resource.labels.iter().map(fill_label).collect(),
            })
            .collect(),
        labels: permission.labels.iter().map(fill_label).collect(),
    }
}

/// Build the remote user from a plan.
///
/// Invalid permissions are skipped. A permission holding an invalid
/// resource or label is skipped along with it.
pub fn user_to_remote(plan: &UserPlan, ctx: &mut ConvertContext<'_>) -> Option<api::User> {
    let id = planned_id(ctx, &plan.id);
    let name = plan.name.known_or_default();
    let email = ctx.require("email", &plan.email);
    let permissions = ctx.list(
        "permissions",
        &plan.permissions,
        CollectionPolicy::SkipInvalid,
        |attrs, ctx| {
            let permission: PermissionPlan = ctx.decode(attrs)?;
            permission_to_remote(&permission, ctx)
        },
    );

    Some(api::User {
        id,
        name,
        email: email?,
        permissions: permissions?,
    })
}

fn permission_to_remote(plan: &PermissionPlan, ctx: &mut ConvertContext<'_>) -> Option<api::Permission> {
    let role_id = ctx.require("role_id", &plan.role_id);
    let resources = ctx.list(
        "resources",
        &plan.resources,
        CollectionPolicy::SkipInvalid,
        |attrs, ctx| {
            let resource: PermissionResourcePlan = ctx.decode(attrs)?;
            let id = ctx.require("id", &resource.id);
            let resource_type = ctx.require("type", &resource.resource_type);
            let labels = labels_to_remote("labels", &resource.labels, ctx);
            Some(api::PermissionResource {
                id: id?,
                resource_type: resource_type?,
                labels: labels?,
            })
        },
    );
    let labels = labels_to_remote("labels", &plan.labels, ctx);

    Some(api::Permission {
        role_id: role_id?,
        role_name: plan.role_name.known_or_none(),
        resources: resources?,
        labels: labels?,
    })
}

/// The `segment_user` resource.
pub struct UserResource;

impl Resource for UserResource {
    const TYPE_NAME: &'static str = "segment_user";
    const IMPORT_ID_FORMAT: &'static str = "<user_id>";

    type Remote = api::User;
    type State = UserState;
    type Plan = UserPlan;

    fn schema() -> Schema {
        Schema::v0()
            .with_description("A workspace user and the roles granted to them")
            .with_attribute("id", Attribute::computed_string())
            .with_attribute("name", Attribute::computed_string())
            .with_attribute(
                "email",
                Attribute::required_string()
                    .with_description("The address the invitation is sent to")
                    .with_force_new(),
            )
            .with_block(
                "permissions",
                NestedBlock::set(
                    Block::new()
                        .with_attribute("role_id", Attribute::required_string())
                        .with_attribute("role_name", Attribute::computed_string())
                        .with_block(
                            "resources",
                            NestedBlock::set(
                                Block::new()
                                    .with_attribute("id", Attribute::required_string())
                                    .with_attribute(
                                        "type",
                                        Attribute::required_string().with_description("WORKSPACE or SPACE"),
                                    )
                                    .with_block("labels", labels_block()),
                            ),
                        )
                        .with_block("labels", labels_block()),
                ),
            )
    }

    fn fill(remote: &api::User) -> Result<UserState, MappingError> {
        fill_user(remote)
    }

    fn to_remote(plan: &UserPlan, ctx: &mut ConvertContext<'_>) -> Option<api::User> {
        debug!(resource = Self::TYPE_NAME, "converting plan");
        user_to_remote(plan, ctx)
    }

    fn reconcile(prior: &UserState, fresh: UserState) -> UserState {
        UserState {
            permissions: reconcile_unordered(&prior.permissions, fresh.permissions),
            ..fresh
        }
    }
}
