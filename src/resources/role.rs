//! Workspace roles. Roles are read-only: they are looked up, never written.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::api;
use crate::convert::ConvertContext;
use crate::dynamic::{AttributeReader, AttributeWriter, Attributes, FromAttributes, ToAttributes};
use crate::error::MappingError;
use crate::resource::Resource;
use crate::schema::{Attribute, Schema};
use crate::value::{StringValue, Value};

/// Persisted state of a role.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RoleState {
    pub id: StringValue,
    pub name: StringValue,
    pub description: StringValue,
}

impl ToAttributes for RoleState {
    fn to_attributes(&self) -> Attributes {
        AttributeWriter::new()
            .with("id", self.id.clone())
            .with("name", self.name.clone())
            .with("description", self.description.clone())
            .finish()
    }
}

/// Planned role lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct RolePlan {
    pub id: StringValue,
    pub name: StringValue,
    pub description: StringValue,
}

impl FromAttributes for RolePlan {
    fn from_attributes(r: &AttributeReader<'_>) -> Result<Self, MappingError> {
        Ok(Self {
            id: r.string("id"),
            name: r.string("name"),
            description: r.string("description"),
        })
    }
}

/// Fill role state from a remote read.
pub fn fill_role(remote: &api::Role) -> Result<RoleState, MappingError> {
    Ok(RoleState {
        id: Value::known(remote.id.clone()),
        name: Value::known(remote.name.clone()),
        description: Value::from_option(remote.description.clone()),
    })
}

/// Identify the role to look up. Only the id is needed.
pub fn role_to_remote(plan: &RolePlan, ctx: &mut ConvertContext<'_>) -> Option<api::Role> {
    let id = ctx.require("id", &plan.id)?;
    Some(api::Role {
        id,
        name: plan.name.known_or_default(),
        description: plan.description.known_or_none(),
    })
}

/// The `segment_role` resource.
pub struct RoleResource;

impl Resource for RoleResource {
    const TYPE_NAME: &'static str = "segment_role";
    const IMPORT_ID_FORMAT: &'static str = "<role_id>";

    type Remote = api::Role;
    type State = RoleState;
    type Plan = RolePlan;

    fn schema() -> Schema {
        Schema::v0()
            .with_description("A workspace role, read-only")
            .with_attribute("id", Attribute::required_string())
            .with_attribute("name", Attribute::computed_string())
            .with_attribute("description", Attribute::computed_string())
    }

    fn fill(remote: &api::Role) -> Result<RoleState, MappingError> {
        fill_role(remote)
    }

    fn to_remote(plan: &RolePlan, ctx: &mut ConvertContext<'_>) -> Option<api::Role> {
        debug!(resource = Self::TYPE_NAME, "converting plan");
        role_to_remote(plan, ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{assert_no_errors, assert_round_trip, attributes, plan_from_json, to_remote};
    use serde_json::json;

    #[test]
    fn test_round_trip() {
        assert_round_trip::<RoleResource>(&api::Role {
            id: "role_1".to_string(),
            name: "Source Admin".to_string(),
            description: Some("Manages sources".to_string()),
        });
    }

    #[test]
    fn test_lookup_by_id() {
        let role = to_remote::<RoleResource>(&plan_from_json::<RoleResource>(json!({"id": "role_1"}))).unwrap();
        assert_eq!(role.id, "role_1");
        assert_eq!(role.name, "");
        assert_eq!(role.description, None);
    }

    #[test]
    fn test_unknown_id_is_incomplete() {
        let plan = RolePlan {
            id: Value::Unknown,
            name: Value::Null,
            description: Value::Null,
        };
        let err = to_remote::<RoleResource>(&plan).unwrap_err();
        assert!(err.to_string().contains("(at id)"));
    }

    #[test]
    fn test_computed_attributes_are_not_validated() {
        assert_no_errors(RoleResource::validate(&attributes(json!({"id": "role_1", "name": 5}))));
    }
}
