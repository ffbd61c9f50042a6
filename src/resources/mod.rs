//! State and plan shapes for every resource kind, with their converters.
//!
//! Each module follows the same layout: an `XState` built by `fill_x` from a
//! remote read, an `XPlan` read from configuration and turned into a remote
//! write by `x_to_remote`, the kind's [`Schema`](crate::schema::Schema), and
//! an `XResource` implementing [`Resource`](crate::resource::Resource).

pub mod destination;
pub mod filter;
pub mod function;
pub mod label;
pub mod role;
pub mod source;
pub mod tracking_plan;
pub mod user;
pub mod warehouse;

pub use destination::DestinationResource;
pub use filter::FilterResource;
pub use function::FunctionResource;
pub use label::LabelResource;
pub use role::RoleResource;
pub use source::SourceResource;
pub use tracking_plan::TrackingPlanResource;
pub use user::UserResource;
pub use warehouse::WarehouseResource;

use serde::{Deserialize, Serialize};

use crate::api;
use crate::convert::ConvertContext;
use crate::dynamic::{index_path, AttributeReader, AttributeWriter, Attributes, FromAttributes, ToAttributes};
use crate::error::MappingError;
use crate::value::{StringValue, Value};

/// Catalog logos, shared by sources, destinations and warehouses.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LogosState {
    pub default: StringValue,
    pub mark: StringValue,
    pub alt: StringValue,
}

impl ToAttributes for LogosState {
    fn to_attributes(&self) -> Attributes {
        AttributeWriter::new()
            .with("default", self.default.clone())
            .with("mark", self.mark.clone())
            .with("alt", self.alt.clone())
            .finish()
    }
}

/// Plan shape of [`LogosState`].
#[derive(Debug, Clone, PartialEq)]
pub struct LogosPlan {
    pub default: StringValue,
    pub mark: StringValue,
    pub alt: StringValue,
}

impl FromAttributes for LogosPlan {
    fn from_attributes(r: &AttributeReader<'_>) -> Result<Self, MappingError> {
        Ok(Self {
            default: r.string("default"),
            mark: r.string("mark"),
            alt: r.string("alt"),
        })
    }
}

pub(crate) fn fill_logos(logos: Option<&api::Logos>) -> Value<LogosState> {
    Value::from_option(logos.map(|l| LogosState {
        default: Value::known(l.default.clone()),
        mark: Value::from_option(l.mark.clone()),
        alt: Value::from_option(l.alt.clone()),
    }))
}

pub(crate) fn logos_to_remote(plan: &LogosPlan) -> api::Logos {
    api::Logos {
        default: plan.default.known_or_default(),
        mark: plan.mark.known_or_none(),
        alt: plan.alt.known_or_none(),
    }
}

/// Fill each element of a remote collection, prefixing errors with the
/// element's path.
pub(crate) fn fill_each<R, S>(
    name: &str,
    items: &[R],
    fill: impl Fn(&R) -> Result<S, MappingError>,
) -> Result<Vec<S>, MappingError> {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| fill(item).map_err(|e| e.within(&index_path(name, i))))
        .collect()
}

/// Keep the prior order of an unordered collection when the fresh read
/// holds the same elements.
pub(crate) fn reconcile_unordered<T: PartialEq + Clone>(prior: &[T], fresh: Vec<T>) -> Vec<T> {
    let same = prior.len() == fresh.len()
        && prior.iter().all(|p| {
            fresh.iter().filter(|f| *f == p).count() == prior.iter().filter(|q| *q == p).count()
        });
    if same {
        prior.to_vec()
    } else {
        fresh
    }
}

/// Resolve the id of an entity being written: a computed id the plan does
/// not know yet is sent empty.
pub(crate) fn planned_id(ctx: &ConvertContext<'_>, id: &StringValue) -> String {
    if id.is_unknown() {
        tracing::debug!(path = %ctx.path(), "id not known yet, sending empty");
    }
    id.known_or_default()
}
