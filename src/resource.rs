//! The [`Resource`] trait binding each resource kind's state, plan and
//! remote shapes together.

use crate::convert::ConvertContext;
use crate::diagnostics::Diagnostic;
use crate::dynamic::{Attributes, FromAttributes, ToAttributes};
use crate::error::MappingError;
use crate::import;
use crate::schema::Schema;
use crate::validation;

/// A resource kind managed by the provider.
///
/// Implementors supply the two converters; everything else has a default
/// that only needs overriding when the kind has something to add (payload
/// reconciliation, custom validation).
pub trait Resource {
    /// The resource type name as it appears in configuration.
    const TYPE_NAME: &'static str;

    /// Format of the identifier accepted by import.
    const IMPORT_ID_FORMAT: &'static str;

    /// The remote wire representation.
    type Remote;

    /// The persisted state.
    type State: ToAttributes;

    /// The planned configuration.
    type Plan: FromAttributes;

    /// The attribute schema for this kind.
    fn schema() -> Schema;

    /// Build state from a remote read.
    fn fill(remote: &Self::Remote) -> Result<Self::State, MappingError>;

    /// Build a remote write from a plan.
    ///
    /// Returns `None` when the entity can't be converted; the reason is in
    /// the context's diagnostics. A `Some` result may still come with
    /// warnings, or with errors for skipped collection elements.
    fn to_remote(plan: &Self::Plan, ctx: &mut ConvertContext<'_>) -> Option<Self::Remote>;

    /// Read state back as a plan, the same way configuration is read.
    fn to_plan(state: &Self::State) -> Result<Self::Plan, MappingError> {
        Self::Plan::decode(&state.to_attributes())
    }

    /// Merge a fresh read with the prior state.
    ///
    /// The default takes the fresh state as is.
    fn reconcile(_prior: &Self::State, fresh: Self::State) -> Self::State {
        fresh
    }

    /// Validate plan attributes against [`Resource::schema`].
    fn validate(config: &Attributes) -> Vec<Diagnostic> {
        validation::validate(&Self::schema(), config)
    }

    /// Import instructions for this kind.
    fn import_instructions() -> String {
        import::import_instructions(Self::TYPE_NAME, Self::IMPORT_ID_FORMAT)
    }
}
