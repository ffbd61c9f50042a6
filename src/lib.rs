//! Hemmer Segment State
//!
//! The state translation layer of the Hemmer Segment provider. It converts
//! between three representations of each managed entity:
//!
//! - **Remote records** ([`api`]): what the Segment API returns and accepts
//! - **State**: what the provider persists after a read
//! - **Plan**: what the configuration layer proposes, where any field may be
//!   unknown until apply time
//!
//! # Overview
//!
//! - **[`Value`]**: a tri-state wrapper (known, null, unknown) around every
//!   configurable field
//! - **[`JsonPayload`]**: opaque JSON stored as text, compared semantically
//! - **Fill** converters: remote record to state, failing on the first error
//! - **[`ConvertContext`]**: plan to remote record, collecting every error
//!   into [`Diagnostics`] instead of stopping at the first one
//! - **[`Resource`]**: ties one entity's schema, state, plan and converters
//!   together
//! - **[`client`]**: read and write through a [`RemoteClient`]
//!
//! # Quick Start
//!
//! ```
//! use hemmer_segment_state::resources::LabelResource;
//! use hemmer_segment_state::{Attributes, ConvertContext, Diagnostics, Dynamic, FromAttributes, Resource};
//!
//! let mut attrs = Attributes::new();
//! attrs.insert("key".to_string(), Dynamic::from("env"));
//! attrs.insert("value".to_string(), Dynamic::Unknown);
//! let plan = <LabelResource as Resource>::Plan::decode(&attrs).unwrap();
//!
//! let mut diagnostics = Diagnostics::new();
//! let label = LabelResource::to_remote(&plan, &mut ConvertContext::new(&mut diagnostics));
//!
//! // An unknown required value cannot be sent.
//! assert!(label.is_none());
//! assert!(diagnostics.has_error());
//! ```
//!
//! # Unknown values
//!
//! A plan field stays unknown when it depends on another resource that has
//! not been applied yet. Converters never invent a value for a required
//! field: they report an "Incomplete value" diagnostic at the field's path.
//! Remote-defaulted fields are left out of the request, and computed fields
//! carry their zero value.
//!
//! # Collections
//!
//! Each list picks a [`CollectionPolicy`]. Filter actions and function
//! settings are atomic; tracking plan rules, labels and user permissions
//! skip invalid elements and keep the rest.

#![warn(missing_docs)]
#![warn(clippy::all)]

#[allow(missing_docs)]
pub mod api;
pub mod client;
pub mod convert;
pub mod diagnostics;
pub mod dynamic;
pub mod error;
pub mod import;
pub mod json;
pub mod logging;
pub mod numeric;
pub mod resource;
#[allow(missing_docs)]
pub mod resources;
pub mod schema;
pub mod testing;
pub mod validation;
pub mod value;

// Re-export main types at crate root
pub use client::{read_state, write_plan, RemoteClient};
pub use convert::{CollectionPolicy, ConvertContext};
pub use diagnostics::{Diagnostic, DiagnosticSeverity, Diagnostics};
pub use dynamic::{Attributes, Dynamic, FromAttributes, Object, ToAttributes};
pub use error::{ClientError, MappingError};
pub use json::JsonPayload;
pub use logging::{init_logging, init_logging_with_default, try_init_logging};
pub use resource::Resource;
pub use schema::{Attribute, AttributeType, Schema};
pub use validation::{is_valid, validate, validate_result};
pub use value::{BoolValue, Float64Value, Int64Value, ListValue, SetValue, StringValue, Value};

// Re-export async_trait for client implementations
pub use async_trait::async_trait;

// Re-export commonly used external types
pub use serde_json;
pub use tracing;
