//! Plan validation against a resource [`Schema`].
//!
//! Validation runs on the untyped plan [`Attributes`] before any converter
//! sees them. Unknown values are accepted everywhere: a value the remote
//! service will compute later can't be checked yet.
//!
//! # Example
//!
//! ```
//! use hemmer_segment_state::dynamic::{Attributes, Dynamic};
//! use hemmer_segment_state::schema::{Attribute, Schema};
//! use hemmer_segment_state::validation::validate;
//! use serde_json::json;
//!
//! let schema = Schema::v0()
//!     .with_attribute("slug", Attribute::required_string())
//!     .with_attribute("enabled", Attribute::optional_bool());
//!
//! let plan = |value: serde_json::Value| -> Attributes {
//!     match Dynamic::from(value) {
//!         Dynamic::Object(attrs) => attrs,
//!         _ => Attributes::new(),
//!     }
//! };
//!
//! assert!(validate(&schema, &plan(json!({"slug": "web", "enabled": true}))).is_empty());
//!
//! let diagnostics = validate(&schema, &plan(json!({"slug": "web", "enabled": "yes"})));
//! assert_eq!(diagnostics.len(), 1);
//! assert_eq!(diagnostics[0].attribute, Some("enabled".to_string()));
//! ```

use crate::diagnostics::Diagnostic;
use crate::dynamic::{index_path, join_path, Attributes, Dynamic};
use crate::schema::{Attribute, AttributeType, Block, BlockNestingMode, NestedBlock, Schema};

/// Validate plan attributes against a schema.
///
/// Returns a list of diagnostics; an empty list means the plan is valid.
///
/// - Required attributes must be present and non-null (unknown counts as present)
/// - Computed-only attributes are skipped
/// - Attribute types must match the schema
/// - Nested blocks are validated recursively with min/max item constraints
pub fn validate(schema: &Schema, attrs: &Attributes) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    validate_block(&schema.block, attrs, "", &mut diagnostics);
    diagnostics
}

/// Validate plan attributes, returning `Err` with the diagnostics if invalid.
pub fn validate_result(schema: &Schema, attrs: &Attributes) -> Result<(), Vec<Diagnostic>> {
    let diagnostics = validate(schema, attrs);
    if diagnostics.is_empty() {
        Ok(())
    } else {
        Err(diagnostics)
    }
}

/// Check if plan attributes are valid against a schema.
pub fn is_valid(schema: &Schema, attrs: &Attributes) -> bool {
    validate(schema, attrs).is_empty()
}

fn validate_block(block: &Block, attrs: &Attributes, path: &str, diagnostics: &mut Vec<Diagnostic>) {
    for (name, attr) in &block.attributes {
        let attr_path = join_path(path, name);
        validate_attribute(attr, attrs.get(name), &attr_path, diagnostics);
    }

    for (name, nested) in &block.blocks {
        let block_path = join_path(path, name);
        validate_nested_block(nested, attrs.get(name), &block_path, diagnostics);
    }

    for name in attrs.keys() {
        if !block.attributes.contains_key(name) && !block.blocks.contains_key(name) {
            let attr_path = join_path(path, name);
            diagnostics.push(
                Diagnostic::error(format!("Unsupported attribute '{}'", attr_path))
                    .with_detail("This attribute is not defined for this resource")
                    .with_attribute(attr_path),
            );
        }
    }
}

fn validate_attribute(
    attr: &Attribute,
    value: Option<&Dynamic>,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    if attr.flags.is_computed_only() {
        return;
    }

    match value {
        None | Some(Dynamic::Null) => {
            if attr.flags.required {
                diagnostics.push(
                    Diagnostic::error(format!("Missing required attribute '{}'", path))
                        .with_detail("This attribute is required and must be provided")
                        .with_attribute(path),
                );
            }
        },
        Some(Dynamic::Unknown) => {},
        Some(v) => validate_attribute_type(&attr.attr_type, v, path, diagnostics),
    }
}

fn validate_attribute_type(
    attr_type: &AttributeType,
    value: &Dynamic,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    match (attr_type, value) {
        (_, Dynamic::Unknown) => {},
        (AttributeType::String, Dynamic::String(_)) => {},
        (AttributeType::Bool, Dynamic::Bool(_)) => {},
        (AttributeType::Float64, Dynamic::Number(_)) => {},
        (AttributeType::Int64, Dynamic::Number(n)) if n.is_i64() => {},
        (AttributeType::Json, Dynamic::String(text)) => {
            if let Err(e) = serde_json::from_str::<serde_json::Value>(text) {
                diagnostics.push(
                    Diagnostic::error("Invalid JSON")
                        .with_detail(e.to_string())
                        .with_attribute(path),
                );
            }
        },
        (AttributeType::Json, Dynamic::Object(_) | Dynamic::List(_)) => {},
        (AttributeType::List(element_type), Dynamic::List(items))
        | (AttributeType::Set(element_type), Dynamic::List(items) | Dynamic::Set(items)) => {
            for (i, item) in items.iter().enumerate() {
                let item_path = index_path(path, i);
                if item.is_null() {
                    diagnostics.push(
                        Diagnostic::error("Null collection element")
                            .with_detail("Collection elements must not be null")
                            .with_attribute(item_path),
                    );
                } else {
                    validate_attribute_type(element_type, item, &item_path, diagnostics);
                }
            }
        },
        (expected, got) => diagnostics.push(type_error(path, type_label(expected), got)),
    }
}

fn validate_nested_block(
    nested: &NestedBlock,
    value: Option<&Dynamic>,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    if nested.computed {
        return;
    }

    match (nested.nesting_mode, value) {
        (_, Some(Dynamic::Unknown)) => {},
        (_, None | Some(Dynamic::Null)) => {
            if nested.min_items > 0 {
                diagnostics.push(
                    Diagnostic::error(format!("Missing required block '{}'", path))
                        .with_detail(format!("At least {} block(s) required", nested.min_items))
                        .with_attribute(path),
                );
            }
        },
        (BlockNestingMode::Single, Some(Dynamic::Object(attrs))) => {
            validate_block(&nested.block, attrs, path, diagnostics);
        },
        (BlockNestingMode::List | BlockNestingMode::Set, Some(Dynamic::List(items) | Dynamic::Set(items))) => {
            validate_item_count(nested, items.len(), path, diagnostics);
            for (i, item) in items.iter().enumerate() {
                let item_path = index_path(path, i);
                match item {
                    Dynamic::Object(attrs) => {
                        validate_block(&nested.block, attrs, &item_path, diagnostics)
                    },
                    Dynamic::Unknown => {},
                    other => diagnostics.push(type_error(&item_path, "object", other)),
                }
            }
        },
        (BlockNestingMode::Single, Some(other)) => {
            diagnostics.push(type_error(path, "object", other));
        },
        (_, Some(other)) => {
            diagnostics.push(type_error(path, "list", other));
        },
    }
}

fn validate_item_count(nested: &NestedBlock, len: usize, path: &str, diagnostics: &mut Vec<Diagnostic>) {
    let len = len as u32;
    if len < nested.min_items {
        diagnostics.push(
            Diagnostic::error(format!(
                "Block '{}' requires at least {} item(s), got {}",
                path, nested.min_items, len
            ))
            .with_attribute(path),
        );
    }
    // 0 means unlimited
    if nested.max_items > 0 && len > nested.max_items {
        diagnostics.push(
            Diagnostic::error(format!(
                "Block '{}' allows at most {} item(s), got {}",
                path, nested.max_items, len
            ))
            .with_attribute(path),
        );
    }
}

fn type_label(attr_type: &AttributeType) -> &'static str {
    match attr_type {
        AttributeType::String => "string",
        AttributeType::Int64 => "int64",
        AttributeType::Float64 => "float64",
        AttributeType::Bool => "bool",
        AttributeType::Json => "JSON",
        AttributeType::List(_) => "list",
        AttributeType::Set(_) => "set",
    }
}

fn type_error(path: &str, expected: &str, got: &Dynamic) -> Diagnostic {
    Diagnostic::error(format!("Invalid type for '{}'", path))
        .with_detail(format!("Expected {}, got {}", expected, got.type_name()))
        .with_attribute(path)
}
