//! Import instructions shown to users.

/// Render the shell snippet that imports an existing remote resource.
///
/// `id_format` describes the import identifier, e.g. `<source_id>` or
/// `<source_id>:<destination_id>:<filter_id>`.
pub fn import_instructions(resource_type: &str, id_format: &str) -> String {
    format!(
        "# The import identifier is {id_format}\nhemmer import {resource_type}.example {id_format}\n"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_import_instructions() {
        let text = import_instructions("segment_source", "<source_id>");
        assert!(text.contains("hemmer import segment_source.example <source_id>"));
        assert!(text.starts_with('#'));
    }
}
