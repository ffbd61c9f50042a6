//! Diagnostics collected while converting resources.
//!
//! Every conversion threads a [`Diagnostics`] collector through its call tree.
//! Child conversions append to their parent's collector; nothing is ever
//! replaced, so a single pass reports every problem it can find.

use serde::{Deserialize, Serialize};

use crate::error::MappingError;

/// Diagnostic severity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticSeverity {
    /// An error that prevents the operation from completing.
    Error,
    /// A warning that doesn't prevent the operation but should be addressed.
    Warning,
}

/// A single diagnostic message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// The severity of the diagnostic.
    pub severity: DiagnosticSeverity,
    /// A short summary of the issue.
    pub summary: String,
    /// A detailed description of the issue.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// The attribute path where the issue occurred.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
}

impl Diagnostic {
    /// Create an error diagnostic.
    pub fn error(summary: impl Into<String>) -> Self {
        Self {
            severity: DiagnosticSeverity::Error,
            summary: summary.into(),
            detail: None,
            attribute: None,
        }
    }

    /// Create a warning diagnostic.
    pub fn warning(summary: impl Into<String>) -> Self {
        Self {
            severity: DiagnosticSeverity::Warning,
            summary: summary.into(),
            detail: None,
            attribute: None,
        }
    }

    /// Add detail to this diagnostic.
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Set the attribute path for this diagnostic.
    pub fn with_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.attribute = Some(attribute.into());
        self
    }

    /// Whether this diagnostic is an error.
    pub fn is_error(&self) -> bool {
        self.severity == DiagnosticSeverity::Error
    }
}

impl From<MappingError> for Diagnostic {
    fn from(err: MappingError) -> Self {
        err.to_diagnostic()
    }
}

/// An append-only collection of diagnostics.
///
/// Not synchronized: give each concurrent conversion its own collector.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    /// Create an empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a diagnostic.
    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.entries.push(diagnostic);
    }

    /// Append an error diagnostic with a summary and detail.
    pub fn error(&mut self, summary: impl Into<String>, detail: impl Into<String>) {
        self.push(Diagnostic::error(summary).with_detail(detail));
    }

    /// Append a warning diagnostic with a summary and detail.
    pub fn warning(&mut self, summary: impl Into<String>, detail: impl Into<String>) {
        self.push(Diagnostic::warning(summary).with_detail(detail));
    }

    /// Append a mapping error as an error diagnostic.
    pub fn push_error(&mut self, err: MappingError) {
        self.push(err.to_diagnostic());
    }

    /// Merge another collector into this one, keeping both sets of entries.
    pub fn append(&mut self, mut other: Diagnostics) {
        self.entries.append(&mut other.entries);
    }

    /// `true` iff at least one entry has error severity.
    pub fn has_error(&self) -> bool {
        self.entries.iter().any(Diagnostic::is_error)
    }

    /// Iterate over the error entries.
    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter().filter(|d| d.is_error())
    }

    /// Iterate over all entries in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.entries.iter()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the collector is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// View the entries as a slice.
    pub fn as_slice(&self) -> &[Diagnostic] {
        &self.entries
    }
}

impl Extend<Diagnostic> for Diagnostics {
    fn extend<I: IntoIterator<Item = Diagnostic>>(&mut self, iter: I) {
        self.entries.extend(iter);
    }
}

impl AsRef<[Diagnostic]> for Diagnostics {
    fn as_ref(&self) -> &[Diagnostic] {
        &self.entries
    }
}

impl From<Vec<Diagnostic>> for Diagnostics {
    fn from(entries: Vec<Diagnostic>) -> Self {
        Self { entries }
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic() {
        let err = Diagnostic::error("Invalid configuration")
            .with_detail("The value must be positive")
            .with_attribute("count");

        assert_eq!(err.severity, DiagnosticSeverity::Error);
        assert_eq!(err.summary, "Invalid configuration");
        assert_eq!(err.detail, Some("The value must be positive".to_string()));
        assert_eq!(err.attribute, Some("count".to_string()));
        assert!(err.is_error());
        assert!(!Diagnostic::warning("careful").is_error());
    }

    #[test]
    fn test_has_error_ignores_warnings() {
        let mut diags = Diagnostics::new();
        assert!(!diags.has_error());

        diags.warning("Deprecated attribute", "use 'slug' instead");
        assert!(!diags.has_error());
        assert_eq!(diags.len(), 1);

        diags.error("Bad value", "expected string");
        assert!(diags.has_error());
        assert_eq!(diags.errors().count(), 1);
    }

    #[test]
    fn test_append_merges_instead_of_replacing() {
        let mut parent = Diagnostics::new();
        parent.error("First", "from the parent");

        let mut child = Diagnostics::new();
        child.warning("Second", "from the child");
        child.push_error(MappingError::incomplete("rules.0.key"));

        parent.append(child);
        assert_eq!(parent.len(), 3);
        assert_eq!(parent.as_slice()[0].summary, "First");
        assert_eq!(parent.as_slice()[1].summary, "Second");
        assert_eq!(
            parent.as_slice()[2].attribute,
            Some("rules.0.key".to_string())
        );
    }

    #[test]
    fn test_serializes_severity_lowercase() {
        let diags = Diagnostics::from(vec![Diagnostic::warning("w")]);
        let json = serde_json::to_value(&diags).unwrap();
        assert_eq!(json["entries"][0]["severity"], "warning");
        assert!(json["entries"][0].get("detail").is_none());
    }
}
