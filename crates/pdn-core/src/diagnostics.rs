//! Diagnostics infrastructure for issues found while evaluating a project.
//!
//! Every finding the engine makes about a project (cycles, voltage
//! mismatches, malformed efficiency models, runaway nesting) is recorded
//! here instead of being raised as an error. It supports:
//!
//! - Severity levels (Warning, Error). `Error` marks a fatal finding after
//!   which the result is only a best-effort partial one.
//! - Categories for grouping issues (structure, compatibility, model, ...)
//! - Optional entity references (node or edge ids, `sub1/conv` inside
//!   subsystems)
//! - Serialization for JSON output
//!
//! # Example
//!
//! ```
//! use pdn_core::diagnostics::{categories, Diagnostics};
//!
//! let mut diag = Diagnostics::new();
//! diag.add_warning_with_entity(categories::COMPATIBILITY, "Vin != Vout", "e1");
//! diag.add_error(categories::STRUCTURE, "Cycle detected: a -> b");
//!
//! assert_eq!(diag.warning_count(), 1);
//! assert_eq!(diag.error_count(), 1);
//! ```

use serde::Serialize;

/// Category names used by the engine.
pub mod categories {
    /// Graph shape problems: cycles, dangling or unusable edges
    pub const STRUCTURE: &str = "structure";
    /// Voltage range / equality mismatches between connected nodes
    pub const COMPATIBILITY: &str = "compatibility";
    /// Malformed efficiency models and invalid multipliers
    pub const MODEL: &str = "model";
    /// Converter output current above its rating
    pub const CAPACITY: &str = "capacity";
    /// Runaway subsystem nesting
    pub const SCALE: &str = "scale";
}

/// Severity level for diagnostic issues
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Computation proceeded; the value may be electrically questionable
    Warning,
    /// Fatal finding; the affected part of the result is a sentinel
    Error,
}

/// A single diagnostic issue encountered during evaluation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiagnosticIssue {
    pub severity: Severity,
    /// Category for grouping, see [`categories`]
    pub category: String,
    /// Human-readable description of the issue
    pub message: String,
    /// Optional entity reference (node or edge id)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity: Option<String>,
}

impl DiagnosticIssue {
    /// Create a new diagnostic issue
    pub fn new(
        severity: Severity,
        category: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            category: category.into(),
            message: message.into(),
            entity: None,
        }
    }

    /// Add entity reference to the issue
    pub fn with_entity(mut self, entity: impl Into<String>) -> Self {
        self.entity = Some(entity.into());
        self
    }
}

impl std::fmt::Display for DiagnosticIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let severity = match self.severity {
            Severity::Warning => "warning",
            Severity::Error => "error",
        };

        write!(f, "[{}:{}] {}", severity, self.category, self.message)?;

        if let Some(entity) = &self.entity {
            write!(f, " ({})", entity)?;
        }

        Ok(())
    }
}

/// Findings of one evaluation, in the order they were made
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Diagnostics {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<DiagnosticIssue>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_warning(&mut self, category: &str, message: &str) {
        self.push(Severity::Warning, category, message, None);
    }

    pub fn add_warning_with_entity(&mut self, category: &str, message: &str, entity: &str) {
        self.push(Severity::Warning, category, message, Some(entity));
    }

    pub fn add_error(&mut self, category: &str, message: &str) {
        self.push(Severity::Error, category, message, None);
    }

    pub fn add_error_with_entity(&mut self, category: &str, message: &str, entity: &str) {
        self.push(Severity::Error, category, message, Some(entity));
    }

    fn push(&mut self, severity: Severity, category: &str, message: &str, entity: Option<&str>) {
        let issue = DiagnosticIssue::new(severity, category, message);
        self.issues.push(match entity {
            Some(entity) => issue.with_entity(entity),
            None => issue,
        });
    }

    fn count(&self, severity: Severity) -> usize {
        self.issues.iter().filter(|i| i.severity == severity).count()
    }

    pub fn warning_count(&self) -> usize {
        self.count(Severity::Warning)
    }

    pub fn error_count(&self) -> usize {
        self.count(Severity::Error)
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    /// Whether any finding was fatal
    pub fn has_errors(&self) -> bool {
        self.issues.iter().any(|i| i.severity == Severity::Error)
    }

    pub fn issues_by_category<'a>(
        &'a self,
        category: &'a str,
    ) -> impl Iterator<Item = &'a DiagnosticIssue> {
        self.issues.iter().filter(move |i| i.category == category)
    }

    /// Issues attached to one node or edge id
    pub fn issues_for<'a>(&'a self, entity: &'a str) -> impl Iterator<Item = &'a DiagnosticIssue> {
        self.issues
            .iter()
            .filter(move |i| i.entity.as_deref() == Some(entity))
    }

    pub fn errors(&self) -> impl Iterator<Item = &DiagnosticIssue> {
        self.issues.iter().filter(|i| i.severity == Severity::Error)
    }

    /// Lift issues found inside a subsystem, qualifying each entity with
    /// the subsystem id (`sub1/conv`). Unattached issues get the bare id.
    pub fn merge_scoped(&mut self, scope: &str, other: &Diagnostics) {
        for issue in &other.issues {
            let entity = match &issue.entity {
                Some(inner) => format!("{scope}/{inner}"),
                None => scope.to_string(),
            };
            self.issues.push(issue.clone().with_entity(entity));
        }
    }

    /// "2 warnings, 1 error", or "No issues"
    pub fn summary(&self) -> String {
        let counted = [
            (self.warning_count(), "warning"),
            (self.error_count(), "error"),
        ];
        let parts: Vec<String> = counted
            .iter()
            .filter(|(n, _)| *n > 0)
            .map(|(n, noun)| format!("{n} {noun}{}", if *n == 1 { "" } else { "s" }))
            .collect();
        if parts.is_empty() {
            "No issues".to_string()
        } else {
            parts.join(", ")
        }
    }
}

impl std::fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Diagnostics: {}", self.summary())?;
        for issue in &self.issues {
            writeln!(f, "  {}", issue)?;
        }
        Ok(())
    }
}
