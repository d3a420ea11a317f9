//! Core types for findings.

use serde::{Deserialize, Serialize};

use crate::syntax::Stats;

/// Severity levels for issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Critical => write!(f, "critical"),
            Severity::Warning => write!(f, "warning"),
            Severity::Info => write!(f, "info"),
        }
    }
}

/// What kind of finding an issue is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IssueKind {
    #[serde(rename = "missing_docstring")]
    MissingDocumentation,
    #[serde(rename = "too_many_args")]
    ExcessiveParameters,
    #[serde(rename = "long_function")]
    ExcessiveLength,
    #[serde(rename = "wildcard_import")]
    WildcardImport,
    /// Reported by an external analyzer.
    #[serde(rename = "external")]
    External,
}

impl IssueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueKind::MissingDocumentation => "missing_docstring",
            IssueKind::ExcessiveParameters => "too_many_args",
            IssueKind::ExcessiveLength => "long_function",
            IssueKind::WildcardImport => "wildcard_import",
            IssueKind::External => "external",
        }
    }
}

impl std::fmt::Display for IssueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    #[serde(rename = "type")]
    pub kind: IssueKind,
    pub severity: Severity,
    pub line: usize,
    pub message: String,
    /// Rule set or provider that emitted the issue.
    pub source: String,
}

/// Output of structural evaluation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Evaluation {
    pub issues: Vec<Issue>,
    pub stats: Stats,
}

impl Evaluation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge another evaluation into this one, keeping discovery order.
    pub fn merge(&mut self, other: Evaluation) {
        self.issues.extend(other.issues);
        self.stats.merge(other.stats);
    }
}
