//! External analyzer providers.
//!
//! Each provider wraps one command-line tool. The orchestrator only sees the
//! [`Provider`] trait; timeouts are applied by the caller, not the adapter.

mod bandit;
pub(crate) mod command;
mod flake8;
mod mypy;
mod pylint;
mod radon;

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::rules::Severity;

pub use bandit::Bandit;
pub use flake8::Flake8;
pub use mypy::Mypy;
pub use pylint::Pylint;
pub use radon::Radon;

/// Known external analyzers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    Pylint,
    Flake8,
    Mypy,
    Bandit,
    Radon,
}

impl ProviderKind {
    /// All providers in default request order.
    pub const ALL: [ProviderKind; 5] = [
        ProviderKind::Pylint,
        ProviderKind::Flake8,
        ProviderKind::Mypy,
        ProviderKind::Bandit,
        ProviderKind::Radon,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Pylint => "pylint",
            ProviderKind::Flake8 => "flake8",
            ProviderKind::Mypy => "mypy",
            ProviderKind::Bandit => "bandit",
            ProviderKind::Radon => "radon",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pylint" => Some(ProviderKind::Pylint),
            "flake8" => Some(ProviderKind::Flake8),
            "mypy" => Some(ProviderKind::Mypy),
            "bandit" => Some(ProviderKind::Bandit),
            "radon" => Some(ProviderKind::Radon),
            _ => None,
        }
    }

    /// Adapter for this tool.
    pub fn provider(&self) -> Arc<dyn Provider> {
        match self {
            ProviderKind::Pylint => Arc::new(Pylint),
            ProviderKind::Flake8 => Arc::new(Flake8),
            ProviderKind::Mypy => Arc::new(Mypy),
            ProviderKind::Bandit => Arc::new(Bandit),
            ProviderKind::Radon => Arc::new(Radon),
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Source text handed to a provider.
#[derive(Debug, Clone)]
pub struct SourceUnit {
    pub code: String,
}

impl SourceUnit {
    pub fn new(code: impl Into<String>) -> Self {
        Self { code: code.into() }
    }
}

/// A finding reported by an external tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExternalIssue {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,
}

/// Result of a successful provider run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProviderOutput {
    pub issues: Vec<ExternalIssue>,
    pub count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<serde_json::Value>,
}

impl ProviderOutput {
    pub fn from_issues(issues: Vec<ExternalIssue>) -> Self {
        Self {
            count: issues.len(),
            issues,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: serde_json::Value) -> Self {
        self.metrics = Some(metrics);
        self
    }
}

/// Why a provider produced no output.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderFailure {
    #[error("Timeout")]
    Timeout,
    #[error("Not installed")]
    NotInstalled,
    #[error("Malformed output: {0}")]
    Malformed(String),
    /// The tool ran and rejected its input.
    #[error("{0}")]
    Rejected(String),
    #[error("{0}")]
    Io(String),
}

impl From<std::io::Error> for ProviderFailure {
    fn from(err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            ProviderFailure::NotInstalled
        } else {
            ProviderFailure::Io(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ProviderFailure {
    fn from(err: serde_json::Error) -> Self {
        ProviderFailure::Malformed(err.to_string())
    }
}

/// An external analyzer.
///
/// `#[async_trait]` keeps the trait object-safe so the orchestrator can hold
/// `Arc<dyn Provider>`.
#[async_trait]
pub trait Provider: Send + Sync {
    fn name(&self) -> &str;

    async fn invoke(&self, unit: &SourceUnit) -> Result<ProviderOutput, ProviderFailure>;
}

/// One adapter per known tool, in default order.
pub fn default_providers() -> Vec<Arc<dyn Provider>> {
    ProviderKind::ALL.iter().map(|k| k.provider()).collect()
}
