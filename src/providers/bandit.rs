//! bandit adapter (`-f json`).

use async_trait::async_trait;
use serde::Deserialize;

use super::command::{run_tool, scratch_copy};
use super::{ExternalIssue, Provider, ProviderFailure, ProviderOutput, SourceUnit};
use crate::rules::Severity;

pub struct Bandit;

#[derive(Debug, Deserialize)]
struct Report {
    #[serde(default)]
    results: Vec<Finding>,
    #[serde(default)]
    metrics: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct Finding {
    #[serde(default)]
    line_number: Option<usize>,
    #[serde(default)]
    col_offset: Option<usize>,
    #[serde(default)]
    test_id: Option<String>,
    #[serde(default)]
    issue_text: String,
    #[serde(default)]
    issue_severity: String,
}

fn severity(level: &str) -> Option<Severity> {
    match level.to_ascii_uppercase().as_str() {
        "LOW" => Some(Severity::Info),
        "MEDIUM" => Some(Severity::Warning),
        "HIGH" => Some(Severity::Critical),
        _ => None,
    }
}

/// Parse bandit's JSON report. Metrics are reduced to the `_totals` entry,
/// which does not depend on the scratch file name.
pub fn parse_output(stdout: &str) -> Result<ProviderOutput, ProviderFailure> {
    if stdout.trim().is_empty() {
        return Ok(ProviderOutput::default());
    }

    let report: Report = serde_json::from_str(stdout)?;
    let issues = report
        .results
        .into_iter()
        .map(|f| ExternalIssue {
            line: f.line_number,
            column: f.col_offset,
            code: f.test_id,
            message: f.issue_text,
            severity: severity(&f.issue_severity),
        })
        .collect();

    let output = ProviderOutput::from_issues(issues);
    Ok(match report.metrics {
        Some(metrics) => {
            let totals = metrics.get("_totals").cloned().unwrap_or(metrics);
            output.with_metrics(totals)
        }
        None => output,
    })
}

#[async_trait]
impl Provider for Bandit {
    fn name(&self) -> &str {
        "bandit"
    }

    async fn invoke(&self, unit: &SourceUnit) -> Result<ProviderOutput, ProviderFailure> {
        let file = scratch_copy(unit)?;
        let path = file.path().to_string_lossy().into_owned();
        let output = run_tool("bandit", &["-f", "json", "-q", &path]).await?;
        parse_output(&output.stdout)
    }
}
