//! pylint adapter (`--output-format=json`).

use async_trait::async_trait;
use serde::Deserialize;

use super::command::{run_tool, scratch_copy};
use super::{ExternalIssue, Provider, ProviderFailure, ProviderOutput, SourceUnit};
use crate::rules::Severity;

pub struct Pylint;

#[derive(Debug, Deserialize)]
struct Message {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    line: Option<usize>,
    #[serde(default)]
    column: Option<usize>,
    #[serde(rename = "message-id", default)]
    message_id: Option<String>,
    #[serde(default)]
    symbol: Option<String>,
    #[serde(default)]
    message: String,
}

fn severity(kind: &str) -> Option<Severity> {
    match kind {
        "convention" | "refactor" | "info" => Some(Severity::Info),
        "warning" => Some(Severity::Warning),
        "error" | "fatal" => Some(Severity::Critical),
        _ => None,
    }
}

/// Parse pylint's JSON message list.
pub fn parse_output(stdout: &str) -> Result<ProviderOutput, ProviderFailure> {
    if stdout.trim().is_empty() {
        return Ok(ProviderOutput::default());
    }

    let messages: Vec<Message> = serde_json::from_str(stdout)?;
    let issues = messages
        .into_iter()
        .map(|m| {
            let message = match &m.symbol {
                Some(symbol) => format!("{} ({})", m.message, symbol),
                None => m.message,
            };
            ExternalIssue {
                line: m.line,
                column: m.column,
                code: m.message_id,
                message,
                severity: severity(&m.kind),
            }
        })
        .collect();
    Ok(ProviderOutput::from_issues(issues))
}

#[async_trait]
impl Provider for Pylint {
    fn name(&self) -> &str {
        "pylint"
    }

    async fn invoke(&self, unit: &SourceUnit) -> Result<ProviderOutput, ProviderFailure> {
        let file = scratch_copy(unit)?;
        let path = file.path().to_string_lossy().into_owned();
        let output = run_tool("pylint", &[&path, "--output-format=json", "--score=no"]).await?;
        parse_output(&output.stdout)
    }
}
