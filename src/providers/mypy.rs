//! mypy adapter (`path:line:col: severity: message` lines).

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;

use super::command::{run_tool, scratch_copy, stderr_summary};
use super::{ExternalIssue, Provider, ProviderFailure, ProviderOutput, SourceUnit};
use crate::rules::Severity;

pub struct Mypy;

/// Exit code mypy uses for crashes and bad invocations.
const EXIT_FATAL: i32 = 2;

static LINE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(.*?):(\d+):(?:(\d+):)? (error|warning|note): (.*?)(?:\s+\[([\w-]+)\])?$")
        .expect("valid mypy regex")
});

fn severity(level: &str) -> Severity {
    match level {
        "note" => Severity::Info,
        "warning" => Severity::Warning,
        _ => Severity::Critical,
    }
}

/// Parse mypy report lines. Summary and noise lines are skipped.
pub fn parse_output(stdout: &str) -> ProviderOutput {
    let issues = stdout
        .lines()
        .filter_map(|line| {
            let caps = LINE_RE.captures(line.trim_end())?;
            Some(ExternalIssue {
                line: caps[2].parse().ok(),
                column: caps.get(3).and_then(|c| c.as_str().parse().ok()),
                code: caps.get(6).map(|c| c.as_str().to_string()),
                message: caps[5].trim().to_string(),
                severity: Some(severity(&caps[4])),
            })
        })
        .collect();
    ProviderOutput::from_issues(issues)
}

#[async_trait]
impl Provider for Mypy {
    fn name(&self) -> &str {
        "mypy"
    }

    async fn invoke(&self, unit: &SourceUnit) -> Result<ProviderOutput, ProviderFailure> {
        let file = scratch_copy(unit)?;
        let path = file.path().to_string_lossy().into_owned();
        let output = run_tool(
            "mypy",
            &[
                &path,
                "--show-column-numbers",
                "--show-error-codes",
                "--no-error-summary",
            ],
        )
        .await?;

        if output.code == Some(EXIT_FATAL) && output.stdout.trim().is_empty() {
            return Err(ProviderFailure::Malformed(stderr_summary(&output)));
        }
        Ok(parse_output(&output.stdout))
    }
}
