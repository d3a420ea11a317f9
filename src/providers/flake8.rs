//! flake8 adapter (default `path:line:col: CODE message` format).

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;

use super::command::{run_tool, scratch_copy};
use super::{ExternalIssue, Provider, ProviderFailure, ProviderOutput, SourceUnit};
use crate::rules::Severity;

pub struct Flake8;

static LINE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(.*?):(\d+):(\d+): ([A-Z]+\d+) (.*)$").expect("valid flake8 regex")
});

fn severity(code: &str) -> Option<Severity> {
    match code.chars().next() {
        Some('E') | Some('F') | Some('W') => Some(Severity::Warning),
        Some('C') | Some('N') | Some('D') => Some(Severity::Info),
        _ => None,
    }
}

/// Parse flake8 report lines. Lines in any other shape are skipped.
pub fn parse_output(stdout: &str) -> ProviderOutput {
    let issues = stdout
        .lines()
        .filter_map(|line| {
            let caps = LINE_RE.captures(line.trim_end())?;
            let code = caps[4].to_string();
            Some(ExternalIssue {
                line: caps[2].parse().ok(),
                column: caps[3].parse().ok(),
                severity: severity(&code),
                code: Some(code),
                message: caps[5].trim().to_string(),
            })
        })
        .collect();
    ProviderOutput::from_issues(issues)
}

#[async_trait]
impl Provider for Flake8 {
    fn name(&self) -> &str {
        "flake8"
    }

    async fn invoke(&self, unit: &SourceUnit) -> Result<ProviderOutput, ProviderFailure> {
        let file = scratch_copy(unit)?;
        let path = file.path().to_string_lossy().into_owned();
        let output = run_tool("flake8", &[&path]).await?;
        Ok(parse_output(&output.stdout))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_lines() {
        let stdout = "\
/tmp/pyreview_x.py:1:1: F401 'os' imported but unused
/tmp/pyreview_x.py:3:80: E501 line too long (88 > 79 characters)
/tmp/pyreview_x.py:7:5: C901 'f' is too complex (12)
";
        let output = parse_output(stdout);
        assert_eq!(output.count, 3);
        assert_eq!(output.issues[0].code.as_deref(), Some("F401"));
        assert_eq!(output.issues[0].message, "'os' imported but unused");
        assert_eq!(output.issues[1].line, Some(3));
        assert_eq!(output.issues[1].column, Some(80));
        assert_eq!(output.issues[1].severity, Some(Severity::Warning));
        assert_eq!(output.issues[2].severity, Some(Severity::Info));
    }

    #[test]
    fn test_message_with_colons() {
        let output = parse_output("/tmp/a.py:2:1: E999 SyntaxError: invalid syntax\n");
        assert_eq!(output.issues[0].message, "SyntaxError: invalid syntax");
        assert_eq!(output.issues[0].line, Some(2));
    }

    #[test]
    fn test_skips_noise() {
        let output = parse_output("\nsome warning from a plugin\n");
        assert_eq!(output.count, 0);
    }
}
