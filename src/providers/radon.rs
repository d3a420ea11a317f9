//! radon adapter (`cc -s -j` and `mi -s -j`).
//!
//! radon reports metrics only; its output never contributes issues.

use async_trait::async_trait;
use serde_json::{json, Value};

use super::command::{run_tool, scratch_copy};
use super::{Provider, ProviderFailure, ProviderOutput, SourceUnit};

pub struct Radon;

/// radon keys its JSON by file path. A single-file report is unwrapped so the
/// result does not depend on the scratch file name.
fn unwrap_single_file(stdout: &str) -> Result<Value, ProviderFailure> {
    if stdout.trim().is_empty() {
        return Ok(json!({}));
    }
    let value: Value = serde_json::from_str(stdout)?;
    match value {
        Value::Object(map) if map.len() == 1 => Ok(map
            .into_iter()
            .next()
            .map(|(_, v)| v)
            .unwrap_or(Value::Null)),
        other => Ok(other),
    }
}

/// Combine the complexity and maintainability reports.
pub fn parse_output(cc_stdout: &str, mi_stdout: &str) -> Result<ProviderOutput, ProviderFailure> {
    let complexity = unwrap_single_file(cc_stdout)?;
    let maintainability = unwrap_single_file(mi_stdout)?;
    Ok(ProviderOutput::default().with_metrics(json!({
        "complexity": complexity,
        "maintainability": maintainability,
    })))
}

#[async_trait]
impl Provider for Radon {
    fn name(&self) -> &str {
        "radon"
    }

    async fn invoke(&self, unit: &SourceUnit) -> Result<ProviderOutput, ProviderFailure> {
        let file = scratch_copy(unit)?;
        let path = file.path().to_string_lossy().into_owned();
        let cc = run_tool("radon", &["cc", &path, "-s", "-j"]).await?;
        let mi = run_tool("radon", &["mi", &path, "-s", "-j"]).await?;
        parse_output(&cc.stdout, &mi.stdout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_reports() {
        let cc = r#"{"/tmp/pyreview_r.py": [{"type": "function", "name": "f", "complexity": 3, "rank": "A", "lineno": 1}]}"#;
        let mi = r#"{"/tmp/pyreview_r.py": {"mi": 87.5, "rank": "A"}}"#;
        let output = parse_output(cc, mi).unwrap();
        assert_eq!(output.count, 0);
        assert!(output.issues.is_empty());
        let metrics = output.metrics.unwrap();
        assert_eq!(metrics["complexity"][0]["name"], "f");
        assert_eq!(metrics["complexity"][0]["complexity"], 3);
        assert_eq!(metrics["maintainability"]["rank"], "A");
    }

    #[test]
    fn test_empty_reports() {
        let output = parse_output("", "").unwrap();
        assert_eq!(output.metrics.unwrap()["complexity"], json!({}));
    }

    #[test]
    fn test_malformed_report() {
        assert!(matches!(
            parse_output("not json", "{}"),
            Err(ProviderFailure::Malformed(_))
        ));
    }
}
