//! Source formatting with black, falling back to autopep8.
//!
//! Formatting never fails: when no formatter can handle the source the
//! original text is returned together with the reasons.

use serde::Serialize;

use crate::config::FormattingConfig;
use crate::providers::command::{run_tool, scratch_copy, stderr_summary};
use crate::providers::{ProviderFailure, SourceUnit};

/// Outcome of one formatting request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormatResult {
    pub formatted_code: String,
    /// Whether the formatted text differs from the input.
    pub changes: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

/// Runs the formatter chain.
#[derive(Debug, Clone)]
pub struct CodeFormatter {
    black: String,
    autopep8: String,
    line_length: usize,
}

impl Default for CodeFormatter {
    fn default() -> Self {
        Self::new(&FormattingConfig::default())
    }
}

impl CodeFormatter {
    pub fn new(config: &FormattingConfig) -> Self {
        Self {
            black: "black".to_string(),
            autopep8: "autopep8".to_string(),
            line_length: config.line_length,
        }
    }

    /// Use other executables for the two formatters.
    pub fn with_programs(mut self, black: impl Into<String>, autopep8: impl Into<String>) -> Self {
        self.black = black.into();
        self.autopep8 = autopep8.into();
        self
    }

    pub fn with_line_length(mut self, line_length: usize) -> Self {
        self.line_length = line_length;
        self
    }

    /// Format `code`, trying black first and autopep8 only if black is missing.
    pub async fn format(&self, code: &str) -> FormatResult {
        let mut errors = Vec::new();

        let formatted = match self.black(code).await {
            Ok(formatted) => Some(formatted),
            Err(ProviderFailure::NotInstalled) => {
                errors.push("black not installed, trying autopep8".to_string());
                match self.autopep8(code).await {
                    Ok(formatted) => Some(formatted),
                    Err(ProviderFailure::NotInstalled) => {
                        errors.push("autopep8 not installed, returning original code".to_string());
                        None
                    }
                    Err(e) => {
                        errors.push(format!("Formatting error: {}", e));
                        None
                    }
                }
            }
            Err(e) => {
                errors.push(format!("Formatting error: {}", e));
                None
            }
        };

        if !errors.is_empty() {
            tracing::debug!(?errors, "formatter chain degraded");
        }

        let formatted_code = formatted.unwrap_or_else(|| code.to_string());
        FormatResult {
            changes: formatted_code != code,
            formatted_code,
            errors,
        }
    }

    /// black rewrites the scratch file in place.
    async fn black(&self, code: &str) -> Result<String, ProviderFailure> {
        let file = scratch_copy(&SourceUnit::new(code))?;
        let path = file.path().to_string_lossy().to_string();
        let line_length = self.line_length.to_string();

        let output = run_tool(
            &self.black,
            &["--quiet", "--line-length", &line_length, &path],
        )
        .await?;
        if output.code != Some(0) {
            return Err(ProviderFailure::Rejected(stderr_summary(&output)));
        }
        Ok(std::fs::read_to_string(file.path())?)
    }

    /// autopep8 prints the fixed source to stdout.
    async fn autopep8(&self, code: &str) -> Result<String, ProviderFailure> {
        let file = scratch_copy(&SourceUnit::new(code))?;
        let path = file.path().to_string_lossy().to_string();
        let line_length = self.line_length.to_string();

        let output = run_tool(&self.autopep8, &["--max-line-length", &line_length, &path]).await?;
        if output.code != Some(0) {
            return Err(ProviderFailure::Rejected(stderr_summary(&output)));
        }
        Ok(output.stdout)
    }
}

/// Format with the default formatter chain.
pub async fn format_code(code: &str, line_length: usize) -> FormatResult {
    CodeFormatter::default()
        .with_line_length(line_length)
        .format(code)
        .await
}
