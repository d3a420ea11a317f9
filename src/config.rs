//! Configuration schema for pyreview.
//!
//! Configuration is read from YAML. Every field is optional; a missing file
//! section falls back to the defaults below.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::providers::ProviderKind;

/// Default config file names to search for.
pub const DEFAULT_CONFIG_NAMES: &[&str] = &["pyreview.yaml", ".pyreview.yaml"];

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    #[serde(default)]
    pub rules: RulesConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub synthesis: SynthesisConfig,
    #[serde(default)]
    pub execution: ExecutionConfig,
    #[serde(default)]
    pub formatting: FormattingConfig,
    /// Glob patterns for paths to skip when scanning directories (e.g. "**/venv/**")
    #[serde(default)]
    pub excluded_paths: Vec<String>,
}

impl Config {
    /// Parse a config from a YAML file.
    pub fn parse_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Look for a config file in `dir`.
    pub fn discover(dir: &Path) -> Option<PathBuf> {
        DEFAULT_CONFIG_NAMES
            .iter()
            .map(|name| dir.join(name))
            .find(|p| p.exists())
    }

    /// Check if a path should be excluded based on excluded_paths patterns.
    pub fn is_path_excluded(&self, path: &Path) -> bool {
        if self.excluded_paths.is_empty() {
            return false;
        }

        let path_str = path.to_string_lossy();
        self.excluded_paths.iter().any(|pattern| {
            globset::Glob::new(pattern)
                .map(|glob| glob.compile_matcher().is_match(&*path_str))
                .unwrap_or(false)
        })
    }
}

/// Default maximum parameter count.
pub const DEFAULT_MAX_PARAMETERS: usize = 7;

/// Default maximum function length in lines.
pub const DEFAULT_MAX_FUNCTION_LINES: usize = 50;

/// Toggles and thresholds for the structural rules.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct RulesConfig {
    #[serde(default)]
    pub missing_documentation: ToggleRule,
    #[serde(default)]
    pub excessive_parameters: ThresholdRule,
    #[serde(default)]
    pub excessive_length: ThresholdRule,
    #[serde(default)]
    pub wildcard_import: ToggleRule,
}

impl RulesConfig {
    /// Parameter threshold, or `None` when the rule is disabled.
    pub fn max_parameters(&self) -> Option<usize> {
        self.excessive_parameters.active(DEFAULT_MAX_PARAMETERS)
    }

    /// Length threshold, or `None` when the rule is disabled.
    pub fn max_function_lines(&self) -> Option<usize> {
        self.excessive_length.active(DEFAULT_MAX_FUNCTION_LINES)
    }
}

/// A rule that is either on or off.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ToggleRule {
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for ToggleRule {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// A rule that fires when a measured value exceeds its threshold.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ThresholdRule {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub threshold: Option<usize>,
}

impl Default for ThresholdRule {
    fn default() -> Self {
        Self {
            enabled: true,
            threshold: None,
        }
    }
}

impl ThresholdRule {
    fn active(&self, default: usize) -> Option<usize> {
        self.enabled.then(|| self.threshold.unwrap_or(default))
    }
}

/// External analyzer settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProvidersConfig {
    /// Providers to run, in report order.
    #[serde(default = "default_enabled_providers")]
    pub enabled: Vec<String>,
    /// Providers whose findings are security findings (reported as critical).
    #[serde(default = "default_security_providers")]
    pub security: Vec<String>,
    /// Per-provider timeout in seconds (default: 30)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled_providers(),
            security: default_security_providers(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl ProvidersConfig {
    pub fn is_security(&self, provider: &str) -> bool {
        self.security.iter().any(|s| s == provider)
    }
}

/// Test synthesis settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SynthesisConfig {
    /// Module imported by generated tests (default: "module")
    #[serde(default = "default_module_name")]
    pub module_name: String,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            module_name: default_module_name(),
        }
    }
}

/// Settings for running generated tests.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExecutionConfig {
    /// Interpreter used to run pytest (default: "python3")
    #[serde(default = "default_python")]
    pub python: String,
    /// Timeout for one pytest run in seconds (default: 30)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            python: default_python(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Settings for the code formatters.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FormattingConfig {
    /// Maximum line length (default: 88)
    #[serde(default = "default_line_length")]
    pub line_length: usize,
}

impl Default for FormattingConfig {
    fn default() -> Self {
        Self {
            line_length: default_line_length(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_enabled_providers() -> Vec<String> {
    ProviderKind::ALL
        .iter()
        .map(|k| k.as_str().to_string())
        .collect()
}

fn default_security_providers() -> Vec<String> {
    vec![ProviderKind::Bandit.as_str().to_string()]
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_module_name() -> String {
    "module".to_string()
}

fn default_python() -> String {
    "python3".to_string()
}

fn default_line_length() -> usize {
    88
}

const PYTHON_KEYWORDS: &[&str] = &[
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class",
    "continue", "def", "del", "elif", "else", "except", "finally", "for", "from", "global",
    "if", "import", "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return",
    "try", "while", "with", "yield",
];

/// Whether `name` can follow `from` in a Python import (`pkg.sub.module`).
pub fn is_module_path(name: &str) -> bool {
    !name.is_empty()
        && name.split('.').all(|part| {
            let mut chars = part.chars();
            let starts_well = chars
                .next()
                .map(|c| c == '_' || c.is_alphabetic())
                .unwrap_or(false);
            starts_well
                && chars.all(|c| c == '_' || c.is_alphanumeric())
                && !PYTHON_KEYWORDS.contains(&part)
        })
}

/// Validate a config for correctness.
pub fn validate(config: &Config) -> anyhow::Result<()> {
    for (name, threshold) in [
        ("excessive_parameters", config.rules.max_parameters()),
        ("excessive_length", config.rules.max_function_lines()),
    ] {
        if threshold == Some(0) {
            anyhow::bail!("rules.{}.threshold must be greater than zero", name);
        }
    }

    for name in config
        .providers
        .enabled
        .iter()
        .chain(config.providers.security.iter())
    {
        if ProviderKind::parse(name).is_none() {
            anyhow::bail!(
                "unknown provider {:?}, expected one of: {}",
                name,
                ProviderKind::ALL
                    .iter()
                    .map(|k| k.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }
    }

    if config.providers.timeout_secs == 0 {
        anyhow::bail!("providers.timeout_secs must be greater than zero");
    }

    if !is_module_path(&config.synthesis.module_name) {
        anyhow::bail!(
            "synthesis.module_name {:?} is not an importable module path",
            config.synthesis.module_name
        );
    }

    if config.execution.timeout_secs == 0 {
        anyhow::bail!("execution.timeout_secs must be greater than zero");
    }

    if config.execution.python.trim().is_empty() {
        anyhow::bail!("execution.python must not be empty");
    }

    if config.formatting.line_length == 0 {
        anyhow::bail!("formatting.line_length must be greater than zero");
    }

    for pattern in &config.excluded_paths {
        globset::Glob::new(pattern)
            .map_err(|e| anyhow::anyhow!("invalid excluded_paths pattern {:?}: {}", pattern, e))?;
    }

    Ok(())
}
