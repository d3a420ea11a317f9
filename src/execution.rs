//! Running pytest suites in a throwaway directory.
//!
//! The suite and the module under test are written to a fresh temporary
//! directory, pytest runs there with coverage when a module is given, and
//! the directory is removed when the run ends, whatever the outcome.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tempfile::TempDir;

use crate::config::ExecutionConfig;
use crate::providers::command::run_tool_in;
use crate::providers::ProviderFailure;

/// File name of the staged test suite.
pub const TEST_FILE: &str = "test_module.py";

const COVERAGE_FILE: &str = "coverage.json";

/// Code under test, importable as `module_name`.
#[derive(Debug, Clone, Copy)]
pub struct ModuleSource<'a> {
    pub module_name: &'a str,
    pub code: &'a str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    Passed,
    Failed,
}

/// Line coverage of the module under test.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Coverage {
    pub percent: Option<f64>,
    pub lines_covered: Option<u64>,
    pub lines_total: Option<u64>,
}

/// Result of one pytest run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestRun {
    pub status: TestStatus,
    pub returncode: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub coverage: Option<Coverage>,
}

impl TestRun {
    pub fn passed(&self) -> bool {
        self.status == TestStatus::Passed
    }
}

/// Runs pytest under a timeout.
#[derive(Debug, Clone)]
pub struct TestRunner {
    python: String,
    timeout: Duration,
}

impl Default for TestRunner {
    fn default() -> Self {
        Self::new(&ExecutionConfig::default())
    }
}

impl TestRunner {
    pub fn new(config: &ExecutionConfig) -> Self {
        Self {
            python: config.python.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Run `test_code`, importing `source` when given.
    ///
    /// A run that outlives the timeout is killed and reported as
    /// [`ProviderFailure::Timeout`].
    pub async fn run(
        &self,
        test_code: &str,
        source: Option<ModuleSource<'_>>,
    ) -> Result<TestRun, ProviderFailure> {
        let dir = TempDir::new()?;
        stage(dir.path(), test_code, source)?;

        let args = pytest_args(source.map(|s| s.module_name));
        let args: Vec<&str> = args.iter().map(String::as_str).collect();

        tracing::debug!(python = %self.python, timeout = ?self.timeout, "running pytest");
        let output = tokio::time::timeout(self.timeout, run_tool_in(dir.path(), &self.python, &args))
            .await
            .map_err(|_| ProviderFailure::Timeout)??;

        if output.stderr.contains("No module named pytest") {
            return Err(ProviderFailure::NotInstalled);
        }

        let coverage_path = dir.path().join(COVERAGE_FILE);
        let coverage = if coverage_path.exists() {
            Some(parse_coverage(&std::fs::read_to_string(&coverage_path)?)?)
        } else {
            None
        };

        Ok(TestRun {
            status: if output.code == Some(0) {
                TestStatus::Passed
            } else {
                TestStatus::Failed
            },
            returncode: output.code,
            stdout: output.stdout,
            stderr: output.stderr,
            coverage,
        })
    }
}

/// Write the suite and the module under test into `dir`.
///
/// A dotted module name is laid out as nested directories.
fn stage(dir: &Path, test_code: &str, source: Option<ModuleSource<'_>>) -> std::io::Result<()> {
    std::fs::write(dir.join(TEST_FILE), test_code)?;
    if let Some(source) = source {
        let path = module_path(dir, source.module_name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, source.code)?;
    }
    Ok(())
}

fn module_path(dir: &Path, module_name: &str) -> PathBuf {
    let mut path = dir.to_path_buf();
    path.extend(module_name.split('.'));
    path.set_extension("py");
    path
}

fn pytest_args(module_name: Option<&str>) -> Vec<String> {
    let mut args: Vec<String> = ["-m", "pytest", TEST_FILE, "-v", "--tb=short"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    if let Some(module) = module_name {
        args.push(format!("--cov={}", module));
        args.push("--cov-report=json".to_string());
    }
    args
}

#[derive(Deserialize)]
struct CoverageReport {
    #[serde(default)]
    totals: CoverageTotals,
}

#[derive(Default, Deserialize)]
struct CoverageTotals {
    percent_covered: Option<f64>,
    covered_lines: Option<u64>,
    num_statements: Option<u64>,
}

/// Reduce a coverage.py JSON report to its totals.
pub fn parse_coverage(json: &str) -> Result<Coverage, ProviderFailure> {
    let report: CoverageReport = serde_json::from_str(json)?;
    Ok(Coverage {
        percent: report.totals.percent_covered,
        lines_covered: report.totals.covered_lines,
        lines_total: report.totals.num_statements,
    })
}
