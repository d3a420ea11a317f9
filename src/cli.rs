//! Command-line interface for pyreview.

use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::{self, Config};
use crate::execution::{ModuleSource, TestRunner};
use crate::formatting::CodeFormatter;
use crate::report::{self, ReviewedFile};
use crate::review::Reviewer;
use crate::synth;

/// Exit codes.
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILED: i32 = 1;
pub const EXIT_ERROR: i32 = 2;

/// Directories never worth scanning.
const SKIPPED_DIRS: &[&str] = &[
    "__pycache__",
    "node_modules",
    "venv",
    "site-packages",
    "build",
    "dist",
];

/// Python code review and pytest skeleton generation.
///
/// pyreview combines structural checks on the syntax tree with the output of
/// external analyzers (pylint, flake8, mypy, bandit, radon), and can derive
/// pytest test skeletons from function and class signatures.
#[derive(Parser)]
#[command(name = "pyreview")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Review Python source with structural rules and external analyzers
    Review(ReviewArgs),
    /// Generate pytest skeletons from a Python source file
    #[command(name = "gen-tests")]
    GenTests(GenTestsArgs),
    /// Run a pytest file in a temporary directory, with coverage
    #[command(name = "run-tests")]
    RunTests(RunTestsArgs),
    /// Format Python source with black (or autopep8)
    Format(FormatArgs),
}

/// Arguments for the review command.
#[derive(Parser)]
pub struct ReviewArgs {
    /// Path to review (file or directory)
    pub path: PathBuf,

    /// Path to config YAML file (default: auto-discover)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Output format: pretty or json
    #[arg(short, long, default_value = "pretty")]
    pub format: String,

    /// Comma-separated providers to run, in report order (default: from config)
    #[arg(short, long, value_delimiter = ',')]
    pub providers: Option<Vec<String>>,

    /// Run structural rules only
    #[arg(long, conflicts_with = "providers")]
    pub no_providers: bool,

    /// Per-provider timeout in seconds (default: from config)
    #[arg(short, long)]
    pub timeout: Option<u64>,
}

/// Arguments for the gen-tests command.
#[derive(Parser)]
pub struct GenTestsArgs {
    /// Python source file
    pub path: PathBuf,

    /// Module name used in the generated import (default: from config)
    #[arg(short, long)]
    pub module: Option<String>,

    /// Write the tests to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Path to config YAML file (default: auto-discover)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

/// Arguments for the run-tests command.
#[derive(Parser)]
pub struct RunTestsArgs {
    /// Pytest file to run
    pub path: PathBuf,

    /// Source file under test, measured for coverage
    #[arg(short, long)]
    pub source: Option<PathBuf>,

    /// Module name the tests import the source as (default: from config)
    #[arg(short, long)]
    pub module: Option<String>,

    /// Timeout in seconds (default: from config)
    #[arg(short, long)]
    pub timeout: Option<u64>,

    /// Output format: pretty or json
    #[arg(short, long, default_value = "pretty")]
    pub format: String,

    /// Path to config YAML file (default: auto-discover)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

/// Arguments for the format command.
#[derive(Parser)]
pub struct FormatArgs {
    /// Python source file
    pub path: PathBuf,

    /// Maximum line length (default: from config)
    #[arg(short, long)]
    pub line_length: Option<usize>,

    /// Rewrite the file in place instead of printing to stdout
    #[arg(short, long)]
    pub write: bool,

    /// Path to config YAML file (default: auto-discover)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

/// Load an explicit config, or discover one in the working directory.
fn load_config(explicit: Option<&Path>) -> anyhow::Result<Config> {
    let path = match explicit {
        Some(p) => Some(p.to_path_buf()),
        None => Config::discover(Path::new(".")),
    };

    let config = match path {
        Some(p) => Config::parse_file(&p)
            .map_err(|e| anyhow::anyhow!("cannot parse config {}: {}", p.display(), e))?,
        None => Config::default(),
    };
    config::validate(&config)?;
    Ok(config)
}

/// Collect Python files under `root`.
fn collect_files(root: &Path, config: &Config) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_entry(|e| {
            if !e.file_type().is_dir() || e.depth() == 0 {
                return true;
            }
            let name = e.file_name().to_string_lossy();
            !name.starts_with('.') && !SKIPPED_DIRS.contains(&&*name)
        })
    {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let is_python = path.extension().and_then(|e| e.to_str()) == Some("py");
        if is_python && !config.is_path_excluded(path) {
            files.push(path.to_path_buf());
        }
    }

    files.sort();
    Ok(files)
}

/// Read a source file, replacing invalid UTF-8 rather than failing.
fn read_source(path: &Path) -> std::io::Result<String> {
    let bytes = std::fs::read(path)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Module name from the command line, or the configured one.
fn module_name<'a>(explicit: Option<&'a str>, config: &'a Config) -> Result<&'a str, String> {
    let name = explicit.unwrap_or(&config.synthesis.module_name);
    if config::is_module_path(name) {
        Ok(name)
    } else {
        Err(format!("{:?} is not an importable module path", name))
    }
}

/// Run the review command.
pub fn run_review(args: &ReviewArgs) -> anyhow::Result<i32> {
    if args.format != "pretty" && args.format != "json" {
        eprintln!(
            "Error: invalid format {:?}, must be 'pretty' or 'json'",
            args.format
        );
        return Ok(EXIT_ERROR);
    }

    let mut config = match load_config(args.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            return Ok(EXIT_ERROR);
        }
    };

    if let Some(timeout) = args.timeout {
        if timeout == 0 {
            eprintln!("Error: --timeout must be greater than zero");
            return Ok(EXIT_ERROR);
        }
        config.providers.timeout_secs = timeout;
    }

    let requested: Vec<String> = if args.no_providers {
        Vec::new()
    } else {
        args.providers
            .clone()
            .unwrap_or_else(|| config.providers.enabled.clone())
    };

    let metadata = match std::fs::metadata(&args.path) {
        Ok(m) => m,
        Err(e) => {
            eprintln!("Error: cannot access path {:?}: {}", args.path, e);
            return Ok(EXIT_ERROR);
        }
    };

    let files = if metadata.is_dir() {
        collect_files(&args.path, &config)?
    } else {
        vec![args.path.clone()]
    };

    if files.is_empty() {
        eprintln!("Warning: no Python files to review");
        return Ok(EXIT_SUCCESS);
    }

    let reviewer = Reviewer::new(&config);
    let runtime = tokio::runtime::Runtime::new()?;

    let mut reviewed = Vec::with_capacity(files.len());
    for file in &files {
        let source = match read_source(file) {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(path = %file.display(), error = %e, "skipping unreadable file");
                eprintln!("Warning: skipping {}: {}", file.display(), e);
                continue;
            }
        };
        let report = runtime.block_on(reviewer.review(&source, &requested));
        reviewed.push(ReviewedFile {
            path: file.to_string_lossy().to_string(),
            report,
        });
    }

    let mut stdout = std::io::stdout().lock();
    match args.format.as_str() {
        "json" => report::write_json(&mut stdout, &reviewed)?,
        _ => report::write_pretty(&mut stdout, &reviewed)?,
    }

    if reviewed.iter().any(|f| f.report.has_critical()) {
        Ok(EXIT_FAILED)
    } else {
        Ok(EXIT_SUCCESS)
    }
}

/// Run the gen-tests command.
pub fn run_gen_tests(args: &GenTestsArgs) -> anyhow::Result<i32> {
    let config = match load_config(args.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            return Ok(EXIT_ERROR);
        }
    };

    let source = match read_source(&args.path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: cannot read {:?}: {}", args.path, e);
            return Ok(EXIT_ERROR);
        }
    };

    let module_name = match module_name(args.module.as_deref(), &config) {
        Ok(name) => name,
        Err(e) => {
            eprintln!("Error: {}", e);
            return Ok(EXIT_ERROR);
        }
    };

    let generated = match synth::generate_tests(&source, module_name) {
        Ok(g) => g,
        Err(failure) => {
            println!("# Syntax error in source code: {}", failure);
            return Ok(EXIT_FAILED);
        }
    };

    match &args.output {
        Some(path) => {
            if let Err(e) = std::fs::write(path, &generated.code) {
                eprintln!("Error: failed to write tests: {}", e);
                return Ok(EXIT_ERROR);
            }
            println!(
                "Wrote {} test scenarios ({} lines) to {}",
                generated.scenarios,
                generated.lines,
                path.display()
            );
        }
        None => print!("{}", generated.code),
    }

    Ok(EXIT_SUCCESS)
}

/// Run the run-tests command.
pub fn run_run_tests(args: &RunTestsArgs) -> anyhow::Result<i32> {
    if args.format != "pretty" && args.format != "json" {
        eprintln!(
            "Error: invalid format {:?}, must be 'pretty' or 'json'",
            args.format
        );
        return Ok(EXIT_ERROR);
    }

    let mut config = match load_config(args.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            return Ok(EXIT_ERROR);
        }
    };
    if let Some(timeout) = args.timeout {
        if timeout == 0 {
            eprintln!("Error: --timeout must be greater than zero");
            return Ok(EXIT_ERROR);
        }
        config.execution.timeout_secs = timeout;
    }

    let test_code = match read_source(&args.path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: cannot read {:?}: {}", args.path, e);
            return Ok(EXIT_ERROR);
        }
    };
    let source_code = match &args.source {
        Some(path) => match read_source(path) {
            Ok(s) => Some(s),
            Err(e) => {
                eprintln!("Error: cannot read {:?}: {}", path, e);
                return Ok(EXIT_ERROR);
            }
        },
        None => None,
    };
    let module_name = match module_name(args.module.as_deref(), &config) {
        Ok(name) => name,
        Err(e) => {
            eprintln!("Error: {}", e);
            return Ok(EXIT_ERROR);
        }
    };
    let source = source_code.as_deref().map(|code| ModuleSource { module_name, code });

    let runner = TestRunner::new(&config.execution);
    let runtime = tokio::runtime::Runtime::new()?;
    let run = match runtime.block_on(runner.run(&test_code, source)) {
        Ok(run) => run,
        Err(e) => {
            if args.format == "json" {
                println!("{}", serde_json::json!({ "error": e.to_string() }));
            } else {
                eprintln!("Error: test execution failed: {}", e);
            }
            return Ok(EXIT_ERROR);
        }
    };

    let mut stdout = std::io::stdout().lock();
    match args.format.as_str() {
        "json" => writeln!(stdout, "{}", serde_json::to_string_pretty(&run)?)?,
        _ => report::write_test_run(&mut stdout, &run)?,
    }

    Ok(if run.passed() { EXIT_SUCCESS } else { EXIT_FAILED })
}

/// Run the format command.
pub fn run_format(args: &FormatArgs) -> anyhow::Result<i32> {
    let config = match load_config(args.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            return Ok(EXIT_ERROR);
        }
    };
    if args.line_length == Some(0) {
        eprintln!("Error: --line-length must be greater than zero");
        return Ok(EXIT_ERROR);
    }

    let code = match read_source(&args.path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: cannot read {:?}: {}", args.path, e);
            return Ok(EXIT_ERROR);
        }
    };

    let formatter = CodeFormatter::new(&config.formatting)
        .with_line_length(args.line_length.unwrap_or(config.formatting.line_length));
    let runtime = tokio::runtime::Runtime::new()?;
    let result = runtime.block_on(formatter.format(&code));

    for error in &result.errors {
        eprintln!("Warning: {}", error);
    }

    if args.write {
        if result.changes {
            std::fs::write(&args.path, &result.formatted_code)?;
            println!("Formatted {}", args.path.display());
        } else {
            println!("{} unchanged", args.path.display());
        }
    } else {
        print!("{}", result.formatted_code);
    }

    Ok(EXIT_SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_collect_files_skips_hidden_and_vendor_dirs() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("pkg")).unwrap();
        fs::create_dir_all(root.join(".git")).unwrap();
        fs::create_dir_all(root.join("venv/lib")).unwrap();
        fs::create_dir_all(root.join("__pycache__")).unwrap();
        fs::write(root.join("app.py"), "x = 1\n").unwrap();
        fs::write(root.join("pkg/util.py"), "y = 2\n").unwrap();
        fs::write(root.join("pkg/notes.txt"), "").unwrap();
        fs::write(root.join(".git/hook.py"), "").unwrap();
        fs::write(root.join("venv/lib/site.py"), "").unwrap();
        fs::write(root.join("__pycache__/app.py"), "").unwrap();

        let files = collect_files(root, &Config::default()).unwrap();
        let names: Vec<String> = files
            .iter()
            .map(|p| p.strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/"))
            .collect();
        assert_eq!(names, vec!["app.py", "pkg/util.py"]);
    }

    #[test]
    fn test_collect_files_honors_excluded_paths() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("migrations")).unwrap();
        fs::write(root.join("app.py"), "").unwrap();
        fs::write(root.join("migrations/0001.py"), "").unwrap();

        let config = Config {
            excluded_paths: vec!["**/migrations/**".to_string()],
            ..Config::default()
        };
        let files = collect_files(root, &config).unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("app.py"));
    }

    #[test]
    fn test_read_source_tolerates_invalid_utf8() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("latin1.py");
        fs::write(&path, b"name = 'caf\xe9'\n").unwrap();
        let source = read_source(&path).unwrap();
        assert_eq!(source, "name = 'caf\u{FFFD}'\n");
    }

    #[test]
    fn test_module_name_must_be_importable() {
        let config = Config::default();
        assert_eq!(module_name(None, &config), Ok("module"));
        assert_eq!(module_name(Some("pkg.calc"), &config), Ok("pkg.calc"));
        assert!(module_name(Some("my-module"), &config).is_err());
    }

    #[test]
    fn test_gen_tests_rejects_bad_module_name() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("calc.py");
        fs::write(&path, "def add(a, b):\n    return a + b\n").unwrap();
        let config = dir.path().join("pyreview.yaml");
        fs::write(&config, "{}\n").unwrap();
        let output = dir.path().join("test_calc.py");
        let args = GenTestsArgs {
            path,
            module: Some("my-module".to_string()),
            output: Some(output.clone()),
            config: Some(config),
        };
        assert_eq!(run_gen_tests(&args).unwrap(), EXIT_ERROR);
        assert!(!output.exists());

        let args = GenTestsArgs {
            module: Some("calc".to_string()),
            ..args
        };
        assert_eq!(run_gen_tests(&args).unwrap(), EXIT_SUCCESS);
        assert!(fs::read_to_string(&output).unwrap().contains("from calc import *"));
    }

    #[test]
    fn test_run_tests_without_interpreter_is_an_error() {
        let dir = TempDir::new().unwrap();
        let config = dir.path().join("pyreview.yaml");
        fs::write(&config, "execution:\n  python: pyreview-no-such-python\n").unwrap();
        let tests = dir.path().join("test_calc.py");
        fs::write(&tests, "def test_ok():\n    assert True\n").unwrap();

        let args = RunTestsArgs {
            path: tests,
            source: None,
            module: None,
            timeout: Some(5),
            format: "pretty".to_string(),
            config: Some(config),
        };
        assert_eq!(run_run_tests(&args).unwrap(), EXIT_ERROR);
    }

    #[test]
    fn test_format_rejects_zero_line_length() {
        let dir = TempDir::new().unwrap();
        let config = dir.path().join("pyreview.yaml");
        fs::write(&config, "{}\n").unwrap();
        let path = dir.path().join("app.py");
        fs::write(&path, "x=1\n").unwrap();
        let args = FormatArgs {
            path: path.clone(),
            line_length: Some(0),
            write: true,
            config: Some(config),
        };
        assert_eq!(run_format(&args).unwrap(), EXIT_ERROR);
        assert_eq!(fs::read_to_string(&path).unwrap(), "x=1\n");
    }

    #[test]
    fn test_load_explicit_config() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pyreview.yaml");
        fs::write(&path, "synthesis:\n  module_name: calc\n").unwrap();
        let config = load_config(Some(path.as_path())).unwrap();
        assert_eq!(config.synthesis.module_name, "calc");

        fs::write(&path, "providers:\n  enabled: [pyflakes]\n").unwrap();
        assert!(load_config(Some(path.as_path())).is_err());
    }
}
