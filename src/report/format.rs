//! Output formatting for review results.
//!
//! Supports two output formats:
//! - Pretty: colored terminal output for human readability
//! - JSON: structured output for programmatic consumption

use std::io::{self, Write};

use colored::*;
use serde::Serialize;

use crate::execution::TestRun;
use crate::rules::{Issue, Severity};

use super::{AnalysisReport, ProviderResult, Summary};

/// A report together with the file it describes.
#[derive(Debug, Clone)]
pub struct ReviewedFile {
    pub path: String,
    pub report: AnalysisReport,
}

// =============================================================================
// JSON Format
// =============================================================================

#[derive(Serialize)]
pub struct JsonReport<'a> {
    pub version: &'static str,
    pub files_reviewed: usize,
    pub summary: Summary,
    pub files: Vec<JsonFile<'a>>,
}

#[derive(Serialize)]
pub struct JsonFile<'a> {
    pub path: &'a str,
    #[serde(flatten)]
    pub report: &'a AnalysisReport,
}

/// Build the JSON document for a set of reviewed files.
pub fn build_json_report(files: &[ReviewedFile]) -> JsonReport<'_> {
    JsonReport {
        version: env!("CARGO_PKG_VERSION"),
        files_reviewed: files.len(),
        summary: total_summary(files),
        files: files
            .iter()
            .map(|f| JsonFile {
                path: &f.path,
                report: &f.report,
            })
            .collect(),
    }
}

/// Write results in JSON format.
pub fn write_json<W: Write>(out: &mut W, files: &[ReviewedFile]) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(&build_json_report(files))?;
    writeln!(out, "{}", json)?;
    Ok(())
}

fn total_summary(files: &[ReviewedFile]) -> Summary {
    files.iter().fold(Summary::default(), |mut acc, f| {
        acc.total_issues += f.report.summary.total_issues;
        acc.critical += f.report.summary.critical;
        acc.warning += f.report.summary.warning;
        acc.info += f.report.summary.info;
        acc
    })
}

// =============================================================================
// Pretty Format
// =============================================================================

/// Write results in human-readable colored format.
pub fn write_pretty<W: Write>(out: &mut W, files: &[ReviewedFile]) -> io::Result<()> {
    writeln!(out)?;
    writeln!(
        out,
        "  {} v{}",
        "pyreview".cyan().bold(),
        env!("CARGO_PKG_VERSION")
    )?;
    writeln!(out)?;

    for file in files {
        write_file(out, file)?;
    }

    let total = total_summary(files);
    write_final_status(out, &total, files.len())?;
    writeln!(out)
}

fn write_file<W: Write>(out: &mut W, file: &ReviewedFile) -> io::Result<()> {
    let report = &file.report;
    let stats = report.stats();

    writeln!(out, "  {}{}", "File: ".dimmed(), file.path.blue())?;
    writeln!(
        out,
        "  {}",
        format!(
            "{} lines, {} functions, {} classes, {} imports",
            stats.lines, stats.functions, stats.classes, stats.imports
        )
        .dimmed()
    )?;

    if let Err(failure) = &report.structural {
        writeln!(out, "    {} {}", "ERROR".red(), failure)?;
    }
    writeln!(out)?;

    if !report.issues.is_empty() {
        writeln!(
            out,
            "  {} ({}):",
            "Issues".bold(),
            report.summary.total_issues
        )?;
        writeln!(out)?;
        for issue in &report.issues {
            write_issue(out, issue)?;
        }
    }

    if !report.by_source.is_empty() {
        writeln!(out, "  {}:", "Providers".bold())?;
        for (name, result) in &report.by_source {
            write!(out, "    {:<10}", name)?;
            match result {
                ProviderResult::Completed(output) => {
                    writeln!(out, "{}", format!("{} issues", output.count).green())?
                }
                ProviderResult::Failed { error } => writeln!(out, "{}", error.yellow())?,
            }
        }
        writeln!(out)?;
    }

    Ok(())
}

fn write_issue<W: Write>(out: &mut W, issue: &Issue) -> io::Result<()> {
    write_severity_tag(out, issue.severity)?;
    write!(out, "   {:<18}", issue.kind.as_str().dimmed())?;
    write!(out, "{}", issue.source.blue())?;
    if issue.line > 0 {
        write!(out, "{}", format!(":{}", issue.line).dimmed())?;
    }
    writeln!(out)?;
    writeln!(out, "            {}", issue.message)?;
    writeln!(out)
}

fn write_severity_tag<W: Write>(out: &mut W, severity: Severity) -> io::Result<()> {
    match severity {
        Severity::Critical => write!(out, "    {} ", "CRIT ".red()),
        Severity::Warning => write!(out, "    {} ", "WARN ".yellow()),
        Severity::Info => write!(out, "    {} ", "INFO ".blue()),
    }
}

fn write_final_status<W: Write>(out: &mut W, total: &Summary, files: usize) -> io::Result<()> {
    let status = if total.critical > 0 {
        "✗ CRITICAL ISSUES FOUND".red()
    } else {
        "✓ NO CRITICAL ISSUES".green()
    };
    writeln!(
        out,
        "  {}  {} files, {} issues ({} critical, {} warning, {} info)",
        status, files, total.total_issues, total.critical, total.warning, total.info
    )
}

// =============================================================================
// Test runs
// =============================================================================

/// Write a pytest run in human-readable colored format.
pub fn write_test_run<W: Write>(out: &mut W, run: &TestRun) -> io::Result<()> {
    let status = if run.passed() {
        "✓ TESTS PASSED".green()
    } else {
        "✗ TESTS FAILED".red()
    };
    match run.returncode {
        Some(code) => writeln!(out, "  {}  {}", status, format!("(exit {})", code).dimmed())?,
        None => writeln!(out, "  {}  {}", status, "(killed)".dimmed())?,
    }

    if let Some(coverage) = &run.coverage {
        let percent = coverage
            .percent
            .map(|p| format!("{:.1}%", p))
            .unwrap_or_else(|| "n/a".to_string());
        write!(out, "  {} {}", "Coverage:".bold(), percent)?;
        if let (Some(covered), Some(total)) = (coverage.lines_covered, coverage.lines_total) {
            write!(out, " {}", format!("({}/{} lines)", covered, total).dimmed())?;
        }
        writeln!(out)?;
    }

    writeln!(out)?;
    write!(out, "{}", run.stdout)?;
    if !run.passed() && !run.stderr.trim().is_empty() {
        write!(out, "{}", run.stderr)?;
    }
    Ok(())
}
