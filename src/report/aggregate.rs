//! Merging structural and external findings into one report.

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

use crate::config::ProvidersConfig;
use crate::providers::{ExternalIssue, ProviderFailure, ProviderOutput};
use crate::rules::{Evaluation, Issue, IssueKind, Severity, SyntaxFailure};
use crate::syntax::Stats;

/// Terminal state of one requested provider.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ProviderResult {
    Completed(ProviderOutput),
    Failed { error: String },
}

impl ProviderResult {
    /// Issue count that contributes to the summary. Failures count zero.
    pub fn count(&self) -> usize {
        match self {
            ProviderResult::Completed(output) => output.count,
            ProviderResult::Failed { .. } => 0,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, ProviderResult::Failed { .. })
    }
}

impl From<Result<ProviderOutput, ProviderFailure>> for ProviderResult {
    fn from(result: Result<ProviderOutput, ProviderFailure>) -> Self {
        match result {
            Ok(output) => ProviderResult::Completed(output),
            Err(failure) => ProviderResult::Failed {
                error: failure.to_string(),
            },
        }
    }
}

/// Severity roll-up.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub total_issues: usize,
    pub critical: usize,
    pub warning: usize,
    pub info: usize,
}

impl Summary {
    fn bump(&mut self, severity: Severity) {
        match severity {
            Severity::Critical => self.critical += 1,
            Severity::Warning => self.warning += 1,
            Severity::Info => self.info += 1,
        }
    }
}

/// Unified result of one review request.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub summary: Summary,
    #[serde(serialize_with = "serialize_structural")]
    pub structural: Result<Evaluation, SyntaxFailure>,
    /// Every classified issue: structural first, then providers in request order.
    pub issues: Vec<Issue>,
    /// Raw provider results in request order.
    #[serde(serialize_with = "serialize_ordered")]
    pub by_source: Vec<(String, ProviderResult)>,
}

impl AnalysisReport {
    pub fn has_critical(&self) -> bool {
        self.summary.critical > 0
    }

    pub fn source(&self, name: &str) -> Option<&ProviderResult> {
        self.by_source
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, r)| r)
    }

    pub fn stats(&self) -> Stats {
        match &self.structural {
            Ok(evaluation) => evaluation.stats,
            Err(failure) => failure.stats,
        }
    }
}

/// Classifies provider issues and builds reports.
#[derive(Debug, Clone)]
pub struct ReportAggregator {
    providers: ProvidersConfig,
}

impl Default for ReportAggregator {
    fn default() -> Self {
        Self::new(&ProvidersConfig::default())
    }
}

impl ReportAggregator {
    pub fn new(config: &ProvidersConfig) -> Self {
        Self {
            providers: config.clone(),
        }
    }

    /// Severity of an issue reported by `provider`.
    ///
    /// Security providers are always critical. Other providers keep their own
    /// severity, capped at warning, and default to warning.
    pub fn classify(&self, provider: &str, issue: &ExternalIssue) -> Severity {
        if self.providers.is_security(provider) {
            return Severity::Critical;
        }
        issue
            .severity
            .map(|s| s.min(Severity::Warning))
            .unwrap_or(Severity::Warning)
    }

    pub fn aggregate(
        &self,
        structural: Result<Evaluation, SyntaxFailure>,
        external: Vec<(String, ProviderResult)>,
    ) -> AnalysisReport {
        let mut summary = Summary::default();
        let mut issues: Vec<Issue> = match &structural {
            Ok(evaluation) => evaluation.issues.clone(),
            Err(_) => Vec::new(),
        };
        summary.total_issues = issues.len();

        for (name, result) in &external {
            summary.total_issues += result.count();
            if let ProviderResult::Completed(output) = result {
                issues.extend(output.issues.iter().map(|issue| Issue {
                    kind: IssueKind::External,
                    severity: self.classify(name, issue),
                    line: issue.line.unwrap_or(0),
                    message: match &issue.code {
                        Some(code) => format!("{} {}", code, issue.message),
                        None => issue.message.clone(),
                    },
                    source: name.clone(),
                }));
            }
        }

        for issue in &issues {
            summary.bump(issue.severity);
        }

        AnalysisReport {
            summary,
            structural,
            issues,
            by_source: external,
        }
    }
}

/// Aggregate with the default security classification.
pub fn aggregate(
    structural: Result<Evaluation, SyntaxFailure>,
    external: Vec<(String, ProviderResult)>,
) -> AnalysisReport {
    ReportAggregator::default().aggregate(structural, external)
}

#[derive(Serialize)]
#[serde(untagged)]
enum StructuralView<'a> {
    Evaluated {
        issues: &'a [Issue],
        stats: &'a Stats,
        count: usize,
    },
    Failed {
        error: String,
        line: usize,
        column: usize,
        stats: &'a Stats,
    },
}

fn serialize_structural<S: Serializer>(
    structural: &Result<Evaluation, SyntaxFailure>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    let view = match structural {
        Ok(evaluation) => StructuralView::Evaluated {
            issues: &evaluation.issues,
            stats: &evaluation.stats,
            count: evaluation.issues.len(),
        },
        Err(failure) => StructuralView::Failed {
            error: format!("Syntax error: {}", failure),
            line: failure.line,
            column: failure.column,
            stats: &failure.stats,
        },
    };
    view.serialize(serializer)
}

fn serialize_ordered<S: Serializer>(
    entries: &[(String, ProviderResult)],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(entries.len()))?;
    for (name, result) in entries {
        map.serialize_entry(name, result)?;
    }
    map.end()
}
