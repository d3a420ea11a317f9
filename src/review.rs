//! The `code_review` request: structural rules plus external providers.
//!
//! Structural evaluation runs synchronously. Providers run concurrently, each
//! under its own timeout, and the report is built once every provider has
//! reached a terminal state.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tracing::{debug, warn};

use crate::config::{Config, RulesConfig};
use crate::providers::{default_providers, Provider, ProviderFailure, SourceUnit};
use crate::report::{AnalysisReport, ProviderResult, ReportAggregator};
use crate::rules::{evaluate_structure, STRUCTURAL_SOURCE};

/// Runs review requests against a fixed set of providers.
pub struct Reviewer {
    rules: RulesConfig,
    providers: Vec<Arc<dyn Provider>>,
    aggregator: ReportAggregator,
    timeout: Duration,
}

impl Reviewer {
    /// A reviewer with one adapter per known tool.
    pub fn new(config: &Config) -> Self {
        Self {
            rules: config.rules.clone(),
            providers: default_providers(),
            aggregator: ReportAggregator::new(&config.providers),
            timeout: Duration::from_secs(config.providers.timeout_secs),
        }
    }

    /// Replace the available providers.
    pub fn with_providers(mut self, providers: Vec<Arc<dyn Provider>>) -> Self {
        self.providers = providers;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Review `source`, invoking the providers named in `requested`.
    ///
    /// Providers run in no particular order but are reported in request
    /// order. Unknown names and repeats are ignored; the structural pass
    /// always runs, so naming it is accepted and has no effect.
    pub async fn review(&self, source: &str, requested: &[String]) -> AnalysisReport {
        let structural = evaluate_structure(source, &self.rules);
        let unit = SourceUnit::new(source);

        let selected = self.select(requested);
        let runs = selected.iter().map(|provider| self.run_provider(provider.as_ref(), &unit));
        let external: Vec<(String, ProviderResult)> = join_all(runs).await;

        self.aggregator.aggregate(structural, external)
    }

    fn select(&self, requested: &[String]) -> Vec<Arc<dyn Provider>> {
        let mut selected: Vec<Arc<dyn Provider>> = Vec::new();
        for name in requested {
            if name == STRUCTURAL_SOURCE || selected.iter().any(|p| p.name() == name) {
                continue;
            }
            match self.providers.iter().find(|p| p.name() == name) {
                Some(provider) => selected.push(Arc::clone(provider)),
                None => warn!(provider = %name, "unknown provider requested, skipping"),
            }
        }
        selected
    }

    async fn run_provider(
        &self,
        provider: &dyn Provider,
        unit: &SourceUnit,
    ) -> (String, ProviderResult) {
        let name = provider.name().to_string();
        debug!(provider = %name, "provider started");

        let result = match tokio::time::timeout(self.timeout, provider.invoke(unit)).await {
            Ok(result) => result,
            Err(_) => Err(ProviderFailure::Timeout),
        };

        match &result {
            Ok(output) => debug!(provider = %name, count = output.count, "provider finished"),
            Err(e) => warn!(provider = %name, error = %e, "provider failed"),
        }

        (name, ProviderResult::from(result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{ExternalIssue, ProviderOutput};
    use crate::rules::Severity;
    use async_trait::async_trait;
    use std::time::Instant;

    struct FakeProvider {
        name: &'static str,
        delay: Duration,
        result: Result<ProviderOutput, ProviderFailure>,
    }

    impl FakeProvider {
        fn completed(name: &'static str, issues: usize) -> Arc<dyn Provider> {
            let issues = (0..issues)
                .map(|i| ExternalIssue {
                    line: Some(i + 1),
                    column: None,
                    code: None,
                    message: format!("{} finding {}", name, i),
                    severity: None,
                })
                .collect();
            Arc::new(FakeProvider {
                name,
                delay: Duration::ZERO,
                result: Ok(ProviderOutput::from_issues(issues)),
            })
        }

        fn failing(name: &'static str, failure: ProviderFailure) -> Arc<dyn Provider> {
            Arc::new(FakeProvider {
                name,
                delay: Duration::ZERO,
                result: Err(failure),
            })
        }

        fn slow(name: &'static str, delay: Duration) -> Arc<dyn Provider> {
            Arc::new(FakeProvider {
                name,
                delay,
                result: Ok(ProviderOutput::default()),
            })
        }
    }

    #[async_trait]
    impl Provider for FakeProvider {
        fn name(&self) -> &str {
            self.name
        }

        async fn invoke(&self, _unit: &SourceUnit) -> Result<ProviderOutput, ProviderFailure> {
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.result.clone()
        }
    }

    fn requested(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    fn reviewer(providers: Vec<Arc<dyn Provider>>) -> Reviewer {
        Reviewer::new(&Config::default()).with_providers(providers)
    }

    const SOURCE: &str = "def f(x):\n    return x\n";

    #[tokio::test]
    async fn test_review_merges_structural_and_external() {
        let reviewer = reviewer(vec![
            FakeProvider::completed("flake8", 2),
            FakeProvider::completed("bandit", 1),
        ]);
        let report = reviewer
            .review(SOURCE, &requested(&["flake8", "bandit"]))
            .await;

        assert_eq!(report.summary.total_issues, 4);
        assert_eq!(report.summary.info, 1);
        assert_eq!(report.summary.warning, 2);
        assert_eq!(report.summary.critical, 1);
        assert_eq!(report.issues[0].source, "ast");
        assert_eq!(report.issues[3].severity, Severity::Critical);
    }

    #[tokio::test]
    async fn test_failed_provider_does_not_fail_request() {
        let reviewer = reviewer(vec![
            FakeProvider::failing("pylint", ProviderFailure::NotInstalled),
            FakeProvider::completed("mypy", 1),
        ]);
        let report = reviewer
            .review(SOURCE, &requested(&["pylint", "mypy"]))
            .await;

        assert_eq!(report.summary.total_issues, 2);
        assert_eq!(
            report.source("pylint"),
            Some(&ProviderResult::Failed {
                error: "Not installed".to_string()
            })
        );
        assert_eq!(report.source("mypy").map(|r| r.count()), Some(1));
    }

    #[tokio::test]
    async fn test_timeout_is_isolated() {
        let reviewer = reviewer(vec![
            FakeProvider::slow("radon", Duration::from_secs(10)),
            FakeProvider::completed("flake8", 1),
        ])
        .with_timeout(Duration::from_millis(50));

        let report = reviewer
            .review(SOURCE, &requested(&["radon", "flake8"]))
            .await;

        assert_eq!(
            report.source("radon"),
            Some(&ProviderResult::Failed {
                error: "Timeout".to_string()
            })
        );
        assert_eq!(report.source("flake8").map(|r| r.count()), Some(1));
        assert_eq!(report.summary.total_issues, 2);
    }

    #[tokio::test]
    async fn test_providers_run_concurrently() {
        let delay = Duration::from_millis(300);
        let reviewer = reviewer(vec![
            FakeProvider::slow("pylint", delay),
            FakeProvider::slow("mypy", delay),
            FakeProvider::slow("radon", delay),
        ]);
        let started = Instant::now();
        reviewer
            .review(SOURCE, &requested(&["pylint", "mypy", "radon"]))
            .await;
        assert!(started.elapsed() < Duration::from_millis(850));
    }

    #[tokio::test]
    async fn test_request_order_and_selection() {
        let reviewer = reviewer(vec![
            FakeProvider::completed("pylint", 0),
            FakeProvider::completed("flake8", 0),
            FakeProvider::completed("radon", 0),
        ]);
        let report = reviewer
            .review(
                SOURCE,
                &requested(&["radon", "ast", "pyflakes", "pylint", "radon"]),
            )
            .await;
        let names: Vec<&str> = report.by_source.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["radon", "pylint"]);
        assert!(report.source("flake8").is_none());
    }

    #[tokio::test]
    async fn test_unparsable_source_still_runs_providers() {
        let reviewer = reviewer(vec![FakeProvider::completed("flake8", 1)]);
        let report = reviewer
            .review("def broken(:\n", &requested(&["flake8"]))
            .await;
        assert!(report.structural.is_err());
        assert_eq!(report.stats().lines, 1);
        assert_eq!(report.summary.total_issues, 1);
    }
}
