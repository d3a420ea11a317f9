//! Structural rule evaluation over a [`SourceModel`].
//!
//! Evaluation is a fold: every visit returns its own [`Evaluation`] and the
//! caller merges children in source order. Nothing is accumulated through
//! shared state, so the same model always yields the same issues in the same
//! order.

use crate::config::RulesConfig;
use crate::syntax::{self, ClassDecl, FunctionDecl, ImportDecl, SourceModel, Statement, Stats};

use super::{Evaluation, Issue, IssueKind, Severity, SyntaxFailure};

/// Source name attached to structural issues.
pub const STRUCTURAL_SOURCE: &str = "ast";

/// Walks a source model and applies the structural rules.
pub struct RuleEngine {
    config: RulesConfig,
}

impl Default for RuleEngine {
    fn default() -> Self {
        Self::new(RulesConfig::default())
    }
}

impl RuleEngine {
    pub fn new(config: RulesConfig) -> Self {
        Self { config }
    }

    /// Evaluate every rule over the model.
    pub fn evaluate(&self, model: &SourceModel) -> Evaluation {
        let mut result = self.visit_block(&model.body);
        result.stats.lines = model.line_count;
        result
    }

    /// Parse and evaluate raw source.
    pub fn evaluate_source(&self, source: &str) -> Result<Evaluation, SyntaxFailure> {
        let model = syntax::parse(source)?;
        Ok(self.evaluate(&model))
    }

    fn visit_block(&self, body: &[Statement]) -> Evaluation {
        body.iter()
            .map(|stmt| self.visit_statement(stmt))
            .fold(Evaluation::new(), |mut acc, next| {
                acc.merge(next);
                acc
            })
    }

    fn visit_statement(&self, stmt: &Statement) -> Evaluation {
        match stmt {
            Statement::Function(f) => self.visit_function(f),
            Statement::Class(c) => self.visit_class(c),
            Statement::Import(i) => self.visit_import(i),
            Statement::Compound(c) => self.visit_block(&c.body),
            Statement::Raise(_) | Statement::Simple { .. } => Evaluation::new(),
        }
    }

    fn visit_function(&self, func: &FunctionDecl) -> Evaluation {
        let mut result = Evaluation {
            issues: Vec::new(),
            stats: Stats {
                functions: 1,
                ..Stats::default()
            },
        };

        if self.config.missing_documentation.enabled && func.description.is_none() {
            result.issues.push(structural_issue(
                IssueKind::MissingDocumentation,
                Severity::Info,
                func.line(),
                format!("Function '{}' missing docstring", func.name),
            ));
        }

        if let Some(max) = self.config.max_parameters() {
            let count = func.params.len();
            if count > max {
                result.issues.push(structural_issue(
                    IssueKind::ExcessiveParameters,
                    Severity::Warning,
                    func.line(),
                    format!(
                        "Function '{}' has {} parameters (>{})",
                        func.name, count, max
                    ),
                ));
            }
        }

        if let Some(max) = self.config.max_function_lines() {
            let length = func.span.length();
            if length > max {
                result.issues.push(structural_issue(
                    IssueKind::ExcessiveLength,
                    Severity::Warning,
                    func.line(),
                    format!(
                        "Function '{}' is {} lines long (>{})",
                        func.name, length, max
                    ),
                ));
            }
        }

        result.merge(self.visit_block(&func.body));
        result
    }

    fn visit_class(&self, class: &ClassDecl) -> Evaluation {
        let mut result = Evaluation {
            issues: Vec::new(),
            stats: Stats {
                classes: 1,
                ..Stats::default()
            },
        };

        if self.config.missing_documentation.enabled && class.description.is_none() {
            result.issues.push(structural_issue(
                IssueKind::MissingDocumentation,
                Severity::Info,
                class.line(),
                format!("Class '{}' missing docstring", class.name),
            ));
        }

        result.merge(self.visit_block(&class.body));
        result
    }

    fn visit_import(&self, import: &ImportDecl) -> Evaluation {
        let mut result = Evaluation {
            issues: Vec::new(),
            stats: Stats {
                imports: import.name_count,
                ..Stats::default()
            },
        };

        if self.config.wildcard_import.enabled && import.wildcard {
            result.issues.push(structural_issue(
                IssueKind::WildcardImport,
                Severity::Warning,
                import.line,
                format!(
                    "Wildcard import from {}",
                    import.module.as_deref().unwrap_or("None")
                ),
            ));
        }

        result
    }
}

fn structural_issue(kind: IssueKind, severity: Severity, line: usize, message: String) -> Issue {
    Issue {
        kind,
        severity,
        line,
        message,
        source: STRUCTURAL_SOURCE.to_string(),
    }
}

/// Parse `source` and evaluate it with `config`.
pub fn evaluate_structure(source: &str, config: &RulesConfig) -> Result<Evaluation, SyntaxFailure> {
    let result = RuleEngine::new(config.clone()).evaluate_source(source);
    if let Err(failure) = &result {
        tracing::debug!(line = failure.line, column = failure.column, "structural parse failed");
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ThresholdRule;

    fn evaluate(source: &str) -> Evaluation {
        RuleEngine::default().evaluate_source(source).unwrap()
    }

    fn kinds(result: &Evaluation) -> Vec<(IssueKind, usize)> {
        result.issues.iter().map(|i| (i.kind, i.line)).collect()
    }

    #[test]
    fn test_missing_docstring_function() {
        let result = evaluate("def f():\n    return 1\n");
        assert_eq!(kinds(&result), vec![(IssueKind::MissingDocumentation, 1)]);
        assert_eq!(result.issues[0].severity, Severity::Info);
        assert_eq!(result.issues[0].message, "Function 'f' missing docstring");
        assert_eq!(result.issues[0].source, "ast");
    }

    #[test]
    fn test_docstring_removes_issue() {
        let result = evaluate("def f():\n    \"\"\"Doc.\"\"\"\n    return 1\n");
        assert!(result.issues.is_empty());
        assert_eq!(result.stats.functions, 1);
    }

    #[test]
    fn test_class_and_method_docs_are_independent() {
        let source = r#"
class Calculator:
    """Arithmetic helpers."""

    def multiply(self, a, b):
        return a * b
"#;
        let result = evaluate(source);
        assert_eq!(kinds(&result), vec![(IssueKind::MissingDocumentation, 5)]);
        assert!(result.issues[0].message.contains("multiply"));

        let undocumented = source.replace("    \"\"\"Arithmetic helpers.\"\"\"\n", "");
        let result = evaluate(&undocumented);
        assert_eq!(
            kinds(&result),
            vec![
                (IssueKind::MissingDocumentation, 2),
                (IssueKind::MissingDocumentation, 4),
            ]
        );
        assert_eq!(result.issues[0].message, "Class 'Calculator' missing docstring");
    }

    #[test]
    fn test_too_many_parameters() {
        let source = "def f(a, b, c, d, e, f, g, h):\n    \"\"\"Doc.\"\"\"\n";
        let result = evaluate(source);
        assert_eq!(kinds(&result), vec![(IssueKind::ExcessiveParameters, 1)]);
        assert_eq!(result.issues[0].message, "Function 'f' has 8 parameters (>7)");
        assert_eq!(result.issues[0].severity, Severity::Warning);

        let seven = "def f(a, b, c, d, e, f, g):\n    \"\"\"Doc.\"\"\"\n";
        assert!(evaluate(seven).issues.is_empty());
    }

    #[test]
    fn test_long_function() {
        let mut source = String::from("def long():\n    \"\"\"Doc.\"\"\"\n");
        for i in 0..55 {
            source.push_str(&format!("    x{} = {}\n", i, i));
        }
        let result = evaluate(&source);
        assert_eq!(kinds(&result), vec![(IssueKind::ExcessiveLength, 1)]);
        assert_eq!(result.issues[0].message, "Function 'long' is 56 lines long (>50)");
    }

    #[test]
    fn test_trailing_comment_is_not_counted_as_length() {
        let mut source = String::from("def f():\n    \"\"\"Doc.\"\"\"\n");
        for i in 0..49 {
            source.push_str(&format!("    x{} = {}\n", i, i));
        }
        source.push_str("    # trailing\n");
        assert!(evaluate(&source).issues.is_empty());

        source.push_str("    x49 = 49\n");
        let result = evaluate(&source);
        assert_eq!(result.issues[0].message, "Function 'f' is 52 lines long (>50)");
    }

    #[test]
    fn test_python2_print_is_a_syntax_failure() {
        let failure = evaluate_structure("print \"hello\"\n", &RulesConfig::default()).unwrap_err();
        assert_eq!(failure.line, 1);
        assert_eq!(failure.stats.lines, 1);
    }

    #[test]
    fn test_wildcard_import_and_import_stats() {
        let source = "import os, sys\nfrom typing import List\nfrom os.path import *\n";
        let result = evaluate(source);
        assert_eq!(kinds(&result), vec![(IssueKind::WildcardImport, 3)]);
        assert_eq!(result.issues[0].message, "Wildcard import from os.path");
        assert_eq!(result.stats.imports, 4);
        assert_eq!(result.stats.lines, 3);
    }

    #[test]
    fn test_preorder_traversal_into_nested_scopes() {
        let source = r#"
class Outer:
    def method(self):
        def inner():
            pass

if True:
    def conditional():
        pass
"#;
        let result = evaluate(source);
        let lines: Vec<usize> = result.issues.iter().map(|i| i.line).collect();
        assert_eq!(lines, vec![2, 3, 4, 8]);
        assert_eq!(result.stats.functions, 3);
        assert_eq!(result.stats.classes, 1);
    }

    #[test]
    fn test_rules_can_be_disabled() {
        let mut config = RulesConfig::default();
        config.missing_documentation.enabled = false;
        config.wildcard_import.enabled = false;
        config.excessive_parameters = ThresholdRule {
            enabled: true,
            threshold: Some(1),
        };
        let engine = RuleEngine::new(config);
        let result = engine
            .evaluate_source("from os import *\n\ndef f(a, b):\n    pass\n")
            .unwrap();
        assert_eq!(kinds(&result), vec![(IssueKind::ExcessiveParameters, 3)]);
        assert_eq!(result.issues[0].message, "Function 'f' has 2 parameters (>1)");
    }

    #[test]
    fn test_evaluation_is_deterministic() {
        let source = "from x import *\ndef a():\n    pass\nclass B:\n    pass\n";
        assert_eq!(evaluate(source), evaluate(source));
    }

    #[test]
    fn test_syntax_failure_carries_line_count() {
        let failure = evaluate_structure("def f(\n", &RulesConfig::default()).unwrap_err();
        assert_eq!(failure.stats.lines, 1);
        assert_eq!(failure.stats.functions, 0);
    }

    #[test]
    fn test_empty_source() {
        let result = evaluate("");
        assert!(result.issues.is_empty());
        assert_eq!(result.stats, Stats::default());
    }
}
