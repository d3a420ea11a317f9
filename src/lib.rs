//! pyreview - Python code review and test skeleton generation.
//!
//! pyreview parses Python source with tree-sitter and derives two artifacts
//! from it: a catalogue of review findings, and pytest skeletons inferred
//! from function and class signatures. Heuristics are purely syntactic; the
//! analyzed code is never executed.
//!
//! # Architecture
//!
//! - `syntax`: typed model of a parsed source unit (tree-sitter lowering)
//! - `rules`: structural rules folded over the syntax model
//! - `signature`: normalized signatures of functions and methods
//! - `synth`: scenario synthesis and pytest rendering
//! - `providers`: external analyzers behind the `Provider` trait
//! - `report`: aggregation of structural and external findings, output
//! - `review`: concurrent provider fan-out for one review request
//! - `execution`: pytest runs in a temporary directory with coverage
//! - `formatting`: black/autopep8 formatter chain
//! - `config`: YAML configuration schema
//! - `cli`: command-line driver

pub mod cli;
pub mod config;
pub mod execution;
pub mod formatting;
pub mod providers;
pub mod report;
pub mod review;
pub mod rules;
pub mod signature;
pub mod synth;
pub mod syntax;

pub use config::Config;
pub use execution::{ModuleSource, TestRun, TestRunner};
pub use formatting::{format_code, CodeFormatter, FormatResult};
pub use providers::{Provider, ProviderFailure, ProviderKind, ProviderOutput, SourceUnit};
pub use report::{aggregate, AnalysisReport, ProviderResult, Summary};
pub use review::Reviewer;
pub use rules::{evaluate_structure, Evaluation, Issue, IssueKind, RuleEngine, Severity};
pub use signature::{extract_signatures, Parameter, Signature};
pub use synth::{generate_tests, synthesize, GeneratedTests, ScenarioKind, TestScenario};
pub use syntax::{Stats, SyntaxFailure};
