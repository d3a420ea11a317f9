//! Structural rules over the syntax model.

mod engine;
mod types;

pub use crate::syntax::SyntaxFailure;
pub use engine::{evaluate_structure, RuleEngine, STRUCTURAL_SOURCE};
pub use types::{Evaluation, Issue, IssueKind, Severity};
