//! Test scenario synthesis from signatures.
//!
//! ```text
//! Signature ──▶ heuristics::argument_value (per parameter)
//!           ──▶ basic / edge_case / exception_check / type_validation
//!           ──▶ render (pytest source)
//! ```

mod heuristics;
mod render;

use std::collections::HashSet;

use crate::signature::{Parameter, Signature};

pub use heuristics::{argument_value, ArgValue};
pub use render::{generate_tests, render_module, GeneratedTests};

/// Marker passed to every argument of an exception check.
pub const INVALID_INPUT: &str = "invalid_input";

const WRONG_TYPE_STRING: &str = "\"wrong_type\"";
const WRONG_TYPE_NUMBER: &str = "123";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScenarioKind {
    Basic,
    EdgeCase,
    ExceptionCheck,
    TypeValidation,
}

impl ScenarioKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScenarioKind::Basic => "basic",
            ScenarioKind::EdgeCase => "edge_case",
            ScenarioKind::ExceptionCheck => "exception_check",
            ScenarioKind::TypeValidation => "type_validation",
        }
    }

    /// Whether the scenario's assertion can fail on a correct target.
    pub fn is_known_weak(&self) -> bool {
        matches!(self, ScenarioKind::TypeValidation)
    }
}

impl std::fmt::Display for ScenarioKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One generated test case. Borrows the signature it was built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestScenario<'s> {
    pub name: String,
    pub kind: ScenarioKind,
    pub target: &'s Signature,
    /// One-line docstring for the rendered test.
    pub doc: String,
    /// Statements of the test body, unindented.
    pub body: Vec<String>,
}

/// How a target is invoked from a test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Callee<'a> {
    Function,
    /// Called through a fresh instance: `Class().method(...)`.
    Method { class: &'a str },
}

impl Callee<'_> {
    fn call(&self, target: &str, args: &[String]) -> String {
        match self {
            Callee::Function => format!("{}({})", target, args.join(", ")),
            Callee::Method { class } => format!("{}().{}({})", class, target, args.join(", ")),
        }
    }
}

/// Hands out test names unique within one container.
#[derive(Debug, Default)]
pub struct NameAllocator {
    used: HashSet<String>,
}

impl NameAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// `base`, or `base_2`, `base_3`, ... if already taken.
    pub fn allocate(&mut self, base: &str) -> String {
        if self.used.insert(base.to_string()) {
            return base.to_string();
        }
        let mut n = 2;
        loop {
            let candidate = format!("{}_{}", base, n);
            if self.used.insert(candidate.clone()) {
                return candidate;
            }
            n += 1;
        }
    }
}

/// Scenarios for a standalone function.
pub fn synthesize(sig: &Signature) -> Vec<TestScenario<'_>> {
    synthesize_with(sig, Callee::Function, &mut NameAllocator::new())
}

/// Scenarios for `sig` called as `callee`, with names drawn from `names`.
pub fn synthesize_with<'s>(
    sig: &'s Signature,
    callee: Callee<'_>,
    names: &mut NameAllocator,
) -> Vec<TestScenario<'s>> {
    let params = call_parameters(sig, callee);
    let values: Vec<ArgValue> = params.iter().map(argument_value).collect();

    if !values.is_empty() && values.iter().all(|v| *v == ArgValue::Null) {
        tracing::debug!(target_name = %sig.name, "no parameter matched a heuristic, using None");
    }

    let mut scenarios = Vec::new();
    let call = |args: &[String]| callee.call(&sig.name, args);
    let literals: Vec<String> = values.iter().map(|v| v.literal().to_string()).collect();

    scenarios.push(TestScenario {
        name: names.allocate(&format!("test_{}_basic", sig.name)),
        kind: ScenarioKind::Basic,
        target: sig,
        doc: format!("Test {} with basic valid inputs.", sig.name),
        body: vec![
            format!("result = {}", call(&literals)),
            "assert result is not None".to_string(),
        ],
    });

    if values.contains(&ArgValue::Integer) {
        let edge: Vec<String> = values
            .iter()
            .map(|v| match v {
                ArgValue::Integer => "0".to_string(),
                other => other.literal().to_string(),
            })
            .collect();
        scenarios.push(TestScenario {
            name: names.allocate(&format!("test_{}_edge_case_zero", sig.name)),
            kind: ScenarioKind::EdgeCase,
            target: sig,
            doc: format!("Test {} with edge case: zero values.", sig.name),
            body: vec![
                format!("result = {}", call(&edge)),
                "assert result is not None".to_string(),
            ],
        });
    }

    let invalid: Vec<String> = params.iter().map(|_| INVALID_INPUT.to_string()).collect();
    for error in &sig.raised_errors {
        scenarios.push(TestScenario {
            name: names.allocate(&format!("test_{}_raises_{}", sig.name, name_fragment(error))),
            kind: ScenarioKind::ExceptionCheck,
            target: sig,
            doc: format!("Test {} raises {} appropriately.", sig.name, error),
            body: vec![
                format!("with pytest.raises({}):", error),
                format!("    {}", call(&invalid)),
            ],
        });
    }

    if params.iter().any(|p| p.type_annotation.is_some()) {
        let wrong: Vec<String> = values
            .iter()
            .map(|v| {
                if v.is_string_literal() {
                    WRONG_TYPE_NUMBER.to_string()
                } else {
                    WRONG_TYPE_STRING.to_string()
                }
            })
            .collect();
        scenarios.push(TestScenario {
            name: names.allocate(&format!("test_{}_type_validation", sig.name)),
            kind: ScenarioKind::TypeValidation,
            target: sig,
            doc: format!("Test {} with incorrect types.", sig.name),
            body: vec![
                "with pytest.raises((TypeError, ValueError, AttributeError)):".to_string(),
                format!("    {}", call(&wrong)),
            ],
        });
    }

    scenarios
}

/// Parameters that receive an argument. The receiver of a method does not.
fn call_parameters<'s>(sig: &'s Signature, callee: Callee<'_>) -> &'s [Parameter] {
    match (callee, sig.parameters.first()) {
        (Callee::Method { .. }, Some(first)) if first.name == "self" || first.name == "cls" => {
            &sig.parameters[1..]
        }
        _ => &sig.parameters,
    }
}

/// Lowercase an error name and replace non-identifier characters with `_`.
fn name_fragment(error: &str) -> String {
    error
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect()
}
