//! Rendering of scenarios as a pytest module.

use serde::Serialize;

use crate::signature::{extract_targets, MethodTarget, TestTarget};
use crate::syntax::SyntaxFailure;

use super::{synthesize_with, Callee, NameAllocator, ScenarioKind, TestScenario, INVALID_INPUT};

const INDENT: &str = "    ";

const KNOWN_WEAK_NOTE: &str =
    "# Known weak: a permissive target may accept these arguments and not raise.";

/// Generated pytest source plus metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedTests {
    pub code: String,
    pub lines: usize,
    pub scenarios: usize,
}

/// Parse `source` and render tests that import it as `module_name`.
pub fn generate_tests(source: &str, module_name: &str) -> Result<GeneratedTests, SyntaxFailure> {
    let targets = extract_targets(source)?;
    Ok(render_module(&targets, module_name))
}

/// Render every eligible target as pytest source.
pub fn render_module(targets: &[TestTarget], module_name: &str) -> GeneratedTests {
    let mut module_names = NameAllocator::new();
    let mut blocks: Vec<Vec<String>> = Vec::new();
    let mut scenario_count = 0;
    let mut needs_marker = false;

    for target in targets {
        match target {
            TestTarget::Function {
                signature,
                is_async,
                private,
            } => {
                if *private || *is_async {
                    continue;
                }
                let scenarios = synthesize_with(signature, Callee::Function, &mut module_names);
                needs_marker |= has_exception_check(&scenarios);
                scenario_count += scenarios.len();
                blocks.extend(scenarios.iter().map(|s| render_scenario(s, "", false)));
            }
            TestTarget::Class { name, methods } => {
                let eligible: Vec<&MethodTarget> = methods
                    .iter()
                    .filter(|m| !m.private && !m.is_async)
                    .collect();
                if eligible.is_empty() {
                    continue;
                }

                let container = module_names.allocate(&format!("Test{}", name));
                let mut container_names = NameAllocator::new();
                let mut block = vec![
                    format!("class {}:", container),
                    format!("{}\"\"\"Tests for {} class.\"\"\"", INDENT, name),
                ];
                for method in eligible {
                    let scenarios = synthesize_with(
                        &method.signature,
                        Callee::Method { class: name },
                        &mut container_names,
                    );
                    needs_marker |= has_exception_check(&scenarios);
                    scenario_count += scenarios.len();
                    for scenario in &scenarios {
                        block.push(String::new());
                        block.extend(render_scenario(scenario, INDENT, true));
                    }
                }
                blocks.push(block);
            }
        }
    }

    let mut lines = vec![
        "import pytest".to_string(),
        format!("from {} import *", module_name),
        String::new(),
        "# Auto-generated tests by pyreview".to_string(),
        "# Review and customize as needed".to_string(),
    ];
    if needs_marker {
        lines.push(String::new());
        lines.push(format!("{} = object()", INVALID_INPUT));
    }
    for block in blocks {
        lines.push(String::new());
        lines.push(String::new());
        lines.extend(block);
    }

    let mut code = lines.join("\n");
    code.push('\n');

    GeneratedTests {
        lines: code.lines().count(),
        code,
        scenarios: scenario_count,
    }
}

fn has_exception_check(scenarios: &[TestScenario]) -> bool {
    scenarios
        .iter()
        .any(|s| s.kind == ScenarioKind::ExceptionCheck)
}

fn render_scenario(scenario: &TestScenario, indent: &str, method: bool) -> Vec<String> {
    let receiver = if method { "self" } else { "" };
    let mut lines = vec![
        format!("{}def {}({}):", indent, scenario.name, receiver),
        format!("{}{}\"\"\"{}\"\"\"", indent, INDENT, scenario.doc),
    ];
    if scenario.kind.is_known_weak() {
        lines.push(format!("{}{}{}", indent, INDENT, KNOWN_WEAK_NOTE));
    }
    lines.extend(
        scenario
            .body
            .iter()
            .map(|stmt| format!("{}{}{}", indent, INDENT, stmt)),
    );
    lines
}
