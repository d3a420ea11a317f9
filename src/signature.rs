//! Normalized function signatures.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::syntax::{self, FunctionDecl, SourceModel, Statement, SyntaxFailure};

/// A single parameter with its literal annotation text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Parameter {
    pub name: String,
    pub type_annotation: Option<String>,
}

/// Parameters, return annotation, and raised error names of one function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Signature {
    pub name: String,
    pub parameters: Vec<Parameter>,
    pub return_type: Option<String>,
    /// Explicitly raised error names, sorted.
    pub raised_errors: BTreeSet<String>,
}

impl Signature {
    pub fn has_annotations(&self) -> bool {
        self.parameters.iter().any(|p| p.type_annotation.is_some())
    }
}

/// Build the signature of a function or method declaration.
pub fn extract(decl: &FunctionDecl) -> Signature {
    let mut raised_errors = BTreeSet::new();
    collect_raised(&decl.body, &mut raised_errors);

    Signature {
        name: decl.name.clone(),
        parameters: decl
            .params
            .iter()
            .map(|p| Parameter {
                name: p.name.clone(),
                type_annotation: p.annotation.clone(),
            })
            .collect(),
        return_type: decl.returns.clone(),
        raised_errors,
    }
}

/// Raise statements reachable without entering a nested def or class.
fn collect_raised(body: &[Statement], out: &mut BTreeSet<String>) {
    for stmt in body {
        match stmt {
            Statement::Raise(r) => {
                if let Some(name) = &r.exception {
                    out.insert(name.clone());
                }
            }
            Statement::Compound(c) => collect_raised(&c.body, out),
            _ => {}
        }
    }
}

/// A synthesis target: a standalone function or a class with its methods.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TestTarget {
    Function {
        signature: Signature,
        is_async: bool,
        private: bool,
    },
    Class {
        name: String,
        methods: Vec<MethodTarget>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodTarget {
    pub signature: Signature,
    pub is_async: bool,
    pub private: bool,
}

/// Top-level functions and classes in declaration order.
pub fn targets(model: &SourceModel) -> Vec<TestTarget> {
    model
        .body
        .iter()
        .filter_map(|stmt| match stmt {
            Statement::Function(f) => Some(TestTarget::Function {
                signature: extract(f),
                is_async: f.is_async,
                private: f.is_private(),
            }),
            Statement::Class(c) => Some(TestTarget::Class {
                name: c.name.clone(),
                methods: c
                    .methods()
                    .map(|m| MethodTarget {
                        signature: extract(m),
                        is_async: m.is_async,
                        private: m.is_private(),
                    })
                    .collect(),
            }),
            _ => None,
        })
        .collect()
}

/// Parse `source` and group its signatures by target.
pub fn extract_targets(source: &str) -> Result<Vec<TestTarget>, SyntaxFailure> {
    let model = syntax::parse(source)?;
    Ok(targets(&model))
}

/// Signatures of every top-level function and every method of every
/// top-level class, in declaration order.
pub fn extract_signatures(source: &str) -> Result<Vec<Signature>, SyntaxFailure> {
    let signatures = extract_targets(source)?
        .into_iter()
        .flat_map(|target| match target {
            TestTarget::Function { signature, .. } => vec![signature],
            TestTarget::Class { methods, .. } => {
                methods.into_iter().map(|m| m.signature).collect()
            }
        })
        .collect();
    Ok(signatures)
}
