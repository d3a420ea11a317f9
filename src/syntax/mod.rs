//! Typed model of a parsed Python source unit.
//!
//! The model is independent of tree-sitter: `python.rs` lowers a concrete
//! syntax tree into these types once per request, and every later stage
//! (rules, signatures, synthesis) works on the model only.
//!
//! ```text
//! source text ──▶ python::parse ──▶ SourceModel
//!                                    ├── Statement::Function(FunctionDecl)
//!                                    ├── Statement::Class(ClassDecl)
//!                                    ├── Statement::Import(ImportDecl)
//!                                    ├── Statement::Raise(RaiseStmt)
//!                                    ├── Statement::Compound(CompoundStmt)
//!                                    └── Statement::Simple { line }
//! ```

mod python;

use std::fmt;

use serde::Serialize;
use thiserror::Error;

pub use python::parse;

/// Line range of a declaration (both ends 1-indexed, inclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start_line: usize,
    pub end_line: usize,
}

impl Span {
    /// Number of lines between the first and the last line.
    pub fn length(&self) -> usize {
        self.end_line.saturating_sub(self.start_line)
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start_line, self.end_line)
    }
}

/// A declared parameter of a function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub name: String,
    /// Annotation text exactly as written (e.g. `Optional[int]`).
    pub annotation: Option<String>,
}

/// A `def` or `async def`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionDecl {
    pub name: String,
    pub span: Span,
    /// Docstring text. `None` when missing or blank.
    pub description: Option<String>,
    /// Regular positional-or-keyword parameters, in declaration order.
    pub params: Vec<Param>,
    pub returns: Option<String>,
    pub is_async: bool,
    pub body: Vec<Statement>,
}

impl FunctionDecl {
    pub fn line(&self) -> usize {
        self.span.start_line
    }

    /// Whether the name marks the function as module- or class-private.
    pub fn is_private(&self) -> bool {
        self.name.starts_with('_')
    }
}

/// A `class` definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassDecl {
    pub name: String,
    pub span: Span,
    pub description: Option<String>,
    pub body: Vec<Statement>,
}

impl ClassDecl {
    pub fn line(&self) -> usize {
        self.span.start_line
    }

    /// Functions defined directly in the class body, in declaration order.
    pub fn methods(&self) -> impl Iterator<Item = &FunctionDecl> {
        self.body.iter().filter_map(|s| match s {
            Statement::Function(f) => Some(f),
            _ => None,
        })
    }
}

/// An `import` or `from ... import` statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportDecl {
    pub line: usize,
    /// Source module of a `from` import (e.g. `os.path`, `.`, `..utils`).
    pub module: Option<String>,
    /// Number of imported names; a wildcard counts as one.
    pub name_count: usize,
    pub wildcard: bool,
}

/// A `raise` statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RaiseStmt {
    pub line: usize,
    /// Head of the raised expression (`ValueError` for `raise ValueError("x")`).
    /// `None` for a bare re-raise.
    pub exception: Option<String>,
}

/// A statement that owns nested blocks (if/for/while/try/with/match/...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompoundStmt {
    pub line: usize,
    /// Statements of every clause, flattened in source order.
    pub body: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    Function(FunctionDecl),
    Class(ClassDecl),
    Import(ImportDecl),
    Raise(RaiseStmt),
    Compound(CompoundStmt),
    Simple { line: usize },
}

impl Statement {
    pub fn line(&self) -> usize {
        match self {
            Statement::Function(f) => f.line(),
            Statement::Class(c) => c.line(),
            Statement::Import(i) => i.line,
            Statement::Raise(r) => r.line,
            Statement::Compound(c) => c.line,
            Statement::Simple { line } => *line,
        }
    }
}

/// A parsed source unit. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceModel {
    pub line_count: usize,
    pub body: Vec<Statement>,
}

impl SourceModel {
    /// Top-level function declarations.
    pub fn functions(&self) -> impl Iterator<Item = &FunctionDecl> {
        self.body.iter().filter_map(|s| match s {
            Statement::Function(f) => Some(f),
            _ => None,
        })
    }

    /// Top-level class declarations.
    pub fn classes(&self) -> impl Iterator<Item = &ClassDecl> {
        self.body.iter().filter_map(|s| match s {
            Statement::Class(c) => Some(c),
            _ => None,
        })
    }
}

/// Aggregate counters for one source unit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Stats {
    pub functions: usize,
    pub classes: usize,
    pub lines: usize,
    pub imports: usize,
}

impl Stats {
    /// Stats that only know the line count (used when parsing fails).
    pub fn lines_only(lines: usize) -> Self {
        Self {
            lines,
            ..Self::default()
        }
    }

    pub fn merge(&mut self, other: Stats) {
        self.functions += other.functions;
        self.classes += other.classes;
        self.lines += other.lines;
        self.imports += other.imports;
    }
}

/// Source that could not be parsed.
///
/// Returned as a value, never raised: the caller still gets the line count.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("syntax error at line {line}, column {column}: {message}")]
pub struct SyntaxFailure {
    pub line: usize,
    pub column: usize,
    pub message: String,
    pub stats: Stats,
}

/// Count lines the way Python's `str.splitlines` does for `\n` and `\r\n` text.
pub fn count_lines(source: &str) -> usize {
    source.lines().count()
}
