//! Lowering of tree-sitter-python trees into [`SourceModel`].

use tree_sitter::{Language, Node, Parser, Tree};

use super::{
    count_lines, ClassDecl, CompoundStmt, FunctionDecl, ImportDecl, Param, RaiseStmt,
    SourceModel, Span, Statement, Stats, SyntaxFailure,
};

/// Parse Python source into a [`SourceModel`].
///
/// Any ERROR or MISSING node in the tree makes the whole unit unparsable;
/// the failure reports the first one in document order.
pub fn parse(source: &str) -> Result<SourceModel, SyntaxFailure> {
    let line_count = count_lines(source);
    let tree = parse_tree(source).map_err(|message| SyntaxFailure {
        line: 1,
        column: 1,
        message,
        stats: Stats::lines_only(line_count),
    })?;

    let root = tree.root_node();
    if root.has_error() {
        return Err(locate_error(root, source.as_bytes(), line_count));
    }
    if let Some(node) = first_legacy_statement(root) {
        let pos = node.start_position();
        return Err(SyntaxFailure {
            line: pos.row + 1,
            column: pos.column + 1,
            message: legacy_message(node.kind()),
            stats: Stats::lines_only(line_count),
        });
    }

    let lowering = Lowering {
        src: source.as_bytes(),
    };
    Ok(SourceModel {
        line_count,
        body: lowering.statements(root),
    })
}

fn parse_tree(source: &str) -> Result<Tree, String> {
    let language: Language = tree_sitter_python::LANGUAGE.into();
    let mut parser = Parser::new();
    parser
        .set_language(&language)
        .map_err(|e| format!("python grammar unavailable: {}", e))?;
    parser
        .parse(source, None)
        .ok_or_else(|| "failed to parse Python source".to_string())
}

/// Find the first ERROR or MISSING node, depth first.
fn locate_error(root: Node, src: &[u8], line_count: usize) -> SyntaxFailure {
    let stats = Stats::lines_only(line_count);
    match first_error(root) {
        Some(node) => {
            let pos = node.start_position();
            let message = if node.is_missing() {
                format!("expected '{}'", node.kind())
            } else {
                let text = node.utf8_text(src).unwrap_or("");
                let snippet: String = text.lines().next().unwrap_or("").chars().take(40).collect();
                if snippet.trim().is_empty() {
                    "invalid syntax".to_string()
                } else {
                    format!("invalid syntax near '{}'", snippet.trim())
                }
            };
            SyntaxFailure {
                line: pos.row + 1,
                column: pos.column + 1,
                message,
                stats,
            }
        }
        None => SyntaxFailure {
            line: 1,
            column: 1,
            message: "invalid syntax".to_string(),
            stats,
        },
    }
}

fn first_error(node: Node) -> Option<Node> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    if !node.has_error() {
        return None;
    }
    let mut cursor = node.walk();
    let children: Vec<Node> = node.children(&mut cursor).collect();
    children.into_iter().find_map(first_error)
}

/// Python 2 `print`/`exec` statements, which the grammar still accepts.
fn first_legacy_statement(node: Node) -> Option<Node> {
    if LEGACY_STATEMENTS.contains(&node.kind()) {
        return Some(node);
    }
    let mut cursor = node.walk();
    let children: Vec<Node> = node.named_children(&mut cursor).collect();
    children.into_iter().find_map(first_legacy_statement)
}

const LEGACY_STATEMENTS: &[&str] = &["print_statement", "exec_statement"];

fn legacy_message(kind: &str) -> String {
    let keyword = kind.trim_end_matches("_statement");
    format!("Missing parentheses in call to '{}'", keyword)
}

/// Last line holding code inside a definition or compound statement.
///
/// Comments trailing a block belong to the block in the tree but do not
/// extend the statement.
fn code_end_line(node: Node) -> usize {
    let mut cursor = node.walk();
    let last = node
        .named_children(&mut cursor)
        .filter(|c| c.kind() != "comment")
        .last();
    match last {
        Some(child)
            if node.kind() == "block"
                || child.kind() == "block"
                || child.kind().ends_with("_clause") =>
        {
            code_end_line(child)
        }
        _ => last_line(node),
    }
}

/// Last line covered by a node (1-indexed).
///
/// Blocks own their trailing newline, so a node ending at column 0 really
/// ends on the previous line.
fn last_line(node: Node) -> usize {
    let start = node.start_position();
    let end = node.end_position();
    if end.column == 0 && end.row > start.row {
        end.row
    } else {
        end.row + 1
    }
}

fn first_line(node: Node) -> usize {
    node.start_position().row + 1
}

/// Innermost expression of `((expr))`.
fn unparenthesize(mut node: Node) -> Node {
    while node.kind() == "parenthesized_expression" {
        let mut cursor = node.walk();
        let inner = node
            .named_children(&mut cursor)
            .find(|c| c.kind() != "comment");
        match inner {
            Some(inner) => node = inner,
            None => break,
        }
    }
    node
}

struct Lowering<'src> {
    src: &'src [u8],
}

impl<'src> Lowering<'src> {
    fn text(&self, node: Node) -> &'src str {
        node.utf8_text(self.src).unwrap_or("")
    }

    /// Lower the statements directly inside a module or block node.
    fn statements(&self, parent: Node) -> Vec<Statement> {
        let mut cursor = parent.walk();
        parent
            .named_children(&mut cursor)
            .filter(|n| n.kind() != "comment")
            .map(|n| self.statement(n))
            .collect()
    }

    fn statement(&self, node: Node) -> Statement {
        match node.kind() {
            "function_definition" => Statement::Function(self.function(node)),
            "class_definition" => Statement::Class(self.class(node)),
            "decorated_definition" => match node.child_by_field_name("definition") {
                Some(def) if def.kind() == "function_definition" => {
                    Statement::Function(self.function(def))
                }
                Some(def) if def.kind() == "class_definition" => Statement::Class(self.class(def)),
                _ => Statement::Simple {
                    line: first_line(node),
                },
            },
            "import_statement" => Statement::Import(self.import(node)),
            "import_from_statement" | "future_import_statement" => {
                Statement::Import(self.import_from(node))
            }
            "raise_statement" => Statement::Raise(self.raise(node)),
            _ => {
                let body = self.clause_bodies(node);
                if body.is_empty() && !has_block(node) {
                    Statement::Simple {
                        line: first_line(node),
                    }
                } else {
                    Statement::Compound(CompoundStmt {
                        line: first_line(node),
                        body,
                    })
                }
            }
        }
    }

    /// Statements of every block owned by a compound statement, including
    /// the blocks of its elif/else/except/finally/case clauses.
    fn clause_bodies(&self, node: Node) -> Vec<Statement> {
        let mut body = Vec::new();
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            if child.kind() == "block" {
                body.extend(self.statements(child));
            } else if child.kind().ends_with("_clause") {
                body.extend(self.clause_bodies(child));
            }
        }
        body
    }

    fn function(&self, node: Node) -> FunctionDecl {
        let name = node
            .child_by_field_name("name")
            .map(|n| self.text(n).to_string())
            .unwrap_or_default();
        let is_async = node.child(0).map(|c| c.kind() == "async").unwrap_or(false);
        let params = node
            .child_by_field_name("parameters")
            .map(|p| self.params(p))
            .unwrap_or_default();
        let returns = node
            .child_by_field_name("return_type")
            .map(|n| self.text(n).to_string());
        let block = node.child_by_field_name("body");

        FunctionDecl {
            name,
            span: Span {
                start_line: first_line(node),
                end_line: code_end_line(node),
            },
            description: block.and_then(|b| self.docstring(b)),
            params,
            returns,
            is_async,
            body: block.map(|b| self.statements(b)).unwrap_or_default(),
        }
    }

    fn class(&self, node: Node) -> ClassDecl {
        let name = node
            .child_by_field_name("name")
            .map(|n| self.text(n).to_string())
            .unwrap_or_default();
        let block = node.child_by_field_name("body");

        ClassDecl {
            name,
            span: Span {
                start_line: first_line(node),
                end_line: code_end_line(node),
            },
            description: block.and_then(|b| self.docstring(b)),
            body: block.map(|b| self.statements(b)).unwrap_or_default(),
        }
    }

    /// Regular parameters, stopping at `*`, `*args` or `**kwargs`.
    fn params(&self, node: Node) -> Vec<Param> {
        let mut params: Vec<Param> = Vec::new();
        let mut cursor = node.walk();

        for child in node.named_children(&mut cursor) {
            let param = match child.kind() {
                "identifier" => Some(Param {
                    name: self.text(child).to_string(),
                    annotation: None,
                }),
                "typed_parameter" => {
                    // `*args: int` and `**kw: str` are typed splats, not regular params.
                    let inner = child.named_child(0);
                    match inner {
                        Some(n) if n.kind() == "identifier" => Some(Param {
                            name: self.text(n).to_string(),
                            annotation: child
                                .child_by_field_name("type")
                                .map(|t| self.text(t).to_string()),
                        }),
                        _ => break,
                    }
                }
                "default_parameter" | "typed_default_parameter" => {
                    child.child_by_field_name("name").map(|n| Param {
                        name: self.text(n).to_string(),
                        annotation: child
                            .child_by_field_name("type")
                            .map(|t| self.text(t).to_string()),
                    })
                }
                "list_splat_pattern" | "dictionary_splat_pattern" | "keyword_separator" => break,
                _ => None,
            };

            if let Some(param) = param {
                if !params.iter().any(|p| p.name == param.name) {
                    params.push(param);
                }
            }
        }

        params
    }

    fn import(&self, node: Node) -> ImportDecl {
        let mut cursor = node.walk();
        let name_count = node.children_by_field_name("name", &mut cursor).count();
        ImportDecl {
            line: first_line(node),
            module: None,
            name_count,
            wildcard: false,
        }
    }

    fn import_from(&self, node: Node) -> ImportDecl {
        let module = if node.kind() == "future_import_statement" {
            Some("__future__".to_string())
        } else {
            node.child_by_field_name("module_name")
                .map(|n| self.text(n).to_string())
        };

        let mut cursor = node.walk();
        let wildcard = node
            .named_children(&mut cursor)
            .any(|c| c.kind() == "wildcard_import");

        let name_count = if wildcard {
            1
        } else {
            let mut cursor = node.walk();
            node.children_by_field_name("name", &mut cursor).count()
        };

        ImportDecl {
            line: first_line(node),
            module,
            name_count,
            wildcard,
        }
    }

    fn raise(&self, node: Node) -> RaiseStmt {
        let mut cursor = node.walk();
        let raised = node
            .named_children(&mut cursor)
            .find(|c| c.kind() != "comment");

        let exception = raised.map(unparenthesize).and_then(|expr| {
            let text = self.text(expr);
            let head = text.split('(').next().unwrap_or("").trim();
            if head.is_empty() {
                None
            } else {
                Some(head.to_string())
            }
        });

        RaiseStmt {
            line: first_line(node),
            exception,
        }
    }

    /// Docstring of a function or class body, if the first statement is a
    /// non-empty plain string literal.
    fn docstring(&self, block: Node) -> Option<String> {
        let mut cursor = block.walk();
        let first = block
            .named_children(&mut cursor)
            .find(|n| n.kind() != "comment")?;
        if first.kind() != "expression_statement" {
            return None;
        }
        let expr = first.named_child(0)?;

        let value = match expr.kind() {
            "string" => self.string_value(expr)?,
            "concatenated_string" => {
                let mut cursor = expr.walk();
                let parts: Option<Vec<String>> = expr
                    .named_children(&mut cursor)
                    .filter(|n| n.kind() == "string")
                    .map(|n| self.string_value(n))
                    .collect();
                parts?.concat()
            }
            _ => return None,
        };

        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }

    /// Value of a plain string literal. f-strings and bytes are not docstrings.
    fn string_value(&self, node: Node) -> Option<String> {
        let mut cursor = node.walk();
        let children: Vec<Node> = node.children(&mut cursor).collect();

        let Some(start) = children.iter().find(|c| c.kind() == "string_start") else {
            return Some(strip_quotes(self.text(node)));
        };

        let prefix = self.text(*start).to_ascii_lowercase();
        if prefix.contains('f') || prefix.contains('b') {
            return None;
        }

        Some(
            children
                .iter()
                .filter(|c| c.kind() == "string_content")
                .map(|c| self.text(*c))
                .collect(),
        )
    }
}

fn has_block(node: Node) -> bool {
    let mut cursor = node.walk();
    let found = node
        .named_children(&mut cursor)
        .any(|c| c.kind() == "block" || c.kind().ends_with("_clause"));
    found
}

fn strip_quotes(text: &str) -> String {
    let body = text.trim_start_matches(|c: char| c.is_ascii_alphabetic());
    for quote in ["\"\"\"", "'''", "\"", "'"] {
        if body.len() >= 2 * quote.len() && body.starts_with(quote) && body.ends_with(quote) {
            return body[quote.len()..body.len() - quote.len()].to_string();
        }
    }
    body.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn function<'a>(model: &'a SourceModel, name: &str) -> &'a FunctionDecl {
        model
            .functions()
            .find(|f| f.name == name)
            .unwrap_or_else(|| panic!("function {} not found", name))
    }

    #[test]
    fn test_parse_functions_and_classes() {
        let source = r#"
def hello():
    print("Hello")

class MyClass:
    """A class."""

    def method(self, x):
        return x
"#;
        let model = parse(source).unwrap();
        assert_eq!(model.line_count, 9);

        let hello = function(&model, "hello");
        assert_eq!(hello.line(), 2);
        assert!(hello.description.is_none());
        assert!(hello.params.is_empty());

        let class = model.classes().next().unwrap();
        assert_eq!(class.name, "MyClass");
        assert_eq!(class.description.as_deref(), Some("A class."));
        let methods: Vec<_> = class.methods().collect();
        assert_eq!(methods.len(), 1);
        assert_eq!(methods[0].name, "method");
        assert_eq!(methods[0].params.len(), 2);
        assert_eq!(methods[0].params[0].name, "self");
    }

    #[test]
    fn test_parse_parameters() {
        let source = r#"
def f(a, b: int, c=1, d: str = "x", /, e=2, *args, g, h: int = 3, **kwargs) -> Optional[int]:
    pass
"#;
        let model = parse(source).unwrap();
        let f = function(&model, "f");
        let names: Vec<_> = f.params.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c", "d", "e"]);
        assert_eq!(f.params[1].annotation.as_deref(), Some("int"));
        assert_eq!(f.params[3].annotation.as_deref(), Some("str"));
        assert!(f.params[2].annotation.is_none());
        assert_eq!(f.returns.as_deref(), Some("Optional[int]"));
    }

    #[test]
    fn test_keyword_only_marker_stops_parameters() {
        let model = parse("def f(a, *, b):\n    pass\n").unwrap();
        let f = function(&model, "f");
        assert_eq!(f.params.len(), 1);
    }

    #[test]
    fn test_docstring_variants() {
        let source = r#"
def documented():
    """Does things."""
    return 1

def blank():
    """   """
    return 1

def fstring():
    f"""not a docstring {x}"""
    return 1

def single():
    'single quoted'

def late():
    x = 1
    """not a docstring"""
"#;
        let model = parse(source).unwrap();
        assert_eq!(
            function(&model, "documented").description.as_deref(),
            Some("Does things.")
        );
        assert!(function(&model, "blank").description.is_none());
        assert!(function(&model, "fstring").description.is_none());
        assert_eq!(
            function(&model, "single").description.as_deref(),
            Some("single quoted")
        );
        assert!(function(&model, "late").description.is_none());
    }

    #[test]
    fn test_function_span() {
        let source = "def f(x):\n    y = x\n    z = y\n    return z\n\n\nx = 1\n";
        let model = parse(source).unwrap();
        let f = function(&model, "f");
        assert_eq!(f.span.start_line, 1);
        assert_eq!(f.span.end_line, 4);
        assert_eq!(f.span.length(), 3);
    }

    #[test]
    fn test_trailing_comment_does_not_extend_span() {
        let source = "def f(x):\n    if x:\n        return 1\n        # unreachable\n    return 2\n    # done\n\n# module comment\n";
        let model = parse(source).unwrap();
        let f = function(&model, "f");
        assert_eq!(f.span.end_line, 5);

        let nested = "def g(x):\n    if x:\n        return 1\n        # trailing\n";
        let model = parse(nested).unwrap();
        assert_eq!(function(&model, "g").span.end_line, 3);
    }

    #[test]
    fn test_decorated_and_async() {
        let source = r#"
@decorator
def wrapped():
    pass

async def fetch(url):
    pass
"#;
        let model = parse(source).unwrap();
        let wrapped = function(&model, "wrapped");
        assert_eq!(wrapped.line(), 3);
        assert!(!wrapped.is_async);
        assert!(function(&model, "fetch").is_async);
    }

    #[test]
    fn test_imports() {
        let source = r#"
import os, sys
import numpy as np
from typing import List, Optional
from os.path import *
from . import sibling
"#;
        let model = parse(source).unwrap();
        let imports: Vec<&ImportDecl> = model
            .body
            .iter()
            .filter_map(|s| match s {
                Statement::Import(i) => Some(i),
                _ => None,
            })
            .collect();

        assert_eq!(imports.len(), 5);
        assert_eq!(imports[0].name_count, 2);
        assert_eq!(imports[1].name_count, 1);
        assert_eq!(imports[2].module.as_deref(), Some("typing"));
        assert_eq!(imports[2].name_count, 2);
        assert!(imports[3].wildcard);
        assert_eq!(imports[3].module.as_deref(), Some("os.path"));
        assert_eq!(imports[3].name_count, 1);
        assert_eq!(imports[4].module.as_deref(), Some("."));
    }

    #[test]
    fn test_raise_heads_inside_compound_statements() {
        let source = r#"
def divide(a, b):
    if b == 0:
        raise ValueError("b must not be zero")
    try:
        return a / b
    except ZeroDivisionError:
        raise
    finally:
        raise errors.Custom() from None
"#;
        let model = parse(source).unwrap();
        let divide = function(&model, "divide");
        let mut heads = Vec::new();
        collect_raises(&divide.body, &mut heads);
        assert_eq!(
            heads,
            vec![Some("ValueError".to_string()), None, Some("errors.Custom".to_string())]
        );
    }

    #[test]
    fn test_parenthesized_raise_head() {
        let source = "def f():\n    raise (ValueError)\n\ndef g():\n    raise (KeyError(\"k\"))\n";
        let model = parse(source).unwrap();
        for (name, expected) in [("f", "ValueError"), ("g", "KeyError")] {
            let mut heads = Vec::new();
            collect_raises(&function(&model, name).body, &mut heads);
            assert_eq!(heads, vec![Some(expected.to_string())]);
        }
    }

    fn collect_raises(body: &[Statement], out: &mut Vec<Option<String>>) {
        for stmt in body {
            match stmt {
                Statement::Raise(r) => out.push(r.exception.clone()),
                Statement::Compound(c) => collect_raises(&c.body, out),
                _ => {}
            }
        }
    }

    #[test]
    fn test_syntax_error_reports_location_and_lines() {
        let source = "def broken(:\n    pass\n\nx = 1\n";
        let failure = parse(source).unwrap_err();
        assert_eq!(failure.line, 1);
        assert!(failure.column >= 1);
        assert_eq!(failure.stats.lines, 4);
        assert_eq!(failure.stats.functions, 0);
    }

    #[test]
    fn test_python2_statements_are_rejected() {
        let failure = parse("x = 1\nprint \"hello\"\n").unwrap_err();
        assert_eq!(failure.line, 2);
        assert_eq!(failure.column, 1);
        assert_eq!(failure.message, "Missing parentheses in call to 'print'");
        assert_eq!(failure.stats.lines, 2);

        let failure = parse("def f():\n    exec \"code\"\n").unwrap_err();
        assert_eq!(failure.line, 2);
        assert_eq!(failure.message, "Missing parentheses in call to 'exec'");

        assert!(parse("print(\"hello\")\n").is_ok());
    }

    #[test]
    fn test_strip_quotes() {
        assert_eq!(strip_quotes("\"\"\"doc\"\"\""), "doc");
        assert_eq!(strip_quotes("r'raw'"), "raw");
        assert_eq!(strip_quotes("\"x\""), "x");
    }
}
