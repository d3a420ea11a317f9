//! Argument-value heuristics.
//!
//! Values are picked from syntactic signals only: the parameter name and the
//! literal text of its annotation. Rules are tried in table order and the
//! first match wins.

use crate::signature::Parameter;

/// A Python literal used as a test argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgValue {
    Integer,
    Text,
    Boolean,
    List,
    Dict,
    FilePath,
    Null,
}

impl ArgValue {
    /// Python source for the value.
    pub fn literal(&self) -> &'static str {
        match self {
            ArgValue::Integer => "1",
            ArgValue::Text => "\"test_string\"",
            ArgValue::Boolean => "True",
            ArgValue::List => "[1, 2, 3]",
            ArgValue::Dict => "{\"key\": \"value\"}",
            ArgValue::FilePath => "\"/tmp/test_file\"",
            ArgValue::Null => "None",
        }
    }

    pub fn is_string_literal(&self) -> bool {
        matches!(self, ArgValue::Text | ArgValue::FilePath)
    }
}

/// Lowercased signals for one parameter.
struct Hint {
    name: String,
    annotation: String,
}

impl Hint {
    fn new(param: &Parameter) -> Self {
        Self {
            name: param.name.to_lowercase(),
            annotation: param
                .type_annotation
                .as_deref()
                .unwrap_or("")
                .to_lowercase(),
        }
    }

    fn mentions(&self, needle: &str) -> bool {
        self.annotation.contains(needle) || self.name.contains(needle)
    }
}

struct ArgumentRule {
    value: ArgValue,
    matches: fn(&Hint) -> bool,
}

const ARGUMENT_RULES: &[ArgumentRule] = &[
    ArgumentRule {
        value: ArgValue::Integer,
        matches: |h| h.mentions("int") || h.mentions("num") || h.name == "n",
    },
    ArgumentRule {
        value: ArgValue::Text,
        matches: |h| h.mentions("str") || h.mentions("name") || h.mentions("text"),
    },
    ArgumentRule {
        value: ArgValue::Boolean,
        matches: |h| {
            h.annotation.contains("bool") || h.name.starts_with("is_") || h.name.starts_with("has_")
        },
    },
    ArgumentRule {
        value: ArgValue::List,
        matches: |h| h.annotation.contains("list"),
    },
    ArgumentRule {
        value: ArgValue::Dict,
        matches: |h| h.annotation.contains("dict"),
    },
    ArgumentRule {
        value: ArgValue::FilePath,
        matches: |h| h.name.contains("path") || h.name.contains("file"),
    },
];

/// Pick a test value for a parameter.
pub fn argument_value(param: &Parameter) -> ArgValue {
    let hint = Hint::new(param);
    ARGUMENT_RULES
        .iter()
        .find(|rule| (rule.matches)(&hint))
        .map(|rule| rule.value)
        .unwrap_or(ArgValue::Null)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn param(name: &str, annotation: Option<&str>) -> Parameter {
        Parameter {
            name: name.to_string(),
            type_annotation: annotation.map(str::to_string),
        }
    }

    #[test]
    fn test_each_rule() {
        let cases = [
            (param("number", None), ArgValue::Integer),
            (param("count", None), ArgValue::Null),
            (param("x", Some("int")), ArgValue::Integer),
            (param("n", None), ArgValue::Integer),
            (param("num_items", None), ArgValue::Integer),
            (param("label", Some("str")), ArgValue::Text),
            (param("username", None), ArgValue::Text),
            (param("raw_text", None), ArgValue::Text),
            (param("flag", Some("bool")), ArgValue::Boolean),
            (param("is_ready", None), ArgValue::Boolean),
            (param("has_items", None), ArgValue::Boolean),
            (param("values", Some("List[float]")), ArgValue::List),
            (param("mapping", Some("Dict[str, float]")), ArgValue::Text),
            (param("mapping", Some("dict")), ArgValue::Dict),
            (param("path", None), ArgValue::FilePath),
            (param("config_file", None), ArgValue::FilePath),
            (param("a", None), ArgValue::Null),
            (param("b", Some("float")), ArgValue::Null),
        ];
        for (p, expected) in cases {
            assert_eq!(argument_value(&p), expected, "parameter {:?}", p);
        }
    }

    #[test]
    fn test_rule_order_first_match_wins() {
        // "int" beats "name": rule 1 before rule 2.
        assert_eq!(argument_value(&param("name", Some("int"))), ArgValue::Integer);
        // "str" annotation beats "is_" prefix.
        assert_eq!(argument_value(&param("is_valid", Some("str"))), ArgValue::Text);
        // "filename" contains "name", so the text rule wins over the path rule.
        assert_eq!(argument_value(&param("filename", None)), ArgValue::Text);
        // "List[int]" mentions int before list.
        assert_eq!(argument_value(&param("xs", Some("List[int]"))), ArgValue::Integer);
        // "print_mode" contains "int" in the name.
        assert_eq!(argument_value(&param("print_mode", None)), ArgValue::Integer);
    }

    #[test]
    fn test_comparison_is_case_insensitive() {
        assert_eq!(argument_value(&param("N", None)), ArgValue::Integer);
        assert_eq!(argument_value(&param("IS_OPEN", None)), ArgValue::Boolean);
        assert_eq!(argument_value(&param("x", Some("Bool"))), ArgValue::Boolean);
    }

    #[test]
    fn test_literals() {
        assert_eq!(ArgValue::Text.literal(), "\"test_string\"");
        assert_eq!(ArgValue::Dict.literal(), "{\"key\": \"value\"}");
        assert!(ArgValue::FilePath.is_string_literal());
        assert!(!ArgValue::Integer.is_string_literal());
    }
}
