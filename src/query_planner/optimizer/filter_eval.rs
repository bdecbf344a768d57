//! Evaluation of filter residue against bindings.
//!
//! Follows SPARQL semantics: an expression raising an error has no effective
//! boolean value, and a filter without one rejects the binding.

use std::cmp::Ordering;

use regex::RegexBuilder;

use super::filter_expr::{ArithmeticOp, CompareOp, FilterExpr};
use crate::node_maker::node::{
    is_numeric_datatype, XSD_BOOLEAN, XSD_DECIMAL, XSD_DOUBLE, XSD_INTEGER, XSD_NS, XSD_STRING,
};
use crate::node_maker::Node;
use crate::query_planner::node_relation::Binding;

/// Evaluation error; the binding is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct TypeError;

type EvalResult = Result<Node, TypeError>;

/// Whether `binding` passes `filter`.
pub fn evaluate(filter: &FilterExpr, binding: &Binding) -> bool {
    eval(filter, binding)
        .and_then(|node| effective_boolean_value(&node))
        .unwrap_or(false)
}

/// Whether `binding` passes every filter in `residue`.
pub fn evaluate_all(residue: &[FilterExpr], binding: &Binding) -> bool {
    residue.iter().all(|f| evaluate(f, binding))
}

fn eval(expr: &FilterExpr, binding: &Binding) -> EvalResult {
    match expr {
        FilterExpr::Variable(v) => binding.get(v).cloned().ok_or(TypeError),
        FilterExpr::Constant(node) => Ok(node.clone()),
        FilterExpr::And(a, b) => {
            let left = eval(a, binding).and_then(|n| effective_boolean_value(&n));
            let right = eval(b, binding).and_then(|n| effective_boolean_value(&n));
            match (left, right) {
                (Ok(false), _) | (_, Ok(false)) => Ok(boolean(false)),
                (Ok(true), Ok(true)) => Ok(boolean(true)),
                _ => Err(TypeError),
            }
        }
        FilterExpr::Or(a, b) => {
            let left = eval(a, binding).and_then(|n| effective_boolean_value(&n));
            let right = eval(b, binding).and_then(|n| effective_boolean_value(&n));
            match (left, right) {
                (Ok(true), _) | (_, Ok(true)) => Ok(boolean(true)),
                (Ok(false), Ok(false)) => Ok(boolean(false)),
                _ => Err(TypeError),
            }
        }
        FilterExpr::Not(a) => Ok(boolean(!effective_boolean_value(&eval(a, binding)?)?)),
        FilterExpr::Compare(op, a, b) => {
            compare(*op, &eval(a, binding)?, &eval(b, binding)?).map(boolean)
        }
        FilterExpr::Arithmetic(op, a, b) => arithmetic(*op, &eval(a, binding)?, &eval(b, binding)?),
        FilterExpr::Bound(v) => Ok(boolean(binding.contains_key(v))),
        FilterExpr::IsIri(a) => Ok(boolean(eval(a, binding)?.is_uri())),
        FilterExpr::IsBlank(a) => Ok(boolean(eval(a, binding)?.is_blank())),
        FilterExpr::IsLiteral(a) => Ok(boolean(eval(a, binding)?.is_literal())),
        FilterExpr::Lang(a) => match eval(a, binding)? {
            Node::Literal(l) => Ok(Node::plain_literal(l.language.unwrap_or_default())),
            _ => Err(TypeError),
        },
        FilterExpr::Datatype(a) => match eval(a, binding)? {
            Node::Literal(l) if l.language.is_none() => {
                Ok(Node::uri(l.datatype.unwrap_or_else(|| XSD_STRING.to_string())))
            }
            _ => Err(TypeError),
        },
        FilterExpr::Str(a) => match eval(a, binding)? {
            Node::Uri(u) => Ok(Node::plain_literal(u)),
            Node::Literal(l) => Ok(Node::plain_literal(l.lexical)),
            Node::Blank(_) => Err(TypeError),
        },
        FilterExpr::LangMatches(a, b) => {
            let tag = simple_string(&eval(a, binding)?)?;
            let range = simple_string(&eval(b, binding)?)?;
            Ok(boolean(lang_matches(&tag, &range)))
        }
        FilterExpr::Regex(text, pattern, flags) => {
            let text = string_value(&eval(text, binding)?)?;
            let pattern = simple_string(&eval(pattern, binding)?)?;
            let flags = match flags {
                Some(f) => simple_string(&eval(f, binding)?)?,
                None => String::new(),
            };
            regex_match(&text, &pattern, &flags).map(boolean)
        }
        FilterExpr::SameTerm(a, b) => Ok(boolean(eval(a, binding)? == eval(b, binding)?)),
        FilterExpr::Function(name, _) => {
            log::debug!("Unsupported filter function {}, rejecting binding", name);
            Err(TypeError)
        }
    }
}

fn boolean(value: bool) -> Node {
    Node::typed_literal(if value { "true" } else { "false" }, XSD_BOOLEAN)
}

fn effective_boolean_value(node: &Node) -> Result<bool, TypeError> {
    let Node::Literal(literal) = node else {
        return Err(TypeError);
    };
    match literal.datatype.as_deref() {
        Some(XSD_BOOLEAN) => Ok(matches!(literal.lexical.as_str(), "true" | "1")),
        Some(dt) if is_numeric_datatype(dt) => Ok(literal
            .lexical
            .trim()
            .parse::<f64>()
            .map(|v| v != 0.0 && !v.is_nan())
            .unwrap_or(false)),
        Some(XSD_STRING) => Ok(!literal.lexical.is_empty()),
        None if literal.language.is_none() => Ok(!literal.lexical.is_empty()),
        _ => Err(TypeError),
    }
}

fn numeric_value(node: &Node) -> Option<f64> {
    let literal = node.as_literal()?;
    let datatype = literal.datatype.as_deref()?;
    if !is_numeric_datatype(datatype) {
        return None;
    }
    literal.lexical.trim().parse().ok()
}

/// Lexical form of a plain literal without language or an xsd:string.
fn simple_string(node: &Node) -> Result<String, TypeError> {
    match node {
        Node::Literal(l) if l.language.is_none() && l.datatype.as_deref().is_none_or(|d| d == XSD_STRING) => {
            Ok(l.lexical.clone())
        }
        _ => Err(TypeError),
    }
}

/// Lexical form of any plain or xsd:string literal, language tag allowed.
fn string_value(node: &Node) -> Result<String, TypeError> {
    match node {
        Node::Literal(l) if l.datatype.as_deref().is_none_or(|d| d == XSD_STRING) => {
            Ok(l.lexical.clone())
        }
        _ => Err(TypeError),
    }
}

fn compare(op: CompareOp, a: &Node, b: &Node) -> Result<bool, TypeError> {
    let ordering = if let (Some(x), Some(y)) = (numeric_value(a), numeric_value(b)) {
        x.partial_cmp(&y)
    } else if let (Ok(x), Ok(y)) = (simple_string(a), simple_string(b)) {
        Some(x.cmp(&y))
    } else {
        match (a, b) {
            (Node::Literal(x), Node::Literal(y))
                if x.datatype.is_some() && x.datatype == y.datatype && x.language.is_none() =>
            {
                Some(x.lexical.cmp(&y.lexical))
            }
            _ => {
                return match op {
                    CompareOp::Equal => Ok(a == b),
                    CompareOp::NotEqual => Ok(a != b),
                    _ => Err(TypeError),
                };
            }
        }
    };

    let Some(ordering) = ordering else {
        // NaN compares unequal to everything
        return Ok(op == CompareOp::NotEqual);
    };
    Ok(match op {
        CompareOp::Equal => ordering == Ordering::Equal,
        CompareOp::NotEqual => ordering != Ordering::Equal,
        CompareOp::Less => ordering == Ordering::Less,
        CompareOp::LessOrEqual => ordering != Ordering::Greater,
        CompareOp::Greater => ordering == Ordering::Greater,
        CompareOp::GreaterOrEqual => ordering != Ordering::Less,
    })
}

fn is_integer_datatype(node: &Node) -> bool {
    node.as_literal()
        .and_then(|l| l.datatype.as_deref())
        .and_then(|d| d.strip_prefix(XSD_NS))
        .is_some_and(|local| !matches!(local, "decimal" | "double" | "float"))
}

fn is_double_datatype(node: &Node) -> bool {
    node.as_literal()
        .and_then(|l| l.datatype.as_deref())
        .and_then(|d| d.strip_prefix(XSD_NS))
        .is_some_and(|local| matches!(local, "double" | "float"))
}

fn arithmetic(op: ArithmeticOp, a: &Node, b: &Node) -> EvalResult {
    let (Some(x), Some(y)) = (numeric_value(a), numeric_value(b)) else {
        return Err(TypeError);
    };
    let value = match op {
        ArithmeticOp::Add => x + y,
        ArithmeticOp::Subtract => x - y,
        ArithmeticOp::Multiply => x * y,
        ArithmeticOp::Divide => {
            if y == 0.0 && !is_double_datatype(a) && !is_double_datatype(b) {
                return Err(TypeError);
            }
            x / y
        }
    };

    if is_integer_datatype(a) && is_integer_datatype(b) && op != ArithmeticOp::Divide {
        Ok(Node::typed_literal(format!("{}", value as i64), XSD_INTEGER))
    } else if is_double_datatype(a) || is_double_datatype(b) {
        Ok(Node::typed_literal(format!("{:?}", value), XSD_DOUBLE))
    } else {
        Ok(Node::typed_literal(format!("{}", value), XSD_DECIMAL))
    }
}

/// Basic language range matching: `*` matches any tag, otherwise the range
/// must equal the tag or a prefix of it ending at a `-`.
pub fn lang_matches(tag: &str, range: &str) -> bool {
    if range == "*" {
        return !tag.is_empty();
    }
    let tag = tag.to_lowercase();
    let range = range.to_lowercase();
    tag == range || tag.strip_prefix(&range).is_some_and(|rest| rest.starts_with('-'))
}

fn regex_match(text: &str, pattern: &str, flags: &str) -> Result<bool, TypeError> {
    let mut builder = RegexBuilder::new(pattern);
    for flag in flags.chars() {
        match flag {
            'i' => builder.case_insensitive(true),
            's' => builder.dot_matches_new_line(true),
            'm' => builder.multi_line(true),
            'x' => builder.ignore_whitespace(true),
            _ => return Err(TypeError),
        };
    }
    builder
        .build()
        .map(|re| re.is_match(text))
        .map_err(|_| TypeError)
}
