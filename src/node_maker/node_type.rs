use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use lazy_static::lazy_static;
use regex::Regex;

use super::node::{Literal, Node, XSD_NS};

lazy_static! {
    static ref INTEGER: Regex = Regex::new(r"^[+-]?\d+$").expect("valid regex");
    static ref DECIMAL: Regex = Regex::new(r"^[+-]?(\d+(\.\d*)?|\.\d+)$").expect("valid regex");
    static ref DOUBLE: Regex =
        Regex::new(r"^([+-]?(\d+(\.\d*)?|\.\d+)([eE][+-]?\d+)?|[+-]?INF|NaN)$").expect("valid regex");
}

/// The kind of term a node maker produces from a value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeType {
    Uri,
    Blank,
    Literal {
        language: Option<String>,
        datatype: Option<String>,
    },
}

impl NodeType {
    pub fn plain_literal() -> NodeType {
        NodeType::Literal {
            language: None,
            datatype: None,
        }
    }

    pub fn lang_literal(language: &str) -> NodeType {
        NodeType::Literal {
            language: Some(language.to_lowercase()),
            datatype: None,
        }
    }

    pub fn typed_literal(datatype: &str) -> NodeType {
        NodeType::Literal {
            language: None,
            datatype: Some(datatype.to_string()),
        }
    }

    pub fn is_uri(&self) -> bool {
        matches!(self, NodeType::Uri)
    }

    pub fn is_literal(&self) -> bool {
        matches!(self, NodeType::Literal { .. })
    }

    pub fn datatype(&self) -> Option<&str> {
        match self {
            NodeType::Literal { datatype, .. } => datatype.as_deref(),
            _ => None,
        }
    }

    pub fn language(&self) -> Option<&str> {
        match self {
            NodeType::Literal { language, .. } => language.as_deref(),
            _ => None,
        }
    }

    /// Builds a term from a database value, or `None` when the value is
    /// not a legal instance of the type.
    pub fn make_node(&self, value: &str) -> Option<Node> {
        match self {
            NodeType::Uri => Some(Node::uri(value)),
            NodeType::Blank => Some(Node::blank(value)),
            NodeType::Literal { language, datatype } => {
                let lexical = match datatype {
                    Some(dt) => to_canonical_lexical(dt, value)?,
                    None => value.to_string(),
                };
                Some(Node::Literal(Literal {
                    lexical,
                    language: language.clone(),
                    datatype: datatype.clone(),
                }))
            }
        }
    }

    pub fn matches(&self, node: &Node) -> bool {
        match (self, node) {
            (NodeType::Uri, Node::Uri(_)) => true,
            (NodeType::Blank, Node::Blank(_)) => true,
            (NodeType::Literal { language, datatype }, Node::Literal(literal)) => {
                let same_language = match (language, &literal.language) {
                    (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
                    (None, None) => true,
                    _ => false,
                };
                same_language && *datatype == literal.datatype
            }
            _ => false,
        }
    }

    /// The database value a term of this type was made from.
    pub fn extract_value(&self, node: &Node) -> Option<String> {
        if !self.matches(node) {
            return None;
        }
        match (self, node) {
            (NodeType::Literal { datatype: Some(dt), .. }, Node::Literal(literal)) => {
                // A non-canonical lexical form could never be produced
                if to_canonical_lexical(dt, &literal.lexical)? != literal.lexical {
                    return None;
                }
                Some(to_database_value(dt, &literal.lexical))
            }
            _ => Some(node.label().to_string()),
        }
    }
}

/// Validates a database value against an XSD datatype and rewrites SQL
/// spellings into XSD ones. Unknown datatypes accept anything.
fn to_canonical_lexical(datatype: &str, value: &str) -> Option<String> {
    let Some(local) = datatype.strip_prefix(XSD_NS) else {
        return Some(value.to_string());
    };
    match local {
        "integer" | "int" | "long" | "short" | "byte" | "nonNegativeInteger" | "positiveInteger"
        | "nonPositiveInteger" | "negativeInteger" | "unsignedLong" | "unsignedInt"
        | "unsignedShort" | "unsignedByte" => INTEGER.is_match(value).then(|| value.to_string()),
        "decimal" => DECIMAL.is_match(value).then(|| value.to_string()),
        "double" | "float" => DOUBLE.is_match(value).then(|| value.to_string()),
        "boolean" => match value.to_ascii_lowercase().as_str() {
            "true" | "1" | "t" => Some("true".to_string()),
            "false" | "0" | "f" => Some("false".to_string()),
            _ => None,
        },
        "date" => NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .ok()
            .map(|d| d.format("%Y-%m-%d").to_string()),
        "dateTime" => {
            let normalized = value.replacen(' ', "T", 1);
            NaiveDateTime::parse_from_str(&normalized, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|_| normalized)
        }
        _ => Some(value.to_string()),
    }
}

fn to_database_value(datatype: &str, lexical: &str) -> String {
    match datatype.strip_prefix(XSD_NS) {
        Some("dateTime") => lexical.replacen('T', " ", 1),
        _ => lexical.to_string(),
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeType::Uri => f.write_str("URI"),
            NodeType::Blank => f.write_str("Blank"),
            NodeType::Literal { language: Some(l), .. } => write!(f, "Literal@{}", l),
            NodeType::Literal { datatype: Some(d), .. } => write!(f, "Literal^^{}", d),
            NodeType::Literal { .. } => f.write_str("Literal"),
        }
    }
}
