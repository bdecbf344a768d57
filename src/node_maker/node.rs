use std::fmt;

pub const RDF_NS: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";
pub const RDFS_NS: &str = "http://www.w3.org/2000/01/rdf-schema#";
pub const OWL_NS: &str = "http://www.w3.org/2002/07/owl#";
pub const XSD_NS: &str = "http://www.w3.org/2001/XMLSchema#";
pub const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";
pub const XSD_STRING: &str = "http://www.w3.org/2001/XMLSchema#string";
pub const XSD_BOOLEAN: &str = "http://www.w3.org/2001/XMLSchema#boolean";
pub const XSD_INTEGER: &str = "http://www.w3.org/2001/XMLSchema#integer";
pub const XSD_DECIMAL: &str = "http://www.w3.org/2001/XMLSchema#decimal";
pub const XSD_DOUBLE: &str = "http://www.w3.org/2001/XMLSchema#double";
pub const XSD_DATE: &str = "http://www.w3.org/2001/XMLSchema#date";
pub const XSD_DATE_TIME: &str = "http://www.w3.org/2001/XMLSchema#dateTime";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Literal {
    pub lexical: String,
    pub language: Option<String>,
    pub datatype: Option<String>,
}

/// A graph term.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Node {
    Uri(String),
    Blank(String),
    Literal(Literal),
}

impl Node {
    pub fn uri(uri: impl Into<String>) -> Node {
        Node::Uri(uri.into())
    }

    pub fn blank(label: impl Into<String>) -> Node {
        Node::Blank(label.into())
    }

    pub fn plain_literal(lexical: impl Into<String>) -> Node {
        Node::Literal(Literal {
            lexical: lexical.into(),
            language: None,
            datatype: None,
        })
    }

    pub fn lang_literal(lexical: impl Into<String>, language: &str) -> Node {
        Node::Literal(Literal {
            lexical: lexical.into(),
            language: Some(language.to_lowercase()),
            datatype: None,
        })
    }

    pub fn typed_literal(lexical: impl Into<String>, datatype: impl Into<String>) -> Node {
        Node::Literal(Literal {
            lexical: lexical.into(),
            language: None,
            datatype: Some(datatype.into()),
        })
    }

    pub fn is_uri(&self) -> bool {
        matches!(self, Node::Uri(_))
    }

    pub fn is_blank(&self) -> bool {
        matches!(self, Node::Blank(_))
    }

    pub fn is_literal(&self) -> bool {
        matches!(self, Node::Literal(_))
    }

    pub fn as_literal(&self) -> Option<&Literal> {
        match self {
            Node::Literal(l) => Some(l),
            _ => None,
        }
    }

    /// URI, blank node label or literal lexical form.
    pub fn label(&self) -> &str {
        match self {
            Node::Uri(u) => u,
            Node::Blank(b) => b,
            Node::Literal(l) => &l.lexical,
        }
    }
}

pub fn is_numeric_datatype(datatype: &str) -> bool {
    let Some(local) = datatype.strip_prefix(XSD_NS) else {
        return false;
    };
    matches!(
        local,
        "integer"
            | "decimal"
            | "double"
            | "float"
            | "int"
            | "long"
            | "short"
            | "byte"
            | "nonNegativeInteger"
            | "nonPositiveInteger"
            | "positiveInteger"
            | "negativeInteger"
            | "unsignedLong"
            | "unsignedInt"
            | "unsignedShort"
            | "unsignedByte"
    )
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Uri(u) => write!(f, "<{}>", u),
            Node::Blank(b) => write!(f, "_:{}", b),
            Node::Literal(l) => {
                write!(f, "\"{}\"", l.lexical.replace('\\', "\\\\").replace('"', "\\\""))?;
                if let Some(lang) = &l.language {
                    write!(f, "@{}", lang)?;
                }
                if let Some(dt) = &l.datatype {
                    write!(f, "^^<{}>", dt)?;
                }
                Ok(())
            }
        }
    }
}
