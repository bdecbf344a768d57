use std::fmt;

use lazy_static::lazy_static;
use regex::Regex;

use crate::relational::{Attribute, ColumnRenamer};

lazy_static! {
    /// `table.column` or `schema.table.column`
    static ref QUALIFIED_COLUMN: Regex =
        Regex::new(r"\b[A-Za-z_][A-Za-z0-9_]*(?:\.[A-Za-z_][A-Za-z0-9_]*){1,2}\b")
            .expect("valid regex");
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SqlPart {
    Text(String),
    Column(Attribute),
}

/// Raw SQL written in a mapping, with qualified column references
/// recognised so they can be renamed and quoted like any other attribute.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SqlFragment {
    parts: Vec<SqlPart>,
}

impl SqlFragment {
    pub fn parse(text: &str) -> SqlFragment {
        let mut parts = Vec::new();
        let mut plain = String::new();
        let mut quoted = String::new();
        let mut in_string = false;

        for c in text.chars() {
            if in_string {
                quoted.push(c);
                if c == '\'' {
                    // '' inside a literal reopens it on the next quote
                    in_string = false;
                    push_text(&mut parts, std::mem::take(&mut quoted));
                }
            } else if c == '\'' {
                split_columns(&mut parts, &std::mem::take(&mut plain));
                quoted.push(c);
                in_string = true;
            } else {
                plain.push(c);
            }
        }
        split_columns(&mut parts, &plain);
        push_text(&mut parts, quoted);
        SqlFragment { parts }
    }

    pub fn parts(&self) -> &[SqlPart] {
        &self.parts
    }

    pub fn attributes(&self) -> impl Iterator<Item = &Attribute> {
        self.parts.iter().filter_map(|p| match p {
            SqlPart::Column(a) => Some(a),
            SqlPart::Text(_) => None,
        })
    }

    pub fn rename(&self, renamer: &dyn ColumnRenamer) -> SqlFragment {
        SqlFragment {
            parts: self
                .parts
                .iter()
                .map(|p| match p {
                    SqlPart::Column(a) => SqlPart::Column(renamer.apply_to_attribute(a)),
                    text => text.clone(),
                })
                .collect(),
        }
    }

    pub fn render(&self, quote: impl Fn(&Attribute) -> String) -> String {
        self.parts
            .iter()
            .map(|p| match p {
                SqlPart::Text(t) => t.clone(),
                SqlPart::Column(a) => quote(a),
            })
            .collect()
    }
}

fn push_text(parts: &mut Vec<SqlPart>, text: String) {
    if text.is_empty() {
        return;
    }
    if let Some(SqlPart::Text(previous)) = parts.last_mut() {
        previous.push_str(&text);
    } else {
        parts.push(SqlPart::Text(text));
    }
}

fn split_columns(parts: &mut Vec<SqlPart>, text: &str) {
    let mut last = 0;
    for m in QUALIFIED_COLUMN.find_iter(text) {
        // Qualified function names are not columns
        if text[m.end()..].trim_start().starts_with('(') {
            continue;
        }
        if let Ok(attribute) = Attribute::parse(m.as_str()) {
            push_text(parts, text[last..m.start()].to_string());
            parts.push(SqlPart::Column(attribute));
            last = m.end();
        }
    }
    push_text(parts, text[last..].to_string());
}

impl fmt::Display for SqlFragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(Attribute::qualified_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_columns_are_recognised() {
        let fragment = SqlFragment::parse("users.age > 18 AND app.users.name <> ''");
        let columns: Vec<String> = fragment.attributes().map(|a| a.qualified_name()).collect();
        assert_eq!(columns, vec!["users.age", "app.users.name"]);
    }

    #[test]
    fn test_string_literals_are_left_alone() {
        let fragment = SqlFragment::parse("t.kind = 'a.b' OR t.kind = 'it''s x.y'");
        let columns: Vec<String> = fragment.attributes().map(|a| a.qualified_name()).collect();
        assert_eq!(columns, vec!["t.kind", "t.kind"]);
        assert_eq!(fragment.to_string(), "t.kind = 'a.b' OR t.kind = 'it''s x.y'");
    }

    #[test]
    fn test_render_quotes_columns() {
        let fragment = SqlFragment::parse("LOWER(t.name) = 'x'");
        let rendered = fragment.render(|a| format!("\"{}\".\"{}\"", a.relation_name().table(), a.column()));
        assert_eq!(rendered, "LOWER(\"t\".\"name\") = 'x'");
    }

    #[test]
    fn test_function_names_are_not_columns() {
        let fragment = SqlFragment::parse("pg_catalog.lower(t.name)");
        let columns: Vec<String> = fragment.attributes().map(|a| a.qualified_name()).collect();
        assert_eq!(columns, vec!["t.name"]);
    }
}
