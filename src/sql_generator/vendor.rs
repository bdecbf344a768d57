//! SQL dialect rules.
//!
//! Everything that differs between database products when rendering a
//! statement lives here: identifier quoting, string escaping, string
//! concatenation, table aliasing, row limits and literal formats. The rest of
//! the statement shape is fixed by the statement builder.

use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::data_type::SqlDataType;
use crate::relational::{Attribute, RelationName};

lazy_static! {
    static ref NUMERIC_LITERAL: Regex =
        Regex::new(r"^[+-]?(\d+(\.\d*)?|\.\d+)([eE][+-]?\d+)?$").expect("valid regex");
}

/// Whether `text` can be written into SQL as an unquoted number.
pub fn is_numeric_literal(text: &str) -> bool {
    NUMERIC_LITERAL.is_match(text)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum Vendor {
    #[default]
    #[serde(rename = "sql92")]
    Sql92,
    #[serde(rename = "mysql")]
    MySql,
    #[serde(rename = "postgresql")]
    PostgreSql,
    #[serde(rename = "oracle")]
    Oracle,
    #[serde(rename = "sqlserver")]
    SqlServer,
    #[serde(rename = "hsqldb")]
    Hsqldb,
    #[serde(rename = "clickhouse")]
    ClickHouse,
}

impl Vendor {
    pub fn name(&self) -> &'static str {
        match self {
            Vendor::Sql92 => "sql92",
            Vendor::MySql => "mysql",
            Vendor::PostgreSql => "postgresql",
            Vendor::Oracle => "oracle",
            Vendor::SqlServer => "sqlserver",
            Vendor::Hsqldb => "hsqldb",
            Vendor::ClickHouse => "clickhouse",
        }
    }

    pub fn quote_identifier(&self, identifier: &str) -> String {
        match self {
            Vendor::MySql | Vendor::ClickHouse => {
                format!("`{}`", identifier.replace('`', "``"))
            }
            Vendor::SqlServer => format!("[{}]", identifier.replace(']', "]]")),
            _ => format!("\"{}\"", identifier.replace('"', "\"\"")),
        }
    }

    /// Case-insensitive names are left bare so the database folds them itself.
    pub fn quote_relation_name(&self, name: &RelationName) -> String {
        let quote = |part: &str| {
            if name.is_case_unspecified() {
                part.to_string()
            } else {
                self.quote_identifier(part)
            }
        };
        match name.schema() {
            Some(schema) => format!("{}.{}", quote(schema), quote(name.table())),
            None => quote(name.table()),
        }
    }

    pub fn quote_attribute(&self, attribute: &Attribute) -> String {
        let column = if attribute.relation_name().is_case_unspecified() {
            attribute.column().to_string()
        } else {
            self.quote_identifier(attribute.column())
        };
        format!("{}.{}", self.quote_relation_name(attribute.relation_name()), column)
    }

    pub fn quote_string(&self, value: &str) -> String {
        let escaped = match self {
            // Both treat backslash as an escape character inside literals
            Vendor::MySql | Vendor::ClickHouse => value.replace('\\', "\\\\").replace('\'', "''"),
            _ => value.replace('\'', "''"),
        };
        format!("'{}'", escaped)
    }

    pub fn concatenate(&self, parts: &[String]) -> String {
        match self {
            Vendor::MySql => format!("CONCAT({})", parts.join(", ")),
            Vendor::ClickHouse => format!("concat({})", parts.join(", ")),
            Vendor::SqlServer => format!("({})", parts.join(" + ")),
            _ => format!("({})", parts.join(" || ")),
        }
    }

    /// `original AS alias`, without the keyword where the dialect rejects it.
    pub fn alias_clause(&self, original: &str, alias: &str) -> String {
        match self {
            Vendor::Oracle => format!("{} {}", original, alias),
            _ => format!("{} AS {}", original, alias),
        }
    }

    /// Fragment placed right after `SELECT [DISTINCT]`.
    pub fn limit_prefix(&self, limit: Option<u64>) -> Option<String> {
        match (self, limit) {
            (Vendor::SqlServer, Some(n)) => Some(format!("TOP {}", n)),
            _ => None,
        }
    }

    /// Extra WHERE condition for dialects that limit rows through a pseudo column.
    pub fn limit_condition(&self, limit: Option<u64>) -> Option<String> {
        match (self, limit) {
            (Vendor::Oracle, Some(n)) => Some(format!("ROWNUM <= {}", n)),
            _ => None,
        }
    }

    /// Trailing clause appended after ORDER BY.
    pub fn limit_suffix(&self, limit: Option<u64>) -> Option<String> {
        match (self, limit) {
            (Vendor::SqlServer, _) | (Vendor::Oracle, _) => None,
            (_, Some(n)) => Some(format!("LIMIT {}", n)),
            (_, None) => None,
        }
    }

    pub fn true_condition(&self) -> &'static str {
        "1=1"
    }

    pub fn false_condition(&self) -> &'static str {
        "1=0"
    }

    /// Render `value` as a literal of the given column type.
    ///
    /// Returns `None` when the value is not a valid instance of the type;
    /// the caller decides what an impossible comparison compiles to.
    pub fn format_constant(&self, value: &str, data_type: SqlDataType) -> Option<String> {
        match data_type {
            SqlDataType::Numeric => {
                let trimmed = value.trim();
                is_numeric_literal(trimmed).then(|| trimmed.trim_start_matches('+').to_string())
            }
            SqlDataType::Boolean => {
                let truth = match value.trim().to_ascii_lowercase().as_str() {
                    "true" | "1" => true,
                    "false" | "0" => false,
                    _ => return None,
                };
                Some(self.boolean_literal(truth).to_string())
            }
            SqlDataType::Date => {
                let date = NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").ok()?;
                Some(self.date_literal(&date.format("%Y-%m-%d").to_string()))
            }
            SqlDataType::Timestamp => {
                let normalized = value.trim().replacen('T', " ", 1);
                let timestamp = NaiveDateTime::parse_from_str(&normalized, "%Y-%m-%d %H:%M:%S%.f")
                    .ok()?;
                let format = if timestamp.nanosecond() == 0 {
                    "%Y-%m-%d %H:%M:%S"
                } else {
                    "%Y-%m-%d %H:%M:%S%.f"
                };
                Some(self.timestamp_literal(&timestamp.format(format).to_string()))
            }
            SqlDataType::Time => {
                let time = NaiveTime::parse_from_str(value.trim(), "%H:%M:%S%.f").ok()?;
                let format = if time.nanosecond() == 0 {
                    "%H:%M:%S"
                } else {
                    "%H:%M:%S%.f"
                };
                Some(self.time_literal(&time.format(format).to_string()))
            }
            SqlDataType::Character
            | SqlDataType::Binary
            | SqlDataType::Interval
            | SqlDataType::Unknown => Some(self.quote_string(value)),
        }
    }

    fn boolean_literal(&self, value: bool) -> &'static str {
        match (self, value) {
            (Vendor::Oracle | Vendor::SqlServer, true) => "1",
            (Vendor::Oracle | Vendor::SqlServer, false) => "0",
            (_, true) => "TRUE",
            (_, false) => "FALSE",
        }
    }

    fn date_literal(&self, value: &str) -> String {
        match self {
            Vendor::SqlServer => self.quote_string(value),
            Vendor::ClickHouse => format!("toDate({})", self.quote_string(value)),
            _ => format!("DATE {}", self.quote_string(value)),
        }
    }

    fn timestamp_literal(&self, value: &str) -> String {
        match self {
            Vendor::SqlServer => self.quote_string(value),
            Vendor::ClickHouse => format!("toDateTime64({}, 6)", self.quote_string(value)),
            _ => format!("TIMESTAMP {}", self.quote_string(value)),
        }
    }

    fn time_literal(&self, value: &str) -> String {
        match self {
            Vendor::SqlServer | Vendor::ClickHouse => self.quote_string(value),
            _ => format!("TIME {}", self.quote_string(value)),
        }
    }
}

impl fmt::Display for Vendor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Vendor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sql92" | "ansi" | "sql" => Ok(Vendor::Sql92),
            "mysql" | "mariadb" => Ok(Vendor::MySql),
            "postgresql" | "postgres" => Ok(Vendor::PostgreSql),
            "oracle" => Ok(Vendor::Oracle),
            "sqlserver" | "mssql" => Ok(Vendor::SqlServer),
            "hsqldb" => Ok(Vendor::Hsqldb),
            "clickhouse" => Ok(Vendor::ClickHouse),
            other => Err(format!("Unknown SQL vendor '{}'", other)),
        }
    }
}
