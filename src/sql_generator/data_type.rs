/// Coarse SQL column types.
///
/// Only used to pick a literal format when a constant is compared against a
/// column, so the catalog keeps just enough detail for that decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum SqlDataType {
    Character,
    Numeric,
    Boolean,
    Date,
    Timestamp,
    Time,
    Binary,
    Interval,
    #[default]
    Unknown,
}

impl SqlDataType {
    /// Classify a vendor type name such as `VARCHAR(32)`, `int8`,
    /// `Nullable(UInt64)` or `DateTime64(3)`.
    pub fn from_type_name(name: &str) -> Self {
        let upper = strip_wrappers(name.trim()).to_uppercase();
        let base = upper
            .split(|c: char| c == '(' || c.is_whitespace())
            .next()
            .unwrap_or("");

        match base {
            "CHAR" | "VARCHAR" | "VARCHAR2" | "NCHAR" | "NVARCHAR" | "NVARCHAR2" | "TEXT"
            | "STRING" | "CLOB" | "NCLOB" | "FIXEDSTRING" | "CHARACTER" | "UUID" | "ENUM"
            | "ENUM8" | "ENUM16" | "LONGTEXT" | "MEDIUMTEXT" | "TINYTEXT" => {
                SqlDataType::Character
            }
            "INT" | "INTEGER" | "BIGINT" | "SMALLINT" | "TINYINT" | "MEDIUMINT" | "DECIMAL"
            | "NUMERIC" | "NUMBER" | "REAL" | "FLOAT" | "DOUBLE" | "SERIAL" | "BIGSERIAL"
            | "INT2" | "INT4" | "INT8" | "INT16" | "INT32" | "INT64" | "INT128" | "INT256"
            | "UINT8" | "UINT16" | "UINT32" | "UINT64" | "UINT128" | "UINT256" | "FLOAT4"
            | "FLOAT8" | "FLOAT32" | "FLOAT64" | "DECIMAL32" | "DECIMAL64" | "DECIMAL128"
            | "MONEY" => SqlDataType::Numeric,
            "BOOL" | "BOOLEAN" | "BIT" => SqlDataType::Boolean,
            "DATE" | "DATE32" => SqlDataType::Date,
            "TIMESTAMP" | "DATETIME" | "DATETIME2" | "DATETIME64" | "SMALLDATETIME"
            | "TIMESTAMPTZ" => SqlDataType::Timestamp,
            "TIME" | "TIMETZ" => SqlDataType::Time,
            "BLOB" | "BINARY" | "VARBINARY" | "BYTEA" | "LONGBLOB" | "RAW" | "IMAGE" => {
                SqlDataType::Binary
            }
            "INTERVAL" => SqlDataType::Interval,
            _ => SqlDataType::Unknown,
        }
    }

    pub fn is_numeric(self) -> bool {
        self == SqlDataType::Numeric
    }
}

/// `Nullable(T)` and `LowCardinality(T)` only matter to ClickHouse storage.
fn strip_wrappers(name: &str) -> &str {
    let mut current = name;
    loop {
        let lower = current.to_ascii_lowercase();
        let inner = ["nullable(", "lowcardinality("]
            .iter()
            .find(|prefix| lower.starts_with(*prefix) && current.ends_with(')'))
            .map(|prefix| &current[prefix.len()..current.len() - 1]);
        match inner {
            Some(inner) => current = inner.trim(),
            None => return current,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_common_type_names() {
        assert_eq!(SqlDataType::from_type_name("VARCHAR(32)"), SqlDataType::Character);
        assert_eq!(SqlDataType::from_type_name("int"), SqlDataType::Numeric);
        assert_eq!(SqlDataType::from_type_name("double precision"), SqlDataType::Numeric);
        assert_eq!(SqlDataType::from_type_name("timestamp with time zone"), SqlDataType::Timestamp);
        assert_eq!(SqlDataType::from_type_name("geometry"), SqlDataType::Unknown);
    }

    #[test]
    fn test_clickhouse_wrappers() {
        assert_eq!(SqlDataType::from_type_name("Nullable(UInt64)"), SqlDataType::Numeric);
        assert_eq!(
            SqlDataType::from_type_name("LowCardinality(Nullable(String))"),
            SqlDataType::Character
        );
        assert_eq!(SqlDataType::from_type_name("DateTime64(3)"), SqlDataType::Timestamp);
    }
}
