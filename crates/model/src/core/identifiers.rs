use serde::{Deserialize, Serialize};
use std::fmt;

/// Fully qualified name of a landing table in the warehouse.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LandingTable {
    pub schema: String,
    pub table: String,
}

impl LandingTable {
    pub fn new(schema: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            table: table.into(),
        }
    }

    /// `"schema"."table"`, safe to splice into DDL/DML.
    pub fn quoted(&self) -> String {
        format!("{}.{}", quote_ident(&self.schema), quote_ident(&self.table))
    }
}

impl fmt::Display for LandingTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.schema, self.table)
    }
}

/// Wraps an identifier in double quotes, doubling any embedded quote.
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quotes_schema_and_table() {
        let table = LandingTable::new("crm", "deals");
        assert_eq!(table.quoted(), r#""crm"."deals""#);
        assert_eq!(table.to_string(), "crm.deals");
    }

    #[test]
    fn escapes_embedded_quotes() {
        assert_eq!(quote_ident(r#"we"ird"#), r#""we""ird""#);
    }
}
