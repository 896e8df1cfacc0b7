use crate::error::SchemaError;
use csv::ReaderBuilder;
use model::core::identifiers::{LandingTable, quote_ident};
use serde::Deserialize;
use std::{fmt, path::Path, str::FromStr};

/// Kind of file passed with `--schema-file`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SchemaKind {
    Literal,
    #[default]
    Template,
    InfoSchema,
}

impl FromStr for SchemaKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "literal" | "schema" => Ok(SchemaKind::Literal),
            "template" => Ok(SchemaKind::Template),
            "info-schema" | "info_schema" => Ok(SchemaKind::InfoSchema),
            other => Err(format!("unknown schema kind '{other}'")),
        }
    }
}

impl fmt::Display for SchemaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SchemaKind::Literal => "literal",
            SchemaKind::Template => "template",
            SchemaKind::InfoSchema => "info-schema",
        };
        f.write_str(name)
    }
}

/// Where CREATE TABLE statements for missing landing tables come from.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaResolver {
    /// A fixed DDL statement, used as-is.
    Literal(String),
    /// DDL with `{{ target_schema }}` / `{{ target_table }}` placeholders.
    Template(String),
    /// Exported `information_schema.columns` rows, `;` separated.
    InfoSchema(Vec<ColumnSpec>),
    /// Nothing configured: missing tables cannot be created.
    Unconfigured,
}

/// One row of an information-schema export.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ColumnSpec {
    pub table_name: String,
    pub column_name: String,
    pub udt_name: String,
    #[serde(default)]
    pub character_maximum_length: Option<String>,
}

pub const ENVELOPE_TEMPLATE: &str = "CREATE TABLE {{ target_schema }}.{{ target_table }} (\n    \"ID\" varchar NOT NULL,\n    \"SUCCESS\" bool,\n    \"CONTENT\" jsonb\n);";

impl Default for SchemaResolver {
    /// The three-column landing envelope.
    fn default() -> Self {
        SchemaResolver::Template(ENVELOPE_TEMPLATE.to_string())
    }
}

impl SchemaResolver {
    pub fn from_file(kind: SchemaKind, path: impl AsRef<Path>) -> Result<Self, SchemaError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_text(kind, &text)
    }

    pub fn from_text(kind: SchemaKind, text: &str) -> Result<Self, SchemaError> {
        match kind {
            SchemaKind::Literal => Ok(SchemaResolver::Literal(text.to_string())),
            SchemaKind::Template => Ok(SchemaResolver::Template(text.to_string())),
            SchemaKind::InfoSchema => parse_info_schema(text).map(SchemaResolver::InfoSchema),
        }
    }

    /// DDL that creates `table`.
    pub fn resolve(&self, table: &LandingTable) -> Result<String, SchemaError> {
        match self {
            SchemaResolver::Literal(ddl) => Ok(ddl.clone()),
            SchemaResolver::Template(template) => Ok(render_template(template, table)),
            SchemaResolver::InfoSchema(columns) => info_schema_ddl(columns, table),
            SchemaResolver::Unconfigured => Err(SchemaError::NoSource(table.clone())),
        }
    }
}

fn render_template(template: &str, table: &LandingTable) -> String {
    let schema = quote_ident(&table.schema);
    let name = quote_ident(&table.table);
    let mut rendered = template.to_string();
    for (key, value) in [("target_schema", &schema), ("target_table", &name)] {
        rendered = rendered
            .replace(&format!("{{{{ {key} }}}}"), value)
            .replace(&format!("{{{{{key}}}}}"), value)
            .replace(&format!("{{{key}}}"), value);
    }
    rendered
}

fn parse_info_schema(text: &str) -> Result<Vec<ColumnSpec>, SchemaError> {
    let mut reader = ReaderBuilder::new()
        .delimiter(b';')
        .has_headers(true)
        .from_reader(text.as_bytes());

    reader
        .deserialize::<ColumnSpec>()
        .map(|row| row.map_err(|err| SchemaError::InvalidExport(err.to_string())))
        .collect()
}

fn info_schema_ddl(columns: &[ColumnSpec], table: &LandingTable) -> Result<String, SchemaError> {
    let definitions = columns
        .iter()
        .filter(|column| column.table_name == table.table)
        .map(column_definition)
        .collect::<Result<Vec<_>, _>>()?;

    if definitions.is_empty() {
        return Err(SchemaError::NoColumns(table.table.clone()));
    }

    Ok(format!(
        "CREATE TABLE {} (\n    {}\n);",
        table.quoted(),
        definitions.join(",\n    ")
    ))
}

fn column_definition(column: &ColumnSpec) -> Result<String, SchemaError> {
    let mut definition = format!("{} {}", quote_ident(&column.column_name), column.udt_name);
    let length = column
        .character_maximum_length
        .as_deref()
        .map(str::trim)
        .filter(|raw| !raw.is_empty());
    if let Some(raw) = length {
        // Exports sometimes carry lengths as floats ("255.0").
        let parsed = raw
            .parse::<f64>()
            .map_err(|_| SchemaError::InvalidExport(format!("bad length '{raw}'")))?;
        definition.push_str(&format!("({})", parsed as u64));
    }
    Ok(definition)
}
