use crate::{
    config::table::{Origin, TableConfig},
    error::ConfigError,
};
use std::collections::HashSet;

/// Validated set of table configurations for a run.
#[derive(Debug, Clone, Default)]
pub struct TableCatalog {
    tables: Vec<TableConfig>,
}

impl TableCatalog {
    /// Validates every table and enforces unique `target_name` per origin.
    pub fn new(tables: Vec<TableConfig>) -> Result<Self, ConfigError> {
        let mut seen: HashSet<(Origin, String)> = HashSet::new();
        for table in &tables {
            table.validate()?;
            if !seen.insert((table.origin, table.target_name.clone())) {
                return Err(ConfigError::DuplicateTarget {
                    origin: table.origin.to_string(),
                    target: table.target_name.clone(),
                });
            }
        }
        Ok(Self { tables })
    }

    pub fn all(&self) -> &[TableConfig] {
        &self.tables
    }

    pub fn active(&self) -> impl Iterator<Item = &TableConfig> {
        self.tables.iter().filter(|t| t.active)
    }

    /// `None` (or `"all"`) selects every active table. A named table must exist,
    /// otherwise the whole run is rejected.
    pub fn select(&self, name: Option<&str>) -> Result<Vec<TableConfig>, ConfigError> {
        match name {
            None | Some("all") => Ok(self.active().cloned().collect()),
            Some(name) => {
                let selected: Vec<_> = self
                    .tables
                    .iter()
                    .filter(|t| t.matches(name))
                    .cloned()
                    .collect();
                if selected.is_empty() {
                    Err(ConfigError::UnknownTable(name.to_string()))
                } else {
                    Ok(selected)
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}
