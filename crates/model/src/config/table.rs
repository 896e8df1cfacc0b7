use crate::{
    core::identifiers::LandingTable,
    error::ConfigError,
    sync::{state::SyncState, window::ExtractionWindow},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Vendor a table is replicated from. The canonical tag doubles as the
/// landing schema name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Origin {
    /// Block-based workspace/database service (cursor pagination).
    Workspace,
    /// BI SQL-query gateway answering in CSV (offset pagination).
    Gateway,
    /// CRM REST service (numeric `start` pagination).
    Crm,
}

impl Origin {
    pub fn as_str(&self) -> &'static str {
        match self {
            Origin::Workspace => "workspace",
            Origin::Gateway => "gateway",
            Origin::Crm => "crm",
        }
    }

    /// Every tag the metadata table may use for this origin.
    pub fn tags(&self) -> &'static [&'static str] {
        match self {
            Origin::Workspace => &["workspace", "notion"],
            Origin::Gateway => &["gateway", "bendito"],
            Origin::Crm => &["crm", "bitrix"],
        }
    }

    /// Prefix used when naming downstream models.
    pub fn model_suffix(&self) -> &'static str {
        match self {
            Origin::Workspace => "ntn",
            Origin::Gateway => "bdt",
            Origin::Crm => "btx",
        }
    }
}

impl FromStr for Origin {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "workspace" | "notion" => Ok(Origin::Workspace),
            "gateway" | "bendito" => Ok(Origin::Gateway),
            "crm" | "bitrix" => Ok(Origin::Crm),
            other => Err(ConfigError::UnknownOrigin(other.to_string())),
        }
    }
}

impl TryFrom<String> for Origin {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Origin> for String {
    fn from(origin: Origin) -> Self {
        origin.as_str().to_string()
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How records are pulled out of a vendor endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ExtractionStrategy {
    /// List ids, then fetch every object by id.
    Table,
    /// One request to a raw endpoint returning a `result` array.
    Enumeration,
    /// Every object of the (paginated) listing becomes a record.
    #[default]
    FlatList,
    /// A `result` map of field name to field description.
    FieldDictionary,
}

impl ExtractionStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractionStrategy::Table => "table",
            ExtractionStrategy::Enumeration => "enum",
            ExtractionStrategy::FlatList => "list",
            ExtractionStrategy::FieldDictionary => "fields",
        }
    }
}

impl FromStr for ExtractionStrategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "table" => Ok(ExtractionStrategy::Table),
            "enum" | "endpoint" | "enumeration" => Ok(ExtractionStrategy::Enumeration),
            "list" | "flat-list" => Ok(ExtractionStrategy::FlatList),
            "fields" | "field-dictionary" => Ok(ExtractionStrategy::FieldDictionary),
            other => Err(ConfigError::UnknownExtractionStrategy(other.to_string())),
        }
    }
}

impl TryFrom<String> for ExtractionStrategy {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ExtractionStrategy> for String {
    fn from(strategy: ExtractionStrategy) -> Self {
        strategy.as_str().to_string()
    }
}

impl fmt::Display for ExtractionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the downstream model is persisted. Carried through, never acted on here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum MaterializationStrategy {
    View,
    #[default]
    Table,
    Incremental,
}

impl MaterializationStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            MaterializationStrategy::View => "view",
            MaterializationStrategy::Table => "table",
            MaterializationStrategy::Incremental => "incremental",
        }
    }
}

impl FromStr for MaterializationStrategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "view" => Ok(MaterializationStrategy::View),
            "table" => Ok(MaterializationStrategy::Table),
            "incremental" => Ok(MaterializationStrategy::Incremental),
            other => Err(ConfigError::UnknownMaterializationStrategy(
                other.to_string(),
            )),
        }
    }
}

impl TryFrom<String> for MaterializationStrategy {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<MaterializationStrategy> for String {
    fn from(strategy: MaterializationStrategy) -> Self {
        strategy.as_str().to_string()
    }
}

/// One logical source table, as enumerated by the metadata table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableConfig {
    #[serde(default)]
    pub id: Option<i64>,
    pub origin: Origin,
    pub source_name: String,
    /// Vendor-side id or endpoint (database id, method name, table name).
    pub source_identifier: String,
    pub target_name: String,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub extraction_strategy: ExtractionStrategy,
    #[serde(default)]
    pub materialization_strategy: MaterializationStrategy,
    #[serde(default)]
    pub unique_id_property: Option<String>,
    #[serde(default)]
    pub updated_at_property: Option<String>,
    /// 0 means full refresh; N > 0 means only the last N days.
    #[serde(default)]
    pub days_interval: u32,
    #[serde(flatten)]
    pub sync: SyncState,
}

fn default_active() -> bool {
    true
}

impl TableConfig {
    pub fn new(
        origin: Origin,
        source_name: impl Into<String>,
        source_identifier: impl Into<String>,
        target_name: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            origin,
            source_name: source_name.into(),
            source_identifier: source_identifier.into(),
            target_name: target_name.into(),
            active: true,
            extraction_strategy: ExtractionStrategy::default(),
            materialization_strategy: MaterializationStrategy::default(),
            unique_id_property: None,
            updated_at_property: None,
            days_interval: 0,
            sync: SyncState::default(),
        }
    }

    pub fn with_strategy(mut self, strategy: ExtractionStrategy) -> Self {
        self.extraction_strategy = strategy;
        self
    }

    pub fn with_window(mut self, days: u32, updated_at_property: impl Into<String>) -> Self {
        self.days_interval = days;
        self.updated_at_property = Some(updated_at_property.into());
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.days_interval > 0
            && self
                .updated_at_property
                .as_deref()
                .is_none_or(|p| p.trim().is_empty())
        {
            return Err(ConfigError::MissingUpdatedAtProperty(
                self.source_name.clone(),
            ));
        }
        Ok(())
    }

    /// `<origin>.<target_name>`.
    pub fn landing_table(&self) -> LandingTable {
        LandingTable::new(self.origin.as_str(), &self.target_name)
    }

    /// Name of the raw model the transformation tool builds on top of the landing table.
    pub fn raw_model_name(&self) -> String {
        format!(
            "{}_raw_{}",
            self.origin.model_suffix(),
            self.source_name.replace('.', "_")
        )
    }

    pub fn window(&self, now: DateTime<Utc>) -> ExtractionWindow {
        ExtractionWindow::new(self.days_interval, self.updated_at_property.clone(), now)
    }

    pub fn matches(&self, name: &str) -> bool {
        self.source_name == name || self.target_name == name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origin_accepts_vendor_aliases() {
        assert_eq!("bitrix".parse::<Origin>().unwrap(), Origin::Crm);
        assert_eq!("Notion".parse::<Origin>().unwrap(), Origin::Workspace);
        assert_eq!("gateway".parse::<Origin>().unwrap(), Origin::Gateway);
        assert!("sap".parse::<Origin>().is_err());
    }

    #[test]
    fn strategy_aliases() {
        assert_eq!(
            "endpoint".parse::<ExtractionStrategy>().unwrap(),
            ExtractionStrategy::Enumeration
        );
        assert_eq!(
            "fields".parse::<ExtractionStrategy>().unwrap(),
            ExtractionStrategy::FieldDictionary
        );
        assert!("bulk".parse::<ExtractionStrategy>().is_err());
    }

    #[test]
    fn incremental_requires_updated_at_property() {
        let mut table = TableConfig::new(Origin::Crm, "crm.deal", "crm.deal", "deals");
        table.days_interval = 7;
        assert_eq!(
            table.validate(),
            Err(ConfigError::MissingUpdatedAtProperty("crm.deal".into()))
        );

        let table = table.with_window(7, "DATE_MODIFY");
        assert!(table.validate().is_ok());
    }

    #[test]
    fn naming() {
        let table = TableConfig::new(Origin::Crm, "crm.deal", "crm.deal", "deals");
        assert_eq!(table.landing_table().to_string(), "crm.deals");
        assert_eq!(table.raw_model_name(), "btx_raw_crm_deal");
    }

    #[test]
    fn deserializes_with_defaults() {
        let json = r#"{
            "origin": "bitrix",
            "source_name": "crm.deal",
            "source_identifier": "crm.deal",
            "target_name": "deals",
            "extraction_strategy": "table"
        }"#;
        let table: TableConfig = serde_json::from_str(json).unwrap();
        assert_eq!(table.origin, Origin::Crm);
        assert_eq!(table.extraction_strategy, ExtractionStrategy::Table);
        assert!(table.active);
        assert_eq!(table.days_interval, 0);
        assert!(table.sync.last_successful_sync_at.is_none());
    }
}
