use thiserror::Error;

/// Errors raised while reading or validating table configuration.
///
/// These are the only errors that abort a whole run; everything else is
/// contained at the table boundary.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Unknown origin: {0}")]
    UnknownOrigin(String),

    #[error("Unknown extraction strategy: {0}")]
    UnknownExtractionStrategy(String),

    #[error("Unknown materialization strategy: {0}")]
    UnknownMaterializationStrategy(String),

    #[error("Unknown load mode: {0}")]
    UnknownLoadMode(String),

    /// An incremental window needs a property to filter on.
    #[error("Table '{0}' has days_interval > 0 but no updated_at_property")]
    MissingUpdatedAtProperty(String),

    #[error("Target '{target}' is configured more than once for origin '{origin}'")]
    DuplicateTarget { origin: String, target: String },

    #[error("Table '{0}' is not configured")]
    UnknownTable(String),

    #[error("Invalid option: {0}")]
    InvalidOption(String),
}
