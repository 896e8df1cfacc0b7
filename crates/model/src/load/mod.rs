use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// What happens to rows already in the landing table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadMode {
    /// Keep existing rows. Re-running duplicates them.
    Append,
    /// Truncate, then insert. Not atomic: readers may briefly see an empty table.
    #[default]
    Replace,
}

impl FromStr for LoadMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "append" => Ok(LoadMode::Append),
            "replace" => Ok(LoadMode::Replace),
            other => Err(ConfigError::UnknownLoadMode(other.to_string())),
        }
    }
}

impl fmt::Display for LoadMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadMode::Append => f.write_str("append"),
            LoadMode::Replace => f.write_str("replace"),
        }
    }
}

pub const DEFAULT_CHUNK_SIZE: usize = 1000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct LoadOptions {
    pub mode: LoadMode,
    /// Rows per insert statement/transaction.
    pub chunk_size: usize,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            mode: LoadMode::default(),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl LoadOptions {
    pub fn new(mode: LoadMode, chunk_size: usize) -> Result<Self, ConfigError> {
        if chunk_size == 0 {
            return Err(ConfigError::InvalidOption(
                "chunk_size must be greater than zero".into(),
            ));
        }
        Ok(Self { mode, chunk_size })
    }
}

/// Outcome of loading one table in one run. Not persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadResult {
    pub rows_written: usize,
    pub mode: LoadMode,
    pub error: Option<String>,
}

impl LoadResult {
    pub fn written(rows_written: usize, mode: LoadMode) -> Self {
        Self {
            rows_written,
            mode,
            error: None,
        }
    }

    pub fn failed(mode: LoadMode, error: impl Into<String>) -> Self {
        Self {
            rows_written: 0,
            mode,
            error: Some(error.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}
