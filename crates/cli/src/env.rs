use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::error::CliError;

pub const WORKSPACE_TOKEN: (&str, &str) = ("WORKSPACE_TOKEN", "NOTION_APIKEY");
pub const GATEWAY_URL: (&str, &str) = ("GATEWAY_URL", "BENDITO_BI_URL");
pub const GATEWAY_TOKEN: (&str, &str) = ("GATEWAY_TOKEN", "BENDITO_TOKEN");
pub const CRM_URL: (&str, &str) = ("CRM_URL", "BITRIX_URL");
pub const CRM_USER_ID: (&str, &str) = ("CRM_USER_ID", "BITRIX_USER_ID");
pub const CRM_TOKEN: (&str, &str) = ("CRM_TOKEN", "BITRIX_TOKEN");

pub const WAREHOUSE_URL: &str = "WAREHOUSE_URL";
pub const METADATA_URL: &str = "METADATA_URL";
pub const NOTIFY_WEBHOOK_URL: &str = "NOTIFY_WEBHOOK_URL";
pub const TRANSFORM_PROJECT_DIR: &str = "TRANSFORM_PROJECT_DIR";

/// Process environment overlaid with an optional .env file.
#[derive(Debug, Clone)]
pub struct EnvManager {
    vars: HashMap<String, String>,
    sensitive_patterns: Vec<String>,
}

impl EnvManager {
    pub fn new() -> Self {
        Self {
            vars: std::env::vars().collect(),
            sensitive_patterns: Self::default_sensitive_patterns(),
        }
    }

    /// Process environment plus `path`, when given. File entries win.
    pub fn load(path: Option<&Path>) -> Result<Self, CliError> {
        let mut env = Self::new();
        if let Some(path) = path {
            env.load_from_file(path)?;
        }
        Ok(env)
    }

    pub fn load_from_file<P: AsRef<Path>>(&mut self, path: P) -> Result<(), CliError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            CliError::Config(format!("Failed to read env file {}: {}", path.display(), e))
        })?;

        self.parse_env_content(&content)?;
        Ok(())
    }

    /// A non-empty value for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// Canonical name first, then the vendor alias.
    pub fn credential(&self, (name, alias): (&str, &str)) -> Option<&str> {
        self.get(name).or_else(|| self.get(alias))
    }

    pub fn require(&self, key: &str) -> Result<&str, CliError> {
        self.get(key)
            .ok_or_else(|| CliError::MissingEnv(key.to_string()))
    }

    /// `key=value` with secrets masked, for logging.
    pub fn describe(&self, key: &str) -> String {
        match self.get(key) {
            Some(_) if self.is_sensitive(key) => format!("{key}=***"),
            Some(value) => format!("{key}={value}"),
            None => format!("{key}=<unset>"),
        }
    }

    fn is_sensitive(&self, key: &str) -> bool {
        let key = key.to_ascii_lowercase();
        self.sensitive_patterns.iter().any(|p| key.contains(p.as_str()))
    }

    fn parse_env_content(&mut self, content: &str) -> Result<(), CliError> {
        for (line_num, line) in content.lines().enumerate() {
            let line = line.trim();

            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let line = line.strip_prefix("export ").unwrap_or(line);
            let Some((key, value)) = line.split_once('=') else {
                return Err(CliError::Config(format!(
                    "Invalid env file: malformed line {} (expected KEY=VALUE)",
                    line_num + 1
                )));
            };

            let key = key.trim();
            if key.is_empty() {
                return Err(CliError::Config(format!(
                    "Invalid env file: empty key at line {}",
                    line_num + 1
                )));
            }

            self.vars.insert(key.to_string(), Self::unquote_value(value));
        }

        Ok(())
    }

    fn unquote_value(value: &str) -> String {
        let value = value.trim();
        for quote in ['"', '\''] {
            if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
                return value[1..value.len() - 1].to_string();
            }
        }
        value.to_string()
    }

    fn default_sensitive_patterns() -> Vec<String> {
        ["password", "secret", "token", "apikey", "key", "url"]
            .into_iter()
            .map(String::from)
            .collect()
    }
}

impl Default for EnvManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty() -> EnvManager {
        EnvManager {
            vars: HashMap::new(),
            sensitive_patterns: EnvManager::default_sensitive_patterns(),
        }
    }

    #[test]
    fn test_parse_quoted_values() {
        let mut env = empty();
        let content = r#"
# Comment
QUOTED="value with spaces"
SINGLE='single quoted'
export UNQUOTED=no_spaces
        "#;

        env.parse_env_content(content).unwrap();
        assert_eq!(env.get("QUOTED"), Some("value with spaces"));
        assert_eq!(env.get("SINGLE"), Some("single quoted"));
        assert_eq!(env.get("UNQUOTED"), Some("no_spaces"));
    }

    #[test]
    fn test_invalid_env_format() {
        let mut env = empty();
        assert!(env.parse_env_content("INVALID LINE WITHOUT EQUALS").is_err());
        assert!(env.parse_env_content("=value").is_err());
    }

    #[test]
    fn test_credential_aliases() {
        let mut env = empty();
        env.parse_env_content("BITRIX_TOKEN=legacy\nCRM_URL=\nBITRIX_URL=crm.example.com")
            .unwrap();

        assert_eq!(env.credential(CRM_TOKEN), Some("legacy"));
        assert_eq!(env.credential(CRM_URL), Some("crm.example.com"));
        assert_eq!(env.credential(CRM_USER_ID), None);
        assert!(matches!(env.require(WAREHOUSE_URL), Err(CliError::MissingEnv(_))));
    }

    #[test]
    fn test_describe_masks_secrets() {
        let mut env = empty();
        env.parse_env_content("CRM_TOKEN=abc\nTRANSFORM_PROJECT_DIR=/srv/dbt").unwrap();
        assert_eq!(env.describe("CRM_TOKEN"), "CRM_TOKEN=***");
        assert_eq!(env.describe(TRANSFORM_PROJECT_DIR), "TRANSFORM_PROJECT_DIR=/srv/dbt");
        assert_eq!(env.describe("MISSING"), "MISSING=<unset>");
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        fs::write(&path, "NOTION_APIKEY=\"secret_1\"\n").unwrap();

        let env = EnvManager::load(Some(&path)).unwrap();
        assert_eq!(env.credential(WORKSPACE_TOKEN), Some("secret_1"));
    }
}
