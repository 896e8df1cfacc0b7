use crate::error::CliError;
use model::config::table::{Origin, TableConfig};
use serde_json::json;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{error, info};

/// `--models` value for a run: the whole origin, or the raw model of a
/// single requested table plus everything built on top of it.
pub fn model_selector(origin: Origin, single_table: Option<&TableConfig>) -> String {
    match single_table {
        Some(table) => format!("{}+", table.raw_model_name()),
        None => origin.as_str().to_string(),
    }
}

/// Runs the downstream transformation project for one origin.
pub struct TransformRunner {
    program: String,
    project_dir: PathBuf,
}

impl TransformRunner {
    pub fn new(project_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: "dbt".to_string(),
            project_dir: project_dir.into(),
        }
    }

    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn args(&self, origin: Origin, models: &str) -> Vec<String> {
        let dir = self.project_dir.display().to_string();
        vec![
            "run".to_string(),
            "--project-dir".to_string(),
            dir.clone(),
            "--profiles-dir".to_string(),
            dir,
            "--models".to_string(),
            models.to_string(),
            "--vars".to_string(),
            json!({ "target_schema": origin.as_str() }).to_string(),
        ]
    }

    /// Not retried: a failure is reported and the run moves on.
    pub async fn run(&self, origin: Origin, models: &str) -> Result<(), CliError> {
        info!(%origin, models, project_dir = %self.project_dir.display(), "Running transformations");
        let output = Command::new(&self.program)
            .args(self.args(origin, models))
            .current_dir(project_root(&self.project_dir))
            .output()
            .await
            .map_err(|err| CliError::Transform(format!("failed to start {}: {err}", self.program)))?;

        if output.status.success() {
            info!(%origin, "Transformations finished");
            return Ok(());
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        error!(%origin, status = %output.status, %stdout, %stderr, "Transformations failed");
        Err(CliError::Transform(format!(
            "{} exited with {}",
            self.program, output.status
        )))
    }
}

fn project_root(dir: &Path) -> &Path {
    if dir.as_os_str().is_empty() {
        Path::new(".")
    } else {
        dir
    }
}
