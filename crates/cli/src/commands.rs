use clap::{ArgAction, Args, Subcommand};
use engine_core::schema::resolver::SchemaKind;
use model::{config::table::Origin, load::LoadMode};
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum Commands {
    /// Replicate the configured tables of one origin into the warehouse
    Run(RunArgs),

    /// List the configured tables of an origin and their sync state
    Tables {
        #[arg(long, help = "Origin tag: workspace, gateway or crm (vendor aliases accepted)")]
        origin: Origin,

        #[arg(long, help = "Print the tables as JSON instead of a table")]
        json: bool,

        #[arg(long, help = "Optional .env file with credentials")]
        env_file: Option<PathBuf>,
    },

    /// Test a warehouse connection string
    TestConn {
        /// Postgres connection string
        #[arg(long)]
        conn_str: String,
    },
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    #[arg(long, help = "Origin tag: workspace, gateway or crm (vendor aliases accepted)")]
    pub origin: Origin,

    #[arg(long, default_value = "all", help = "Source or target name of a single table, or 'all'")]
    pub table: String,

    #[arg(long, default_value_t = model::load::DEFAULT_CHUNK_SIZE)]
    pub chunk_size: usize,

    #[arg(long, default_value_t = connectors::api::gateway::source::DEFAULT_PAGE_SIZE)]
    pub page_size: usize,

    #[arg(long, default_value = "replace", help = "replace or append")]
    pub mode: LoadMode,

    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    pub extract: bool,

    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    pub load: bool,

    #[arg(long, default_value_t = false, action = ArgAction::Set, help = "Run the transformation project afterwards")]
    pub transform: bool,

    #[arg(long, default_value_t = false, action = ArgAction::Set, help = "Log notifications instead of posting them")]
    pub silent: bool,

    #[arg(long, help = "Optional .env file with credentials")]
    pub env_file: Option<PathBuf>,

    #[arg(long, help = "Directory for raw extraction output")]
    pub staging_dir: Option<PathBuf>,

    #[arg(long, help = "DDL file used for missing landing tables")]
    pub schema_file: Option<PathBuf>,

    #[arg(long, default_value = "template", help = "literal, template or info-schema")]
    pub schema_kind: SchemaKind,

    #[arg(long, help = "Write the JSON run report to this file instead of stdout")]
    pub output: Option<PathBuf>,
}

impl RunArgs {
    pub fn selected_table(&self) -> Option<&str> {
        match self.table.trim() {
            "" | "all" => None,
            name => Some(name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(subcommand)]
        command: Commands,
    }

    #[test]
    fn run_defaults() {
        let cli = TestCli::parse_from(["landing", "run", "--origin", "bitrix"]);
        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.origin, Origin::Crm);
        assert_eq!(args.selected_table(), None);
        assert_eq!(args.chunk_size, 1000);
        assert_eq!(args.page_size, 500);
        assert_eq!(args.mode, LoadMode::Replace);
        assert!(args.extract && args.load);
        assert!(!args.transform && !args.silent);
        assert_eq!(args.schema_kind, SchemaKind::Template);
    }

    #[test]
    fn run_flags() {
        let cli = TestCli::parse_from([
            "landing",
            "run",
            "--origin",
            "gateway",
            "--table",
            "orders",
            "--mode",
            "append",
            "--extract",
            "false",
            "--staging-dir",
            "/tmp/raw",
            "--schema-kind",
            "info-schema",
        ]);
        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.selected_table(), Some("orders"));
        assert_eq!(args.mode, LoadMode::Append);
        assert!(!args.extract);
        assert_eq!(args.staging_dir, Some(PathBuf::from("/tmp/raw")));
        assert_eq!(args.schema_kind, SchemaKind::InfoSchema);
    }

    #[test]
    fn unknown_origin_is_rejected() {
        assert!(TestCli::try_parse_from(["landing", "run", "--origin", "sap"]).is_err());
    }
}
