//! Command-line interface for scrolldump
//!
//! This module handles:
//! - Command-line argument parsing using clap
//! - Configuration loading and validation
//! - Applying command-line overrides on top of the loaded configuration
//! - Building the initial `JobState` for local runs

use clap::{Args, Parser, Subcommand};
use serde_json::{Map, Value};
use std::path::PathBuf;

use crate::config::Config;
use crate::error::{ConfigError, Result};
use crate::export::{Cursor, JobState};

/// Export a search index into an object store, one page per step
#[derive(Parser, Debug)]
#[command(
    name = "scrolldump",
    version,
    about = "Scroll-driven search index export",
    long_about = "Exports the full result set of a search query into an object store page by
page, continuing across invocations by re-triggering itself with the updated cursor."
)]
pub struct CliArgs {
    /// Configuration file path
    #[arg(short = 'c', long = "config", value_name = "FILE", global = true)]
    pub config_file: Option<PathBuf>,

    /// Run continuations inline and only log object store writes
    #[arg(long, global = true)]
    pub debug: bool,

    /// Verbose mode (detailed logging)
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    /// Very verbose mode (trace logging)
    #[arg(long = "vv", global = true)]
    pub very_verbose: bool,

    /// Subcommands
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Subcommands for scrolldump
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Serve the AWS Lambda runtime
    Lambda,

    /// Run a whole export locally, continuations inline
    Run(RunArgs),

    /// Run one step on a JobState payload and print the continuation
    Step {
        /// Payload file, or "-" for stdin
        #[arg(value_name = "FILE", default_value = "-")]
        payload: String,
    },

    /// Show configuration
    Config {
        /// Show effective configuration
        #[arg(long)]
        show: bool,
    },
}

/// Arguments of a local run
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Search engine address
    #[arg(long, value_name = "URL")]
    pub endpoint: String,

    /// Collection (index) to export
    #[arg(long, value_name = "NAME")]
    pub collection: String,

    /// Destination bucket
    #[arg(long, value_name = "BUCKET")]
    pub bucket: String,

    /// Key prefix within the bucket
    #[arg(long, value_name = "PREFIX", default_value = "")]
    pub prefix: String,

    /// Resume from a previously issued cursor
    #[arg(long, value_name = "TOKEN")]
    pub cursor: Option<String>,

    /// Records per page
    #[arg(long, value_name = "N")]
    pub page_size: Option<u32>,

    /// Cursor lifetime (e.g. 1m)
    #[arg(long, value_name = "TTL")]
    pub page_ttl: Option<String>,

    /// Initial query options as a JSON object
    #[arg(long, value_name = "JSON")]
    pub query: Option<String>,

    /// Write pages under this directory instead of the object store
    #[arg(long, value_name = "DIR", conflicts_with = "dry_run")]
    pub output_dir: Option<PathBuf>,

    /// Only log pages
    #[arg(long)]
    pub dry_run: bool,
}

impl RunArgs {
    /// Build the initial job state
    ///
    /// # Arguments
    /// * `config` - Effective configuration supplying defaults
    pub fn job_state(&self, config: &Config) -> Result<JobState> {
        let mut state = JobState::new(
            &self.endpoint,
            &self.collection,
            &self.bucket,
            &config.export,
        )
        .with_prefix(&self.prefix);

        if let Some(size) = self.page_size {
            state.page_size = size;
        }
        if let Some(ref ttl) = self.page_ttl {
            state.page_ttl = ttl.clone();
        }
        if let Some(ref query) = self.query {
            state.query_options = parse_json_object("--query", query)?;
        }
        if let Some(cursor) = self.cursor.clone().and_then(Cursor::new) {
            state = state.with_cursor(cursor);
        }
        Ok(state)
    }
}

/// CLI interface handler
pub struct CliInterface {
    /// Parsed command-line arguments
    args: CliArgs,

    /// Loaded configuration
    config: Config,
}

impl CliInterface {
    /// Create a new CLI interface
    ///
    /// # Returns
    /// * `Result<Self>` - New CLI interface or error
    pub fn new() -> Result<Self> {
        Self::from_args(CliArgs::parse())
    }

    /// Create a CLI interface from already parsed arguments
    pub fn from_args(args: CliArgs) -> Result<Self> {
        let config = Self::load_config(&args)?;
        Ok(Self { args, config })
    }

    /// Load configuration from file and environment, then apply arguments
    ///
    /// # Arguments
    /// * `args` - Command-line arguments
    ///
    /// # Returns
    /// * `Result<Config>` - Loaded configuration or error
    fn load_config(args: &CliArgs) -> Result<Config> {
        let mut config = Config::load(args.config_file.as_deref())?;
        if args.debug {
            config.debug = true;
        }
        Ok(config)
    }

    /// Get parsed arguments
    pub fn args(&self) -> &CliArgs {
        &self.args
    }

    /// Get effective configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Log level after applying verbosity flags
    pub fn log_level(&self) -> tracing::Level {
        if self.args.very_verbose {
            tracing::Level::TRACE
        } else if self.args.verbose {
            tracing::Level::DEBUG
        } else {
            self.config.logging.level.to_tracing_level()
        }
    }
}

fn parse_json_object(field: &str, value: &str) -> Result<Map<String, Value>> {
    match serde_json::from_str(value) {
        Ok(Value::Object(map)) => Ok(map),
        _ => Err(ConfigError::InvalidValue {
            field: field.to_string(),
            value: value.to_string(),
        }
        .into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        CliArgs::command().debug_assert();
    }

    #[test]
    fn test_run_args_build_state() {
        let args = CliArgs::try_parse_from([
            "scrolldump",
            "run",
            "--endpoint",
            "http://es:9200",
            "--collection",
            "logs",
            "--bucket",
            "dumps",
            "--prefix",
            "2024",
            "--page-size",
            "500",
            "--query",
            r#"{"q": "level:error"}"#,
            "--cursor",
            "abc==",
        ])
        .unwrap();

        let Some(Commands::Run(run)) = args.command else {
            panic!("expected run subcommand");
        };
        let state = run.job_state(&Config::default()).unwrap();

        assert_eq!(state.destination_prefix, "2024");
        assert_eq!(state.page_size, 500);
        assert_eq!(state.page_ttl, "1m");
        assert_eq!(state.query_options["q"], "level:error");
        assert_eq!(state.cursor, Cursor::new("abc=="));
    }

    #[test]
    fn test_run_rejects_bad_query() {
        let args = CliArgs::try_parse_from([
            "scrolldump",
            "run",
            "--endpoint",
            "es:9200",
            "--collection",
            "logs",
            "--bucket",
            "dumps",
            "--query",
            "not json",
        ])
        .unwrap();

        let Some(Commands::Run(run)) = args.command else {
            panic!("expected run subcommand");
        };
        assert!(run.job_state(&Config::default()).is_err());
    }

    #[test]
    fn test_output_dir_conflicts_with_dry_run() {
        let result = CliArgs::try_parse_from([
            "scrolldump",
            "run",
            "--endpoint",
            "es:9200",
            "--collection",
            "logs",
            "--bucket",
            "dumps",
            "--output-dir",
            "/tmp",
            "--dry-run",
        ]);
        assert!(result.is_err());
    }
}
