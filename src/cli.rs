//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::Parser;
use std::path::PathBuf;

/// oppcost - opportunity-cost prioritization matrix reporter
///
/// Fetch business capabilities and their planning projects from a
/// workspace GraphQL API and render a cost-velocity / opportunity-cost
/// matrix as Markdown or JSON.
///
/// Examples:
///   oppcost --api-url https://eu.example.com/graphql --api-token $TOKEN
///   oppcost --api-url https://eu.example.com/graphql --buckets 6 --format json
///   oppcost --api-url https://eu.example.com/graphql --seed-demo
///   oppcost --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Workspace GraphQL endpoint URL
    ///
    /// Not required when using --init-config.
    #[arg(
        long,
        value_name = "URL",
        env = "OPPCOST_API_URL",
        required_unless_present = "init_config"
    )]
    pub api_url: Option<String>,

    /// Workspace API token, sent as a bearer credential
    #[arg(long, value_name = "TOKEN", env = "OPPCOST_API_TOKEN", hide_env_values = true)]
    pub api_token: Option<String>,

    /// Search term for the opportunity-cost tag group
    ///
    /// The group is located by approximate name match, because its exact
    /// name depends on how the workspace was provisioned.
    #[arg(long, default_value = "Opportunity Cost", value_name = "NAME")]
    pub tag_group: String,

    /// Number of velocity buckets on the x-axis
    #[arg(long, default_value = "4", value_name = "COUNT")]
    pub buckets: u32,

    /// Fuzzy-match distance threshold (0.0 exact .. 1.0 anything)
    #[arg(long, default_value = "0.2", value_name = "DIST")]
    pub threshold: f64,

    /// Output file path for the report
    #[arg(short, long, default_value = "oppcost_report.md", value_name = "FILE")]
    pub output: PathBuf,

    /// Output format (markdown, json)
    #[arg(long, default_value = "markdown", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Request timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .oppcost.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Provision a demo workspace (tag group, capabilities, projects)
    #[arg(long, conflicts_with = "reset_demo")]
    pub seed_demo: bool,

    /// Tear the demo workspace down again
    #[arg(long, conflicts_with = "seed_demo")]
    pub reset_demo: bool,

    /// Fetch and aggregate, print the summary, write nothing
    #[arg(long)]
    pub dry_run: bool,

    /// Generate a default .oppcost.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        let api_url = self.api_url.as_deref().unwrap_or("");
        if !api_url.starts_with("http://") && !api_url.starts_with("https://") {
            return Err("API URL must start with 'http://' or 'https://'".to_string());
        }

        if self.buckets == 0 {
            return Err("Buckets must be at least 1".to_string());
        }

        if !(0.0..=1.0).contains(&self.threshold) {
            return Err("Threshold must be between 0.0 and 1.0".to_string());
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(timeout) = self.timeout {
            if timeout == 0 {
                return Err("Timeout must be at least 1 second".to_string());
            }
        }

        if self.dry_run && (self.seed_demo || self.reset_demo) {
            return Err("--dry-run only applies to report generation".to_string());
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
