//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.oppcost.toml` files.

use crate::client::ClientConfig;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Workspace API settings.
    #[serde(default)]
    pub api: ApiConfig,

    /// Aggregation settings.
    #[serde(default)]
    pub aggregation: AggregationConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Default output file path.
    #[serde(default = "default_output")]
    pub output: String,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output: default_output(),
            verbose: false,
        }
    }
}

fn default_output() -> String {
    "oppcost_report.md".to_string()
}

/// Workspace API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// GraphQL endpoint URL.
    #[serde(default)]
    pub url: String,

    /// Workspace API token. Prefer the OPPCOST_API_TOKEN environment
    /// variable over committing a token to the config file.
    #[serde(default)]
    pub token: Option<String>,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Transport-level retries per request.
    #[serde(default = "default_retries")]
    pub retries: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            token: None,
            timeout_seconds: default_timeout(),
            retries: default_retries(),
        }
    }
}

fn default_timeout() -> u64 {
    60
}

fn default_retries() -> usize {
    2
}

/// Aggregation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregationConfig {
    /// Search term for the opportunity-cost tag group.
    #[serde(default = "default_tag_group")]
    pub tag_group: String,

    /// Fact-sheet type the tag group must apply to.
    #[serde(default = "default_fact_sheet_type")]
    pub fact_sheet_type: String,

    /// Number of velocity buckets on the x-axis.
    #[serde(default = "default_buckets")]
    pub x_kpi_buckets: u32,

    /// Fuzzy-match distance threshold for the tag-group lookup.
    #[serde(default = "default_threshold")]
    pub threshold: f64,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            tag_group: default_tag_group(),
            fact_sheet_type: default_fact_sheet_type(),
            x_kpi_buckets: default_buckets(),
            threshold: default_threshold(),
        }
    }
}

fn default_tag_group() -> String {
    "Opportunity Cost".to_string()
}

fn default_fact_sheet_type() -> String {
    "Project".to_string()
}

fn default_buckets() -> u32 {
    4
}

fn default_threshold() -> f64 {
    crate::analysis::matcher::DEFAULT_THRESHOLD
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(".oppcost.toml");

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref url) = args.api_url {
            self.api.url = url.clone();
        }
        if let Some(ref token) = args.api_token {
            self.api.token = Some(token.clone());
        }
        if let Some(timeout) = args.timeout {
            self.api.timeout_seconds = timeout;
        }

        // Aggregation settings have CLI defaults, so they always override.
        self.aggregation.tag_group = args.tag_group.clone();
        self.aggregation.x_kpi_buckets = args.buckets;
        self.aggregation.threshold = args.threshold;

        self.general.output = args.output.to_string_lossy().to_string();
        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Connection settings for the GraphQL client.
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            api_url: self.api.url.clone(),
            api_token: self.api.token.clone(),
            timeout_seconds: self.api.timeout_seconds,
            retries: self.api.retries,
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
