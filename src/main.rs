//! oppcost - opportunity-cost prioritization matrix reporter
//!
//! A CLI tool that fetches business capabilities and their planning
//! projects from a workspace GraphQL API and renders a cost-velocity /
//! opportunity-cost matrix.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (connection, config, malformed response, etc.)
//!   2 - Opportunity-cost tag group not found in the workspace

mod analysis;
mod cli;
mod client;
mod config;
mod models;
mod report;
mod workspace;

use analysis::AnalysisError;
use anyhow::{Context, Result};
use chrono::Utc;
use cli::{Args, OutputFormat};
use client::{queries, GraphQlExecutor, HttpGraphQlClient};
use config::Config;
use models::{MatrixReport, ReportMetadata};
use std::time::Instant;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Initialize logging
    init_logging(&args);

    info!("oppcost v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    match run(args).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Run failed: {}", e);
            eprintln!("\n❌ Error: {}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .oppcost.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(".oppcost.toml");

    if path.exists() {
        eprintln!("⚠️  .oppcost.toml already exists. Remove it first or edit it manually.");
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).context("Failed to write .oppcost.toml")?;

    println!("✅ Created .oppcost.toml with default settings.");
    println!("   Edit it to set the API endpoint, tag group, and buckets.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Run the selected workflow. Returns exit code (0 or 2).
async fn run(args: Args) -> Result<i32> {
    let start_time = Instant::now();

    let mut config = load_config(&args)?;
    config.merge_with_args(&args);

    let client = HttpGraphQlClient::new(config.client_config())?;

    if args.seed_demo {
        println!("🌱 Seeding demo workspace at {}", config.api.url);
        let dataset = workspace::demo_dataset();
        workspace::seed_demo(&client, &dataset, Utc::now(), !args.quiet).await?;
        println!("✅ Demo workspace ready. Run oppcost again to see the matrix.");
        return Ok(0);
    }

    if args.reset_demo {
        println!("🧹 Resetting demo workspace at {}", config.api.url);
        let dataset = workspace::demo_dataset();
        workspace::reset_demo(&client, &dataset, config.aggregation.threshold, !args.quiet).await?;
        println!("✅ Demo workspace cleared.");
        return Ok(0);
    }

    run_report(&client, &config, &args, start_time).await
}

/// Fetch, aggregate, and write the matrix report.
async fn run_report(
    client: &dyn GraphQlExecutor,
    config: &Config,
    args: &Args,
    start_time: Instant,
) -> Result<i32> {
    println!(
        "🔎 Resolving tag group \"{}\"...",
        config.aggregation.tag_group
    );
    let groups = queries::fetch_tag_groups(client).await?;
    let group = match analysis::resolve_tag_group(
        &groups,
        &config.aggregation.tag_group,
        &config.aggregation.fact_sheet_type,
        config.aggregation.threshold,
    ) {
        Ok(group) => group,
        Err(e @ AnalysisError::TagGroupNotFound { .. }) => {
            warn!("{}", e);
            eprintln!("\n⛔ {}. Use --seed-demo to provision one, or --tag-group to adjust the search term.", e);
            return Ok(2);
        }
    };
    info!("resolved tag group \"{}\" ({})", group.name, group.id);

    println!("📥 Fetching business capabilities...");
    let capabilities = queries::fetch_capability_matrix(client).await?;

    println!("📊 Aggregating {} capabilities...", capabilities.len());
    let result = analysis::aggregate(
        &capabilities,
        &group.id,
        config.aggregation.x_kpi_buckets,
        Utc::now(),
    );

    let duration = start_time.elapsed().as_secs_f64();
    let metadata = ReportMetadata {
        api_url: config.api.url.clone(),
        generated_at: Utc::now(),
        tag_group_name: group.name.clone(),
        capabilities_total: capabilities.len(),
        capabilities_plotted: result.points.len(),
        projects_considered: result.points.iter().map(|p| p.project_count).sum(),
        duration_seconds: duration,
    };
    let report = MatrixReport { metadata, result };

    print_summary(&report);

    if args.dry_run {
        println!("\n✅ Dry run complete. No report was written.");
        return Ok(0);
    }

    let output = match args.format {
        OutputFormat::Json => report::generate_json_report(&report)?,
        OutputFormat::Markdown => report::generate_markdown_report(&report),
    };

    std::fs::write(&args.output, &output)
        .with_context(|| format!("Failed to write report to {}", args.output.display()))?;

    println!("\n✅ Report saved to: {}", args.output.display());
    Ok(0)
}

/// Print the matrix summary to the terminal.
fn print_summary(report: &MatrixReport) {
    let summary = &report.result.summary;

    println!("\n📊 Matrix Summary:");
    println!(
        "   Capabilities plotted: {} of {}",
        report.metadata.capabilities_plotted, report.metadata.capabilities_total
    );
    println!(
        "   Projects considered: {}",
        report.metadata.projects_considered
    );
    println!(
        "   Grid: {} velocity buckets × {} levels",
        summary.x_kpi_buckets, summary.y_kpi_buckets
    );
    println!("   Max velocity: {:.2} budget units/day", summary.max_x_kpi);

    for point in &report.result.points {
        println!(
            "   - {} → x {} / y {} ({}, budgets {:.2})",
            point.name, point.x_kpi, point.y_kpi, point.opportunity_cost, point.sum_budgets
        );
    }

    println!("   Duration: {:.1}s", report.metadata.duration_seconds);
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from .oppcost.toml");
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}
