use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tf_carbon::carbon_aware::load_forecast;
use tf_carbon::coefficients::StaticCoefficients;
use tf_carbon::config::EstimationConfig;
use tf_carbon::output::{render, OutputFormat};
use tf_carbon::plan::load_plan;
use tf_carbon::units::{CarbonUnit, TimeUnit};
use tf_carbon::Pipeline;
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Estimate the carbon footprint of a Terraform plan
    Plan(PlanArgs),
    /// Show version information
    Version,
}

#[derive(Parser, Debug)]
struct PlanArgs {
    /// Plan in JSON form (`terraform show -json <planfile>`)
    plan: PathBuf,

    /// Configuration file (TOML)
    #[arg(long, env = "TF_CARBON_CONFIG")]
    config: Option<PathBuf>,

    /// Time unit of the reported emissions (h, d, m, y)
    #[arg(long, env = "TF_CARBON_TIME_UNIT")]
    time_unit: Option<TimeUnit>,

    /// Mass unit of the reported emissions (g, kg)
    #[arg(long, env = "TF_CARBON_CARBON_UNIT")]
    carbon_unit: Option<CarbonUnit>,

    /// Directory with coefficient table overrides
    #[arg(long, env = "TF_CARBON_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Carbon intensity forecast file (JSON)
    #[arg(long, env = "TF_CARBON_INTENSITY_FILE")]
    carbon_intensity_file: Option<PathBuf>,

    /// Report format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Write the report to a file instead of stdout
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long, env = "TF_CARBON_LOG_JSON")]
    log_json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    match args.command {
        Commands::Version => {
            println!("tf-carbon v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Commands::Plan(plan_args) => run_plan(plan_args).await,
    }
}

fn init_tracing(json: bool) {
    let env_filter = EnvFilter::builder()
        .with_default_directive(Level::INFO.into())
        .from_env_lossy();

    let registry = tracing_subscriber::registry().with(env_filter);
    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }
}

async fn run_plan(args: PlanArgs) -> anyhow::Result<()> {
    init_tracing(args.log_json);
    info!("Starting tf-carbon v{}", env!("CARGO_PKG_VERSION"));

    let mut config = match &args.config {
        Some(path) => EstimationConfig::load(path)
            .await
            .with_context(|| format!("failed to load configuration {}", path.display()))?,
        None => EstimationConfig::default(),
    };
    if let Some(time) = args.time_unit {
        config.unit.time = time;
    }
    if let Some(carbon) = args.carbon_unit {
        config.unit.carbon = carbon;
    }
    if let Some(dir) = args.data_dir {
        config.data.path = Some(dir);
    }

    let coefficients = StaticCoefficients::load(config.data.path.as_deref())
        .await
        .context("failed to load coefficient tables")?;

    // A broken forecast only costs precision: fall back to the static tables.
    let forecast = match &args.carbon_intensity_file {
        Some(path) => match load_forecast(path).await {
            Ok(forecast) => Some(forecast),
            Err(e) => {
                warn!(
                    "Ignoring carbon intensity forecast {}: {}",
                    path.display(),
                    e
                );
                None
            }
        },
        None => None,
    };

    let records = load_plan(&args.plan)
        .await
        .with_context(|| format!("failed to read plan {}", args.plan.display()))?;
    info!("Read {} planned resources from {}", records.len(), args.plan.display());

    let pipeline = Arc::new(Pipeline::new(config, Arc::new(coefficients)).with_forecast(forecast));
    let report = pipeline
        .run_concurrent(records)
        .await
        .context("estimation failed")?;

    let rendered = render(&report, args.format)?;
    match &args.output {
        Some(path) => {
            tokio::fs::write(path, rendered)
                .await
                .with_context(|| format!("failed to write report to {}", path.display()))?;
            info!("Report written to {}", path.display());
        }
        None => println!("{}", rendered.trim_end()),
    }

    Ok(())
}
