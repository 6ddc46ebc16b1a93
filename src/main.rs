//! CLI entry point for the fleet profit tool.
//!
//! Provides subcommands for exporting the per-truck feature table, training
//! the profit model, scoring a single delivery scenario, and printing the
//! descriptive statistics.

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use fleet_profit::config::PipelineConfig;
use fleet_profit::loader::CsvDirSource;
use fleet_profit::output::{
    self, CostProfileLine, DatasetSummary, DefaultsLine, DistributionLine, format_count,
    format_currency, format_number,
};
use fleet_profit::scenario::ScenarioRequest;
use fleet_profit::service::FleetService;
use fleet_profit::stats;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "fleet_profit")]
#[command(about = "Per-truck profit features and net profit prediction from fleet logs", long_about = None)]
struct Cli {
    /// JSON config file; FLEET_* environment variables override it
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding the vehicle, customer, cost and freight CSVs
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Where the trained model artifact is read from and written to
    #[arg(long, global = true)]
    model_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the feature table and export it with the city statistics
    Preprocess {
        /// Directory to write features.csv, cities.csv, trips.csv and summary.json to
        #[arg(short, long, default_value = "output")]
        out_dir: PathBuf,
    },
    /// Train the profit model on the current data and persist it
    Train,
    /// Predict net profit for one delivery scenario
    Predict(PredictArgs),
    /// Print cost profiles, cost-per-km spread and top cities
    Profile {
        /// Number of cities to list
        #[arg(short, long, default_value_t = 10)]
        top: usize,
    },
    /// List known truck types with their scenario defaults
    TruckTypes,
}

#[derive(Args)]
struct PredictArgs {
    /// Truck type the scenario is based on
    #[arg(short, long, required_unless_present = "request")]
    truck_type: Option<String>,

    /// Trip distance in km
    #[arg(long)]
    distance_km: Option<f64>,

    /// Shipment weight in kg
    #[arg(long)]
    weight_kg: Option<f64>,

    /// Shipment volume in cubic units
    #[arg(long)]
    weight_cubic: Option<f64>,

    /// Value of the goods carried
    #[arg(long)]
    goods_value: Option<f64>,

    /// Read the scenario from a JSON file instead of flags
    #[arg(long, conflicts_with = "truck_type")]
    request: Option<PathBuf>,

    /// Print the outcome as JSON
    #[arg(long, default_value_t = false)]
    json: bool,
}

impl PredictArgs {
    fn scenario(&self) -> Result<ScenarioRequest> {
        if let Some(path) = &self.request {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("reading scenario {}", path.display()))?;
            return serde_json::from_str(&content)
                .with_context(|| format!("parsing scenario {}", path.display()));
        }
        Ok(ScenarioRequest {
            truck_type: self.truck_type.clone().unwrap_or_default(),
            distance_km: self.distance_km,
            weight_kg: self.weight_kg,
            weight_cubic: self.weight_cubic,
            goods_value: self.goods_value,
        })
    }
}

/// Colored stderr logs plus a JSON rolling log file. The returned guard must
/// live until exit so buffered file logs are flushed.
fn init_logging() -> Result<WorkerGuard> {
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/fleet_profit.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("fleet_profit.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    Ok(file_guard)
}

fn load_config(cli: &Cli) -> Result<PipelineConfig> {
    let config = match &cli.config {
        Some(path) => PipelineConfig::load(path)?,
        None => PipelineConfig::default(),
    };
    let mut config = config.with_env_overrides()?;
    if let Some(dir) = &cli.data_dir {
        config.data_dir = dir.clone();
    }
    if let Some(path) = &cli.model_path {
        config.model_path = path.clone();
    }
    Ok(config)
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file
    let _file_guard = init_logging()?;

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    info!(
        data_dir = %config.data_dir.display(),
        model_path = %config.model_path.display(),
        "Configuration loaded"
    );

    let service = FleetService::new(CsvDirSource::new(&config), config);

    match cli.command {
        Commands::Preprocess { out_dir } => {
            let dataset = service.dataset()?;
            output::write_feature_csv(
                &out_dir.join("features.csv"),
                service.schema(),
                &dataset.features,
            )?;
            output::write_csv(&out_dir.join("cities.csv"), &dataset.cities)?;
            output::write_trip_csv(&out_dir.join("trips.csv"), &dataset.trips)?;
            output::write_json(
                &out_dir.join("summary.json"),
                &DatasetSummary {
                    generated_at: Utc::now(),
                    feature_rows: dataset.features.len(),
                    city_rows: dataset.cities.len(),
                    trip_rows: dataset.trips.len(),
                    truck_types: stats::truck_type_cost_profile(&dataset.features),
                },
            )?;
            println!(
                "{} trucks and {} city rows written to {}",
                format_count(dataset.features.len()),
                format_count(dataset.cities.len()),
                out_dir.display()
            );
        }
        Commands::Train => {
            let artifact = service.retrain()?;
            match &artifact.metrics {
                Some(m) => println!(
                    "R²: {:.4}  MAE: {}  MSE: {}  RMSE: {}  ({} train / {} test rows)",
                    m.r2,
                    format_number(m.mae, 2),
                    format_number(m.mse, 2),
                    format_number(m.rmse, 2),
                    format_count(m.train_rows),
                    format_count(m.test_rows)
                ),
                None => println!("Model trained; too few rows to evaluate a holdout"),
            }
            println!("Model saved to {}", service.config().model_path.display());
        }
        Commands::Predict(args) => {
            let request = args.scenario()?;
            let outcome = service.predict_scenario(&request)?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            } else {
                println!("Truck type: {}", outcome.truck_type);
                println!(
                    "Predicted Net Profit: {}",
                    format_currency(outcome.predicted_net_profit)
                );
                println!("This scenario is {}.", outcome.verdict);
            }
        }
        Commands::Profile { top } => {
            let dataset = service.dataset()?;
            let profile = stats::truck_type_cost_profile(&dataset.features);
            output::print_table(
                "Average costs per KM by truck type",
                profile.iter().map(CostProfileLine::from).collect(),
            );
            let spread = stats::cost_per_km_distribution(&dataset.features);
            output::print_table(
                "Costs per KM by truck type",
                spread.iter().map(DistributionLine::from).collect(),
            );
            let cities = stats::top_cities(&dataset.cities, top);
            output::print_table(
                &format!("Top {top} cities by total goods value"),
                output::city_lines(&cities),
            );
            let located = stats::geo_points(&dataset.cities).len();
            println!("{} city rows carry coordinates", format_count(located));
        }
        Commands::TruckTypes => {
            let dataset = service.dataset()?;
            let defaults: Vec<DefaultsLine> = dataset
                .means
                .truck_types()
                .filter_map(|t| stats::scenario_defaults(&dataset.means, t))
                .map(|d| DefaultsLine::from(&d))
                .collect();
            output::print_table("Known truck types and scenario defaults", defaults);
        }
    }

    Ok(())
}
