use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use duty_core::{hts, Shipment};
use duty_observability::{init_tracing, AppMetrics, TracingConfig};
use duty_service::{ServiceError, ServiceSettings, TariffService};
use duty_storage::{read_tariff_csv_path, sample_records, Store, TariffRepository};
use serde::Serialize;
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "duty")]
#[command(about = "HTS duty and landed-cost calculator")]
struct Cli {
    /// SQLite database; without one an in-memory sample schedule is used.
    #[arg(long, env = "DUTY_DATABASE_URL")]
    database_url: Option<String>,

    #[arg(long, env = "DUTY_LOG_LEVEL", default_value = "info")]
    log_level: String,

    #[arg(long, env = "DUTY_LOG_JSON", default_value_t = false)]
    log_json: bool,

    /// Emit JSON instead of plain text.
    #[arg(long, global = true)]
    json: bool,

    /// Print the metrics snapshot after the command.
    #[arg(long, global = true)]
    metrics: bool,

    #[arg(long, default_value_t = 10)]
    default_search_limit: usize,

    #[arg(long, default_value_t = 100)]
    max_search_limit: usize,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Compute CIF, duties and landed cost for one shipment.
    Calculate {
        hts: String,
        #[arg(long)]
        cost: f64,
        #[arg(long, default_value_t = 0.0)]
        freight: f64,
        #[arg(long, default_value_t = 0.0)]
        insurance: f64,
        /// Kilograms per unit.
        #[arg(long)]
        unit_weight: f64,
        #[arg(long, default_value_t = 1)]
        quantity: u32,
    },
    Lookup {
        hts: String,
    },
    Search {
        query: String,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Normalize, validate and break down an HTS number without a lookup.
    Format {
        hts: String,
    },
    /// Load the development schedule into the database.
    Seed,
    Import {
        path: PathBuf,
    },
    List,
    Sample,
}

#[derive(Debug, Serialize)]
struct ErrorReport<'a> {
    success: bool,
    kind: &'a str,
    error: String,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    init_tracing(&TracingConfig {
        service_name: "duty_cli".to_string(),
        level: cli.log_level.clone(),
        json: cli.log_json,
    });

    let store = build_store(cli.database_url.as_deref()).await?;
    let metrics = AppMetrics::shared();
    let service = TariffService::new(
        Arc::new(store.clone()),
        metrics.clone(),
        ServiceSettings {
            default_search_limit: cli.default_search_limit,
            max_search_limit: cli.max_search_limit,
        },
    );

    let outcome = run(&cli, &store, &service).await;

    if cli.metrics {
        eprintln!("{}", serde_json::to_string_pretty(&metrics.snapshot())?);
    }

    match outcome {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(RunError::Service(err)) => {
            report_error(cli.json, &err)?;
            Ok(ExitCode::from(2))
        }
        Err(RunError::Other(err)) => Err(err),
    }
}

enum RunError {
    Service(ServiceError),
    Other(anyhow::Error),
}

impl From<ServiceError> for RunError {
    fn from(value: ServiceError) -> Self {
        Self::Service(value)
    }
}

impl From<anyhow::Error> for RunError {
    fn from(value: anyhow::Error) -> Self {
        Self::Other(value)
    }
}

impl From<serde_json::Error> for RunError {
    fn from(value: serde_json::Error) -> Self {
        Self::Other(value.into())
    }
}

async fn run(
    cli: &Cli,
    store: &Store,
    service: &TariffService<Store>,
) -> Result<(), RunError> {
    match &cli.command {
        Command::Calculate {
            hts,
            cost,
            freight,
            insurance,
            unit_weight,
            quantity,
        } => {
            let shipment = Shipment {
                product_cost: *cost,
                freight: *freight,
                insurance: *insurance,
                unit_weight: *unit_weight,
                quantity: *quantity,
            };
            let calculation = service.calculate_duty(hts, shipment).await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&calculation)?);
            } else {
                println!("{}", calculation.formatted_breakdown);
            }
        }
        Command::Lookup { hts } => {
            let info = service.lookup_hts_info(hts).await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&info)?);
            } else {
                let record = &info.record;
                println!("{} {}", info.formatted_number, record.description);
                for (title, rate) in [
                    ("General", &record.general_rate),
                    ("Special", &record.special_rate),
                    ("Column 2", &record.column2_rate),
                ] {
                    println!("  {title}: {}", rate.as_deref().unwrap_or("N/A"));
                }
            }
        }
        Command::Search { query, limit } => {
            let hits = service.search_by_description(query, *limit).await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&hits)?);
            } else if hits.is_empty() {
                println!("No HTS entries found matching '{query}'");
            } else {
                for hit in hits {
                    println!(
                        "{}  {}  [general: {}, special: {}]",
                        hit.hts_number,
                        hit.description,
                        hit.general_rate.as_deref().unwrap_or("N/A"),
                        hit.special_rate.as_deref().unwrap_or("N/A"),
                    );
                }
            }
        }
        Command::Format { hts: raw } => {
            hts::validate(raw).map_err(ServiceError::from)?;
            let hierarchy = hts::hierarchy(raw);
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&hierarchy)?);
            } else {
                println!("{}", hierarchy.formatted);
                println!("  normalized: {}", hierarchy.normalized);
                for (level, value) in [
                    ("chapter", &hierarchy.chapter),
                    ("heading", &hierarchy.heading),
                    ("subheading", &hierarchy.subheading),
                    ("tariff item", &hierarchy.tariff_item),
                    ("statistical suffix", &hierarchy.statistical_suffix),
                ] {
                    if let Some(value) = value {
                        println!("  {level}: {value}");
                    }
                }
            }
        }
        Command::Seed => {
            let count = store.insert_records(sample_records()).await?;
            println!("Seeded {count} sample HTS records");
        }
        Command::Import { path } => {
            let import = read_tariff_csv_path(path)?;
            let count = store.insert_records(import.records).await?;
            info!(path = %path.display(), count, skipped = import.skipped, "imported CSV");
            println!(
                "Imported {count} HTS records from {} ({} rows skipped)",
                path.display(),
                import.skipped
            );
        }
        Command::List => {
            for number in store.list_hts_numbers().await? {
                println!("{number}");
            }
        }
        Command::Sample => {
            let calculation = service.sample_calculation().await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&calculation)?);
            } else {
                println!("{}", calculation.formatted_breakdown);
            }
        }
    }

    Ok(())
}

fn report_error(json: bool, err: &ServiceError) -> Result<()> {
    if json {
        let report = ErrorReport {
            success: false,
            kind: err.kind(),
            error: err.user_message(),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        eprintln!("Error: {}", err.user_message());
    }
    Ok(())
}

async fn build_store(database_url: Option<&str>) -> Result<Store> {
    match database_url {
        Some(url) => Store::sqlite(url)
            .await
            .with_context(|| format!("failed opening tariff database {url}")),
        None => {
            let store = Store::memory();
            store.insert_records(sample_records()).await?;
            Ok(store)
        }
    }
}
