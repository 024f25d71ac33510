//! CLI entry point for the COW energy dashboard back end.
//!
//! Provides subcommands for serving the HTTP API and for printing KPI
//! snapshots, aggregates and accumulative trends from the command line.

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use cow_energy::Scope;
use cow_energy::analyzers::accumulate::{
    MAX_WINDOW_MONTHS, build_accumulative, current_month, default_start_for, parse_month,
    split_city_list, to_rows, unique_cities, window_months,
};
use cow_energy::analyzers::analyzer::{aggregate_scope, kpi_snapshot};
use cow_energy::api::create_app;
use cow_energy::api::handlers::ScopeQuery;
use cow_energy::config::Settings;
use cow_energy::output::{append_csv, print_json, to_csv};
use std::ffi::OsStr;
use std::path::Path;
use tracing::info;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "cow-energy")]
#[command(about = "Energy monitoring back end for Cells-on-Wheels generator sites", long_about = None)]
struct Cli {
    #[command(flatten)]
    settings: Settings,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct ScopeArgs {
    /// national, region, city or site (inferred from the ids when omitted)
    #[arg(long)]
    level: Option<String>,

    #[arg(long)]
    region_id: Option<String>,

    #[arg(long)]
    city_id: Option<String>,

    #[arg(long)]
    site_id: Option<String>,

    /// District label, matched exactly
    #[arg(long)]
    district: Option<String>,
}

impl From<ScopeArgs> for Scope {
    fn from(args: ScopeArgs) -> Self {
        Scope::from(ScopeQuery {
            level: args.level,
            region_id: args.region_id,
            city_id: args.city_id,
            site_id: args.site_id,
            district: args.district,
        })
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API
    Serve {
        /// Address to listen on
        #[arg(long, env = "COW_BIND_ADDR", default_value = "0.0.0.0:8080")]
        bind: String,

        /// Comma-separated list of allowed CORS origins
        #[arg(long, env = "COW_CORS_ORIGINS")]
        cors_origins: Option<String>,
    },
    /// Print the KPI snapshot for a scope
    Kpis {
        #[command(flatten)]
        scope: ScopeArgs,
    },
    /// Print the current per-group aggregate for a scope
    Aggregate {
        #[command(flatten)]
        scope: ScopeArgs,

        /// Print CSV instead of JSON
        #[arg(long, default_value_t = false)]
        csv: bool,

        /// CSV file to append the aggregate record to
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Print the accumulative monthly series per city
    Accumulative {
        /// First month, YYYY-MM
        #[arg(long)]
        start: Option<String>,

        /// Last month, YYYY-MM (defaults to the current month)
        #[arg(long)]
        end: Option<String>,

        /// Comma-separated city names (defaults to every catalog city)
        #[arg(long)]
        cities: Option<String>,

        /// Limit the default city list to one region
        #[arg(long)]
        region_id: Option<String>,

        /// Print CSV instead of JSON
        #[arg(long, default_value_t = false)]
        csv: bool,
    },
    /// Print the resolved hierarchy catalog
    Hierarchy,
}

fn init_logging() -> tracing_appender::non_blocking::WorkerGuard {
    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/cow_energy.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("cow_energy.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_filter = EnvFilter::try_from_env("RUST_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    let json_filter =
        EnvFilter::try_from_env("RUST_LOG_JSON").unwrap_or_else(|_| EnvFilter::new("debug"));

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(stderr_filter);

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(json_filter);

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    file_guard
}

fn month_or(text: Option<&str>, default: chrono::NaiveDate) -> Result<chrono::NaiveDate> {
    match text {
        None => Ok(default),
        Some(text) => {
            parse_month(text).with_context(|| format!("invalid month '{text}', expected YYYY-MM"))
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    let _file_guard = init_logging();

    let cli = Cli::parse();
    let state = cli.settings.build_state().await;

    match cli.command {
        Commands::Serve { bind, cors_origins } => {
            let app = create_app(state, cors_origins.as_deref());
            let listener = tokio::net::TcpListener::bind(&bind)
                .await
                .with_context(|| format!("failed to bind {bind}"))?;

            info!(addr = %bind, "Dashboard API listening");
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = tokio::signal::ctrl_c().await;
                    info!("Shutdown signal received");
                })
                .await?;
        }
        Commands::Kpis { scope } => {
            let scope = Scope::from(scope);
            let snapshot = state.rows.get().await;
            info!(source = ?snapshot.provenance, rows = snapshot.rows.len(), "Rows loaded");

            print_json(&kpi_snapshot(&snapshot.rows, &scope, &state.catalog))?;
        }
        Commands::Aggregate { scope, csv, output } => {
            let scope = Scope::from(scope);
            let snapshot = state.rows.get().await;
            info!(source = ?snapshot.provenance, rows = snapshot.rows.len(), "Rows loaded");

            let aggregate = aggregate_scope(&snapshot.rows, &scope, &state.catalog);
            if aggregate.is_empty() {
                info!("No data in scope");
            }
            let record = aggregate.to_chart_record();

            if let Some(path) = output.as_deref() {
                append_csv(path, std::slice::from_ref(&record))?;
                info!(path, "Aggregate appended");
            }

            if csv {
                print!("{}", to_csv(&[record])?);
            } else {
                print_json(&record)?;
            }
        }
        Commands::Accumulative {
            start,
            end,
            cities,
            region_id,
            csv,
        } => {
            let end = month_or(end.as_deref(), current_month())?;
            let start = month_or(start.as_deref(), default_start_for(end))?;
            let months = window_months(start, end);
            if months > MAX_WINDOW_MONTHS {
                bail!("window of {months} months exceeds the {MAX_WINDOW_MONTHS}-month limit");
            }

            if let Some(id) = region_id.as_deref() {
                if state.catalog.region(id).is_none() {
                    bail!("unknown region '{id}'");
                }
            }
            let cities = match cities {
                Some(list) => split_city_list(&list),
                None => unique_cities(state.catalog.city_names(region_id.as_deref())),
            };

            let series = build_accumulative(start, end, &cities);
            if csv {
                print!("{}", to_csv(&to_rows(&series))?);
            } else {
                print_json(&series)?;
            }
        }
        Commands::Hierarchy => {
            print_json(state.catalog.hierarchy())?;
        }
    }

    Ok(())
}
