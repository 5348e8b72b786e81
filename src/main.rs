//! CLI entry point for the waybill dashboard.
//!
//! Each invocation is one render pass over a waybill export: load, filter,
//! compute KPIs, aggregate and print the requested view.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::collections::BTreeSet;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};
use waybill_dashboard::analyzers::aggregate::aggregate;
use waybill_dashboard::analyzers::types::{GroupBy, SortOrder};
use waybill_dashboard::config::DashboardConfig;
use waybill_dashboard::filter::{DateRange, FilterCriteria, apply, require_non_empty};
use waybill_dashboard::kpi::Kpi;
use waybill_dashboard::output::{
    print_pretty, render_chart, render_details, render_options, render_ranking, render_raw,
    render_tiles, to_json, write_csv,
};
use waybill_dashboard::pipeline::{RankingSelection, Selection, filtered_kpis, load, render_pass};
use waybill_dashboard::presentation::{
    ChartKind, ChartSelection, MetricTile, NumericField, RankingChart, chart_view, detail_rows,
    filter_options, metric_tiles, ranking_chart,
};
use waybill_dashboard::record::RecordSet;
use waybill_dashboard::source::InputSource;
use waybill_dashboard::{DashboardError, Result as DashboardResult};

#[derive(Parser)]
#[command(name = "waybill_dashboard")]
#[command(about = "Fuel and efficiency analytics over waybill exports", long_about = None)]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct CommonArgs {
    /// JSON export to analyze (gzip accepted). Defaults to the bundled example
    #[arg(short, long, global = true, value_name = "FILE")]
    input: Option<PathBuf>,

    /// Dashboard config file (JSON)
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Keep only these documents (repeatable)
    #[arg(long = "reference", global = true, value_name = "REFERENCE")]
    references: Vec<String>,

    /// Keep only these work types (repeatable)
    #[arg(long = "work-type", global = true, value_name = "WORK_TYPE")]
    work_types: Vec<String>,

    /// Keep only these drivers (repeatable)
    #[arg(long = "driver", global = true, value_name = "DRIVER")]
    drivers: Vec<String>,

    /// Keep only this equipment (repeatable)
    #[arg(long, global = true, value_name = "EQUIPMENT")]
    equipment: Vec<String>,

    /// First document day to include (YYYY-MM-DD)
    #[arg(long, global = true, value_parser = parse_date)]
    from: Option<NaiveDate>,

    /// Last document day to include (YYYY-MM-DD)
    #[arg(long, global = true, value_parser = parse_date)]
    to: Option<NaiveDate>,

    /// Output format
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// KPI tiles plus driver and route rankings
    Summary {
        #[arg(long, value_enum)]
        kpi: Option<Kpi>,

        #[arg(long, value_enum)]
        order: Option<SortOrder>,
    },
    /// Per-record KPI table
    Records {
        /// Also export the table to this CSV file
        #[arg(long, value_name = "FILE")]
        csv: Option<PathBuf>,
    },
    /// Rank drivers or routes by one KPI
    Rank {
        #[arg(long, value_enum, default_value_t = GroupBy::Driver)]
        by: GroupBy,

        #[arg(long, value_enum)]
        kpi: Option<Kpi>,

        #[arg(long, value_enum)]
        order: Option<SortOrder>,
    },
    /// Scatter chart of two fields, or one field over time by category
    Chart {
        #[arg(long, value_enum, default_value_t = ChartKind::Scatter)]
        kind: ChartKind,

        #[arg(short, long, value_enum, default_value_t = NumericField::FuelConsumed)]
        x: NumericField,

        #[arg(short, long, value_enum, default_value_t = NumericField::NomenclatureCountTotal)]
        y: NumericField,
    },
    /// Values available to each filter, from the whole document
    Options,
    /// Filtered records as loaded
    Raw {
        /// Also export the records to this CSV file
        #[arg(long, value_name = "FILE")]
        csv: Option<PathBuf>,
    },
    /// The complete dashboard for the current selection
    View,
}

#[derive(Serialize)]
struct SummaryView<'a> {
    records: usize,
    tiles: &'a [MetricTile],
    driver_ranking: &'a RankingChart,
    route_ranking: &'a RankingChart,
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| format!("expected YYYY-MM-DD: {e}"))
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path = std::env::var("LOG_FILE_PATH")
        .unwrap_or_else(|_| "logs/waybill_dashboard.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("waybill_dashboard.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(env_filter("RUST_LOG", "info")?);

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(env_filter("RUST_LOG_JSON", "debug")?);

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();
    run(cli)
}

fn env_filter(var: &str, default: &str) -> Result<EnvFilter> {
    Ok(EnvFilter::from_env(var).add_directive(default.parse()?))
}

#[tracing::instrument(skip_all)]
fn run(cli: Cli) -> Result<()> {
    let Cli { common, command } = cli;

    let config = DashboardConfig::resolve(common.config.as_deref())?;
    let input = InputSource::from_option(common.input.clone().or_else(|| config.input.clone()));
    let loaded = load(&input).with_context(|| format!("failed to load {input}"))?;
    let records = loaded.records;

    if loaded.report.negative_values > 0 {
        warn!(
            count = loaded.report.negative_values,
            "Negative numeric values present, KPIs use them as-is"
        );
    }

    let criteria = criteria(&common)?;
    let format = common.format;
    let ranking = |kpi: Option<Kpi>, order: Option<SortOrder>| RankingSelection {
        kpi: kpi.unwrap_or(config.ranking_kpi),
        order: order.unwrap_or(config.ranking_order),
    };

    match command {
        Commands::Summary { kpi, order } => {
            let Some(table) = or_empty(filtered_kpis(&records, &criteria), &records, format)? else {
                return Ok(());
            };
            let RankingSelection { kpi, order } = ranking(kpi, order);
            let tiles = metric_tiles(&table.means());
            let drivers = ranking_chart(aggregate(&table, GroupBy::Driver), GroupBy::Driver, kpi, order);
            let routes = ranking_chart(aggregate(&table, GroupBy::Route), GroupBy::Route, kpi, order);

            match format {
                OutputFormat::Json => println!(
                    "{}",
                    to_json(&SummaryView {
                        records: table.len(),
                        tiles: &tiles,
                        driver_ranking: &drivers,
                        route_ranking: &routes,
                    })?
                ),
                OutputFormat::Text => {
                    println!("Записей: {}\n", table.len());
                    println!("{}\n", render_tiles(&tiles));
                    println!("{}\n", render_ranking(&drivers));
                    println!("{}", render_ranking(&routes));
                }
            }
        }
        Commands::Records { csv } => {
            let Some(table) = or_empty(filtered_kpis(&records, &criteria), &records, format)? else {
                return Ok(());
            };
            let rows = detail_rows(&table);
            if let Some(path) = csv {
                write_csv(&path, &rows)
                    .with_context(|| format!("failed to export {}", path.display()))?;
            }
            match format {
                OutputFormat::Json => println!("{}", to_json(&rows)?),
                OutputFormat::Text => println!("{}", render_details(&rows)),
            }
        }
        Commands::Rank { by, kpi, order } => {
            let Some(table) = or_empty(filtered_kpis(&records, &criteria), &records, format)? else {
                return Ok(());
            };
            let RankingSelection { kpi, order } = ranking(kpi, order);
            let chart = ranking_chart(aggregate(&table, by), by, kpi, order);
            match format {
                OutputFormat::Json => println!("{}", to_json(&chart)?),
                OutputFormat::Text => println!("{}", render_ranking(&chart)),
            }
        }
        Commands::Chart { kind, x, y } => {
            let Some(table) = or_empty(filtered_kpis(&records, &criteria), &records, format)? else {
                return Ok(());
            };
            let chart = chart_view(&table, &ChartSelection { kind, x, y }, &config.presentation);
            match format {
                OutputFormat::Json => println!("{}", to_json(&chart)?),
                OutputFormat::Text => println!("{}", render_chart(&chart)),
            }
        }
        Commands::Options => print_options(&records, format)?,
        Commands::Raw { csv } => {
            let filtered = require_non_empty(apply(&records, &criteria));
            let Some(filtered) = or_empty(filtered, &records, format)? else {
                return Ok(());
            };
            if let Some(path) = csv {
                write_csv(&path, filtered.as_slice())
                    .with_context(|| format!("failed to export {}", path.display()))?;
            }
            match format {
                OutputFormat::Json => println!("{}", to_json(&filtered.as_slice())?),
                OutputFormat::Text => println!("{}", render_raw(filtered.as_slice())),
            }
        }
        Commands::View => {
            let selection = Selection {
                criteria,
                chart: ChartSelection::default(),
                ranking: ranking(None, None),
            };
            let result = render_pass(&records, &selection, &config.presentation);
            let Some(view) = or_empty(result, &records, format)? else {
                return Ok(());
            };
            print_pretty(&view);
            match format {
                OutputFormat::Json => println!("{}", to_json(&view)?),
                OutputFormat::Text => {
                    println!("{}\n", render_tiles(&view.tiles));
                    println!("{}\n", render_details(&view.details));
                    println!("{}\n", render_ranking(&view.driver_ranking));
                    println!("{}\n", render_ranking(&view.route_ranking));
                    println!("{}\n", render_chart(&view.chart));
                    println!("{}", render_raw(&view.raw));
                }
            }
        }
    }

    Ok(())
}

/// Builds filter criteria from the flags. A one-sided date range stays open
/// on the other side.
fn criteria(common: &CommonArgs) -> DashboardResult<FilterCriteria> {
    let date_range = match (common.from, common.to) {
        (None, None) => None,
        (from, to) => Some(DateRange::new(
            from.unwrap_or(NaiveDate::MIN),
            to.unwrap_or(NaiveDate::MAX),
        )?),
    };

    let set = |values: &[String]| values.iter().cloned().collect::<BTreeSet<_>>();
    Ok(FilterCriteria {
        references: set(&common.references),
        work_types: set(&common.work_types),
        drivers: set(&common.drivers),
        equipment: set(&common.equipment),
        date_range,
    })
}

/// Turns an empty filter result into a warning plus the available filter
/// values. Every other error ends the pass.
fn or_empty<T>(
    result: DashboardResult<T>,
    records: &RecordSet,
    format: OutputFormat,
) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(DashboardError::EmptyResult) => {
            warn!("No records match the selected filters");
            print_options(records, format)?;
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

fn print_options(records: &RecordSet, format: OutputFormat) -> Result<()> {
    let options = filter_options(records);
    info!(
        drivers = options.drivers.len(),
        work_types = options.work_types.len(),
        "Filter options collected"
    );
    match format {
        OutputFormat::Json => println!("{}", to_json(&options)?),
        OutputFormat::Text => println!("{}", render_options(&options)),
    }
    Ok(())
}
