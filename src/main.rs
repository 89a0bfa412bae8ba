//! Winter is Coming: frost days of French weather stations from the command line.

use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::EnvFilter;
use winter_is_coming::{FrostConfig, FrostDashboard, FrostError, ReportError, StationReport};

/// Frost-day statistics for the weather station closest to a French city
#[derive(Parser, Debug)]
#[command(name = "winter-is-coming")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Directory holding the reference tables
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Directory for downloaded weather files
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the cities whose name contains TEXT
    Search {
        /// Part of a city name, case is ignored
        text: String,
    },

    /// Show the frost statistics of the station closest to a city
    Report(ReportArgs),

    /// Delete downloaded weather files
    ClearCache,
}

#[derive(Args, Debug)]
struct ReportArgs {
    /// Part of a city name, case is ignored
    text: String,

    /// Exact name among the matches (defaults to the first match)
    #[arg(long)]
    city: Option<String>,

    /// First year analysed
    #[arg(long)]
    start_year: Option<i32>,

    /// Last year analysed
    #[arg(long)]
    end_year: Option<i32>,

    /// Minimum share of observed days for a station-year to count
    #[arg(long)]
    threshold: Option<f64>,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    /// Number of raw rows to show
    #[arg(long, default_value_t = 10)]
    preview: usize,
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            print_sources(&e);
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), FrostError> {
    let cli = Cli::parse();

    let rust_log = std::env::var("RUST_LOG").ok();
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(cli.verbose, rust_log.as_deref()))
        .with_target(false)
        .init();

    let mut config = FrostConfig::from_env();
    if let Some(data_dir) = cli.data_dir {
        config.data_dir = data_dir;
    }
    if let Some(cache_dir) = cli.cache_dir {
        config.cache_dir = cache_dir;
    }
    let dashboard = FrostDashboard::with_config(config).await?;

    match cli.command {
        Commands::Search { text } => {
            let names = dashboard.search(&text).await?;
            if names.is_empty() {
                println!("No city found.");
            }
            for name in names {
                println!("{}", name);
            }
        }
        Commands::Report(args) => {
            let reference = dashboard.static_data().await?;
            let result = dashboard
                .station_report()
                .reference(&reference)
                .query(&args.text)
                .maybe_city(args.city.as_deref())
                .maybe_start_year(args.start_year)
                .maybe_end_year(args.end_year)
                .maybe_completion_threshold(args.threshold)
                .call()
                .await;
            match result {
                Ok(report) if args.json => println!("{}", serde_json::to_string_pretty(&report)?),
                Ok(report) => print_report(&report, args.preview),
                Err(e) => print_report_error(&e),
            }
        }
        Commands::ClearCache => {
            let removed = dashboard.clear_weather_cache().await?;
            println!("Removed {} cached department files.", removed);
        }
    }
    Ok(())
}

/// `RUST_LOG` directives, with `-v`/`-vv` raising this crate's level on top of them.
fn log_filter(verbose: u8, rust_log: Option<&str>) -> EnvFilter {
    let filter = rust_log
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new("winter_is_coming=warn"));
    let directive = match verbose {
        0 => return filter,
        1 => "winter_is_coming=info",
        _ => "winter_is_coming=debug",
    };
    match directive.parse::<Directive>() {
        Ok(directive) => filter.add_directive(directive),
        Err(_) => filter,
    }
}

fn print_report(report: &StationReport, preview: usize) {
    println!("City:            {}", report.city.name);
    println!(
        "Closest station: {} ({}, {:.1} km)",
        report.station_id,
        report.station_name.as_deref().unwrap_or("unknown"),
        report.city.distance_km
    );
    println!("Department:      {}", report.department);
    match report.altitude {
        Some(altitude) => println!("Altitude:        {} m", altitude),
        None => println!("Altitude:        unknown"),
    }
    println!("Frost days:      {:.1} per year on average", report.mean_frost_days);
    if report.matches.len() > 1 {
        println!("Other matches:   {}", report.matches.join(", "));
    }

    println!("\nFrost days per year:");
    for year in &report.frost_days_per_year {
        println!(
            "  {}  {:>3}  {}",
            year.year,
            year.frost_days,
            "#".repeat((year.frost_days / 5) as usize)
        );
    }

    println!("\nFrost probability by month (mean of daily values):");
    for month in 1..=12 {
        let days: Vec<f64> = report
            .frost_probability_per_day
            .iter()
            .filter(|d| d.month == month)
            .map(|d| d.probability)
            .collect();
        if days.is_empty() {
            continue;
        }
        let mean = days.iter().sum::<f64>() / days.len() as f64;
        println!("  {:>2}  {:>5.1}%", month, mean * 100.0);
    }

    let likely: Vec<String> = report
        .frost_probability_per_day
        .iter()
        .filter(|d| d.probability >= 0.5)
        .filter_map(|d| d.calendar_date())
        .map(|date| date.format("%d %b").to_string())
        .collect();
    match (likely.first(), likely.last()) {
        (Some(first), Some(last)) => println!(
            "  {} calendar days with at least 50% frost probability (first {}, last {})",
            likely.len(),
            first,
            last
        ),
        _ => println!("  no day with at least 50% frost probability"),
    }

    if preview > 0 {
        println!("\nRaw rows:\n{}", report.observations.preview(preview));
    }
}

fn print_report_error(error: &ReportError) {
    match error {
        ReportError::NoCityMatch(_) => println!("No city found."),
        _ => {
            println!("{}", error);
            print_sources(error);
        }
    }
}

fn print_sources(error: &dyn std::error::Error) {
    let mut source = error.source();
    while let Some(cause) = source {
        eprintln!("  caused by: {}", cause);
        source = cause.source();
    }
}
