use buddy_match::config::{MatchingSettings, Settings};
use buddy_match::core::{list_pairs, MatchError, Matcher};
use buddy_match::models::{Availability, DateRange, Day, DaySlot, MatchReport, PairFilter, Slot};
use buddy_match::services::{MemoryStore, PostgresStore, RegistrantStore, StoreError};
use buddy_match::telemetry;
use chrono::{NaiveDate, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use thiserror::Error;
use validator::Validate;
use tracing::{error, info};

/// Pair help-seekers with volunteers by weekly availability
#[derive(Debug, Parser)]
#[command(name = "buddy-match", version, about)]
struct Cli {
    /// Configuration file (defaults to config/default.toml + config/local.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run one matching pass and print the report
    Run(RunArgs),
    /// List committed pairs with both weekly schedules
    Pairs(PairsArgs),
}

#[derive(Debug, Args)]
struct RunArgs {
    /// Evaluate without committing any pairing
    #[arg(long)]
    dry_run: bool,

    #[arg(long)]
    seeker_page_size: Option<usize>,

    #[arg(long)]
    volunteer_page_size: Option<usize>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Read registrants from a JSON file instead of PostgreSQL
    #[arg(long)]
    fixture: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct PairsArgs {
    #[arg(long, default_value_t = 50)]
    page_size: usize,

    /// Earliest intake submission date of the seeker (YYYY-MM-DD)
    #[arg(long)]
    submitted_from: Option<NaiveDate>,

    /// Latest intake submission date of the seeker (YYYY-MM-DD)
    #[arg(long)]
    submitted_to: Option<NaiveDate>,

    /// Keep pairs whose seeker is available in this cell, e.g. monday_morning (repeatable)
    #[arg(long = "slot", value_parser = parse_day_slot)]
    slots: Vec<DaySlot>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Read registrants from a JSON file instead of PostgreSQL
    #[arg(long)]
    fixture: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Error)]
enum CliError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Match(#[from] MatchError),

    #[error("Invalid pair filter: {0}")]
    Filter(#[from] validator::ValidationErrors),

    #[error("Failed to render output: {0}")]
    Output(#[from] serde_json::Error),
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env file if present
    dotenv::dotenv().ok();

    let cli = Cli::parse();

    let settings = match load_settings(cli.config.as_deref()) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    telemetry::init(&settings.logging);

    match execute(cli.command, settings).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn load_settings(path: Option<&Path>) -> Result<Settings, config::ConfigError> {
    match path {
        Some(path) => Settings::load_from(path),
        None => Settings::load(),
    }
}

async fn execute(command: Command, settings: Settings) -> Result<(), CliError> {
    match command {
        Command::Run(args) => {
            let matching = MatchingSettings {
                seeker_page_size: args.seeker_page_size.unwrap_or(settings.matching.seeker_page_size),
                volunteer_page_size: args
                    .volunteer_page_size
                    .unwrap_or(settings.matching.volunteer_page_size),
            };
            let settings = Settings { matching, ..settings };
            settings.validate()?;

            let store = open_store(args.fixture.as_deref(), &settings).await?;
            let matcher = Matcher::new(store, settings.matching);

            let report = if args.dry_run {
                matcher.dry_run().await?
            } else {
                matcher.run().await?
            };

            print_report(&report, args.format)?;
        }
        Command::Pairs(args) => {
            if args.page_size == 0 {
                return Err(config::ConfigError::Message("--page-size must be at least 1".to_string()).into());
            }

            let filter = pair_filter(&args);
            filter.validate()?;

            let store = open_store(args.fixture.as_deref(), &settings).await?;
            let mut cursor = None;
            let mut total = 0;

            loop {
                let page = list_pairs(store.as_ref(), &filter, cursor, args.page_size).await?;
                total += page.items.len();

                for pair in &page.items {
                    match args.format {
                        OutputFormat::Text => println!("{}", pair),
                        OutputFormat::Json => println!("{}", serde_json::to_string(pair)?),
                    }
                }

                match page.next_cursor {
                    Some(next) => cursor = Some(next),
                    None => break,
                }
            }

            info!("Listed {} pairs", total);
        }
    }

    Ok(())
}

async fn open_store(fixture: Option<&Path>, settings: &Settings) -> Result<Arc<dyn RegistrantStore>, StoreError> {
    match fixture {
        Some(path) => Ok(Arc::new(MemoryStore::from_json_file(path).await?)),
        None => {
            let store = PostgresStore::connect(&settings.database).await?;
            if !store.health_check().await? {
                return Err(StoreError::Unavailable("PostgreSQL health check failed".to_string()));
            }
            info!("PostgreSQL store initialized");
            Ok(Arc::new(store))
        }
    }
}

/// Missing window bounds default to the epoch and today
fn pair_filter(args: &PairsArgs) -> PairFilter {
    let submitted = match (args.submitted_from, args.submitted_to) {
        (None, None) => None,
        (from, to) => Some(DateRange::new(
            from.unwrap_or_default(),
            to.unwrap_or_else(|| Utc::now().date_naive()),
        )),
    };
    let any_of = args
        .slots
        .iter()
        .fold(Availability::empty(), |grid, cell| grid.with(cell.day, cell.slot));

    PairFilter { submitted, any_of }
}

/// Parse a slot column name such as `friday_all_day`
fn parse_day_slot(raw: &str) -> Result<DaySlot, String> {
    Day::ALL
        .iter()
        .flat_map(|&day| Slot::ALL.iter().map(move |&slot| DaySlot::new(day, slot)))
        .find(|cell| cell.column_name() == raw)
        .ok_or_else(|| format!("unknown slot '{}', expected e.g. monday_morning", raw))
}

fn print_report(report: &MatchReport, format: OutputFormat) -> Result<(), CliError> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(report)?),
        OutputFormat::Text => {
            for record in &report.matches {
                println!("{}", record);
            }
            let verb = if report.dry_run { "proposed" } else { "committed" };
            println!(
                "{} pairs {} ({} seekers scanned, {} skipped as stale, {} invalid registrants)",
                report.matches.len(),
                verb,
                report.seekers_scanned,
                report.stale_skips,
                report.invalid_registrants,
            );
        }
    }

    Ok(())
}
