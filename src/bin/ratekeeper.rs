//! ratekeeper CLI - record rates, chart history and manage conversions
//!
//! ## Example Usage
//!
//! ```bash
//! # Record the latest fetched rates (ignored if the last sample is < 30 min old)
//! ratekeeper record --bcv-usd 36.5 --bcv-eur 39.8 --binance 38.2 --cad-usd 0.74
//!
//! # Reconciled daily history for the last 30 days, merged with remote history
//! ratekeeper history --days 30 --external history.json
//!
//! # Log a conversion and export the history
//! ratekeeper convert --mode ref --input 10 --input-currency USD \
//!     --output 365 --output-currency VES --rate 36.5
//! ratekeeper conversions export --output history.csv
//! ```

use anyhow::Context;
use clap::{Parser, Subcommand};
use colored::Colorize;
use ratekeeper::calendar::{DayCalendar, HistoryWindow, ZoneCalendar};
use ratekeeper::clock::{Clock, SystemClock};
use ratekeeper::config::RatekeeperConfig;
use ratekeeper::conversion::{ConversionMode, NewConversion};
use ratekeeper::data::{ExternalDailySeries, ReconciliationEngine};
use ratekeeper::export::CsvExporter;
use ratekeeper::storage::{ConversionLog, ObservationLog, StorageBackend};
#[cfg(not(feature = "rusqlite-support"))]
use ratekeeper::storage::FileBackend;
use ratekeeper::types::{Instrument, RateValues};
use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

/// ratekeeper: exchange-rate history and conversion log
#[derive(Parser)]
#[command(name = "ratekeeper")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Exchange-rate history store and daily reconciliation", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Record the latest fetched rates (0 = unknown)
    Record {
        #[arg(long, default_value = "0")]
        bcv_usd: f64,

        #[arg(long, default_value = "0")]
        bcv_eur: f64,

        #[arg(long, default_value = "0")]
        binance: f64,

        #[arg(long, default_value = "0")]
        cad_usd: f64,
    },

    /// Print the reconciled daily history
    History {
        /// Window in days (7, 30 or 90; anything else means 90)
        #[arg(short = 'd', long, default_value = "7")]
        days: String,

        /// Remote history JSON (cadByDate / bcvByDate / bcvEurByDate)
        #[arg(short = 'e', long)]
        external: Option<PathBuf>,

        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Log a conversion
    Convert {
        /// Calculator mode (ref, ves, vs, cad)
        #[arg(short = 'm', long)]
        mode: String,

        #[arg(long)]
        input: f64,

        #[arg(long)]
        input_currency: String,

        #[arg(long)]
        output: f64,

        #[arg(long)]
        output_currency: String,

        #[arg(long)]
        rate: f64,
    },

    /// Manage the conversion history
    Conversions {
        #[command(subcommand)]
        action: ConversionAction,
    },

    /// Show configuration and store sizes
    Info,
}

#[derive(Subcommand)]
enum ConversionAction {
    /// List logged conversions, newest first
    List,

    /// Delete every logged conversion
    Clear,

    /// Export conversions as CSV
    Export {
        /// Output file (stdout when omitted)
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,

        /// Comma-separated header row to use instead of the English default
        #[arg(long)]
        headers: Option<String>,
    },
}

fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".ratekeeper")
}

fn load_config(path: Option<&Path>) -> anyhow::Result<RatekeeperConfig> {
    if let Some(config_path) = path {
        return RatekeeperConfig::load(config_path)
            .with_context(|| format!("Failed to load config {}", config_path.display()));
    }

    let default_config = default_data_dir().join("config.toml");
    if default_config.exists() {
        match RatekeeperConfig::load(&default_config) {
            Ok(config) => return Ok(config),
            Err(e) => {
                eprintln!("{} Ignoring {}: {}", "Warning:".yellow(), default_config.display(), e);
            }
        }
    }

    Ok(RatekeeperConfig::default())
}

/// Everything a command needs, resolved from the configuration
struct App {
    config: RatekeeperConfig,
    calendar: ZoneCalendar,
    data_dir: PathBuf,
    clock: Arc<dyn Clock>,
}

impl App {
    fn new(config: RatekeeperConfig) -> anyhow::Result<Self> {
        let calendar = config.calendar()?;
        let data_dir = config.data_dir.clone().unwrap_or_else(default_data_dir);
        fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create {}", data_dir.display()))?;

        Ok(Self {
            config,
            calendar,
            data_dir,
            clock: Arc::new(SystemClock),
        })
    }

    #[cfg(feature = "rusqlite-support")]
    fn backend(&self) -> anyhow::Result<Box<dyn StorageBackend>> {
        let path = self.data_dir.join("ratekeeper.db");
        let backend = ratekeeper::storage::SqliteBackend::open(&path)
            .with_context(|| format!("Failed to open {}", path.display()))?;
        Ok(Box::new(backend))
    }

    #[cfg(not(feature = "rusqlite-support"))]
    fn backend(&self) -> anyhow::Result<Box<dyn StorageBackend>> {
        Ok(Box::new(FileBackend::open(&self.data_dir)?))
    }

    fn observation_log(&self) -> anyhow::Result<ObservationLog<Box<dyn StorageBackend>>> {
        Ok(ObservationLog::from_config(
            self.backend()?,
            self.clock.clone(),
            &self.config,
        ))
    }

    fn conversion_log(&self) -> anyhow::Result<ConversionLog<Box<dyn StorageBackend>>> {
        Ok(ConversionLog::from_config(
            self.backend()?,
            self.clock.clone(),
            &self.config,
        ))
    }
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(cli.config.as_deref())?;
    let app = App::new(config)?;

    if cli.verbose {
        println!(
            "{} v{}",
            "ratekeeper".cyan().bold(),
            env!("CARGO_PKG_VERSION")
        );
        println!("Data dir: {}", app.data_dir.display().to_string().dimmed());
    }

    match cli.command {
        Commands::Record {
            bcv_usd,
            bcv_eur,
            binance,
            cad_usd,
        } => record_rates(&app, RateValues::new(bcv_usd, bcv_eur, binance, cad_usd)),
        Commands::History {
            days,
            external,
            json,
        } => show_history(&app, HistoryWindow::parse(&days), external.as_deref(), json),
        Commands::Convert {
            mode,
            input,
            input_currency,
            output,
            output_currency,
            rate,
        } => {
            let mode: ConversionMode = mode.parse()?;
            log_conversion(
                &app,
                NewConversion::new(mode, input, input_currency, output, output_currency, rate),
            )
        }
        Commands::Conversions { action } => manage_conversions(&app, action),
        Commands::Info => show_info(&app),
    }
}

fn record_rates(app: &App, rates: RateValues) -> anyhow::Result<()> {
    let mut log = app.observation_log()?;

    if log.record(rates) {
        println!("{} Recorded sample #{}", "✓".green(), log.len());
    } else if let Some(last) = log.latest() {
        println!(
            "{} Skipped: last sample at {} is newer than {} minutes",
            "•".yellow(),
            last.timestamp.with_timezone(&app.calendar.timezone()),
            app.config.min_sample_interval_minutes
        );
    }
    Ok(())
}

fn show_history(
    app: &App,
    window: HistoryWindow,
    external: Option<&Path>,
    json: bool,
) -> anyhow::Result<()> {
    let log = app.observation_log()?;

    let external = match external {
        Some(path) => {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            Some(ExternalDailySeries::from_json(&contents)?)
        }
        None => None,
    };

    let engine = ReconciliationEngine::new(app.calendar);
    let records = engine.reconcile_window(
        &log.read_all(),
        external.as_ref(),
        window,
        app.clock.now(),
    );

    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    if records.is_empty() {
        println!("{}", "No rate history yet".dimmed());
        return Ok(());
    }

    println!(
        "{:<12} {:>12} {:>12} {:>12} {:>12}",
        "date".bold(),
        Instrument::BcvUsd.as_str().bold(),
        Instrument::BcvEur.as_str().bold(),
        Instrument::Binance.as_str().bold(),
        Instrument::CadUsd.as_str().bold()
    );
    for record in &records {
        println!(
            "{:<12} {:>12.4} {:>12.4} {:>12.4} {:>12.4}",
            app.calendar.day_of(record.timestamp).to_string(),
            record.rates.bcv_usd,
            record.rates.bcv_eur,
            record.rates.binance,
            record.rates.cad_usd
        );
    }
    Ok(())
}

fn log_conversion(app: &App, conversion: NewConversion) -> anyhow::Result<()> {
    if !conversion.is_loggable() {
        println!("{} Skipped: input and output must both be positive", "•".yellow());
        return Ok(());
    }

    let mut log = app.conversion_log()?;
    let record = log.append(conversion);
    println!("{} Logged conversion {}", "✓".green(), record.id);
    Ok(())
}

fn manage_conversions(app: &App, action: ConversionAction) -> anyhow::Result<()> {
    let mut log = app.conversion_log()?;

    match action {
        ConversionAction::List => {
            let records = log.read_all();
            if records.is_empty() {
                println!("{}", "No conversions logged".dimmed());
            }
            for record in records {
                println!(
                    "{}  {:<4} {:>14.2} {:<4} -> {:>14.2} {:<4} @ {:.4}",
                    record
                        .timestamp
                        .with_timezone(&app.calendar.timezone())
                        .format("%Y-%m-%d %H:%M"),
                    record.mode.as_str().to_uppercase(),
                    record.input,
                    record.input_currency,
                    record.output,
                    record.output_currency,
                    record.rate
                );
            }
        }
        ConversionAction::Clear => {
            let count = log.len();
            log.clear();
            println!("{} Cleared {} conversions", "✓".green(), count);
        }
        ConversionAction::Export { output, headers } => {
            let exporter = CsvExporter::new(app.calendar);
            let header_row: Option<Vec<&str>> =
                headers.as_deref().map(|h| h.split(',').map(str::trim).collect());
            let records = log.read_all();

            match output {
                Some(path) => {
                    if exporter.export_to_file(&records, header_row.as_deref(), &path)? {
                        println!("{} Exported to {}", "✓".green(), path.display());
                    } else {
                        println!("{}", "Nothing to export".dimmed());
                    }
                }
                None => {
                    let text = exporter.serialize(&records, header_row.as_deref())?;
                    if text.is_empty() {
                        println!("{}", "Nothing to export".dimmed());
                    } else {
                        println!("{}", text);
                    }
                }
            }
        }
    }
    Ok(())
}

fn show_info(app: &App) -> anyhow::Result<()> {
    let observations = app.observation_log()?;
    let conversions = app.conversion_log()?;

    println!("{}", "ratekeeper".cyan().bold());
    println!("  timezone:          {}", app.config.timezone);
    println!("  data dir:          {}", app.data_dir.display());
    println!(
        "  rate samples:      {} / {}",
        observations.len(),
        observations.capacity()
    );
    println!(
        "  sample interval:   {} min",
        app.config.min_sample_interval_minutes
    );
    println!(
        "  conversions:       {} / {}",
        conversions.len(),
        conversions.capacity()
    );
    if let Some(latest) = observations.latest() {
        println!(
            "  latest sample:     {}",
            latest.timestamp.with_timezone(&app.calendar.timezone())
        );
    }
    Ok(())
}
