//! Fan Tracker
//!
//! Records career progress entries against a weekly fan goal. Stats are
//! read from a screenshot of the career details screen with Tesseract OCR.

mod config;
mod ocr;
mod paths;
mod scan;
mod tracker;

use anyhow::{Context, Result, anyhow};
use chrono::Local;
use clap::{Parser, Subcommand};
use std::fs::OpenOptions;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::config::TrackerConfig;
use crate::ocr::ExtractedFields;
use crate::scan::ScanSlot;
use crate::tracker::{EntryForm, TrackerState};

/// Interval between busy-indicator ticks while a scan is running.
const SCAN_POLL_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Parser, Debug)]
#[command(name = "fan-tracker")]
#[command(about = "Track career fan progress against a weekly goal")]
struct Args {
    /// Enable debug logging (includes raw OCR text)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Tracker data file (defaults to tracker.json next to the executable)
    #[arg(long, global = true)]
    data: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Read career stats from a screenshot
    Scan {
        /// Screenshot of the career details screen
        image: PathBuf,
        /// OCR language (overrides config.json)
        #[arg(long)]
        lang: Option<String>,
        /// Convert to grayscale before recognition
        #[arg(long)]
        preprocess: bool,
        /// Print only the recovered fields as JSON
        #[arg(long)]
        json: bool,
        /// Record the scanned entry in the history
        #[arg(long)]
        record: bool,
    },
    /// Extract stats from already-recognized text (file or stdin)
    Parse {
        /// Text file; reads stdin when omitted
        file: Option<PathBuf>,
    },
    /// Locate tesseract and make sure language data is installed
    Setup {
        /// OCR language (overrides config.json)
        #[arg(long)]
        lang: Option<String>,
    },
    /// Show this week's entries and progress toward the goal
    Progress,
    /// Delete a recorded entry
    Delete {
        /// Entry id as shown by `progress`
        id: i64,
    },
    /// Start a new week from the current fan total
    NewWeek {
        /// Fans to earn in the new week (keeps the current goal when omitted)
        #[arg(long)]
        goal: Option<u64>,
    },
}

fn main() -> Result<()> {
    install_panic_hook();

    let args = Args::parse();

    if let Err(e) = paths::ensure_directories() {
        eprintln!("Warning: could not create log directory: {}", e);
    }
    init_logging(args.verbose)?;

    config::init_config();

    let data_file = args.data.unwrap_or_else(paths::get_data_file);

    let result = match args.command {
        Command::Scan {
            image,
            lang,
            preprocess,
            json,
            record,
        } => run_scan(&image, lang, preprocess, json, record.then_some(data_file.as_path())),
        Command::Parse { file } => run_parse(file.as_deref()),
        Command::Setup { lang } => run_setup(lang),
        Command::Progress => run_progress(&data_file),
        Command::Delete { id } => run_delete(&data_file, id),
        Command::NewWeek { goal } => run_new_week(&data_file, goal),
    };

    if let Err(e) = &result {
        error!("{:#}", e);
    }
    result
}

/// Logs to stderr and to `logs/fan_tracker.log` next to the executable.
fn init_logging(verbose: bool) -> Result<()> {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let file_layer = OpenOptions::new()
        .create(true)
        .append(true)
        .open(paths::get_log_file())
        .ok()
        .map(|file| fmt::layer().with_ansi(false).with_writer(Mutex::new(file)));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow!("Failed to initialize logging: {}", e))
}

/// Writes panics to the log file, since the subscriber may not be up yet.
fn install_panic_hook() {
    std::panic::set_hook(Box::new(|panic_info| {
        let msg = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };
        let location = panic_info
            .location()
            .map(|loc| format!(" at {}:{}:{}", loc.file(), loc.line(), loc.column()))
            .unwrap_or_default();

        let log_msg = format!("[PANIC]{} {}\n", location, msg);
        eprint!("{}", log_msg);
        if let Ok(mut file) = OpenOptions::new()
            .create(true)
            .append(true)
            .open(paths::get_log_file())
        {
            let _ = file.write_all(log_msg.as_bytes());
        }
    }));
}

/// Global config with per-invocation CLI overrides applied.
fn effective_config(lang: Option<String>, preprocess: bool) -> TrackerConfig {
    let mut config = config::get_config().clone();
    if let Some(lang) = lang {
        config.language = lang;
    }
    if preprocess {
        config.preprocess = true;
    }
    config
}

fn run_scan(
    image: &Path,
    lang: Option<String>,
    preprocess: bool,
    json: bool,
    record_to: Option<&Path>,
) -> Result<()> {
    let config = effective_config(lang, preprocess);
    let recognizer = Arc::new(ocr::engine_from_config(&config));

    let slot = ScanSlot::new();
    let handle = slot.submit(image.to_path_buf(), config, recognizer)?;

    eprint!("Scanning");
    while slot.is_scanning() {
        eprint!(".");
        let _ = std::io::stderr().flush();
        std::thread::sleep(SCAN_POLL_INTERVAL);
    }
    eprintln!();

    let fields = handle
        .wait()
        .map_err(|e| anyhow!("Scan failed: {}. Check the screenshot and try again.", e))?;

    if fields.is_empty() {
        warn!("No stats recognized in {}", image.display());
    }

    let mut form = EntryForm::new();
    form.apply(&fields);

    if json {
        println!("{}", serde_json::to_string_pretty(&fields)?);
    } else {
        print_form(&form, &fields);
    }

    if let Some(data_file) = record_to {
        let mut state = TrackerState::load(data_file)?;
        let id = state.next_id(Local::now().timestamp_millis());
        let item = state.record(&form, id);
        info!("Recorded entry {} ({}, {} fans)", item.id, item.name, item.fan);
        state.save(data_file)?;
    }
    Ok(())
}

fn print_form(form: &EntryForm, fields: &ExtractedFields) {
    let marker = |found: bool| if found { "" } else { "  (not found)" };

    println!("Uma:        {}{}", form.uma_name, marker(fields.name.is_some()));
    println!(
        "Races:      {}{}",
        form.total_races,
        marker(fields.total_races.is_some())
    );
    println!(
        "Wins:       {}{}",
        form.total_wins,
        marker(fields.total_wins.is_some())
    );
    println!(
        "Fans:       {}{}",
        form.total_fan,
        marker(fields.total_fan.is_some())
    );
    println!("Date:       {}{}", form.date, marker(fields.date.is_some()));
    println!("Time:       {}", form.time);
}

fn run_parse(file: Option<&Path>) -> Result<()> {
    let text = match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read stdin")?;
            buf
        }
    };

    let fields = ocr::extract(&text);
    info!("Recovered {} of 5 fields", fields.recovered_count());
    println!("{}", serde_json::to_string_pretty(&fields)?);
    Ok(())
}

fn run_setup(lang: Option<String>) -> Result<()> {
    let config = effective_config(lang, false);

    let exe = ocr::setup::find_tesseract_executable(config.tesseract_path.as_deref())?;
    info!("Tesseract found at: {}", exe.display());

    let tessdata = ocr::ensure_language_data(config.tessdata_dir.as_deref(), &config.language)?;
    info!("Language data for '{}' ready in {}", config.language, tessdata.display());
    Ok(())
}

fn run_progress(data_file: &Path) -> Result<()> {
    let state = TrackerState::load(data_file)?;
    let summary = state.summary();

    for item in &state.history {
        println!("{:>14}  {:<20} {:>12}  {}", item.id, item.name, item.fan, item.date);
    }
    if !state.history.is_empty() {
        println!();
    }

    println!("Entries:    {}", state.history.len());
    println!("Careers:    {}", state.stats.careers);
    println!("Races:      {}", state.stats.total_races);
    println!("Begin fans: {}", state.stats.total_fan);
    println!("Total fans: {}", summary.current_fan);
    println!("Goal:       {}", summary.target_fan);
    println!("Progress:   {:.0}%", summary.progress_percent);
    println!("Next week begins at {}", summary.next_week_begin());
    Ok(())
}

fn run_delete(data_file: &Path, id: i64) -> Result<()> {
    let mut state = TrackerState::load(data_file)?;
    if !state.delete(id) {
        return Err(anyhow!("No entry with id {}", id));
    }
    state.save(data_file)?;
    info!("Deleted entry {}", id);
    Ok(())
}

fn run_new_week(data_file: &Path, goal: Option<u64>) -> Result<()> {
    let mut state = TrackerState::load(data_file)?;
    state.new_week();
    if let Some(goal) = goal {
        state.stats.goal_for_week = goal;
    }
    state.save(data_file)?;
    info!(
        "New week begins at {} fans, goal {}",
        state.stats.total_fan, state.stats.goal_for_week
    );
    Ok(())
}
