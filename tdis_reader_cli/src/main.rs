//! # tdis_reader_cli
//!
//! Part of the tdis_reader crate family.
//!
//! This is the application to convert TDIS mTPC event logs from the command line.
//!
//! ## Use
//!
//! Make a template configuration, fill it out, then run the conversion:
//!
//! ```bash
//! tdis_reader_cli -p config.yml new
//! tdis_reader_cli -p config.yml
//! ```
//!
//! `-n/--events` and `-s/--skip` override the event window of the configuration. The
//! `summary` subcommand prints the per-track summary of the window instead of writing output.
//!
//! Library logs are written to `./tdis_reader.log`.
use clap::{value_parser, Arg, Command};
use indicatif::{MultiProgress, ProgressBar};
use indicatif_log_bridge::LogWrapper;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use libtdis_reader::config::Config;
use libtdis_reader::error::ConfigError;
use libtdis_reader::process::{process, summarize_input};
use libtdis_reader::summary::TrackSummary;

fn make_template_config(path: &Path) -> Result<(), ConfigError> {
    Config::default().write_config_file(path)
}

/// Send the library's logs to a file
fn init_file_logger() -> spdlog::Result<()> {
    let file_sink = Arc::new(
        spdlog::sink::FileSink::builder()
            .path(PathBuf::from("./tdis_reader.log"))
            .formatter(Box::new(spdlog::formatter::PatternFormatter::new(
                spdlog::formatter::pattern!(
                    "[{date_short} {time_short}] - [thread: {tid}] - [{^{level}}] - {payload}{eol}"
                ),
            )))
            .truncate(true)
            .build()?,
    );
    let logger = Arc::new(
        spdlog::Logger::builder()
            .flush_level_filter(spdlog::LevelFilter::All)
            .sink(file_sink)
            .build()?,
    );
    spdlog::set_default_logger(logger);
    Ok(())
}

fn format_option(value: Option<f64>) -> String {
    value.map_or(String::from("-"), |v| format!("{v}"))
}

fn log_summary(summary: &[TrackSummary]) {
    log::info!("Found {} tracks.", summary.len());
    for track in summary {
        log::info!(
            "Track {}: p={} theta={} phi={} z={} hits={} time=[{}, {}] adc_mean={} rings={} pads={} planes={}",
            track.track_id,
            track.momentum,
            track.theta,
            track.phi,
            track.z_vertex,
            track.hit_count,
            format_option(track.time_min),
            format_option(track.time_max),
            format_option(track.adc_mean),
            track.n_rings,
            track.n_pads,
            track.n_planes
        );
    }
}

fn main() {
    // Create a cli
    let matches = Command::new("tdis_reader_cli")
        .about("Convert TDIS mTPC event logs into tables and dense arrays")
        .arg_required_else_help(true)
        .subcommand(Command::new("new").about("Make a template configuration yaml file"))
        .subcommand(
            Command::new("summary").about("Print the per-track summary of the event window"),
        )
        .arg(
            Arg::new("path")
                .short('p')
                .long("path")
                .required(true)
                .help("Path to the configuration file"),
        )
        .arg(
            Arg::new("events")
                .short('n')
                .long("events")
                .value_parser(value_parser!(usize))
                .help("Number of events to read, overriding the configuration"),
        )
        .arg(
            Arg::new("skip")
                .short('s')
                .long("skip")
                .value_parser(value_parser!(usize))
                .help("Number of leading events to skip, overriding the configuration"),
        )
        .get_matches();

    // Initialize feedback
    let logger = simplelog::TermLogger::new(
        simplelog::LevelFilter::Info,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    );

    let pb_manager = MultiProgress::new();

    if let Err(e) = LogWrapper::new(pb_manager.clone(), logger).try_init() {
        eprintln!("Could not create logging/progress: {e}");
        return;
    }
    if let Err(e) = init_file_logger() {
        log::warn!("Could not create the log file, library logs will not be saved: {e}");
    }

    // Parse the cli
    let config_path = match matches.get_one::<String>("path") {
        Some(path) => PathBuf::from(path),
        None => {
            log::error!("A configuration path is required");
            return;
        }
    };

    if let Some(("new", _)) = matches.subcommand() {
        log::info!(
            "Making a template config at {}...",
            config_path.to_string_lossy()
        );
        match make_template_config(&config_path) {
            Ok(()) => log::info!("Done."),
            Err(e) => log::error!("{e}"),
        }
        return;
    }

    // Load our config
    log::info!("Loading config from {}...", config_path.to_string_lossy());
    let mut config = match Config::read_config_file(&config_path) {
        Ok(c) => c,
        Err(e) => {
            log::error!("{e}");
            return;
        }
    };
    if let Some(n_events) = matches.get_one::<usize>("events") {
        config.n_events = Some(*n_events);
    }
    if let Some(skip_events) = matches.get_one::<usize>("skip") {
        config.skip_events = *skip_events;
    }
    log::info!("Config successfully loaded.");
    log::info!("Input Path: {}", config.input_path.to_string_lossy());
    log::info!("Output Path: {}", config.output_path.to_string_lossy());
    if let Some(summary_path) = &config.summary_path {
        log::info!("Summary Path: {}", summary_path.to_string_lossy());
    }
    log::info!("Hit Layout: {}", config.hit_layout);
    match config.n_events {
        Some(n) => log::info!("Skip Events: {} Read Events: {}", config.skip_events, n),
        None => log::info!("Skip Events: {} Read Events: all", config.skip_events),
    }

    if let Some(("summary", _)) = matches.subcommand() {
        match summarize_input(&config) {
            Ok(summary) => log_summary(&summary),
            Err(e) => log::error!("Summary failed with error: {e}"),
        }
        return;
    }

    // Setup the progress bar
    let pb = pb_manager.add(ProgressBar::new(100));
    let status = Arc::new(Mutex::new(0.0));
    let sent_status = status.clone();
    // Spawn the task!
    let handle = std::thread::spawn(|| process(config, sent_status));

    loop {
        // No UI to wake us, so poll every ~100 ms
        std::thread::sleep(std::time::Duration::from_millis(100));
        match status.lock() {
            Ok(stat) => pb.set_position((*stat * 100.0) as u64),
            Err(e) => log::error!("{e}"),
        }

        if handle.is_finished() {
            match handle.join() {
                Ok(result) => match result {
                    Ok(_) => log::info!("Successfully converted data!"),
                    Err(e) => log::error!("Conversion failed with error: {e}"),
                },
                Err(_) => log::error!("Failed to join conversion task!"),
            }
            break;
        }
    }

    pb.finish();

    log::info!("Done.");
}
