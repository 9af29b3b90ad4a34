// fraglog - main.rs
//
// Application entry point. Handles:
// 1. CLI argument parsing
// 2. Configuration loading (config.toml, CLI overrides)
// 3. Logging initialisation (debug mode support)
// 4. Log ingestion and report output on stdout

use fraglog::{app, core, platform, util};

use clap::Parser;
use std::path::PathBuf;
use std::time::Instant;

/// fraglog - Quake 3 Arena game log digester.
///
/// Reads a server log, splits it into matches, and prints two JSON reports:
/// per-match kill statistics and deaths grouped by cause.
#[derive(Parser, Debug)]
#[command(name = "fraglog", version, about)]
struct Cli {
    /// Game log to digest.
    #[arg(default_value = util::constants::DEFAULT_LOG_PATH)]
    path: PathBuf,

    /// Enable debug logging (equivalent to RUST_LOG=debug).
    #[arg(short = 'd', long = "debug")]
    debug: bool,

    /// Digestion worker threads (0 = one per CPU). Overrides config.toml.
    #[arg(short = 'w', long = "workers")]
    workers: Option<usize>,

    /// Configuration file (defaults to the platform config directory).
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,
}

fn main() {
    let cli = Cli::parse();

    // Config is loaded first so its log level can feed the subscriber.
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| platform::config::PlatformPaths::resolve().config_file());
    let (config, config_problems) = platform::config::load_config(&config_path);

    util::logging::init(cli.debug, config.log_level.as_deref());

    tracing::info!(
        version = util::constants::APP_VERSION,
        debug = cli.debug,
        config = %config_path.display(),
        "fraglog starting"
    );

    for problem in &config_problems {
        tracing::warn!(error = %problem, "Configuration warning");
    }

    let mut ingest_config = app::ingest::IngestConfig {
        worker_threads: config.worker_threads,
        group_queue_capacity: config.group_queue_capacity,
        result_queue_capacity: config.result_queue_capacity,
    };
    if let Some(workers) = cli.workers {
        if workers <= util::constants::ABSOLUTE_MAX_WORKER_THREADS {
            ingest_config.worker_threads = workers;
        } else {
            tracing::warn!(
                workers,
                max = util::constants::ABSOLUTE_MAX_WORKER_THREADS,
                "Worker count out of range; keeping configured value"
            );
        }
    }

    if let Err(e) = run(&cli.path, &ingest_config) {
        tracing::error!(error = %e, "fraglog failed");
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run(path: &std::path::Path, config: &app::ingest::IngestConfig) -> util::error::Result<()> {
    let started = Instant::now();

    let records = app::ingest::ingest_file(path, config)?;

    let stdout = std::io::stdout();
    core::report::write_full_report(&records, &chrono::Local::now(), stdout.lock())?;

    tracing::info!(
        matches = records.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Report written"
    );
    Ok(())
}
