//! forum-migrate CLI - resumable forum database migration to ForkBB.

use clap::{Parser, Subcommand};
use forum_migrate::{
    Config, FileStateBackend, MigrateError, MigrationPlan, MigrationSettings, Orchestrator,
    StateBackend,
};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn, Level};
use tracing_subscriber::fmt::format::FmtSpan;

#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};

#[derive(Parser)]
#[command(name = "forum-migrate")]
#[command(about = "Resumable migration of FluxBB, PunBB and ForkBB forums to ForkBB")]
#[command(version)]
struct Cli {
    /// Path to YAML configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Directory holding run state files (overrides migration.state_dir)
    #[arg(long)]
    state_dir: Option<PathBuf>,

    /// Output JSON result to stdout
    #[arg(long)]
    output_json: bool,

    /// Log format: text or json
    #[arg(long, default_value = "text")]
    log_format: String,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "info")]
    verbosity: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Identify the source forum product and version
    Detect,

    /// Create a new run without migrating anything yet
    Start,

    /// Perform one bounded batch of a run
    Step {
        /// Run key (defaults to the latest unfinished run, or a new one)
        #[arg(long)]
        run: Option<String>,
    },

    /// Perform batches until the run completes or a signal arrives
    Run {
        /// Run key (defaults to the latest unfinished run, or a new one)
        #[arg(long)]
        run: Option<String>,
    },

    /// Show the saved runs
    Status {
        /// Show a single run
        #[arg(long)]
        run: Option<String>,
    },

    /// Remove finished and expired run records
    Cleanup {
        /// Abandon this run: drop its tracking columns and delete its record
        #[arg(long)]
        run: Option<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run() -> Result<(), MigrateError> {
    let cli = Cli::parse();

    setup_logging(&cli.verbosity, &cli.log_format).map_err(MigrateError::Config)?;

    let config = Config::load(&cli.config)?;
    info!("Loaded configuration from {:?}", cli.config);

    let state_dir = cli
        .state_dir
        .clone()
        .unwrap_or_else(|| config.migration.state_dir.clone());
    let backend = FileStateBackend::new(state_dir);

    match cli.command {
        Commands::Detect => {
            let orchestrator = Orchestrator::connect(&config).await?;
            let detection = orchestrator.detect(&config).await?;
            orchestrator.close().await;

            if cli.output_json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&serde_json::json!({
                        "driver": detection.driver,
                        "version": detection.version,
                        "exact": detection.exact,
                    }))?
                );
            } else {
                println!("Detected {} {}", detection.driver, detection.version);
                if detection.exact {
                    println!("  Schema matches the destination; ids can be preserved");
                }
            }
        }

        Commands::Start => {
            backend.init().await?;
            let orchestrator = Orchestrator::connect(&config).await?;
            let settings = orchestrator.start(&config).await?;
            backend.save(&settings).await?;
            orchestrator.close().await;

            if cli.output_json {
                println!("{}", serde_json::to_string_pretty(&settings)?);
            } else {
                println!("Started run {}", settings.run_key);
                println!("  Driver: {} {}", settings.driver, settings.version);
                println!("  Mode: {}", settings.mode);
            }
        }

        Commands::Step { run } => {
            backend.init().await?;
            let orchestrator = Orchestrator::connect(&config).await?;
            let mut settings = select_run(&backend, &orchestrator, &config, run.as_deref()).await?;
            let outcome = orchestrator.step(&mut settings).await?;
            backend.save(&settings).await?;
            orchestrator.close().await;

            if cli.output_json {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            } else if outcome.finished {
                println!("Run {} complete ({} rows)", settings.run_key, settings.rows);
            } else {
                println!(
                    "Run {}: {} rows, next step {} cursor {}",
                    settings.run_key, outcome.rows, outcome.next_step, outcome.next_cursor
                );
            }
        }

        Commands::Run { run } => {
            backend.init().await?;
            let cancel_token = setup_signal_handler();
            let orchestrator = Orchestrator::connect(&config).await?;
            let mut settings = select_run(&backend, &orchestrator, &config, run.as_deref()).await?;
            let result = orchestrator
                .run(&mut settings, &backend, &cancel_token)
                .await;
            orchestrator.close().await;
            let summary = result?;

            if cli.output_json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                println!("\nMigration completed!");
                println!("  Run: {}", summary.run_key);
                println!("  Driver: {} ({} mode)", summary.driver, summary.mode);
                println!("  Duration: {:.2}s", summary.duration_seconds);
                println!("  Invocations: {}", summary.steps);
                println!("  Rows: {}", summary.total_rows);
                if !settings.renames.is_empty() {
                    println!("  Renamed users:");
                    for (from, to) in settings.renames.iter() {
                        println!("    {} -> {}", from, to);
                    }
                }
            }
        }

        Commands::Status { run } => {
            let runs = match run {
                Some(key) => vec![backend
                    .load(&key)
                    .await?
                    .ok_or_else(|| MigrateError::State(format!("Run {} not found", key)))?],
                None => backend.list().await?,
            };

            if cli.output_json {
                println!("{}", serde_json::to_string_pretty(&runs)?);
            } else if runs.is_empty() {
                println!("No runs in {:?}", backend.dir());
            } else {
                let total = MigrationPlan::default().cleanup_step();
                for settings in &runs {
                    print_status(settings, total);
                }
            }
        }

        Commands::Cleanup { run } => {
            let removed = match run {
                Some(key) => {
                    let settings = backend
                        .load(&key)
                        .await?
                        .ok_or_else(|| MigrateError::State(format!("Run {} not found", key)))?;
                    settings.validate_config(&config.hash())?;
                    let orchestrator = Orchestrator::connect(&config).await?;
                    orchestrator.drop_tracking().await?;
                    orchestrator.close().await;
                    backend.delete(&key).await?;
                    warn!("Run {} abandoned at step {}", key, settings.step);
                    vec![key]
                }
                None => {
                    let now = chrono::Utc::now();
                    let mut removed = Vec::new();
                    for settings in backend.list().await? {
                        if settings.is_finished() || settings.is_expired(now) {
                            backend.delete(&settings.run_key).await?;
                            removed.push(settings.run_key);
                        }
                    }
                    removed
                }
            };

            if cli.output_json {
                println!("{}", serde_json::to_string_pretty(&removed)?);
            } else {
                println!("Removed {} run record(s)", removed.len());
            }
        }
    }

    Ok(())
}

/// The run named `key`, the latest unfinished run of this configuration,
/// or a newly started one.
async fn select_run(
    backend: &FileStateBackend,
    orchestrator: &Orchestrator,
    config: &Config,
    key: Option<&str>,
) -> Result<MigrationSettings, MigrateError> {
    let hash = config.hash();
    if let Some(key) = key {
        let settings = backend
            .load(key)
            .await?
            .ok_or_else(|| MigrateError::State(format!("Run {} not found", key)))?;
        settings.validate_config(&hash)?;
        info!("Continuing run {} at step {}", settings.run_key, settings.step);
        return Ok(settings);
    }
    if let Some(settings) = backend.load_latest(&hash).await? {
        info!("Continuing run {} at step {}", settings.run_key, settings.step);
        return Ok(settings);
    }
    let settings = orchestrator.start(config).await?;
    backend.save(&settings).await?;
    Ok(settings)
}

fn print_status(settings: &MigrationSettings, total: i64) {
    println!("Run {}", settings.run_key);
    println!(
        "  Source: {} ({} {})",
        settings.source.location, settings.driver, settings.version
    );
    println!("  Target: {}", settings.target.location);
    println!("  Mode: {}", settings.mode);
    println!(
        "  Progress: step {}/{} cursor {} ({} rows)",
        settings.step, total, settings.cursor, settings.rows
    );
    println!("  Status: {:?}", settings.status);
    println!("  Updated: {}", settings.updated_at);
    println!("  Expires: {}", settings.expires_at);
}

fn setup_logging(verbosity: &str, format: &str) -> Result<(), String> {
    let level = match verbosity.to_lowercase().as_str() {
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_span_events(FmtSpan::CLOSE)
        .with_target(false)
        .with_writer(std::io::stderr);

    match format {
        "json" => subscriber.json().init(),
        "text" => subscriber.init(),
        other => return Err(format!("Unknown log format: {}", other)),
    }

    Ok(())
}

/// Cancel the returned token on SIGINT or SIGTERM. The current batch always
/// completes; the run stops before the next one.
#[cfg(unix)]
fn setup_signal_handler() -> CancellationToken {
    let cancel_token = CancellationToken::new();

    for (kind, name) in [
        (SignalKind::interrupt(), "SIGINT"),
        (SignalKind::terminate(), "SIGTERM"),
    ] {
        let token = cancel_token.clone();
        match signal(kind) {
            Ok(mut stream) => {
                tokio::spawn(async move {
                    stream.recv().await;
                    eprintln!("\nReceived {}. Stopping after the current batch...", name);
                    token.cancel();
                });
            }
            Err(e) => warn!("Cannot listen for {}: {}", name, e),
        }
    }

    cancel_token
}

/// Setup signal handler for Windows (only Ctrl-C)
#[cfg(not(unix))]
fn setup_signal_handler() -> CancellationToken {
    let cancel_token = CancellationToken::new();
    let token = cancel_token.clone();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\nReceived Ctrl-C. Stopping after the current batch...");
            token.cancel();
        }
    });

    cancel_token
}
