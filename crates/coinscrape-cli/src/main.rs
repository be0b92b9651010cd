//! coinscrape: scrape live crypto prices from client-rendered pages.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use coinscrape::progress::{self, ProgressReceiver};
use coinscrape::{Collator, Extractor, ResultSet, ScrapeConfig, TimeoutPolicy};
use coinscrape_cli::browser;
use coinscrape_cli::doctor::DoctorReport;
use coinscrape_cli::history::HistoryWriter;
use coinscrape_cli::logging::{self, LogConfig, LogFormat};
use coinscrape_cli::output;

#[derive(Parser)]
#[command(
    name = "coinscrape",
    about = "Scrape live crypto prices from client-rendered pages",
    version
)]
struct Cli {
    /// Path to a JSON target file. Also reads COINSCRAPE_TARGETS.
    #[arg(short, long, global = true)]
    targets: Option<String>,

    /// Fail a target whose price text never changes instead of keeping it.
    #[arg(long, global = true)]
    strict: bool,

    /// Number of targets scraped at once, each in its own browser.
    #[arg(long, global = true, default_value_t = 1)]
    concurrency: usize,

    /// Print results as JSON.
    #[arg(long, global = true)]
    json: bool,

    /// Suppress per-target progress on stderr.
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Run the browser with a visible window.
    #[arg(long, global = true)]
    show_browser: bool,

    /// Append every collected record to this JSONL file.
    #[arg(long, global = true)]
    history: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Log output format.
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape every target once and print the prices (default).
    Run,

    /// Scrape on a fixed interval until interrupted.
    Watch {
        /// Seconds between run starts.
        #[arg(long, default_value_t = 60)]
        every: u64,
    },

    /// Print the resolved targets and timings.
    Targets,

    /// Check for a Chromium binary and a usable target file.
    Doctor,

    /// Generate shell completion scripts.
    ///
    /// Examples:
    ///   coinscrape completions bash > ~/.local/share/bash-completion/completions/coinscrape
    ///   coinscrape completions zsh > ~/.zfunc/_coinscrape
    Completions {
        /// Shell type (bash, zsh, fish, powershell, elvish).
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let mut cli = Cli::parse();
    let _log_guard = logging::init(LogConfig::new(cli.log_format, &cli.log_level))?;

    let code = match cli.command.take().unwrap_or(Commands::Run) {
        Commands::Run => {
            let config = load_config(&cli)?;
            let mut history = open_history(&cli)?;
            let (collator, printer) = build_collator(&cli, &config)?;

            let result = collator.collate(&config.targets).await;
            drop(collator);
            if let Some(printer) = printer {
                let _ = printer.await;
            }

            match result {
                Ok(results) => {
                    if let Some(history) = history.as_mut() {
                        history.append_run(&results)?;
                    }
                    print_results(&results, cli.json, false)?;
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    eprintln!("Error: {e}");
                    ExitCode::FAILURE
                }
            }
        }

        Commands::Watch { every } => {
            let config = load_config(&cli)?;
            let mut history = open_history(&cli)?;
            let (collator, _printer) = build_collator(&cli, &config)?;

            let mut ticker = tokio::time::interval(Duration::from_secs(every.max(1)));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut shutdown = std::pin::pin!(tokio::signal::ctrl_c());

            tracing::info!(
                every_secs = every,
                targets = config.targets.len(),
                "Watching prices"
            );
            loop {
                tokio::select! {
                    _ = &mut shutdown => {
                        tracing::info!("Interrupted, stopping");
                        break;
                    }
                    _ = ticker.tick() => {}
                }

                // A failed run is reported and the next tick tries again.
                match collator.collate(&config.targets).await {
                    Ok(results) => {
                        if let Some(history) = history.as_mut() {
                            if let Err(e) = history.append_run(&results) {
                                tracing::error!("History write failed: {e:#}");
                            }
                        }
                        print_results(&results, cli.json, true)?;
                    }
                    Err(e) => tracing::error!("Run failed: {e}"),
                }
            }
            ExitCode::SUCCESS
        }

        Commands::Targets => {
            let config = load_config(&cli)?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&config)?);
            } else {
                print!("{}", output::render_targets(&config));
            }
            ExitCode::SUCCESS
        }

        Commands::Doctor => {
            let report = DoctorReport::collect(cli.targets.as_deref());
            print!("{report}");
            if report.is_healthy() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }

        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "coinscrape", &mut std::io::stdout());
            ExitCode::SUCCESS
        }
    };

    Ok(code)
}

/// Resolve the target file and apply command-line overrides.
fn load_config(cli: &Cli) -> anyhow::Result<ScrapeConfig> {
    let mut config = ScrapeConfig::resolve(cli.targets.as_deref())?;
    if cli.strict {
        config.settings.timeout_policy = TimeoutPolicy::Strict;
    }
    Ok(config)
}

fn open_history(cli: &Cli) -> anyhow::Result<Option<HistoryWriter>> {
    cli.history
        .as_deref()
        .map(HistoryWriter::open)
        .transpose()
}

/// Build the collator, and the stderr progress printer unless output
/// is JSON or `--quiet` was given.
fn build_collator(
    cli: &Cli,
    config: &ScrapeConfig,
) -> anyhow::Result<(Collator, Option<JoinHandle<()>>)> {
    let renderer = browser::build_renderer(cli.show_browser);
    let extractor = Extractor::new(config.settings.extract_options());
    let collator = Collator::new(renderer, extractor).with_concurrency(cli.concurrency);

    if cli.json || cli.quiet {
        return Ok((collator, None));
    }
    let (tx, rx) = progress::channel();
    Ok((
        collator.with_progress(tx),
        Some(spawn_progress_printer(rx)),
    ))
}

/// Print progress lines to stderr until the collator is dropped.
fn spawn_progress_printer(mut rx: ProgressReceiver) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    if let Some(line) = output::progress_line(&event) {
                        eprintln!("{line}");
                    }
                }
                Err(RecvError::Lagged(n)) => tracing::debug!("Progress printer skipped {n} events"),
                Err(RecvError::Closed) => break,
            }
        }
    })
}

fn print_results(results: &ResultSet, json: bool, one_line: bool) -> anyhow::Result<()> {
    match (json, one_line) {
        (true, true) => println!("{}", output::render_json_line(results)?),
        (true, false) => println!("{}", output::render_json(results)?),
        (false, _) => print!("{}", output::render_table(results)),
    }
    Ok(())
}
