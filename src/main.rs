use anyhow::Result;
use clap::{Parser, Subcommand};
use tablewatch::presentation::cli_summary::{print_event, print_log_tail, print_status};
use tablewatch::{init_tracing, AppConfig, LogLevel, LogSink, Shutdown, ShutdownTrigger};
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "tablewatch",
    about = "Tablewatch — poll a SQL table and log what changed between checks."
)]
struct Cli {
    #[arg(short, long, default_value = "tablewatch.toml")]
    config: String,

    /// Show SQL queries and state transitions.
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only print errors.
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Poll continuously until interrupted (default).
    Run {
        /// Override `monitor.interval_secs`.
        #[arg(long)]
        interval: Option<u64>,
    },
    /// Run a single check and exit.
    CheckOnce,
    /// Show the last snapshot, check history and recent log lines.
    Status {
        #[arg(short = 'n', long, default_value_t = 10)]
        lines: usize,
        #[arg(long)]
        json: bool,
    },
    /// Print the tail of the event log.
    Logs {
        #[arg(short = 'n', long, default_value_t = 20)]
        lines: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(if cli.verbose {
        LogLevel::Debug
    } else if cli.quiet {
        LogLevel::Error
    } else {
        LogLevel::Info
    });

    // Configuration errors are the only ones allowed to stop the process.
    let mut cfg = AppConfig::load(&cli.config)?;

    match cli.command.unwrap_or(Command::Run { interval: None }) {
        Command::Run { interval } => {
            if let Some(secs) = interval {
                cfg.monitor.interval_secs = secs;
            }
            let poller = tablewatch::build_poller(&cfg)?;
            info!(
                table = %cfg.monitored_table(),
                state_file = %cfg.monitor.state_path().display(),
                log_file = %cfg.monitor.log_path().display(),
                "Monitoring"
            );

            let (trigger, shutdown) = Shutdown::new();
            tokio::spawn(forward_signals(trigger));
            poller.run_forever(shutdown).await;
        }
        Command::CheckOnce => {
            let event = tablewatch::check_once(&cfg).await?;
            print_event(&event);
        }
        Command::Status { lines, json } => {
            let report = tablewatch::status(&cfg, lines)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_status(&report);
            }
        }
        Command::Logs { lines } => {
            let sink = tablewatch::infrastructure::storage::log_sink::FileLogSink::new(
                cfg.monitor.log_path(),
            );
            print_log_tail(&sink.tail(lines)?);
        }
    }

    Ok(())
}

/// Turn SIGINT / SIGTERM into a shutdown request. The poll loop finishes
/// its current cycle before honouring it.
async fn forward_signals(trigger: ShutdownTrigger) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = term.recv() => {}
                }
            }
            Err(_) => {
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }

    info!("Shutdown requested, finishing current check");
    trigger.trigger();
}
