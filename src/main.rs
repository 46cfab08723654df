use clap::{Parser, Subcommand};
use std::io::Write;
use std::sync::Arc;
use tokio::sync::RwLock;

use timer_tasks::commands::{self, HELP};
use timer_tasks::{AppState, TimerKind, logging, readline};
use timer_tasks_core::AppConfig;

#[tokio::main]
async fn main() -> Result<(), String> {
    logging::init();

    let state = Arc::new(RwLock::new(AppState::new(AppConfig::load())));
    for (kind, e) in state.write().await.start_all() {
        println!("Failed to start {}: {}", kind.label(), e);
    }

    println!("{HELP}");

    loop {
        let line = readline()?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match respond(line, Arc::clone(&state)).await {
            Ok(quit) => {
                if quit {
                    break;
                }
            }
            Err(err) => {
                write!(std::io::stdout(), "{err}").map_err(|e| e.to_string())?;
                std::io::stdout().flush().map_err(|e| e.to_string())?;
            }
        }
    }

    commands::shutdown(state).await;
    Ok(())
}

#[derive(Parser)]
#[command(version, about = "timer-tasks")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Cancel the periodic timer's system signal
    #[command(visible_alias = "p")]
    CancelPeriodic,
    /// Stop the periodic timer
    #[command(visible_alias = "q")]
    StopPeriodic,
    /// Stop the one-shot timer
    #[command(visible_alias = "o")]
    StopOneShot,
    /// Cancel the one-shot timer's system signal
    #[command(visible_alias = "s")]
    CancelOneShot,
    /// Start a timer again once its previous run has ended
    Restart {
        #[arg(value_enum)]
        timer: TimerKind,
        #[arg(short, long, allow_negative_numbers = true)]
        period_ms: Option<i64>,
    },
    Status,
    Config,
    #[command(visible_alias = "x")]
    Exit,
}

async fn respond(line: &str, state: Arc<RwLock<AppState>>) -> Result<bool, String> {
    let mut args = shlex::split(line).ok_or("error: Invalid quoting")?;
    args.insert(0, "timer-tasks".to_string());
    let cli = Cli::try_parse_from(args).map_err(|e| e.to_string())?;

    match &cli.command {
        Some(Commands::CancelPeriodic) => commands::cancel(state, TimerKind::Periodic).await,
        Some(Commands::StopPeriodic) => commands::stop(state, TimerKind::Periodic).await,
        Some(Commands::StopOneShot) => commands::stop(state, TimerKind::OneShot).await,
        Some(Commands::CancelOneShot) => commands::cancel(state, TimerKind::OneShot).await,
        Some(Commands::Restart { timer, period_ms }) => {
            commands::restart(state, *timer, *period_ms).await
        }
        Some(Commands::Status) => commands::show_status(state).await,
        Some(Commands::Config) => commands::show_config(state).await,
        Some(Commands::Exit) => {
            commands::exit()?;
            return Ok(true);
        }
        None => {}
    }
    Ok(false)
}
