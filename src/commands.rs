use std::io::Write;
use std::sync::Arc;

use timer_tasks_core::{RunExit, RunReport, period_from_millis};
use tokio::sync::RwLock;

use crate::app_state::{AppState, TimerKind, TimerSlot};

pub const HELP: &str = "Press p/q to cancel/stop periodic, s/o to cancel/stop one-shot, x to exit. \
                        `help` lists the long command names.";

pub async fn stop(state: Arc<RwLock<AppState>>, kind: TimerKind) {
    let s = state.read().await;
    s.slot(kind).stop();
    println!("{} stopped", kind.label());
}

pub async fn cancel(state: Arc<RwLock<AppState>>, kind: TimerKind) {
    let s = state.read().await;
    let slot = s.slot(kind);
    if slot.system.is_cancelled() {
        println!("{} system signal was already cancelled", kind.label());
        return;
    }
    slot.cancel_system();
    println!("{} system signal cancelled", kind.label());
}

pub async fn restart(state: Arc<RwLock<AppState>>, kind: TimerKind, period_ms: Option<i64>) {
    let period = match period_ms.map(period_from_millis).transpose() {
        Ok(period) => period,
        Err(e) => {
            println!("{e}");
            return;
        }
    };

    let mut s = state.write().await;
    let slot = s.slot_mut(kind);
    slot.collect().await;
    if slot.is_running() {
        println!("{} is still running, stop it first", kind.label());
        return;
    }
    if slot.system.is_cancelled() {
        println!("note: {} system signal is cancelled, the run will end at once", kind.label());
    }

    match slot.start(period) {
        Ok(()) => println!("{} started ({}ms)", kind.label(), slot.period.as_millis()),
        Err(e) => println!("Failed to start {}: {}", kind.label(), e),
    }
}

pub async fn show_status(state: Arc<RwLock<AppState>>) {
    let mut s = state.write().await;
    for kind in [TimerKind::OneShot, TimerKind::Periodic] {
        let slot = s.slot_mut(kind);
        slot.collect().await;
        println!("{}", status_line(slot));
    }
}

pub async fn show_config(state: Arc<RwLock<AppState>>) {
    let s = state.read().await;
    println!("{:<24} {}ms", "one_shot_delay_ms", s.config.one_shot_delay_ms);
    println!("{:<24} {}ms", "periodic_interval_ms", s.config.periodic_interval_ms);
    println!("{:<24} {:?}", "fault_policy", s.config.fault_policy);
}

/// Dispose both timers, wait for their runs and print what they did.
pub async fn shutdown(state: Arc<RwLock<AppState>>) {
    let mut s = state.write().await;
    s.shutdown().await;
    for kind in [TimerKind::OneShot, TimerKind::Periodic] {
        println!("{}", status_line(s.slot(kind)));
    }
}

pub fn exit() -> Result<(), String> {
    writeln!(std::io::stdout(), "quitting...").map_err(|e| e.to_string())?;
    std::io::stdout().flush().map_err(|e| e.to_string())
}

fn status_line(slot: &TimerSlot) -> String {
    let state = if slot.timer.is_disposed() {
        "disposed"
    } else if slot.is_running() {
        "running"
    } else {
        "idle"
    };
    let system = if slot.system.is_cancelled() { "cancelled" } else { "armed" };
    let last = match slot.last_report() {
        Some(Ok(report)) => describe(report),
        Some(Err(e)) => format!("failed: {e}"),
        None => "-".to_string(),
    };

    format!(
        "{:<10} {:<9} period={}ms system={:<9} last run: {}",
        slot.timer.name(),
        state,
        slot.period.as_millis(),
        system,
        last
    )
}

fn describe(report: &RunReport) -> String {
    let exit = match report.exit {
        RunExit::Completed => "completed".to_string(),
        RunExit::Cancelled(source) => format!("cancelled ({source})"),
    };
    format!("{exit}, {} fires, {} faults", report.fires, report.faults)
}
