use std::sync::Arc;
use std::time::Duration;

use clap::ValueEnum;
use time::OffsetDateTime;
use time::macros::format_description;
use timer_tasks_core::{AppConfig, CancelSignal, FaultPolicy, RunHandle, RunReport, TimerError, TimerTask};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TimerKind {
    OneShot,
    Periodic,
}

impl TimerKind {
    pub fn is_periodic(self) -> bool {
        self == TimerKind::Periodic
    }

    pub fn label(self) -> &'static str {
        match self {
            TimerKind::OneShot => "OneShot",
            TimerKind::Periodic => "Periodic",
        }
    }
}

/// A demo timer together with the system signal it was built with.
pub struct TimerSlot {
    pub kind: TimerKind,
    pub timer: Arc<TimerTask>,
    pub system: CancelSignal,
    pub period: Duration,
    run: Option<RunHandle>,
    last_report: Option<Result<RunReport, String>>,
}

impl TimerSlot {
    pub fn new(kind: TimerKind, period: Duration, fault_policy: FaultPolicy) -> Self {
        let system = CancelSignal::new();
        let label = kind.label();
        let timer = TimerTask::new(move || println!("{label}: {}", timestamp()))
            .with_signal(system.clone())
            .named(label)
            .with_fault_policy(fault_policy);

        Self {
            kind,
            timer: Arc::new(timer),
            system,
            period,
            run: None,
            last_report: None,
        }
    }

    /// Spawn a run, optionally with a new period. The caller makes sure the
    /// previous run has ended.
    pub fn start(&mut self, period: Option<Duration>) -> Result<(), TimerError> {
        let period = period.unwrap_or(self.period);
        let handle = self.timer.spawn(period, self.kind.is_periodic())?;
        self.period = period;
        self.run = Some(handle);
        Ok(())
    }

    /// Pick up the report of the current run if it has ended.
    pub async fn collect(&mut self) {
        if self.run.as_ref().is_some_and(|run| run.is_finished()) {
            self.join().await;
        }
    }

    async fn join(&mut self) {
        if let Some(run) = self.run.take() {
            let report = match run.await {
                Ok(result) => result.map_err(|e| e.to_string()),
                Err(e) => Err(e.to_string()),
            };
            self.last_report = Some(report);
        }
    }

    pub fn stop(&self) {
        self.timer.stop();
    }

    /// Trip the system signal. There is no way back: later runs end at once.
    pub fn cancel_system(&self) {
        self.system.cancel();
    }

    /// Dispose the timer and wait for its run to wind down.
    pub async fn shutdown(&mut self) {
        self.timer.dispose();
        self.join().await;
    }

    pub fn is_running(&self) -> bool {
        self.timer.is_running()
    }

    pub fn last_report(&self) -> Option<&Result<RunReport, String>> {
        self.last_report.as_ref()
    }
}

pub struct AppState {
    pub config: AppConfig,
    pub one_shot: TimerSlot,
    pub periodic: TimerSlot,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        let one_shot = TimerSlot::new(TimerKind::OneShot, config.one_shot_delay(), config.fault_policy);
        let periodic =
            TimerSlot::new(TimerKind::Periodic, config.periodic_interval(), config.fault_policy);
        Self {
            config,
            one_shot,
            periodic,
        }
    }

    /// Start both timers. A slot that fails to start doesn't keep the other
    /// one from running; its error is handed back instead.
    pub fn start_all(&mut self) -> Vec<(TimerKind, TimerError)> {
        [TimerKind::OneShot, TimerKind::Periodic]
            .into_iter()
            .filter_map(|kind| self.slot_mut(kind).start(None).err().map(|e| (kind, e)))
            .collect()
    }

    pub fn slot(&self, kind: TimerKind) -> &TimerSlot {
        match kind {
            TimerKind::OneShot => &self.one_shot,
            TimerKind::Periodic => &self.periodic,
        }
    }

    pub fn slot_mut(&mut self, kind: TimerKind) -> &mut TimerSlot {
        match kind {
            TimerKind::OneShot => &mut self.one_shot,
            TimerKind::Periodic => &mut self.periodic,
        }
    }

    pub async fn shutdown(&mut self) {
        self.one_shot.shutdown().await;
        self.periodic.shutdown().await;
    }
}

fn timestamp() -> String {
    let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
    now.format(format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"))
        .unwrap_or_default()
}
