use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use super::action::{self, ActionError, BoxedAction, FaultPolicy};
use super::error::TimerError;
use crate::signal::{CancelSignal, CancelSource, LinkedSignal};

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunExit {
    /// A one-shot run fired its action.
    Completed,
    /// One of the two signals tripped before the run could finish.
    Cancelled(CancelSource),
}

/// Summary of one `start_async` invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunReport {
    /// Number of times the action was invoked.
    pub fires: u64,
    /// Fires whose action returned an error or panicked.
    pub faults: u64,
    pub exit: RunExit,
}

impl RunReport {
    pub fn was_cancelled(&self) -> bool {
        matches!(self.exit, RunExit::Cancelled(_))
    }
}

/// Join handle of a run started with [`TimerTask::spawn`].
pub type RunHandle = JoinHandle<Result<RunReport, TimerError>>;

/// Fires an action after a delay, once or repeatedly, until cancelled.
///
/// Two signals can end a run. The system signal is supplied by the owner and
/// may be shared by many timers; tripping it stops all of them. The local
/// signal is created fresh on every start and is tripped by [`stop`] and
/// [`dispose`], affecting this timer only.
///
/// Only one run should be active per instance. Starting again while a run is
/// still in flight replaces the local signal, after which `stop` no longer
/// reaches the older run.
///
/// [`stop`]: TimerTask::stop
/// [`dispose`]: TimerTask::dispose
pub struct TimerTask {
    name: String,
    action: BoxedAction,
    system_signal: Option<CancelSignal>,
    local_signal: Mutex<Option<CancelSignal>>,
    active_runs: Arc<AtomicUsize>,
    disposed: AtomicBool,
    fault_policy: FaultPolicy,
}

impl TimerTask {
    /// Create a timer around an action that cannot fail.
    pub fn new<F>(action: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self::from_boxed(action::infallible(action))
    }

    /// Create a timer around an action that reports failures as `Err`.
    pub fn fallible<F, E>(action: F) -> Self
    where
        F: Fn() -> Result<(), E> + Send + Sync + 'static,
        E: Into<ActionError>,
    {
        Self::from_boxed(action::fallible(action))
    }

    fn from_boxed(action: BoxedAction) -> Self {
        Self {
            name: "timer".to_string(),
            action,
            system_signal: None,
            local_signal: Mutex::new(None),
            active_runs: Arc::new(AtomicUsize::new(0)),
            disposed: AtomicBool::new(false),
            fault_policy: FaultPolicy::default(),
        }
    }

    /// Bind the externally owned system signal. The timer only observes it.
    pub fn with_signal(mut self, system_signal: CancelSignal) -> Self {
        self.system_signal = Some(system_signal);
        self
    }

    /// Label used in log records.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_fault_policy(mut self, policy: FaultPolicy) -> Self {
        self.fault_policy = policy;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn system_signal(&self) -> Option<&CancelSignal> {
        self.system_signal.as_ref()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    /// True from the moment a run is armed until it exits. A spawned run
    /// counts as running before the runtime first polls it.
    pub fn is_running(&self) -> bool {
        self.active_runs.load(Ordering::SeqCst) > 0
    }

    /// Run the wait/fire loop on the current task and report how it ended.
    ///
    /// With `periodic == false` the action fires at most once. Otherwise it
    /// fires every `period` until either signal trips. A fire that falls due
    /// at the moment of cancellation is suppressed.
    pub async fn start_async(&self, period: Duration, periodic: bool) -> Result<RunReport, TimerError> {
        let (local, active) = self.arm()?;
        self.run(local, active, period, periodic).await
    }

    pub async fn start_one_shot(&self, delay: Duration) -> Result<RunReport, TimerError> {
        self.start_async(delay, false).await
    }

    pub async fn start_periodic(&self, period: Duration) -> Result<RunReport, TimerError> {
        self.start_async(period, true).await
    }

    /// Fire-and-forget start on the tokio runtime.
    ///
    /// The local signal is armed before the task is spawned, so a `stop`
    /// issued right after this call reaches the new run.
    pub fn spawn(self: &Arc<Self>, period: Duration, periodic: bool) -> Result<RunHandle, TimerError> {
        let (local, active) = self.arm()?;
        let task = Arc::clone(self);
        Ok(tokio::spawn(async move { task.run(local, active, period, periodic).await }))
    }

    /// Trip the local signal. Never touches the system signal.
    pub fn stop(&self) {
        if let Some(local) = self.local_slot().as_ref() {
            local.cancel();
            debug!(timer = %self.name, "timer stopped");
        }
    }

    /// Trip and release the local signal. Later starts fail with `Disposed`.
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(local) = self.local_slot().take() {
            local.cancel();
        }
        debug!(timer = %self.name, "timer disposed");
    }

    fn local_slot(&self) -> MutexGuard<'_, Option<CancelSignal>> {
        self.local_signal.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn arm(&self) -> Result<(CancelSignal, ActiveRun), TimerError> {
        let mut slot = self.local_slot();
        // Checked under the lock so a concurrent dispose cannot miss the new signal
        if self.is_disposed() {
            return Err(TimerError::Disposed);
        }
        if self.is_running() {
            warn!(timer = %self.name, "timer restarted while a previous run is in flight");
        }
        let local = CancelSignal::new();
        *slot = Some(local.clone());
        Ok((local, ActiveRun::enter(&self.active_runs)))
    }

    async fn run(
        &self,
        local: CancelSignal,
        _active: ActiveRun,
        period: Duration,
        periodic: bool,
    ) -> Result<RunReport, TimerError> {
        let linked = LinkedSignal::new(&local, self.system_signal.as_ref());
        let mut fires = 0;
        let mut faults = 0;

        debug!(timer = %self.name, ?period, periodic, "timer started");

        let exit = loop {
            if let Some(source) = linked.tripped_by() {
                break RunExit::Cancelled(source);
            }

            tokio::select! {
                biased;
                source = linked.cancelled() => break RunExit::Cancelled(source),
                _ = tokio::time::sleep(period) => {}
            }

            if let Some(source) = linked.tripped_by() {
                break RunExit::Cancelled(source);
            }

            fires += 1;
            if let Err(reason) = action::invoke(&self.action) {
                faults += 1;
                error!(timer = %self.name, fire = fires, %reason, "timer action failed");
                if self.fault_policy == FaultPolicy::Propagate {
                    return Err(TimerError::ActionFault { fire: fires, reason });
                }
            }

            if !periodic {
                break RunExit::Completed;
            }
        };

        debug!(timer = %self.name, fires, faults, ?exit, "timer finished");
        Ok(RunReport { fires, faults, exit })
    }
}

impl fmt::Debug for TimerTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerTask")
            .field("name", &self.name)
            .field("has_system_signal", &self.system_signal.is_some())
            .field("running", &self.is_running())
            .field("disposed", &self.is_disposed())
            .field("fault_policy", &self.fault_policy)
            .finish()
    }
}

impl Drop for TimerTask {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// Counts a run as active from arming until it is dropped, whichever way it
/// exits. A spawned run that is aborted before its first poll still releases.
struct ActiveRun(Arc<AtomicUsize>);

impl ActiveRun {
    fn enter(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(Arc::clone(counter))
    }
}

impl Drop for ActiveRun {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Convert a signed millisecond count, as read from user input, to a period.
pub fn period_from_millis(millis: i64) -> Result<Duration, TimerError> {
    u64::try_from(millis)
        .map(Duration::from_millis)
        .map_err(|_| TimerError::invalid(format!("period must not be negative, got {millis}ms")))
}
