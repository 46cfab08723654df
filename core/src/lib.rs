//! Cancellable one-shot and periodic timer tasks on tokio.
//!
//! ```no_run
//! use std::time::Duration;
//! use timer_tasks_core::{CancelSignal, TimerTask};
//!
//! # async fn demo() -> Result<(), timer_tasks_core::TimerError> {
//! let system = CancelSignal::new();
//! let periodic = std::sync::Arc::new(
//!     TimerTask::new(|| println!("tick")).with_signal(system.clone()),
//! );
//! let run = periodic.spawn(Duration::from_secs(1), true)?;
//!
//! // Stops this timer only; `system.cancel()` would stop every timer sharing it
//! periodic.stop();
//! let report = run.await.expect("run panicked")?;
//! println!("fired {} times", report.fires);
//! # Ok(())
//! # }
//! ```

pub mod context;
pub mod signal;
pub mod timer;

pub use context::{AppConfig, ConfigError};
pub use signal::{CancelSignal, CancelSource, LinkedSignal};
pub use timer::{
    ActionError, FaultPolicy, RunExit, RunHandle, RunReport, TimerError, TimerTask,
    period_from_millis,
};
