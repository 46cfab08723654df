//! Timer tasks
//!
//! A [`TimerTask`] waits for a period and then invokes its action, either
//! once or repeatedly. Runs end when the action has fired (one-shot) or when
//! either of its two cancellation signals trips:
//!
//! ```text
//! Idle ──start──► Waiting ──period elapsed──► Firing ──periodic──► Waiting
//!                    │                          │
//!                    └──signal tripped──► Cancelled   └──one-shot──► Completed
//! ```

mod action;
mod error;
mod task;

#[cfg(test)]
mod task_tests;

pub use action::{ActionError, FaultPolicy};
pub use error::TimerError;
pub use task::{RunExit, RunHandle, RunReport, TimerTask, period_from_millis};
