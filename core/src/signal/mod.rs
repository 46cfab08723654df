//! Cancellation signals and their composition
//!
//! A timer run observes two sources: the system signal handed in by the
//! owner (shared by a group of timers) and a local signal the timer creates
//! for every run. [`LinkedSignal`] is the OR of the two, borrowed for the
//! duration of one run only.

use std::fmt;

/// One-way, level-triggered cancellation flag. Once tripped it stays tripped.
pub type CancelSignal = tokio_util::sync::CancellationToken;

/// Which source ended a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelSource {
    /// The timer's own signal, tripped by `stop` or `dispose`.
    Local,
    /// The externally owned signal passed at construction.
    System,
}

impl fmt::Display for CancelSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CancelSource::Local => f.write_str("local"),
            CancelSource::System => f.write_str("system"),
        }
    }
}

/// Combined view over a local signal and an optional system signal.
#[derive(Debug, Clone, Copy)]
pub struct LinkedSignal<'a> {
    local: &'a CancelSignal,
    system: Option<&'a CancelSignal>,
}

impl<'a> LinkedSignal<'a> {
    pub fn new(local: &'a CancelSignal, system: Option<&'a CancelSignal>) -> Self {
        Self { local, system }
    }

    /// True as soon as either source has tripped.
    pub fn is_cancelled(&self) -> bool {
        self.tripped_by().is_some()
    }

    /// The source that tripped, local first when both have.
    pub fn tripped_by(&self) -> Option<CancelSource> {
        if self.local.is_cancelled() {
            Some(CancelSource::Local)
        } else if self.system.is_some_and(CancelSignal::is_cancelled) {
            Some(CancelSource::System)
        } else {
            None
        }
    }

    /// Resolves when either source trips. An unset system signal never does.
    pub async fn cancelled(&self) -> CancelSource {
        match self.system {
            Some(system) => {
                tokio::select! {
                    biased;
                    _ = self.local.cancelled() => CancelSource::Local,
                    _ = system.cancelled() => CancelSource::System,
                }
            }
            None => {
                self.local.cancelled().await;
                CancelSource::Local
            }
        }
    }
}
