//! Application configuration
//!
//! Persisted with confy under the `timer-tasks` application name. Missing
//! fields fall back to their defaults so older files keep loading.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::error::ConfigError;
use crate::timer::FaultPolicy;

const APP_NAME: &str = "timer-tasks";
const CONFIG_NAME: &str = "config";

// ─────────────────────────────────────────────────────────────────────────────
// App Config
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Delay before the one-shot timer fires
    #[serde(default = "default_one_shot_delay_ms")]
    pub one_shot_delay_ms: u64,
    /// Interval between periodic fires
    #[serde(default = "default_periodic_interval_ms")]
    pub periodic_interval_ms: u64,
    #[serde(default)]
    pub fault_policy: FaultPolicy,
}

fn default_one_shot_delay_ms() -> u64 {
    5_000
}

fn default_periodic_interval_ms() -> u64 {
    1_000
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            one_shot_delay_ms: default_one_shot_delay_ms(),
            periodic_interval_ms: default_periodic_interval_ms(),
            fault_policy: FaultPolicy::default(),
        }
    }
}

impl AppConfig {
    /// Load the stored config, falling back to defaults if it can't be read.
    pub fn load() -> Self {
        Self::try_load().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "using default configuration");
            Self::default()
        })
    }

    pub fn try_load() -> Result<Self, ConfigError> {
        Ok(confy::load(APP_NAME, CONFIG_NAME)?)
    }

    pub fn one_shot_delay(&self) -> Duration {
        Duration::from_millis(self.one_shot_delay_ms)
    }

    pub fn periodic_interval(&self) -> Duration {
        Duration::from_millis(self.periodic_interval_ms)
    }
}
