//! Runtime configuration (§6 Configuration table)

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// A struct of named options, each with a documented effect (§6).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Pacing of the simulator's event generator, in milliseconds. The core
    /// itself is clock-agnostic (§9); this only governs an external event
    /// source, never the event loop's own dispatch rate.
    pub event_frequency_ms: u64,
    /// Priorities ≤ this trigger selective deallocation when greedy alone is
    /// insufficient (§4.5 step 3).
    pub critical_priority_threshold: u32,
    /// β in §4.6: the maximum fraction of total allocated energy a single
    /// selective-deallocation call may reassign.
    pub disturbance_budget_fraction: f64,
    /// ε used for all equality/bound comparisons (§3, §4.2).
    pub numeric_tolerance: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            event_frequency_ms: 5000,
            critical_priority_threshold: 2,
            disturbance_budget_fraction: 0.15,
            numeric_tolerance: 1e-3,
        }
    }
}

impl Config {
    /// Validate the configuration, rejecting values that would make the
    /// disturbance budget or tolerance meaningless.
    pub fn validate(&self) -> Result<()> {
        if !(self.disturbance_budget_fraction > 0.0 && self.disturbance_budget_fraction <= 1.0) {
            return Err(Error::configuration(format!(
                "disturbance_budget_fraction must be in (0, 1], got {}",
                self.disturbance_budget_fraction
            )));
        }
        if self.numeric_tolerance <= 0.0 {
            return Err(Error::configuration(format!(
                "numeric_tolerance must be > 0, got {}",
                self.numeric_tolerance
            )));
        }
        Ok(())
    }

    /// Whether `priority` is at or above the critical threshold (lower value
    /// = more important, so "critical" means `priority <= threshold`).
    pub fn is_critical(&self, priority: u32) -> bool {
        priority <= self.critical_priority_threshold
    }
}
