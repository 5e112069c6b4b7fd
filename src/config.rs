//! Engine tuning knobs, independent of any single schedule.

use crate::error::{Result, ScheduleError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Largest share of the graph an edit may touch before the coordinator
    /// gives up on a scoped recompute and runs the full pipeline.
    pub partial_recompute_fraction: f64,
    /// Compute weakly connected components on the rayon pool.
    pub parallel_components: bool,
    /// Upper bound on enumerated critical chains.
    pub max_critical_paths: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            partial_recompute_fraction: 0.5,
            parallel_components: false,
            max_critical_paths: 256,
        }
    }
}

impl EngineConfig {
    /// Whether an affected set of `affected` out of `total` tasks is small
    /// enough for a scoped recompute.
    pub fn allows_partial(&self, affected: usize, total: usize) -> bool {
        total > 0 && (affected as f64) < self.partial_recompute_fraction * total as f64
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if !self.partial_recompute_fraction.is_finite() || self.partial_recompute_fraction < 0.0 {
            return Err(ScheduleError::InvalidParameters(format!(
                "partial recompute fraction must be a non-negative number (got {})",
                self.partial_recompute_fraction
            )));
        }
        if self.max_critical_paths == 0 {
            return Err(ScheduleError::InvalidParameters(
                "max_critical_paths must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
