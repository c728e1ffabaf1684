//! Tunables for a single evaluation.
//!
//! Partial configurations deserialize with defaults filled in, so a settings
//! file only needs to name what it changes.

use serde::{Deserialize, Serialize};

use crate::efficiency::DEFAULT_EFFICIENCY;

/// Engine settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Efficiency substituted for models that cannot be evaluated.
    pub default_efficiency: f64,

    /// Deepest subsystem nesting evaluated before a fatal warning.
    pub max_subsystem_depth: usize,

    /// Absolute tolerance (volts) for voltage equality checks.
    pub voltage_tolerance: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_efficiency: DEFAULT_EFFICIENCY,
            max_subsystem_depth: 64,
            voltage_tolerance: 1e-6,
        }
    }
}

impl EngineConfig {
    pub fn with_max_subsystem_depth(mut self, depth: usize) -> Self {
        self.max_subsystem_depth = depth;
        self
    }

    /// Default efficiency clamped into `(0, 1]`
    pub(crate) fn fallback_efficiency(&self) -> f64 {
        if self.default_efficiency.is_finite() && self.default_efficiency > 0.0 {
            self.default_efficiency.clamp(0.0, 1.0)
        } else {
            DEFAULT_EFFICIENCY
        }
    }
}
