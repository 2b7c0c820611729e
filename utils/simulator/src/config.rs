use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::SimError;
use crate::deserializer::CounterPolicy;
use crate::host::BusTiming;
use crate::synchronizer::SYNC_STAGES;

#[derive(Deserialize, Serialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct PeripheralConfig {
    pub counter_policy: CounterPolicy,
}

/// Simulation run configuration.
///
/// Every field has a default, so an empty document is a valid configuration.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub peripheral: PeripheralConfig,
    pub bus: BusTiming,
    /// Ticks reset is held asserted.
    pub reset_cycles: u32,
    /// Idle ticks after reset is released.
    pub post_reset_cycles: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            peripheral: PeripheralConfig::default(),
            bus: BusTiming::default(),
            reset_cycles: 5,
            post_reset_cycles: 5,
        }
    }
}

impl Config {
    pub fn from_yaml(text: &str) -> Result<Self, SimError> {
        // serde_yaml rejects an empty document instead of using defaults
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Config = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, SimError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml(&text)
    }

    pub fn validate(&self) -> Result<(), SimError> {
        self.bus.validate()?;
        if self.reset_cycles < SYNC_STAGES {
            return Err(SimError::InvalidConfig(format!(
                "reset_cycles must cover the {SYNC_STAGES}-stage synchronizer, got {}",
                self.reset_cycles
            )));
        }
        Ok(())
    }
}
