//! Node configuration parameters
//!
//! All tunable parameters for the node and its reference sensors.
//! Values can be provisioned as JSON or persisted in the storage region
//! reserved by [`crate::persistence::ConfigStore`].

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TemperatureUnit {
    Celsius,
    Fahrenheit,
}

/// Core node configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeConfig {
    // --- Node ---
    /// Repeater nodes forward mesh traffic and never sleep
    pub repeater: bool,
    /// Re-present all sensors at this period (ms), 0 = never
    pub presentation_period_ms: u32,

    // --- Presence ---
    /// Time after power-up before the motion detector output is trusted (ms)
    pub presence_warm_up_ms: u32,
    /// Only report "off" once no motion was seen for this long (ms)
    pub presence_off_delay_ms: u32,
    /// Never send "off"; the controller turns the state off itself
    pub presence_only_send_on: bool,

    // --- Climate ---
    /// Temperature/humidity read interval (ms)
    pub climate_interval_ms: u32,
    /// Minimum change that counts as new data
    pub climate_threshold: f32,
    pub temperature_unit: TemperatureUnit,

    // --- Heartbeat ---
    /// Heartbeat toggle interval (ms)
    pub heartbeat_interval_ms: u32,

    // --- Light ---
    /// Upper bound on fade steps between two levels
    pub fade_max_steps: u8,
    /// Time between fade steps (ms)
    pub fade_step_ms: u32,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            // Node
            repeater: false,
            presentation_period_ms: 5 * 60 * 1000,

            // Presence
            presence_warm_up_ms: 15 * 1000,
            presence_off_delay_ms: 60 * 1000,
            presence_only_send_on: false,

            // Climate
            climate_interval_ms: 5000,
            climate_threshold: 0.1,
            temperature_unit: TemperatureUnit::Fahrenheit,

            // Heartbeat
            heartbeat_interval_ms: 5000,

            // Light
            fade_max_steps: 16,
            fade_step_ms: 20,
        }
    }
}

impl NodeConfig {
    /// Parse a JSON provisioning document and validate it.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let cfg: Self =
            serde_json::from_str(json).map_err(|_| ConfigError::Invalid("malformed config JSON"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Range-check every field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.presence_off_delay_ms == 0 {
            return Err(ConfigError::Invalid("presence_off_delay_ms must be > 0"));
        }
        if self.climate_interval_ms < 2000 {
            return Err(ConfigError::Invalid(
                "climate_interval_ms must be >= 2000 (probe sampling period)",
            ));
        }
        if !(0.0..=10.0).contains(&self.climate_threshold) {
            return Err(ConfigError::Invalid("climate_threshold must be 0.0-10.0"));
        }
        if self.heartbeat_interval_ms == 0 {
            return Err(ConfigError::Invalid("heartbeat_interval_ms must be > 0"));
        }
        if self.fade_max_steps == 0 {
            return Err(ConfigError::Invalid("fade_max_steps must be > 0"));
        }
        Ok(())
    }
}
