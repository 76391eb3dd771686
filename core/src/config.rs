use serde::{Deserialize, Serialize};

use crate::{
    error::{SimError, SimResult},
    types::Millis,
};

/// Session parameters every peer must agree on before the first tick.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionConfig {
    /// Simulated time per tick.
    #[serde(default = "default_tick_ms")]
    pub tick_ms: Millis,
    /// Ticks the rendered state lags behind the newest simulated tick.
    #[serde(default = "default_render_delay")]
    pub render_delay: usize,
    /// Maximum number of states kept in history.
    #[serde(default = "default_history_cap")]
    pub history_cap: usize,
    /// Seed of the shared deterministic sequence.
    pub seed: u64,
    /// Smooth interpolatable bodies between two snapshots when rendering.
    #[serde(default = "default_interpolate")]
    pub interpolate: bool,
    /// Agreed wall-clock epoch; tick 0 starts here.
    #[serde(default)]
    pub time_to_start_ms: Millis,
}

fn default_tick_ms() -> Millis { 100.0 }
fn default_render_delay() -> usize { 2 }
fn default_history_cap() -> usize { 1000 }
fn default_interpolate() -> bool { true }

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            tick_ms:          default_tick_ms(),
            render_delay:     default_render_delay(),
            history_cap:      default_history_cap(),
            seed:             1_234_567_890,
            interpolate:      default_interpolate(),
            time_to_start_ms: 0.0,
        }
    }
}

impl SessionConfig {
    /// Load from a JSON file.
    /// In tests, use SessionConfig::default_test().
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        Ok(Self::from_json(&content)?)
    }

    /// Parse and validate a JSON document.
    pub fn from_json(json: &str) -> SimResult<Self> {
        let config: SessionConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Config with hardcoded values for use in tests.
    pub fn default_test() -> Self {
        Self {
            seed: 0xDEAD_BEEF,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> SimResult<()> {
        if self.tick_ms.is_nan() || self.tick_ms <= 0.0 {
            return Err(SimError::InvalidConfig {
                reason: format!("tick_ms must be positive, got {}", self.tick_ms),
            });
        }
        // Two real snapshots must exist behind the render delay.
        if self.history_cap < self.render_delay + 2 {
            return Err(SimError::InvalidConfig {
                reason: format!(
                    "history_cap {} too small for render_delay {}",
                    self.history_cap, self.render_delay
                ),
            });
        }
        Ok(())
    }
}

/// Parameters of the in-memory loopback mesh.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MeshConfig {
    /// Fixed one-way delay added to every message.
    #[serde(default)]
    pub latency_ms: Millis,
    /// Extra uniformly distributed delay in [0, jitter_ms).
    #[serde(default)]
    pub jitter_ms: Millis,
    /// Probability that a message never arrives.
    #[serde(default)]
    pub loss: f64,
    /// Probability that a message arrives twice.
    #[serde(default)]
    pub duplicate: f64,
    #[serde(default)]
    pub seed: u64,
}

impl Default for MeshConfig {
    fn default() -> Self {
        Self { latency_ms: 0.0, jitter_ms: 0.0, loss: 0.0, duplicate: 0.0, seed: 7 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_fills_defaults() {
        let config = SessionConfig::from_json(r#"{ "seed": 5 }"#).unwrap();
        assert_eq!(config.seed, 5);
        assert_eq!(config.tick_ms, 100.0);
        assert_eq!(config.render_delay, 2);
        assert_eq!(config.history_cap, 1000);
        assert!(config.interpolate);
    }

    #[test]
    fn seed_is_required() {
        let err = SessionConfig::from_json(r#"{ "tick_ms": 50 }"#).unwrap_err();
        assert!(matches!(err, SimError::Serialization(_)));
    }

    #[test]
    fn tiny_history_is_rejected() {
        let config = SessionConfig { history_cap: 3, render_delay: 2, ..SessionConfig::default_test() };
        assert!(matches!(config.validate(), Err(SimError::InvalidConfig { .. })));
    }

    #[test]
    fn zero_tick_is_rejected() {
        let config = SessionConfig { tick_ms: 0.0, ..SessionConfig::default_test() };
        assert!(config.validate().is_err());
    }
}
