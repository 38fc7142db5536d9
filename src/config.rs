// Configuration - arena, physics and scheduler settings
// Defaults, optionally overridden by a JSON file and then by GRAVSIM_* environment variables

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::physics_engine::{
    Bounds, StepParams, DEFAULT_DAMPING, DEFAULT_DT, DEFAULT_HEIGHT, DEFAULT_WIDTH, G,
};

pub const MIN_TICK_INTERVAL_MS: u64 = 1;
pub const MAX_TICK_INTERVAL_MS: u64 = 1000;
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 10;

/// Number of record rows the input grid offers
pub const DEFAULT_ENTITY_LIMIT: usize = 18;

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Json(serde_json::Error),
    InvalidValue { key: String, value: String },
    OutOfRange { key: &'static str, reason: &'static str },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "failed to read config: {}", e),
            ConfigError::Json(e) => write!(f, "failed to parse config: {}", e),
            ConfigError::InvalidValue { key, value } => {
                write!(f, "invalid value {:?} for {}", value, key)
            }
            ConfigError::OutOfRange { key, reason } => write!(f, "{} {}", key, reason),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(e) => Some(e),
            ConfigError::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        ConfigError::Json(e)
    }
}

// =============================================================================
// SIMULATION CONFIG
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Arena width in world units; also the render surface width in pixels
    pub width: f64,
    pub height: f64,
    /// Velocity fraction kept after a wall bounce
    pub damping: f64,
    pub gravitational_constant: f64,
    /// Simulated seconds per tick
    pub dt: f64,
    /// Wall-clock period of the auto ticker
    pub tick_interval_ms: u64,
    pub entity_limit: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            damping: DEFAULT_DAMPING,
            gravitational_constant: G,
            dt: DEFAULT_DT,
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            entity_limit: DEFAULT_ENTITY_LIMIT,
        }
    }
}

impl SimulationConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let mut config: SimulationConfig = serde_json::from_str(json)?;
        config.set_tick_interval_ms(config.tick_interval_ms);
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Apply overrides from the process environment, reading a `.env` file first if present
    pub fn with_env(self) -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply `GRAVSIM_*` overrides fetched through `lookup`
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = parse_var(&lookup, "GRAVSIM_WIDTH")? {
            self.width = v;
        }
        if let Some(v) = parse_var(&lookup, "GRAVSIM_HEIGHT")? {
            self.height = v;
        }
        if let Some(v) = parse_var(&lookup, "GRAVSIM_DAMPING")? {
            self.damping = v;
        }
        if let Some(v) = parse_var(&lookup, "GRAVSIM_G")? {
            self.gravitational_constant = v;
        }
        if let Some(v) = parse_var(&lookup, "GRAVSIM_DT")? {
            self.dt = v;
        }
        if let Some(v) = parse_var(&lookup, "GRAVSIM_TICK_INTERVAL_MS")? {
            self.set_tick_interval_ms(v);
        }
        if let Some(v) = parse_var(&lookup, "GRAVSIM_ENTITY_LIMIT")? {
            self.entity_limit = v;
        }

        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.width > 0.0 && self.width.is_finite()) {
            return Err(ConfigError::OutOfRange {
                key: "width",
                reason: "must be a positive number",
            });
        }
        if !(self.height > 0.0 && self.height.is_finite()) {
            return Err(ConfigError::OutOfRange {
                key: "height",
                reason: "must be a positive number",
            });
        }
        if !(0.0..=1.0).contains(&self.damping) {
            return Err(ConfigError::OutOfRange {
                key: "damping",
                reason: "must lie in [0, 1]",
            });
        }
        if !self.gravitational_constant.is_finite() {
            return Err(ConfigError::OutOfRange {
                key: "gravitational_constant",
                reason: "must be finite",
            });
        }
        if !(self.dt > 0.0 && self.dt.is_finite()) {
            return Err(ConfigError::OutOfRange {
                key: "dt",
                reason: "must be a positive number",
            });
        }
        Ok(())
    }

    pub fn set_tick_interval_ms(&mut self, ms: u64) {
        self.tick_interval_ms = ms.clamp(MIN_TICK_INTERVAL_MS, MAX_TICK_INTERVAL_MS);
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn bounds(&self) -> Bounds {
        Bounds::new(self.width, self.height)
    }

    pub fn step_params(&self) -> StepParams {
        StepParams {
            dt: self.dt,
            bounds: self.bounds(),
            damping: self.damping,
            g: self.gravitational_constant,
        }
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue {
                key: key.to_string(),
                value: raw,
            }),
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let c = SimulationConfig::default();
        assert_eq!(c.width, 640.0);
        assert_eq!(c.height, 640.0);
        assert_eq!(c.damping, 0.7);
        assert_eq!(c.gravitational_constant, 667.834);
        assert_eq!(c.dt, 0.01);
        assert_eq!(c.tick_interval(), Duration::from_millis(10));
        assert_eq!(c.entity_limit, 18);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn test_tick_interval_is_clamped() {
        let mut c = SimulationConfig::default();
        c.set_tick_interval_ms(0);
        assert_eq!(c.tick_interval_ms, 1);
        c.set_tick_interval_ms(5000);
        assert_eq!(c.tick_interval_ms, 1000);
        c.set_tick_interval_ms(250);
        assert_eq!(c.tick_interval_ms, 250);
    }

    #[test]
    fn test_json_fills_missing_fields_with_defaults() {
        let c = SimulationConfig::from_json_str(r#"{ "width": 800, "tick_interval_ms": 0 }"#).unwrap();
        assert_eq!(c.width, 800.0);
        assert_eq!(c.height, 640.0);
        assert_eq!(c.tick_interval_ms, 1);
        assert_eq!(c.bounds().half_width, 400.0);
    }

    #[test]
    fn test_json_rejects_bad_damping() {
        let err = SimulationConfig::from_json_str(r#"{ "damping": 1.5 }"#).unwrap_err();
        assert!(matches!(err, ConfigError::OutOfRange { key: "damping", .. }));
    }

    #[test]
    fn test_overrides_apply_and_validate() {
        let c = SimulationConfig::default()
            .with_overrides(lookup_from(&[
                ("GRAVSIM_HEIGHT", "480"),
                ("GRAVSIM_G", " 100.5 "),
                ("GRAVSIM_TICK_INTERVAL_MS", "2000"),
            ]))
            .unwrap();
        assert_eq!(c.height, 480.0);
        assert_eq!(c.gravitational_constant, 100.5);
        assert_eq!(c.tick_interval_ms, 1000);

        let params = c.step_params();
        assert_eq!(params.bounds.half_height, 240.0);
        assert_eq!(params.g, 100.5);
    }

    #[test]
    fn test_unparseable_override_is_reported() {
        let err = SimulationConfig::default()
            .with_overrides(lookup_from(&[("GRAVSIM_WIDTH", "wide")]))
            .unwrap_err();
        match err {
            ConfigError::InvalidValue { key, value } => {
                assert_eq!(key, "GRAVSIM_WIDTH");
                assert_eq!(value, "wide");
            }
            other => panic!("unexpected error: {}", other),
        }

        let err = SimulationConfig::default()
            .with_overrides(lookup_from(&[("GRAVSIM_WIDTH", "-3")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::OutOfRange { key: "width", .. }));
    }
}
