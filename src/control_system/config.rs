use crate::global_variables::{
    ALL_RED_MS, BASE_GREEN_MS, EMERGENCY_FACTOR, OVERRIDE_POLL_MS, VEHICLE_BONUS_MS, YELLOW_MS,
};
use crate::shared_data::{Approach, RoadPair};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Startup configuration for a controller. Fixed once the controller is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    pub base_green_ms: i64,
    pub vehicle_bonus_ms: i64,
    pub yellow_ms: i64,
    pub all_red_ms: i64,
    pub emergency_factor: f64,
    pub override_poll_ms: i64,
    /// Upper bound on the queue-scaled green phase. Unset keeps the linear formula unbounded.
    pub max_green_ms: Option<i64>,
    /// Pair membership as written in a config file, e.g. `{"NS": ["north", "south"]}`.
    pub road_pairs: Option<BTreeMap<String, Vec<String>>>,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            base_green_ms: BASE_GREEN_MS,
            vehicle_bonus_ms: VEHICLE_BONUS_MS,
            yellow_ms: YELLOW_MS,
            all_red_ms: ALL_RED_MS,
            emergency_factor: EMERGENCY_FACTOR,
            override_poll_ms: OVERRIDE_POLL_MS,
            max_green_ms: None,
            road_pairs: None,
        }
    }
}

/// Validated timings, in milliseconds. Only obtainable through [`ControllerConfig::validate`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignalTimings {
    pub base_green_ms: u64,
    pub vehicle_bonus_ms: u64,
    pub yellow_ms: u64,
    pub all_red_ms: u64,
    pub emergency_factor: f64,
    pub override_poll_ms: u64,
    pub max_green_ms: Option<u64>,
}

impl SignalTimings {
    pub fn yellow(&self) -> Duration {
        Duration::from_millis(self.yellow_ms)
    }

    pub fn all_red(&self) -> Duration {
        Duration::from_millis(self.all_red_ms)
    }

    pub fn override_poll(&self) -> Duration {
        Duration::from_millis(self.override_poll_ms)
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{name} must be a positive duration, got {value}")]
    NonPositiveDuration { name: &'static str, value: i64 },
    #[error("{name} must be a finite positive number, got {value}")]
    InvalidFactor { name: &'static str, value: f64 },
    #[error("invalid road pair mapping: {0}")]
    PairMapping(String),
    #[error("could not read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

fn positive(name: &'static str, value: i64) -> Result<u64, ConfigError> {
    if value > 0 {
        Ok(value as u64)
    } else {
        Err(ConfigError::NonPositiveDuration { name, value })
    }
}

fn positive_factor(name: &'static str, value: f64) -> Result<f64, ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(ConfigError::InvalidFactor { name, value })
    }
}

impl ControllerConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    /// Checks every constant and returns the timings the controller runs on.
    pub fn validate(&self) -> Result<SignalTimings, ConfigError> {
        if let Some(pairs) = &self.road_pairs {
            validate_pair_map(pairs)?;
        }
        Ok(SignalTimings {
            base_green_ms: positive("base_green_ms", self.base_green_ms)?,
            vehicle_bonus_ms: positive("vehicle_bonus_ms", self.vehicle_bonus_ms)?,
            yellow_ms: positive("yellow_ms", self.yellow_ms)?,
            all_red_ms: positive("all_red_ms", self.all_red_ms)?,
            emergency_factor: positive_factor("emergency_factor", self.emergency_factor)?,
            override_poll_ms: positive("override_poll_ms", self.override_poll_ms)?,
            max_green_ms: self
                .max_green_ms
                .map(|cap| positive("max_green_ms", cap))
                .transpose()?,
        })
    }

    /// Divides every duration by `speedup`, keeping each at least 1 ms.
    pub fn scaled(&self, speedup: f64) -> Result<Self, ConfigError> {
        let speedup = positive_factor("speedup", speedup)?;
        let scale = |ms: i64| -> i64 {
            if ms <= 0 {
                ms
            } else {
                ((ms as f64 / speedup).round() as i64).max(1)
            }
        };
        Ok(Self {
            base_green_ms: scale(self.base_green_ms),
            vehicle_bonus_ms: scale(self.vehicle_bonus_ms),
            yellow_ms: scale(self.yellow_ms),
            all_red_ms: scale(self.all_red_ms),
            emergency_factor: self.emergency_factor,
            override_poll_ms: scale(self.override_poll_ms),
            max_green_ms: self.max_green_ms.map(scale),
            road_pairs: self.road_pairs.clone(),
        })
    }
}

// The pairs are fixed; a config file may only restate them.
fn validate_pair_map(pairs: &BTreeMap<String, Vec<String>>) -> Result<(), ConfigError> {
    if pairs.len() != RoadPair::ALL.len() {
        return Err(ConfigError::PairMapping(format!(
            "expected exactly {} pairs, got {}",
            RoadPair::ALL.len(),
            pairs.len()
        )));
    }

    let mut seen = BTreeSet::new();
    for pair in RoadPair::ALL {
        let members = pairs
            .get(pair.label())
            .ok_or_else(|| ConfigError::PairMapping(format!("missing pair {}", pair)))?;
        let mut parsed = BTreeSet::new();
        for name in members {
            let approach: Approach = name
                .parse()
                .map_err(|e| ConfigError::PairMapping(format!("{}", e)))?;
            if !seen.insert(approach) {
                return Err(ConfigError::PairMapping(format!(
                    "approach {} appears more than once",
                    approach
                )));
            }
            parsed.insert(approach);
        }
        let expected: BTreeSet<Approach> = pair.members().into_iter().collect();
        if parsed != expected {
            return Err(ConfigError::PairMapping(format!(
                "pair {} must contain exactly {} and {}",
                pair,
                pair.members()[0],
                pair.members()[1]
            )));
        }
    }
    Ok(())
}
