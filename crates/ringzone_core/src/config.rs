//! Engine configuration.
//!
//! # Responsibility
//! - Hold ring extents, floor range and optional overlap behaviors.
//! - Parse and validate JSON configuration documents.
//!
//! # Invariants
//! - A validated config has positive finite extents and `min_floor <= max_floor`.
//! - Missing fields fall back to the reference ring constants.

use crate::geometry::ring_space::RingSpace;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Ring circumference in length units (264,000 km in meters).
pub const DEFAULT_RING_CIRCUMFERENCE: f64 = 264_000_000.0;
/// Maximum lateral offset from the ring centerline.
pub const DEFAULT_MAX_LATERAL_OFFSET: f64 = 2_500.0;
pub const DEFAULT_MIN_FLOOR: i32 = -2;
pub const DEFAULT_MAX_FLOOR: i32 = 2;

/// Configuration shared by validation, storage and the overlap engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub ring_circumference: f64,
    pub max_lateral_offset: f64,
    pub min_floor: i32,
    pub max_floor: i32,
    /// When set, a new non-system zone loses any area it shares with
    /// system zones before merge and conflict handling.
    pub clip_new_zones_to_system_zones: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ring_circumference: DEFAULT_RING_CIRCUMFERENCE,
            max_lateral_offset: DEFAULT_MAX_LATERAL_OFFSET,
            min_floor: DEFAULT_MIN_FLOOR,
            max_floor: DEFAULT_MAX_FLOOR,
            clip_new_zones_to_system_zones: false,
        }
    }
}

impl EngineConfig {
    /// Parses a JSON document and validates the result.
    pub fn from_json_str(value: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(value).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.ring_circumference.is_finite() && self.ring_circumference > 0.0) {
            return Err(ConfigError::InvalidValue {
                field: "ring_circumference",
                message: format!("must be positive and finite, got {}", self.ring_circumference),
            });
        }
        if !(self.max_lateral_offset.is_finite() && self.max_lateral_offset > 0.0) {
            return Err(ConfigError::InvalidValue {
                field: "max_lateral_offset",
                message: format!("must be positive and finite, got {}", self.max_lateral_offset),
            });
        }
        if self.min_floor > self.max_floor {
            return Err(ConfigError::InvalidValue {
                field: "min_floor",
                message: format!(
                    "must not exceed max_floor ({} > {})",
                    self.min_floor, self.max_floor
                ),
            });
        }
        Ok(())
    }

    pub fn ring_space(&self) -> RingSpace {
        RingSpace::new(self.ring_circumference, self.max_lateral_offset)
    }
}

/// Configuration parse/validation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    Parse(String),
    InvalidValue {
        field: &'static str,
        message: String,
    },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parse(message) => write!(f, "invalid engine config: {message}"),
            Self::InvalidValue { field, message } => {
                write!(f, "invalid engine config field `{field}`: {message}")
            }
        }
    }
}

impl Error for ConfigError {}
