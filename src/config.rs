//! Configuration for the DrishtiLink daemon
//!
//! Loads configuration from a TOML file. Covers the network surface (ports,
//! announce interval, timeouts, client cap), the vision tuning block, and
//! logging. The wire protocol itself is fixed and not configurable.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Top-level application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    pub network: NetworkConfig,
    pub vision: VisionConfig,
    pub logging: LoggingConfig,
}

/// Network configuration (ports, intervals, limits)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NetworkConfig {
    /// UDP port for discovery announce and request/reply
    pub discovery_port: u16,
    /// TCP port for goal-report request/reply
    pub report_port: u16,
    /// Milliseconds between discovery broadcasts
    ///
    /// Values of a few milliseconds saturate a shared competition network;
    /// keep this at 1000 unless a peer needs faster discovery.
    pub announce_interval_ms: u64,
    /// Read/accept timeout in milliseconds; bounds how long a worker can
    /// block without observing the shutdown flag
    pub read_timeout_ms: u64,
    /// Maximum concurrent report connections
    pub max_clients: usize,
}

impl NetworkConfig {
    pub fn announce_interval(&self) -> Duration {
        Duration::from_millis(self.announce_interval_ms)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

/// Vision pipeline selection and tuning
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VisionConfig {
    /// Pipeline implementation: "synthetic" is the only built-in
    pub pipeline: String,
    pub tuning: VisionTuning,
}

/// Tuning constants for the target scorer and range estimator
///
/// These were process-wide mutable ints driven by GUI trackbars in the field
/// code; they are now fixed at pipeline construction.
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct VisionTuning {
    /// Lower hue bound for the target color filter (color pipelines)
    pub hue_min: u8,
    /// Upper hue bound for the target color filter (color pipelines)
    pub hue_max: u8,
    /// Minimum saturation for the target color filter (color pipelines)
    pub sat_min: u8,
    /// Minimum pixel brightness counted as lit
    pub val_min: u8,
    /// Minimum bounding-box area in pixels for a candidate target
    pub min_contour_area: f64,
    /// Minimum score (0-100) for a candidate to count as found
    pub min_score: f64,
    /// Camera focal length in pixels, for the pinhole range model
    pub focal_length_px: f64,
    /// Physical width of the target in meters
    pub target_width_m: f64,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Default configuration for the Jetson coprocessor deployment
    pub fn jetson_defaults() -> Self {
        Self {
            network: NetworkConfig {
                discovery_port: 5800,
                report_port: 5801,
                announce_interval_ms: 1000,
                read_timeout_ms: 500,
                max_clients: 8,
            },
            vision: VisionConfig {
                pipeline: "synthetic".to_string(),
                tuning: VisionTuning {
                    hue_min: 58,
                    hue_max: 90,
                    sat_min: 80,
                    val_min: 60,
                    min_contour_area: 500.0,
                    min_score: 60.0,
                    focal_length_px: 554.3,
                    target_width_m: 0.508,
                },
            },
            logging: LoggingConfig {
                level: "info".to_string(),
            },
        }
    }

    /// Save configuration to a TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::jetson_defaults()
    }
}
