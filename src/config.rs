//! Configuration management for dynamic parameter tuning
//!
//! This module provides runtime configuration loading from JSON files,
//! enabling fast iteration without recompilation. Key parameters for
//! spike detection, tempo estimation, calibration, and the tick loop
//! can be adjusted via the config file for rapid experimentation.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub sampler: SamplerConfig,
    pub detector: DetectorConfig,
    pub tempo: TempoConfig,
    pub calibration: CalibrationConfig,
    pub classifier: ClassifierConfig,
    pub engine: EngineConfig,
}

/// Band energy sampling parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamplerConfig {
    /// Upper edge of the bass band in Hz
    pub bass_max_hz: f32,
    /// Lower edge of the treble band in Hz
    pub treble_min_hz: f32,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            bass_max_hz: 60.0,
            treble_min_hz: 4000.0,
        }
    }
}

/// Spike detection algorithm parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// Number of recent bass energy samples kept for the rolling mean
    pub history_len: usize,
    /// Multiplier over the rolling mean that an energy sample must exceed
    pub spike_ratio: f32,
    /// Minimum spacing between accepted beats in seconds
    pub refractory_secs: f64,
    /// Number of recent beat timestamps kept for interval analysis
    pub beat_history_len: usize,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            history_len: 100,
            // Bass energy must exceed 1.3x the rolling mean to count as a beat
            spike_ratio: 1.3,
            refractory_secs: 0.3,
            beat_history_len: 8,
        }
    }
}

/// Tempo estimation parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TempoConfig {
    /// Minimum beats required before an estimate is attempted
    pub min_beats: usize,
    /// Lower bound of the plausible BPM range
    pub min_bpm: f32,
    /// Upper bound of the plausible BPM range
    pub max_bpm: f32,
}

impl Default for TempoConfig {
    fn default() -> Self {
        Self {
            min_beats: 5,
            min_bpm: 30.0,
            max_bpm: 200.0,
        }
    }
}

/// Tempo calibration window configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationConfig {
    /// Length of the observation window in seconds
    pub window_secs: f64,
    /// Maximum number of tempo samples retained during the window
    pub sample_cap: usize,
    /// Minimum samples needed to derive thresholds from the data
    pub min_samples: usize,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            window_secs: 30.0,
            sample_cap: 50,
            min_samples: 10,
        }
    }
}

/// Step level classification parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// BPM margin a tempo must clear beyond the threshold before switching levels
    pub hysteresis_margin: f32,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            hysteresis_margin: 5.0,
        }
    }
}

/// Tick loop and event plumbing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Analysis chain tick period in milliseconds
    pub tick_ms: u64,
    /// Fallback estimator tick period in milliseconds
    pub fallback_tick_ms: u64,
    /// Capacity of the frame hand-off queue
    pub frame_queue_len: usize,
    /// Capacity of the broadcast event channel
    pub event_buffer: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_ms: 40,
            fallback_tick_ms: 1000,
            frame_queue_len: 8,
            event_buffer: 128,
        }
    }
}

impl Default for AppConfig {
    /// Default configuration values (fallback if config file not found)
    fn default() -> Self {
        Self {
            sampler: SamplerConfig::default(),
            detector: DetectorConfig::default(),
            tempo: TempoConfig::default(),
            calibration: CalibrationConfig::default(),
            classifier: ClassifierConfig::default(),
            engine: EngineConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from JSON file
    ///
    /// # Arguments
    /// * `path` - Path to JSON config file
    ///
    /// # Returns
    /// * `Ok(AppConfig)` - Loaded configuration
    /// * `Err` - If file doesn't exist or JSON is invalid, returns default config
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    log::info!("[Config] Loaded configuration from {:?}", path.as_ref());
                    config
                }
                Err(err) => {
                    log::warn!(
                        "[Config] Failed to parse JSON from {:?}: {}. Using defaults.",
                        path.as_ref(),
                        err
                    );
                    Self::default()
                }
            },
            Err(err) => {
                log::warn!(
                    "[Config] Failed to read config file {:?}: {}. Using defaults.",
                    path.as_ref(),
                    err
                );
                Self::default()
            }
        }
    }

    /// Load configuration from the default path in the working directory
    pub fn load() -> Self {
        Self::load_from_file("steptempo.json")
    }
}
