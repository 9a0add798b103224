//! Session events broadcast to observers
//!
//! Events mirror what the tick loop and lifecycle calls produced. The
//! lifecycle kinds (`SessionStopped`, `SessionReset`) imply a forced
//! return to the idle level; no separate `LevelChanged` is emitted for
//! those.

use crate::analysis::StepLevel;
use crate::calibration::ThresholdSet;
use serde::{Deserialize, Serialize};

/// One timestamped session event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionEvent {
    /// Milliseconds since the engine was created
    pub timestamp_ms: u64,
    pub kind: SessionEventKind,
}

/// What happened
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SessionEventKind {
    /// Session started and a calibration window opened
    SessionStarted,
    /// Session stopped; level forced to idle
    SessionStopped,
    /// Track state discarded; level forced to idle
    SessionReset,
    /// A beat was accepted by the spike detector
    Beat { count: u64 },
    /// An interval-based tempo estimate was accepted
    TempoUpdated { bpm: f32 },
    /// The fallback estimator produced a pre-calibration guess
    FallbackTempo { bpm: f32 },
    /// The calibration window closed and thresholds were derived
    CalibrationCompleted { thresholds: ThresholdSet },
    /// The classifier moved to a different step level
    LevelChanged {
        from: StepLevel,
        to: StepLevel,
        bpm: f32,
    },
}
