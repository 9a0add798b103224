//! Step level classification with hysteresis
//!
//! Maps a BPM estimate onto four animation intensity levels using the
//! calibrated threshold set. Level changes are gated by a hysteresis
//! margin around the threshold tied to the current level, so an estimate
//! hovering near a boundary cannot make the level flicker.

use crate::calibration::ThresholdSet;
use crate::config::ClassifierConfig;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Animation intensity level, ordered from stillness to full motion
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum StepLevel {
    Idle,
    Gentle,
    Moderate,
    Energetic,
}

impl StepLevel {
    /// Numeric index of the level (0-3)
    pub fn index(&self) -> u8 {
        match self {
            StepLevel::Idle => 0,
            StepLevel::Gentle => 1,
            StepLevel::Moderate => 2,
            StepLevel::Energetic => 3,
        }
    }

    /// Level for a numeric index; values above 3 saturate at `Energetic`
    pub fn from_index(index: u8) -> Self {
        match index {
            0 => StepLevel::Idle,
            1 => StepLevel::Gentle,
            2 => StepLevel::Moderate,
            _ => StepLevel::Energetic,
        }
    }
}

impl fmt::Display for StepLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StepLevel::Idle => "idle",
            StepLevel::Gentle => "gentle",
            StepLevel::Moderate => "moderate",
            StepLevel::Energetic => "energetic",
        };
        write!(f, "{}", name)
    }
}

/// An accepted level change, carrying the BPM that caused it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepTransition {
    pub from: StepLevel,
    pub to: StepLevel,
    pub bpm: f32,
}

/// Hysteresis-gated classifier from BPM to step level
#[derive(Debug, Clone)]
pub struct StepClassifier {
    current: StepLevel,
    margin: f32,
}

impl StepClassifier {
    pub fn new(config: &ClassifierConfig) -> Self {
        Self {
            current: StepLevel::Idle,
            margin: config.hysteresis_margin,
        }
    }

    /// Raw level for a BPM against a threshold set, without hysteresis
    ///
    /// Both the very_fast and fast thresholds resolve to `Energetic`; the
    /// fast band has no level of its own.
    pub fn target_level(bpm: f32, thresholds: &ThresholdSet) -> StepLevel {
        if bpm >= thresholds.very_fast {
            StepLevel::Energetic
        } else if bpm >= thresholds.fast {
            StepLevel::Energetic
        } else if bpm >= thresholds.medium {
            StepLevel::Moderate
        } else if bpm >= thresholds.slow {
            StepLevel::Gentle
        } else {
            StepLevel::Idle
        }
    }

    /// Classify a BPM estimate, returning the transition if the level moved
    ///
    /// The hysteresis gate is the threshold tied to the CURRENT level, not
    /// the target: stepping up requires the BPM to clear that gate by the
    /// margin, stepping down requires it to undercut the gate by the margin.
    pub fn classify(&mut self, bpm: f32, thresholds: &ThresholdSet) -> Option<StepTransition> {
        let target = Self::target_level(bpm, thresholds);
        if target == self.current {
            return None;
        }

        let gate = self.hysteresis_gate(thresholds);
        let step_up = target > self.current && bpm > gate + self.margin;
        let step_down = target < self.current && bpm < gate - self.margin;
        if !(step_up || step_down) {
            return None;
        }

        let from = self.current;
        self.current = target;
        log::debug!(
            "[Classifier] Level {} -> {} at {:.1} BPM (gate {:.1})",
            from,
            target,
            bpm,
            gate
        );
        Some(StepTransition {
            from,
            to: target,
            bpm,
        })
    }

    /// Snap back to `Idle` without hysteresis, used on stop and reset
    pub fn force_idle(&mut self) {
        self.current = StepLevel::Idle;
    }

    /// The level currently in effect
    pub fn current(&self) -> StepLevel {
        self.current
    }

    fn hysteresis_gate(&self, thresholds: &ThresholdSet) -> f32 {
        match self.current {
            StepLevel::Idle => thresholds.slow,
            StepLevel::Gentle => thresholds.medium,
            StepLevel::Moderate => thresholds.fast,
            StepLevel::Energetic => thresholds.very_fast,
        }
    }
}
