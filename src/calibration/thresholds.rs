//! Threshold derivation from observed tempo samples
//!
//! A `ThresholdSet` carves the BPM axis into the four step level bands.
//! Sets are derived once per calibration window: narrow sample spreads
//! get fixed offsets around the midpoint, wide spreads get quartile-based
//! boundaries so the bands track where the music actually sits.

use serde::{Deserialize, Serialize};

/// Lower BPM bound of each tempo band
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdSet {
    pub slow: f32,
    pub medium: f32,
    pub fast: f32,
    pub very_fast: f32,
}

impl Default for ThresholdSet {
    fn default() -> Self {
        Self {
            slow: 70.0,
            medium: 90.0,
            fast: 120.0,
            very_fast: 150.0,
        }
    }
}

impl ThresholdSet {
    /// Spread below which samples count as a narrow cluster
    const NARROW_RANGE: f32 = 20.0;

    /// Derive a threshold set from the BPM samples of one window
    ///
    /// Fewer than `min_samples` observations fall back to the defaults.
    /// No ordering is imposed on the result: with heavily skewed sample
    /// sets the slow bound can land above medium, and classification
    /// handles that as-is.
    pub fn from_samples(samples: &[f32], min_samples: usize) -> Self {
        if samples.len() < min_samples {
            log::info!(
                "[Calibration] Only {} samples collected (need {}), keeping default thresholds",
                samples.len(),
                min_samples
            );
            return Self::default();
        }

        let mut sorted = samples.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));
        let min = sorted[0];
        let max = sorted[sorted.len() - 1];
        let range = max - min;

        if range < Self::NARROW_RANGE {
            let center = (min + max) / 2.0;
            return Self {
                slow: center - 8.0,
                medium: center - 3.0,
                fast: center + 3.0,
                very_fast: center + 8.0,
            };
        }

        let q1 = percentile(&sorted, 0.25);
        let median = percentile(&sorted, 0.5);
        let q3 = percentile(&sorted, 0.75);

        Self {
            slow: (min + range * 0.15).max(q1 - 5.0),
            medium: (q1 + 5.0).max(median - 10.0),
            fast: (median + 5.0).max(q3 - 8.0),
            very_fast: (q3 + 3.0).max(max - range * 0.1),
        }
    }
}

/// Value at the given fraction of a sorted slice, floor-indexed
fn percentile(sorted: &[f32], p: f32) -> f32 {
    let idx = ((sorted.len() as f32) * p) as usize;
    sorted[idx.min(sorted.len() - 1)]
}
