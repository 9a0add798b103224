// FallbackEstimator - coarse BPM guess from raw band energy
//
// Used while calibration is still collecting and no interval-based
// estimate exists yet. Maps combined band energy onto one of four BPM
// tiers, then nudges the guess by the treble/bass balance. The output
// drives the classifier only; it is never promoted to a tempo estimate.

use crate::analysis::energy::BandEnergy;

/// Energy-tier BPM estimator for the pre-calibration window
#[derive(Debug, Clone, Default)]
pub struct FallbackEstimator;

impl FallbackEstimator {
    const HIGH_ENERGY: f32 = 120.0;
    const HIGH_BPM: f32 = 140.0;
    const MID_ENERGY: f32 = 80.0;
    const MID_BPM: f32 = 110.0;
    const LOW_ENERGY: f32 = 40.0;
    const LOW_BPM: f32 = 85.0;
    const FLOOR_BPM: f32 = 65.0;

    const TREBLE_HEAVY_RATIO: f32 = 1.5;
    const TREBLE_BOOST: f32 = 10.0;
    const BASS_HEAVY_RATIO: f32 = 0.7;
    const BASS_CUT: f32 = 8.0;

    pub fn new() -> Self {
        Self
    }

    /// Guess a BPM from one band energy reading
    ///
    /// The tier boundaries are strict: a combined energy sitting exactly on
    /// a boundary falls into the tier below. The balance ratio divides by
    /// at least `f32::EPSILON` so silent bass cannot produce a NaN.
    pub fn estimate(&self, energy: &BandEnergy) -> f32 {
        let combined = (energy.bass + energy.treble) / 2.0;
        let mut bpm = if combined > Self::HIGH_ENERGY {
            Self::HIGH_BPM
        } else if combined > Self::MID_ENERGY {
            Self::MID_BPM
        } else if combined > Self::LOW_ENERGY {
            Self::LOW_BPM
        } else {
            Self::FLOOR_BPM
        };

        let ratio = energy.treble / energy.bass.max(f32::EPSILON);
        if ratio > Self::TREBLE_HEAVY_RATIO {
            bpm += Self::TREBLE_BOOST;
        } else if ratio < Self::BASS_HEAVY_RATIO {
            bpm -= Self::BASS_CUT;
        }

        bpm
    }
}
