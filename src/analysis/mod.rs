// Analysis module - DSP chain from magnitude frames to step levels
//
// Components, in tick order:
// 1. EnergySampler: magnitude frame -> bass/treble band energies
// 2. SpikeDetector: bass energy -> accepted beat timestamps
// 3. TempoEstimator: beat history -> median-interval BPM estimate
// 4. StepClassifier: BPM + calibrated thresholds -> animation level
//
// FallbackEstimator sits beside the chain and produces coarse BPM
// guesses from raw band energy while calibration is still collecting.

pub mod energy;
pub mod fallback;
pub mod spike;
pub mod steps;
pub mod tempo;

pub use energy::{BandEnergy, EnergySampler, SpectrumLayout};
pub use fallback::FallbackEstimator;
pub use spike::{BeatEvent, SpikeDetector};
pub use steps::{StepClassifier, StepLevel, StepTransition};
pub use tempo::TempoEstimator;
