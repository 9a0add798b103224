//! TrackSession - the synchronous per-track analysis state machine
//!
//! One TrackSession owns the whole detection chain for one playing track:
//! sampler, spike detector, tempo estimator, calibrator, classifier and
//! the fallback estimator. Every tick is an explicit call carrying the
//! frame and a session-relative clock, so the session itself has no
//! timers and no threads and can be driven as fast as a test wants.

use crate::analysis::{
    BandEnergy, BeatEvent, EnergySampler, FallbackEstimator, SpectrumLayout, SpikeDetector,
    StepClassifier, StepLevel, StepTransition, TempoEstimator,
};
use crate::calibration::{TempoCalibrator, ThresholdSet};
use crate::config::AppConfig;
use crate::error::SessionError;

/// Everything one tick produced
///
/// Fields are `None` when the corresponding stage did not fire this tick.
/// Most ticks are quiet: no beat, no estimate, no transition.
#[derive(Debug, Clone, Default)]
pub struct TickReport {
    /// Beat accepted this tick
    pub beat: Option<BeatEvent>,
    /// Tempo estimate accepted this tick
    pub tempo: Option<f32>,
    /// Fallback BPM guess produced this tick
    pub fallback: Option<f32>,
    /// Thresholds finalized this tick
    pub calibration: Option<ThresholdSet>,
    /// Level change applied this tick
    pub transition: Option<StepTransition>,
}

impl TickReport {
    /// True when no stage fired
    pub fn is_quiet(&self) -> bool {
        self.beat.is_none()
            && self.tempo.is_none()
            && self.fallback.is_none()
            && self.calibration.is_none()
            && self.transition.is_none()
    }
}

/// Detection chain and lifecycle state for one track
#[derive(Debug)]
pub struct TrackSession {
    sampler: EnergySampler,
    spike: SpikeDetector,
    tempo: TempoEstimator,
    calibrator: TempoCalibrator,
    classifier: StepClassifier,
    fallback: FallbackEstimator,
    running: bool,
}

impl TrackSession {
    pub fn new(layout: SpectrumLayout, config: &AppConfig) -> Self {
        Self {
            sampler: EnergySampler::new(layout, &config.sampler),
            spike: SpikeDetector::new(&config.detector),
            tempo: TempoEstimator::new(&config.tempo),
            calibrator: TempoCalibrator::new(&config.calibration),
            classifier: StepClassifier::new(&config.classifier),
            fallback: FallbackEstimator::new(),
            running: false,
        }
    }

    /// Run one analysis chain tick over a magnitude frame
    ///
    /// Stages short-circuit: no beat means no estimation, no accepted
    /// estimate means no calibration feed and no classification. A stopped
    /// session ignores the frame entirely.
    pub fn advance(&mut self, frame: &[f32], now: f64) -> TickReport {
        let mut report = TickReport::default();
        if !self.running {
            return report;
        }

        let Some(energy) = self.sampler.sample(frame) else {
            return report;
        };
        let Some(beat) = self.spike.observe(energy.bass, now) else {
            return report;
        };
        report.beat = Some(beat);

        let Some(bpm) = self.tempo.update(self.spike.beat_history()) else {
            return report;
        };
        report.tempo = Some(bpm);

        report.calibration = self.calibrator.observe(bpm, now);
        let thresholds = *self.calibrator.active_thresholds();
        report.transition = self.classifier.classify(bpm, &thresholds);
        report
    }

    /// Run one fallback tick over a magnitude frame
    ///
    /// Only acts while the session is running, calibration is still
    /// collecting, and no interval-based estimate exists yet. The guess
    /// drives the classifier but never becomes the session tempo.
    pub fn fallback_tick(&mut self, frame: &[f32]) -> TickReport {
        let mut report = TickReport::default();
        if !self.running || !self.calibrator.is_collecting() || self.tempo.current().is_some() {
            return report;
        }

        let Some(energy) = self.sampler.sample(frame) else {
            return report;
        };
        let guess = self.fallback.estimate(&energy);
        report.fallback = Some(guess);

        let thresholds = *self.calibrator.active_thresholds();
        report.transition = self.classifier.classify(guess, &thresholds);
        report
    }

    /// Start the session: clear all track state and open calibration
    pub fn start(&mut self, now: f64) -> Result<(), SessionError> {
        if self.running {
            return Err(SessionError::AlreadyRunning);
        }

        self.clear_track_state();
        self.calibrator.begin(now);
        self.running = true;
        log::info!("[Session] Started at {:.1}s", now);
        Ok(())
    }

    /// Stop the session: drop back to idle and discard track state
    pub fn stop(&mut self) -> Result<(), SessionError> {
        if !self.running {
            return Err(SessionError::NotRunning);
        }

        self.running = false;
        self.clear_track_state();
        log::info!("[Session] Stopped");
        Ok(())
    }

    /// Discard track state in place, as when playback restarts from zero
    ///
    /// A running session gets a fresh calibration window; a stopped one
    /// just returns to the pristine idle state. Never fails.
    pub fn reset(&mut self, now: f64) {
        self.clear_track_state();
        if self.running {
            self.calibrator.begin(now);
        }
        log::info!("[Session] Reset at {:.1}s", now);
    }

    /// Band energies for a frame without touching detector state
    pub fn peek_energy(&self, frame: &[f32]) -> Option<BandEnergy> {
        self.sampler.sample(frame)
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// The step level currently in effect
    pub fn level(&self) -> StepLevel {
        self.classifier.current()
    }

    /// The displayable tempo estimate; `None` until one is accepted
    pub fn tempo(&self) -> Option<f32> {
        self.tempo.current()
    }

    /// Beats accepted since the session started
    pub fn beat_count(&self) -> u64 {
        self.spike.beat_count()
    }

    /// Current spike detection threshold (diagnostics)
    pub fn detection_threshold(&self) -> Option<f32> {
        self.spike.current_threshold()
    }

    pub fn is_collecting(&self) -> bool {
        self.calibrator.is_collecting()
    }

    pub fn is_calibrated(&self) -> bool {
        self.calibrator.is_complete()
    }

    /// Tempo samples collected in the current calibration window
    pub fn calibration_samples(&self) -> usize {
        self.calibrator.sample_count()
    }

    /// The thresholds currently in effect
    pub fn thresholds(&self) -> ThresholdSet {
        *self.calibrator.active_thresholds()
    }

    fn clear_track_state(&mut self) {
        self.spike.reset();
        self.tempo.reset();
        self.calibrator.reset();
        self.classifier.force_idle();
    }
}
