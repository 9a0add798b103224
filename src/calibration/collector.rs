//! Calibration window management
//!
//! The calibrator opens a fixed observation window when a session starts,
//! collects accepted tempo estimates during it, and derives the session's
//! threshold set from them the first time an estimate arrives after the
//! window has elapsed. The finalizing estimate itself is not collected.
//! Once complete the thresholds stay frozen until the next begin().

use crate::calibration::thresholds::ThresholdSet;
use crate::config::CalibrationConfig;
use std::collections::VecDeque;

/// Lifecycle of one calibration window
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CalibrationPhase {
    /// No window open; default thresholds in effect
    Idle,
    /// Window open, estimates being collected
    Collecting { started_at: f64 },
    /// Window closed, derived thresholds frozen
    Complete,
}

/// Collects tempo estimates over a window and derives thresholds once
#[derive(Debug, Clone)]
pub struct TempoCalibrator {
    window_secs: f64,
    sample_cap: usize,
    min_samples: usize,
    phase: CalibrationPhase,
    samples: VecDeque<f32>,
    thresholds: ThresholdSet,
}

impl TempoCalibrator {
    pub fn new(config: &CalibrationConfig) -> Self {
        Self {
            window_secs: config.window_secs,
            sample_cap: config.sample_cap,
            min_samples: config.min_samples,
            phase: CalibrationPhase::Idle,
            samples: VecDeque::with_capacity(config.sample_cap + 1),
            thresholds: ThresholdSet::default(),
        }
    }

    /// Open a fresh calibration window at `now`
    ///
    /// Any previous samples and derived thresholds are discarded.
    pub fn begin(&mut self, now: f64) {
        self.samples.clear();
        self.thresholds = ThresholdSet::default();
        self.phase = CalibrationPhase::Collecting { started_at: now };
        log::info!("[Calibration] Window opened at {:.1}s", now);
    }

    /// Feed one accepted tempo estimate
    ///
    /// While the window is open the estimate is collected (FIFO-capped).
    /// The first estimate to arrive after the window has elapsed triggers
    /// finalization instead of being collected, and the derived set is
    /// returned. All other phases ignore the estimate.
    pub fn observe(&mut self, bpm: f32, now: f64) -> Option<ThresholdSet> {
        let started_at = match self.phase {
            CalibrationPhase::Collecting { started_at } => started_at,
            _ => return None,
        };

        if now - started_at < self.window_secs {
            self.samples.push_back(bpm);
            if self.samples.len() > self.sample_cap {
                self.samples.pop_front();
            }
            return None;
        }

        self.thresholds =
            ThresholdSet::from_samples(self.samples.make_contiguous(), self.min_samples);
        self.phase = CalibrationPhase::Complete;
        log::info!(
            "[Calibration] Finalized after {} samples: slow {:.1}, medium {:.1}, fast {:.1}, very_fast {:.1}",
            self.samples.len(),
            self.thresholds.slow,
            self.thresholds.medium,
            self.thresholds.fast,
            self.thresholds.very_fast
        );
        Some(self.thresholds)
    }

    /// The thresholds currently in effect (defaults until finalized)
    pub fn active_thresholds(&self) -> &ThresholdSet {
        &self.thresholds
    }

    pub fn is_collecting(&self) -> bool {
        matches!(self.phase, CalibrationPhase::Collecting { .. })
    }

    pub fn is_complete(&self) -> bool {
        self.phase == CalibrationPhase::Complete
    }

    pub fn phase(&self) -> CalibrationPhase {
        self.phase
    }

    /// Number of estimates collected in the current window
    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    /// Close any open window and restore the default thresholds
    pub fn reset(&mut self) {
        self.samples.clear();
        self.thresholds = ThresholdSet::default();
        self.phase = CalibrationPhase::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn calibrator() -> TempoCalibrator {
        TempoCalibrator::new(&CalibrationConfig::default())
    }

    #[test]
    fn test_idle_ignores_estimates() {
        let mut cal = calibrator();
        assert!(cal.observe(100.0, 1.0).is_none());
        assert_eq!(cal.sample_count(), 0);
        assert_eq!(cal.phase(), CalibrationPhase::Idle);
    }

    #[test]
    fn test_window_collects_then_finalizes() {
        let mut cal = calibrator();
        cal.begin(0.0);
        assert!(cal.is_collecting());

        for i in 0..12 {
            assert!(cal.observe(100.0, 1.0 + i as f64).is_none());
        }
        assert_eq!(cal.sample_count(), 12);

        let thresholds = cal.observe(100.0, 30.0).unwrap();
        assert!(cal.is_complete());
        assert!((thresholds.slow - 92.0).abs() < 1e-3);
        assert!((thresholds.very_fast - 108.0).abs() < 1e-3);
    }

    #[test]
    fn test_finalizing_estimate_is_not_collected() {
        let mut cal = calibrator();
        cal.begin(0.0);
        for i in 0..12 {
            cal.observe(100.0, 1.0 + i as f64);
        }

        // 250 BPM closes the window; were it collected, the spread would be
        // wide and the narrow-cluster result below impossible
        let thresholds = cal.observe(250.0, 31.0).unwrap();
        assert_eq!(cal.sample_count(), 12);
        assert!((thresholds.slow - 92.0).abs() < 1e-3);
        assert!((thresholds.medium - 97.0).abs() < 1e-3);
    }

    #[test]
    fn test_sparse_window_finalizes_to_defaults() {
        let mut cal = calibrator();
        cal.begin(0.0);
        for i in 0..3 {
            cal.observe(100.0, 1.0 + i as f64);
        }

        let thresholds = cal.observe(100.0, 30.5).unwrap();
        assert_eq!(thresholds, ThresholdSet::default());
        assert!(cal.is_complete());
    }

    #[test]
    fn test_sample_cap_evicts_oldest() {
        let mut cal = calibrator();
        cal.begin(0.0);
        // 10 early slow readings, then 50 steady ones push them all out
        for i in 0..10 {
            cal.observe(50.0, 0.1 * i as f64);
        }
        for i in 0..50 {
            cal.observe(100.0, 2.0 + 0.1 * i as f64);
        }
        assert_eq!(cal.sample_count(), 50);

        // All surviving samples are 100, so the narrow-cluster path applies
        let thresholds = cal.observe(100.0, 30.0).unwrap();
        assert!((thresholds.slow - 92.0).abs() < 1e-3);
    }

    #[test]
    fn test_complete_phase_freezes_thresholds() {
        let mut cal = calibrator();
        cal.begin(0.0);
        for i in 0..12 {
            cal.observe(100.0, 1.0 + i as f64);
        }
        let finalized = cal.observe(100.0, 30.0).unwrap();

        assert!(cal.observe(180.0, 40.0).is_none());
        assert_eq!(*cal.active_thresholds(), finalized);
    }

    #[test]
    fn test_reset_returns_to_idle_with_defaults() {
        let mut cal = calibrator();
        cal.begin(0.0);
        for i in 0..12 {
            cal.observe(100.0, 1.0 + i as f64);
        }
        cal.observe(100.0, 30.0);

        cal.reset();
        assert_eq!(cal.phase(), CalibrationPhase::Idle);
        assert_eq!(cal.sample_count(), 0);
        assert_eq!(*cal.active_thresholds(), ThresholdSet::default());
        assert!(cal.observe(100.0, 31.0).is_none());
    }

    #[test]
    fn test_begin_restarts_the_window() {
        let mut cal = calibrator();
        cal.begin(0.0);
        for i in 0..5 {
            cal.observe(100.0, 1.0 + i as f64);
        }

        cal.begin(10.0);
        assert_eq!(cal.sample_count(), 0);
        // 29.9s into the new window is still inside it
        assert!(cal.observe(100.0, 39.9).is_none());
        assert_eq!(cal.sample_count(), 1);
    }
}
