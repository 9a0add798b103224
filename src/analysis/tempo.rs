//! Median-interval tempo estimation over the beat history
//!
//! BPM is derived from the median gap between consecutive beats rather
//! than the mean, so a single missed or doubled beat cannot drag the
//! estimate. Implausible estimates are rejected and the previous value
//! is retained untouched.

use crate::config::TempoConfig;
use std::collections::VecDeque;

/// Derives and holds the current tempo estimate
#[derive(Debug, Clone)]
pub struct TempoEstimator {
    min_beats: usize,
    min_bpm: f32,
    max_bpm: f32,
    current: Option<f32>,
}

impl TempoEstimator {
    pub fn new(config: &TempoConfig) -> Self {
        Self {
            min_beats: config.min_beats,
            min_bpm: config.min_bpm,
            max_bpm: config.max_bpm,
            current: None,
        }
    }

    /// Re-estimate the tempo from the beat timestamp history
    ///
    /// Returns `Some(bpm)` when this call accepted a fresh estimate, `None`
    /// when too few beats are available or the estimate fell outside the
    /// plausible range. A rejected estimate leaves the previous one in
    /// place. The median is the upper-middle element of the sorted interval
    /// list, not an interpolated midpoint.
    pub fn update(&mut self, beats: &VecDeque<f64>) -> Option<f32> {
        if beats.len() < self.min_beats {
            return None;
        }

        let mut intervals: Vec<f64> = beats
            .iter()
            .zip(beats.iter().skip(1))
            .map(|(a, b)| b - a)
            .collect();
        intervals.sort_by(|a, b| a.total_cmp(b));

        let median = intervals[intervals.len() / 2];
        let bpm = (60.0 / median) as f32;

        if bpm < self.min_bpm || bpm > self.max_bpm {
            log::debug!(
                "[Tempo] Rejected implausible estimate {:.1} BPM (median interval {:.3}s)",
                bpm,
                median
            );
            return None;
        }

        self.current = Some(bpm);
        Some(bpm)
    }

    /// The most recently accepted estimate, if any
    pub fn current(&self) -> Option<f32> {
        self.current
    }

    /// Forget the current estimate
    pub fn reset(&mut self) {
        self.current = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn estimator() -> TempoEstimator {
        TempoEstimator::new(&TempoConfig::default())
    }

    fn beats(timestamps: &[f64]) -> VecDeque<f64> {
        timestamps.iter().copied().collect()
    }

    #[test]
    fn test_too_few_beats_yields_none() {
        let mut est = estimator();
        assert!(est.update(&beats(&[0.0, 0.5, 1.0, 1.5])).is_none());
        assert!(est.current().is_none());
    }

    #[test]
    fn test_uniform_intervals_give_exact_bpm() {
        let mut est = estimator();
        let bpm = est.update(&beats(&[0.0, 0.5, 1.0, 1.5, 2.0]));
        assert_eq!(bpm, Some(120.0));
        assert_eq!(est.current(), Some(120.0));
    }

    #[test]
    fn test_median_resists_one_dropped_beat() {
        let mut est = estimator();
        // One 2.0 s gap in an otherwise steady 0.5 s train
        let bpm = est.update(&beats(&[0.0, 0.5, 1.0, 1.5, 3.5, 4.0, 4.5, 5.0]));
        assert_eq!(bpm, Some(120.0));
    }

    #[test]
    fn test_even_interval_count_takes_upper_middle() {
        let mut est = estimator();
        // Intervals 0.3, 0.4, 0.6, 1.0: upper-middle is 0.6, so 100 BPM.
        // An interpolated median (0.5 s, 120 BPM) would be wrong here.
        let bpm = est.update(&beats(&[0.0, 0.3, 0.7, 1.3, 2.3])).unwrap();
        assert!((bpm - 100.0).abs() < 1e-3);
    }

    #[test]
    fn test_out_of_range_estimate_keeps_prior() {
        let mut est = estimator();
        est.update(&beats(&[0.0, 0.5, 1.0, 1.5, 2.0]));
        assert_eq!(est.current(), Some(120.0));

        // Median interval 0.1 s reads as 600 BPM, which is implausible
        let rejected = est.update(&beats(&[0.0, 0.1, 0.2, 0.3, 0.4]));
        assert!(rejected.is_none());
        assert_eq!(est.current(), Some(120.0));
    }

    #[test]
    fn test_coincident_timestamps_rejected_without_panic() {
        let mut est = estimator();
        let bpm = est.update(&beats(&[1.0, 1.0, 1.0, 1.0, 1.0]));
        assert!(bpm.is_none());
        assert!(est.current().is_none());
    }

    #[test]
    fn test_reset_clears_estimate() {
        let mut est = estimator();
        est.update(&beats(&[0.0, 0.5, 1.0, 1.5, 2.0]));
        est.reset();
        assert!(est.current().is_none());
    }
}
