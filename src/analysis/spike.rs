//! Bass energy spike detection with rolling-mean thresholding
//!
//! Detection pipeline per tick:
//! 1. Append the bass energy sample to the rolling history (FIFO, capped)
//! 2. Compute the mean over the history, including the sample just added
//! 3. Flag a spike when the sample exceeds mean * spike_ratio
//! 4. Suppress spikes that land inside the refractory window after the
//!    last accepted beat
//!
//! Accepted beats are timestamped and kept in a short FIFO history for
//! interval-based tempo estimation downstream.

use crate::config::DetectorConfig;
use std::collections::VecDeque;

/// A single accepted beat
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BeatEvent {
    /// Session-relative timestamp in seconds
    pub timestamp: f64,
    /// Running count of beats accepted since the session started
    pub count: u64,
}

/// Adaptive spike detector over per-tick bass energy samples
#[derive(Debug, Clone)]
pub struct SpikeDetector {
    energy_history: VecDeque<f32>,
    history_len: usize,
    spike_ratio: f32,
    refractory_secs: f64,
    beats: VecDeque<f64>,
    beat_history_len: usize,
    last_beat: Option<f64>,
    beat_count: u64,
}

impl SpikeDetector {
    pub fn new(config: &DetectorConfig) -> Self {
        Self {
            energy_history: VecDeque::with_capacity(config.history_len + 1),
            history_len: config.history_len,
            spike_ratio: config.spike_ratio,
            refractory_secs: config.refractory_secs,
            beats: VecDeque::with_capacity(config.beat_history_len + 1),
            beat_history_len: config.beat_history_len,
            last_beat: None,
            beat_count: 0,
        }
    }

    /// Feed one bass energy sample and report whether it is an accepted beat
    ///
    /// The sample always enters the rolling history, beat or not. The
    /// threshold is computed over the history after the append, so a lone
    /// spike still competes against a mean it has already pulled up.
    pub fn observe(&mut self, energy: f32, now: f64) -> Option<BeatEvent> {
        self.energy_history.push_back(energy);
        if self.energy_history.len() > self.history_len {
            self.energy_history.pop_front();
        }

        let mean = self.history_mean();
        if energy <= mean * self.spike_ratio {
            return None;
        }

        let refractory_passed = self
            .last_beat
            .map_or(true, |last| now - last > self.refractory_secs);
        if !refractory_passed {
            return None;
        }

        self.last_beat = Some(now);
        self.beat_count += 1;
        self.beats.push_back(now);
        if self.beats.len() > self.beat_history_len {
            self.beats.pop_front();
        }

        log::debug!(
            "[Spike] Beat #{} at {:.3}s (energy {:.1} over threshold {:.1})",
            self.beat_count,
            now,
            energy,
            mean * self.spike_ratio
        );

        Some(BeatEvent {
            timestamp: now,
            count: self.beat_count,
        })
    }

    /// Timestamps of recently accepted beats, oldest first
    pub fn beat_history(&self) -> &VecDeque<f64> {
        &self.beats
    }

    /// Current detection threshold, or `None` before the first sample
    pub fn current_threshold(&self) -> Option<f32> {
        if self.energy_history.is_empty() {
            None
        } else {
            Some(self.history_mean() * self.spike_ratio)
        }
    }

    /// Number of energy samples currently in the rolling history
    pub fn energy_history_len(&self) -> usize {
        self.energy_history.len()
    }

    /// Total beats accepted since the last reset
    pub fn beat_count(&self) -> u64 {
        self.beat_count
    }

    /// Drop all detector state back to the just-constructed condition
    pub fn reset(&mut self) {
        self.energy_history.clear();
        self.beats.clear();
        self.last_beat = None;
        self.beat_count = 0;
    }

    fn history_mean(&self) -> f32 {
        if self.energy_history.is_empty() {
            return 0.0;
        }
        let sum: f32 = self.energy_history.iter().sum();
        sum / self.energy_history.len() as f32
    }
}
