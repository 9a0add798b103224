//! Fixture specification + frame source abstractions for offline harnesses.
//!
//! Offline analysis and tests need deterministic magnitude frames that can
//! feed the detection chain without live audio. This module defines the
//! declarative description (`FixtureSpec`) plus the concrete sources: a
//! WAV replay that runs PCM through the spectrum analyzer, and synthetic
//! frame scripts (pulse trains, steady levels, noise) generated directly
//! in the frequency domain.

use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::analysis::SpectrumLayout;
use crate::error::FixtureError;
use crate::testing::spectrum::{read_wav, SpectrumAnalyzer, DEFAULT_FFT_SIZE};

/// Declarative description of a replayable analysis fixture.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FixtureSpec {
    pub id: String,
    pub source: FixtureSource,
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    #[serde(default = "default_fft_size")]
    pub fft_size: usize,
    #[serde(default = "default_duration_secs")]
    pub duration_secs: f64,
}

/// Where the fixture's frames come from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FixtureSource {
    /// Replay a WAV file through the spectrum analyzer.
    WavFile { path: PathBuf },
    /// Generate frames procedurally in the frequency domain.
    Synthetic { pattern: FramePattern },
}

/// Supported deterministic frame patterns.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FramePattern {
    /// Bass pulses at a fixed tempo over a quiet floor.
    PulseTrain { bpm: f32 },
    /// Every bin pinned to one magnitude.
    Steady { level: f32 },
    /// All-zero frames.
    Silence,
    /// Seeded uniform noise across all bins.
    WhiteNoise { seed: u64 },
}

/// Trait implemented by sources that can produce per-tick frames.
pub trait FrameSource: Send {
    /// Frame for the tick at session-relative time `t`, or `None` once
    /// the source is exhausted.
    fn frame_at(&mut self, t: f64) -> Option<Vec<f32>>;

    /// Geometry of the frames this source produces.
    fn layout(&self) -> SpectrumLayout;
}

fn default_sample_rate() -> u32 {
    44_100
}

fn default_fft_size() -> usize {
    DEFAULT_FFT_SIZE
}

fn default_duration_secs() -> f64 {
    45.0
}

impl FixtureSpec {
    /// Validate invariant expectations for downstream replay.
    pub fn validate(&self) -> Result<(), FixtureError> {
        if self.sample_rate == 0 {
            return Err(FixtureError::InvalidSpec {
                reason: "fixture sample rate must be > 0".to_string(),
            });
        }
        if self.fft_size < 2 {
            return Err(FixtureError::InvalidSpec {
                reason: "fft size must be at least 2".to_string(),
            });
        }
        if self.duration_secs <= 0.0 {
            return Err(FixtureError::InvalidSpec {
                reason: "fixture duration must be positive".to_string(),
            });
        }

        if let FixtureSource::Synthetic { pattern } = &self.source {
            match pattern {
                FramePattern::PulseTrain { bpm } if *bpm <= 0.0 => {
                    return Err(FixtureError::InvalidSpec {
                        reason: format!("pulse train bpm must be > 0 (got {})", bpm),
                    });
                }
                FramePattern::Steady { level } if *level < 0.0 => {
                    return Err(FixtureError::InvalidSpec {
                        reason: format!("steady level must be >= 0 (got {})", level),
                    });
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Convert spec + source into a runtime frame source.
    pub fn build_source(&self) -> Result<Box<dyn FrameSource>, FixtureError> {
        self.validate()?;
        match &self.source {
            FixtureSource::WavFile { path } => {
                let (samples, sample_rate) = read_wav(path)?;
                Ok(Box::new(WavFrames::new(samples, sample_rate, self.fft_size)))
            }
            FixtureSource::Synthetic { pattern } => {
                let layout = SpectrumLayout::new(self.sample_rate, self.fft_size / 2);
                Ok(Box::new(SyntheticFrames::new(
                    FrameScript::new(layout, pattern.clone()),
                    self.duration_secs,
                )))
            }
        }
    }
}

/// Endless generator of synthetic magnitude frames.
///
/// The pulse train puts its energy in bin 0, which the default band
/// config reads as bass at any realistic layout.
pub struct FrameScript {
    layout: SpectrumLayout,
    pattern: FramePattern,
    rng: StdRng,
}

impl FrameScript {
    /// Bass magnitude during a pulse.
    pub const PULSE_BASS: f32 = 220.0;
    /// Bass magnitude between pulses.
    pub const QUIET_BASS: f32 = 40.0;
    /// Treble floor for pulse train frames.
    pub const QUIET_TREBLE: f32 = 30.0;
    /// How long each pulse stays hot, in seconds.
    pub const PULSE_WIDTH_SECS: f64 = 0.04;

    pub fn new(layout: SpectrumLayout, pattern: FramePattern) -> Self {
        let seed = match pattern {
            FramePattern::WhiteNoise { seed } => seed,
            _ => 0,
        };
        Self {
            layout,
            pattern,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn layout(&self) -> SpectrumLayout {
        self.layout
    }

    /// Magnitude frame for the tick at session-relative time `t`
    pub fn frame_at(&mut self, t: f64) -> Vec<f32> {
        match &self.pattern {
            FramePattern::PulseTrain { bpm } => {
                let period = 60.0 / *bpm as f64;
                let hit = t.rem_euclid(period) < Self::PULSE_WIDTH_SECS;
                let mut frame = vec![Self::QUIET_TREBLE; self.layout.bins];
                frame[0] = if hit {
                    Self::PULSE_BASS
                } else {
                    Self::QUIET_BASS
                };
                frame
            }
            FramePattern::Steady { level } => vec![*level; self.layout.bins],
            FramePattern::Silence => vec![0.0; self.layout.bins],
            FramePattern::WhiteNoise { .. } => (0..self.layout.bins)
                .map(|_| self.rng.gen_range(0.0..255.0))
                .collect(),
        }
    }
}

/// Synthetic source with a fixed end time.
pub struct SyntheticFrames {
    script: FrameScript,
    duration_secs: f64,
}

impl SyntheticFrames {
    pub fn new(script: FrameScript, duration_secs: f64) -> Self {
        Self {
            script,
            duration_secs,
        }
    }
}

impl FrameSource for SyntheticFrames {
    fn frame_at(&mut self, t: f64) -> Option<Vec<f32>> {
        if t >= self.duration_secs {
            return None;
        }
        Some(self.script.frame_at(t))
    }

    fn layout(&self) -> SpectrumLayout {
        self.script.layout()
    }
}

/// WAV replay source: windows PCM at the tick position and runs it
/// through the spectrum analyzer.
pub struct WavFrames {
    samples: Vec<f32>,
    sample_rate: u32,
    analyzer: SpectrumAnalyzer,
}

impl WavFrames {
    pub fn new(samples: Vec<f32>, sample_rate: u32, fft_size: usize) -> Self {
        Self {
            samples,
            sample_rate,
            analyzer: SpectrumAnalyzer::new(fft_size),
        }
    }
}

impl FrameSource for WavFrames {
    fn frame_at(&mut self, t: f64) -> Option<Vec<f32>> {
        let start = (t * self.sample_rate as f64) as usize;
        if start >= self.samples.len() {
            return None;
        }
        let end = (start + self.analyzer.fft_size()).min(self.samples.len());
        Some(self.analyzer.next_frame(&self.samples[start..end]))
    }

    fn layout(&self) -> SpectrumLayout {
        self.analyzer.layout(self.sample_rate)
    }
}
