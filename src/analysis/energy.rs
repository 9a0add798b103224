// EnergySampler - per-tick band energy extraction from magnitude frames
//
// Collapses a frequency-domain magnitude frame (byte-scaled, 0-255) into
// two scalar band energies: mean bass magnitude and mean treble magnitude.
// Band edges are resolved to bin indices once at construction.

use crate::config::SamplerConfig;
use serde::{Deserialize, Serialize};

/// Geometry of the magnitude frames fed to the analysis chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpectrumLayout {
    /// Sample rate of the audio the frames were derived from, in Hz
    pub sample_rate: u32,
    /// Number of frequency bins per frame
    pub bins: usize,
}

impl SpectrumLayout {
    pub fn new(sample_rate: u32, bins: usize) -> Self {
        Self { sample_rate, bins }
    }

    /// Width of one frequency bin in Hz
    pub fn hz_per_bin(&self) -> f32 {
        let nyquist = self.sample_rate as f32 / 2.0;
        nyquist / self.bins as f32
    }
}

/// Mean magnitudes of the bass and treble bands for one frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandEnergy {
    pub bass: f32,
    pub treble: f32,
}

/// Resolves band edges to bin ranges and averages magnitudes per band
///
/// The bass band always spans at least one bin. At typical layouts
/// (44.1 kHz, 256 bins) the 60 Hz edge falls inside bin 0, so without
/// the floor the band would be empty and every mean would divide by zero.
#[derive(Debug, Clone)]
pub struct EnergySampler {
    /// Exclusive end of the bass bin range
    bass_end: usize,
    /// Inclusive start of the treble bin range
    treble_start: usize,
}

impl EnergySampler {
    pub fn new(layout: SpectrumLayout, config: &SamplerConfig) -> Self {
        let per_bin = layout.hz_per_bin();
        let bass_end = ((config.bass_max_hz / per_bin) as usize)
            .max(1)
            .min(layout.bins);
        let treble_start = ((config.treble_min_hz / per_bin) as usize).min(layout.bins);
        Self {
            bass_end,
            treble_start,
        }
    }

    /// Compute band energies for one magnitude frame
    ///
    /// Returns `None` for an empty frame. If the frame is shorter than the
    /// configured layout the band edges are clipped to the frame length; a
    /// treble band that falls entirely past the end reads as zero energy.
    pub fn sample(&self, magnitudes: &[f32]) -> Option<BandEnergy> {
        if magnitudes.is_empty() {
            return None;
        }

        let bass_end = self.bass_end.clamp(1, magnitudes.len());
        let bass = band_mean(&magnitudes[..bass_end]);

        let treble_start = self.treble_start.min(magnitudes.len());
        let treble = if treble_start < magnitudes.len() {
            band_mean(&magnitudes[treble_start..])
        } else {
            0.0
        };

        Some(BandEnergy { bass, treble })
    }

    /// Exclusive end of the bass bin range (diagnostics)
    pub fn bass_end(&self) -> usize {
        self.bass_end
    }

    /// Inclusive start of the treble bin range (diagnostics)
    pub fn treble_start(&self) -> usize {
        self.treble_start
    }
}

fn band_mean(slice: &[f32]) -> f32 {
    slice.iter().sum::<f32>() / slice.len() as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_sampler(sample_rate: u32, bins: usize) -> EnergySampler {
        EnergySampler::new(
            SpectrumLayout::new(sample_rate, bins),
            &SamplerConfig::default(),
        )
    }

    #[test]
    fn test_bass_band_never_empty_at_coarse_layouts() {
        // 44.1 kHz with 256 bins puts 60 Hz inside bin 0
        let sampler = default_sampler(44_100, 256);
        assert_eq!(sampler.bass_end(), 1);
    }

    #[test]
    fn test_bass_band_widens_with_fine_layouts() {
        // 44.1 kHz with 8192 bins resolves 60 Hz to bin 22
        let sampler = default_sampler(44_100, 8192);
        assert_eq!(sampler.bass_end(), 22);
    }

    #[test]
    fn test_sample_averages_each_band() {
        // 16 kHz, 8 bins: 1000 Hz per bin, treble starts at bin 4
        let sampler = default_sampler(16_000, 8);
        assert_eq!(sampler.treble_start(), 4);

        let frame = [80.0, 0.0, 0.0, 0.0, 10.0, 20.0, 30.0, 40.0];
        let energy = sampler.sample(&frame).unwrap();
        assert_eq!(energy.bass, 80.0);
        assert_eq!(energy.treble, 25.0);
    }

    #[test]
    fn test_empty_frame_yields_none() {
        let sampler = default_sampler(44_100, 256);
        assert!(sampler.sample(&[]).is_none());
    }

    #[test]
    fn test_treble_band_past_frame_end_reads_zero() {
        let layout = SpectrumLayout::new(16_000, 8);
        let config = SamplerConfig {
            bass_max_hz: 60.0,
            treble_min_hz: 9000.0,
        };
        let sampler = EnergySampler::new(layout, &config);

        let frame = [50.0; 8];
        let energy = sampler.sample(&frame).unwrap();
        assert_eq!(energy.treble, 0.0);
        assert_eq!(energy.bass, 50.0);
    }

    #[test]
    fn test_short_frame_clips_band_edges() {
        let sampler = default_sampler(16_000, 8);
        // Frame shorter than the treble start: bass still reads, treble is zero
        let frame = [12.0, 6.0];
        let energy = sampler.sample(&frame).unwrap();
        assert_eq!(energy.bass, 12.0);
        assert_eq!(energy.treble, 0.0);
    }
}
