// Spectrum module - byte-scaled magnitude frames from PCM
//
// Produces the 0-255 magnitude frames the analysis chain consumes, using
// the same conventions as a browser analyser node: Hann windowing, bin
// count of fft_size / 2, temporal smoothing across frames, and decibel
// mapping of magnitudes onto the byte range. Used by the CLI and tests
// to replay WAV files or synthetic PCM through the engine.

use crate::analysis::SpectrumLayout;
use crate::error::FixtureError;
use rustfft::{num_complex::Complex, FftPlanner};
use std::path::Path;

/// Default FFT window size for frame generation
pub const DEFAULT_FFT_SIZE: usize = 512;

/// Converts PCM windows into byte-scaled magnitude frames
pub struct SpectrumAnalyzer {
    planner: FftPlanner<f32>,
    fft_size: usize,
    /// Hann window for FFT (pre-computed)
    window: Vec<f32>,
    /// Per-bin magnitudes carried across frames for temporal smoothing
    smoothed: Vec<f32>,
    smoothing: f32,
    min_db: f32,
    max_db: f32,
}

impl SpectrumAnalyzer {
    const SMOOTHING: f32 = 0.8;
    const MIN_DB: f32 = -100.0;
    const MAX_DB: f32 = -30.0;

    /// Create an analyzer for the given FFT window size
    pub fn new(fft_size: usize) -> Self {
        // Pre-compute Hann window to reduce spectral leakage
        let window = (0..fft_size)
            .map(|i| {
                0.5 * (1.0
                    - ((2.0 * std::f32::consts::PI * i as f32) / (fft_size as f32 - 1.0)).cos())
            })
            .collect();

        Self {
            planner: FftPlanner::new(),
            fft_size,
            window,
            smoothed: vec![0.0; fft_size / 2],
            smoothing: Self::SMOOTHING,
            min_db: Self::MIN_DB,
            max_db: Self::MAX_DB,
        }
    }

    /// Number of bins per output frame
    pub fn bins(&self) -> usize {
        self.fft_size / 2
    }

    /// PCM window length consumed per frame
    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    /// Frame geometry for audio at the given sample rate
    pub fn layout(&self, sample_rate: u32) -> SpectrumLayout {
        SpectrumLayout::new(sample_rate, self.bins())
    }

    /// Compute the next byte-scaled magnitude frame from a PCM window
    ///
    /// The window is Hann-weighted and zero-padded to the FFT size. Each
    /// bin magnitude is normalized by the FFT size, blended with the
    /// previous frame's value, then mapped from decibels onto 0-255.
    /// Silence reads as 0, not negative infinity.
    pub fn next_frame(&mut self, samples: &[f32]) -> Vec<f32> {
        let mut buffer: Vec<Complex<f32>> = Vec::with_capacity(self.fft_size);
        for (i, &sample) in samples.iter().enumerate() {
            if i < self.fft_size {
                buffer.push(Complex::new(sample * self.window[i], 0.0));
            }
        }
        while buffer.len() < self.fft_size {
            buffer.push(Complex::new(0.0, 0.0));
        }

        let fft = self.planner.plan_fft_forward(self.fft_size);
        fft.process(&mut buffer);

        let bins = self.bins();
        let mut frame = Vec::with_capacity(bins);
        for (i, value) in buffer[..bins].iter().enumerate() {
            let magnitude = value.norm() / self.fft_size as f32;
            let blended = self.smoothing * self.smoothed[i] + (1.0 - self.smoothing) * magnitude;
            self.smoothed[i] = blended;

            let byte = if blended > 0.0 {
                let db = 20.0 * blended.log10();
                (255.0 * (db - self.min_db) / (self.max_db - self.min_db)).clamp(0.0, 255.0)
            } else {
                0.0
            };
            frame.push(byte);
        }
        frame
    }

    /// Forget the smoothing history, as when a new track begins
    pub fn reset(&mut self) {
        self.smoothed.iter_mut().for_each(|v| *v = 0.0);
    }
}

/// Read a WAV file as mono f32 samples plus its sample rate
///
/// Multi-channel files are downmixed by averaging. Integer PCM is scaled
/// into [-1.0, 1.0]; 8-bit files are not supported.
pub fn read_wav(path: &Path) -> Result<(Vec<f32>, u32), FixtureError> {
    let mut reader = hound::WavReader::open(path).map_err(|err| FixtureError::FileUnreadable {
        reason: format!("failed to open {}: {err}", path.display()),
    })?;
    let spec = reader.spec();
    if spec.channels == 0 {
        return Err(FixtureError::UnsupportedFormat {
            reason: format!("{} has zero channels", path.display()),
        });
    }

    let samples = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .map(|sample| {
                sample.map_err(|err| FixtureError::FileUnreadable {
                    reason: format!("error reading {}: {err}", path.display()),
                })
            })
            .collect::<Result<Vec<f32>, _>>()?,
        hound::SampleFormat::Int => match spec.bits_per_sample {
            16 => reader
                .samples::<i16>()
                .map(|sample| {
                    sample.map(|v| v as f32 / i16::MAX as f32).map_err(|err| {
                        FixtureError::FileUnreadable {
                            reason: format!("error reading {}: {err}", path.display()),
                        }
                    })
                })
                .collect::<Result<Vec<f32>, _>>()?,
            24 | 32 => reader
                .samples::<i32>()
                .map(|sample| {
                    sample.map(|v| v as f32 / i32::MAX as f32).map_err(|err| {
                        FixtureError::FileUnreadable {
                            reason: format!("error reading {}: {err}", path.display()),
                        }
                    })
                })
                .collect::<Result<Vec<f32>, _>>()?,
            bits => {
                return Err(FixtureError::UnsupportedFormat {
                    reason: format!(
                        "unsupported bits_per_sample={} for {}",
                        bits,
                        path.display()
                    ),
                })
            }
        },
    };

    if spec.channels == 1 {
        return Ok((samples, spec.sample_rate));
    }

    let mut mono = Vec::with_capacity(samples.len() / spec.channels as usize);
    for chunk in samples.chunks(spec.channels as usize) {
        let sum: f32 = chunk.iter().copied().sum();
        mono.push(sum / spec.channels as f32);
    }
    Ok((mono, spec.sample_rate))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bin_count_is_half_fft_size() {
        let analyzer = SpectrumAnalyzer::new(DEFAULT_FFT_SIZE);
        assert_eq!(analyzer.bins(), 256);
        assert_eq!(analyzer.layout(44_100).bins, 256);
        assert_eq!(analyzer.layout(44_100).sample_rate, 44_100);
    }

    #[test]
    fn test_silence_reads_as_zero_bytes() {
        let mut analyzer = SpectrumAnalyzer::new(64);
        let frame = analyzer.next_frame(&vec![0.0; 64]);
        assert_eq!(frame.len(), 32);
        assert!(frame.iter().all(|&b| b == 0.0));
    }

    #[test]
    fn test_tone_concentrates_energy_in_its_bin() {
        // 8 kHz rate, 64-point FFT: bin width 125 Hz, so a 1 kHz tone
        // lands in bin 8. Amplitude kept low so the peak stays under the
        // decibel ceiling; at full scale the clamp flattens bins 7-9.
        let mut analyzer = SpectrumAnalyzer::new(64);
        let tone: Vec<f32> = (0..64)
            .map(|i| 0.05 * (2.0 * std::f32::consts::PI * 1000.0 * i as f32 / 8000.0).sin())
            .collect();

        // Run several frames so smoothing converges toward the live value
        let mut frame = Vec::new();
        for _ in 0..20 {
            frame = analyzer.next_frame(&tone);
        }

        let peak_bin = frame
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap();
        assert_eq!(peak_bin, 8);
        assert!(frame[8] > frame[2]);
    }

    #[test]
    fn test_frames_stay_in_byte_range() {
        let mut analyzer = SpectrumAnalyzer::new(64);
        let loud: Vec<f32> = (0..64)
            .map(|i| if i % 2 == 0 { 1.0 } else { -1.0 })
            .collect();
        let frame = analyzer.next_frame(&loud);
        assert!(frame.iter().all(|&b| (0.0..=255.0).contains(&b)));
    }

    #[test]
    fn test_reset_clears_smoothing_history() {
        let mut analyzer = SpectrumAnalyzer::new(64);
        let loud = vec![0.5; 64];
        analyzer.next_frame(&loud);
        analyzer.reset();

        let frame = analyzer.next_frame(&vec![0.0; 64]);
        assert!(frame.iter().all(|&b| b == 0.0));
    }

    #[test]
    fn test_missing_wav_reports_fixture_error() {
        let err = read_wav(Path::new("/nonexistent/never.wav")).unwrap_err();
        match err {
            FixtureError::FileUnreadable { reason } => {
                assert!(reason.contains("never.wav"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
