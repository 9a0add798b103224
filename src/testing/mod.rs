//! Deterministic replay utilities.
//!
//! Modules in this namespace let tests and the CLI drive the detection
//! chain without live audio: synthetic frame scripts, WAV replay through
//! the spectrum analyzer, and the declarative fixture specs that tie
//! them together.

pub mod fixtures;
pub mod spectrum;

pub use fixtures::{
    FixtureSource, FixtureSpec, FramePattern, FrameScript, FrameSource, SyntheticFrames, WavFrames,
};
pub use spectrum::{read_wav, SpectrumAnalyzer, DEFAULT_FFT_SIZE};
