// Step Tempo Core - beat-driven animation level engine
// Online beat detection, adaptive tempo calibration and step classification

// Module declarations
pub mod analysis;
pub mod calibration;
pub mod config;
pub mod error;
pub mod session;
pub mod testing;

// Re-exports for convenience
pub use analysis::{BandEnergy, BeatEvent, SpectrumLayout, StepLevel, StepTransition};
pub use calibration::{CalibrationPhase, TempoCalibrator, ThresholdSet};
pub use config::AppConfig;
pub use error::{ErrorCode, FixtureError, SessionError};
pub use session::{
    FrameFeed, SessionEngine, SessionEvent, SessionEventKind, TickReport, TrackSession,
};
