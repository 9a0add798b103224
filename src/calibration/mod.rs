// Calibration module - adaptive tempo threshold derivation
//
// This module provides two main components:
// 1. ThresholdSet: the four BPM band boundaries used by classification
// 2. TempoCalibrator: the observation window that derives a set from
//    the tempo estimates seen early in a session
//
// The calibration workflow:
// 1. begin() opens the window when a session starts
// 2. Accepted tempo estimates are collected for the window duration
// 3. The first estimate after the window elapses finalizes the set

pub mod collector;
pub mod thresholds;

pub use collector::{CalibrationPhase, TempoCalibrator};
pub use thresholds::ThresholdSet;
