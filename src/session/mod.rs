// Session module - lifecycle, tick orchestration and event plumbing
//
// Two layers around the same state machine:
// 1. TrackSession: synchronous, clock-as-argument, directly testable
// 2. SessionEngine: owns a TrackSession behind one mutex and drives it
//    from a dedicated ticker thread, publishing SessionEvents

pub mod core;
pub mod engine;
pub mod events;

pub use core::{TickReport, TrackSession};
pub use engine::{FrameFeed, SessionEngine};
pub use events::{SessionEvent, SessionEventKind};
