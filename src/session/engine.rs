//! SessionEngine - the async driver around TrackSession
//!
//! Owns the session behind a single mutex and drives it from a dedicated
//! thread running two periodic tasks: the analysis chain at tick cadence
//! and the fallback estimator once a second. Magnitude frames arrive
//! through a lock-free SPSC queue; each tick drains the queue and keeps
//! only the newest frame, mirroring how a live analyser is polled.
//!
//! Callers on other threads read the level, tempo and beat count from an
//! atomic snapshot without touching the mutex.

use crate::analysis::{SpectrumLayout, StepLevel};
use crate::calibration::ThresholdSet;
use crate::config::AppConfig;
use crate::error::{log_session_error, SessionError};
use crate::session::core::{TickReport, TrackSession};
use crate::session::events::{SessionEvent, SessionEventKind};
use futures::Stream;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tokio::sync::broadcast;
use tokio::time::MissedTickBehavior;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

/// Wait-free mirror of the session state for cross-thread reads
struct EngineShared {
    level: AtomicU8,
    /// Bit pattern of the current estimate; 0 means unset. No accepted
    /// estimate can be 0.0 BPM, so the sentinel is unambiguous.
    tempo_bits: AtomicU32,
    beat_count: AtomicU64,
    running: AtomicBool,
    collecting: AtomicBool,
}

impl EngineShared {
    fn new() -> Self {
        Self {
            level: AtomicU8::new(0),
            tempo_bits: AtomicU32::new(0),
            beat_count: AtomicU64::new(0),
            running: AtomicBool::new(false),
            collecting: AtomicBool::new(false),
        }
    }

    fn snapshot_from(&self, session: &TrackSession) {
        self.level
            .store(session.level().index(), Ordering::SeqCst);
        let bits = session.tempo().map_or(0, f32::to_bits);
        self.tempo_bits.store(bits, Ordering::SeqCst);
        self.beat_count.store(session.beat_count(), Ordering::SeqCst);
        self.running.store(session.is_running(), Ordering::SeqCst);
        self.collecting
            .store(session.is_collecting(), Ordering::SeqCst);
    }

    fn load_tempo(&self) -> Option<f32> {
        let bits = self.tempo_bits.load(Ordering::SeqCst);
        if bits == 0 {
            None
        } else {
            Some(f32::from_bits(bits))
        }
    }
}

/// Producer half of the frame queue, handed to the FFT side
pub struct FrameFeed {
    producer: rtrb::Producer<Box<[f32]>>,
}

impl FrameFeed {
    /// Push one magnitude frame; returns false when the queue is full
    ///
    /// A full queue is not an error. The ticker keeps only the newest
    /// frame anyway, so a dropped push just means a later one wins.
    pub fn push(&mut self, frame: &[f32]) -> bool {
        self.producer.push(Box::from(frame)).is_ok()
    }
}

/// Periodic driver that owns the consumer side of the frame queue
struct SessionTicker {
    session: Arc<Mutex<TrackSession>>,
    shared: Arc<EngineShared>,
    events_tx: broadcast::Sender<SessionEvent>,
    start_instant: Instant,
    shutdown: Arc<AtomicBool>,
    frames: rtrb::Consumer<Box<[f32]>>,
    current_frame: Option<Box<[f32]>>,
    tick_period: Duration,
    fallback_period: Duration,
}

impl SessionTicker {
    async fn run(mut self) {
        let mut chain = tokio::time::interval(self.tick_period);
        chain.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut fallback = tokio::time::interval(self.fallback_period);
        fallback.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            if self.shutdown.load(Ordering::SeqCst) {
                log::debug!("[Engine] Ticker shutting down");
                break;
            }
            tokio::select! {
                _ = chain.tick() => self.chain_tick(),
                _ = fallback.tick() => self.fallback_tick(),
            }
        }
    }

    fn chain_tick(&mut self) {
        self.drain_frames();
        let Some(frame) = self.current_frame.as_deref() else {
            return;
        };

        let now = self.start_instant.elapsed().as_secs_f64();
        let report = {
            let mut session = lock_session(&self.session);
            let report = session.advance(frame, now);
            self.shared.snapshot_from(&session);
            report
        };
        self.publish_report(&report);
    }

    fn fallback_tick(&mut self) {
        self.drain_frames();
        let Some(frame) = self.current_frame.as_deref() else {
            return;
        };

        let report = {
            let mut session = lock_session(&self.session);
            let report = session.fallback_tick(frame);
            self.shared.snapshot_from(&session);
            report
        };
        self.publish_report(&report);
    }

    fn drain_frames(&mut self) {
        while let Ok(frame) = self.frames.pop() {
            self.current_frame = Some(frame);
        }
    }

    fn publish_report(&self, report: &TickReport) {
        if let Some(beat) = report.beat {
            self.publish(SessionEventKind::Beat { count: beat.count });
        }
        if let Some(bpm) = report.tempo {
            self.publish(SessionEventKind::TempoUpdated { bpm });
        }
        if let Some(bpm) = report.fallback {
            self.publish(SessionEventKind::FallbackTempo { bpm });
        }
        if let Some(thresholds) = report.calibration {
            self.publish(SessionEventKind::CalibrationCompleted { thresholds });
        }
        if let Some(transition) = report.transition {
            self.publish(SessionEventKind::LevelChanged {
                from: transition.from,
                to: transition.to,
                bpm: transition.bpm,
            });
        }
    }

    fn publish(&self, kind: SessionEventKind) {
        publish_event(&self.events_tx, self.start_instant, kind);
    }
}

/// Thread-safe handle to a driven session
pub struct SessionEngine {
    session: Arc<Mutex<TrackSession>>,
    shared: Arc<EngineShared>,
    events_tx: broadcast::Sender<SessionEvent>,
    start_instant: Instant,
    shutdown: Arc<AtomicBool>,
}

impl SessionEngine {
    /// Build an engine and its frame feed, and start the ticker thread
    pub fn new(layout: SpectrumLayout, config: &AppConfig) -> (Self, FrameFeed) {
        let (producer, consumer) = rtrb::RingBuffer::new(config.engine.frame_queue_len.max(1));
        let (events_tx, _) = broadcast::channel(config.engine.event_buffer.max(1));
        let session = Arc::new(Mutex::new(TrackSession::new(layout, config)));
        let shared = Arc::new(EngineShared::new());
        let shutdown = Arc::new(AtomicBool::new(false));
        let start_instant = Instant::now();

        let ticker = SessionTicker {
            session: Arc::clone(&session),
            shared: Arc::clone(&shared),
            events_tx: events_tx.clone(),
            start_instant,
            shutdown: Arc::clone(&shutdown),
            frames: consumer,
            current_frame: None,
            tick_period: Duration::from_millis(config.engine.tick_ms.max(1)),
            fallback_period: Duration::from_millis(config.engine.fallback_tick_ms.max(1)),
        };

        // Dedicated thread with its own runtime so the engine behaves the
        // same whether or not the caller is already inside one
        std::thread::spawn(move || {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .expect("Failed to create Tokio runtime for session ticker");
            rt.block_on(ticker.run());
        });

        (
            Self {
                session,
                shared,
                events_tx,
                start_instant,
                shutdown,
            },
            FrameFeed { producer },
        )
    }

    /// Start the session and open a calibration window
    pub fn start(&self) -> Result<(), SessionError> {
        let mut session = lock_session(&self.session);
        let now = self.start_instant.elapsed().as_secs_f64();
        if let Err(err) = session.start(now) {
            log_session_error(&err, "SessionEngine::start");
            return Err(err);
        }
        self.shared.snapshot_from(&session);
        drop(session);
        self.publish(SessionEventKind::SessionStarted);
        Ok(())
    }

    /// Stop the session; the ticker thread stays alive for the next start
    pub fn stop(&self) -> Result<(), SessionError> {
        let mut session = lock_session(&self.session);
        if let Err(err) = session.stop() {
            log_session_error(&err, "SessionEngine::stop");
            return Err(err);
        }
        self.shared.snapshot_from(&session);
        drop(session);
        self.publish(SessionEventKind::SessionStopped);
        Ok(())
    }

    /// Discard track state, as when playback restarts from zero
    pub fn reset(&self) {
        let mut session = lock_session(&self.session);
        let now = self.start_instant.elapsed().as_secs_f64();
        session.reset(now);
        self.shared.snapshot_from(&session);
        drop(session);
        self.publish(SessionEventKind::SessionReset);
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::SeqCst)
    }

    pub fn is_collecting(&self) -> bool {
        self.shared.collecting.load(Ordering::SeqCst)
    }

    /// The step level currently in effect
    pub fn current_level(&self) -> StepLevel {
        StepLevel::from_index(self.shared.level.load(Ordering::SeqCst))
    }

    /// The displayable tempo estimate; `None` until one is accepted
    pub fn current_tempo(&self) -> Option<f32> {
        self.shared.load_tempo()
    }

    /// Beats accepted since the session started
    pub fn beat_count(&self) -> u64 {
        self.shared.beat_count.load(Ordering::SeqCst)
    }

    /// The thresholds currently in effect (locks the session briefly)
    pub fn thresholds(&self) -> ThresholdSet {
        lock_session(&self.session).thresholds()
    }

    /// Subscribe to raw broadcast events
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events_tx.subscribe()
    }

    /// Subscribe as a `Stream`; lagged receivers skip missed events
    pub fn event_stream(&self) -> impl Stream<Item = SessionEvent> + Unpin {
        BroadcastStream::new(self.events_tx.subscribe()).filter_map(|entry| entry.ok())
    }

    /// Signal the ticker thread to exit after its current tick
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    fn publish(&self, kind: SessionEventKind) {
        publish_event(&self.events_tx, self.start_instant, kind);
    }
}

impl Drop for SessionEngine {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }
}

fn lock_session(session: &Mutex<TrackSession>) -> MutexGuard<'_, TrackSession> {
    // A panic mid-tick leaves the session consistent; recover the guard
    session.lock().unwrap_or_else(|err| err.into_inner())
}

fn publish_event(
    tx: &broadcast::Sender<SessionEvent>,
    start_instant: Instant,
    kind: SessionEventKind,
) {
    let timestamp_ms = Instant::now()
        .saturating_duration_since(start_instant)
        .as_millis() as u64;
    let _ = tx.send(SessionEvent { timestamp_ms, kind });
}
