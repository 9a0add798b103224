use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, Instant};

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tokio::sync::broadcast::error::TryRecvError;

use steptempo::config::AppConfig;
use steptempo::session::{
    FrameFeed, SessionEngine, SessionEvent, SessionEventKind, TickReport, TrackSession,
};
use steptempo::testing::{FixtureSource, FixtureSpec, FramePattern, FrameSource};
use steptempo::{StepLevel, ThresholdSet};

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    match cli.execute() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("steptempo-cli error: {err:?}");
            ExitCode::from(1)
        }
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    // Logs go to stderr so JSON reports on stdout stay parseable
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

#[derive(Parser, Debug)]
#[command(name = "steptempo-cli", about = "Replay + diagnostics harness for the step tempo engine")]
struct Cli {
    /// Show debug-level log output from the analysis chain.
    #[arg(long, global = true, default_value_t = false)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

impl Cli {
    fn execute(self) -> Result<()> {
        match self.command {
            Command::Analyze(args) => analyze_command(args),
            Command::Stream(args) => stream_command(args),
            Command::Config(args) => config_command(args),
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Replay a fixture through the analysis chain on a simulated clock.
    Analyze(AnalyzeArgs),
    /// Drive a live engine with fixture frames and print its events.
    Stream(StreamArgs),
    /// Print the effective configuration as JSON.
    Config(ConfigArgs),
}

#[derive(Args, Debug, Clone)]
struct AnalyzeArgs {
    #[command(flatten)]
    fixture: FixtureArgs,
    /// Path to a JSON config file overriding the defaults.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Output format for the replay report.
    #[arg(long, value_enum, default_value_t = ReportFormat::Table)]
    format: ReportFormat,
    /// Destination file for the report (JSON only).
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
struct StreamArgs {
    #[command(flatten)]
    fixture: FixtureArgs,
    /// Path to a JSON config file overriding the defaults.
    #[arg(long)]
    config: Option<PathBuf>,
    /// How long to stream events before stopping (milliseconds).
    #[arg(long, default_value_t = 10_000)]
    watch_ms: u64,
}

#[derive(Args, Debug, Clone)]
struct ConfigArgs {
    /// Path to a JSON config file overriding the defaults.
    #[arg(long)]
    file: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
struct FixtureArgs {
    /// Path to a WAV file to replay.
    #[arg(long)]
    wav: Option<PathBuf>,
    /// Deterministic synthetic pattern to generate.
    #[arg(long, value_enum)]
    pattern: Option<PatternArg>,
    /// Tempo of the synthetic pulse train in BPM.
    #[arg(long, default_value_t = 100.0)]
    bpm: f32,
    /// Bin magnitude for the steady pattern (0-255).
    #[arg(long, default_value_t = 100.0)]
    level: f32,
    /// Seed for the white noise pattern.
    #[arg(long, default_value_t = 7)]
    seed: u64,
    /// Override fixture identifier used in reports.
    #[arg(long)]
    id: Option<String>,
    /// Sample rate for synthetic sources.
    #[arg(long, default_value_t = 44_100)]
    sample_rate: u32,
    /// FFT size the magnitude frames are derived from.
    #[arg(long, default_value_t = 512)]
    fft_size: usize,
    /// Fixture length in seconds (synthetic sources).
    #[arg(long, default_value_t = 45.0)]
    duration_secs: f64,
}

impl FixtureArgs {
    fn resolved_id(&self) -> String {
        if let Some(id) = &self.id {
            return id.clone();
        }

        if let Some(path) = &self.wav {
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                return stem.to_string();
            }
        }

        if let Some(pattern) = self.pattern {
            return format!("synthetic-{pattern}");
        }

        "fixture".into()
    }

    fn validate(&self) -> Result<()> {
        let selected = self.wav.is_some() as u8 + self.pattern.is_some() as u8;
        if selected != 1 {
            bail!("Provide exactly one source via --wav or --pattern");
        }
        if let Some(path) = &self.wav {
            if !path.exists() {
                bail!("wav file {} does not exist", path.display());
            }
        }
        Ok(())
    }

    fn build_spec(&self) -> Result<FixtureSpec> {
        self.validate()?;
        let source = if let Some(path) = &self.wav {
            FixtureSource::WavFile { path: path.clone() }
        } else if let Some(pattern) = self.pattern {
            FixtureSource::Synthetic {
                pattern: self.frame_pattern(pattern),
            }
        } else {
            bail!("No fixture source provided");
        };

        let spec = FixtureSpec {
            id: self.resolved_id(),
            source,
            sample_rate: self.sample_rate,
            fft_size: self.fft_size,
            duration_secs: self.duration_secs,
        };
        spec.validate()?;
        Ok(spec)
    }

    fn frame_pattern(&self, pattern: PatternArg) -> FramePattern {
        match pattern {
            PatternArg::PulseTrain => FramePattern::PulseTrain { bpm: self.bpm },
            PatternArg::Steady => FramePattern::Steady { level: self.level },
            PatternArg::Silence => FramePattern::Silence,
            PatternArg::WhiteNoise => FramePattern::WhiteNoise { seed: self.seed },
        }
    }
}

#[derive(Debug, Copy, Clone, ValueEnum)]
enum PatternArg {
    PulseTrain,
    Steady,
    Silence,
    WhiteNoise,
}

impl std::fmt::Display for PatternArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum ReportFormat {
    Json,
    Table,
}

fn load_config(path: Option<&Path>) -> AppConfig {
    match path {
        Some(path) => AppConfig::load_from_file(path),
        None => AppConfig::load(),
    }
}

fn analyze_command(args: AnalyzeArgs) -> Result<()> {
    let config = load_config(args.config.as_deref());
    let spec = args.fixture.build_spec()?;
    let mut source = spec.build_source().context("building fixture source")?;

    let mut session = TrackSession::new(source.layout(), &config);
    session.start(0.0).context("starting replay session")?;

    let tick_secs = config.engine.tick_ms.max(1) as f64 / 1000.0;
    let ticks_per_fallback =
        (config.engine.fallback_tick_ms / config.engine.tick_ms.max(1)).max(1);

    let mut report = AnalyzeReport::new(spec.id.clone());
    let mut tick: u64 = 0;
    loop {
        let now = tick as f64 * tick_secs;
        let Some(frame) = source.frame_at(now) else {
            break;
        };
        record_tick(&mut report, now, &session.advance(&frame, now));
        if tick % ticks_per_fallback == 0 {
            record_tick(&mut report, now, &session.fallback_tick(&frame));
        }
        tick += 1;
    }

    report.ticks = tick;
    report.duration_secs = tick as f64 * tick_secs;
    report.beats = session.beat_count();
    report.bpm = session.tempo();
    report.calibrated = session.is_calibrated();
    report.thresholds = session.thresholds();
    report.level = session.level();
    session.stop().context("stopping replay session")?;

    if let Some(path) = args.out {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("creating report output directory")?;
        }
        let json = serde_json::to_string_pretty(&report).context("serializing replay report")?;
        std::fs::write(&path, json)
            .with_context(|| format!("writing report to {}", path.display()))?;
        println!("Wrote report to {}", path.display());
    } else {
        match args.format {
            ReportFormat::Json => {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&report).context("serializing replay report")?
                );
            }
            ReportFormat::Table => report.print_table(),
        }
    }

    Ok(())
}

fn stream_command(args: StreamArgs) -> Result<()> {
    let config = load_config(args.config.as_deref());
    let spec = args.fixture.build_spec()?;
    let source = spec.build_source().context("building fixture source")?;
    let layout = source.layout();

    let (engine, feed) = SessionEngine::new(layout, &config);
    let mut events = engine.subscribe();
    engine.start().context("starting streaming session")?;

    let tick = Duration::from_millis(config.engine.tick_ms.max(1));
    let deadline = Instant::now() + Duration::from_millis(args.watch_ms.max(100));
    let feeder = std::thread::spawn(move || feed_frames(source, feed, tick, deadline));

    while Instant::now() < deadline && !feeder.is_finished() {
        match events.try_recv() {
            Ok(event) => print_event(&event),
            Err(TryRecvError::Empty) => std::thread::sleep(Duration::from_millis(15)),
            Err(TryRecvError::Lagged(_)) => continue,
            Err(TryRecvError::Closed) => break,
        }
    }

    if engine.is_running() {
        engine.stop().context("stopping streaming session")?;
    }
    loop {
        match events.try_recv() {
            Ok(event) => print_event(&event),
            Err(TryRecvError::Lagged(_)) => continue,
            Err(_) => break,
        }
    }

    let tempo = engine
        .current_tempo()
        .map_or_else(|| "n/a".to_string(), |bpm| format!("{bpm:.1} BPM"));
    println!(
        "Stream finished: {} beats, tempo {}, level {}",
        engine.beat_count(),
        tempo,
        engine.current_level()
    );

    engine.shutdown();
    feeder
        .join()
        .map_err(|_| anyhow!("frame feeder thread panicked"))?;
    Ok(())
}

fn config_command(args: ConfigArgs) -> Result<()> {
    let config = load_config(args.file.as_deref());
    let json = serde_json::to_string_pretty(&config).context("serializing configuration")?;
    println!("{json}");
    Ok(())
}

/// Push fixture frames at tick cadence until the source or the watch
/// window runs out.
fn feed_frames(
    mut source: Box<dyn FrameSource>,
    mut feed: FrameFeed,
    tick: Duration,
    deadline: Instant,
) {
    let start = Instant::now();
    while Instant::now() < deadline {
        let t = start.elapsed().as_secs_f64();
        let Some(frame) = source.frame_at(t) else {
            break;
        };
        feed.push(&frame);
        std::thread::sleep(tick);
    }
}

fn print_event(event: &SessionEvent) {
    let ms = event.timestamp_ms;
    match &event.kind {
        SessionEventKind::SessionStarted => println!("[{ms:>8} ms] session started"),
        SessionEventKind::SessionStopped => println!("[{ms:>8} ms] session stopped"),
        SessionEventKind::SessionReset => println!("[{ms:>8} ms] session reset"),
        SessionEventKind::Beat { count } => println!("[{ms:>8} ms] beat #{count}"),
        SessionEventKind::TempoUpdated { bpm } => println!("[{ms:>8} ms] tempo {bpm:.1} BPM"),
        SessionEventKind::FallbackTempo { bpm } => {
            println!("[{ms:>8} ms] fallback tempo {bpm:.1} BPM")
        }
        SessionEventKind::CalibrationCompleted { thresholds } => println!(
            "[{ms:>8} ms] calibration complete (slow {:.1} / medium {:.1} / fast {:.1} / very fast {:.1})",
            thresholds.slow, thresholds.medium, thresholds.fast, thresholds.very_fast
        ),
        SessionEventKind::LevelChanged { from, to, bpm } => {
            println!("[{ms:>8} ms] level {from} -> {to} at {bpm:.1} BPM")
        }
    }
}

fn record_tick(report: &mut AnalyzeReport, now: f64, tick: &TickReport) {
    if let Some(bpm) = tick.fallback {
        report.fallback_estimates += 1;
        report.last_fallback_bpm = Some(bpm);
    }
    if let Some(thresholds) = tick.calibration {
        report.calibrated_at_secs = Some(now);
        report.thresholds = thresholds;
    }
    if let Some(transition) = tick.transition {
        report.transitions.push(TransitionRecord {
            at_secs: now,
            from: transition.from,
            to: transition.to,
            bpm: transition.bpm,
        });
    }
}

/// Summary of one offline replay through the analysis chain.
#[derive(Debug, Serialize)]
struct AnalyzeReport {
    fixture_id: String,
    duration_secs: f64,
    ticks: u64,
    beats: u64,
    bpm: Option<f32>,
    calibrated: bool,
    calibrated_at_secs: Option<f64>,
    fallback_estimates: u64,
    last_fallback_bpm: Option<f32>,
    thresholds: ThresholdSet,
    level: StepLevel,
    transitions: Vec<TransitionRecord>,
}

#[derive(Debug, Serialize)]
struct TransitionRecord {
    at_secs: f64,
    from: StepLevel,
    to: StepLevel,
    bpm: f32,
}

impl AnalyzeReport {
    fn new(fixture_id: String) -> Self {
        Self {
            fixture_id,
            duration_secs: 0.0,
            ticks: 0,
            beats: 0,
            bpm: None,
            calibrated: false,
            calibrated_at_secs: None,
            fallback_estimates: 0,
            last_fallback_bpm: None,
            thresholds: ThresholdSet::default(),
            level: StepLevel::Idle,
            transitions: Vec::new(),
        }
    }

    fn print_table(&self) {
        println!("Fixture             : {}", self.fixture_id);
        println!(
            "Replay length       : {:.1} s over {} ticks",
            self.duration_secs, self.ticks
        );
        println!("Beats detected      : {}", self.beats);
        match self.bpm {
            Some(bpm) => println!("Tempo estimate      : {bpm:.1} BPM"),
            None => println!("Tempo estimate      : n/a"),
        }
        match self.last_fallback_bpm {
            Some(bpm) => println!(
                "Fallback estimates  : {} (last {bpm:.1} BPM)",
                self.fallback_estimates
            ),
            None => println!("Fallback estimates  : 0"),
        }
        match self.calibrated_at_secs {
            Some(at) => println!("Calibration         : finalized at {at:.1} s"),
            None => println!("Calibration         : still collecting"),
        }
        println!(
            "Thresholds (BPM)    : slow {:.1} / medium {:.1} / fast {:.1} / very fast {:.1}",
            self.thresholds.slow,
            self.thresholds.medium,
            self.thresholds.fast,
            self.thresholds.very_fast
        );
        println!("Final level         : {}", self.level);
        if self.transitions.is_empty() {
            println!("Level transitions   : none");
        } else {
            println!("Level transitions   :");
            for transition in &self.transitions {
                println!(
                    "  - {:>6.1} s  {} -> {} at {:.1} BPM",
                    transition.at_secs, transition.from, transition.to, transition.bpm
                );
            }
        }
    }
}
