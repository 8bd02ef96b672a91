use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Args;
use serde::Serialize;
use tokio::time::MissedTickBehavior;

use scrollcraft_core::{
    AppConfig, DomainDescriptor, DomainKind, EngineBuilder, FrameInfo, ManualScheduler,
    MemoryDriver, ScrollPlugin, SettleInfo, SnapAlign, SnapType, StaticSnapSource,
};

#[derive(Args, Debug, Clone, Default)]
pub struct SimulateArgs {
    /// Domain kind: bounded, end-unbounded, all-unbounded, circular(-unbounded),
    /// circular-end-unbounded
    #[arg(long)]
    pub kind: Option<DomainKind>,
    /// Lower edge of the domain
    #[arg(long, allow_negative_numbers = true)]
    pub min: Option<f64>,
    /// Upper edge of a bounded domain
    #[arg(long, allow_negative_numbers = true)]
    pub max: Option<f64>,
    /// Period of a circular domain
    #[arg(long)]
    pub period: Option<f64>,
    /// Natural extent of the simulated surface
    #[arg(long, default_value_t = 1000.0)]
    pub limit: f64,
    /// Initial surface position
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub start: f64,
    /// Impulse to apply; repeat to sum several before the first frame
    #[arg(long = "impulse", allow_negative_numbers = true)]
    pub impulses: Vec<f64>,
    /// Position to scroll to
    #[arg(long, allow_negative_numbers = true)]
    pub scroll_to: Option<f64>,
    /// Jump to --scroll-to without animating
    #[arg(long)]
    pub immediate: bool,
    /// Snap target as OFFSET[:ALIGN]; repeatable
    #[arg(long = "snap", value_parser = parse_snap, allow_negative_numbers = true)]
    pub snaps: Vec<SnapFlag>,
    /// Always settle on the nearest snap point
    #[arg(long)]
    pub mandatory: bool,
    /// Proximity radius for snapping
    #[arg(long)]
    pub proximity: Option<f64>,
    /// Viewport size used to align snap targets
    #[arg(long, default_value_t = 0.0)]
    pub viewport: f64,
    /// Print one JSON object per event
    #[arg(long)]
    pub json: bool,
    /// Stop after this many frames even if the engine has not settled
    #[arg(long, default_value_t = 10_000)]
    pub max_frames: usize,
    /// Run frames back to back instead of at the configured frame rate
    #[arg(long)]
    pub fast: bool,
}

/// A snap target given on the command line
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnapFlag {
    pub offset: f64,
    pub align: SnapAlign,
}

fn parse_snap(value: &str) -> Result<SnapFlag> {
    let (offset, align) = match value.split_once(':') {
        Some((offset, align)) => (offset, align.parse::<SnapAlign>()?),
        None => (value, SnapAlign::Start),
    };
    let offset = offset
        .trim()
        .parse::<f64>()
        .with_context(|| format!("invalid snap offset {offset:?}"))?;
    Ok(SnapFlag { offset, align })
}

impl SimulateArgs {
    /// Domain from the flags, else from the configuration
    fn domain(&self, config: &AppConfig) -> Option<DomainDescriptor> {
        let kind = match self.kind {
            Some(kind) => kind,
            None => return config.domain,
        };
        Some(DomainDescriptor {
            kind,
            min: self.min,
            max: self.max,
            period: self.period,
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum Event {
    TargetChange { target: f64 },
    UserScroll { position: f64 },
    Frame(FrameInfo),
    Settle(SettleInfo),
}

/// Prints engine events as they happen
struct Reporter {
    json: bool,
    frames: Cell<usize>,
    settles: Cell<usize>,
}

impl Reporter {
    fn new(json: bool) -> Self {
        Self {
            json,
            frames: Cell::new(0),
            settles: Cell::new(0),
        }
    }

    fn emit(&self, event: Event) {
        if self.json {
            match serde_json::to_string(&event) {
                Ok(line) => println!("{}", line),
                Err(e) => tracing::warn!("Failed to encode event: {}", e),
            }
            return;
        }
        match event {
            Event::TargetChange { target } => println!("target   {:>10.3}", target),
            Event::UserScroll { position } => println!("user     {:>10.3}", position),
            Event::Frame(frame) => {
                let progress = frame
                    .progress
                    .map(|p| format!(" {:5.1}%", p * 100.0))
                    .unwrap_or_default();
                println!(
                    "frame    {:>10.3} -> {:>10.3}  v={:+.3}/ms  dt={:.1}ms{}",
                    frame.current, frame.target, frame.velocity, frame.dt, progress
                );
            }
            Event::Settle(settle) => {
                let limit = settle
                    .limit
                    .map(|l| format!("{}", l))
                    .unwrap_or_else(|| "unbounded".to_string());
                println!(
                    "settled  {:>10.3}  direction {}  limit {}",
                    settle.position,
                    settle.direction.signum(),
                    limit
                );
            }
        }
    }
}

impl ScrollPlugin for Reporter {
    fn name(&self) -> &str {
        "reporter"
    }

    fn on_user_scroll(&self, position: f64) {
        self.emit(Event::UserScroll { position });
    }

    fn on_target_change(&self, target: f64) {
        self.emit(Event::TargetChange { target });
    }

    fn on_frame(&self, frame: &FrameInfo) {
        self.frames.set(self.frames.get() + 1);
        self.emit(Event::Frame(*frame));
    }

    fn on_settle(&self, settle: &SettleInfo) {
        self.settles.set(self.settles.get() + 1);
        self.emit(Event::Settle(*settle));
    }
}

/// Deliver pending frames until the scheduler is idle or `max_frames` ran
///
/// Frames are `interval` apart on the simulated clock; unless `fast`, they are
/// also paced in real time.
pub async fn pump(
    scheduler: &ManualScheduler,
    interval: Duration,
    max_frames: usize,
    fast: bool,
) -> usize {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let step_ms = interval.as_secs_f64() * 1000.0;

    let mut frames = 0;
    while frames < max_frames && scheduler.is_pending() {
        if !fast {
            ticker.tick().await;
        }
        scheduler.advance(step_ms);
        frames += 1;
    }
    frames
}

pub async fn run(config: &AppConfig, args: SimulateArgs) -> Result<()> {
    if args.scroll_to.is_none() && args.impulses.is_empty() {
        bail!("nothing to simulate: pass --scroll-to and/or --impulse");
    }

    let driver = MemoryDriver::new(args.limit).with_position(args.start);
    let scheduler = ManualScheduler::new();
    let reporter = Rc::new(Reporter::new(args.json));

    let mut builder = EngineBuilder::new()
        .config(config)
        .driver(driver.clone())
        .scheduler(scheduler.clone())
        .plugin(reporter.clone());
    if let Some(domain) = args.domain(config) {
        builder = builder.domain(domain);
    }
    if !args.snaps.is_empty() {
        let mut snap = config.snap.clone();
        snap.enabled = true;
        if args.mandatory {
            snap.snap_type = SnapType::Mandatory;
        }
        if let Some(proximity) = args.proximity {
            snap.proximity = proximity;
        }
        let source = StaticSnapSource::new(args.viewport);
        for flag in &args.snaps {
            source.insert(&snap.selector, flag.offset, 0.0, flag.align);
        }
        builder = builder.snap(source, snap);
    }
    let engine = builder.build()?;

    tracing::info!(
        domain = %engine.domain_kind(),
        position = engine.position(),
        snaps = args.snaps.len(),
        "Starting simulation"
    );

    if let Some(value) = args.scroll_to {
        engine.scroll_to(value, args.immediate);
    }
    for impulse in &args.impulses {
        engine.apply_impulse(*impulse);
    }

    let frames = pump(
        &scheduler,
        config.engine.frame_interval(),
        args.max_frames,
        args.fast,
    )
    .await;

    if scheduler.is_pending() {
        tracing::warn!(frames, "Stopped before the engine settled");
    }
    if !args.json {
        println!(
            "\n{} frames, {} writes, {} settle(s), final position {:.3}",
            reporter.frames.get(),
            driver.write_count(),
            reporter.settles.get(),
            driver.position()
        );
    }

    engine.destroy();
    Ok(())
}
