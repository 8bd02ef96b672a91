//! Engine loop
//!
//! # Architecture
//!
//! ```text
//! scroll_to / apply_impulse ─┐
//!                            ▼
//!   Scheduler ──frame──► EngineState::frame ──effects──► driver.write
//!       ▲                    │  (domain + animator)         signal.set
//!       └──── reschedule ◄───┘                              plugin hooks
//! ```
//!
//! The engine is Idle (no frame pending) or Running (one frame pending). Each
//! frame folds pending impulses into the target, steps the animator, and either
//! writes the mapped position or settles and goes Idle.
//!
//! State changes happen under a short borrow that produces a list of effects;
//! effects are applied afterwards, so plugins and listeners may call back into
//! the engine from any hook.

mod driver;
mod plugin;
mod scheduler;
mod state;

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use tracing::{debug, warn};

use crate::config::{AppConfig, EngineConfig, SnapConfig};
use crate::domain::{create_domain_runtime, Direction, DomainDescriptor, DomainKind, DomainRuntime};
use crate::motion::{Animator, ExpAnimator};
use crate::observe::{isolated, Subscription};
use crate::signal::{Origin, ScrollSignal};
use crate::snap::{SnapAnimatorData, SnapResolver, SnapSource};
use crate::{Error, Result};

pub use driver::{MemoryDriver, ScrollDriver, WriteOptions};
pub use plugin::{FrameInfo, ScrollPlugin, SettleInfo};
pub use scheduler::{FrameCallback, FrameHandle, ManualScheduler, Scheduler};

use state::{Effect, EngineState};

type ScheduledCallback = Box<dyn FnOnce(f64)>;

struct Shared {
    state: RefCell<EngineState>,
    driver: Rc<dyn ScrollDriver>,
    scheduler: Rc<dyn Scheduler>,
    signal: ScrollSignal,
    plugins: Vec<Rc<dyn ScrollPlugin>>,
    /// Domain set at build time; takes precedence over the driver's
    descriptor: Option<DomainDescriptor>,
    pending: Cell<Option<FrameHandle>>,
    scheduled: RefCell<Vec<ScheduledCallback>>,
    user_scroll: RefCell<Option<Subscription>>,
    listeners: RefCell<Vec<Subscription>>,
    destroyed: Cell<bool>,
}

/// Handle to a running engine; clones refer to the same engine
///
/// Plugins that keep a handle should keep a [`WeakScrollEngine`] instead, or
/// the engine and plugin keep each other alive.
#[derive(Clone)]
pub struct ScrollEngine {
    shared: Rc<Shared>,
}

/// Non-owning engine handle
#[derive(Clone)]
pub struct WeakScrollEngine {
    shared: Weak<Shared>,
}

impl WeakScrollEngine {
    pub fn upgrade(&self) -> Option<ScrollEngine> {
        self.shared.upgrade().map(|shared| ScrollEngine { shared })
    }
}

fn resolve_domain(
    descriptor: Option<DomainDescriptor>,
    driver: &dyn ScrollDriver,
) -> Rc<dyn DomainRuntime> {
    create_domain_runtime(descriptor.or_else(|| driver.domain()), || driver.limit())
}

impl ScrollEngine {
    pub fn builder() -> EngineBuilder {
        EngineBuilder::new()
    }

    /// Animate to `value`, or jump there when `immediate`
    ///
    /// An immediate jump still notifies target change and settle.
    pub fn scroll_to(&self, value: f64, immediate: bool) {
        if self.is_destroyed() {
            debug!(value, "scroll_to on destroyed engine ignored");
            return;
        }
        let mut effects = Vec::new();
        {
            let mut state = self.shared.state.borrow_mut();
            if immediate {
                state.jump(value, &mut effects);
            } else {
                state.retarget(value, &mut effects);
                if state.start() {
                    debug!("Loop started");
                }
            }
        }
        self.apply(effects);
        if !immediate {
            self.request_frame();
        }
    }

    /// Add `delta` to the pending impulse and start the loop if idle
    ///
    /// Impulses arriving before the next frame are summed.
    pub fn apply_impulse(&self, delta: f64) {
        if self.is_destroyed() {
            return;
        }
        if !delta.is_finite() {
            warn!(delta, "Ignoring non-finite impulse");
            return;
        }
        {
            let mut state = self.shared.state.borrow_mut();
            state.accumulate(delta);
            if state.start() {
                debug!("Loop started");
            }
        }
        self.request_frame();
    }

    /// Run `callback` once on the next frame
    pub fn schedule(&self, callback: impl FnOnce(f64) + 'static) {
        if self.is_destroyed() {
            return;
        }
        self.shared.scheduled.borrow_mut().push(Box::new(callback));
        self.request_frame();
    }

    /// Place the engine at `position` without animating or notifying observers
    pub fn seed_initial_position(&self, position: f64) {
        if self.is_destroyed() {
            return;
        }
        let canonical = self.shared.state.borrow_mut().seed(position);
        self.shared.driver.write(canonical, WriteOptions::default());
        self.shared.signal.replace(canonical);
        debug!(position = canonical, "Seeded initial position");
    }

    /// Re-resolve the domain from the driver, keeping the canonical position
    pub fn refresh_domain(&self) {
        if self.is_destroyed() {
            return;
        }
        let domain = resolve_domain(self.shared.descriptor, self.shared.driver.as_ref());
        let kind = domain.kind();
        let mut effects = Vec::new();
        self.shared.state.borrow_mut().rebind(domain, &mut effects);
        debug!(domain = %kind, "Domain refreshed");
        self.apply(effects);
    }

    /// Stop the loop, drop every subscription the engine holds and tear down
    /// plugins; later calls do nothing
    pub fn destroy(&self) {
        if self.shared.destroyed.replace(true) {
            return;
        }
        if let Some(handle) = self.shared.pending.take() {
            self.shared.scheduler.stop(Some(handle));
        }
        {
            let mut state = self.shared.state.borrow_mut();
            state.stop();
            state.animator.release();
        }
        self.shared.scheduled.borrow_mut().clear();

        let user_scroll = self.shared.user_scroll.borrow_mut().take();
        if let Some(subscription) = user_scroll {
            subscription.unsubscribe();
        }
        let listeners: Vec<Subscription> = self.shared.listeners.borrow_mut().drain(..).collect();
        for subscription in listeners {
            subscription.unsubscribe();
        }

        self.notify(|plugin| plugin.destroy());
        debug!("Engine destroyed");
    }

    pub fn is_destroyed(&self) -> bool {
        self.shared.destroyed.get()
    }

    /// Reactive canonical position
    pub fn signal(&self) -> &ScrollSignal {
        &self.shared.signal
    }

    /// Last canonical position written
    pub fn position(&self) -> f64 {
        self.shared.state.borrow().position
    }

    /// Canonical target
    pub fn target(&self) -> f64 {
        self.shared.state.borrow().canonical_target()
    }

    pub fn is_running(&self) -> bool {
        self.shared.state.borrow().running
    }

    pub fn velocity(&self) -> f64 {
        self.shared.state.borrow().velocity
    }

    pub fn direction(&self) -> Direction {
        self.shared.state.borrow().direction
    }

    /// Domain size; `None` when unbounded
    pub fn limit(&self) -> Option<f64> {
        self.shared.state.borrow().domain.limit()
    }

    pub fn domain_kind(&self) -> DomainKind {
        self.shared.state.borrow().domain.kind()
    }

    /// Latest snap diagnostics, when snapping is configured
    pub fn snap_data(&self) -> Option<SnapAnimatorData> {
        self.shared.state.borrow().animator.snap_data()
    }

    pub fn driver(&self) -> Rc<dyn ScrollDriver> {
        self.shared.driver.clone()
    }

    pub fn downgrade(&self) -> WeakScrollEngine {
        WeakScrollEngine {
            shared: Rc::downgrade(&self.shared),
        }
    }

    /// Request a frame unless one is already pending
    fn request_frame(&self) {
        if self.is_destroyed() || self.shared.pending.get().is_some() {
            return;
        }
        let weak = Rc::downgrade(&self.shared);
        let handle = self.shared.scheduler.start(Box::new(move |time| {
            if let Some(shared) = weak.upgrade() {
                ScrollEngine { shared }.run_frame(time);
            }
        }));
        self.shared.pending.set(Some(handle));
    }

    fn run_frame(&self, time: f64) {
        self.shared.pending.set(None);
        if self.is_destroyed() {
            return;
        }

        let scheduled = std::mem::take(&mut *self.shared.scheduled.borrow_mut());
        for callback in scheduled {
            isolated("scheduled callback", || callback(time));
        }

        let mut effects = Vec::new();
        let keep_running = {
            let mut state = self.shared.state.borrow_mut();
            state.running && state.frame(time, &mut effects)
        };
        self.apply(effects);

        if keep_running || !self.shared.scheduled.borrow().is_empty() {
            self.request_frame();
        }
    }

    fn apply(&self, effects: Vec<Effect>) {
        for effect in effects {
            if self.is_destroyed() {
                break;
            }
            match effect {
                Effect::Write(position) => {
                    self.shared.driver.write(position, WriteOptions::default())
                }
                Effect::Signal(value, origin) => {
                    self.shared.signal.set(value, origin);
                }
                Effect::TargetChange(target) => self.notify(|p| p.on_target_change(target)),
                Effect::UserScroll(position) => self.notify(|p| p.on_user_scroll(position)),
                Effect::Frame(frame) => self.notify(|p| p.on_frame(&frame)),
                Effect::Settle(settle) => self.notify(|p| p.on_settle(&settle)),
            }
        }
    }

    fn notify(&self, hook: impl Fn(&dyn ScrollPlugin)) {
        for plugin in &self.shared.plugins {
            isolated(plugin.name(), || hook(plugin.as_ref()));
        }
    }

    fn handle_user_scroll(&self, position: f64) {
        if self.is_destroyed() {
            return;
        }
        let mut effects = Vec::new();
        self.shared
            .state
            .borrow_mut()
            .follow_user(position, &mut effects);
        self.apply(effects);
    }
}

impl std::fmt::Debug for ScrollEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.shared.state.borrow();
        f.debug_struct("ScrollEngine")
            .field("domain", &state.domain.kind())
            .field("position", &state.position)
            .field("target", &state.canonical_target())
            .field("running", &state.running)
            .field("destroyed", &self.shared.destroyed.get())
            .finish()
    }
}

/// Collects collaborators and observers, then builds an initialised engine
#[derive(Default)]
pub struct EngineBuilder {
    driver: Option<Rc<dyn ScrollDriver>>,
    scheduler: Option<Rc<dyn Scheduler>>,
    animator: Option<Box<dyn Animator>>,
    domain: Option<DomainDescriptor>,
    engine: EngineConfig,
    snap_source: Option<Rc<dyn SnapSource>>,
    snap: SnapConfig,
    plugins: Vec<Rc<dyn ScrollPlugin>>,
    listeners: Vec<Box<dyn Fn(f64, Origin)>>,
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn driver<D: ScrollDriver + 'static>(mut self, driver: D) -> Self {
        self.driver = Some(Rc::new(driver));
        self
    }

    pub fn scheduler<S: Scheduler + 'static>(mut self, scheduler: S) -> Self {
        self.scheduler = Some(Rc::new(scheduler));
        self
    }

    /// Replace the default exponential animator
    pub fn animator<A: Animator + 'static>(mut self, animator: A) -> Self {
        self.animator = Some(Box::new(animator));
        self
    }

    /// Domain override; otherwise the driver's, otherwise bounded by its limit
    pub fn domain(mut self, domain: DomainDescriptor) -> Self {
        self.domain = Some(domain);
        self
    }

    pub fn engine_config(mut self, engine: EngineConfig) -> Self {
        self.engine = engine;
        self
    }

    /// Engine tuning, snap settings and domain override from a loaded
    /// configuration
    pub fn config(mut self, config: &AppConfig) -> Self {
        self.engine = config.engine.clone();
        self.snap = config.snap.clone();
        if let Some(domain) = config.domain {
            self.domain = Some(domain);
        }
        self
    }

    /// Where snap targets are measured; snapping still needs `enabled`
    pub fn snap_source<S: SnapSource + 'static>(mut self, source: S) -> Self {
        let source: Rc<dyn SnapSource> = Rc::new(source);
        self.snap_source = Some(source);
        self
    }

    /// Snap source and settings together, replacing any earlier snap settings
    pub fn snap<S: SnapSource + 'static>(self, source: S, config: SnapConfig) -> Self {
        let mut builder = self.snap_source(source);
        builder.snap = config;
        builder
    }

    pub fn plugin(mut self, plugin: Rc<dyn ScrollPlugin>) -> Self {
        self.plugins.push(plugin);
        self
    }

    /// Subscribe to the position signal for the engine's lifetime
    pub fn listener<F>(mut self, listener: F) -> Self
    where
        F: Fn(f64, Origin) + 'static,
    {
        self.listeners.push(Box::new(listener));
        self
    }

    pub fn build(self) -> Result<ScrollEngine> {
        let driver = self.driver.ok_or(Error::MissingCollaborator("driver"))?;
        let scheduler = self
            .scheduler
            .ok_or(Error::MissingCollaborator("scheduler"))?;

        let mut animator: Box<dyn Animator> = match self.animator {
            Some(animator) => animator,
            None => Box::new(ExpAnimator::from_config(&self.engine)?),
        };
        let snap = &self.snap;
        match self.snap_source {
            Some(source) if snap.enabled => {
                if !(snap.proximity.is_finite() && snap.proximity >= 0.0) {
                    return Err(Error::InvalidProximity(snap.proximity));
                }
                debug!(selector = %snap.selector, snap_type = ?snap.snap_type, proximity = snap.proximity, "Snapping enabled");
                animator = Box::new(SnapResolver::new(animator, source, snap));
            }
            Some(_) => debug!("Snap source given but snapping is disabled"),
            None if snap.enabled => warn!("Snapping is enabled but no snap source was given"),
            None => {}
        }

        let domain = resolve_domain(self.domain, driver.as_ref());
        let kind = domain.kind();
        let initial = driver.read();
        let state = EngineState::new(domain, animator, initial);
        let position = state.position;
        if position != initial {
            driver.write(position, WriteOptions::default());
        }

        let signal = ScrollSignal::with_epsilon(position, self.engine.signal_epsilon);
        let listeners = self
            .listeners
            .into_iter()
            .map(|listener| signal.on(listener))
            .collect();

        let engine = ScrollEngine {
            shared: Rc::new(Shared {
                state: RefCell::new(state),
                driver: driver.clone(),
                scheduler,
                signal,
                plugins: self.plugins,
                descriptor: self.domain,
                pending: Cell::new(None),
                scheduled: RefCell::new(Vec::new()),
                user_scroll: RefCell::new(None),
                listeners: RefCell::new(listeners),
                destroyed: Cell::new(false),
            }),
        };

        let weak = engine.downgrade();
        let subscription = driver.on_user_scroll(Box::new(move |position| {
            if let Some(engine) = weak.upgrade() {
                engine.handle_user_scroll(position);
            }
        }));
        *engine.shared.user_scroll.borrow_mut() = Some(subscription);

        for plugin in &engine.shared.plugins {
            isolated(plugin.name(), || plugin.init(&engine));
        }

        debug!(domain = %kind, position, plugins = engine.shared.plugins.len(), "Engine initialised");
        Ok(engine)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snap::{SnapAlign, SnapType, StaticSnapSource};

    #[derive(Default)]
    struct Recorder {
        inits: Cell<usize>,
        destroys: Cell<usize>,
        targets: RefCell<Vec<f64>>,
        users: RefCell<Vec<f64>>,
        frames: RefCell<Vec<FrameInfo>>,
        settles: RefCell<Vec<SettleInfo>>,
    }

    impl ScrollPlugin for Recorder {
        fn name(&self) -> &str {
            "recorder"
        }

        fn init(&self, _engine: &ScrollEngine) {
            self.inits.set(self.inits.get() + 1);
        }

        fn on_user_scroll(&self, position: f64) {
            self.users.borrow_mut().push(position);
        }

        fn on_target_change(&self, target: f64) {
            self.targets.borrow_mut().push(target);
        }

        fn on_frame(&self, frame: &FrameInfo) {
            self.frames.borrow_mut().push(*frame);
        }

        fn on_settle(&self, settle: &SettleInfo) {
            self.settles.borrow_mut().push(*settle);
        }

        fn destroy(&self) {
            self.destroys.set(self.destroys.get() + 1);
        }
    }

    impl Recorder {
        fn last_settle(&self) -> SettleInfo {
            *self.settles.borrow().last().expect("no settle recorded")
        }
    }

    struct Panicker;

    impl ScrollPlugin for Panicker {
        fn name(&self) -> &str {
            "panicker"
        }

        fn on_target_change(&self, _target: f64) {
            panic!("target observer failed");
        }

        fn on_settle(&self, _settle: &SettleInfo) {
            panic!("settle observer failed");
        }
    }

    /// Scrolls once more after the first settle
    #[derive(Default)]
    struct Chain {
        engine: RefCell<Option<WeakScrollEngine>>,
        fired: Cell<bool>,
    }

    impl ScrollPlugin for Chain {
        fn name(&self) -> &str {
            "chain"
        }

        fn init(&self, engine: &ScrollEngine) {
            *self.engine.borrow_mut() = Some(engine.downgrade());
        }

        fn on_settle(&self, _settle: &SettleInfo) {
            if self.fired.replace(true) {
                return;
            }
            if let Some(engine) = self.engine.borrow().as_ref().and_then(|e| e.upgrade()) {
                engine.scroll_to(200.0, false);
            }
        }
    }

    #[derive(Clone, Default)]
    struct CountingScheduler {
        inner: ManualScheduler,
        starts: Rc<Cell<usize>>,
    }

    impl Scheduler for CountingScheduler {
        fn start(&self, callback: FrameCallback) -> FrameHandle {
            self.starts.set(self.starts.get() + 1);
            self.inner.start(callback)
        }

        fn stop(&self, handle: Option<FrameHandle>) {
            self.inner.stop(handle)
        }
    }

    fn build(driver: &MemoryDriver, scheduler: &ManualScheduler, recorder: &Rc<Recorder>) -> ScrollEngine {
        EngineBuilder::new()
            .driver(driver.clone())
            .scheduler(scheduler.clone())
            .plugin(recorder.clone())
            .build()
            .unwrap()
    }

    fn settle(scheduler: &ManualScheduler) -> usize {
        let frames = scheduler.run_until_idle(16.0, 5_000);
        assert!(!scheduler.is_pending(), "loop did not settle");
        frames
    }

    #[test]
    fn test_end_unbounded_immediate_scroll() {
        let driver = MemoryDriver::new(42.0).with_domain(DomainDescriptor::end_unbounded(10.0));
        let scheduler = ManualScheduler::new();
        let recorder = Rc::new(Recorder::default());
        let engine = build(&driver, &scheduler, &recorder);

        engine.scroll_to(5.0, true);
        assert_eq!(engine.position(), 10.0);
        assert_eq!(driver.position(), 10.0);

        engine.scroll_to(500.0, true);
        assert_eq!(driver.position(), 500.0);
        assert_eq!(engine.limit(), None);

        let settle = recorder.last_settle();
        assert_eq!(settle.position, 500.0);
        assert_eq!(settle.limit, None);
        assert_eq!(*recorder.targets.borrow(), vec![10.0, 500.0]);
        assert!(!scheduler.is_pending());
    }

    #[test]
    fn test_circular_impulses_settle_on_wrapped_positions() {
        let driver = MemoryDriver::new(1000.0).with_domain(DomainDescriptor::circular(360.0));
        let scheduler = ManualScheduler::new();
        let recorder = Rc::new(Recorder::default());
        let engine = build(&driver, &scheduler, &recorder);

        engine.apply_impulse(470.0);
        assert!(engine.is_running());
        settle(&scheduler);

        assert_eq!(driver.position(), 110.0);
        assert!(recorder.targets.borrow().contains(&110.0));
        let first = recorder.last_settle();
        assert_eq!(first.position, 110.0);
        assert_eq!(first.limit, Some(360.0));
        assert!(!engine.is_running());

        engine.apply_impulse(-200.0);
        settle(&scheduler);
        assert_eq!(driver.position(), 270.0);
        assert_eq!(recorder.last_settle().position, 270.0);
        for frame in recorder.frames.borrow().iter() {
            assert!((0.0..360.0).contains(&frame.current));
        }
    }

    #[test]
    fn test_circular_end_wall_holds_against_backward_impulses() {
        let driver = MemoryDriver::new(1000.0)
            .with_domain(DomainDescriptor::circular_end(0.0, 360.0))
            .with_position(5.0);
        let scheduler = ManualScheduler::new();
        let recorder = Rc::new(Recorder::default());
        let engine = build(&driver, &scheduler, &recorder);
        assert_eq!(engine.position(), 5.0);

        for delta in [-3.0, -10.0, -50.0, -400.0] {
            engine.apply_impulse(delta);
            settle(&scheduler);
        }

        assert_eq!(driver.position(), 0.0);
        for frame in recorder.frames.borrow().iter() {
            assert!(frame.current >= 0.0 && frame.current <= 5.0, "frame at {}", frame.current);
        }
        for settle in recorder.settles.borrow().iter() {
            assert!(settle.position >= 0.0 && settle.position <= 5.0);
        }
    }

    #[test]
    fn test_circular_end_backward_during_wrap_stays_behind_far_edge() {
        let driver = MemoryDriver::new(1000.0)
            .with_domain(DomainDescriptor::circular_end(0.0, 360.0))
            .with_position(340.0);
        let scheduler = ManualScheduler::new();
        let recorder = Rc::new(Recorder::default());
        let engine = build(&driver, &scheduler, &recorder);

        // Forward toward the far edge; the target has wrapped, motion has not.
        engine.apply_impulse(40.0);
        for _ in 0..4 {
            scheduler.advance(16.0);
        }
        let before = driver.position();
        assert!(before > 340.0 && before < 360.0, "surface at {}", before);
        let seen = recorder.frames.borrow().len();

        engine.apply_impulse(-30.0);
        settle(&scheduler);

        assert_eq!(driver.position(), 350.0);
        assert_eq!(recorder.last_settle().position, 350.0);
        let (low, high) = (before.min(350.0), before.max(350.0));
        for frame in recorder.frames.borrow()[seen..].iter() {
            assert!((0.0..360.0).contains(&frame.current));
            assert!(
                frame.current >= low - 1e-9 && frame.current <= high + 1e-9,
                "frame at {} after backward impulse",
                frame.current
            );
        }
    }

    fn snap_source() -> StaticSnapSource {
        let source = StaticSnapSource::new(800.0);
        source.insert(".snap", 1000.0, 200.0, SnapAlign::Start);
        source
    }

    #[test]
    fn test_disabled_snap_config_leaves_motion_alone() {
        let driver = MemoryDriver::new(5000.0);
        let scheduler = ManualScheduler::new();
        let config = SnapConfig {
            enabled: false,
            proximity: 250.0,
            ..SnapConfig::default()
        };
        let engine = EngineBuilder::new()
            .driver(driver.clone())
            .scheduler(scheduler.clone())
            .snap(snap_source(), config)
            .build()
            .unwrap();

        engine.scroll_to(900.0, false);
        settle(&scheduler);
        assert_eq!(driver.position(), 900.0);
        assert!(engine.snap_data().is_none());
    }

    #[test]
    fn test_app_config_enables_snapping_for_host_source() {
        let mut app = AppConfig::default();
        app.snap.enabled = true;
        app.snap.proximity = 250.0;
        let driver = MemoryDriver::new(5000.0);
        let scheduler = ManualScheduler::new();
        let engine = EngineBuilder::new()
            .config(&app)
            .driver(driver.clone())
            .scheduler(scheduler.clone())
            .snap_source(snap_source())
            .build()
            .unwrap();

        engine.scroll_to(900.0, false);
        settle(&scheduler);
        assert_eq!(driver.position(), 1000.0);
        assert!(engine.snap_data().is_some());

        // Without a source the key alone changes nothing.
        let plain = EngineBuilder::new()
            .config(&app)
            .driver(MemoryDriver::new(5000.0))
            .scheduler(ManualScheduler::new())
            .build()
            .unwrap();
        assert!(plain.snap_data().is_none());
    }

    #[test]
    fn test_destroy_releases_snap_subscription() {
        let source = snap_source();
        let driver = MemoryDriver::new(5000.0);
        let scheduler = ManualScheduler::new();
        let config = SnapConfig {
            enabled: true,
            ..SnapConfig::default()
        };
        let engine = EngineBuilder::new()
            .driver(driver.clone())
            .scheduler(scheduler.clone())
            .snap(source.clone(), config)
            .build()
            .unwrap();

        engine.scroll_to(950.0, false);
        settle(&scheduler);
        assert_eq!(source.listener_count(), 1);

        engine.destroy();
        assert_eq!(source.listener_count(), 0);
        assert_eq!(driver.subscriber_count(), 0);
    }

    #[test]
    fn test_snap_commits_then_releases_past_proximity() {
        let driver = MemoryDriver::new(5000.0);
        let scheduler = ManualScheduler::new();
        let recorder = Rc::new(Recorder::default());
        let source = StaticSnapSource::new(800.0);
        source.insert(".snap", 1000.0, 200.0, SnapAlign::Start);
        let config = SnapConfig {
            enabled: true,
            snap_type: SnapType::Proximity,
            proximity: 250.0,
            ..SnapConfig::default()
        };
        let engine = EngineBuilder::new()
            .driver(driver.clone())
            .scheduler(scheduler.clone())
            .snap(source, config)
            .plugin(recorder.clone())
            .build()
            .unwrap();

        engine.scroll_to(900.0, false);
        settle(&scheduler);
        assert_eq!(driver.position(), 1000.0);
        assert_eq!(recorder.last_settle().target, 1000.0);
        assert_eq!(*recorder.targets.borrow(), vec![900.0, 1000.0]);

        engine.scroll_to(1300.0, false);
        settle(&scheduler);
        assert_eq!(driver.position(), 1300.0);
        let data = engine.snap_data().unwrap();
        assert_eq!(data.nearest_canonical, Some(1000.0));
        assert!(data.dist_to_snap.is_infinite());
        assert!(data.active_snap_id.is_none());
    }

    #[test]
    fn test_signal_reports_origin() {
        let driver = MemoryDriver::new(1000.0);
        let scheduler = ManualScheduler::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let engine = EngineBuilder::new()
            .driver(driver.clone())
            .scheduler(scheduler.clone())
            .listener(move |value, origin| sink.borrow_mut().push((value, origin)))
            .build()
            .unwrap();

        engine.scroll_to(100.0, false);
        settle(&scheduler);
        assert!(seen.borrow().iter().all(|(_, o)| *o == Origin::Program));
        assert_eq!(seen.borrow().last().map(|(v, _)| *v), Some(100.0));
        assert_eq!(engine.signal().value(), 100.0);

        driver.simulate_user_scroll(400.0);
        assert_eq!(seen.borrow().last(), Some(&(400.0, Origin::User)));
    }

    #[test]
    fn test_user_scroll_reprojects_target() {
        let driver = MemoryDriver::new(1000.0);
        let scheduler = ManualScheduler::new();
        let recorder = Rc::new(Recorder::default());
        let engine = build(&driver, &scheduler, &recorder);

        driver.simulate_user_scroll(250.0);
        assert_eq!(engine.position(), 250.0);
        assert_eq!(engine.target(), 250.0);
        assert_eq!(*recorder.users.borrow(), vec![250.0]);
        assert!(!scheduler.is_pending());

        engine.apply_impulse(50.0);
        settle(&scheduler);
        assert_eq!(driver.position(), 300.0);
    }

    #[test]
    fn test_impulses_before_a_frame_are_summed() {
        let driver = MemoryDriver::new(1000.0);
        let scheduler = CountingScheduler::default();
        let recorder = Rc::new(Recorder::default());
        let engine = EngineBuilder::new()
            .driver(driver.clone())
            .scheduler(scheduler.clone())
            .plugin(recorder.clone())
            .build()
            .unwrap();

        engine.apply_impulse(30.0);
        engine.apply_impulse(15.0);
        engine.apply_impulse(5.0);
        assert_eq!(scheduler.starts.get(), 1);

        scheduler.inner.run_until_idle(16.0, 5_000);
        assert_eq!(driver.position(), 50.0);
        assert_eq!(recorder.settles.borrow().len(), 1);
        assert_eq!(*recorder.targets.borrow(), vec![50.0]);
    }

    #[test]
    fn test_observer_panics_are_isolated() {
        let driver = MemoryDriver::new(1000.0);
        let scheduler = ManualScheduler::new();
        let recorder = Rc::new(Recorder::default());
        let engine = EngineBuilder::new()
            .driver(driver.clone())
            .scheduler(scheduler.clone())
            .plugin(Rc::new(Panicker))
            .plugin(recorder.clone())
            .build()
            .unwrap();

        engine.scroll_to(80.0, false);
        settle(&scheduler);
        assert_eq!(driver.position(), 80.0);
        assert_eq!(*recorder.targets.borrow(), vec![80.0]);
        assert_eq!(recorder.settles.borrow().len(), 1);
    }

    #[test]
    fn test_observers_may_reenter() {
        let driver = MemoryDriver::new(1000.0);
        let scheduler = ManualScheduler::new();
        let recorder = Rc::new(Recorder::default());
        let engine = EngineBuilder::new()
            .driver(driver.clone())
            .scheduler(scheduler.clone())
            .plugin(Rc::new(Chain::default()))
            .plugin(recorder.clone())
            .build()
            .unwrap();

        engine.scroll_to(100.0, false);
        settle(&scheduler);
        assert_eq!(driver.position(), 200.0);
        assert_eq!(recorder.settles.borrow().len(), 2);
    }

    #[test]
    fn test_destroy_is_idempotent() {
        let driver = MemoryDriver::new(1000.0);
        let scheduler = ManualScheduler::new();
        let recorder = Rc::new(Recorder::default());
        let engine = EngineBuilder::new()
            .driver(driver.clone())
            .scheduler(scheduler.clone())
            .plugin(recorder.clone())
            .listener(|_, _| {})
            .build()
            .unwrap();
        assert_eq!(recorder.inits.get(), 1);
        assert_eq!(driver.subscriber_count(), 1);

        engine.scroll_to(500.0, false);
        assert!(scheduler.is_pending());

        engine.destroy();
        engine.destroy();
        assert_eq!(recorder.destroys.get(), 1);
        assert!(!scheduler.is_pending());
        assert_eq!(driver.subscriber_count(), 0);
        assert_eq!(engine.signal().listener_count(), 0);
        assert!(!engine.is_running());

        engine.scroll_to(10.0, true);
        engine.apply_impulse(10.0);
        assert_eq!(driver.position(), 0.0);
        assert!(!scheduler.is_pending());
    }

    #[test]
    fn test_immediate_scroll_skips_the_loop() {
        let driver = MemoryDriver::new(1000.0);
        let scheduler = ManualScheduler::new();
        let recorder = Rc::new(Recorder::default());
        let engine = build(&driver, &scheduler, &recorder);

        engine.scroll_to(300.0, true);
        assert!(!scheduler.is_pending());
        assert_eq!(driver.position(), 300.0);
        assert_eq!(*recorder.targets.borrow(), vec![300.0]);
        assert_eq!(recorder.settles.borrow().len(), 1);
        assert!(recorder.frames.borrow().is_empty());
    }

    #[test]
    fn test_scheduled_callback_runs_on_next_frame() {
        let driver = MemoryDriver::new(1000.0);
        let scheduler = ManualScheduler::new();
        let recorder = Rc::new(Recorder::default());
        let engine = build(&driver, &scheduler, &recorder);

        let at = Rc::new(Cell::new(None));
        let slot = at.clone();
        engine.schedule(move |time| slot.set(Some(time)));
        assert!(scheduler.is_pending());

        scheduler.advance(16.0);
        assert_eq!(at.get(), Some(16.0));
        assert!(!scheduler.is_pending());
        assert!(!engine.is_running());
    }

    #[test]
    fn test_seed_does_not_notify() {
        let driver = MemoryDriver::new(1000.0);
        let scheduler = ManualScheduler::new();
        let recorder = Rc::new(Recorder::default());
        let engine = build(&driver, &scheduler, &recorder);

        engine.seed_initial_position(120.0);
        assert_eq!(driver.position(), 120.0);
        assert_eq!(engine.signal().value(), 120.0);
        assert_eq!(engine.target(), 120.0);
        assert!(recorder.targets.borrow().is_empty());
        assert!(recorder.settles.borrow().is_empty());
    }

    #[test]
    fn test_refresh_domain_follows_driver_limit() {
        let driver = MemoryDriver::new(1000.0).with_position(800.0);
        let scheduler = ManualScheduler::new();
        let recorder = Rc::new(Recorder::default());
        let engine = build(&driver, &scheduler, &recorder);
        assert_eq!(engine.limit(), Some(1000.0));

        driver.set_limit(500.0);
        engine.refresh_domain();
        assert_eq!(engine.limit(), Some(500.0));
        assert_eq!(engine.position(), 500.0);
        assert_eq!(driver.position(), 500.0);

        driver.set_domain(Some(DomainDescriptor::circular(360.0)));
        engine.refresh_domain();
        assert_eq!(engine.domain_kind(), DomainKind::CircularUnbounded);
        assert_eq!(engine.position(), 140.0);
    }

    #[test]
    fn test_missing_collaborators() {
        let err = EngineBuilder::new().build().unwrap_err();
        assert!(matches!(err, Error::MissingCollaborator("driver")));

        let err = EngineBuilder::new()
            .driver(MemoryDriver::new(10.0))
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::MissingCollaborator("scheduler")));
    }

    #[test]
    fn test_config_sets_domain_and_rejects_bad_lerp() {
        let mut config = AppConfig::default();
        config.domain = Some(DomainDescriptor::all_unbounded());
        let engine = EngineBuilder::new()
            .driver(MemoryDriver::new(10.0))
            .scheduler(ManualScheduler::new())
            .config(&config)
            .build()
            .unwrap();
        assert_eq!(engine.domain_kind(), DomainKind::AllUnbounded);

        config.engine.lerp = 1.5;
        let err = EngineBuilder::new()
            .driver(MemoryDriver::new(10.0))
            .scheduler(ManualScheduler::new())
            .config(&config)
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::InvalidLerp(_)));
    }
}
