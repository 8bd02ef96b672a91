//! Loop state and the per-frame step
//!
//! Everything here runs under the engine's state borrow, so nothing in this
//! module calls out to the driver, the signal or plugins. Side effects are
//! collected as [`Effect`]s and applied by the engine once the borrow is
//! released; observers may then re-enter the engine freely.

use std::rc::Rc;

use tracing::{debug, trace};

use super::plugin::{FrameInfo, SettleInfo};
use crate::domain::{Direction, DomainRuntime};
use crate::motion::{timing, Animator};
use crate::signal::Origin;

/// Effective targets closer than this to the requested one are not overrides
const OVERRIDE_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) enum Effect {
    Write(f64),
    Signal(f64, Origin),
    TargetChange(f64),
    UserScroll(f64),
    Frame(FrameInfo),
    Settle(SettleInfo),
}

pub(super) struct EngineState {
    pub domain: Rc<dyn DomainRuntime>,
    pub animator: Box<dyn Animator>,
    /// Logical target
    pub target: f64,
    /// Logical position of the motion
    pub motion: f64,
    /// Last canonical position written
    pub position: f64,
    impulse: f64,
    has_impulse: bool,
    last_time: Option<f64>,
    pub velocity: f64,
    pub direction: Direction,
    pub running: bool,
}

impl EngineState {
    pub fn new(domain: Rc<dyn DomainRuntime>, mut animator: Box<dyn Animator>, initial: f64) -> Self {
        animator.bind_domain(domain.clone());
        let projection = domain.project_target(initial, initial);
        Self {
            domain,
            animator,
            target: projection.target,
            motion: projection.target,
            position: projection.canonical,
            impulse: 0.0,
            has_impulse: false,
            last_time: None,
            velocity: 0.0,
            direction: Direction::Still,
            running: false,
        }
    }

    /// Enter Running; the next frame only seeds the clock
    ///
    /// Returns false if a run was already in progress.
    pub fn start(&mut self) -> bool {
        if self.running {
            return false;
        }
        self.running = true;
        self.last_time = None;
        true
    }

    pub fn stop(&mut self) {
        self.running = false;
        self.last_time = None;
        self.impulse = 0.0;
        self.has_impulse = false;
    }

    #[inline]
    pub fn canonical_target(&self) -> f64 {
        self.domain.canonical_of(self.target)
    }

    pub fn accumulate(&mut self, delta: f64) {
        self.impulse += delta;
        self.has_impulse = true;
    }

    /// Aim at `value` without moving; the loop animates towards it
    pub fn retarget(&mut self, value: f64, effects: &mut Vec<Effect>) {
        let projection = self.domain.project_target(value, self.motion);
        self.target = projection.target;
        debug!(target = projection.canonical, "Target changed");
        effects.push(Effect::TargetChange(projection.canonical));
    }

    /// Move to `value` at once, settling without animation
    pub fn jump(&mut self, value: f64, effects: &mut Vec<Effect>) {
        self.retarget(value, effects);
        self.stop();
        self.settle(0.0, effects);
    }

    /// Adopt a position the user set on the surface
    pub fn follow_user(&mut self, position: f64, effects: &mut Vec<Effect>) {
        let projection = self.domain.project_target(position, self.motion);
        self.target = projection.target;
        self.motion = projection.target;
        self.position = projection.canonical;
        self.velocity = 0.0;
        // A pending impulse still has to be folded in from here.
        self.running = self.running && self.has_impulse;
        effects.push(Effect::Signal(projection.canonical, Origin::User));
        effects.push(Effect::UserScroll(position));
    }

    /// Position without animation or notifications; returns the canonical
    /// position to write
    pub fn seed(&mut self, position: f64) -> f64 {
        let projection = self.domain.project_target(position, position);
        self.target = projection.target;
        self.motion = projection.target;
        self.position = projection.canonical;
        self.velocity = 0.0;
        self.direction = Direction::Still;
        projection.canonical
    }

    /// Switch to a new domain, keeping the canonical position and target
    pub fn rebind(&mut self, domain: Rc<dyn DomainRuntime>, effects: &mut Vec<Effect>) {
        let previous_target = self.canonical_target();
        let previous_position = self.position;

        let projection = domain.project_target(self.position, self.position);
        self.motion = projection.target;
        self.position = projection.canonical;
        self.target = domain.project_target(previous_target, self.motion).target;
        self.animator.bind_domain(domain.clone());
        self.domain = domain;

        if (self.position - previous_position).abs() > 0.0 {
            effects.push(Effect::Write(self.position));
            effects.push(Effect::Signal(self.position, Origin::Program));
        }
        let target = self.canonical_target();
        if (target - previous_target).abs() > 0.0 {
            effects.push(Effect::TargetChange(target));
        }
    }

    /// Run one frame at `time` (milliseconds); returns whether the loop keeps
    /// running
    pub fn frame(&mut self, time: f64, effects: &mut Vec<Effect>) -> bool {
        let first = self.last_time.is_none();
        let dt = self.last_time.map_or(0.0, |previous| (time - previous).max(0.0));
        self.last_time = Some(time);

        if self.has_impulse {
            self.fold_impulse(effects);
        }
        if first {
            trace!(time, "Seeded frame clock");
            return true;
        }

        let requested = self.target;
        let next = self.animator.step(self.motion, dt, requested);

        let effective = self.animator.effective_target(requested);
        if (effective - requested).abs() > OVERRIDE_EPSILON {
            self.target = effective;
            let canonical = self.canonical_target();
            debug!(target = canonical, "Animator redirected target");
            effects.push(Effect::TargetChange(canonical));
        }

        match next {
            None => {
                self.settle(dt, effects);
                false
            }
            Some(raw) => {
                self.advance(raw, dt, effects);
                true
            }
        }
    }

    fn fold_impulse(&mut self, effects: &mut Vec<Effect>) {
        let impulse = std::mem::take(&mut self.impulse);
        self.has_impulse = false;

        let direction = Direction::from_delta(impulse);
        let projection = self
            .domain
            .apply_impulse(self.target, impulse, self.motion, direction);
        self.target = projection.target;
        debug!(impulse, target = projection.canonical, "Folded impulse into target");
        effects.push(Effect::TargetChange(projection.canonical));
    }

    fn advance(&mut self, raw: f64, dt: f64, effects: &mut Vec<Effect>) {
        let mapped = self.domain.map_position(raw, self.motion);
        let moved = self.domain.delta(mapped.canonical, self.position);
        self.track(moved, dt);
        self.motion = mapped.logical;
        self.position = mapped.canonical;

        trace!(position = mapped.canonical, dt, "Frame");
        effects.push(Effect::Write(mapped.canonical));
        effects.push(Effect::Signal(mapped.canonical, Origin::Program));
        effects.push(Effect::Frame(FrameInfo {
            current: mapped.canonical,
            target: self.canonical_target(),
            velocity: self.velocity,
            direction: self.direction,
            dt,
            progress: self.domain.progress(mapped.canonical),
            limit: self.domain.limit(),
            domain: self.domain.kind(),
        }));
    }

    fn settle(&mut self, dt: f64, effects: &mut Vec<Effect>) {
        let rounded = self.canonical_target().round();
        let position = self.domain.canonical_of(rounded);
        let moved = self.domain.delta(position, self.position);
        self.track(moved, dt);

        self.target = position;
        self.motion = position;
        self.position = position;
        self.running = false;
        self.last_time = None;

        debug!(position, "Settled");
        effects.push(Effect::Write(position));
        effects.push(Effect::Signal(position, Origin::Program));
        effects.push(Effect::Settle(SettleInfo {
            position,
            target: position,
            velocity: self.velocity,
            direction: self.direction,
            limit: self.domain.limit(),
        }));
    }

    fn track(&mut self, moved: f64, dt: f64) {
        self.velocity = timing::velocity(moved, dt);
        if moved != 0.0 {
            self.direction = Direction::from_delta(moved);
        }
    }
}
