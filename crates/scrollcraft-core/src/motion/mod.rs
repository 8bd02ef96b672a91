//! Motion: how the engine closes the gap between position and target
//!
//! # Layers
//!
//! - `timing` - Pure decay and interpolation math
//! - `exponential` - Frame-rate independent damped approach built on `timing`
//!
//! The snap resolver in [`crate::snap`] wraps any [`Animator`] and overrides
//! its target near alignment points.

pub mod exponential;
pub mod timing;

use std::rc::Rc;

use crate::domain::DomainRuntime;
use crate::snap::SnapAnimatorData;

pub use exponential::ExpAnimator;

/// One step of motion toward a target
///
/// Implementations carry no notion of "running": every call is a pure function
/// of its arguments plus whatever tuning the animator holds.
pub trait Animator {
    /// Advance `current` toward `target` by `dt_ms` milliseconds
    ///
    /// Returns the next position, or `None` once the target has been reached.
    fn step(&mut self, current: f64, dt_ms: f64, target: f64) -> Option<f64>;

    /// Called whenever the engine (re)resolves its domain
    fn bind_domain(&mut self, _domain: Rc<dyn DomainRuntime>) {}

    /// The target the last step actually chased
    ///
    /// Wrappers that redirect motion (snapping) report their override here so
    /// the engine can adopt it.
    fn effective_target(&self, requested: f64) -> f64 {
        requested
    }

    /// Diagnostics from a snap-aware animator
    fn snap_data(&self) -> Option<SnapAnimatorData> {
        None
    }

    /// Drop any subscriptions the animator holds; called once on engine destroy
    fn release(&mut self) {}
}

impl<A: Animator + ?Sized> Animator for Box<A> {
    fn step(&mut self, current: f64, dt_ms: f64, target: f64) -> Option<f64> {
        (**self).step(current, dt_ms, target)
    }

    fn bind_domain(&mut self, domain: Rc<dyn DomainRuntime>) {
        (**self).bind_domain(domain)
    }

    fn effective_target(&self, requested: f64) -> f64 {
        (**self).effective_target(requested)
    }

    fn snap_data(&self) -> Option<SnapAnimatorData> {
        (**self).snap_data()
    }

    fn release(&mut self) {
        (**self).release()
    }
}
