//! Damped first-order approach
//!
//! Each step closes a time-dependent share of the remaining distance, so the
//! same lerp factor produces the same visual speed at any refresh rate.

use super::timing::{decay_alpha, decay_rate, lerp};
use super::Animator;

/// Default share of the distance closed per 1/60s
pub const DEFAULT_LERP: f64 = 0.1;

/// Default distance under which motion counts as arrived
pub const DEFAULT_SETTLE_EPSILON: f64 = 0.25;

/// Exponential approach animator
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExpAnimator {
    lerp: f64,
    rate: f64,
    settle_epsilon: f64,
}

impl Default for ExpAnimator {
    fn default() -> Self {
        Self {
            lerp: DEFAULT_LERP,
            rate: decay_rate(DEFAULT_LERP),
            settle_epsilon: DEFAULT_SETTLE_EPSILON,
        }
    }
}

impl ExpAnimator {
    /// `lerp` is the fraction of the remaining distance closed per 1/60s and
    /// must lie strictly between 0 and 1
    pub fn new(lerp: f64) -> crate::Result<Self> {
        if !(lerp > 0.0 && lerp < 1.0) {
            return Err(crate::Error::InvalidLerp(lerp));
        }
        Ok(Self {
            lerp,
            rate: decay_rate(lerp),
            settle_epsilon: DEFAULT_SETTLE_EPSILON,
        })
    }

    pub fn with_settle_epsilon(mut self, epsilon: f64) -> Self {
        if epsilon.is_finite() && epsilon > 0.0 {
            self.settle_epsilon = epsilon;
        }
        self
    }

    pub fn from_config(config: &crate::config::EngineConfig) -> crate::Result<Self> {
        Ok(Self::new(config.lerp)?.with_settle_epsilon(config.settle_epsilon))
    }

    pub fn lerp(&self) -> f64 {
        self.lerp
    }

    pub fn settle_epsilon(&self) -> f64 {
        self.settle_epsilon
    }
}

impl Animator for ExpAnimator {
    fn step(&mut self, current: f64, dt_ms: f64, target: f64) -> Option<f64> {
        let next = lerp(current, target, decay_alpha(self.rate, dt_ms));
        if (target - next).abs() < self.settle_epsilon {
            None
        } else {
            Some(next)
        }
    }
}
