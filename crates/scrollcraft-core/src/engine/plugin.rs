//! Engine observers

use serde::{Serialize, Serializer};

use super::ScrollEngine;
use crate::domain::{Direction, DomainKind};

/// Emitted once when a run of the loop comes to rest
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SettleInfo {
    /// Final canonical position
    pub position: f64,
    /// Canonical target the loop settled on
    pub target: f64,
    /// Velocity over the last frame, units per millisecond
    pub velocity: f64,
    #[serde(serialize_with = "direction_sign")]
    pub direction: Direction,
    /// Domain size; `None` when unbounded
    pub limit: Option<f64>,
}

/// Emitted for every frame that moved the position
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FrameInfo {
    /// Canonical position after this frame
    pub current: f64,
    /// Canonical target being chased
    pub target: f64,
    pub velocity: f64,
    #[serde(serialize_with = "direction_sign")]
    pub direction: Direction,
    /// Milliseconds since the previous frame
    pub dt: f64,
    /// Share of the domain covered; `None` when unbounded
    pub progress: Option<f64>,
    pub limit: Option<f64>,
    pub domain: DomainKind,
}

/// Records report direction as -1, 0 or 1
fn direction_sign<S: Serializer>(direction: &Direction, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_i8(direction.signum())
}

/// Observer registered with the engine at build time
///
/// Every hook is optional. Hooks run synchronously in registration order; a
/// panicking hook is logged and skipped.
pub trait ScrollPlugin {
    fn name(&self) -> &str;

    /// Called once after the engine is built
    fn init(&self, _engine: &ScrollEngine) {}

    /// The user moved the surface to `position`
    fn on_user_scroll(&self, _position: f64) {}

    /// The canonical target changed
    fn on_target_change(&self, _target: f64) {}

    fn on_frame(&self, _frame: &FrameInfo) {}

    fn on_settle(&self, _settle: &SettleInfo) {}

    /// Called once when the engine is destroyed
    fn destroy(&self) {}
}
