//! Snap points
//!
//! Alignment targets the engine settles onto. Targets are opaque handles into a
//! table owned by the host; the resolver only ever sees `{offset, size, align}`
//! measurements supplied through [`SnapSource`].

mod measure;
mod resolver;
mod source;

use serde::{Deserialize, Serialize};

use crate::observe::Subscription;

pub use measure::{measure_points, SnapMeasurer};
pub use resolver::SnapResolver;
pub use source::StaticSnapSource;

/// Which edge of the viewport a target aligns with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapAlign {
    #[default]
    Start,
    Center,
    End,
}

impl std::str::FromStr for SnapAlign {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "start" => Ok(SnapAlign::Start),
            "center" => Ok(SnapAlign::Center),
            "end" => Ok(SnapAlign::End),
            other => Err(crate::Error::Config(format!(
                "unknown snap alignment {other:?} (expected start, center or end)"
            ))),
        }
    }
}

/// How eagerly motion is pulled onto a snap point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapType {
    /// Always settle on the nearest point
    Mandatory,
    /// Settle on the nearest point only within the proximity radius
    #[default]
    Proximity,
}

/// Opaque handle to a host-owned alignment target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SnapId(pub usize);

/// Raw measurement of one target along the scroll axis
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnapTarget {
    pub id: SnapId,
    /// Offset of the target's leading edge from the content origin
    pub offset: f64,
    /// Extent of the target along the axis
    pub size: f64,
    pub align: SnapAlign,
}

/// A measured snap point in canonical coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SnapPoint {
    pub id: SnapId,
    pub position: f64,
    pub align: SnapAlign,
}

/// Diagnostics from the last resolver step
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SnapAnimatorData {
    /// Logical target currently imposed by the resolver
    pub snap_target: Option<f64>,
    /// Canonical position of the nearest point
    pub nearest_canonical: Option<f64>,
    /// Distance to the nearest point; infinite in proximity mode when the
    /// point is outside the radius
    pub dist_to_snap: f64,
    pub active_snap_id: Option<SnapId>,
}

impl Default for SnapAnimatorData {
    fn default() -> Self {
        Self {
            snap_target: None,
            nearest_canonical: None,
            dist_to_snap: f64::INFINITY,
            active_snap_id: None,
        }
    }
}

/// Supplier of snap target measurements
pub trait SnapSource {
    /// Extent of the viewport along the scroll axis
    fn viewport_size(&self) -> f64;

    /// Targets matching `selector`
    fn query(&self, selector: &str) -> Vec<SnapTarget>;

    /// Subscribe to layout changes that invalidate measurements
    ///
    /// Sources without such a facility return `None`; they are then measured on
    /// first use and whenever the viewport size changes.
    fn observe_resize(&self, _on_resize: Box<dyn Fn()>) -> Option<Subscription> {
        None
    }
}
