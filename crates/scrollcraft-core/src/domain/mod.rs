//! Scroll domain runtime
//!
//! A domain describes the coordinate space a scroll position lives in and owns
//! every piece of numeric algebra the engine needs: clamping, wrap-around,
//! shortest-arc deltas and revolution alignment.
//!
//! # Coordinates
//!
//! - **canonical**: the value reported to the driver and observers. Always inside
//!   the domain's displayable range.
//! - **logical**: the value the animator steps through. Under circular kinds it
//!   may sit any whole number of periods away from its canonical value, which is
//!   what keeps motion continuous across the wrap edge.
//!
//! One runtime exists per domain kind; the kind is chosen once by
//! [`create_domain_runtime`] and never branched on afterwards.

use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use tracing::warn;

mod circular;
mod linear;

pub use circular::{CircularDomain, CircularEndDomain};
pub use linear::{AllUnboundedDomain, BoundedDomain, EndUnboundedDomain};

/// The shape of a scroll domain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DomainKind {
    /// Clamped to `[min, max]`
    #[default]
    Bounded,
    /// Clamped below at `min`, open above
    EndUnbounded,
    /// No clamping at all
    AllUnbounded,
    /// Wraps every `period` units in both directions
    #[serde(alias = "circular")]
    CircularUnbounded,
    /// Hard wall at `min`, wraps only at the far edge
    CircularEndUnbounded,
}

impl DomainKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DomainKind::Bounded => "bounded",
            DomainKind::EndUnbounded => "end-unbounded",
            DomainKind::AllUnbounded => "all-unbounded",
            DomainKind::CircularUnbounded => "circular-unbounded",
            DomainKind::CircularEndUnbounded => "circular-end-unbounded",
        }
    }
}

impl std::str::FromStr for DomainKind {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bounded" => Ok(DomainKind::Bounded),
            "end-unbounded" => Ok(DomainKind::EndUnbounded),
            "all-unbounded" => Ok(DomainKind::AllUnbounded),
            "circular" | "circular-unbounded" => Ok(DomainKind::CircularUnbounded),
            "circular-end-unbounded" => Ok(DomainKind::CircularEndUnbounded),
            other => Err(crate::Error::Config(format!("unknown domain kind {other:?}"))),
        }
    }
}

impl fmt::Display for DomainKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Domain configuration as supplied by a driver or a config file
///
/// Unset `max`/`period` values fall back to the driver's natural limit when the
/// runtime is created.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DomainDescriptor {
    #[serde(default)]
    pub kind: DomainKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period: Option<f64>,
}

impl DomainDescriptor {
    pub fn bounded(min: f64, max: f64) -> Self {
        Self {
            kind: DomainKind::Bounded,
            min: Some(min),
            max: Some(max),
            period: None,
        }
    }

    pub fn end_unbounded(min: f64) -> Self {
        Self {
            kind: DomainKind::EndUnbounded,
            min: Some(min),
            ..Default::default()
        }
    }

    pub fn all_unbounded() -> Self {
        Self {
            kind: DomainKind::AllUnbounded,
            ..Default::default()
        }
    }

    pub fn circular(period: f64) -> Self {
        Self {
            kind: DomainKind::CircularUnbounded,
            period: Some(period),
            ..Default::default()
        }
    }

    pub fn circular_end(min: f64, period: f64) -> Self {
        Self {
            kind: DomainKind::CircularEndUnbounded,
            min: Some(min),
            period: Some(period),
            ..Default::default()
        }
    }

    pub fn with_min(mut self, min: f64) -> Self {
        self.min = Some(min);
        self
    }
}

/// Direction of travel along the scroll axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Backward,
    #[default]
    Still,
    Forward,
}

impl Direction {
    pub fn from_delta(delta: f64) -> Self {
        if delta > 0.0 {
            Direction::Forward
        } else if delta < 0.0 {
            Direction::Backward
        } else {
            Direction::Still
        }
    }

    /// -1, 0 or 1
    pub fn signum(self) -> i8 {
        match self {
            Direction::Backward => -1,
            Direction::Still => 0,
            Direction::Forward => 1,
        }
    }
}

/// Result of projecting a desired position or integrating an impulse
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    /// Internal logical target, possibly several periods away from `canonical`
    pub target: f64,
    /// Position reported externally
    pub canonical: f64,
}

/// Result of mapping an animator step back into the domain
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MappedPosition {
    pub canonical: f64,
    pub logical: f64,
}

/// Per-kind domain algebra
///
/// Implementations are pure: every method is a function of its arguments and
/// the values captured at construction.
pub trait DomainRuntime: fmt::Debug {
    fn kind(&self) -> DomainKind;

    /// Lower edge of the domain
    fn min(&self) -> f64;

    /// Size of the domain: range for bounded, period for circular kinds,
    /// `None` when unbounded
    fn limit(&self) -> Option<f64>;

    /// Signed difference between two canonical positions. Circular kinds return
    /// the shortest arc in `(-period/2, period/2]`.
    fn delta(&self, current: f64, previous: f64) -> f64;

    /// Map an arbitrary desired position to a canonical value and a logical
    /// target aligned to `reference`
    fn project_target(&self, desired: f64, reference: f64) -> Projection;

    /// Integrate `impulse` into `current_target`
    fn apply_impulse(
        &self,
        current_target: f64,
        impulse: f64,
        motion_value: f64,
        direction: Direction,
    ) -> Projection;

    /// Convert a raw animator value into the reported canonical position and the
    /// logical value retained for the next frame
    fn map_position(&self, next: f64, current_logical: f64) -> MappedPosition;

    /// Reduce a logical value to its canonical position
    fn canonical_of(&self, logical: f64) -> f64;

    /// Fraction of the domain covered by `canonical`, `None` when unbounded
    fn progress(&self, canonical: f64) -> Option<f64> {
        let limit = self.limit()?;
        if limit <= 0.0 {
            return Some(0.0);
        }
        Some(((canonical - self.min()) / limit).clamp(0.0, 1.0))
    }
}

/// Build the runtime for `descriptor`
///
/// `limit` supplies the driver's natural extent and is consulted only when the
/// descriptor leaves `max` (bounded) or `period` (circular) unset. A missing
/// descriptor means "bounded by the driver limit". Circular kinds without a
/// positive period degrade to their non-circular sibling.
pub fn create_domain_runtime<L>(descriptor: Option<DomainDescriptor>, limit: L) -> Rc<dyn DomainRuntime>
where
    L: FnOnce() -> f64,
{
    let desc = descriptor.unwrap_or_default();
    let min = finite_or(desc.min.unwrap_or(0.0), 0.0);

    match desc.kind {
        DomainKind::Bounded => {
            let max = desc.max.unwrap_or_else(limit);
            Rc::new(BoundedDomain::new(min, finite_or(max, min)))
        }
        DomainKind::EndUnbounded => Rc::new(EndUnboundedDomain::new(min)),
        DomainKind::AllUnbounded => Rc::new(AllUnboundedDomain::new(min)),
        DomainKind::CircularUnbounded => {
            let period = desc.period.unwrap_or_else(limit);
            match CircularDomain::new(min, period) {
                Some(domain) => Rc::new(domain),
                None => {
                    warn!(period, "Circular domain without a positive period, falling back to all-unbounded");
                    Rc::new(AllUnboundedDomain::new(min))
                }
            }
        }
        DomainKind::CircularEndUnbounded => {
            let period = desc.period.unwrap_or_else(limit);
            match CircularEndDomain::new(min, period) {
                Some(domain) => Rc::new(domain),
                None => {
                    warn!(period, "Circular-end domain without a positive period, falling back to end-unbounded");
                    Rc::new(EndUnboundedDomain::new(min))
                }
            }
        }
    }
}

/// Euclidean remainder normalised to `[0, l)`
#[inline]
pub fn modulo(v: f64, l: f64) -> f64 {
    let r = v.rem_euclid(l);
    // rem_euclid can round up to exactly `l` for tiny negative inputs
    if r >= l {
        0.0
    } else {
        r
    }
}

/// `max(min, min(v, max))`, tolerant of `max < min`
#[inline]
pub fn clamp(min: f64, v: f64, max: f64) -> f64 {
    v.min(max).max(min)
}

/// Non-finite values collapse to `fallback`
#[inline]
pub(crate) fn finite_or(v: f64, fallback: f64) -> f64 {
    if v.is_finite() {
        v
    } else {
        fallback
    }
}

/// Shortest signed arc from `previous` to `current` in `(-period/2, period/2]`
#[inline]
pub(crate) fn shortest_arc(current: f64, previous: f64, period: f64) -> f64 {
    let r = modulo(current - previous, period);
    if r > period / 2.0 {
        r - period
    } else {
        r
    }
}
