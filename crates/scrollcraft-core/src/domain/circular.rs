//! Wrapping domains
//!
//! Both kinds keep a continuous logical coordinate and only reduce to the
//! canonical range when reporting. The revolution count lives in the logical
//! value itself: `logical - canonical` is always a whole number of periods.

use super::{
    finite_or, modulo, shortest_arc, Direction, DomainKind, DomainRuntime, MappedPosition,
    Projection,
};

/// Wraps every `period` units in both directions
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CircularDomain {
    min: f64,
    period: f64,
}

impl CircularDomain {
    /// `None` unless `period` is finite and positive
    pub fn new(min: f64, period: f64) -> Option<Self> {
        (period.is_finite() && period > 0.0).then_some(Self { min, period })
    }

    #[inline]
    fn wrap(&self, v: f64) -> f64 {
        self.min + modulo(v - self.min, self.period)
    }

    /// The value congruent to `v` that lies nearest `reference`
    #[inline]
    fn align(&self, v: f64, reference: f64) -> f64 {
        let revolutions = ((reference - v) / self.period).round();
        v + revolutions * self.period
    }
}

impl DomainRuntime for CircularDomain {
    fn kind(&self) -> DomainKind {
        DomainKind::CircularUnbounded
    }

    fn min(&self) -> f64 {
        self.min
    }

    fn limit(&self) -> Option<f64> {
        Some(self.period)
    }

    fn delta(&self, current: f64, previous: f64) -> f64 {
        shortest_arc(current, previous, self.period)
    }

    fn project_target(&self, desired: f64, reference: f64) -> Projection {
        let canonical = self.wrap(finite_or(desired, self.min));
        let target = self.align(canonical, finite_or(reference, canonical));
        Projection { target, canonical }
    }

    fn apply_impulse(
        &self,
        current_target: f64,
        impulse: f64,
        motion_value: f64,
        _direction: Direction,
    ) -> Projection {
        let raw = finite_or(current_target + impulse, self.min);
        let target = self.align(raw, finite_or(motion_value, raw));
        Projection {
            target,
            canonical: self.wrap(target),
        }
    }

    fn map_position(&self, next: f64, current_logical: f64) -> MappedPosition {
        let next = finite_or(next, self.min);
        let logical = self.align(next, finite_or(current_logical, next));
        MappedPosition {
            canonical: self.wrap(logical),
            logical,
        }
    }

    fn canonical_of(&self, logical: f64) -> f64 {
        self.wrap(finite_or(logical, self.min))
    }
}

/// Hard wall at `min`, wraps only past the far edge
///
/// In logical coordinates the wall repeats at `min + k * period`: once motion
/// has wrapped forward, backward travel stops at the wrapped wall instead of
/// crossing back over the far edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CircularEndDomain {
    min: f64,
    period: f64,
}

impl CircularEndDomain {
    /// `None` unless `period` is finite and positive
    pub fn new(min: f64, period: f64) -> Option<Self> {
        (period.is_finite() && period > 0.0).then_some(Self { min, period })
    }

    #[inline]
    fn wrap(&self, v: f64) -> f64 {
        if v <= self.min {
            return self.min;
        }
        self.min + modulo(v - self.min, self.period)
    }

    /// Logical position of the wall for the revolution containing `v`
    #[inline]
    fn wall_for(&self, v: f64) -> f64 {
        let revolutions = ((v.max(self.min) - self.min) / self.period).floor();
        self.min + revolutions * self.period
    }

    /// The value congruent to `v` nearest `reference`, never behind the wall of
    /// the revolution `reference` sits in
    fn align(&self, v: f64, reference: f64) -> f64 {
        let base = v.max(self.min);
        let wall = self.wall_for(reference);
        let mut aligned = base + ((reference - base) / self.period).round() * self.period;
        if aligned < wall {
            aligned += ((wall - aligned) / self.period).ceil() * self.period;
        }
        aligned
    }
}

impl DomainRuntime for CircularEndDomain {
    fn kind(&self) -> DomainKind {
        DomainKind::CircularEndUnbounded
    }

    fn min(&self) -> f64 {
        self.min
    }

    fn limit(&self) -> Option<f64> {
        Some(self.period)
    }

    fn delta(&self, current: f64, previous: f64) -> f64 {
        shortest_arc(current, previous, self.period)
    }

    fn project_target(&self, desired: f64, reference: f64) -> Projection {
        let canonical = self.wrap(finite_or(desired, self.min));
        let target = self.align(canonical, finite_or(reference, canonical));
        Projection { target, canonical }
    }

    fn apply_impulse(
        &self,
        current_target: f64,
        impulse: f64,
        motion_value: f64,
        direction: Direction,
    ) -> Projection {
        let raw = finite_or(current_target + impulse, self.min);
        if direction == Direction::Backward {
            // Negative travel is a clamp against the wall the surface is
            // behind, never a wrap. A forward wrap still in flight leaves the
            // target a period ahead of the motion, so the target's wall is
            // not the one to stop at.
            let wall = self.wall_for(finite_or(motion_value, current_target));
            let target = raw.max(wall);
            return Projection {
                target,
                canonical: self.wrap(target),
            };
        }
        let target = self.align(raw, finite_or(motion_value, raw));
        Projection {
            target,
            canonical: self.wrap(target),
        }
    }

    fn map_position(&self, next: f64, _current_logical: f64) -> MappedPosition {
        let logical = finite_or(next, self.min).max(self.min);
        MappedPosition {
            canonical: self.wrap(logical),
            logical,
        }
    }

    fn canonical_of(&self, logical: f64) -> f64 {
        self.wrap(finite_or(logical, self.min))
    }
}
