//! Non-wrapping domains: bounded, end-unbounded and all-unbounded
//!
//! Logical and canonical coordinates coincide for all three.

use super::{
    clamp, finite_or, Direction, DomainKind, DomainRuntime, MappedPosition, Projection,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundedDomain {
    min: f64,
    max: f64,
}

impl BoundedDomain {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    #[inline]
    fn clamp(&self, v: f64) -> f64 {
        clamp(self.min, finite_or(v, self.min), self.max)
    }
}

impl DomainRuntime for BoundedDomain {
    fn kind(&self) -> DomainKind {
        DomainKind::Bounded
    }

    fn min(&self) -> f64 {
        self.min
    }

    fn limit(&self) -> Option<f64> {
        Some((self.max - self.min).max(0.0))
    }

    fn delta(&self, current: f64, previous: f64) -> f64 {
        current - previous
    }

    fn project_target(&self, desired: f64, _reference: f64) -> Projection {
        let canonical = self.clamp(desired);
        Projection {
            target: canonical,
            canonical,
        }
    }

    fn apply_impulse(
        &self,
        current_target: f64,
        impulse: f64,
        _motion_value: f64,
        _direction: Direction,
    ) -> Projection {
        let next = self.clamp(current_target + impulse);
        Projection {
            target: next,
            canonical: next,
        }
    }

    fn map_position(&self, next: f64, _current_logical: f64) -> MappedPosition {
        let canonical = self.clamp(next);
        MappedPosition {
            canonical,
            logical: canonical,
        }
    }

    fn canonical_of(&self, logical: f64) -> f64 {
        self.clamp(logical)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EndUnboundedDomain {
    min: f64,
}

impl EndUnboundedDomain {
    pub fn new(min: f64) -> Self {
        Self { min }
    }

    #[inline]
    fn clamp(&self, v: f64) -> f64 {
        finite_or(v, self.min).max(self.min)
    }
}

impl DomainRuntime for EndUnboundedDomain {
    fn kind(&self) -> DomainKind {
        DomainKind::EndUnbounded
    }

    fn min(&self) -> f64 {
        self.min
    }

    fn limit(&self) -> Option<f64> {
        None
    }

    fn delta(&self, current: f64, previous: f64) -> f64 {
        current - previous
    }

    fn project_target(&self, desired: f64, _reference: f64) -> Projection {
        let canonical = self.clamp(desired);
        Projection {
            target: canonical,
            canonical,
        }
    }

    fn apply_impulse(
        &self,
        current_target: f64,
        impulse: f64,
        _motion_value: f64,
        _direction: Direction,
    ) -> Projection {
        let next = self.clamp(current_target + impulse);
        Projection {
            target: next,
            canonical: next,
        }
    }

    fn map_position(&self, next: f64, _current_logical: f64) -> MappedPosition {
        let canonical = self.clamp(next);
        MappedPosition {
            canonical,
            logical: canonical,
        }
    }

    fn canonical_of(&self, logical: f64) -> f64 {
        self.clamp(logical)
    }
}

/// Identity domain
///
/// `min` is kept only as the landing value for non-finite input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AllUnboundedDomain {
    min: f64,
}

impl AllUnboundedDomain {
    pub fn new(min: f64) -> Self {
        Self { min }
    }
}

impl DomainRuntime for AllUnboundedDomain {
    fn kind(&self) -> DomainKind {
        DomainKind::AllUnbounded
    }

    fn min(&self) -> f64 {
        self.min
    }

    fn limit(&self) -> Option<f64> {
        None
    }

    fn delta(&self, current: f64, previous: f64) -> f64 {
        current - previous
    }

    fn project_target(&self, desired: f64, _reference: f64) -> Projection {
        let canonical = finite_or(desired, self.min);
        Projection {
            target: canonical,
            canonical,
        }
    }

    fn apply_impulse(
        &self,
        current_target: f64,
        impulse: f64,
        _motion_value: f64,
        _direction: Direction,
    ) -> Projection {
        let next = finite_or(current_target + impulse, self.min);
        Projection {
            target: next,
            canonical: next,
        }
    }

    fn map_position(&self, next: f64, _current_logical: f64) -> MappedPosition {
        let next = finite_or(next, self.min);
        MappedPosition {
            canonical: next,
            logical: next,
        }
    }

    fn canonical_of(&self, logical: f64) -> f64 {
        finite_or(logical, self.min)
    }
}
