//! Snap resolution on top of an animator
//!
//! The resolver lets the wrapped animator chase the requested target until
//! motion is settling (target unchanged across frames and nearly reached),
//! then redirects it onto the nearest snap point.
//!
//! Hysteresis: after committing to a point, that point is not committed again
//! until the requested target has moved further than the proximity radius away
//! from it. Without this, scrolling a short way past a point would be pulled
//! back every time motion settled.

use std::rc::Rc;

use tracing::{debug, trace};

use super::{SnapAnimatorData, SnapId, SnapMeasurer, SnapPoint, SnapSource, SnapType};
use crate::config::SnapConfig;
use crate::domain::{AllUnboundedDomain, DomainRuntime};
use crate::motion::Animator;

/// Requested targets closer than this are the same target
const TARGET_EPSILON: f64 = 1e-6;

/// A requested target already this close to a point needs no redirect
const ALIGNED_EPSILON: f64 = 0.5;

enum Points {
    Fixed(Vec<SnapPoint>),
    Measured(SnapMeasurer),
}

#[derive(Debug, Clone, Copy)]
struct Redirect {
    id: SnapId,
    /// Requested target the redirect was made for
    requested: f64,
    /// Logical snap target chased instead
    target: f64,
}

#[derive(Debug, Clone, Copy)]
struct Commit {
    id: SnapId,
    position: f64,
}

#[derive(Debug, Clone, Copy)]
struct Nearest {
    point: SnapPoint,
    distance: f64,
}

/// Animator wrapper that settles motion onto snap points
pub struct SnapResolver<A: Animator> {
    inner: A,
    points: Points,
    domain: Rc<dyn DomainRuntime>,
    snap_type: SnapType,
    proximity: f64,
    settle_factor: f64,
    previous_request: Option<f64>,
    redirect: Option<Redirect>,
    committed: Option<Commit>,
    data: SnapAnimatorData,
}

impl<A: Animator> SnapResolver<A> {
    /// Resolve against targets measured from `source`
    pub fn new(inner: A, source: Rc<dyn SnapSource>, config: &SnapConfig) -> Self {
        let measurer = SnapMeasurer::new(source, config.selector.clone());
        Self::with_points_source(inner, Points::Measured(measurer), config)
    }

    /// Resolve against a fixed list of canonical points
    pub fn with_points(inner: A, mut points: Vec<SnapPoint>, config: &SnapConfig) -> Self {
        points.sort_by(|a, b| a.position.total_cmp(&b.position));
        Self::with_points_source(inner, Points::Fixed(points), config)
    }

    fn with_points_source(inner: A, points: Points, config: &SnapConfig) -> Self {
        Self {
            inner,
            points,
            domain: Rc::new(AllUnboundedDomain::new(0.0)),
            snap_type: config.snap_type,
            proximity: config.proximity.max(0.0),
            settle_factor: config.settle_factor.clamp(0.0, 1.0),
            previous_request: None,
            redirect: None,
            committed: None,
            data: SnapAnimatorData::default(),
        }
    }

    /// Distance to target under which motion counts as settling
    pub fn settle_threshold(&self) -> f64 {
        self.proximity * self.settle_factor
    }

    /// Snap points as of the last measurement
    pub fn points(&mut self) -> Vec<SnapPoint> {
        self.current_points().to_vec()
    }

    /// Drop cached measurements
    pub fn invalidate(&self) {
        if let Points::Measured(measurer) = &self.points {
            measurer.invalidate();
        }
    }

    fn current_points(&mut self) -> &[SnapPoint] {
        match &mut self.points {
            Points::Fixed(points) => points.as_slice(),
            Points::Measured(measurer) => measurer.points(self.domain.as_ref()),
        }
    }

    /// Nearest point to `position` by domain distance, optionally skipping one
    fn nearest(&self, points: &[SnapPoint], position: f64, skip: Option<SnapId>) -> Option<Nearest> {
        points
            .iter()
            .filter(|p| Some(p.id) != skip)
            .map(|p| Nearest {
                point: *p,
                distance: self.domain.delta(p.position, position).abs(),
            })
            .min_by(|a, b| a.distance.total_cmp(&b.distance))
    }

    fn qualifies(&self, candidate: &Nearest) -> bool {
        match self.snap_type {
            SnapType::Mandatory => true,
            SnapType::Proximity => candidate.distance < self.proximity,
        }
    }

    fn commit(&mut self, candidate: Nearest, requested: f64, current: f64) -> f64 {
        let target = self.domain.project_target(candidate.point.position, current).target;
        debug!(
            id = candidate.point.id.0,
            position = candidate.point.position,
            target,
            "Committing snap"
        );
        self.redirect = Some(Redirect {
            id: candidate.point.id,
            requested,
            target,
        });
        self.committed = Some(Commit {
            id: candidate.point.id,
            position: candidate.point.position,
        });
        target
    }
}

impl<A: Animator> Animator for SnapResolver<A> {
    fn step(&mut self, current: f64, dt_ms: f64, target: f64) -> Option<f64> {
        let points = self.current_points().to_vec();
        if points.is_empty() {
            self.redirect = None;
            self.data = SnapAnimatorData::default();
            return self.inner.step(current, dt_ms, target);
        }

        let unchanged = self
            .previous_request
            .is_some_and(|previous| (previous - target).abs() < TARGET_EPSILON);
        self.previous_request = Some(target);

        if !unchanged {
            if let Some(redirect) = self.redirect.take() {
                trace!(id = redirect.id.0, "Requested target moved; dropping snap redirect");
            }
        }

        let requested = self.domain.canonical_of(target);

        if let Some(commit) = self.committed {
            if self.domain.delta(requested, commit.position).abs() > self.proximity {
                debug!(id = commit.id.0, "Left committed snap point; hysteresis released");
                self.committed = None;
            }
        }

        let nearest = self.nearest(&points, requested, None);
        let aligned = nearest.is_some_and(|n| n.distance <= ALIGNED_EPSILON);
        let candidate = self
            .nearest(&points, requested, self.committed.map(|c| c.id))
            .filter(|c| self.qualifies(c));

        let settling =
            unchanged && (current - target).abs() < self.settle_threshold().max(ALIGNED_EPSILON);

        let mut chase = match self.redirect {
            Some(redirect) => redirect.target,
            None => target,
        };

        if self.redirect.is_none() && settling && !aligned {
            if let Some(candidate) = candidate {
                chase = self.commit(candidate, target, current);
            }
        }

        let mut next = self.inner.step(current, dt_ms, chase);

        // Motion came to rest on the requested target within a single step:
        // that is settling too.
        if next.is_none() && self.redirect.is_none() && !aligned {
            if let Some(candidate) = candidate {
                chase = self.commit(candidate, target, current);
                next = self.inner.step(current, dt_ms, chase);
            }
        }

        self.data = SnapAnimatorData {
            snap_target: self.redirect.map(|r| r.target),
            nearest_canonical: nearest.map(|n| n.point.position),
            dist_to_snap: match (nearest, self.snap_type) {
                (Some(n), SnapType::Proximity) if n.distance > self.proximity => f64::INFINITY,
                (Some(n), _) => n.distance,
                (None, _) => f64::INFINITY,
            },
            active_snap_id: self.redirect.map(|r| r.id),
        };

        next
    }

    fn bind_domain(&mut self, domain: Rc<dyn DomainRuntime>) {
        self.domain = domain.clone();
        self.invalidate();
        self.redirect = None;
        self.inner.bind_domain(domain);
    }

    fn effective_target(&self, requested: f64) -> f64 {
        match self.redirect {
            Some(redirect) if (redirect.requested - requested).abs() < TARGET_EPSILON => {
                redirect.target
            }
            _ => requested,
        }
    }

    fn snap_data(&self) -> Option<SnapAnimatorData> {
        Some(self.data)
    }

    fn release(&mut self) {
        if let Points::Measured(measurer) = &mut self.points {
            measurer.release();
        }
        self.inner.release();
    }
}
