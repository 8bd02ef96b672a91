//! Snap point measurement
//!
//! Turns raw `{offset, size, align}` targets into sorted canonical positions
//! and keeps them cached until the layout changes.

use std::cell::Cell;
use std::rc::Rc;

use tracing::debug;

use super::{SnapAlign, SnapPoint, SnapSource, SnapTarget};
use crate::domain::DomainRuntime;
use crate::observe::Subscription;

/// Scroll position that aligns `target` with the viewport
#[inline]
fn aligned_position(target: &SnapTarget, viewport: f64) -> f64 {
    match target.align {
        SnapAlign::Start => target.offset,
        SnapAlign::Center => target.offset - (viewport - target.size) / 2.0,
        SnapAlign::End => target.offset - (viewport - target.size),
    }
}

/// Measure `targets` into canonical snap points sorted by position
pub fn measure_points(
    targets: &[SnapTarget],
    viewport: f64,
    domain: &dyn DomainRuntime,
) -> Vec<SnapPoint> {
    let mut points: Vec<SnapPoint> = targets
        .iter()
        .filter(|t| t.offset.is_finite() && t.size.is_finite())
        .map(|t| SnapPoint {
            id: t.id,
            position: domain.canonical_of(aligned_position(t, viewport)),
            align: t.align,
        })
        .collect();
    points.sort_by(|a, b| a.position.total_cmp(&b.position));
    points
}

/// Lazily measured, cached snap points for one selector
pub struct SnapMeasurer {
    source: Rc<dyn SnapSource>,
    selector: String,
    points: Vec<SnapPoint>,
    viewport: Option<f64>,
    dirty: Rc<Cell<bool>>,
    resize: Option<Subscription>,
    observing: bool,
}

impl SnapMeasurer {
    pub fn new(source: Rc<dyn SnapSource>, selector: impl Into<String>) -> Self {
        Self {
            source,
            selector: selector.into(),
            points: Vec::new(),
            viewport: None,
            dirty: Rc::new(Cell::new(true)),
            resize: None,
            observing: false,
        }
    }

    /// Force a remeasure on next access
    pub fn invalidate(&self) {
        self.dirty.set(true);
    }

    /// Current points, remeasuring when the viewport changed, a resize was
    /// observed, or nothing is cached
    pub fn points(&mut self, domain: &dyn DomainRuntime) -> &[SnapPoint] {
        if !self.observing {
            self.observing = true;
            let dirty = self.dirty.clone();
            self.resize = self
                .source
                .observe_resize(Box::new(move || dirty.set(true)));
            if self.resize.is_none() {
                debug!(selector = %self.selector, "Snap source has no resize observation; measuring on demand");
            }
        }

        let viewport = self.source.viewport_size();
        let stale = self.dirty.get()
            || self.points.is_empty()
            || self.viewport.map_or(true, |v| v != viewport);
        if stale {
            let targets = self.source.query(&self.selector);
            self.points = measure_points(&targets, viewport, domain);
            self.viewport = Some(viewport);
            self.dirty.set(false);
            debug!(selector = %self.selector, count = self.points.len(), viewport, "Measured snap points");
        }
        &self.points
    }

    /// Stop observing layout changes; later lookups measure on demand
    pub fn release(&mut self) {
        self.observing = true;
        if let Some(sub) = self.resize.take() {
            sub.unsubscribe();
        }
    }
}

impl Drop for SnapMeasurer {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{create_domain_runtime, DomainDescriptor};
    use crate::snap::{SnapId, StaticSnapSource};

    fn target(id: usize, offset: f64, size: f64, align: SnapAlign) -> SnapTarget {
        SnapTarget {
            id: SnapId(id),
            offset,
            size,
            align,
        }
    }

    #[test]
    fn test_alignment_positions() {
        let domain = create_domain_runtime(Some(DomainDescriptor::all_unbounded()), || 0.0);
        let targets = [
            target(0, 1000.0, 200.0, SnapAlign::Start),
            target(1, 1000.0, 200.0, SnapAlign::Center),
            target(2, 1000.0, 200.0, SnapAlign::End),
        ];
        let points = measure_points(&targets, 800.0, domain.as_ref());
        let by_id = |id| points.iter().find(|p| p.id == SnapId(id)).unwrap().position;
        assert_eq!(by_id(0), 1000.0);
        assert_eq!(by_id(1), 700.0);
        assert_eq!(by_id(2), 400.0);
    }

    #[test]
    fn test_points_are_clamped_and_sorted() {
        let domain = create_domain_runtime(Some(DomainDescriptor::bounded(0.0, 500.0)), || 0.0);
        let targets = [
            target(0, 900.0, 10.0, SnapAlign::Start),
            target(1, 100.0, 10.0, SnapAlign::Start),
            target(2, 50.0, 10.0, SnapAlign::End),
        ];
        let points = measure_points(&targets, 300.0, domain.as_ref());
        let positions: Vec<f64> = points.iter().map(|p| p.position).collect();
        assert_eq!(positions, vec![0.0, 100.0, 500.0]);
    }

    #[test]
    fn test_circular_points_wrap() {
        let domain = create_domain_runtime(Some(DomainDescriptor::circular(1000.0)), || 0.0);
        let points = measure_points(&[target(0, 1250.0, 0.0, SnapAlign::Start)], 0.0, domain.as_ref());
        assert_eq!(points[0].position, 250.0);
    }

    #[test]
    fn test_measurer_remeasures_on_layout_change() {
        let domain = create_domain_runtime(Some(DomainDescriptor::all_unbounded()), || 0.0);
        let source = StaticSnapSource::new(800.0);
        let id = source.insert(".snap", 1000.0, 200.0, SnapAlign::Center);
        let mut measurer = SnapMeasurer::new(Rc::new(source.clone()), ".snap");

        assert_eq!(measurer.points(domain.as_ref())[0].position, 700.0);

        source.set_viewport_size(400.0);
        assert_eq!(measurer.points(domain.as_ref())[0].position, 900.0);

        source.update(id, 2000.0, 200.0);
        assert_eq!(measurer.points(domain.as_ref())[0].position, 1900.0);
    }

    /// Layout with no resize notifications
    struct FixedLayout {
        viewport: Cell<f64>,
        queries: Cell<usize>,
        targets: Vec<SnapTarget>,
    }

    impl SnapSource for FixedLayout {
        fn viewport_size(&self) -> f64 {
            self.viewport.get()
        }

        fn query(&self, _selector: &str) -> Vec<SnapTarget> {
            self.queries.set(self.queries.get() + 1);
            self.targets.clone()
        }
    }

    #[test]
    fn test_source_without_resize_measures_on_demand() {
        let domain = create_domain_runtime(Some(DomainDescriptor::all_unbounded()), || 0.0);
        let layout = Rc::new(FixedLayout {
            viewport: Cell::new(800.0),
            queries: Cell::new(0),
            targets: vec![target(0, 1000.0, 200.0, SnapAlign::Center)],
        });
        let mut measurer = SnapMeasurer::new(layout.clone(), ".snap");

        assert_eq!(measurer.points(domain.as_ref())[0].position, 700.0);
        assert_eq!(measurer.points(domain.as_ref())[0].position, 700.0);
        assert_eq!(layout.queries.get(), 1);

        layout.viewport.set(400.0);
        assert_eq!(measurer.points(domain.as_ref())[0].position, 900.0);
        assert_eq!(layout.queries.get(), 2);
    }

    #[test]
    fn test_release_unsubscribes_from_resize() {
        let domain = create_domain_runtime(None, || 1000.0);
        let source = StaticSnapSource::new(100.0);
        source.insert(".snap", 10.0, 0.0, SnapAlign::Start);
        let mut measurer = SnapMeasurer::new(Rc::new(source.clone()), ".snap");

        measurer.points(domain.as_ref());
        assert_eq!(source.listener_count(), 1);

        measurer.release();
        assert_eq!(source.listener_count(), 0);
        measurer.release();
        assert_eq!(measurer.points(domain.as_ref())[0].position, 10.0);
        assert_eq!(source.listener_count(), 0);
    }

    #[test]
    fn test_empty_query_yields_no_points() {
        let domain = create_domain_runtime(None, || 100.0);
        let mut measurer = SnapMeasurer::new(Rc::new(StaticSnapSource::new(10.0)), ".none");
        assert!(measurer.points(domain.as_ref()).is_empty());
    }
}
