//! Display surface collaborator
//!
//! The engine never touches a real surface; it reads and writes positions
//! through [`ScrollDriver`]. [`MemoryDriver`] is a headless implementation for
//! simulations and tests.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use crate::domain::DomainDescriptor;
use crate::observe::{isolated, Subscription};

/// How a write should reach the surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WriteOptions {
    /// Delegate to the surface's own scrolling instead of an immediate write
    pub native: bool,
    /// With `native`, ask for a smooth transition
    pub smooth: bool,
}

/// Read/write binding to a scrollable surface
pub trait ScrollDriver {
    /// Current position of the surface
    fn read(&self) -> f64;

    /// Move the surface; must not be reported back through `on_user_scroll`
    fn write(&self, position: f64, options: WriteOptions);

    /// Natural extent of the surface (scroll size minus viewport size)
    fn limit(&self) -> f64;

    /// Domain override; `None` means bounded by [`ScrollDriver::limit`]
    fn domain(&self) -> Option<DomainDescriptor> {
        None
    }

    /// Subscribe to positions changed by the user rather than the engine
    fn on_user_scroll(&self, callback: Box<dyn Fn(f64)>) -> Subscription;
}

struct MemorySurface {
    position: Cell<f64>,
    limit: Cell<f64>,
    domain: Cell<Option<DomainDescriptor>>,
    writes: Cell<usize>,
    next_id: Cell<u64>,
    subscribers: RefCell<Vec<(u64, Rc<dyn Fn(f64)>)>>,
}

/// In-memory surface; clones share the same state
#[derive(Clone)]
pub struct MemoryDriver {
    surface: Rc<MemorySurface>,
}

impl MemoryDriver {
    pub fn new(limit: f64) -> Self {
        Self {
            surface: Rc::new(MemorySurface {
                position: Cell::new(0.0),
                limit: Cell::new(limit),
                domain: Cell::new(None),
                writes: Cell::new(0),
                next_id: Cell::new(0),
                subscribers: RefCell::new(Vec::new()),
            }),
        }
    }

    pub fn with_domain(self, domain: DomainDescriptor) -> Self {
        self.surface.domain.set(Some(domain));
        self
    }

    pub fn with_position(self, position: f64) -> Self {
        self.surface.position.set(position);
        self
    }

    pub fn position(&self) -> f64 {
        self.surface.position.get()
    }

    pub fn set_limit(&self, limit: f64) {
        self.surface.limit.set(limit);
    }

    pub fn set_domain(&self, domain: Option<DomainDescriptor>) {
        self.surface.domain.set(domain);
    }

    /// Number of writes the engine made
    pub fn write_count(&self) -> usize {
        self.surface.writes.get()
    }

    /// Move the surface as a user would and notify subscribers
    pub fn simulate_user_scroll(&self, position: f64) {
        self.surface.position.set(position);
        let subscribers: Vec<Rc<dyn Fn(f64)>> = self
            .surface
            .subscribers
            .borrow()
            .iter()
            .map(|(_, cb)| cb.clone())
            .collect();
        for callback in subscribers {
            isolated("user scroll subscriber", || callback(position));
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.surface.subscribers.borrow().len()
    }
}

impl ScrollDriver for MemoryDriver {
    fn read(&self) -> f64 {
        self.surface.position.get()
    }

    fn write(&self, position: f64, _options: WriteOptions) {
        self.surface.position.set(position);
        self.surface.writes.set(self.surface.writes.get() + 1);
    }

    fn limit(&self) -> f64 {
        self.surface.limit.get()
    }

    fn domain(&self) -> Option<DomainDescriptor> {
        self.surface.domain.get()
    }

    fn on_user_scroll(&self, callback: Box<dyn Fn(f64)>) -> Subscription {
        let id = self.surface.next_id.get();
        self.surface.next_id.set(id + 1);
        self.surface
            .subscribers
            .borrow_mut()
            .push((id, Rc::from(callback)));

        let weak: Weak<MemorySurface> = Rc::downgrade(&self.surface);
        Subscription::new(move || {
            if let Some(surface) = weak.upgrade() {
                surface.subscribers.borrow_mut().retain(|(sid, _)| *sid != id);
            }
        })
    }
}
