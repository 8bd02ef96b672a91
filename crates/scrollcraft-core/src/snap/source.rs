//! In-memory snap target table
//!
//! Stands in for a layout tree: the host inserts targets under a selector,
//! moves them around and resizes the viewport, and observers are told about it.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::{Rc, Weak};

use super::{SnapAlign, SnapId, SnapSource, SnapTarget};
use crate::observe::{isolated, Subscription};

struct Table {
    viewport: Cell<f64>,
    next_id: Cell<usize>,
    targets: RefCell<BTreeMap<String, Vec<SnapTarget>>>,
    next_listener: Cell<u64>,
    listeners: RefCell<Vec<(u64, Rc<dyn Fn()>)>>,
}

/// Shared handle to an in-memory snap table
#[derive(Clone)]
pub struct StaticSnapSource {
    table: Rc<Table>,
}

impl StaticSnapSource {
    pub fn new(viewport_size: f64) -> Self {
        Self {
            table: Rc::new(Table {
                viewport: Cell::new(viewport_size),
                next_id: Cell::new(0),
                targets: RefCell::new(BTreeMap::new()),
                next_listener: Cell::new(0),
                listeners: RefCell::new(Vec::new()),
            }),
        }
    }

    /// Add a target under `selector` and return its handle
    pub fn insert(&self, selector: &str, offset: f64, size: f64, align: SnapAlign) -> SnapId {
        let id = SnapId(self.table.next_id.get());
        self.table.next_id.set(id.0 + 1);
        self.table
            .targets
            .borrow_mut()
            .entry(selector.to_string())
            .or_default()
            .push(SnapTarget {
                id,
                offset,
                size,
                align,
            });
        self.notify();
        id
    }

    /// Move or resize an existing target; returns false for unknown handles
    pub fn update(&self, id: SnapId, offset: f64, size: f64) -> bool {
        let found = {
            let mut targets = self.table.targets.borrow_mut();
            match targets.values_mut().flatten().find(|t| t.id == id) {
                Some(target) => {
                    target.offset = offset;
                    target.size = size;
                    true
                }
                None => false,
            }
        };
        if found {
            self.notify();
        }
        found
    }

    pub fn remove(&self, id: SnapId) -> bool {
        let removed = {
            let mut targets = self.table.targets.borrow_mut();
            let mut removed = false;
            for list in targets.values_mut() {
                let before = list.len();
                list.retain(|t| t.id != id);
                removed |= list.len() != before;
            }
            removed
        };
        if removed {
            self.notify();
        }
        removed
    }

    /// Resize observers currently registered
    pub fn listener_count(&self) -> usize {
        self.table.listeners.borrow().len()
    }

    pub fn set_viewport_size(&self, size: f64) {
        if self.table.viewport.get() != size {
            self.table.viewport.set(size);
            self.notify();
        }
    }

    fn notify(&self) {
        let listeners: Vec<Rc<dyn Fn()>> = self
            .table
            .listeners
            .borrow()
            .iter()
            .map(|(_, l)| l.clone())
            .collect();
        for listener in listeners {
            isolated("snap resize listener", || listener());
        }
    }
}

impl SnapSource for StaticSnapSource {
    fn viewport_size(&self) -> f64 {
        self.table.viewport.get()
    }

    fn query(&self, selector: &str) -> Vec<SnapTarget> {
        self.table
            .targets
            .borrow()
            .get(selector)
            .cloned()
            .unwrap_or_default()
    }

    fn observe_resize(&self, on_resize: Box<dyn Fn()>) -> Option<Subscription> {
        let id = self.table.next_listener.get();
        self.table.next_listener.set(id + 1);
        self.table
            .listeners
            .borrow_mut()
            .push((id, Rc::from(on_resize)));

        let weak: Weak<Table> = Rc::downgrade(&self.table);
        Some(Subscription::new(move || {
            if let Some(table) = weak.upgrade() {
                table.listeners.borrow_mut().retain(|(lid, _)| *lid != id);
            }
        }))
    }
}
