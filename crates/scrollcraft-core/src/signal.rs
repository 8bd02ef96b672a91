//! Reactive scroll position
//!
//! Holds the last known canonical position and pushes changes to listeners,
//! tagged with where the change came from.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use serde::{Deserialize, Serialize};

use crate::observe::{isolated, Subscription};

/// Changes smaller than this are not considered changes
pub const DEFAULT_SIGNAL_EPSILON: f64 = 1e-4;

/// Source of a position change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    /// The user moved the surface directly (scrollbar, keyboard, touch)
    User,
    /// The engine wrote a frame
    Program,
    /// Inertial motion after a gesture
    Momentum,
}

type Listener = Rc<dyn Fn(f64, Origin)>;

struct SignalInner {
    value: Cell<f64>,
    epsilon: f64,
    next_id: Cell<u64>,
    listeners: RefCell<Vec<(u64, Listener)>>,
}

/// Shared handle to a reactive position; clones observe the same value
#[derive(Clone)]
pub struct ScrollSignal {
    inner: Rc<SignalInner>,
}

impl Default for ScrollSignal {
    fn default() -> Self {
        Self::new(0.0)
    }
}

impl ScrollSignal {
    pub fn new(initial: f64) -> Self {
        Self::with_epsilon(initial, DEFAULT_SIGNAL_EPSILON)
    }

    pub fn with_epsilon(initial: f64, epsilon: f64) -> Self {
        Self {
            inner: Rc::new(SignalInner {
                value: Cell::new(initial),
                epsilon: epsilon.abs(),
                next_id: Cell::new(0),
                listeners: RefCell::new(Vec::new()),
            }),
        }
    }

    #[inline]
    pub fn value(&self) -> f64 {
        self.inner.value.get()
    }

    pub fn listener_count(&self) -> usize {
        self.inner.listeners.borrow().len()
    }

    /// Register a listener; listeners run in registration order
    pub fn on<F>(&self, listener: F) -> Subscription
    where
        F: Fn(f64, Origin) + 'static,
    {
        let id = self.inner.next_id.get();
        self.inner.next_id.set(id + 1);
        self.inner
            .listeners
            .borrow_mut()
            .push((id, Rc::new(listener)));

        let weak: Weak<SignalInner> = Rc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.listeners.borrow_mut().retain(|(lid, _)| *lid != id);
            }
        })
    }

    /// Update the value and notify listeners
    ///
    /// A change smaller than the signal epsilon is ignored entirely. Returns
    /// whether listeners were notified.
    pub fn set(&self, value: f64, origin: Origin) -> bool {
        if (value - self.value()).abs() < self.inner.epsilon {
            return false;
        }
        self.inner.value.set(value);

        // Snapshot so listeners may subscribe, unsubscribe or set re-entrantly.
        let listeners: Vec<Listener> = self
            .inner
            .listeners
            .borrow()
            .iter()
            .map(|(_, l)| l.clone())
            .collect();
        for listener in listeners {
            isolated("signal listener", || listener(value, origin));
        }
        true
    }

    /// Overwrite the value without notifying anyone
    pub(crate) fn replace(&self, value: f64) {
        self.inner.value.set(value);
    }
}

impl std::fmt::Debug for ScrollSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScrollSignal")
            .field("value", &self.value())
            .field("listeners", &self.listener_count())
            .finish()
    }
}
