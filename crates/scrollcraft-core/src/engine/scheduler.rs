//! Frame pacing collaborator
//!
//! A scheduler delivers one frame callback at a time with a monotonically
//! increasing timestamp in milliseconds. Hosts adapt their own clock (display
//! refresh, a timer, a test loop) to this contract.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Callback invoked with the frame timestamp in milliseconds
pub type FrameCallback = Box<dyn FnOnce(f64)>;

/// Identifies a requested frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameHandle(pub u64);

pub trait Scheduler {
    /// Request a frame; the callback runs once on the next frame, never from
    /// within `start` itself
    fn start(&self, callback: FrameCallback) -> FrameHandle;

    /// Cancel a pending frame (`None` cancels whatever is pending)
    fn stop(&self, handle: Option<FrameHandle>);
}

struct ManualQueue {
    clock: Cell<f64>,
    next_handle: Cell<u64>,
    pending: RefCell<Option<(FrameHandle, FrameCallback)>>,
}

/// Scheduler driven explicitly by the host
///
/// Holds at most one pending callback; [`ManualScheduler::tick`] delivers it.
/// Clones share the same queue.
#[derive(Clone)]
pub struct ManualScheduler {
    queue: Rc<ManualQueue>,
}

impl Default for ManualScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self {
            queue: Rc::new(ManualQueue {
                clock: Cell::new(0.0),
                next_handle: Cell::new(0),
                pending: RefCell::new(None),
            }),
        }
    }

    pub fn is_pending(&self) -> bool {
        self.queue.pending.borrow().is_some()
    }

    /// Timestamp of the last delivered frame
    pub fn now(&self) -> f64 {
        self.queue.clock.get()
    }

    /// Deliver the pending frame at `time`; returns false if nothing was pending
    pub fn tick(&self, time: f64) -> bool {
        // Taken out first: the callback usually requests the next frame.
        let pending = self.queue.pending.borrow_mut().take();
        match pending {
            Some((_, callback)) => {
                self.queue.clock.set(time);
                callback(time);
                true
            }
            None => false,
        }
    }

    /// Advance the clock by `dt_ms` and deliver the pending frame
    pub fn advance(&self, dt_ms: f64) -> bool {
        self.tick(self.queue.clock.get() + dt_ms)
    }

    /// Deliver frames `dt_ms` apart until nothing is pending or `max_frames`
    /// have run; returns the number of frames delivered
    pub fn run_until_idle(&self, dt_ms: f64, max_frames: usize) -> usize {
        let mut frames = 0;
        while frames < max_frames && self.advance(dt_ms) {
            frames += 1;
        }
        frames
    }
}

impl Scheduler for ManualScheduler {
    fn start(&self, callback: FrameCallback) -> FrameHandle {
        let handle = FrameHandle(self.queue.next_handle.get());
        self.queue.next_handle.set(handle.0 + 1);
        *self.queue.pending.borrow_mut() = Some((handle, callback));
        handle
    }

    fn stop(&self, handle: Option<FrameHandle>) {
        let mut pending = self.queue.pending.borrow_mut();
        let matches = match (&*pending, handle) {
            (Some(_), None) => true,
            (Some((current, _)), Some(handle)) => *current == handle,
            (None, _) => false,
        };
        if matches {
            *pending = None;
        }
    }
}
