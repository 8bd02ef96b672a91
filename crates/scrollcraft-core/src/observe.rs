//! Listener plumbing shared by the signal and the engine
//!
//! Observers are isolated from each other: a listener that panics is logged and
//! skipped, and the remaining listeners (and the frame loop) carry on.

use std::panic::{self, AssertUnwindSafe};

use tracing::warn;

/// Handle returned by every `on_*`/`subscribe` style registration
///
/// Dropping the handle leaves the listener registered; call
/// [`Subscription::unsubscribe`] to remove it.
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    pub fn new(cancel: impl FnOnce() + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    pub fn unsubscribe(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

/// Run one observer callback, containing any panic it raises
///
/// Returns `false` when the callback panicked.
pub(crate) fn isolated<F: FnOnce()>(observer: &str, f: F) -> bool {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(()) => true,
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "non-string panic payload".to_string());
            warn!(observer, %message, "Observer panicked; continuing with remaining observers");
            false
        }
    }
}
