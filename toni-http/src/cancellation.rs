//! Shared abort notification for an in-flight request.
//!
//! The transport (or whatever owns the connection) keeps a clone of the
//! [`CancellationSignal`] and fires it when the connection is aborted or the
//! request runs past its deadline. The request holds another clone and hands
//! it explicitly to [`HttpRequest::get_form`](crate::HttpRequest::get_form),
//! the only operation here that suspends.
//!
//! # Examples
//!
//! ```
//! use toni_http::CancellationSignal;
//!
//! let signal = CancellationSignal::new();
//! let observer = signal.clone();
//!
//! assert!(!observer.is_cancelled());
//! signal.cancel();
//! assert!(observer.is_cancelled());
//! ```

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::Notify;

type Callback = Box<dyn FnOnce() + Send>;

/// Cloneable cancellation handle. All clones observe the same state.
#[derive(Clone, Default)]
pub struct CancellationSignal {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    fired: AtomicBool,
    notify: Notify,
    callbacks: Mutex<Vec<Callback>>,
}

impl Inner {
    fn callbacks(&self) -> MutexGuard<'_, Vec<Callback>> {
        self.callbacks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl CancellationSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire the signal. Only the first call has any effect.
    pub fn cancel(&self) {
        if self.inner.fired.swap(true, Ordering::AcqRel) {
            return;
        }

        self.inner.notify.notify_waiters();

        let callbacks = std::mem::take(&mut *self.inner.callbacks());
        for callback in callbacks {
            callback();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.fired.load(Ordering::Acquire)
    }

    /// Run `callback` once when the signal fires, or right away if it
    /// already has.
    pub fn on_cancel<F>(&self, callback: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let mut callbacks = self.inner.callbacks();
        if self.is_cancelled() {
            drop(callbacks);
            callback();
            return;
        }
        callbacks.push(Box::new(callback));
    }

    /// Resolves once the signal has fired.
    pub async fn cancelled(&self) {
        let notified = self.inner.notify.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();

        if self.is_cancelled() {
            return;
        }
        notified.await;
    }
}

impl fmt::Debug for CancellationSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancellationSignal")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
