#![forbid(unsafe_code)]

//! Observable mutable cells.
//!
//! A [`PropertySubject<T>`] holds a current value and notifies subscribers of
//! every change through its owning scheduler.
//!
//! # Invariants
//!
//! 1. Writing a value equal to the current one is a no-op: no notification.
//! 2. Writing a different value produces exactly one notification per
//!    subscriber, carrying the new value.
//! 3. Subscribing does not replay the current value.
//! 4. Notifications for one subject are serialized and follow write order.
//!
//! # Failure Modes
//!
//! - Calling [`set`](PropertySubject::set) from inside [`with`](PropertySubject::with)
//!   deadlocks: `with` holds the value lock for the closure's duration.

use std::fmt;
use std::sync::{Arc, Mutex};

use bindery_core::{PropertyIdentity, SharedScheduler, Subscription};

use super::channel::Channel;
use crate::sync::lock;

struct PropertyInner<T> {
    identity: PropertyIdentity,
    value: Mutex<T>,
    changes: Channel<T>,
}

/// Observable mutable cell.
///
/// Cloning yields another handle to the **same** subject; see
/// [`ptr_eq`](Self::ptr_eq).
pub struct PropertySubject<T> {
    inner: Arc<PropertyInner<T>>,
}

impl<T> Clone for PropertySubject<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for PropertySubject<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertySubject")
            .field("identity", &self.inner.identity)
            .field("value", &*lock(&self.inner.value))
            .finish()
    }
}

impl<T: Clone + PartialEq + Send + Sync + 'static> PropertySubject<T> {
    /// Create a free-standing subject. Providers call this on first use.
    pub fn new(identity: PropertyIdentity, initial: T, scheduler: SharedScheduler) -> Self {
        Self {
            inner: Arc::new(PropertyInner {
                identity,
                value: Mutex::new(initial),
                changes: Channel::new(identity, "value", scheduler),
            }),
        }
    }

    /// Current value (cloned).
    #[must_use]
    pub fn get(&self) -> T {
        lock(&self.inner.value).clone()
    }

    /// Borrow the current value.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&lock(&self.inner.value))
    }

    /// Assign `value` if it differs from the current one.
    ///
    /// Returns whether the value changed (and a notification was scheduled).
    pub fn set(&self, value: T) -> bool {
        let queued = {
            let mut current = lock(&self.inner.value);
            if *current == value {
                return false;
            }
            *current = value;
            self.inner.changes.enqueue(current.clone())
        };
        if queued {
            self.inner.changes.flush();
        }
        true
    }

    /// Register `handler` for future changes.
    pub fn subscribe(&self, handler: impl Fn(&T) + Send + Sync + 'static) -> Subscription {
        self.inner.changes.subscribe(handler)
    }

    #[must_use]
    pub fn identity(&self) -> PropertyIdentity {
        self.inner.identity
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.changes.subscriber_count()
    }

    /// Whether both handles refer to the same subject.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}
