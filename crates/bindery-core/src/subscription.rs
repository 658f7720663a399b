#![forbid(unsafe_code)]

//! Subscription handles and the copy-on-write subscriber list behind them.
//!
//! [`SubscriberList`] keeps handlers in registration order inside an
//! [`ArcSwap`]. Readers take a point-in-time [`snapshot`](SubscriberList::snapshot)
//! without locking, so a handler added or removed while a delivery is in
//! flight never disturbs the list being iterated.
//!
//! # Invariants
//!
//! 1. Snapshots list handlers in registration order.
//! 2. Registration ids are unique per list and never reused.
//! 3. Dropping a [`Subscription`] removes its handler from future snapshots;
//!    snapshots already taken are unaffected.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use arc_swap::ArcSwap;

/// RAII guard for a registered handler.
///
/// Dropping it (or calling [`dispose`](Self::dispose)) unregisters the handler.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    release: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    /// Wrap an unsubscribe action.
    pub fn new(release: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }

    /// A subscription that holds nothing.
    pub fn empty() -> Self {
        Self { release: None }
    }

    /// Unregister now.
    pub fn dispose(self) {
        drop(self);
    }

    /// Keep the handler registered for as long as its source lives.
    pub fn detach(mut self) {
        self.release = None;
    }

    /// Whether dropping this handle would unregister anything.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.release.is_some()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}

/// One registered handler.
pub struct Entry<F: ?Sized> {
    id: u64,
    handler: Arc<F>,
}

impl<F: ?Sized> Entry<F> {
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[must_use]
    pub fn handler(&self) -> &Arc<F> {
        &self.handler
    }
}

impl<F: ?Sized> Clone for Entry<F> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            handler: Arc::clone(&self.handler),
        }
    }
}

/// Ordered, snapshot-able list of handlers of type `F`.
pub struct SubscriberList<F: ?Sized> {
    next_id: AtomicU64,
    entries: ArcSwap<Vec<Entry<F>>>,
}

impl<F: ?Sized> SubscriberList<F> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            entries: ArcSwap::from_pointee(Vec::new()),
        }
    }

    /// Append a handler; returns its registration id.
    pub fn insert(&self, handler: Arc<F>) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let entry = Entry { id, handler };
        self.entries.rcu(|current| {
            let mut next = Vec::with_capacity(current.len() + 1);
            next.extend(current.iter().cloned());
            next.push(entry.clone());
            next
        });
        id
    }

    /// Remove the handler registered as `id`. Returns whether it was present.
    pub fn remove(&self, id: u64) -> bool {
        let mut removed = false;
        self.entries.rcu(|current| {
            let next: Vec<_> = current.iter().filter(|e| e.id != id).cloned().collect();
            removed = next.len() != current.len();
            next
        });
        removed
    }

    /// Handlers registered right now, in registration order.
    #[must_use]
    pub fn snapshot(&self) -> Arc<Vec<Entry<F>>> {
        self.entries.load_full()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.load().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.load().is_empty()
    }
}

impl<F: ?Sized + Send + Sync + 'static> SubscriberList<F> {
    /// Register `handler` and return a guard that unregisters it.
    ///
    /// The guard holds the list weakly; it never keeps the source alive.
    pub fn subscribe(self: &Arc<Self>, handler: Arc<F>) -> Subscription {
        let id = self.insert(handler);
        let list: Weak<Self> = Arc::downgrade(self);
        Subscription::new(move || {
            if let Some(list) = list.upgrade() {
                list.remove(id);
            }
        })
    }
}

impl<F: ?Sized> Default for SubscriberList<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: ?Sized> std::fmt::Debug for SubscriberList<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriberList")
            .field("len", &self.len())
            .finish()
    }
}
