#![forbid(unsafe_code)]

//! Serialized, scheduled notification channel shared by subjects and commands.
//!
//! Each emitted value is appended to a per-channel pending queue together
//! with the subscriber list current at that moment, then a drain task is
//! handed to the scheduler. Whichever drain task runs first delivers
//! everything queued; concurrent or re-entrant drains return at once.
//!
//! # Invariants
//!
//! 1. At most one drain runs per channel at any time, so handlers for one
//!    channel never run concurrently with each other.
//! 2. Values are delivered in queue order, which callers keep aligned with the
//!    order of their state changes by enqueuing under their own lock.
//! 3. A value emitted from inside a handler is delivered after that handler
//!    returns, by the drain already in progress.
//! 4. A value goes to the subscribers registered when it was enqueued. Later
//!    subscribers never see it; earlier ones that unsubscribe before the
//!    drain still do.
//!
//! # Failure Modes
//!
//! - Scheduler unavailable: the pending queue is discarded and a warning is
//!   logged; the emitter is not told.
//! - Handler panic: caught and logged at `error`; the remaining subscribers
//!   still receive the value and the emitter never sees the panic.

use std::collections::VecDeque;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use bindery_core::error::panic_detail;
use bindery_core::{Entry, PropertyIdentity, SharedScheduler, SubscriberList, Subscription};

use crate::sync::lock;

pub(crate) type Handler<T> = dyn Fn(&T) + Send + Sync;
type Audience<T> = Arc<Vec<Entry<Handler<T>>>>;

pub(crate) struct Channel<T> {
    shared: Arc<Shared<T>>,
}

struct Shared<T> {
    identity: PropertyIdentity,
    stream: &'static str,
    scheduler: SharedScheduler,
    subscribers: Arc<SubscriberList<Handler<T>>>,
    pending: Mutex<VecDeque<(T, Audience<T>)>>,
    draining: AtomicBool,
}

struct DrainGuard<'a>(&'a AtomicBool);

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl<T: Send + Sync + 'static> Channel<T> {
    pub(crate) fn new(
        identity: PropertyIdentity,
        stream: &'static str,
        scheduler: SharedScheduler,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                identity,
                stream,
                scheduler,
                subscribers: Arc::new(SubscriberList::new()),
                pending: Mutex::new(VecDeque::new()),
                draining: AtomicBool::new(false),
            }),
        }
    }

    pub(crate) fn subscribe(&self, handler: impl Fn(&T) + Send + Sync + 'static) -> Subscription {
        self.shared.subscribers.subscribe(Arc::new(handler))
    }

    pub(crate) fn subscriber_count(&self) -> usize {
        self.shared.subscribers.len()
    }

    /// Queue `value` for delivery. Returns `false` when nobody listens.
    ///
    /// Call while holding the state lock that produced `value`, then call
    /// [`flush`](Self::flush) after releasing it.
    pub(crate) fn enqueue(&self, value: T) -> bool {
        let audience = self.shared.subscribers.snapshot();
        if audience.is_empty() {
            return false;
        }
        lock(&self.shared.pending).push_back((value, audience));
        true
    }

    /// Hand a drain task to the scheduler.
    pub(crate) fn flush(&self) {
        let shared = Arc::clone(&self.shared);
        if let Err(err) = self.shared.scheduler.schedule(Box::new(move || shared.drain())) {
            let dropped = {
                let mut pending = lock(&self.shared.pending);
                let dropped = pending.len();
                pending.clear();
                dropped
            };
            tracing::warn!(
                owner = self.shared.identity.owner_name(),
                member = self.shared.identity.member(),
                stream = self.shared.stream,
                context = err.context(),
                dropped,
                "notification dropped: {err}"
            );
        }
    }
}

impl<T> Shared<T> {
    fn drain(&self) {
        loop {
            if self.draining.swap(true, Ordering::AcqRel) {
                return;
            }
            let guard = DrainGuard(&self.draining);
            while let Some((value, audience)) = self.next_pending() {
                tracing::trace!(
                    member = self.identity.member(),
                    stream = self.stream,
                    subscribers = audience.len(),
                    "delivering"
                );
                for entry in audience.iter() {
                    self.deliver(entry, &value);
                }
            }
            drop(guard);
            if lock(&self.pending).is_empty() {
                return;
            }
        }
    }

    fn deliver(&self, entry: &Entry<Handler<T>>, value: &T) {
        let handler = entry.handler();
        if let Err(payload) = catch_unwind(AssertUnwindSafe(|| handler(value))) {
            tracing::error!(
                owner = self.identity.owner_name(),
                member = self.identity.member(),
                stream = self.stream,
                subscriber = entry.id(),
                detail = %panic_detail(payload.as_ref()),
                "notification handler panicked"
            );
        }
    }

    fn next_pending(&self) -> Option<(T, Audience<T>)> {
        lock(&self.pending).pop_front()
    }
}
