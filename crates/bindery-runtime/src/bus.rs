#![forbid(unsafe_code)]

//! Typed publish/subscribe message bus.
//!
//! Handlers register for one concrete message type and receive every message
//! of exactly that type published on the same bus. There is no subtype or
//! conversion matching: a handler for `String` never sees a `&'static str`.
//!
//! # Invariants
//!
//! 1. Handlers run in registration order, against a snapshot of the handler
//!    list taken when publishing starts.
//! 2. A failing handler (panic or `Err`) is isolated: the failure is logged,
//!    reported to the fault hook, and the remaining handlers still run.
//! 3. Publishing never fails. [`PublishReport`] tells what happened.
//!
//! # Failure Modes
//!
//! | Condition                         | Outcome                         |
//! |-----------------------------------|---------------------------------|
//! | No handler for the type           | no-op, empty report             |
//! | Handler panics / returns `Err`    | `faulted += 1`, fault hook runs |
//! | `subscribe_on` scheduler is gone  | `dropped += 1`, warning logged  |

use std::any::{Any, TypeId, type_name};
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, RwLock};

use ahash::AHashMap;
use arc_swap::ArcSwapOption;
use bindery_core::error::panic_detail;
use bindery_core::{HandlerFault, SharedScheduler, SubscriberList, Subscription};

use crate::sync::{read, write};

type Callback<T> = dyn Fn(&T) -> Result<(), String> + Send + Sync;
type FaultHook = Box<dyn Fn(&HandlerFault) + Send + Sync>;
type Route<T> = SubscriberList<Delivery<T>>;
type ErasedRoute = Arc<dyn Any + Send + Sync>;

enum Delivery<T> {
    /// Runs on the publishing thread, inside `publish`.
    Direct(Box<Callback<T>>),
    /// Handed to a scheduler; `publish` does not wait for it.
    Scheduled {
        scheduler: SharedScheduler,
        handler: Arc<Callback<T>>,
    },
}

/// Summary of one `publish` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishReport {
    /// Handlers that ran (or were handed to their scheduler) without failing.
    pub delivered: usize,
    /// Direct handlers that panicked or returned an error.
    pub faulted: usize,
    /// Scheduled handlers whose context refused the task.
    pub dropped: usize,
}

impl PublishReport {
    /// Total handlers the message was offered to.
    #[must_use]
    pub fn total(&self) -> usize {
        self.delivered + self.faulted + self.dropped
    }
}

struct FaultSink {
    hook: ArcSwapOption<FaultHook>,
}

impl FaultSink {
    fn report(&self, fault: &HandlerFault) {
        tracing::error!(
            message_type = fault.message_type,
            subscriber = fault.subscriber,
            detail = %fault.detail,
            "message handler failed"
        );
        let Some(hook) = self.hook.load_full() else {
            return;
        };
        if let Err(payload) = catch_unwind(AssertUnwindSafe(|| hook(fault))) {
            tracing::error!(
                message_type = fault.message_type,
                subscriber = fault.subscriber,
                detail = %panic_detail(payload.as_ref()),
                "fault hook panicked"
            );
        }
    }

    /// Run `handler`, converting a panic or `Err` into a reported fault.
    fn run<T>(&self, subscriber: u64, handler: &Callback<T>, message: &T) -> bool {
        let detail = match catch_unwind(AssertUnwindSafe(|| handler(message))) {
            Ok(Ok(())) => return true,
            Ok(Err(detail)) => detail,
            Err(payload) => panic_detail(payload.as_ref()),
        };
        self.report(&HandlerFault {
            message_type: type_name::<T>(),
            subscriber,
            detail,
        });
        false
    }
}

struct BusInner {
    routes: RwLock<AHashMap<TypeId, ErasedRoute>>,
    faults: Arc<FaultSink>,
}

/// Process-local typed message bus.
///
/// Cloning yields another handle onto the same routing table. Separately
/// constructed buses share nothing.
#[derive(Clone)]
pub struct MessageBus {
    inner: Arc<BusInner>,
}

impl fmt::Debug for MessageBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageBus")
            .field("routes", &read(&self.inner.routes).len())
            .field("fault_hook", &self.inner.faults.hook.load().is_some())
            .finish()
    }
}

impl Default for MessageBus {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageBus {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(BusInner {
                routes: RwLock::new(AHashMap::new()),
                faults: Arc::new(FaultSink {
                    hook: ArcSwapOption::empty(),
                }),
            }),
        }
    }

    /// Run `handler` on the publishing thread for every `T` published.
    pub fn subscribe<T: Send + Sync + 'static>(
        &self,
        handler: impl Fn(&T) + Send + Sync + 'static,
    ) -> Subscription {
        self.register(Delivery::Direct(Box::new(move |message: &T| {
            handler(message);
            Ok(())
        })))
    }

    /// Like [`subscribe`](Self::subscribe), reporting an `Err` as a
    /// [`HandlerFault`].
    pub fn subscribe_fallible<T, E>(
        &self,
        handler: impl Fn(&T) -> Result<(), E> + Send + Sync + 'static,
    ) -> Subscription
    where
        T: Send + Sync + 'static,
        E: fmt::Display,
    {
        self.register(Delivery::Direct(Box::new(move |message: &T| {
            handler(message).map_err(|err| err.to_string())
        })))
    }

    /// Run `handler` on `scheduler` for every `T` published.
    ///
    /// `publish` hands the message off and returns; faults inside the
    /// handler are still reported to the fault hook, from the scheduler's
    /// context.
    pub fn subscribe_on<T: Send + Sync + 'static>(
        &self,
        scheduler: SharedScheduler,
        handler: impl Fn(&T) + Send + Sync + 'static,
    ) -> Subscription {
        self.register(Delivery::Scheduled {
            scheduler,
            handler: Arc::new(move |message: &T| {
                handler(message);
                Ok(())
            }),
        })
    }

    /// Deliver `message` to every current `T` handler.
    pub fn publish<T: Send + Sync + 'static>(&self, message: T) -> PublishReport {
        self.publish_shared(Arc::new(message))
    }

    /// Deliver an already shared message; handlers see this exact instance.
    pub fn publish_shared<T: Send + Sync + 'static>(&self, message: Arc<T>) -> PublishReport {
        let mut report = PublishReport::default();
        let Some(route) = self.route::<T>() else {
            tracing::trace!(message_type = type_name::<T>(), "published with no subscribers");
            return report;
        };
        let handlers = route.snapshot();
        for entry in handlers.iter() {
            match &**entry.handler() {
                Delivery::Direct(handler) => {
                    if self.inner.faults.run(entry.id(), &**handler, &*message) {
                        report.delivered += 1;
                    } else {
                        report.faulted += 1;
                    }
                }
                Delivery::Scheduled { scheduler, handler } => {
                    let id = entry.id();
                    let handler = Arc::clone(handler);
                    let message = Arc::clone(&message);
                    let faults = Arc::clone(&self.inner.faults);
                    let task = Box::new(move || {
                        faults.run(id, &*handler, &*message);
                    });
                    match scheduler.schedule(task) {
                        Ok(()) => report.delivered += 1,
                        Err(err) => {
                            tracing::warn!(
                                message_type = type_name::<T>(),
                                subscriber = id,
                                context = err.context(),
                                "message dropped: {err}"
                            );
                            report.dropped += 1;
                        }
                    }
                }
            }
        }
        tracing::trace!(
            message_type = type_name::<T>(),
            delivered = report.delivered,
            faulted = report.faulted,
            dropped = report.dropped,
            "published"
        );
        report
    }

    /// Install the hook that receives every [`HandlerFault`], replacing any
    /// previous one.
    pub fn on_fault(&self, hook: impl Fn(&HandlerFault) + Send + Sync + 'static) {
        let hook: FaultHook = Box::new(hook);
        self.inner.faults.hook.store(Some(Arc::new(hook)));
    }

    /// Number of live handlers for `T`.
    #[must_use]
    pub fn subscriber_count<T: Send + Sync + 'static>(&self) -> usize {
        self.route::<T>().map_or(0, |route| route.len())
    }

    fn register<T: Send + Sync + 'static>(&self, delivery: Delivery<T>) -> Subscription {
        let route = self.route_or_insert::<T>();
        route.subscribe(Arc::new(delivery))
    }

    fn route<T: Send + Sync + 'static>(&self) -> Option<Arc<Route<T>>> {
        let routes = read(&self.inner.routes);
        let erased = routes.get(&TypeId::of::<T>())?;
        Arc::clone(erased).downcast::<Route<T>>().ok()
    }

    fn route_or_insert<T: Send + Sync + 'static>(&self) -> Arc<Route<T>> {
        if let Some(route) = self.route::<T>() {
            return route;
        }
        let mut routes = write(&self.inner.routes);
        if let Some(route) = routes
            .get(&TypeId::of::<T>())
            .and_then(|erased| Arc::clone(erased).downcast::<Route<T>>().ok())
        {
            return route;
        }
        let route: Arc<Route<T>> = Arc::new(SubscriberList::new());
        routes.insert(TypeId::of::<T>(), Arc::clone(&route) as ErasedRoute);
        tracing::debug!(message_type = type_name::<T>(), "route opened");
        route
    }
}
