#![forbid(unsafe_code)]

//! Commands with an observable enabled flag.
//!
//! A [`CommandObserver<T>`] carries two notification streams: execution
//! requests (with their `T` argument) and changes of the can-execute flag.
//! Both go through the owning scheduler, each serialized on its own.
//!
//! # Invariants
//!
//! 1. While disabled, [`request_execute`](CommandObserver::request_execute)
//!    never reaches execute subscribers.
//! 2. An accepted request reaches each execute subscriber exactly once.
//! 3. Setting the flag to its current value notifies nobody.

use std::fmt;
use std::sync::{Arc, Mutex};

use bindery_core::{PropertyIdentity, SharedScheduler, Subscription};

use super::channel::Channel;
use crate::sync::lock;

/// The narrow command interface a UI binding adapter consumes.
///
/// Object safe, so adapters can hold `Arc<dyn Command<T>>`.
pub trait Command<T>: Send + Sync {
    fn can_execute(&self) -> bool;

    /// Request execution. Returns `false` if the command is disabled.
    fn execute(&self, arg: T) -> bool;

    /// Observe enablement changes, e.g. to grey out a button.
    fn on_can_execute_changed(&self, handler: Box<dyn Fn(bool) + Send + Sync>) -> Subscription;
}

struct CommandInner<T> {
    identity: PropertyIdentity,
    enabled: Mutex<bool>,
    execute: Channel<T>,
    can_execute: Channel<bool>,
}

/// Command endpoint: execution requests plus an enabled flag.
///
/// Cloning yields another handle to the same command.
pub struct CommandObserver<T> {
    inner: Arc<CommandInner<T>>,
}

impl<T> Clone for CommandObserver<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for CommandObserver<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandObserver")
            .field("identity", &self.inner.identity)
            .field("can_execute", &*lock(&self.inner.enabled))
            .finish()
    }
}

impl<T: Send + Sync + 'static> CommandObserver<T> {
    pub fn new(identity: PropertyIdentity, can_execute: bool, scheduler: SharedScheduler) -> Self {
        Self {
            inner: Arc::new(CommandInner {
                identity,
                enabled: Mutex::new(can_execute),
                execute: Channel::new(identity, "execute", Arc::clone(&scheduler)),
                can_execute: Channel::new(identity, "can_execute", scheduler),
            }),
        }
    }

    #[must_use]
    pub fn can_execute(&self) -> bool {
        *lock(&self.inner.enabled)
    }

    /// Enable or disable the command. Returns whether the flag changed.
    pub fn set_can_execute(&self, can_execute: bool) -> bool {
        let queued = {
            let mut enabled = lock(&self.inner.enabled);
            if *enabled == can_execute {
                return false;
            }
            *enabled = can_execute;
            self.inner.can_execute.enqueue(can_execute)
        };
        tracing::debug!(
            owner = self.inner.identity.owner_name(),
            member = self.inner.identity.member(),
            can_execute,
            "command enablement changed"
        );
        if queued {
            self.inner.can_execute.flush();
        }
        true
    }

    /// Ask the command to run with `arg`.
    ///
    /// A disabled command drops the request and returns `false`.
    pub fn request_execute(&self, arg: T) -> bool {
        let queued = {
            let enabled = lock(&self.inner.enabled);
            if !*enabled {
                tracing::trace!(
                    owner = self.inner.identity.owner_name(),
                    member = self.inner.identity.member(),
                    "execute request ignored: command disabled"
                );
                return false;
            }
            self.inner.execute.enqueue(arg)
        };
        if queued {
            self.inner.execute.flush();
        }
        true
    }

    pub fn subscribe_execute(&self, handler: impl Fn(&T) + Send + Sync + 'static) -> Subscription {
        self.inner.execute.subscribe(handler)
    }

    pub fn subscribe_can_execute(
        &self,
        handler: impl Fn(bool) + Send + Sync + 'static,
    ) -> Subscription {
        self.inner.can_execute.subscribe(move |flag: &bool| handler(*flag))
    }

    #[must_use]
    pub fn identity(&self) -> PropertyIdentity {
        self.inner.identity
    }

    #[must_use]
    pub fn execute_subscriber_count(&self) -> usize {
        self.inner.execute.subscriber_count()
    }

    #[must_use]
    pub fn can_execute_subscriber_count(&self) -> usize {
        self.inner.can_execute.subscriber_count()
    }

    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T: Send + Sync + 'static> Command<T> for CommandObserver<T> {
    fn can_execute(&self) -> bool {
        CommandObserver::can_execute(self)
    }

    fn execute(&self, arg: T) -> bool {
        self.request_execute(arg)
    }

    fn on_can_execute_changed(&self, handler: Box<dyn Fn(bool) + Send + Sync>) -> Subscription {
        self.subscribe_can_execute(handler)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bindery_core::{ImmediateScheduler, Selector, bindable, resolve};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Toolbar;

    bindable!(Toolbar {
        command save: (),
        command open: String,
    });

    fn command<T>(member: &'static str, enabled: bool) -> CommandObserver<T>
    where
        T: Send + Sync + 'static,
    {
        let identity = resolve(&Selector::<Toolbar>::new(member)).unwrap();
        CommandObserver::new(identity, enabled, ImmediateScheduler::shared())
    }

    fn counter(cmd: &CommandObserver<()>) -> (Arc<AtomicUsize>, Subscription) {
        let hits = Arc::new(AtomicUsize::new(0));
        let h = Arc::clone(&hits);
        let sub = cmd.subscribe_execute(move |()| {
            h.fetch_add(1, Ordering::SeqCst);
        });
        (hits, sub)
    }

    #[test]
    fn disabled_request_is_dropped() {
        let save = command::<()>("save", false);
        let (hits, _sub) = counter(&save);
        assert!(!save.request_execute(()));
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn panicking_execute_handler_is_contained() {
        let save = command::<()>("save", true);
        let _bad = save.subscribe_execute(|()| panic!("handler blew up"));
        let (hits, _sub) = counter(&save);

        let result =
            std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| save.request_execute(())));
        assert!(matches!(result, Ok(true)));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn enabled_request_reaches_each_subscriber_once() {
        let open = command::<String>("open", true);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let subs: Vec<_> = (0..2)
            .map(|i| {
                let s = Arc::clone(&seen);
                open.subscribe_execute(move |path: &String| {
                    s.lock().unwrap().push((i, path.clone()));
                })
            })
            .collect();

        assert!(open.request_execute("notes.txt".into()));
        assert_eq!(
            *seen.lock().unwrap(),
            vec![(0, "notes.txt".to_string()), (1, "notes.txt".to_string())]
        );
        drop(subs);
    }

    #[test]
    fn enabling_then_requesting_runs_once() {
        let save = command::<()>("save", false);
        let (hits, _sub) = counter(&save);
        save.request_execute(());
        assert!(save.set_can_execute(true));
        save.request_execute(());
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn can_execute_changes_are_observed_once_per_change() {
        let save = command::<()>("save", false);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = Arc::clone(&seen);
        let _sub = save.subscribe_can_execute(move |flag| s.lock().unwrap().push(flag));

        assert!(save.set_can_execute(true));
        assert!(!save.set_can_execute(true));
        assert!(save.set_can_execute(false));
        assert_eq!(*seen.lock().unwrap(), vec![true, false]);
        assert!(!save.can_execute());
    }

    #[test]
    fn execute_handler_may_disable_its_command() {
        let save = command::<()>("save", true);
        let hits = Arc::new(AtomicUsize::new(0));
        let h = Arc::clone(&hits);
        let handle = save.clone();
        let _sub = save.subscribe_execute(move |()| {
            h.fetch_add(1, Ordering::SeqCst);
            handle.set_can_execute(false);
        });

        assert!(save.request_execute(()));
        assert!(!save.request_execute(()));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn works_through_trait_object() {
        let save = command::<()>("save", false);
        let (hits, _sub) = counter(&save);
        let adapter: Arc<dyn Command<()>> = Arc::new(save.clone());

        let flags = Arc::new(Mutex::new(Vec::new()));
        let f = Arc::clone(&flags);
        let _watch =
            adapter.on_can_execute_changed(Box::new(move |flag| f.lock().unwrap().push(flag)));

        assert!(!adapter.can_execute());
        assert!(!adapter.execute(()));
        save.set_can_execute(true);
        assert!(adapter.can_execute());
        assert!(adapter.execute(()));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(*flags.lock().unwrap(), vec![true]);
    }
}
