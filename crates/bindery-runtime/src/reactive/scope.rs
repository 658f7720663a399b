#![forbid(unsafe_code)]

//! Lifetime grouping for subscriptions.

use bindery_core::Subscription;

use super::command::CommandObserver;
use super::property::PropertySubject;
use crate::bus::MessageBus;

/// Collects subscriptions for a logical scope (a view, a dialog, a session).
///
/// When the scope is dropped, all held subscriptions are released.
///
/// ```ignore
/// let mut scope = BindingScope::new();
/// scope
///     .on_change(&vm.message, |text| println!("message: {text}"))
///     .on_execute(&vm.save, |()| println!("saving"));
/// // Dropping `scope` unsubscribes both handlers.
/// ```
///
/// # Invariants
///
/// 1. Subscriptions are released in reverse registration order.
/// 2. After drop or [`clear`](Self::clear), no handler from this scope is
///    invoked for notifications scheduled afterwards.
/// 3. [`binding_count`](Self::binding_count) always matches what is held.
pub struct BindingScope {
    subscriptions: Vec<Subscription>,
}

impl BindingScope {
    #[must_use]
    pub fn new() -> Self {
        Self {
            subscriptions: Vec::new(),
        }
    }

    /// Keep `sub` alive until the scope is dropped or cleared.
    pub fn hold(&mut self, sub: Subscription) -> &mut Self {
        self.subscriptions.push(sub);
        self
    }

    pub fn on_change<T>(
        &mut self,
        subject: &PropertySubject<T>,
        handler: impl Fn(&T) + Send + Sync + 'static,
    ) -> &mut Self
    where
        T: Clone + PartialEq + Send + Sync + 'static,
    {
        self.hold(subject.subscribe(handler))
    }

    pub fn on_execute<T: Send + Sync + 'static>(
        &mut self,
        command: &CommandObserver<T>,
        handler: impl Fn(&T) + Send + Sync + 'static,
    ) -> &mut Self {
        self.hold(command.subscribe_execute(handler))
    }

    pub fn on_can_execute<T: Send + Sync + 'static>(
        &mut self,
        command: &CommandObserver<T>,
        handler: impl Fn(bool) + Send + Sync + 'static,
    ) -> &mut Self {
        self.hold(command.subscribe_can_execute(handler))
    }

    pub fn on_message<T: Send + Sync + 'static>(
        &mut self,
        bus: &MessageBus,
        handler: impl Fn(&T) + Send + Sync + 'static,
    ) -> &mut Self {
        self.hold(bus.subscribe(handler))
    }

    #[must_use]
    pub fn binding_count(&self) -> usize {
        self.subscriptions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    /// Release everything now; the scope stays usable.
    pub fn clear(&mut self) {
        while let Some(sub) = self.subscriptions.pop() {
            drop(sub);
        }
    }
}

impl Drop for BindingScope {
    fn drop(&mut self) {
        self.clear();
    }
}

impl Default for BindingScope {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for BindingScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BindingScope")
            .field("binding_count", &self.subscriptions.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bindery_core::{ImmediateScheduler, Selector, bindable, resolve};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    struct Counter;

    bindable!(Counter {
        property value: i32,
        command bump: i32,
    });

    fn value() -> PropertySubject<i32> {
        let identity = resolve(&Selector::<Counter>::new("value")).unwrap();
        PropertySubject::new(identity, 0, ImmediateScheduler::shared())
    }

    fn bump() -> CommandObserver<i32> {
        let identity = resolve(&Selector::<Counter>::new("bump")).unwrap();
        CommandObserver::new(identity, true, ImmediateScheduler::shared())
    }

    #[test]
    fn scope_holds_subscriptions() {
        let subject = value();
        let seen = Arc::new(Mutex::new(0));

        let mut scope = BindingScope::new();
        let s = Arc::clone(&seen);
        scope.on_change(&subject, move |v| *s.lock().unwrap() = *v);
        assert_eq!(scope.binding_count(), 1);

        subject.set(42);
        assert_eq!(*seen.lock().unwrap(), 42);
    }

    #[test]
    fn scope_drop_releases_subscriptions() {
        let subject = value();
        let seen = Arc::new(Mutex::new(0));

        {
            let mut scope = BindingScope::new();
            let s = Arc::clone(&seen);
            scope.on_change(&subject, move |v| *s.lock().unwrap() = *v);
            subject.set(1);
            assert_eq!(*seen.lock().unwrap(), 1);
        }

        subject.set(99);
        assert_eq!(*seen.lock().unwrap(), 1, "handler fired after scope dropped");
        assert_eq!(subject.subscriber_count(), 0);
    }

    #[test]
    fn scope_clear_releases() {
        let cmd = bump();
        let hits = Arc::new(AtomicUsize::new(0));

        let mut scope = BindingScope::new();
        let h = Arc::clone(&hits);
        scope.on_execute(&cmd, move |_| {
            h.fetch_add(1, Ordering::SeqCst);
        });
        scope.clear();
        assert!(scope.is_empty());

        cmd.request_execute(1);
        assert_eq!(hits.load(Ordering::SeqCst), 0, "handler fired after clear");
    }

    #[test]
    fn scope_chains_mixed_sources() {
        let subject = value();
        let cmd = bump();
        let bus = MessageBus::new();
        let total = Arc::new(AtomicUsize::new(0));

        let mut scope = BindingScope::new();
        let (a, b, c, d) = (
            Arc::clone(&total),
            Arc::clone(&total),
            Arc::clone(&total),
            Arc::clone(&total),
        );
        scope
            .on_change(&subject, move |_| {
                a.fetch_add(1, Ordering::SeqCst);
            })
            .on_execute(&cmd, move |_| {
                b.fetch_add(1, Ordering::SeqCst);
            })
            .on_can_execute(&cmd, move |_| {
                c.fetch_add(1, Ordering::SeqCst);
            })
            .on_message::<u64>(&bus, move |_| {
                d.fetch_add(1, Ordering::SeqCst);
            });
        assert_eq!(scope.binding_count(), 4);

        subject.set(5);
        cmd.request_execute(5);
        cmd.set_can_execute(false);
        bus.publish(5_u64);
        assert_eq!(total.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn release_runs_in_reverse_order() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let mut scope = BindingScope::new();
        for i in 0..3 {
            let o = Arc::clone(&order);
            scope.hold(Subscription::new(move || o.lock().unwrap().push(i)));
        }
        drop(scope);
        assert_eq!(*order.lock().unwrap(), vec![2, 1, 0]);
    }
}
