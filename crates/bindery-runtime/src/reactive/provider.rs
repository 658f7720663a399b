#![forbid(unsafe_code)]

//! Per-owner factory and cache for subjects and commands.
//!
//! A [`PropertyProvider<O>`] turns selectors on `O` into live
//! [`PropertySubject`]s and [`CommandObserver`]s, all bound to the provider's
//! scheduler. The first request for an identity creates the object; every
//! later request returns the same instance.
//!
//! # Invariants
//!
//! 1. One provider, one identity: one subject. Handles returned for equal
//!    identities satisfy `ptr_eq`.
//! 2. Get-or-insert runs under a single lock, so racing first uses agree.
//! 3. Kind and value type are checked against the owner's declaration before
//!    anything is created or returned.
//!
//! # Owner lifetime
//!
//! The provider holds its owner weakly. It is meant to live inside the owner;
//! once the owner is gone [`owner`](PropertyProvider::owner) returns `None`
//! while existing subjects keep working.

use std::any::{Any, type_name};
use std::fmt;
use std::sync::{Arc, Mutex, OnceLock, Weak};

use ahash::AHashMap;
use bindery_core::{
    BindError, Bindable, MemberKind, PropertyIdentity, Resolved, Selector, SharedScheduler,
};

use super::command::CommandObserver;
use super::property::PropertySubject;
use crate::sync::lock;

type Cached = Box<dyn Any + Send + Sync>;

/// Factory and identity-keyed cache for one owner.
pub struct PropertyProvider<O> {
    owner: OnceLock<Weak<O>>,
    scheduler: SharedScheduler,
    cache: Mutex<AHashMap<PropertyIdentity, Cached>>,
}

impl<O> fmt::Debug for PropertyProvider<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyProvider")
            .field("owner", &type_name::<O>())
            .field("attached", &self.owner.get().is_some())
            .field("scheduler", &self.scheduler.name())
            .field("cached", &lock(&self.cache).len())
            .finish()
    }
}

impl<O: Bindable> PropertyProvider<O> {
    /// Provider for an owner under construction, typically from
    /// `Arc::new_cyclic`.
    pub fn new(owner: Weak<O>, scheduler: SharedScheduler) -> Self {
        Self::with_owner(OnceLock::from(owner), scheduler)
    }

    /// Provider whose owner is supplied later with [`attach`](Self::attach).
    pub fn unattached(scheduler: SharedScheduler) -> Self {
        Self::with_owner(OnceLock::new(), scheduler)
    }

    fn with_owner(owner: OnceLock<Weak<O>>, scheduler: SharedScheduler) -> Self {
        tracing::debug!(
            owner = type_name::<O>(),
            context = scheduler.name(),
            attached = owner.get().is_some(),
            "provider created"
        );
        Self {
            owner,
            scheduler,
            cache: Mutex::new(AHashMap::new()),
        }
    }

    /// Record the owner. Returns `false` if one was already recorded.
    pub fn attach(&self, owner: &Arc<O>) -> bool {
        self.owner.set(Arc::downgrade(owner)).is_ok()
    }

    /// The owner, if attached and still alive.
    #[must_use]
    pub fn owner(&self) -> Option<Arc<O>> {
        self.owner.get().and_then(Weak::upgrade)
    }

    #[must_use]
    pub fn scheduler(&self) -> &SharedScheduler {
        &self.scheduler
    }

    /// Subject for `selector`, starting from `T::default()` when created.
    ///
    /// # Errors
    ///
    /// Resolution errors from the selector, or [`BindError::TypeMismatch`]
    /// if the member is not a `T` property.
    pub fn create_property<T>(&self, selector: Selector<O>) -> Result<PropertySubject<T>, BindError>
    where
        T: Clone + PartialEq + Default + Send + Sync + 'static,
    {
        self.create_property_with(selector, T::default())
    }

    /// Subject for `selector`, starting from `initial` when created.
    ///
    /// `initial` is ignored if the subject already exists.
    ///
    /// # Errors
    ///
    /// See [`create_property`](Self::create_property).
    pub fn create_property_with<T>(
        &self,
        selector: Selector<O>,
        initial: T,
    ) -> Result<PropertySubject<T>, BindError>
    where
        T: Clone + PartialEq + Send + Sync + 'static,
    {
        let identity = check::<T>(&selector.resolve()?, MemberKind::Property)?;
        self.get_or_insert(identity, || {
            PropertySubject::new(identity, initial, Arc::clone(&self.scheduler))
        })
    }

    /// Command for `selector`, created with `can_execute` when first used.
    ///
    /// # Errors
    ///
    /// Resolution errors from the selector, or [`BindError::TypeMismatch`]
    /// if the member is not a command taking `T`.
    pub fn create_command<T>(
        &self,
        selector: Selector<O>,
        can_execute: bool,
    ) -> Result<CommandObserver<T>, BindError>
    where
        T: Send + Sync + 'static,
    {
        let identity = check::<T>(&selector.resolve()?, MemberKind::Command)?;
        self.get_or_insert(identity, || {
            CommandObserver::new(identity, can_execute, Arc::clone(&self.scheduler))
        })
    }

    /// Number of distinct identities created so far.
    #[must_use]
    pub fn len(&self) -> usize {
        lock(&self.cache).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn get_or_insert<S>(
        &self,
        identity: PropertyIdentity,
        make: impl FnOnce() -> S,
    ) -> Result<S, BindError>
    where
        S: Clone + Send + Sync + 'static,
    {
        let mut cache = lock(&self.cache);
        if let Some(existing) = cache.get(&identity) {
            return match (**existing).downcast_ref::<S>() {
                Some(shared) => {
                    tracing::trace!(
                        owner = identity.owner_name(),
                        member = identity.member(),
                        "provider cache hit"
                    );
                    Ok(shared.clone())
                }
                None => Err(BindError::TypeMismatch {
                    identity,
                    expected: "the type it was first created with".to_string(),
                    found: type_name::<S>().to_string(),
                }),
            };
        }
        let created = make();
        cache.insert(identity, Box::new(created.clone()));
        tracing::debug!(
            owner = identity.owner_name(),
            member = identity.member(),
            context = self.scheduler.name(),
            "created {}",
            type_name::<S>()
        );
        Ok(created)
    }
}

fn check<T: 'static>(resolved: &Resolved, kind: MemberKind) -> Result<PropertyIdentity, BindError> {
    let member = resolved.member();
    if member.accepts::<T>(kind) {
        Ok(resolved.identity())
    } else {
        Err(BindError::TypeMismatch {
            identity: resolved.identity(),
            expected: format!("{} of {}", member.kind(), member.value_type_name()),
            found: format!("{kind} of {}", type_name::<T>()),
        })
    }
}
