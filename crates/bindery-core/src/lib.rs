#![forbid(unsafe_code)]

//! Core plumbing for bindery.
//!
//! - [`scheduler`]: the [`Scheduler`] capability plus immediate and
//!   context-affine implementations.
//! - [`identity`]: owner registration tables ([`bindable!`]), member
//!   [`Selector`]s ([`selector!`]) and the [`PropertyIdentity`] they resolve to.
//! - [`subscription`]: RAII [`Subscription`] guards and the snapshot-based
//!   [`SubscriberList`].
//! - [`error`]: creation-time and delivery-time error types.

pub mod error;
pub mod identity;
pub mod scheduler;
pub mod subscription;

pub use error::{BindError, HandlerFault, SchedulerUnavailable, SelectorIssue};
pub use identity::{
    Bindable, Member, MemberKind, PropertyIdentity, Resolved, Selector, SelectorCache, resolve,
};
pub use scheduler::{
    ContextPump, ContextScheduler, ContextThread, ImmediateScheduler, Scheduler, SharedScheduler,
    Task,
};
pub use subscription::{Entry, SubscriberList, Subscription};
