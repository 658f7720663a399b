#![forbid(unsafe_code)]

//! Observable state for view models.
//!
//! - [`PropertySubject`]: an observable mutable cell with change
//!   notification through its owner's scheduler.
//! - [`CommandObserver`]: execution requests plus an observable enabled flag.
//! - [`PropertyProvider`]: per-owner factory that resolves selectors and
//!   caches one subject per identity.
//! - [`BindingScope`]: groups subscriptions so they are released together.
//!
//! # Architecture
//!
//! Subjects and commands keep their state behind a `Mutex` and publish
//! through a private serialized channel. A write enqueues the new value while
//! still holding the state lock, then hands a drain task to the scheduler.
//! The drain delivers queued values one by one, so handlers for one stream
//! never overlap and a handler that writes back is served after it returns.
//!
//! # Invariants
//!
//! 1. Equal-value writes are silent.
//! 2. Each change reaches each subscriber exactly once, in write order.
//! 3. Subscribing never replays the current value.
//! 4. A provider hands out one subject per identity.

mod channel;
pub mod command;
pub mod property;
pub mod provider;
pub mod scope;

pub use command::{Command, CommandObserver};
pub use property::PropertySubject;
pub use provider::PropertyProvider;
pub use scope::BindingScope;
