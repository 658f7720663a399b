#![forbid(unsafe_code)]

//! Runtime objects for bindery: observable properties, commands, their
//! per-owner provider, and the typed [`MessageBus`].
//!
//! Everything here is `Send + Sync`. Delivery goes through the
//! [`Scheduler`](bindery_core::Scheduler) each object was created with; the
//! runtime owns no threads.

pub mod bus;
pub mod reactive;
mod sync;

pub use bus::{MessageBus, PublishReport};
pub use reactive::{BindingScope, Command, CommandObserver, PropertyProvider, PropertySubject};
