#![forbid(unsafe_code)]

//! bindery public facade.
//!
//! Re-exports the scheduler, identity and subscription plumbing from
//! `bindery-core` and the observable objects and message bus from
//! `bindery-runtime`. Most consumers only need [`prelude`].
//!
//! ```ignore
//! use bindery::prelude::*;
//!
//! struct Editor {
//!     title: PropertySubject<String>,
//! }
//!
//! bindable!(Editor {
//!     property title: String,
//! });
//!
//! let provider: PropertyProvider<Editor> =
//!     PropertyProvider::unattached(ImmediateScheduler::shared());
//! let title = provider.create_property::<String>(selector!(Editor, title))?;
//! let _sub = title.subscribe(|t| println!("title: {t}"));
//! title.set("draft".into());
//! ```

pub use bindery_core as core;
pub use bindery_runtime as runtime;

pub use bindery_core::{
    BindError, Bindable, ContextPump, ContextScheduler, ContextThread, HandlerFault,
    ImmediateScheduler, Member, MemberKind, PropertyIdentity, Scheduler, SchedulerUnavailable,
    Selector, SelectorIssue, SharedScheduler, Subscription, bindable, resolve, selector,
};
pub use bindery_runtime::{
    BindingScope, Command, CommandObserver, MessageBus, PropertyProvider, PropertySubject,
    PublishReport,
};

/// The common imports for building a view model.
pub mod prelude {
    pub use bindery_core::{
        BindError, Bindable, ContextScheduler, ContextThread, ImmediateScheduler, Scheduler,
        SharedScheduler, Subscription, bindable, selector,
    };
    pub use bindery_runtime::{
        BindingScope, Command, CommandObserver, MessageBus, PropertyProvider, PropertySubject,
    };
}
