//! Dialog presentation for bus announcements.

use std::sync::{Arc, Mutex, PoisonError};

use bindery::prelude::*;

use crate::view_model::Msg1;

/// Text shown when a [`Msg1`] arrives.
pub const MSG1_SHOWN: &str = "msg1 published";

/// Something that can put a line of text in front of the user.
pub trait DialogPresenter: Send + Sync {
    fn show(&self, text: &str);
}

/// Presents dialogs as `info` log lines.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogDialog;

impl DialogPresenter for LogDialog {
    fn show(&self, text: &str) {
        tracing::info!(target: "bindery_demo::dialog", "{text}");
    }
}

/// Keeps every shown text, along with the thread that showed it.
#[derive(Debug, Default)]
pub struct RecordingDialog {
    shown: Mutex<Vec<(String, Option<String>)>>,
}

impl RecordingDialog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Texts shown so far, in order.
    #[must_use]
    pub fn texts(&self) -> Vec<String> {
        self.entries().into_iter().map(|(text, _)| text).collect()
    }

    /// Shown texts paired with the name of the thread that showed them.
    #[must_use]
    pub fn entries(&self) -> Vec<(String, Option<String>)> {
        self.shown
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl DialogPresenter for RecordingDialog {
    fn show(&self, text: &str) {
        let thread = std::thread::current().name().map(str::to_string);
        self.shown
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((text.to_string(), thread));
    }
}

/// Route bus announcements to `presenter` on the `gui` scheduler.
///
/// Plain `String` messages are shown verbatim; a [`Msg1`] shows
/// [`MSG1_SHOWN`]. The returned scope owns both subscriptions.
pub fn bind_dialogs(
    bus: &MessageBus,
    gui: &SharedScheduler,
    presenter: Arc<dyn DialogPresenter>,
) -> BindingScope {
    let mut scope = BindingScope::new();
    let verbatim = Arc::clone(&presenter);
    scope
        .hold(bus.subscribe_on(Arc::clone(gui), move |text: &String| {
            verbatim.show(text);
        }))
        .hold(bus.subscribe_on(Arc::clone(gui), move |_: &Msg1| {
            presenter.show(MSG1_SHOWN);
        }));
    scope
}
