//! The message view model: one text property, a load command and a save
//! command, talking to the rest of the application over the bus.

use std::sync::Arc;

use bindery::prelude::*;

use crate::error::Result;

/// Text the save command writes into `message`.
pub const SAVED_MESSAGE: &str = "Clicked !!!";
/// Announcement published when load runs.
pub const LOAD_ANNOUNCEMENT: &str = "load has been clicked";
/// Payload of the [`Msg1`] published when save runs.
pub const SAVE_PAYLOAD: &str = "this is a message";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Msg1 {
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Msg2 {
    pub message: String,
}

/// Read/write access to the editable message, for views that only need text.
pub trait MessageSource: Send + Sync {
    fn message(&self) -> String;

    /// Returns whether the text changed.
    fn set_message(&self, text: String) -> bool;
}

pub struct MessageViewModel {
    provider: PropertyProvider<MessageViewModel>,
    bus: MessageBus,
    message: PropertySubject<String>,
    load: CommandObserver<()>,
    save: CommandObserver<()>,
    _glue: BindingScope,
}

bindable!(MessageViewModel {
    property message: String,
    command load: (),
    command save: (),
});

impl std::fmt::Debug for MessageViewModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageViewModel")
            .field("message", &self.message.get())
            .field("load", &self.load.can_execute())
            .field("save", &self.save.can_execute())
            .finish()
    }
}

impl MessageViewModel {
    /// Build the view model with every notification delivered on `scheduler`.
    ///
    /// # Errors
    ///
    /// [`DemoError::Bind`](crate::DemoError::Bind) if a member declaration
    /// disagrees with how it is created here.
    pub fn new(bus: MessageBus, scheduler: SharedScheduler) -> Result<Arc<Self>> {
        let provider = PropertyProvider::unattached(scheduler);
        let message = provider.create_property::<String>(selector!(MessageViewModel, message))?;
        let load = provider.create_command::<()>(selector!(MessageViewModel, |vm| vm.load), true)?;
        let save = provider.create_command::<()>(selector!(MessageViewModel, |vm| vm.save), false)?;

        let mut glue = BindingScope::new();

        // save is available only while there is something to save.
        let gate = save.clone();
        glue.on_change(&message, move |text: &String| {
            gate.set_can_execute(!text.is_empty());
        });

        let announce = bus.clone();
        glue.on_execute(&load, move |()| {
            tracing::info!(command = "load", "executing");
            announce.publish(LOAD_ANNOUNCEMENT.to_string());
        });

        let (announce, text) = (bus.clone(), message.clone());
        glue.on_execute(&save, move |()| {
            tracing::info!(command = "save", "executing");
            text.set(SAVED_MESSAGE.to_string());
            announce.publish(Msg1 {
                message: SAVE_PAYLOAD.to_string(),
            });
        });

        let vm = Arc::new(Self {
            provider,
            bus,
            message,
            load,
            save,
            _glue: glue,
        });
        vm.provider.attach(&vm);
        tracing::debug!(bindings = vm.provider.len(), "message view model ready");
        Ok(vm)
    }

    #[must_use]
    pub fn message_property(&self) -> &PropertySubject<String> {
        &self.message
    }

    #[must_use]
    pub fn load_command(&self) -> &CommandObserver<()> {
        &self.load
    }

    #[must_use]
    pub fn save_command(&self) -> &CommandObserver<()> {
        &self.save
    }

    #[must_use]
    pub fn provider(&self) -> &PropertyProvider<Self> {
        &self.provider
    }

    #[must_use]
    pub fn bus(&self) -> &MessageBus {
        &self.bus
    }
}

impl MessageSource for MessageViewModel {
    fn message(&self) -> String {
        self.message.get()
    }

    fn set_message(&self, text: String) -> bool {
        self.message.set(text)
    }
}
