//! A scripted user session against the message view model.

use std::sync::{Arc, mpsc};

use bindery::prelude::*;

use crate::config::{DemoConfig, Dispatch};
use crate::dialog::{DialogPresenter, bind_dialogs};
use crate::error::{DemoError, Result};
use crate::view_model::{MessageSource, MessageViewModel};

/// One simulated user action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    ClickLoad,
    ClickSave,
    Type(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepOutcome {
    pub step: Step,
    /// Whether the action had an effect: an enabled command ran, or the text
    /// changed.
    pub accepted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionReport {
    pub outcomes: Vec<StepOutcome>,
    pub final_message: String,
}

impl SessionReport {
    #[must_use]
    pub fn accepted(&self) -> usize {
        self.outcomes.iter().filter(|o| o.accepted).count()
    }
}

/// Load, try to save while empty, type, then save.
#[must_use]
pub fn scripted_session() -> Vec<Step> {
    vec![
        Step::ClickLoad,
        Step::ClickSave,
        Step::Type("hello".to_string()),
        Step::ClickSave,
    ]
}

/// Apply `steps` in order on the calling thread.
pub fn play(vm: &MessageViewModel, steps: &[Step]) -> Vec<StepOutcome> {
    steps
        .iter()
        .map(|step| {
            let accepted = match step {
                Step::ClickLoad => vm.load_command().request_execute(()),
                Step::ClickSave => vm.save_command().request_execute(()),
                Step::Type(text) => vm.set_message(text.clone()),
            };
            tracing::info!(?step, accepted, "step");
            StepOutcome {
                step: step.clone(),
                accepted,
            }
        })
        .collect()
}

/// Wire bus, dialogs and view model per `config`, then play `steps` on the
/// GUI context the way input events would arrive there.
///
/// # Errors
///
/// - [`DemoError::ContextThread`] if the GUI thread cannot start.
/// - [`DemoError::Bind`] if the view model cannot be built.
/// - [`DemoError::SessionLost`] if the GUI context goes away mid-session.
pub fn run(
    config: &DemoConfig,
    presenter: Arc<dyn DialogPresenter>,
    steps: Vec<Step>,
) -> Result<SessionReport> {
    let bus = MessageBus::new();
    bus.on_fault(|fault| tracing::warn!(%fault, "bus handler failed"));

    let gui = match config.dispatch {
        Dispatch::Context => Some(
            ContextThread::spawn(config.context_name.as_str()).map_err(|source| {
                DemoError::ContextThread {
                    name: config.context_name.clone(),
                    source,
                }
            })?,
        ),
        Dispatch::Immediate => None,
    };
    let scheduler = gui
        .as_ref()
        .map_or_else(ImmediateScheduler::shared, ContextThread::shared);
    tracing::info!(dispatch = ?config.dispatch, context = scheduler.name(), "session starting");

    let _dialogs = bind_dialogs(&bus, &scheduler, presenter);
    let vm = MessageViewModel::new(bus.clone(), Arc::clone(&scheduler))?;

    let (done, outcome) = mpsc::channel();
    let session_vm = Arc::clone(&vm);
    scheduler
        .schedule(Box::new(move || {
            let _ = done.send(play(&session_vm, &steps));
        }))
        .map_err(|err| DemoError::SessionLost(err.context().to_string()))?;
    let outcomes = outcome
        .recv()
        .map_err(|_| DemoError::SessionLost(scheduler.name().to_string()))?;

    let report = SessionReport {
        outcomes,
        final_message: vm.message(),
    };
    if let Some(gui) = gui {
        gui.shutdown();
    }
    Ok(report)
}
