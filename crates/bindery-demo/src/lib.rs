//! Demo consumer for bindery: a message view model whose commands publish
//! announcements that a dialog presenter shows on the GUI context.

pub mod config;
pub mod dialog;
pub mod error;
pub mod session;
pub mod view_model;

pub use config::{DemoConfig, Dispatch};
pub use dialog::{DialogPresenter, LogDialog, RecordingDialog, bind_dialogs};
pub use error::{DemoError, Result};
pub use session::{SessionReport, Step, StepOutcome, play, run, scripted_session};
pub use view_model::{MessageSource, MessageViewModel, Msg1, Msg2};
