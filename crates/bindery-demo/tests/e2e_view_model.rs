//! Full demo wiring with a real GUI context thread.

use std::sync::{Arc, Mutex};
use std::thread;

use bindery::prelude::*;
use bindery_demo::{
    DemoConfig, Dispatch, MessageSource, MessageViewModel, RecordingDialog, Step,
    bind_dialogs, run, scripted_session,
};

#[test]
fn context_session_shows_dialogs_on_the_gui_thread() {
    let config = DemoConfig {
        dispatch: Dispatch::Context,
        context_name: "e2e-gui".to_string(),
        ..DemoConfig::default()
    };
    let dialog = Arc::new(RecordingDialog::new());
    let report = run(&config, dialog.clone(), scripted_session()).unwrap();

    assert_eq!(report.final_message, "Clicked !!!");
    let accepted: Vec<_> = report.outcomes.iter().map(|o| o.accepted).collect();
    assert_eq!(accepted, vec![true, false, true, true]);
    assert_eq!(
        dialog.entries(),
        vec![
            ("load has been clicked".to_string(), Some("e2e-gui".to_string())),
            ("msg1 published".to_string(), Some("e2e-gui".to_string())),
        ]
    );
}

#[test]
fn clearing_the_message_disables_save_again() {
    let config = DemoConfig {
        dispatch: Dispatch::Immediate,
        ..DemoConfig::default()
    };
    let dialog = Arc::new(RecordingDialog::new());
    let steps = vec![
        Step::Type("draft".into()),
        Step::Type(String::new()),
        Step::ClickSave,
    ];
    let report = run(&config, dialog.clone(), steps).unwrap();
    assert_eq!(report.accepted(), 2);
    assert_eq!(report.final_message, "");
    assert!(dialog.texts().is_empty());
}

#[test]
fn worker_edits_reach_gui_subscribers_in_order() {
    let gui = ContextThread::spawn("e2e-edits").unwrap();
    let bus = MessageBus::new();
    let vm = MessageViewModel::new(bus.clone(), gui.shared()).unwrap();
    let dialog = Arc::new(RecordingDialog::new());
    let _dialogs = bind_dialogs(&bus, &gui.shared(), dialog.clone());

    let seen = Arc::new(Mutex::new(Vec::new()));
    let s = Arc::clone(&seen);
    let _sub = vm.message_property().subscribe(move |text| {
        s.lock()
            .unwrap()
            .push((text.clone(), thread::current().name().map(str::to_string)));
    });

    let worker_vm = Arc::clone(&vm);
    thread::spawn(move || {
        for text in ["a", "b", "c"] {
            worker_vm.set_message(text.to_string());
        }
    })
    .join()
    .unwrap();

    gui.shutdown();

    let seen = seen.lock().unwrap();
    let texts: Vec<_> = seen.iter().map(|(t, _)| t.as_str()).collect();
    assert_eq!(texts, vec!["a", "b", "c"]);
    assert!(seen.iter().all(|(_, on)| on.as_deref() == Some("e2e-edits")));
    assert!(dialog.texts().is_empty());
    assert_eq!(vm.message(), "c");
}
