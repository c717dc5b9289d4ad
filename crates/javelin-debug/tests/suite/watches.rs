use javelin_debug::{DebugEvent, WatchValue};
use javelin_jdi::mock::MockFrame;
use javelin_jdi::Value;

use crate::suite::harness::{started, FakeDocument, Fixture};

fn stop_with_local(f: &Fixture, name: &str, value: Value) -> u64 {
    f.vm.add_class("com.example.Main", &[5]);
    let doc = FakeDocument::new(1, "com.example.Main");
    f.session.toggle_breakpoint(&doc, 0, 5).unwrap();
    let request = f.vm.breakpoint_request_at("com.example.Main", 5).unwrap();

    let main = f.vm.add_thread("main");
    f.vm.set_frames(
        main,
        vec![MockFrame::new("com.example.Main", "foo", 5).with_local(name, value)],
    );
    f.vm.hit_breakpoint(request, main);
    f.events.wait_for("thread suspended", |e| {
        matches!(e, DebugEvent::ThreadSuspended { .. })
    });
    main
}

#[test]
fn a_watch_added_without_a_suspension_reports_the_hidden_value() {
    let f = started();
    f.session.add_watch("x").unwrap();

    let watches = f.session.watches().unwrap();
    assert_eq!(watches[0].name, "x");
    assert_eq!(watches[0].value, WatchValue::NoCurrentThread);
    assert!(!watches[0].changed);
}

#[test]
fn after_a_suspension_a_watch_is_concrete_or_absent_never_both() {
    let f = started();
    stop_with_local(&f, "x", Value::Int(7));

    f.session.add_watch("x").unwrap();
    f.session.add_watch("missing").unwrap();

    let watches = f.session.watches().unwrap();
    assert_eq!(
        watches[0].value,
        WatchValue::Known {
            rendered: "7".to_string(),
            type_name: Some("int".to_string()),
        }
    );
    assert_eq!(watches[1].value, WatchValue::NotInScope);
}

#[test]
fn resuming_hides_watches_again() {
    let f = started();
    stop_with_local(&f, "x", Value::Int(7));
    f.session.add_watch("x").unwrap();

    f.session.resume().unwrap();
    let watches = f.session.watches().unwrap();
    assert_eq!(watches[0].value, WatchValue::NoCurrentThread);
}

#[test]
fn the_changed_flag_tracks_concrete_value_transitions_only() {
    let f = started();
    stop_with_local(&f, "x", Value::Int(1));

    // First concrete read: not a change, there was no previous value.
    f.session.add_watch("x").unwrap();
    let watches = f.session.watches().unwrap();
    assert!(!watches[0].changed);

    // A mutation is a change.
    f.session.set_binding("x", Value::Int(2)).unwrap();
    let watches = f.session.watches().unwrap();
    assert_eq!(
        watches[0].value,
        WatchValue::Known {
            rendered: "2".to_string(),
            type_name: Some("int".to_string()),
        }
    );
    assert!(watches[0].changed);

    // A re-read of the same value is not.
    f.session.add_watch("y").unwrap();
    let watches = f.session.watches().unwrap();
    assert!(!watches[0].changed);
}

#[test]
fn watches_render_objects_with_their_runtime_type() {
    let f = started();
    let list = f.vm.add_object("java.util.ArrayList", vec![]);
    f.vm.add_class("com.example.Main", &[5]);
    let doc = FakeDocument::new(1, "com.example.Main");
    f.session.toggle_breakpoint(&doc, 0, 5).unwrap();
    let request = f.vm.breakpoint_request_at("com.example.Main", 5).unwrap();

    let main = f.vm.add_thread("main");
    f.vm.set_frames(
        main,
        vec![MockFrame::new("com.example.Main", "foo", 5).with_typed_local(
            "items",
            Value::Object(javelin_jdi::ObjectRef {
                id: list,
                runtime_type: "java.util.ArrayList".to_string(),
            }),
            "java.util.List",
        )],
    );
    f.vm.hit_breakpoint(request, main);
    f.events.wait_for("thread suspended", |e| {
        matches!(e, DebugEvent::ThreadSuspended { .. })
    });

    f.session.add_watch("items").unwrap();
    let watches = f.session.watches().unwrap();
    match &watches[0].value {
        WatchValue::Known {
            rendered,
            type_name,
        } => {
            assert_eq!(rendered, &format!("ArrayList@{list}"));
            // The declared type wins over the runtime type for display.
            assert_eq!(type_name.as_deref(), Some("java.util.List"));
        }
        other => panic!("expected a concrete watch value, got {other:?}"),
    }
}

#[test]
fn a_stop_without_debug_information_marks_watches_unavailable() {
    let f = started();
    f.vm.add_class("com.example.Main", &[5]);
    let doc = FakeDocument::new(1, "com.example.Main");
    f.session.toggle_breakpoint(&doc, 0, 5).unwrap();
    let request = f.vm.breakpoint_request_at("com.example.Main", 5).unwrap();

    let main = f.vm.add_thread("main");
    // Frames exist, but the stop location carries no line information.
    f.vm.set_frames(main, vec![MockFrame::new("com.example.Main", "foo", None)]);
    f.vm.hit_breakpoint(request, main);
    f.events.wait_for("thread suspended", |e| {
        matches!(e, DebugEvent::ThreadSuspended { .. })
    });

    f.session.add_watch("x").unwrap();
    assert_eq!(f.session.watches().unwrap()[0].value, WatchValue::NotInScope);
    // Watch evaluation degrades; it does not fail the session.
    assert!(f.session.current_thread().is_ok());
}

#[test]
fn remove_and_remove_all_watches() {
    let f = started();
    f.session.add_watch("a").unwrap();
    f.session.add_watch("b").unwrap();
    f.session.add_watch("c").unwrap();

    f.session.remove_watch("b").unwrap();
    let names: Vec<String> = f
        .session
        .watches()
        .unwrap()
        .into_iter()
        .map(|w| w.name)
        .collect();
    assert_eq!(names, vec!["a", "c"]);

    f.session.remove_all_watches().unwrap();
    assert!(f.session.watches().unwrap().is_empty());
}
