use javelin_debug::{DebugError, DebugEvent, DocumentView};

use crate::suite::harness::{fixture, started, FakeDocument};

#[test]
fn toggle_sets_then_removes() {
    let f = started();
    f.vm.add_class("com.example.Main", &[10, 11]);
    let doc = FakeDocument::new(1, "com.example.Main");

    f.session.toggle_breakpoint(&doc, 120, 10).unwrap();
    let request = f
        .vm
        .breakpoint_request_at("com.example.Main", 10)
        .expect("breakpoint request installed");
    f.events
        .wait_for("breakpoint set", |e| matches!(e, DebugEvent::BreakpointSet(_)));
    assert_eq!(f.session.breakpoints().unwrap().len(), 1);

    f.session.toggle_breakpoint(&doc, 120, 10).unwrap();
    f.events.wait_for("breakpoint removed", |e| {
        matches!(e, DebugEvent::BreakpointRemoved(_))
    });
    assert!(f.vm.cleared_requests().contains(&request));
    assert!(f.session.breakpoints().unwrap().is_empty());
}

#[test]
fn toggling_off_then_on_restores_an_equivalent_resolved_state() {
    let f = started();
    f.vm.add_class("com.example.Main", &[10]);
    let doc = FakeDocument::new(1, "com.example.Main");

    f.session.toggle_breakpoint(&doc, 0, 10).unwrap();
    let first = f.vm.breakpoint_request_at("com.example.Main", 10).unwrap();
    let before = f.session.breakpoints().unwrap();

    f.session.toggle_breakpoint(&doc, 0, 10).unwrap();
    f.session.toggle_breakpoint(&doc, 0, 10).unwrap();

    let second = f.vm.breakpoint_request_at("com.example.Main", 10).unwrap();
    let after = f.session.breakpoints().unwrap();

    // Equivalent, though not identical: same resolved description, fresh
    // underlying request.
    assert_eq!(before, after);
    assert!(after[0].resolved);
    assert_ne!(first, second);
}

#[test]
fn one_request_per_loaded_copy_of_the_class() {
    let f = started();
    f.vm.add_class("com.example.Main", &[10]);
    f.vm.add_class("com.example.Main", &[10]);
    let doc = FakeDocument::new(1, "com.example.Main");

    f.session.toggle_breakpoint(&doc, 0, 10).unwrap();
    assert_eq!(f.vm.active_breakpoint_requests(), 2);
}

#[test]
fn no_executable_line_is_a_distinguished_error() {
    let f = started();
    f.vm.add_class("com.example.Main", &[10]);
    let doc = FakeDocument::new(1, "com.example.Main");

    let err = f.session.toggle_breakpoint(&doc, 0, 99).unwrap_err();
    assert!(matches!(
        err,
        DebugError::NoExecutableLine { line: 99, .. }
    ));
    assert!(f.session.breakpoints().unwrap().is_empty());
    f.events.settle();
    f.events
        .assert_none("breakpoint set", |e| matches!(e, DebugEvent::BreakpointSet(_)));
}

#[test]
fn disable_propagates_to_every_underlying_request() {
    let f = started();
    f.vm.add_class("com.example.Main", &[10]);
    let doc = FakeDocument::new(1, "com.example.Main");

    f.session.toggle_breakpoint(&doc, 0, 10).unwrap();
    let request = f.vm.breakpoint_request_at("com.example.Main", 10).unwrap();

    f.session
        .set_breakpoint_enabled(doc.id(), 10, false)
        .unwrap();
    assert_eq!(f.vm.request_enabled(request), Some(false));

    f.session
        .set_breakpoint_enabled(doc.id(), 10, true)
        .unwrap();
    assert_eq!(f.vm.request_enabled(request), Some(true));
}

#[test]
fn closing_a_document_removes_each_owned_breakpoint_exactly_once() {
    let f = started();
    f.vm.add_class("com.example.Main", &[10, 11]);
    f.vm.add_class("com.example.Other", &[5]);
    let doc = FakeDocument::new(1, "com.example.Main");
    let other = FakeDocument::new(2, "com.example.Other");

    f.session.toggle_breakpoint(&doc, 0, 10).unwrap();
    f.session.toggle_breakpoint(&doc, 0, 11).unwrap();
    f.session.toggle_breakpoint(&other, 0, 5).unwrap();

    f.session.document_closed(doc.id()).unwrap();
    f.events.settle();
    assert_eq!(
        f.events
            .count(|e| matches!(e, DebugEvent::BreakpointRemoved(info) if info.document == doc.id())),
        2
    );

    let remaining = f.session.breakpoints().unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].document, other.id());
}

#[test]
fn operations_on_an_inactive_session_are_programming_errors() {
    let f = fixture();
    let doc = FakeDocument::new(1, "com.example.Main");
    assert!(matches!(
        f.session.toggle_breakpoint(&doc, 0, 10),
        Err(DebugError::Inactive)
    ));
    assert!(matches!(f.session.resume(), Err(DebugError::Inactive)));
    assert!(matches!(f.session.watches(), Err(DebugError::Inactive)));
}

#[test]
fn setting_a_breakpoint_on_a_dead_target_reports_the_disconnect() {
    let f = started();
    f.vm.add_class("com.example.Main", &[10]);
    let doc = FakeDocument::new(1, "com.example.Main");

    // The target died but the death notification has not arrived yet; this
    // operation must report failure rather than pretend the breakpoint set.
    f.vm.sever_control();
    assert!(matches!(
        f.session.toggle_breakpoint(&doc, 0, 10),
        Err(DebugError::Disconnected)
    ));
}
