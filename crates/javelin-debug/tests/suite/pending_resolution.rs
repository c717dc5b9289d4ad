use javelin_debug::{DebugError, DebugEvent};

use crate::suite::harness::{started, wait_until, FakeDocument};

#[test]
fn breakpoint_on_an_unloaded_class_resolves_when_it_prepares() {
    let f = started();
    let doc = FakeDocument::new(1, "com.example.Later");

    f.session.toggle_breakpoint(&doc, 0, 12).unwrap();
    f.events
        .wait_for("breakpoint set", |e| matches!(e, DebugEvent::BreakpointSet(_)));
    assert_eq!(f.vm.class_prepare_patterns(), vec!["com.example.Later*"]);
    assert!(f.vm.breakpoint_request_at("com.example.Later", 12).is_none());

    let loader = f.vm.add_thread("class-loader");
    f.vm.prepare_class(loader, "com.example.Later", &[12, 13]);

    wait_until("pending breakpoint resolves", || {
        f.vm.breakpoint_request_at("com.example.Later", 12).is_some()
    });
    // The class watch is torn down and the reporting thread resumed: it was
    // suspended solely to deliver the notification.
    wait_until("class watch torn down", || {
        f.vm.class_prepare_patterns().is_empty()
    });
    wait_until("loader thread resumed", || f.vm.resume_calls(loader) == 1);

    assert!(f.session.breakpoints().unwrap()[0].resolved);
}

#[test]
fn batch_resolution_reports_one_aggregate_error_and_spares_siblings() {
    let f = started();
    let doc = FakeDocument::new(1, "com.example.Later");

    f.session.toggle_breakpoint(&doc, 0, 12).unwrap();
    f.session.toggle_breakpoint(&doc, 0, 99).unwrap();

    let loader = f.vm.add_thread("class-loader");
    f.vm.prepare_class(loader, "com.example.Later", &[12, 13]);

    // The sibling still resolves even though line 99 cannot.
    wait_until("resolvable sibling resolves", || {
        f.vm.breakpoint_request_at("com.example.Later", 12).is_some()
    });
    f.events.wait_for("unresolvable breakpoint removed", |e| {
        matches!(e, DebugEvent::BreakpointRemoved(info) if info.line == 99)
    });

    // The aggregate failure surfaces on the next caller operation, once.
    let err = f.session.breakpoints().unwrap_err();
    match err {
        DebugError::EventLoop(message) => assert!(message.contains("99"), "{message}"),
        other => panic!("expected an event-loop fault, got {other:?}"),
    }

    // ...and exactly once.
    let remaining = f.session.breakpoints().unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].line, 12);
}

#[test]
fn deregistering_every_pending_action_tears_down_the_watch_before_load() {
    let f = started();
    let doc = FakeDocument::new(1, "com.example.Later");

    f.session.toggle_breakpoint(&doc, 0, 12).unwrap();
    assert_eq!(f.vm.class_prepare_patterns().len(), 1);

    f.session.toggle_breakpoint(&doc, 0, 12).unwrap();
    assert!(f.vm.class_prepare_patterns().is_empty());

    // A later load of the class finds nothing pending and installs nothing.
    let loader = f.vm.add_thread("class-loader");
    f.vm.prepare_class(loader, "com.example.Later", &[12]);
    wait_until("loader thread resumed", || f.vm.resume_calls(loader) == 1);
    assert!(f.vm.breakpoint_request_at("com.example.Later", 12).is_none());
    assert!(f.session.breakpoints().unwrap().is_empty());
}

#[test]
fn a_load_of_an_unrelated_class_sharing_the_prefix_is_ignored() {
    let f = started();
    let doc = FakeDocument::new(1, "com.example.Foo");
    f.session.toggle_breakpoint(&doc, 0, 7).unwrap();

    let loader = f.vm.add_thread("class-loader");
    f.vm.prepare_class(loader, "com.example.Foo2", &[7]);
    wait_until("loader thread resumed", || f.vm.resume_calls(loader) == 1);

    // Still pending, watch still armed, nothing installed anywhere.
    assert_eq!(f.vm.class_prepare_patterns(), vec!["com.example.Foo*"]);
    assert!(f.vm.breakpoint_request_at("com.example.Foo2", 7).is_none());
    assert!(!f.session.breakpoints().unwrap()[0].resolved);
}

#[test]
fn an_inner_class_breakpoint_waits_for_its_exact_class() {
    let f = started();
    let doc = FakeDocument::with_exact(1, "com.example.Outer", "com.example.Outer$Inner");
    f.session.toggle_breakpoint(&doc, 0, 21).unwrap();

    let loader = f.vm.add_thread("class-loader");
    // The outer class loading first is not enough.
    f.vm.prepare_class(loader, "com.example.Outer", &[21]);
    wait_until("loader resumed after outer load", || {
        f.vm.resume_calls(loader) == 1
    });
    assert!(f.vm.breakpoint_request_at("com.example.Outer", 21).is_none());
    assert_eq!(f.vm.class_prepare_patterns().len(), 1);

    f.vm.prepare_class(loader, "com.example.Outer$Inner", &[21]);
    wait_until("inner-class breakpoint resolves", || {
        f.vm
            .breakpoint_request_at("com.example.Outer$Inner", 21)
            .is_some()
    });

    // No fault was recorded along the way.
    assert!(f.session.breakpoints().unwrap()[0].resolved);
}
