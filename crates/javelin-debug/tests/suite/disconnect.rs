use javelin_debug::{DebugError, DebugEvent};
use javelin_jdi::mock::MockFrame;
use javelin_jdi::VmEvent;

use crate::suite::harness::{started, FakeDocument};

#[test]
fn target_death_tears_the_session_down() {
    let f = started();
    f.vm.add_class("com.example.Main", &[5]);
    let doc = FakeDocument::new(1, "com.example.Main");
    f.session.toggle_breakpoint(&doc, 0, 5).unwrap();

    let main = f.vm.add_thread("main");
    f.vm.set_frames(main, vec![MockFrame::new("com.example.Main", "foo", 5)]);
    let request = f.vm.breakpoint_request_at("com.example.Main", 5).unwrap();
    f.vm.hit_breakpoint(request, main);
    f.events.wait_for("thread suspended", |e| {
        matches!(e, DebugEvent::ThreadSuspended { .. })
    });

    f.vm.kill_vm();
    f.events.wait_for("session shutdown", |e| {
        matches!(e, DebugEvent::SessionShutdown)
    });
    f.events.settle();
    // The breakpoint table was emptied on the way down.
    assert_eq!(
        f.events
            .count(|e| matches!(e, DebugEvent::BreakpointRemoved(_))),
        1
    );

    assert!(!f.session.is_active());
    assert!(matches!(f.session.resume(), Err(DebugError::Inactive)));
}

#[test]
fn caller_shutdown_is_clean_and_double_shutdown_is_guarded() {
    let f = started();
    f.session.add_watch("x").unwrap();

    f.session.shutdown().unwrap();
    f.events.wait_for("session shutdown", |e| {
        matches!(e, DebugEvent::SessionShutdown)
    });
    assert!(!f.session.is_active());

    // Idempotence is provided by the ready-check, not by silent success.
    assert!(matches!(f.session.shutdown(), Err(DebugError::Inactive)));
}

#[test]
fn a_mid_read_disconnect_drains_exit_events_only() {
    let f = started();
    let bystander = f.vm.add_thread("bystander");

    // The queue read fails once, mid-stream. Everything after it except
    // death/disconnect events must be ignored so the loop can still end
    // cleanly.
    f.vm.emit_read_error();
    f.vm.emit(vec![VmEvent::ThreadStarted { thread: bystander }]);
    f.vm.emit(vec![VmEvent::VmDied]);

    f.events.wait_for("session shutdown", |e| {
        matches!(e, DebugEvent::SessionShutdown)
    });
    f.events.settle();
    f.events.assert_none("event dispatched while draining", |e| {
        matches!(e, DebugEvent::ThreadStarted { .. })
    });
    assert!(!f.session.is_active());
}

#[test]
fn a_disconnect_with_no_terminal_event_still_stops_the_loop() {
    let f = started();

    // Two consecutive failed reads: the drain mode gives up and finishes the
    // shutdown itself.
    f.vm.emit_read_error();
    f.vm.emit_read_error();

    f.events.wait_for("session shutdown", |e| {
        matches!(e, DebugEvent::SessionShutdown)
    });
    assert!(!f.session.is_active());
}

#[test]
fn resuming_a_thread_on_a_dead_target_is_benign() {
    let f = started();
    f.vm.add_class("com.example.Main", &[5]);
    let doc = FakeDocument::new(1, "com.example.Main");
    f.session.toggle_breakpoint(&doc, 0, 5).unwrap();

    let main = f.vm.add_thread("main");
    f.vm.set_frames(main, vec![MockFrame::new("com.example.Main", "foo", 5)]);
    let request = f.vm.breakpoint_request_at("com.example.Main", 5).unwrap();
    f.vm.hit_breakpoint(request, main);
    f.events.wait_for("thread suspended", |e| {
        matches!(e, DebugEvent::ThreadSuspended { .. })
    });

    // The target dies under us without the session noticing yet; resume must
    // treat the dead target as benign rather than fail the operation.
    f.vm.sever_control();
    f.session.resume().unwrap();
    assert!(matches!(
        f.session.current_thread(),
        Err(DebugError::NoSuspendedThread)
    ));
}
