//! The event dispatch loop and the listener-facing event vocabulary.
//!
//! One dedicated thread drains the adapter's event queue for the whole life
//! of the session; it is the only code that ever sees raw protocol events.
//! Each batch is dispatched in arrival order, each handler states explicitly
//! whether the reporting thread must be resumed after handling, and a fault
//! in one handler is recorded and surfaced to the next caller operation
//! instead of killing the loop.

use std::sync::Arc;

use javelin_jdi::{
    ClassRef, Location, RequestId, StepDepth, ThreadId, VmConnection, VmError, VmEvent,
};

use crate::action::{BreakpointInfo, ResolveOutcome};
use crate::error::{swallow_stale, DebugError};
use crate::session::{SessionInner, SessionState};
use crate::source::{SourceDescriptor, SourceLocation};

/// Everything the session broadcasts to registered listeners.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DebugEvent {
    SessionStarted,
    SessionShutdown,
    BreakpointSet(BreakpointInfo),
    BreakpointReached {
        breakpoint: BreakpointInfo,
        thread: ThreadId,
    },
    BreakpointRemoved(BreakpointInfo),
    StepRequested {
        thread: ThreadId,
        depth: StepDepth,
    },
    ThreadSuspended {
        thread: ThreadId,
    },
    ThreadResumed {
        thread: ThreadId,
    },
    ThreadStarted {
        thread: ThreadId,
    },
    /// The thread the session was waiting on (mid-step) died before stopping
    /// again.
    CurrentThreadDied {
        thread: ThreadId,
    },
    /// A thread the session was not waiting on died. Informational.
    ThreadDied {
        thread: ThreadId,
    },
    CurrentThreadChanged {
        thread: Option<ThreadId>,
    },
}

pub trait DebugListener: Send + Sync {
    fn on_event(&self, event: &DebugEvent);
}

impl<F> DebugListener for F
where
    F: Fn(&DebugEvent) + Send + Sync,
{
    fn on_event(&self, event: &DebugEvent) {
        self(event)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum LoopMode {
    Running,
    /// The queue read failed mid-stream; ignore everything except terminal
    /// events so the loop can still end cleanly.
    DrainingExitEventsOnly,
    Stopped,
}

/// What one event handler decided, beyond its state mutations.
#[derive(Default)]
struct Handled {
    events: Vec<DebugEvent>,
    scroll: Option<SourceLocation>,
    /// Thread to resume once handling is done. An explicit return value so
    /// the loop's transitions stay visible in one place.
    resume_after: Option<ThreadId>,
}

pub(crate) fn run_event_loop<V: VmConnection>(inner: Arc<SessionInner<V>>) {
    let mut mode = LoopMode::Running;
    tracing::debug!("event dispatch loop started");

    while mode != LoopMode::Stopped {
        let batch = match inner.vm.next_events() {
            Ok(batch) => batch,
            Err(VmError::Disconnected) => {
                if mode == LoopMode::Running {
                    tracing::warn!("event read failed mid-stream; draining exit events only");
                    mode = LoopMode::DrainingExitEventsOnly;
                    continue;
                }
                // Already draining and the queue failed again: no terminal
                // event is coming, finish the shutdown ourselves.
                handle_exit(inner.as_ref(), None);
                mode = LoopMode::Stopped;
                continue;
            }
            Err(err) => {
                inner.record_loop_fault(format!("event queue read failed: {err}"));
                continue;
            }
        };

        // Events within one delivered batch are processed strictly in the
        // order received.
        for event in batch {
            if mode == LoopMode::DrainingExitEventsOnly && !event.is_exit() {
                continue;
            }
            if event.is_exit() {
                handle_exit(inner.as_ref(), Some(&event));
                mode = LoopMode::Stopped;
                break;
            }
            dispatch_one(inner.as_ref(), event);
        }
    }

    tracing::debug!("event dispatch loop stopped");
}

fn dispatch_one<V: VmConnection>(inner: &SessionInner<V>, event: VmEvent) {
    let handled = {
        let mut guard = inner.state.lock();
        let state = &mut *guard;
        match handle_event(inner, state, &event) {
            Ok(handled) => handled,
            Err(err) => {
                // One malformed event must not kill the loop or silently
                // desynchronize state.
                let message = format!("error dispatching {event:?}: {err}");
                tracing::error!("{message}");
                state.record_fault(message);
                Handled::default()
            }
        }
    };

    if let Some(thread) = handled.resume_after {
        swallow_stale(inner.vm.resume_thread(thread), "post-event resume");
    }
    if let Some(location) = &handled.scroll {
        inner.scroll(location, true);
    }
    inner.fan_out(&handled.events);
}

fn handle_event<V: VmConnection>(
    inner: &SessionInner<V>,
    state: &mut SessionState,
    event: &VmEvent,
) -> Result<Handled, DebugError> {
    match event {
        VmEvent::BreakpointHit {
            request,
            thread,
            location,
        } => handle_stop(inner, state, *thread, Some(*request), location),
        VmEvent::StepCompleted {
            request,
            thread,
            location,
        } => {
            // One-shot: the fired step request never outlives its stop.
            state.remove_step_action_by_request(inner.vm.as_ref(), *request);
            handle_stop(inner, state, *thread, None, location)
        }
        VmEvent::ClassPrepared { thread, class } => {
            handle_class_prepared(inner, state, *thread, class)
        }
        VmEvent::ThreadStarted { thread } => Ok(Handled {
            events: vec![DebugEvent::ThreadStarted { thread: *thread }],
            ..Handled::default()
        }),
        VmEvent::ThreadDied { thread } => handle_thread_died(inner, state, *thread),
        // Terminal events are intercepted by the loop before dispatch.
        VmEvent::VmDied | VmEvent::VmDisconnected => Ok(Handled::default()),
    }
}

/// Breakpoint hit or step completed: make the reporting thread current and
/// give it an interpreter context.
fn handle_stop<V: VmConnection>(
    inner: &SessionInner<V>,
    state: &mut SessionState,
    thread: ThreadId,
    hit_request: Option<RequestId>,
    location: &Location,
) -> Result<Handled, DebugError> {
    let vm = inner.vm.as_ref();

    // The protocol can deliver stale stop events while racing thread death;
    // act only when the thread is really suspended and has frames. A thread
    // with no frames cannot anchor a lexical context, so it must not become
    // current either.
    let suspended = vm.suspend_count(thread).map(|count| count > 0).unwrap_or(false);
    let has_frames = suspended && !vm.frames(thread).unwrap_or_default().is_empty();
    if !suspended || !has_frames {
        tracing::warn!(thread, "stop event for a thread without frames; resuming it");
        return Ok(Handled {
            resume_after: Some(thread),
            ..Handled::default()
        });
    }

    if state.running_thread == Some(thread) {
        state.running_thread = None;
    }
    state.stack.set_current(thread);

    match state
        .contexts
        .create(vm, thread, inner.config.collected_retries)
    {
        Ok(_) => {}
        Err(err) => {
            // Expected-race escalation or partial debug info: the stop still
            // stands, just without an evaluation context.
            tracing::warn!(thread, "failed to build interpreter context: {err}");
        }
    }
    state.refresh_watches();

    let mut events = Vec::new();
    let mut descriptor = SourceDescriptor::Class(location.class_name.clone());
    let mut line = location.line;
    if let Some(request) = hit_request {
        if let Some(info) = state.breakpoint_for_request(request) {
            descriptor = SourceDescriptor::Document(info.document);
            line = info.line;
            events.push(DebugEvent::BreakpointReached {
                breakpoint: info,
                thread,
            });
        }
    }
    events.push(DebugEvent::ThreadSuspended { thread });
    events.push(DebugEvent::CurrentThreadChanged {
        thread: Some(thread),
    });

    Ok(Handled {
        events,
        scroll: Some(SourceLocation { descriptor, line }),
        resume_after: None,
    })
}

/// A watched class loaded: resolve everything parked on it, then resume the
/// reporting thread — it was suspended solely to deliver the notification,
/// never to stop at user code.
fn handle_class_prepared<V: VmConnection>(
    inner: &SessionInner<V>,
    state: &mut SessionState,
    thread: ThreadId,
    class: &ClassRef,
) -> Result<Handled, DebugError> {
    let vm = inner.vm.as_ref();
    let waiting = state.pending.on_class_prepared(vm, class);
    let mut failures = Vec::new();
    let mut events = Vec::new();

    for id in waiting {
        let Some(action) = state.actions.get_mut(&id) else {
            continue;
        };
        match action.create_requests(vm, std::slice::from_ref(class)) {
            Ok(ResolveOutcome::Created) => {}
            Ok(ResolveOutcome::Pending) => {
                // The exact (inner) class this action wants has still not
                // loaded; park it again.
                let class_name = action.as_breakpoint().map(|bp| bp.class_name.clone());
                if let Some(class_name) = class_name {
                    if let Err(err) = state.pending.register(vm, &class_name, id) {
                        failures.push(format!("could not re-register pending action: {err}"));
                    }
                }
            }
            Ok(ResolveOutcome::NoExecutableLine) => {
                // The line does not exist in the loaded type, so this action
                // can never bind. Error it out alone; its batch siblings
                // still resolve.
                if let Some(mut removed) = state.actions.shift_remove(&id) {
                    removed.clear_requests(vm);
                    if let Some(bp) = removed.as_breakpoint() {
                        failures.push(format!(
                            "no executable code at line {} in class {}",
                            bp.common.line.unwrap_or_default(),
                            bp.target_class()
                        ));
                        events.push(DebugEvent::BreakpointRemoved(BreakpointInfo::from(bp)));
                    }
                }
            }
            Err(VmError::Disconnected) => {
                tracing::debug!("target disconnected during pending resolution");
                break;
            }
            Err(err) => failures.push(err.to_string()),
        }
    }

    if !failures.is_empty() {
        state.record_fault(DebugError::ResolutionBatch { failures }.to_string());
    }

    Ok(Handled {
        events,
        scroll: None,
        resume_after: Some(thread),
    })
}

fn handle_thread_died<V: VmConnection>(
    inner: &SessionInner<V>,
    state: &mut SessionState,
    thread: ThreadId,
) -> Result<Handled, DebugError> {
    let vm = inner.vm.as_ref();
    let mut events = Vec::new();

    if state.running_thread == Some(thread) {
        // Died mid-step: the step will never complete.
        state.running_thread = None;
        state.remove_step_actions_for(vm, thread);
        events.push(DebugEvent::CurrentThreadDied { thread });
    } else {
        if state.stack.contains(thread) {
            // A tracked suspended thread should not die, but the target has
            // the last word.
            let was_current = state.stack.current() == Some(thread);
            state.stack.remove(thread);
            state.contexts.dispose(thread);
            if was_current {
                events.push(DebugEvent::CurrentThreadChanged {
                    thread: state.stack.current(),
                });
                state.refresh_watches();
            }
        }
        events.push(DebugEvent::ThreadDied { thread });
    }

    // The dying thread is still resumed so it can finish unwinding.
    Ok(Handled {
        events,
        scroll: None,
        resume_after: Some(thread),
    })
}

/// The target died or disconnected: tear down all suspended-thread state and
/// shut the session down. Idempotent against a caller-initiated shutdown that
/// already ran.
fn handle_exit<V: VmConnection>(inner: &SessionInner<V>, event: Option<&VmEvent>) {
    tracing::info!(?event, "target process gone; shutting down the session");
    let events = {
        let mut guard = inner.state.lock();
        let state = &mut *guard;
        if state.active {
            inner.teardown(state)
        } else {
            Vec::new()
        }
    };
    inner.fan_out(&events);
}
