//! The debug session façade.
//!
//! `DebugSession` coordinates the action model, pending registry,
//! suspended-thread stack, interpreter contexts, and watch store, and owns the
//! dedicated event-dispatch thread. It is generic over the adapter so the
//! whole engine runs unchanged against `javelin_jdi::mock::MockVm` in tests.
//!
//! Locking model: every piece of mutable session state sits in one
//! [`SessionState`] behind a single mutex, shared by caller threads and the
//! dispatch thread. Operations may hold that lock across adapter round-trips,
//! but never while waiting for an event only the dispatch thread can deliver
//! — events are collected under the lock and fanned out to listeners after it
//! is released.

use std::sync::Arc;
use std::thread;

use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};

use javelin_jdi::{
    RequestId, StepDepth, StepSize, SuspendPolicy, ThreadId, Value, VmConnection, VmError,
};

use crate::action::{
    ActionCommon, ActionId, Breakpoint, BreakpointInfo, DebugAction, ResolveOutcome, StepRequest,
};
use crate::context::ContextManager;
use crate::error::{swallow_stale, DebugError, DebugResult};
use crate::events::{run_event_loop, DebugEvent, DebugListener};
use crate::pending::{outer_class_name, PendingRequestRegistry};
use crate::source::{DocumentId, DocumentView, SourceDescriptor, SourceLocation, SourceNavigator};
use crate::stack::{DebugStackData, DebugThreadData, SuspendedThreadStack};
use crate::watch::{Watch, WatchStore};

/// Namespaces a source-level Java debugger steps over by default.
pub const DEFAULT_STEP_EXCLUDES: &[&str] = &["java.*", "javax.*", "sun.*", "com.sun.*", "jdk.*"];

#[derive(Clone, Debug)]
pub struct SessionConfig {
    /// Package-name globs whose code never stops a step.
    pub step_exclusion_filters: Vec<String>,
    /// How many times a visible-variable snapshot is retried when the target
    /// collects an ephemeral mirror mid-read. Adapters without that race can
    /// set this to 0.
    pub collected_retries: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            step_exclusion_filters: DEFAULT_STEP_EXCLUDES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            collected_retries: 3,
        }
    }
}

pub(crate) struct SessionState {
    pub(crate) active: bool,
    next_action: ActionId,
    pub(crate) actions: IndexMap<ActionId, DebugAction>,
    pub(crate) pending: PendingRequestRegistry,
    pub(crate) stack: SuspendedThreadStack,
    pub(crate) contexts: ContextManager,
    pub(crate) watches: WatchStore,
    /// Thread we released and expect back (mid-step). Its death is a
    /// "current thread died" condition; any other death is informational.
    pub(crate) running_thread: Option<ThreadId>,
    loop_fault: Option<String>,
}

impl SessionState {
    fn new() -> Self {
        Self {
            active: false,
            next_action: 0,
            actions: IndexMap::new(),
            pending: PendingRequestRegistry::new(),
            stack: SuspendedThreadStack::new(),
            contexts: ContextManager::new(),
            watches: WatchStore::new(),
            running_thread: None,
            loop_fault: None,
        }
    }

    /// Precondition of every public operation: session active, and any fault
    /// recorded by the dispatch loop surfaced exactly once, then cleared.
    fn ensure_ready(&mut self) -> DebugResult<()> {
        if !self.active {
            return Err(DebugError::Inactive);
        }
        if let Some(fault) = self.loop_fault.take() {
            return Err(DebugError::EventLoop(fault));
        }
        Ok(())
    }

    pub(crate) fn record_fault(&mut self, message: String) {
        // Keep the first fault until a caller drains it.
        if self.loop_fault.is_none() {
            self.loop_fault = Some(message);
        }
    }

    fn alloc_action_id(&mut self) -> ActionId {
        self.next_action += 1;
        self.next_action
    }

    pub(crate) fn refresh_watches(&mut self) {
        match self.stack.current() {
            Some(thread) => {
                let context = self.contexts.get(thread);
                self.watches.refresh(true, context);
            }
            None => self.watches.refresh(false, None),
        }
    }

    pub(crate) fn breakpoint_for_request(&self, request: RequestId) -> Option<BreakpointInfo> {
        self.actions.values().find_map(|action| match action {
            DebugAction::Breakpoint(bp) if bp.common.requests.contains(&request) => {
                Some(BreakpointInfo::from(bp))
            }
            _ => None,
        })
    }

    /// Drop every step action bound to `thread`, tearing down its requests.
    pub(crate) fn remove_step_actions_for<V: VmConnection>(&mut self, vm: &V, thread: ThreadId) {
        let ids: Vec<ActionId> = self
            .actions
            .iter()
            .filter_map(|(id, action)| match action {
                DebugAction::Step(step) if step.thread == thread => Some(*id),
                _ => None,
            })
            .collect();
        for id in ids {
            if let Some(mut action) = self.actions.shift_remove(&id) {
                action.clear_requests(vm);
            }
        }
    }

    /// Step requests fire exactly once; drop the action that owns the fired
    /// request.
    pub(crate) fn remove_step_action_by_request<V: VmConnection>(
        &mut self,
        vm: &V,
        request: RequestId,
    ) {
        let id = self.actions.iter().find_map(|(id, action)| match action {
            DebugAction::Step(step) if step.common.requests.contains(&request) => Some(*id),
            _ => None,
        });
        if let Some(id) = id {
            if let Some(mut action) = self.actions.shift_remove(&id) {
                action.clear_requests(vm);
            }
        }
    }
}

pub(crate) struct SessionInner<V: VmConnection> {
    pub(crate) vm: Arc<V>,
    pub(crate) config: SessionConfig,
    pub(crate) state: Mutex<SessionState>,
    listeners: RwLock<Vec<Box<dyn DebugListener>>>,
    navigator: RwLock<Option<Box<dyn SourceNavigator>>>,
}

impl<V: VmConnection> SessionInner<V> {
    /// Deliver events to every listener. Callers must not hold the session
    /// lock: a listener is arbitrary external code and may call back in.
    pub(crate) fn fan_out(&self, events: &[DebugEvent]) {
        if events.is_empty() {
            return;
        }
        let listeners = self.listeners.read();
        for event in events {
            for listener in listeners.iter() {
                listener.on_event(event);
            }
        }
    }

    pub(crate) fn scroll(&self, location: &SourceLocation, highlight: bool) {
        if let Some(navigator) = self.navigator.read().as_deref() {
            navigator.scroll_to_source(location, highlight);
        }
    }

    pub(crate) fn record_loop_fault(&self, message: String) {
        tracing::error!("{message}");
        self.state.lock().record_fault(message);
    }

    /// Tear down everything owned for the target: breakpoints and their
    /// requests, pending watches, interpreter contexts, the suspended-thread
    /// stack, and the watch list. Returns the notifications to fan out once
    /// the lock is released.
    pub(crate) fn teardown(&self, state: &mut SessionState) -> Vec<DebugEvent> {
        let vm = self.vm.as_ref();
        let mut events = Vec::new();

        let ids: Vec<ActionId> = state.actions.keys().copied().collect();
        for id in ids {
            if let Some(mut action) = state.actions.shift_remove(&id) {
                if let Some(bp) = action.as_breakpoint() {
                    events.push(DebugEvent::BreakpointRemoved(BreakpointInfo::from(bp)));
                }
                action.clear_requests(vm);
            }
        }
        state.pending.clear(vm);
        state.contexts.dispose_all();
        state.stack.clear();
        state.watches.clear();
        state.running_thread = None;
        state.active = false;

        events.push(DebugEvent::SessionShutdown);
        events
    }
}

pub struct DebugSession<V: VmConnection> {
    inner: Arc<SessionInner<V>>,
    loop_handle: Mutex<Option<thread::JoinHandle<()>>>,
}

impl<V: VmConnection> DebugSession<V> {
    pub fn new(vm: V) -> Self {
        Self::with_config(vm, SessionConfig::default())
    }

    pub fn with_config(vm: V, config: SessionConfig) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                vm: Arc::new(vm),
                config,
                state: Mutex::new(SessionState::new()),
                listeners: RwLock::new(Vec::new()),
                navigator: RwLock::new(None),
            }),
            loop_handle: Mutex::new(None),
        }
    }

    /// Access to the underlying adapter. Primarily useful in tests with
    /// [`javelin_jdi::mock::MockVm`].
    pub fn vm(&self) -> &V {
        &self.inner.vm
    }

    pub fn add_listener(&self, listener: impl DebugListener + 'static) {
        self.inner.listeners.write().push(Box::new(listener));
    }

    pub fn set_navigator(&self, navigator: impl SourceNavigator + 'static) {
        *self.inner.navigator.write() = Some(Box::new(navigator));
    }

    pub fn is_active(&self) -> bool {
        self.inner.state.lock().active
    }

    /// Establish the session: marks it active and starts the dedicated
    /// event-dispatch thread draining the adapter's queue.
    pub fn startup(&self) -> DebugResult<()> {
        {
            let mut guard = self.inner.state.lock();
            if guard.active {
                return Err(DebugError::Usage("session is already active".to_string()));
            }
            guard.active = true;
            guard.loop_fault = None;
        }

        let inner = Arc::clone(&self.inner);
        match thread::Builder::new()
            .name("javelin-debug-events".to_string())
            .spawn(move || run_event_loop(inner))
        {
            Ok(handle) => {
                *self.loop_handle.lock() = Some(handle);
            }
            Err(err) => {
                self.inner.state.lock().active = false;
                return Err(DebugError::Vm(VmError::Io(err)));
            }
        }

        self.inner.fan_out(&[DebugEvent::SessionStarted]);
        Ok(())
    }

    /// Tear down the attachment: removes all breakpoints and watches,
    /// disposes every interpreter context, resets the suspended-thread stack,
    /// detaches, and stops the dispatch thread. A second shutdown fails the
    /// ready-check with [`DebugError::Inactive`].
    pub fn shutdown(&self) -> DebugResult<()> {
        let events = {
            let mut guard = self.inner.state.lock();
            let state = &mut *guard;
            if !state.active {
                return Err(DebugError::Inactive);
            }
            if let Some(fault) = state.loop_fault.take() {
                tracing::warn!("discarding event-loop fault during shutdown: {fault}");
            }
            self.inner.teardown(state)
        };

        // The dispose wakes the dispatch thread with a terminal event; join
        // only after releasing the session lock, which the thread may still
        // need to finish its last dispatch.
        self.inner.vm.dispose();
        if let Some(handle) = self.loop_handle.lock().take() {
            let _ = handle.join();
        }

        self.inner.fan_out(&events);
        Ok(())
    }

    /// Set a breakpoint at the given position, or remove the one already
    /// there.
    pub fn toggle_breakpoint(
        &self,
        document: &dyn DocumentView,
        offset: usize,
        line: u32,
    ) -> DebugResult<()> {
        let events = {
            let mut guard = self.inner.state.lock();
            let state = &mut *guard;
            state.ensure_ready()?;

            let existing = state.actions.iter().find_map(|(id, action)| match action {
                DebugAction::Breakpoint(bp)
                    if bp.document == document.id() && bp.common.line == Some(line) =>
                {
                    Some(*id)
                }
                _ => None,
            });

            match existing {
                Some(id) => self.remove_breakpoint_action(state, id),
                None => self.install_breakpoint(state, document, offset, line)?,
            }
        };
        self.inner.fan_out(&events);
        Ok(())
    }

    /// Propagate an enabled/disabled flip to the breakpoint at the given
    /// position and all of its live requests.
    pub fn set_breakpoint_enabled(
        &self,
        document: DocumentId,
        line: u32,
        enabled: bool,
    ) -> DebugResult<()> {
        let mut guard = self.inner.state.lock();
        let state = &mut *guard;
        state.ensure_ready()?;

        let action = state.actions.values_mut().find(|action| {
            matches!(
                &**action,
                DebugAction::Breakpoint(bp)
                    if bp.document == document && bp.common.line == Some(line)
            )
        });
        match action {
            Some(action) => {
                action.set_enabled(self.inner.vm.as_ref(), enabled);
                Ok(())
            }
            None => Err(DebugError::Usage(format!(
                "no breakpoint at line {line} of document {}",
                document.raw()
            ))),
        }
    }

    /// The owning document closed: every breakpoint it owns goes away, with
    /// one removal notification each.
    pub fn document_closed(&self, document: DocumentId) -> DebugResult<()> {
        let events = {
            let mut guard = self.inner.state.lock();
            let state = &mut *guard;
            state.ensure_ready()?;

            let ids: Vec<ActionId> = state
                .actions
                .iter()
                .filter_map(|(id, action)| match action {
                    DebugAction::Breakpoint(bp) if bp.document == document => Some(*id),
                    _ => None,
                })
                .collect();

            let mut events = Vec::new();
            for id in ids {
                events.extend(self.remove_breakpoint_action(state, id));
            }
            events
        };
        self.inner.fan_out(&events);
        Ok(())
    }

    pub fn breakpoints(&self) -> DebugResult<Vec<BreakpointInfo>> {
        let mut guard = self.inner.state.lock();
        guard.ensure_ready()?;
        Ok(guard
            .actions
            .values()
            .filter_map(|action| action.as_breakpoint().map(BreakpointInfo::from))
            .collect())
    }

    /// Resume the current thread and switch attention to the next-most-recent
    /// suspended thread, if any remains.
    pub fn resume(&self) -> DebugResult<()> {
        let (events, scroll) = {
            let mut guard = self.inner.state.lock();
            let state = &mut *guard;
            state.ensure_ready()?;
            let thread = state.stack.current().ok_or(DebugError::NoSuspendedThread)?;
            self.resume_suspended(state, thread, true, false)
        };
        self.emit(events, scroll);
        Ok(())
    }

    /// Resume a specific suspended thread, not necessarily the current one.
    pub fn resume_thread(&self, thread: ThreadId) -> DebugResult<()> {
        let (events, scroll) = {
            let mut guard = self.inner.state.lock();
            let state = &mut *guard;
            state.ensure_ready()?;
            if !state.stack.contains(thread) {
                return Err(DebugError::Usage(format!(
                    "thread {thread} is not suspended"
                )));
            }
            self.resume_suspended(state, thread, true, false)
        };
        self.emit(events, scroll);
        Ok(())
    }

    /// Single-step the current thread.
    ///
    /// Only valid while a thread is suspended and no resume is in flight.
    /// Mutated interpreter bindings are copied back *before* the step request
    /// exists; issuing the request first can race the copy against the step's
    /// own completion.
    pub fn step(&self, depth: StepDepth) -> DebugResult<()> {
        let (events, scroll) = {
            let mut guard = self.inner.state.lock();
            let state = &mut *guard;
            state.ensure_ready()?;
            let thread = state.stack.current().ok_or(DebugError::NoSuspendedThread)?;
            if state.running_thread.is_some() {
                return Err(DebugError::Usage(
                    "a resume is already in flight".to_string(),
                ));
            }
            let vm = self.inner.vm.as_ref();

            state.contexts.copy_back(vm, thread);

            // At most one outstanding step per thread.
            state.remove_step_actions_for(vm, thread);

            let mut action = DebugAction::Step(StepRequest {
                common: ActionCommon::new(SuspendPolicy::All, None, Some(1)),
                thread,
                size: StepSize::Line,
                depth,
                exclusion_filters: self.inner.config.step_exclusion_filters.clone(),
            });
            action.create_requests(vm, &[])?;
            let id = state.alloc_action_id();
            state.actions.insert(id, action);

            let mut events = vec![DebugEvent::StepRequested { thread, depth }];
            let (mut more, scroll) = self.resume_suspended(state, thread, false, true);
            events.append(&mut more);
            (events, scroll)
        };
        self.emit(events, scroll);
        Ok(())
    }

    /// Select a suspended thread as current.
    pub fn set_current_thread(&self, thread: ThreadId) -> DebugResult<()> {
        let (events, scroll) = {
            let mut guard = self.inner.state.lock();
            let state = &mut *guard;
            state.ensure_ready()?;
            let vm = self.inner.vm.as_ref();

            let suspended = vm.suspend_count(thread).map(|c| c > 0).unwrap_or(false);
            let has_frames = suspended && !vm.frames(thread).unwrap_or_default().is_empty();
            if !suspended || !has_frames {
                return Err(DebugError::Usage(format!(
                    "thread {thread} is not suspended with frames"
                )));
            }

            state.stack.set_current(thread);
            if state.contexts.get(thread).is_none() {
                if let Err(err) =
                    state
                        .contexts
                        .create(vm, thread, self.inner.config.collected_retries)
                {
                    tracing::warn!(thread, "failed to build interpreter context: {err}");
                }
            }
            state.refresh_watches();

            (
                vec![DebugEvent::CurrentThreadChanged {
                    thread: Some(thread),
                }],
                top_frame_location(vm, thread),
            )
        };
        self.emit(events, scroll);
        Ok(())
    }

    pub fn current_thread(&self) -> DebugResult<ThreadId> {
        let mut guard = self.inner.state.lock();
        guard.ensure_ready()?;
        guard.stack.current().ok_or(DebugError::NoSuspendedThread)
    }

    /// Snapshot of every target thread, taken at query time.
    pub fn thread_data(&self) -> DebugResult<Vec<DebugThreadData>> {
        let mut guard = self.inner.state.lock();
        guard.ensure_ready()?;
        let vm = self.inner.vm.as_ref();

        let mut data = Vec::new();
        for id in vm.all_threads()? {
            // Threads can die between the enumeration and the per-thread
            // queries; skip the ones that do.
            let Ok(name) = vm.thread_name(id) else { continue };
            let Ok(status) = vm.thread_status(id) else { continue };
            let suspended = vm.suspend_count(id).map(|c| c > 0).unwrap_or(false);
            data.push(DebugThreadData {
                name,
                unique_id: id,
                status,
                suspended,
            });
        }
        Ok(data)
    }

    /// Frame snapshots of the current thread, innermost first.
    pub fn current_stack(&self) -> DebugResult<Vec<DebugStackData>> {
        let mut guard = self.inner.state.lock();
        guard.ensure_ready()?;
        let thread = guard.stack.current().ok_or(DebugError::NoSuspendedThread)?;
        let frames = self.inner.vm.frames(thread)?;
        Ok(frames
            .into_iter()
            .map(|frame| DebugStackData {
                class_name: frame.class_name,
                method: frame.method,
                line: frame.line,
            })
            .collect())
    }

    pub fn add_watch(&self, name: &str) -> DebugResult<()> {
        let mut guard = self.inner.state.lock();
        guard.ensure_ready()?;
        guard.watches.add(name);
        guard.refresh_watches();
        Ok(())
    }

    pub fn remove_watch(&self, name: &str) -> DebugResult<()> {
        let mut guard = self.inner.state.lock();
        guard.ensure_ready()?;
        guard.watches.remove(name);
        Ok(())
    }

    pub fn remove_all_watches(&self) -> DebugResult<()> {
        let mut guard = self.inner.state.lock();
        guard.ensure_ready()?;
        guard.watches.clear();
        Ok(())
    }

    pub fn watches(&self) -> DebugResult<Vec<Watch>> {
        let mut guard = self.inner.state.lock();
        guard.ensure_ready()?;
        Ok(guard.watches.list())
    }

    /// Evaluate an expression in the current thread's lexical context.
    ///
    /// Plain identifiers resolve against the interpreter context directly;
    /// anything richer is delegated to the target-side evaluator.
    pub fn evaluate(&self, expression: &str) -> DebugResult<Value> {
        let mut guard = self.inner.state.lock();
        guard.ensure_ready()?;
        let thread = guard.stack.current().ok_or(DebugError::NoSuspendedThread)?;
        let Some(context) = guard.contexts.get(thread) else {
            return Err(DebugError::NoDebugInformation);
        };

        let expr = expression.trim();
        if is_identifier(expr) {
            if let Some(binding) = context.lookup(expr) {
                return Ok(binding.value.clone());
            }
        }
        self.inner
            .vm
            .evaluate_in_frame(thread, 0, expr)
            .map_err(DebugError::from)
    }

    /// Define or overwrite a binding in the current thread's context on
    /// behalf of the interactive evaluator. Mutations persist across the next
    /// resume via copy-back.
    pub fn set_binding(&self, name: &str, value: Value) -> DebugResult<()> {
        let mut guard = self.inner.state.lock();
        let state = &mut *guard;
        state.ensure_ready()?;
        let thread = state.stack.current().ok_or(DebugError::NoSuspendedThread)?;
        let Some(context) = state.contexts.get_mut(thread) else {
            return Err(DebugError::NoDebugInformation);
        };
        context.set(name, value);
        state.refresh_watches();
        Ok(())
    }

    /// Hand a location to the editor collaborator for display.
    pub fn scroll_to_source(&self, location: &SourceLocation, highlight: bool) -> DebugResult<()> {
        self.inner.state.lock().ensure_ready()?;
        self.inner.scroll(location, highlight);
        Ok(())
    }

    fn remove_breakpoint_action(&self, state: &mut SessionState, id: ActionId) -> Vec<DebugEvent> {
        let vm = self.inner.vm.as_ref();
        let mut events = Vec::new();
        if let Some(mut action) = state.actions.shift_remove(&id) {
            if let DebugAction::Breakpoint(bp) = &action {
                state.pending.deregister(vm, &bp.class_name, id);
                events.push(DebugEvent::BreakpointRemoved(BreakpointInfo::from(bp)));
            }
            action.clear_requests(vm);
        }
        events
    }

    fn install_breakpoint(
        &self,
        state: &mut SessionState,
        document: &dyn DocumentView,
        offset: usize,
        line: u32,
    ) -> DebugResult<Vec<DebugEvent>> {
        let vm = self.inner.vm.as_ref();
        let class_name = document.class_name_at(offset).ok_or_else(|| {
            DebugError::Usage(format!("no class encloses offset {offset}"))
        })?;

        let mut breakpoint = Breakpoint {
            common: ActionCommon::new(SuspendPolicy::All, Some(line), None),
            document: document.id(),
            region: document.line_region(line),
            class_name: class_name.clone(),
            exact_class: document.exact_class_name_at(offset),
        };

        let outer = outer_class_name(&class_name).to_string();
        // This is a caller-facing boundary: a dead target must be reported,
        // not swallowed, because the breakpoint genuinely was not set.
        let candidates = vm.loaded_classes(&outer)?;
        let outcome = breakpoint.resolve(vm, &candidates)?;

        let id = state.alloc_action_id();
        match outcome {
            ResolveOutcome::Created => {}
            ResolveOutcome::Pending => state.pending.register(vm, &outer, id)?,
            ResolveOutcome::NoExecutableLine => {
                return Err(DebugError::NoExecutableLine {
                    class: breakpoint.target_class().to_string(),
                    line,
                });
            }
        }

        let info = BreakpointInfo::from(&breakpoint);
        state.actions.insert(id, DebugAction::Breakpoint(breakpoint));
        Ok(vec![DebugEvent::BreakpointSet(info)])
    }

    /// Release one suspended thread: copy back its context bindings (unless a
    /// step already did), drop the context, issue as many resume signals as
    /// its suspend count demands, and switch attention to the next suspended
    /// thread when the released one was current.
    fn resume_suspended(
        &self,
        state: &mut SessionState,
        thread: ThreadId,
        notify_resumed: bool,
        from_step: bool,
    ) -> (Vec<DebugEvent>, Option<SourceLocation>) {
        let vm = self.inner.vm.as_ref();
        let mut events = Vec::new();

        if !from_step {
            state.contexts.copy_back(vm, thread);
        }
        state.contexts.dispose(thread);

        let was_current = state.stack.current() == Some(thread);
        state.stack.remove(thread);
        // A plain resume abandons the thread; only a step expects it back.
        state.running_thread = from_step.then_some(thread);

        let signals = vm.suspend_count(thread).unwrap_or(1).max(1);
        for _ in 0..signals {
            swallow_stale(vm.resume_thread(thread), "thread resume");
        }

        if notify_resumed {
            events.push(DebugEvent::ThreadResumed { thread });
        }

        let mut scroll = None;
        if was_current {
            let next = state.stack.current();
            events.push(DebugEvent::CurrentThreadChanged { thread: next });
            state.refresh_watches();
            if let Some(next) = next {
                scroll = top_frame_location(vm, next);
            }
        }
        (events, scroll)
    }

    fn emit(&self, events: Vec<DebugEvent>, scroll: Option<SourceLocation>) {
        if let Some(location) = scroll {
            self.inner.scroll(&location, true);
        }
        self.inner.fan_out(&events);
    }
}

impl<V: VmConnection> Drop for DebugSession<V> {
    fn drop(&mut self) {
        // Unblock the dispatch thread if the caller never shut down.
        if self.inner.state.lock().active {
            self.inner.vm.dispose();
        }
    }
}

fn top_frame_location<V: VmConnection>(vm: &V, thread: ThreadId) -> Option<SourceLocation> {
    let frames = vm.frames(thread).ok()?;
    let top = frames.first()?;
    Some(SourceLocation {
        descriptor: SourceDescriptor::Class(top.class_name.clone()),
        line: top.line?,
    })
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if !(first == '_' || first == '$' || first.is_ascii_alphabetic()) {
        return false;
    }
    chars.all(|c| c == '_' || c == '$' || c.is_ascii_alphanumeric())
}
