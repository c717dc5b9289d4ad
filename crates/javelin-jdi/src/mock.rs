//! Deterministic, in-memory [`VmConnection`] test double.
//!
//! `MockVm` plays the target process: tests script loaded classes, threads,
//! frames, and objects, then inject events exactly as a real target would
//! deliver them. Every control call the engine makes (requests created and
//! cleared, resume signals, frame-local writes) is recorded for assertions.
//!
//! The mock is clonable; all clones share one target state and one event
//! queue, so a test keeps a scripting handle while the engine owns another.

use std::collections::HashMap;
use std::sync::Arc;

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;

use crate::{
    ClassRef, FrameInfo, Location, ObjectId, ObjectRef, RequestId, StepDepth, StepSize,
    SuspendPolicy, ThreadId, ThreadStatus, Value, VariableBinding, VmConnection, VmError, VmEvent,
    VmResult,
};

/// One scripted stack frame of a mock thread, innermost first.
#[derive(Clone, Debug)]
pub struct MockFrame {
    pub class_name: String,
    pub method: String,
    pub line: Option<u32>,
    locals: Vec<(String, Value, Option<String>)>,
    this: Option<ObjectId>,
}

impl MockFrame {
    pub fn new(
        class_name: impl Into<String>,
        method: impl Into<String>,
        line: impl Into<Option<u32>>,
    ) -> Self {
        Self {
            class_name: class_name.into(),
            method: method.into(),
            line: line.into(),
            locals: Vec::new(),
            this: None,
        }
    }

    pub fn with_local(mut self, name: impl Into<String>, value: Value) -> Self {
        self.locals.push((name.into(), value, None));
        self
    }

    pub fn with_typed_local(
        mut self,
        name: impl Into<String>,
        value: Value,
        static_type: impl Into<String>,
    ) -> Self {
        self.locals.push((name.into(), value, Some(static_type.into())));
        self
    }

    pub fn with_this(mut self, object: ObjectId) -> Self {
        self.this = Some(object);
        self
    }
}

#[derive(Clone, Debug)]
struct MockThread {
    name: String,
    status: ThreadStatus,
    suspend_count: u32,
    frames: Vec<MockFrame>,
}

#[derive(Clone, Debug)]
struct MockObject {
    runtime_type: String,
    fields: Vec<(String, Value)>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum MockRequest {
    Breakpoint { class: String, line: u32 },
    Step { thread: ThreadId },
    ClassPrepare { pattern: String },
}

#[derive(Default)]
struct MockState {
    disconnected: bool,
    next_id: u64,
    next_request: RequestId,
    classes: Vec<(ClassRef, Vec<u32>)>,
    threads: HashMap<ThreadId, MockThread>,
    objects: HashMap<ObjectId, MockObject>,
    requests: HashMap<RequestId, (MockRequest, bool)>,
    evaluations: HashMap<(ThreadId, String), Value>,
    field_read_failures: HashMap<ObjectId, usize>,
    resume_log: Vec<ThreadId>,
    resume_all_calls: usize,
    cleared: Vec<RequestId>,
    set_local_log: Vec<(ThreadId, usize, String, Value)>,
}

impl MockState {
    fn fresh_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn thread(&self, thread: ThreadId) -> VmResult<&MockThread> {
        self.threads.get(&thread).ok_or(VmError::UnknownThread(thread))
    }

    fn thread_mut(&mut self, thread: ThreadId) -> VmResult<&mut MockThread> {
        self.threads
            .get_mut(&thread)
            .ok_or(VmError::UnknownThread(thread))
    }

    fn frame(&self, thread: ThreadId, frame: usize) -> VmResult<&MockFrame> {
        self.thread(thread)?
            .frames
            .get(frame)
            .ok_or(VmError::NoSuchFrame { thread, frame })
    }

    fn ensure_connected(&self) -> VmResult<()> {
        if self.disconnected {
            Err(VmError::Disconnected)
        } else {
            Ok(())
        }
    }
}

#[derive(Clone)]
pub struct MockVm {
    state: Arc<Mutex<MockState>>,
    events_tx: Sender<VmResult<Vec<VmEvent>>>,
    events_rx: Receiver<VmResult<Vec<VmEvent>>>,
}

impl Default for MockVm {
    fn default() -> Self {
        Self::new()
    }
}

impl MockVm {
    pub fn new() -> Self {
        let (events_tx, events_rx) = unbounded();
        Self {
            state: Arc::new(Mutex::new(MockState::default())),
            events_tx,
            events_rx,
        }
    }

    // --- target scripting ---

    pub fn add_class(&self, name: impl Into<String>, lines: &[u32]) -> ClassRef {
        let mut state = self.state.lock();
        let class = ClassRef {
            id: state.fresh_id(),
            name: name.into(),
        };
        state.classes.push((class.clone(), lines.to_vec()));
        class
    }

    pub fn add_thread(&self, name: impl Into<String>) -> ThreadId {
        let mut state = self.state.lock();
        let id = state.fresh_id();
        state.threads.insert(
            id,
            MockThread {
                name: name.into(),
                status: ThreadStatus::Running,
                suspend_count: 0,
                frames: Vec::new(),
            },
        );
        id
    }

    pub fn set_thread_status(&self, thread: ThreadId, status: ThreadStatus) {
        let mut state = self.state.lock();
        if let Some(t) = state.threads.get_mut(&thread) {
            t.status = status;
        }
    }

    pub fn set_frames(&self, thread: ThreadId, frames: Vec<MockFrame>) {
        let mut state = self.state.lock();
        state
            .threads
            .get_mut(&thread)
            .unwrap_or_else(|| panic!("no mock thread {thread}"))
            .frames = frames;
    }

    pub fn add_object(
        &self,
        runtime_type: impl Into<String>,
        fields: Vec<(&str, Value)>,
    ) -> ObjectId {
        let mut state = self.state.lock();
        let id = state.fresh_id();
        state.objects.insert(
            id,
            MockObject {
                runtime_type: runtime_type.into(),
                fields: fields
                    .into_iter()
                    .map(|(name, value)| (name.to_string(), value))
                    .collect(),
            },
        );
        id
    }

    /// Make the next `times` calls to `object_fields` for `object` fail as if
    /// the target collected the object between reads.
    pub fn fail_field_reads(&self, object: ObjectId, times: usize) {
        self.state.lock().field_read_failures.insert(object, times);
    }

    pub fn set_evaluation(&self, thread: ThreadId, expression: impl Into<String>, value: Value) {
        self.state
            .lock()
            .evaluations
            .insert((thread, expression.into()), value);
    }

    pub fn suspend_thread(&self, thread: ThreadId) {
        let mut state = self.state.lock();
        if let Some(t) = state.threads.get_mut(&thread) {
            t.suspend_count += 1;
        }
    }

    // --- event injection ---

    pub fn emit(&self, events: Vec<VmEvent>) {
        let _ = self.events_tx.send(Ok(events));
    }

    /// Fail the dispatch loop's next queue read, as a connection drop
    /// observed mid-read does.
    pub fn emit_read_error(&self) {
        let _ = self.events_tx.send(Err(VmError::Disconnected));
    }

    /// Suspend `thread` and deliver a breakpoint hit for an installed
    /// breakpoint request.
    pub fn hit_breakpoint(&self, request: RequestId, thread: ThreadId) {
        let location = {
            let mut state = self.state.lock();
            let location = match state.requests.get(&request) {
                Some((MockRequest::Breakpoint { class, line }, _)) => Location {
                    class_name: class.clone(),
                    line: *line,
                },
                other => panic!("request {request} is not an active breakpoint: {other:?}"),
            };
            if let Some(t) = state.threads.get_mut(&thread) {
                t.suspend_count += 1;
            }
            location
        };
        self.emit(vec![VmEvent::BreakpointHit {
            request,
            thread,
            location,
        }]);
    }

    /// Suspend `thread` at its (scripted) top frame and deliver a completed
    /// step for an installed step request.
    pub fn complete_step(&self, request: RequestId, thread: ThreadId) {
        let location = {
            let mut state = self.state.lock();
            let t = state
                .threads
                .get_mut(&thread)
                .unwrap_or_else(|| panic!("no mock thread {thread}"));
            t.suspend_count += 1;
            let top = t.frames.first();
            Location {
                class_name: top.map(|f| f.class_name.clone()).unwrap_or_default(),
                line: top.and_then(|f| f.line).unwrap_or(0),
            }
        };
        self.emit(vec![VmEvent::StepCompleted {
            request,
            thread,
            location,
        }]);
    }

    /// Load a class and deliver the class-prepared notification from
    /// `thread`, suspending it for the delivery as the target does.
    pub fn prepare_class(
        &self,
        thread: ThreadId,
        name: impl Into<String>,
        lines: &[u32],
    ) -> ClassRef {
        let class = self.add_class(name, lines);
        self.suspend_thread(thread);
        self.emit(vec![VmEvent::ClassPrepared {
            thread,
            class: class.clone(),
        }]);
        class
    }

    pub fn start_thread(&self, name: impl Into<String>) -> ThreadId {
        let thread = self.add_thread(name);
        self.emit(vec![VmEvent::ThreadStarted { thread }]);
        thread
    }

    pub fn kill_thread(&self, thread: ThreadId) {
        self.set_thread_status(thread, ThreadStatus::Zombie);
        self.emit(vec![VmEvent::ThreadDied { thread }]);
    }

    pub fn kill_vm(&self) {
        self.state.lock().disconnected = true;
        self.emit(vec![VmEvent::VmDied]);
    }

    /// Cut the control plane without delivering any terminal event, as seen
    /// when the target dies and the death notification has not arrived yet:
    /// every control call fails with `Disconnected` while the event queue
    /// stays silent.
    pub fn sever_control(&self) {
        self.state.lock().disconnected = true;
    }

    // --- recorded-interaction assertions ---

    pub fn breakpoint_request_at(&self, class: &str, line: u32) -> Option<RequestId> {
        let state = self.state.lock();
        state.requests.iter().find_map(|(id, (req, _))| match req {
            MockRequest::Breakpoint { class: c, line: l } if c == class && *l == line => Some(*id),
            _ => None,
        })
    }

    pub fn active_breakpoint_requests(&self) -> usize {
        let state = self.state.lock();
        state
            .requests
            .values()
            .filter(|(req, _)| matches!(req, MockRequest::Breakpoint { .. }))
            .count()
    }

    pub fn step_request_for(&self, thread: ThreadId) -> Option<RequestId> {
        let state = self.state.lock();
        state.requests.iter().find_map(|(id, (req, _))| match req {
            MockRequest::Step { thread: t } if *t == thread => Some(*id),
            _ => None,
        })
    }

    pub fn class_prepare_patterns(&self) -> Vec<String> {
        let state = self.state.lock();
        state
            .requests
            .values()
            .filter_map(|(req, _)| match req {
                MockRequest::ClassPrepare { pattern } => Some(pattern.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn request_enabled(&self, request: RequestId) -> Option<bool> {
        self.state
            .lock()
            .requests
            .get(&request)
            .map(|(_, enabled)| *enabled)
    }

    pub fn cleared_requests(&self) -> Vec<RequestId> {
        self.state.lock().cleared.clone()
    }

    pub fn resume_calls(&self, thread: ThreadId) -> usize {
        self.state
            .lock()
            .resume_log
            .iter()
            .filter(|t| **t == thread)
            .count()
    }

    pub fn resume_all_calls(&self) -> usize {
        self.state.lock().resume_all_calls
    }

    pub fn set_local_calls(&self) -> Vec<(ThreadId, usize, String, Value)> {
        self.state.lock().set_local_log.clone()
    }
}

impl VmConnection for MockVm {
    fn next_events(&self) -> VmResult<Vec<VmEvent>> {
        match self.events_rx.recv() {
            Ok(batch) => batch,
            Err(_) => Err(VmError::Disconnected),
        }
    }

    fn dispose(&self) {
        self.state.lock().disconnected = true;
        let _ = self.events_tx.send(Ok(vec![VmEvent::VmDisconnected]));
    }

    fn loaded_classes(&self, outer_name: &str) -> VmResult<Vec<ClassRef>> {
        let state = self.state.lock();
        state.ensure_connected()?;
        let nested_prefix = format!("{outer_name}$");
        Ok(state
            .classes
            .iter()
            .filter(|(class, _)| {
                class.name == outer_name || class.name.starts_with(&nested_prefix)
            })
            .map(|(class, _)| class.clone())
            .collect())
    }

    fn executable_lines(&self, class: &ClassRef) -> VmResult<Vec<u32>> {
        let state = self.state.lock();
        state.ensure_connected()?;
        state
            .classes
            .iter()
            .find(|(c, _)| c.id == class.id)
            .map(|(_, lines)| lines.clone())
            .ok_or_else(|| VmError::Protocol(format!("unknown class {}", class.name)))
    }

    fn create_breakpoint_request(
        &self,
        class: &ClassRef,
        line: u32,
        _policy: SuspendPolicy,
        _count_filter: Option<u32>,
    ) -> VmResult<RequestId> {
        let mut state = self.state.lock();
        state.ensure_connected()?;
        state.next_request += 1;
        let id = state.next_request;
        state.requests.insert(
            id,
            (
                MockRequest::Breakpoint {
                    class: class.name.clone(),
                    line,
                },
                true,
            ),
        );
        Ok(id)
    }

    fn create_step_request(
        &self,
        thread: ThreadId,
        _size: StepSize,
        _depth: StepDepth,
        _exclusion_filters: &[String],
        _count_filter: Option<u32>,
        _policy: SuspendPolicy,
    ) -> VmResult<RequestId> {
        let mut state = self.state.lock();
        state.ensure_connected()?;
        state.thread(thread)?;
        state.next_request += 1;
        let id = state.next_request;
        state.requests.insert(id, (MockRequest::Step { thread }, true));
        Ok(id)
    }

    fn create_class_prepare_request(&self, pattern: &str) -> VmResult<RequestId> {
        let mut state = self.state.lock();
        state.ensure_connected()?;
        state.next_request += 1;
        let id = state.next_request;
        state.requests.insert(
            id,
            (
                MockRequest::ClassPrepare {
                    pattern: pattern.to_string(),
                },
                true,
            ),
        );
        Ok(id)
    }

    fn clear_request(&self, request: RequestId) -> VmResult<()> {
        let mut state = self.state.lock();
        state.ensure_connected()?;
        state
            .requests
            .remove(&request)
            .ok_or(VmError::UnknownRequest(request))?;
        state.cleared.push(request);
        Ok(())
    }

    fn set_request_enabled(&self, request: RequestId, enabled: bool) -> VmResult<()> {
        let mut state = self.state.lock();
        state.ensure_connected()?;
        match state.requests.get_mut(&request) {
            Some((_, flag)) => {
                *flag = enabled;
                Ok(())
            }
            None => Err(VmError::UnknownRequest(request)),
        }
    }

    fn all_threads(&self) -> VmResult<Vec<ThreadId>> {
        let state = self.state.lock();
        state.ensure_connected()?;
        let mut threads: Vec<ThreadId> = state.threads.keys().copied().collect();
        threads.sort_unstable();
        Ok(threads)
    }

    fn thread_name(&self, thread: ThreadId) -> VmResult<String> {
        let state = self.state.lock();
        state.ensure_connected()?;
        Ok(state.thread(thread)?.name.clone())
    }

    fn thread_status(&self, thread: ThreadId) -> VmResult<ThreadStatus> {
        let state = self.state.lock();
        state.ensure_connected()?;
        Ok(state.thread(thread)?.status)
    }

    fn suspend_count(&self, thread: ThreadId) -> VmResult<u32> {
        let state = self.state.lock();
        state.ensure_connected()?;
        Ok(state.thread(thread)?.suspend_count)
    }

    fn resume_thread(&self, thread: ThreadId) -> VmResult<()> {
        let mut state = self.state.lock();
        state.ensure_connected()?;
        let t = state.thread_mut(thread)?;
        t.suspend_count = t.suspend_count.saturating_sub(1);
        state.resume_log.push(thread);
        Ok(())
    }

    fn resume_all(&self) -> VmResult<()> {
        let mut state = self.state.lock();
        state.ensure_connected()?;
        for t in state.threads.values_mut() {
            t.suspend_count = t.suspend_count.saturating_sub(1);
        }
        state.resume_all_calls += 1;
        Ok(())
    }

    fn frames(&self, thread: ThreadId) -> VmResult<Vec<FrameInfo>> {
        let state = self.state.lock();
        state.ensure_connected()?;
        Ok(state
            .thread(thread)?
            .frames
            .iter()
            .map(|f| FrameInfo {
                class_name: f.class_name.clone(),
                method: f.method.clone(),
                line: f.line,
            })
            .collect())
    }

    fn visible_variables(&self, thread: ThreadId, frame: usize) -> VmResult<Vec<VariableBinding>> {
        let state = self.state.lock();
        state.ensure_connected()?;
        let frame = state.frame(thread, frame)?;
        if frame.line.is_none() {
            return Err(VmError::AbsentInformation);
        }
        Ok(frame
            .locals
            .iter()
            .map(|(name, value, static_type)| VariableBinding {
                name: name.clone(),
                value: value.clone(),
                static_type: static_type.clone(),
            })
            .collect())
    }

    fn this_object(&self, thread: ThreadId, frame: usize) -> VmResult<Option<ObjectRef>> {
        let state = self.state.lock();
        state.ensure_connected()?;
        let frame = state.frame(thread, frame)?;
        Ok(frame.this.map(|id| ObjectRef {
            id,
            runtime_type: state
                .objects
                .get(&id)
                .map(|o| o.runtime_type.clone())
                .unwrap_or_else(|| "java.lang.Object".to_string()),
        }))
    }

    fn object_fields(&self, object: ObjectId) -> VmResult<Vec<VariableBinding>> {
        let mut state = self.state.lock();
        state.ensure_connected()?;
        if let Some(left) = state.field_read_failures.get_mut(&object) {
            if *left > 0 {
                *left -= 1;
                return Err(VmError::ObjectCollected(object));
            }
        }
        state
            .objects
            .get(&object)
            .map(|o| {
                o.fields
                    .iter()
                    .map(|(name, value)| VariableBinding {
                        name: name.clone(),
                        value: value.clone(),
                        static_type: None,
                    })
                    .collect()
            })
            .ok_or(VmError::ObjectCollected(object))
    }

    fn set_local(
        &self,
        thread: ThreadId,
        frame: usize,
        name: &str,
        value: &Value,
    ) -> VmResult<()> {
        let mut state = self.state.lock();
        state.ensure_connected()?;
        let frame_count = state.thread(thread)?.frames.len();
        if frame >= frame_count {
            return Err(VmError::NoSuchFrame { thread, frame });
        }
        let t = state.thread_mut(thread)?;
        let local = t.frames[frame]
            .locals
            .iter_mut()
            .find(|(n, _, _)| n == name)
            .ok_or_else(|| VmError::NoSuchVariable(name.to_string()))?;
        local.1 = value.clone();
        state
            .set_local_log
            .push((thread, frame, name.to_string(), value.clone()));
        Ok(())
    }

    fn evaluate_in_frame(
        &self,
        thread: ThreadId,
        _frame: usize,
        expression: &str,
    ) -> VmResult<Value> {
        let state = self.state.lock();
        state.ensure_connected()?;
        state
            .evaluations
            .get(&(thread, expression.to_string()))
            .cloned()
            .ok_or_else(|| VmError::Protocol(format!("no scripted evaluation for `{expression}`")))
    }
}
