//! Debug-protocol adapter boundary for the Javelin debugger.
//!
//! `javelin-debug` consumes this crate to observe and control the target JVM:
//! event-request CRUD, thread and frame queries, frame-local reads/writes, and
//! the blocking event queue drained by the engine's dispatch loop.
//!
//! The vocabulary here is JDI-level (threads, reference types, locations,
//! mirror values), not wire-level: a concrete adapter decides how these calls
//! map onto JDWP, a debug agent, or anything else. The crate ships a
//! deterministic in-memory adapter ([`mock::MockVm`], behind the
//! `test-support` feature) so the engine can be exercised without a JVM.

use thiserror::Error;

pub type ThreadId = u64;
pub type ObjectId = u64;
pub type ReferenceTypeId = u64;
/// Identifier of an event request installed in the target (breakpoint, step,
/// class-prepare watch).
pub type RequestId = i32;

pub type VmResult<T> = Result<T, VmError>;

#[derive(Debug, Error)]
pub enum VmError {
    #[error("target process is disconnected")]
    Disconnected,
    #[error("object {0} has been garbage collected by the target")]
    ObjectCollected(ObjectId),
    #[error("unknown thread {0}")]
    UnknownThread(ThreadId),
    #[error("unknown event request {0}")]
    UnknownRequest(RequestId),
    #[error("no line or variable debug information at this location")]
    AbsentInformation,
    #[error("no frame {frame} in thread {thread}")]
    NoSuchFrame { thread: ThreadId, frame: usize },
    #[error("no local variable `{0}` in this frame")]
    NoSuchVariable(String),
    #[error("protocol error: {0}")]
    Protocol(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// A value mirrored out of the target process.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Null,
    Void,
    Boolean(bool),
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Char(char),
    Object(ObjectRef),
}

impl Value {
    pub fn object_id(&self) -> Option<ObjectId> {
        match self {
            Self::Object(obj) => Some(obj.id),
            _ => None,
        }
    }

    /// Java type name of the value, using the runtime type for objects.
    pub fn type_name(&self) -> Option<&str> {
        Some(match self {
            Self::Null => return None,
            Self::Void => "void",
            Self::Boolean(_) => "boolean",
            Self::Byte(_) => "byte",
            Self::Short(_) => "short",
            Self::Int(_) => "int",
            Self::Long(_) => "long",
            Self::Float(_) => "float",
            Self::Double(_) => "double",
            Self::Char(_) => "char",
            Self::Object(obj) => obj.runtime_type.as_str(),
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ObjectRef {
    pub id: ObjectId,
    pub runtime_type: String,
}

/// A loaded reference type in the target.
///
/// `name` is the binary class name (`com.example.Outer$Inner`). The same name
/// can be loaded more than once when custom class loaders are involved, so
/// candidates are returned as a list and `id` disambiguates.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClassRef {
    pub id: ReferenceTypeId,
    pub name: String,
}

/// A source-level code location in the target.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Location {
    pub class_name: String,
    pub line: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameInfo {
    pub class_name: String,
    pub method: String,
    /// `None` when the frame has no line debug information (native or
    /// synthetic code); such frames cannot host an interpreter context.
    pub line: Option<u32>,
}

/// A named variable visible somewhere in the target: a frame local or an
/// object field.
#[derive(Clone, Debug, PartialEq)]
pub struct VariableBinding {
    pub name: String,
    pub value: Value,
    /// Declared type, when debug information provides one. Often more useful
    /// to display than the runtime type when debugging interfaces/generics.
    pub static_type: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ThreadStatus {
    Running,
    Sleeping,
    Monitor,
    Wait,
    Zombie,
    Unknown,
}

/// Which threads the target suspends when a request fires.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SuspendPolicy {
    None,
    EventThread,
    All,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepSize {
    Min,
    Line,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepDepth {
    Into,
    Over,
    Out,
}

/// One event observed from the target.
///
/// Events arrive in batches: everything the target delivered in a single
/// composite packet is handed over together and must be processed in order.
#[derive(Clone, Debug, PartialEq)]
pub enum VmEvent {
    BreakpointHit {
        request: RequestId,
        thread: ThreadId,
        location: Location,
    },
    StepCompleted {
        request: RequestId,
        thread: ThreadId,
        location: Location,
    },
    /// A previously-unloaded class has been loaded. The reporting thread is
    /// suspended solely to deliver the notification and must be resumed once
    /// the consumer has reacted.
    ClassPrepared {
        thread: ThreadId,
        class: ClassRef,
    },
    ThreadStarted {
        thread: ThreadId,
    },
    ThreadDied {
        thread: ThreadId,
    },
    VmDied,
    VmDisconnected,
}

impl VmEvent {
    /// Whether this event terminates the session (target gone).
    pub fn is_exit(&self) -> bool {
        matches!(self, VmEvent::VmDied | VmEvent::VmDisconnected)
    }
}

/// Live connection to a target process.
///
/// All methods take `&self`; interior synchronization is the adapter's
/// concern, so the engine can share one connection between its caller threads
/// and the dedicated event-dispatch thread. Only that dispatch thread may call
/// [`VmConnection::next_events`] — the event queue has exactly one consumer.
pub trait VmConnection: Send + Sync + 'static {
    /// Block until the target delivers the next batch of events.
    ///
    /// Returns [`VmError::Disconnected`] once the target is gone; the queue
    /// may still deliver terminal events ([`VmEvent::VmDied`],
    /// [`VmEvent::VmDisconnected`]) before or instead of erroring, depending
    /// on how the connection ends.
    fn next_events(&self) -> VmResult<Vec<VmEvent>>;

    /// Detach from the target. After this call `next_events` must wake with a
    /// terminal event or [`VmError::Disconnected`] so the consumer can exit.
    fn dispose(&self);

    /// All loaded classes whose binary name is `outer_name` or a nested class
    /// of it (`outer_name$...`). Multiple entries per name are possible with
    /// multiple class loaders.
    fn loaded_classes(&self, outer_name: &str) -> VmResult<Vec<ClassRef>>;

    /// Source lines with executable code in the given loaded class.
    fn executable_lines(&self, class: &ClassRef) -> VmResult<Vec<u32>>;

    fn create_breakpoint_request(
        &self,
        class: &ClassRef,
        line: u32,
        policy: SuspendPolicy,
        count_filter: Option<u32>,
    ) -> VmResult<RequestId>;

    fn create_step_request(
        &self,
        thread: ThreadId,
        size: StepSize,
        depth: StepDepth,
        exclusion_filters: &[String],
        count_filter: Option<u32>,
        policy: SuspendPolicy,
    ) -> VmResult<RequestId>;

    /// Watch for class loads matching `pattern` (a binary-name glob such as
    /// `com.example.Foo*`).
    fn create_class_prepare_request(&self, pattern: &str) -> VmResult<RequestId>;

    fn clear_request(&self, request: RequestId) -> VmResult<()>;

    fn set_request_enabled(&self, request: RequestId, enabled: bool) -> VmResult<()>;

    fn all_threads(&self) -> VmResult<Vec<ThreadId>>;
    fn thread_name(&self, thread: ThreadId) -> VmResult<String>;
    fn thread_status(&self, thread: ThreadId) -> VmResult<ThreadStatus>;

    /// Number of pending suspensions for the thread. A thread suspended by
    /// several coincident requests needs as many resume signals.
    fn suspend_count(&self, thread: ThreadId) -> VmResult<u32>;

    /// Deliver one resume signal to the thread (decrements the suspend
    /// count). Resuming a thread that is not suspended is a no-op.
    fn resume_thread(&self, thread: ThreadId) -> VmResult<()>;

    fn resume_all(&self) -> VmResult<()>;

    /// Stack frames of a suspended thread, innermost first.
    fn frames(&self, thread: ThreadId) -> VmResult<Vec<FrameInfo>>;

    /// Locals (including arguments) visible at the given frame of a suspended
    /// thread. Fails with [`VmError::AbsentInformation`] when the frame has no
    /// variable debug information.
    fn visible_variables(&self, thread: ThreadId, frame: usize) -> VmResult<Vec<VariableBinding>>;

    /// The `this` reference of the frame, or `None` in a static context.
    fn this_object(&self, thread: ThreadId, frame: usize) -> VmResult<Option<ObjectRef>>;

    /// Instance fields of an object, including synthetic members such as the
    /// `this$N` enclosing-instance back-links.
    fn object_fields(&self, object: ObjectId) -> VmResult<Vec<VariableBinding>>;

    /// Write a frame local of a suspended thread.
    fn set_local(
        &self,
        thread: ThreadId,
        frame: usize,
        name: &str,
        value: &Value,
    ) -> VmResult<()>;

    /// Evaluate an expression in the lexical scope of the given frame.
    fn evaluate_in_frame(
        &self,
        thread: ThreadId,
        frame: usize,
        expression: &str,
    ) -> VmResult<Value>;
}

// The mock VM is only needed for tests and downstream integration suites.
// Compile it for javelin-jdi's own unit tests unconditionally (via
// `cfg(test)`), while keeping it behind the `test-support` feature for normal
// builds and for downstream crates.
#[cfg(any(test, feature = "test-support"))]
pub mod mock;
