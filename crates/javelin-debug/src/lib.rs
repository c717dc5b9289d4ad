//! Javelin debug-session engine.
//!
//! This crate drives an interactive source-level debugging session against a
//! separately running JVM, reached through the `javelin-jdi` adapter
//! boundary: setting and removing breakpoints (including in classes the
//! target has not loaded yet), single-stepping, suspending and resuming
//! threads, and evaluating watch expressions in the lexical context of a
//! suspended thread.
//!
//! The engine is a façade ([`DebugSession`]) over five cooperating pieces:
//! the breakpoint/step action model, the pending-request registry, the
//! suspended-thread stack, the per-thread interpreter contexts, and a
//! dedicated event-dispatch thread that is the only consumer of raw protocol
//! events. Editor documents, expression execution, and UI rendering are
//! collaborators behind the traits in [`source`] and [`events`].

pub mod action;
pub mod context;
pub mod error;
pub mod events;
pub mod pending;
pub mod session;
pub mod source;
pub mod stack;
pub mod watch;

pub use crate::action::{ActionCommon, ActionId, Breakpoint, BreakpointInfo, DebugAction, StepRequest};
pub use crate::context::{Binding, InterpreterContext};
pub use crate::error::{DebugError, DebugResult};
pub use crate::events::{DebugEvent, DebugListener};
pub use crate::pending::PendingRequestRegistry;
pub use crate::session::{DebugSession, SessionConfig, DEFAULT_STEP_EXCLUDES};
pub use crate::source::{
    DocumentId, DocumentView, SourceDescriptor, SourceLocation, SourceNavigator, SourceRegion,
};
pub use crate::stack::{DebugStackData, DebugThreadData, SuspendedThreadStack};
pub use crate::watch::{Watch, WatchValue};
