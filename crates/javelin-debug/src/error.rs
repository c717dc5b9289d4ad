use javelin_jdi::{VmError, VmResult};
use thiserror::Error;

pub type DebugResult<T> = Result<T, DebugError>;

/// Errors surfaced by the debug session engine.
///
/// Disconnection of the target is benign at internal call sites (the target is
/// simply gone) and only reaches callers through operations that must report
/// failure, such as setting a breakpoint on a dead target.
#[derive(Debug, Error)]
pub enum DebugError {
    /// An operation was invoked while no session is active. Programming
    /// error, not an operational one.
    #[error("debugger is not attached to a target process")]
    Inactive,
    /// An operation was invoked with its preconditions violated.
    #[error("invalid debugger operation: {0}")]
    Usage(String),
    #[error("no thread is currently suspended")]
    NoSuspendedThread,
    #[error("no executable code at line {line} in class {class}")]
    NoExecutableLine { class: String, line: u32 },
    #[error("no debug information at the current location")]
    NoDebugInformation,
    /// One aggregate report for every action of a resolution batch that
    /// failed; sibling actions in the batch still resolved.
    #[error("{} debug action(s) failed to resolve: {}", .failures.len(), .failures.join("; "))]
    ResolutionBatch { failures: Vec<String> },
    #[error("target process disconnected")]
    Disconnected,
    /// A fault recorded by the event dispatch loop, surfaced on the first
    /// caller operation after it was recorded, then cleared.
    #[error("event dispatch fault: {0}")]
    EventLoop(String),
    #[error("vm: {0}")]
    Vm(VmError),
}

impl From<VmError> for DebugError {
    fn from(err: VmError) -> Self {
        match err {
            VmError::Disconnected => DebugError::Disconnected,
            other => DebugError::Vm(other),
        }
    }
}

/// Run a target-touching operation whose failure must not propagate: a
/// disconnected target means the request is already moot, and a stale request
/// id means the target tore it down on its own.
pub(crate) fn swallow_stale(result: VmResult<()>, what: &'static str) {
    match result {
        Ok(()) => {}
        Err(VmError::Disconnected) | Err(VmError::UnknownRequest(_)) => {
            tracing::debug!("ignoring {what} on a stale target: target or request already gone");
        }
        Err(err) => {
            tracing::warn!("unexpected error during {what}: {err}");
        }
    }
}
