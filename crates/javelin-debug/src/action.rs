//! Breakpoint/step action model.
//!
//! A logical debug action owns zero or more underlying protocol requests —
//! plural because custom class loaders can load several copies of the same
//! class, each needing its own request. An action with zero requests is
//! either disabled or still awaiting its class load in the pending registry.

use javelin_jdi::{
    ClassRef, RequestId, StepDepth, StepSize, SuspendPolicy, ThreadId, VmConnection, VmResult,
};

use crate::error::swallow_stale;
use crate::source::{DocumentId, SourceRegion};

/// Session-local identifier of a [`DebugAction`].
pub type ActionId = u64;

/// Fields shared by every action kind.
#[derive(Clone, Debug)]
pub struct ActionCommon {
    pub suspend_policy: SuspendPolicy,
    pub enabled: bool,
    /// Source line the action binds to; `None` means any line.
    pub line: Option<u32>,
    /// Fire only on the Nth occurrence when set.
    pub count_filter: Option<u32>,
    /// Underlying protocol requests, one per loaded copy of the class.
    pub requests: Vec<RequestId>,
}

impl ActionCommon {
    pub fn new(suspend_policy: SuspendPolicy, line: Option<u32>, count_filter: Option<u32>) -> Self {
        Self {
            suspend_policy,
            enabled: true,
            line,
            count_filter,
            requests: Vec::new(),
        }
    }

    pub fn is_resolved(&self) -> bool {
        !self.requests.is_empty()
    }
}

/// A line breakpoint, owned jointly by its source document (for rendering)
/// and the session's breakpoint table (for protocol bookkeeping).
#[derive(Clone, Debug)]
pub struct Breakpoint {
    pub common: ActionCommon,
    pub document: DocumentId,
    pub region: SourceRegion,
    /// Qualified name of the enclosing top-level class.
    pub class_name: String,
    /// Innermost concrete class, when the document could determine it.
    /// Restricts resolution to that class instead of every nested sibling.
    pub exact_class: Option<String>,
}

impl Breakpoint {
    /// Class name the breakpoint wants to bind to, preferring the exact
    /// inner-class name when known.
    pub fn target_class(&self) -> &str {
        self.exact_class.as_deref().unwrap_or(&self.class_name)
    }

    /// Attempt to install one underlying request per loaded candidate class.
    ///
    /// A candidate whose name matches but whose loaded copy has no executable
    /// code at the line is skipped rather than treated as an error: a source
    /// file can declare several sibling classes sharing a name prefix, and
    /// the breakpoint must bind only where the line actually exists.
    pub fn resolve<V: VmConnection>(
        &mut self,
        vm: &V,
        candidates: &[ClassRef],
    ) -> VmResult<ResolveOutcome> {
        let line = match self.common.line {
            Some(line) => line,
            None => return Ok(ResolveOutcome::Pending),
        };

        let mut matched = false;
        let mut created = false;
        for class in candidates {
            if let Some(exact) = &self.exact_class {
                if class.name != *exact {
                    continue;
                }
            }
            matched = true;
            if !vm.executable_lines(class)?.contains(&line) {
                continue;
            }
            let request = vm.create_breakpoint_request(
                class,
                line,
                self.common.suspend_policy,
                self.common.count_filter,
            )?;
            self.common.requests.push(request);
            created = true;
        }

        Ok(if created {
            ResolveOutcome::Created
        } else if matched {
            ResolveOutcome::NoExecutableLine
        } else {
            ResolveOutcome::Pending
        })
    }
}

/// A one-shot step bound to a specific suspended thread.
#[derive(Clone, Debug)]
pub struct StepRequest {
    pub common: ActionCommon,
    pub thread: ThreadId,
    pub size: StepSize,
    pub depth: StepDepth,
    /// Package-name globs whose code must not stop the step.
    pub exclusion_filters: Vec<String>,
}

#[derive(Clone, Debug)]
pub enum DebugAction {
    Breakpoint(Breakpoint),
    Step(StepRequest),
}

/// Result of one attempt to install an action's underlying requests.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResolveOutcome {
    /// At least one request was installed.
    Created,
    /// No loaded candidate matches the action's class; the caller should
    /// register the action in the pending registry. Not a failure.
    Pending,
    /// The class is loaded but no copy of it has executable code at the
    /// action's line.
    NoExecutableLine,
}

impl DebugAction {
    pub fn common(&self) -> &ActionCommon {
        match self {
            DebugAction::Breakpoint(bp) => &bp.common,
            DebugAction::Step(step) => &step.common,
        }
    }

    pub fn common_mut(&mut self) -> &mut ActionCommon {
        match self {
            DebugAction::Breakpoint(bp) => &mut bp.common,
            DebugAction::Step(step) => &mut step.common,
        }
    }

    pub fn as_breakpoint(&self) -> Option<&Breakpoint> {
        match self {
            DebugAction::Breakpoint(bp) => Some(bp),
            DebugAction::Step(_) => None,
        }
    }

    /// Attempt to install this action's underlying requests. Steps ignore the
    /// candidate list; breakpoints resolve against it (see
    /// [`Breakpoint::resolve`]).
    pub fn create_requests<V: VmConnection>(
        &mut self,
        vm: &V,
        candidates: &[ClassRef],
    ) -> VmResult<ResolveOutcome> {
        match self {
            DebugAction::Breakpoint(bp) => bp.resolve(vm, candidates),
            DebugAction::Step(step) => {
                let request = vm.create_step_request(
                    step.thread,
                    step.size,
                    step.depth,
                    &step.exclusion_filters,
                    step.common.count_filter,
                    step.common.suspend_policy,
                )?;
                step.common.requests.push(request);
                Ok(ResolveOutcome::Created)
            }
        }
    }

    /// Propagate the enabled flag to every underlying request. Errors from
    /// stale requests are swallowed: the target may already have dropped
    /// them, or died altogether.
    pub fn set_enabled<V: VmConnection>(&mut self, vm: &V, enabled: bool) {
        let common = self.common_mut();
        common.enabled = enabled;
        for request in &common.requests {
            swallow_stale(vm.set_request_enabled(*request, enabled), "request toggle");
        }
    }

    /// Tear down every underlying request.
    pub fn clear_requests<V: VmConnection>(&mut self, vm: &V) {
        for request in self.common_mut().requests.drain(..) {
            swallow_stale(vm.clear_request(request), "request teardown");
        }
    }
}

/// Listener-facing snapshot of a breakpoint.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BreakpointInfo {
    pub document: DocumentId,
    pub line: u32,
    pub class_name: String,
    pub enabled: bool,
    pub resolved: bool,
}

impl From<&Breakpoint> for BreakpointInfo {
    fn from(bp: &Breakpoint) -> Self {
        Self {
            document: bp.document,
            line: bp.common.line.unwrap_or_default(),
            class_name: bp.target_class().to_string(),
            enabled: bp.common.enabled,
            resolved: bp.common.is_resolved(),
        }
    }
}
