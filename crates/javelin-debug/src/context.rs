//! Per-suspended-thread interpreter contexts.
//!
//! When a thread stops at a location with debug information, the engine
//! snapshots everything lexically visible there — frame locals, `this`, and
//! the captured fields of enclosing instances reached through the synthetic
//! `this$N` back-links — into a named scratch environment. Watch and
//! interactive expressions resolve against that environment, and bindings the
//! user mutated are copied back into the live frame before the thread runs
//! again, so assignments survive a resume.

use std::collections::HashMap;

use indexmap::IndexMap;

use javelin_jdi::{ObjectRef, ThreadId, Value, VmConnection, VmError, VmResult};

/// One named variable captured into a context.
#[derive(Clone, Debug, PartialEq)]
pub struct Binding {
    pub value: Value,
    pub static_type: Option<String>,
    mutated: bool,
}

impl Binding {
    fn captured(value: Value, static_type: Option<String>) -> Self {
        Self {
            value,
            static_type,
            mutated: false,
        }
    }
}

/// Scratch evaluation environment of one suspended thread.
#[derive(Clone, Debug)]
pub struct InterpreterContext {
    name: String,
    thread: ThreadId,
    bindings: IndexMap<String, Binding>,
}

impl InterpreterContext {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn thread(&self) -> ThreadId {
        self.thread
    }

    pub fn lookup(&self, name: &str) -> Option<&Binding> {
        self.bindings.get(name)
    }

    /// Define or overwrite a binding on behalf of the interactive evaluator.
    /// Marked mutated so it is copied back into the frame on resume.
    pub fn set(&mut self, name: &str, value: Value) {
        match self.bindings.get_mut(name) {
            Some(binding) => {
                binding.value = value;
                binding.mutated = true;
            }
            None => {
                self.bindings.insert(
                    name.to_string(),
                    Binding {
                        value,
                        static_type: None,
                        mutated: true,
                    },
                );
            }
        }
    }

    pub fn bindings(&self) -> impl Iterator<Item = (&str, &Binding)> {
        self.bindings.iter().map(|(name, b)| (name.as_str(), b))
    }
}

/// Creates and destroys interpreter contexts as threads suspend and resume.
#[derive(Debug, Default)]
pub(crate) struct ContextManager {
    contexts: HashMap<ThreadId, InterpreterContext>,
}

impl ContextManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, thread: ThreadId) -> Option<&InterpreterContext> {
        self.contexts.get(&thread)
    }

    pub fn get_mut(&mut self, thread: ThreadId) -> Option<&mut InterpreterContext> {
        self.contexts.get_mut(&thread)
    }

    /// Build the context for a freshly suspended thread.
    ///
    /// Returns `Ok(false)` without creating anything when the stop location
    /// has no line debug information: watches must then report "unavailable"
    /// instead of failing.
    ///
    /// The snapshot reads object fields while the target may collect the
    /// ephemeral mirrors it handed us; that race is expected, so the whole
    /// snapshot is retried up to `collected_retries` times before the failure
    /// surfaces.
    pub fn create<V: VmConnection>(
        &mut self,
        vm: &V,
        thread: ThreadId,
        collected_retries: usize,
    ) -> VmResult<bool> {
        let frames = vm.frames(thread)?;
        let Some(top) = frames.first() else {
            return Ok(false);
        };
        if top.line.is_none() {
            tracing::info!(
                thread,
                class = %top.class_name,
                "no line debug information at stop location; skipping interpreter context"
            );
            return Ok(false);
        }

        let mut attempt = 0;
        let bindings = loop {
            match snapshot_visible(vm, thread) {
                Ok(bindings) => break bindings,
                Err(VmError::ObjectCollected(object)) if attempt < collected_retries => {
                    attempt += 1;
                    tracing::debug!(
                        thread,
                        object,
                        attempt,
                        "value collected mid-snapshot; retrying"
                    );
                }
                Err(err) => return Err(err),
            }
        };

        self.contexts.insert(
            thread,
            InterpreterContext {
                name: format!("debug-{thread}"),
                thread,
                bindings,
            },
        );
        Ok(true)
    }

    /// Copy every mutated binding back into the thread's live frame so
    /// user-made assignments persist across the resume.
    pub fn copy_back<V: VmConnection>(&self, vm: &V, thread: ThreadId) {
        let Some(context) = self.contexts.get(&thread) else {
            return;
        };
        for (name, binding) in &context.bindings {
            if !binding.mutated || name == "this" {
                continue;
            }
            match vm.set_local(thread, 0, name, &binding.value) {
                Ok(()) => {}
                Err(VmError::Disconnected) => {
                    tracing::debug!(thread, "target gone during binding copy-back");
                    return;
                }
                Err(VmError::NoSuchVariable(_)) | Err(VmError::AbsentInformation) => {
                    // Not a frame local (an outer field or an evaluator-defined
                    // name); the frame has nowhere to hold it.
                    tracing::debug!(thread, name = %name, "binding has no frame slot; not copied back");
                }
                Err(err) => {
                    tracing::warn!(thread, name = %name, "binding copy-back failed: {err}");
                }
            }
        }
    }

    pub fn dispose(&mut self, thread: ThreadId) -> bool {
        self.contexts.remove(&thread).is_some()
    }

    pub fn dispose_all(&mut self) {
        self.contexts.clear();
    }
}

/// Snapshot locals, `this`, and the captured fields of every enclosing
/// instance visible from the thread's top frame.
fn snapshot_visible<V: VmConnection>(
    vm: &V,
    thread: ThreadId,
) -> VmResult<IndexMap<String, Binding>> {
    let mut bindings = IndexMap::new();

    match vm.visible_variables(thread, 0) {
        Ok(locals) => {
            for local in locals {
                bindings.insert(
                    local.name,
                    Binding::captured(local.value, local.static_type),
                );
            }
        }
        // Line info without variable tables happens with partial debug
        // builds; the context then just holds `this` and captured fields.
        Err(VmError::AbsentInformation) => {}
        Err(err) => return Err(err),
    }

    if let Some(this) = vm.this_object(thread, 0)? {
        bindings.insert(
            "this".to_string(),
            Binding::captured(Value::Object(this.clone()), None),
        );
        walk_enclosing_instances(vm, this, &mut bindings)?;
    }

    Ok(bindings)
}

/// Follow the `this$N` back-link chain through every enclosing instance,
/// binding each level's captured fields without shadowing anything already
/// visible.
///
/// javac numbers the synthetic back-link field by nesting depth, and
/// anonymous classes do not follow the scheme at all, so the link is
/// discovered by scanning the fields rather than assumed by name.
fn walk_enclosing_instances<V: VmConnection>(
    vm: &V,
    innermost: ObjectRef,
    bindings: &mut IndexMap<String, Binding>,
) -> VmResult<()> {
    let mut visited = std::collections::HashSet::new();
    let mut current = innermost;
    loop {
        if !visited.insert(current.id) {
            // A back-link cycle cannot come from javac; bail instead of
            // spinning on a misbehaving adapter.
            break;
        }
        let fields = vm.object_fields(current.id)?;
        let back_link = fields.iter().find_map(|field| {
            if !field.name.starts_with("this$") {
                return None;
            }
            match &field.value {
                Value::Object(outer) => Some(outer.clone()),
                _ => None,
            }
        });

        let Some(outer) = back_link else {
            break;
        };

        for field in vm.object_fields(outer.id)? {
            if field.name.starts_with("this$") {
                continue;
            }
            bindings
                .entry(field.name)
                .or_insert_with(|| Binding::captured(field.value, field.static_type));
        }

        current = outer;
    }
    Ok(())
}
