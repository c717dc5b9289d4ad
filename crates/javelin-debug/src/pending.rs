//! Registry of actions whose target class has not been loaded yet.
//!
//! Entries are keyed by the *outer* class name: a breakpoint in
//! `com.example.Foo$Inner` waits under `com.example.Foo`, because the target
//! reports class preparation per loaded type and the nested types of one
//! outer class share its load watch. Each key owns exactly one class-prepare
//! watch request, created lazily on first registration and torn down when the
//! key's action list empties.

use indexmap::IndexMap;

use javelin_jdi::{ClassRef, RequestId, VmConnection, VmResult};

use crate::action::ActionId;
use crate::error::swallow_stale;

/// Outer class name of a possibly-nested binary class name: everything up to
/// the first `$`, which separates nested and anonymous suffixes.
pub(crate) fn outer_class_name(name: &str) -> &str {
    match name.find('$') {
        Some(split) => &name[..split],
        None => name,
    }
}

#[derive(Debug)]
struct PendingEntry {
    watch_request: RequestId,
    actions: Vec<ActionId>,
}

#[derive(Debug, Default)]
pub struct PendingRequestRegistry {
    entries: IndexMap<String, PendingEntry>,
}

impl PendingRequestRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Park an action until a class named `class_name` (or a nested class of
    /// it) loads. Creates the key's class-prepare watch on first use.
    pub fn register<V: VmConnection>(
        &mut self,
        vm: &V,
        class_name: &str,
        action: ActionId,
    ) -> VmResult<()> {
        let key = outer_class_name(class_name);
        if let Some(entry) = self.entries.get_mut(key) {
            if !entry.actions.contains(&action) {
                entry.actions.push(action);
            }
            return Ok(());
        }

        // The wildcard also watches nested classes; loads of unrelated
        // classes sharing the prefix are filtered out on lookup.
        let watch_request = vm.create_class_prepare_request(&format!("{key}*"))?;
        self.entries.insert(
            key.to_string(),
            PendingEntry {
                watch_request,
                actions: vec![action],
            },
        );
        Ok(())
    }

    /// Forget a parked action; tears down the key's watch request once no
    /// action waits under it.
    pub fn deregister<V: VmConnection>(&mut self, vm: &V, class_name: &str, action: ActionId) {
        let key = outer_class_name(class_name);
        let Some(entry) = self.entries.get_mut(key) else {
            return;
        };
        entry.actions.retain(|a| *a != action);
        if entry.actions.is_empty() {
            if let Some(entry) = self.entries.shift_remove(key) {
                swallow_stale(
                    vm.clear_request(entry.watch_request),
                    "class watch teardown",
                );
            }
        }
    }

    /// React to a class-prepared notification: drain and return the actions
    /// waiting for this class, tearing down the key's watch.
    ///
    /// A load of an unrelated class that merely shares the watched prefix
    /// finds no entry and returns an empty list; that is not an error.
    pub fn on_class_prepared<V: VmConnection>(&mut self, vm: &V, loaded: &ClassRef) -> Vec<ActionId> {
        let key = outer_class_name(&loaded.name);
        let Some(entry) = self.entries.shift_remove(key) else {
            return Vec::new();
        };
        swallow_stale(
            vm.clear_request(entry.watch_request),
            "class watch teardown",
        );
        entry.actions
    }

    pub fn is_pending(&self, class_name: &str, action: ActionId) -> bool {
        self.entries
            .get(outer_class_name(class_name))
            .is_some_and(|entry| entry.actions.contains(&action))
    }

    /// Tear down every watch request. Used at session shutdown.
    pub fn clear<V: VmConnection>(&mut self, vm: &V) {
        for (_, entry) in self.entries.drain(..) {
            swallow_stale(
                vm.clear_request(entry.watch_request),
                "class watch teardown",
            );
        }
    }

    #[cfg(test)]
    fn watched_keys(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }
}
