//! Watched variable expressions.

use javelin_jdi::Value;

use crate::context::InterpreterContext;

/// What a watch currently shows.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WatchValue {
    /// No thread is suspended; the watch has nothing to resolve against.
    NoCurrentThread,
    /// A thread is suspended but nothing by this name is in scope there.
    NotInScope,
    Known {
        rendered: String,
        type_name: Option<String>,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Watch {
    pub name: String,
    pub value: WatchValue,
    /// Set when a concrete value differs from the concrete value of the
    /// immediately preceding read. Transitions in and out of visibility do
    /// not count as changes.
    pub changed: bool,
}

#[derive(Debug, Default)]
pub(crate) struct WatchStore {
    watches: Vec<Watch>,
}

impl WatchStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a watch for `name`. Returns `false` if one already exists.
    pub fn add(&mut self, name: &str) -> bool {
        if self.watches.iter().any(|w| w.name == name) {
            return false;
        }
        self.watches.push(Watch {
            name: name.to_string(),
            value: WatchValue::NoCurrentThread,
            changed: false,
        });
        true
    }

    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.watches.len();
        self.watches.retain(|w| w.name != name);
        self.watches.len() != before
    }

    pub fn clear(&mut self) {
        self.watches.clear();
    }

    pub fn list(&self) -> Vec<Watch> {
        self.watches.clone()
    }

    pub fn is_empty(&self) -> bool {
        self.watches.is_empty()
    }

    /// Re-read every watch.
    ///
    /// `suspended` says whether any thread is current at all; a current
    /// thread without a context (stopped where no debug information exists)
    /// reports every watch as out of scope rather than failing.
    pub fn refresh(&mut self, suspended: bool, context: Option<&InterpreterContext>) {
        for watch in &mut self.watches {
            let next = match (suspended, context) {
                (false, _) => WatchValue::NoCurrentThread,
                (true, None) => WatchValue::NotInScope,
                (true, Some(ctx)) => match ctx.lookup(&watch.name) {
                    Some(binding) => WatchValue::Known {
                        rendered: render_value(&binding.value),
                        type_name: binding
                            .static_type
                            .clone()
                            .or_else(|| binding.value.type_name().map(str::to_string)),
                    },
                    None => WatchValue::NotInScope,
                },
            };
            watch.changed = matches!(
                (&watch.value, &next),
                (WatchValue::Known { .. }, WatchValue::Known { .. })
            ) && watch.value != next;
            watch.value = next;
        }
    }
}

/// Render a mirrored value the way the debugger panels display it.
pub fn render_value(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Void => "void".to_string(),
        Value::Boolean(v) => v.to_string(),
        Value::Byte(v) => v.to_string(),
        Value::Short(v) => v.to_string(),
        Value::Int(v) => v.to_string(),
        Value::Long(v) => v.to_string(),
        Value::Float(v) => v.to_string(),
        Value::Double(v) => v.to_string(),
        Value::Char(v) => format!("'{v}'"),
        Value::Object(obj) => format!("{}@{}", simple_type_name(&obj.runtime_type), obj.id),
    }
}

fn simple_type_name(full: &str) -> &str {
    let tail = full.rsplit('.').next().unwrap_or(full);
    tail.rsplit('$').next().unwrap_or(tail)
}
