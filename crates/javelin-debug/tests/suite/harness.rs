//! Shared fixture for the integration suite.
//!
//! Every test drives a real `DebugSession` — dispatch thread included —
//! against the deterministic `MockVm`. Synchronization is channel-based: a
//! listener forwards each notification into a crossbeam channel and tests
//! block on it (with a bounded timeout) until the expected events arrive.
//! The production engine carries no test-only wait/notify bookkeeping.

use std::cell::RefCell;
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Receiver};

use javelin_debug::{
    DebugEvent, DebugSession, DocumentId, DocumentView, SourceRegion,
};
use javelin_jdi::mock::MockVm;

pub const EVENT_TIMEOUT: Duration = Duration::from_secs(5);
/// Quiet period after which we consider the notification stream settled.
const SETTLE: Duration = Duration::from_millis(150);

pub struct EventLog {
    rx: Receiver<DebugEvent>,
    seen: RefCell<Vec<DebugEvent>>,
}

impl EventLog {
    /// Consume events until one matches, failing the test after the timeout.
    pub fn wait_for(&self, what: &str, matches: impl Fn(&DebugEvent) -> bool) -> DebugEvent {
        let deadline = Instant::now() + EVENT_TIMEOUT;
        loop {
            let remaining = deadline
                .checked_duration_since(Instant::now())
                .unwrap_or_else(|| {
                    panic!("timed out waiting for {what}; saw {:?}", self.seen.borrow())
                });
            match self.rx.recv_timeout(remaining) {
                Ok(event) => {
                    self.seen.borrow_mut().push(event.clone());
                    if matches(&event) {
                        return event;
                    }
                }
                Err(_) => panic!("timed out waiting for {what}; saw {:?}", self.seen.borrow()),
            }
        }
    }

    /// Drain everything currently in flight, then go quiet.
    pub fn settle(&self) {
        while let Ok(event) = self.rx.recv_timeout(SETTLE) {
            self.seen.borrow_mut().push(event);
        }
    }

    /// How many events seen so far (after `wait_for`/`settle`) match.
    pub fn count(&self, matches: impl Fn(&DebugEvent) -> bool) -> usize {
        self.seen.borrow().iter().filter(|e| matches(e)).count()
    }

    pub fn assert_none(&self, what: &str, matches: impl Fn(&DebugEvent) -> bool) {
        assert_eq!(self.count(matches), 0, "unexpected {what}: {:?}", self.seen.borrow());
    }
}

pub struct Fixture {
    pub vm: MockVm,
    pub session: DebugSession<MockVm>,
    pub events: EventLog,
}

pub fn fixture() -> Fixture {
    init_tracing();
    let vm = MockVm::new();
    let session = DebugSession::new(vm.clone());
    let (tx, rx) = unbounded();
    session.add_listener(move |event: &DebugEvent| {
        let _ = tx.send(event.clone());
    });
    Fixture {
        vm,
        session,
        events: EventLog {
            rx,
            seen: RefCell::new(Vec::new()),
        },
    }
}

/// Fixture with an already-started session.
pub fn started() -> Fixture {
    let f = fixture();
    f.session.startup().expect("startup");
    f.events
        .wait_for("session start", |e| matches!(e, DebugEvent::SessionStarted));
    f
}

/// Poll a mock-side condition the engine satisfies asynchronously on its
/// dispatch thread.
pub fn wait_until(what: &str, condition: impl Fn() -> bool) {
    let deadline = Instant::now() + EVENT_TIMEOUT;
    while Instant::now() < deadline {
        if condition() {
            return;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    panic!("timed out waiting until {what}");
}

/// Stand-in for an editor document: a fixed class name for every offset.
pub struct FakeDocument {
    id: DocumentId,
    class_name: String,
    exact_class: Option<String>,
}

impl FakeDocument {
    pub fn new(id: u64, class_name: &str) -> Self {
        Self {
            id: DocumentId::new(id),
            class_name: class_name.to_string(),
            exact_class: None,
        }
    }

    pub fn with_exact(id: u64, class_name: &str, exact: &str) -> Self {
        Self {
            id: DocumentId::new(id),
            class_name: class_name.to_string(),
            exact_class: Some(exact.to_string()),
        }
    }
}

impl DocumentView for FakeDocument {
    fn id(&self) -> DocumentId {
        self.id
    }

    fn class_name_at(&self, _offset: usize) -> Option<String> {
        Some(self.class_name.clone())
    }

    fn exact_class_name_at(&self, _offset: usize) -> Option<String> {
        self.exact_class.clone()
    }

    fn line_region(&self, line: u32) -> SourceRegion {
        let start = line as usize * 80;
        SourceRegion {
            start,
            end: start + 79,
        }
    }
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
