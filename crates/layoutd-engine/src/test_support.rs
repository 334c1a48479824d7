//! Test doubles for engine consumers.
//! Available with the `test-utils` feature; intended for test suites only.

use std::{
    collections::{HashMap, HashSet},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use parking_lot::Mutex;
use tokio::sync::broadcast;

use crate::{
    AppId, Error, InputSourceBridge, Pid, Result, SourceId, TrackerEvent, WatchSink,
    WatcherFactory, WindowChangeWatcher,
};

/// Calls observed by [`MockBridge`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BridgeCall {
    /// `current_source`.
    CurrentSource,
    /// `select_source` with the requested id.
    Select(SourceId),
    /// `foreground_app`.
    ForegroundApp,
    /// `app_for_pid` with the requested pid.
    AppForPid(Pid),
}

/// In-memory bridge with scriptable OS state and call recording.
#[derive(Debug, Default)]
pub struct MockBridge {
    /// Active input source.
    current: Mutex<Option<SourceId>>,
    /// Sources the OS refuses to select.
    rejected: Mutex<HashSet<SourceId>>,
    /// Foreground application.
    foreground: Mutex<Option<AppId>>,
    /// Known pid to application mapping.
    apps: Mutex<HashMap<Pid, AppId>>,
    /// Every call in order.
    calls: Mutex<Vec<BridgeCall>>,
}

impl MockBridge {
    /// A bridge whose active source is `source`.
    pub fn with_source(source: &str) -> Self {
        let b = Self::default();
        b.set_current(source);
        b
    }

    /// Change the active source, as a user switch would.
    pub fn set_current(&self, source: &str) {
        *self.current.lock() = Some(SourceId::from(source));
    }

    /// Make the active source unreadable.
    pub fn clear_current(&self) {
        *self.current.lock() = None;
    }

    /// Make `source` unselectable (removed layout).
    pub fn reject(&self, source: &str) {
        self.rejected.lock().insert(SourceId::from(source));
    }

    /// Set or clear the foreground application.
    pub fn set_foreground(&self, app: Option<&str>) {
        *self.foreground.lock() = app.map(AppId::from);
    }

    /// Map `pid` to `app`.
    pub fn set_app(&self, pid: Pid, app: &str) {
        self.apps.lock().insert(pid, AppId::from(app));
    }

    /// Forget `pid`, as if the process exited.
    pub fn remove_app(&self, pid: Pid) {
        self.apps.lock().remove(&pid);
    }

    /// All recorded calls.
    pub fn calls(&self) -> Vec<BridgeCall> {
        self.calls.lock().clone()
    }

    /// Sources passed to `select_source`, in order.
    pub fn selects(&self) -> Vec<SourceId> {
        self.calls
            .lock()
            .iter()
            .filter_map(|c| match c {
                BridgeCall::Select(s) => Some(s.clone()),
                _ => None,
            })
            .collect()
    }

    /// Active source as seen by the mock.
    pub fn current(&self) -> Option<SourceId> {
        self.current.lock().clone()
    }

    /// Record a call.
    fn note(&self, call: BridgeCall) {
        self.calls.lock().push(call);
    }
}

impl InputSourceBridge for MockBridge {
    fn current_source(&self) -> Option<SourceId> {
        self.note(BridgeCall::CurrentSource);
        self.current.lock().clone()
    }

    fn select_source(&self, source: &SourceId) -> Result<()> {
        self.note(BridgeCall::Select(source.clone()));
        if self.rejected.lock().contains(source) {
            return Err(Error::UnknownSource(source.clone()));
        }
        *self.current.lock() = Some(source.clone());
        Ok(())
    }

    fn foreground_app(&self) -> Option<AppId> {
        self.note(BridgeCall::ForegroundApp);
        self.foreground.lock().clone()
    }

    fn app_for_pid(&self, pid: Pid) -> Option<AppId> {
        self.note(BridgeCall::AppForPid(pid));
        self.apps.lock().get(&pid).cloned()
    }
}

/// Watcher produced by [`MockWatcherFactory`].
#[derive(Debug)]
pub struct MockWatcher {
    /// Observed process.
    pid: Pid,
    /// Set once disposed.
    disposed: Arc<AtomicBool>,
}

impl WindowChangeWatcher for MockWatcher {
    fn pid(&self) -> Pid {
        self.pid
    }

    fn dispose(&mut self) {
        self.disposed.store(true, Ordering::SeqCst);
    }
}

/// Shared state behind [`MockWatcherFactory`].
#[derive(Debug, Default)]
struct FactoryState {
    /// Pids whose construction fails.
    failing: HashSet<Pid>,
    /// Sinks handed out, most recent per pid.
    sinks: HashMap<Pid, WatchSink>,
    /// Disposal flags per pid, most recent watcher.
    disposed: HashMap<Pid, Arc<AtomicBool>>,
    /// Pids in construction order.
    created: Vec<Pid>,
}

/// Watcher factory that lets tests fire watcher signals by hand.
#[derive(Clone, Debug, Default)]
pub struct MockWatcherFactory {
    /// Shared so tests keep access after moving a clone into a registry.
    state: Arc<Mutex<FactoryState>>,
}

impl MockWatcherFactory {
    /// Make construction for `pid` fail.
    pub fn fail_for(&self, pid: Pid) {
        self.state.lock().failing.insert(pid);
    }

    /// Allow construction for `pid` again.
    pub fn allow(&self, pid: Pid) {
        self.state.lock().failing.remove(&pid);
    }

    /// Pids watchers were created for, in order.
    pub fn created(&self) -> Vec<Pid> {
        self.state.lock().created.clone()
    }

    /// True if the latest watcher for `pid` was disposed.
    pub fn is_disposed(&self, pid: Pid) -> bool {
        self.state
            .lock()
            .disposed
            .get(&pid)
            .is_some_and(|d| d.load(Ordering::SeqCst))
    }

    /// Fire a focused-window change from the latest watcher of `pid`.
    pub fn fire_window_focused(&self, pid: Pid) -> bool {
        let sink = self.state.lock().sinks.get(&pid).cloned();
        sink.is_some_and(|s| s.window_focused())
    }

    /// Fire a hide from the latest watcher of `pid`.
    pub fn fire_app_hidden(&self, pid: Pid) -> bool {
        let sink = self.state.lock().sinks.get(&pid).cloned();
        sink.is_some_and(|s| s.app_hidden())
    }

    /// The sink handed to the latest watcher of `pid`.
    pub fn sink(&self, pid: Pid) -> Option<WatchSink> {
        self.state.lock().sinks.get(&pid).cloned()
    }
}

impl WatcherFactory for MockWatcherFactory {
    type Watcher = MockWatcher;

    fn watch(&self, pid: Pid, sink: WatchSink) -> Result<MockWatcher> {
        let mut st = self.state.lock();
        if st.failing.contains(&pid) {
            return Err(Error::Watch {
                pid,
                reason: "mock failure".into(),
            });
        }
        let disposed = Arc::new(AtomicBool::new(false));
        st.sinks.insert(pid, sink);
        st.disposed.insert(pid, disposed.clone());
        st.created.push(pid);
        Ok(MockWatcher { pid, disposed })
    }
}

/// Receive the next tracker event within `timeout_ms`.
pub async fn next_event(
    rx: &mut broadcast::Receiver<TrackerEvent>,
    timeout_ms: u64,
) -> Option<TrackerEvent> {
    tokio::time::timeout(Duration::from_millis(timeout_ms), rx.recv())
        .await
        .ok()
        .and_then(|r| r.ok())
}

/// Receive events until one satisfies `pred`, up to `timeout_ms` overall.
pub async fn wait_for_event<F>(
    rx: &mut broadcast::Receiver<TrackerEvent>,
    timeout_ms: u64,
    mut pred: F,
) -> Option<TrackerEvent>
where
    F: FnMut(&TrackerEvent) -> bool,
{
    tokio::time::timeout(Duration::from_millis(timeout_ms), async {
        while let Ok(ev) = rx.recv().await {
            if pred(&ev) {
                return Some(ev);
            }
        }
        None
    })
    .await
    .unwrap_or(None)
}
