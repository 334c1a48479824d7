//! Per-process window-change watchers and the registry that owns them.
//!
//! One watcher is kept for every running process that owns at least one
//! on-screen window and is not excluded. The registry is refreshed whenever
//! the OS reports that the set of running processes changed; each refresh
//! diffs the old and new pid sets inside a single critical section.

use std::collections::{HashMap, HashSet};

use parking_lot::Mutex;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, trace};

use crate::{
    Result,
    config::Exclusions,
    signal::{FocusSignal, WatchLease},
    types::{AppId, Pid},
};

/// Handle to a live per-process observation.
pub trait WindowChangeWatcher {
    /// Process being observed.
    fn pid(&self) -> Pid;

    /// Stop observing immediately. Called exactly once, before the watcher
    /// is dropped by the registry.
    fn dispose(&mut self);
}

/// Constructs watchers for processes.
pub trait WatcherFactory {
    /// Watcher type produced by this factory.
    type Watcher: WindowChangeWatcher;

    /// Start watching `pid`, emitting through `sink`.
    ///
    /// Fails when the process vanished since it was listed or cannot be
    /// observed (for instance without Accessibility permission).
    fn watch(&self, pid: Pid, sink: WatchSink) -> Result<Self::Watcher>;
}

/// Emission endpoint handed to a watcher at construction.
#[derive(Clone, Debug)]
pub struct WatchSink {
    /// Process the watcher observes.
    pid: Pid,
    /// Shared liveness flag, revoked on disposal.
    lease: WatchLease,
    /// Tracker focus pipeline input.
    tx: UnboundedSender<FocusSignal>,
}

impl WatchSink {
    /// Create a sink for `pid` feeding `tx`.
    pub fn new(pid: Pid, lease: WatchLease, tx: UnboundedSender<FocusSignal>) -> Self {
        Self { pid, lease, tx }
    }

    /// Process this sink emits for.
    pub fn pid(&self) -> Pid {
        self.pid
    }

    /// True while the owning watcher is registered.
    pub fn is_live(&self) -> bool {
        self.lease.is_live()
    }

    /// Report that the process's focused window changed.
    ///
    /// Returns false if nothing was sent (watcher disposed or tracker gone).
    pub fn window_focused(&self) -> bool {
        self.emit(FocusSignal::WindowFocused {
            pid: self.pid,
            lease: self.lease.clone(),
        })
    }

    /// Report that the process was hidden.
    pub fn app_hidden(&self) -> bool {
        self.emit(FocusSignal::Hidden {
            pid: self.pid,
            lease: self.lease.clone(),
        })
    }

    /// Send `signal` unless the lease was revoked.
    fn emit(&self, signal: FocusSignal) -> bool {
        if !self.lease.is_live() {
            trace!(pid = self.pid, "dropping signal from disposed watcher");
            return false;
        }
        self.tx.send(signal).is_ok()
    }
}

/// One running process as seen by the OS at refresh time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunningProcess {
    /// OS process id.
    pub pid: Pid,
    /// Application identity, when the process has one.
    pub app: Option<AppId>,
    /// True if the process owns at least one on-screen window.
    pub windowed: bool,
}

/// The OS process list at one instant.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProcessSnapshot {
    /// Running processes.
    pub processes: Vec<RunningProcess>,
}

impl ProcessSnapshot {
    /// Build a snapshot from a process list.
    pub fn new(processes: Vec<RunningProcess>) -> Self {
        Self { processes }
    }

    /// Application identity recorded for `pid`, if listed.
    fn app_of(&self, pid: Pid) -> Option<&AppId> {
        self.processes
            .iter()
            .find(|p| p.pid == pid)
            .and_then(|p| p.app.as_ref())
    }
}

/// Pids that should hold a watcher according to `snapshot`.
pub fn qualifying_pids(snapshot: &ProcessSnapshot, exclusions: &Exclusions) -> HashSet<Pid> {
    snapshot
        .processes
        .iter()
        .filter(|p| p.windowed)
        .filter(|p| !p.app.as_ref().is_some_and(|a| exclusions.contains(a)))
        .map(|p| p.pid)
        .collect()
}

/// Outcome of a single [`ProcessRegistry::refresh`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RefreshReport {
    /// Pids that received a new watcher.
    pub added: Vec<Pid>,
    /// Pids whose watcher was disposed.
    pub removed: Vec<Pid>,
    /// Pids that qualified but could not be watched.
    pub failed: Vec<Pid>,
}

impl RefreshReport {
    /// True if the refresh changed nothing and hit no failures.
    pub fn is_noop(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.failed.is_empty()
    }
}

/// A registered watcher and the bookkeeping needed to retire it.
struct Entry<W> {
    /// The live watcher.
    watcher: W,
    /// Lease shared with the watcher's sink.
    lease: WatchLease,
    /// Application identity at registration, used to detect pid reuse.
    app: Option<AppId>,
}

/// Owns exactly one watcher per qualifying process.
pub struct ProcessRegistry<F: WatcherFactory> {
    /// Watcher constructor.
    factory: F,
    /// Applications never watched.
    exclusions: Exclusions,
    /// Tracker focus pipeline input, cloned into every sink.
    tx: UnboundedSender<FocusSignal>,
    /// Live watchers keyed by pid. Only touched under this lock.
    watchers: Mutex<HashMap<Pid, Entry<F::Watcher>>>,
}

impl<F: WatcherFactory> ProcessRegistry<F> {
    /// Create an empty registry. Call [`ProcessRegistry::refresh`] to populate.
    pub fn new(factory: F, exclusions: Exclusions, tx: UnboundedSender<FocusSignal>) -> Self {
        Self {
            factory,
            exclusions,
            tx,
            watchers: Mutex::new(HashMap::new()),
        }
    }

    /// Reconcile the watcher set against `snapshot`.
    ///
    /// Removed pids are disposed, new pids are watched, and a pid whose
    /// application identity changed since registration is treated as a new
    /// process. All of it happens while holding the map lock.
    pub fn refresh(&self, snapshot: &ProcessSnapshot) -> RefreshReport {
        let wanted = qualifying_pids(snapshot, &self.exclusions);
        let mut report = RefreshReport::default();

        let mut watchers = self.watchers.lock();
        let reused: Vec<Pid> = watchers
            .iter()
            .filter(|&(pid, e)| wanted.contains(pid) && e.app.as_ref() != snapshot.app_of(*pid))
            .map(|(pid, _)| *pid)
            .collect();
        let current: HashSet<Pid> = watchers
            .keys()
            .copied()
            .filter(|pid| !reused.contains(pid))
            .collect();

        for pid in current.difference(&wanted).copied().chain(reused) {
            if let Some(entry) = watchers.remove(&pid) {
                trace!(pid, "disposing window watcher");
                retire(entry);
                report.removed.push(pid);
            }
        }

        for pid in wanted.difference(&current).copied() {
            let lease = WatchLease::new();
            let sink = WatchSink::new(pid, lease.clone(), self.tx.clone());
            match self.factory.watch(pid, sink) {
                Ok(watcher) => {
                    trace!(pid, "watching process");
                    let app = snapshot.app_of(pid).cloned();
                    watchers.insert(
                        pid,
                        Entry {
                            watcher,
                            lease,
                            app,
                        },
                    );
                    report.added.push(pid);
                }
                Err(e) => {
                    lease.revoke();
                    debug!(pid, "failed to create window watcher: {}", e);
                    report.failed.push(pid);
                }
            }
        }
        drop(watchers);

        report.added.sort_unstable();
        report.removed.sort_unstable();
        report.failed.sort_unstable();
        report
    }

    /// Sorted list of watched pids.
    pub fn watched(&self) -> Vec<Pid> {
        let mut pids: Vec<Pid> = self.watchers.lock().keys().copied().collect();
        pids.sort_unstable();
        pids
    }

    /// True if `pid` currently holds a watcher.
    pub fn is_watched(&self, pid: Pid) -> bool {
        self.watchers.lock().contains_key(&pid)
    }

    /// Number of live watchers.
    pub fn len(&self) -> usize {
        self.watchers.lock().len()
    }

    /// True if no process is watched.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Dispose every watcher.
    pub fn clear(&self) {
        let mut watchers = self.watchers.lock();
        for (_, entry) in watchers.drain() {
            retire(entry);
        }
    }
}

/// Revoke the lease first so nothing emitted during teardown is accepted.
fn retire<W: WindowChangeWatcher>(mut entry: Entry<W>) {
    entry.lease.revoke();
    entry.watcher.dispose();
}
