//! Process listing and AX-backed window-change watchers.

use std::collections::HashSet;

use layoutd_engine::{
    AppId, Error, Pid, ProcessSnapshot, Result, RunningProcess, WatchSink, WatcherFactory,
    WindowChangeWatcher,
};
use mac_focus_watcher::{AxNotification, AxWatcher};

/// Current processes, with window ownership from the CoreGraphics window list.
pub fn process_snapshot() -> ProcessSnapshot {
    let windowed: HashSet<Pid> = mac_focus_watcher::windowed_pids();
    ProcessSnapshot::new(
        mac_focus_watcher::running_apps()
            .into_iter()
            .map(|app| RunningProcess {
                pid: app.pid,
                windowed: windowed.contains(&app.pid),
                app: app.bundle_id.map(AppId::from),
            })
            .collect(),
    )
}

/// [`WindowChangeWatcher`] over a per-process AX observer.
#[derive(Debug)]
pub struct AxWindowWatcher(AxWatcher);

impl WindowChangeWatcher for AxWindowWatcher {
    fn pid(&self) -> Pid {
        self.0.pid()
    }

    fn dispose(&mut self) {
        self.0.dispose();
    }
}

/// Builds [`AxWindowWatcher`]s on the calling thread's run loop.
#[derive(Debug, Default, Clone, Copy)]
pub struct AxWatcherFactory;

impl WatcherFactory for AxWatcherFactory {
    type Watcher = AxWindowWatcher;

    fn watch(&self, pid: Pid, sink: WatchSink) -> Result<Self::Watcher> {
        AxWatcher::install(pid, move |kind| {
            match kind {
                AxNotification::FocusedWindowChanged => sink.window_focused(),
                AxNotification::ApplicationHidden => sink.app_hidden(),
            };
        })
        .map(AxWindowWatcher)
        .map_err(|e| Error::Watch {
            pid,
            reason: e.to_string(),
        })
    }
}
