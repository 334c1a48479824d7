//! Foreground tracking and input source reconciliation.
//!
//! Two pipelines run side by side for the life of the daemon:
//! - the source pipeline records manual input source switches against the
//!   application that is in the foreground when they happen;
//! - the focus pipeline merges activation, window-focus and hide signals,
//!   drops consecutive duplicates, and restores (or baselines) the input
//!   source of each newly focused application.
//!
//! Each pipeline is a single task draining its own channel, so it handles one
//! event at a time in arrival order. The two pipelines may interleave.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, trace, warn};

use crate::{
    Error, Result,
    bridge::InputSourceBridge,
    config::Config,
    signal::{FocusSignal, SourceChanged},
    store::InputSourceStore,
    types::{AppId, SourceId},
};

/// Which pipeline produced a [`TrackerEvent`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Pipeline {
    /// Input-source-changed handling.
    Source,
    /// Foreground-changed handling.
    Focus,
}

/// Why a signal produced no state change.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SkipReason {
    /// The foreground application or the signalling process had no identity.
    UnresolvedApp,
    /// The bridge could not report the active input source.
    NoCurrentSource,
    /// Same application as the previous transition.
    Duplicate,
    /// The signal came from a watcher that has since been disposed.
    StaleWatcher,
}

/// Result of handling one signal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TrackerEvent {
    /// A manual switch was recorded for the foreground application.
    Recorded {
        /// Foreground application.
        app: AppId,
        /// Source now remembered for it.
        source: SourceId,
    },
    /// A remembered source was selected for a newly focused application.
    Restored {
        /// Newly focused application.
        app: AppId,
        /// Source that was selected.
        source: SourceId,
    },
    /// The active source became the application's baseline, without selecting.
    Baselined {
        /// Newly focused application.
        app: AppId,
        /// Source recorded as baseline.
        source: SourceId,
        /// Previously stored source that the OS rejected, if any.
        replaced_stale: Option<SourceId>,
    },
    /// The signal was dropped.
    Skipped {
        /// Pipeline that dropped it.
        pipeline: Pipeline,
        /// Why it was dropped.
        reason: SkipReason,
    },
}

/// Handles input-source-changed notifications.
pub struct SourcePipeline {
    /// OS access.
    bridge: Arc<dyn InputSourceBridge>,
    /// Shared memory of per-application sources.
    store: InputSourceStore,
}

impl SourcePipeline {
    /// Create a pipeline over `bridge` and `store`.
    pub fn new(bridge: Arc<dyn InputSourceBridge>, store: InputSourceStore) -> Self {
        Self { bridge, store }
    }

    /// Record the now-active source against the foreground application.
    pub fn handle(&self, _signal: SourceChanged) -> TrackerEvent {
        let Some(app) = self.bridge.foreground_app() else {
            warn!("input source changed but the foreground app could not be resolved");
            return skipped(Pipeline::Source, SkipReason::UnresolvedApp);
        };
        let Some(source) = self.bridge.current_source() else {
            warn!(%app, "input source changed but the active source could not be read");
            return skipped(Pipeline::Source, SkipReason::NoCurrentSource);
        };
        debug!(%app, %source, "recording input source");
        self.store.save(app.clone(), source.clone());
        TrackerEvent::Recorded { app, source }
    }
}

/// Handles merged foreground-change signals.
pub struct FocusPipeline {
    /// OS access.
    bridge: Arc<dyn InputSourceBridge>,
    /// Shared memory of per-application sources.
    store: InputSourceStore,
    /// Last application accepted by this pipeline, for duplicate suppression.
    last: Option<AppId>,
}

impl FocusPipeline {
    /// Create a pipeline over `bridge` and `store`.
    pub fn new(bridge: Arc<dyn InputSourceBridge>, store: InputSourceStore) -> Self {
        Self {
            bridge,
            store,
            last: None,
        }
    }

    /// Last application this pipeline reconciled.
    pub fn last_app(&self) -> Option<&AppId> {
        self.last.as_ref()
    }

    /// Resolve, deduplicate and reconcile one signal.
    pub fn handle(&mut self, signal: FocusSignal) -> TrackerEvent {
        let app = match self.resolve(&signal) {
            Ok(app) => app,
            Err(reason) => {
                debug!(kind = signal.kind(), ?reason, "dropping focus signal");
                return skipped(Pipeline::Focus, reason);
            }
        };
        if self.last.as_ref() == Some(&app) {
            trace!(%app, kind = signal.kind(), "suppressing duplicate transition");
            return skipped(Pipeline::Focus, SkipReason::Duplicate);
        }
        debug!(%app, kind = signal.kind(), "foreground changed");
        let event = self.reconcile(app.clone());
        // Only a reconciled app counts as the current foreground, so a
        // skipped transition is retried on the next signal.
        if matches!(
            event,
            TrackerEvent::Restored { .. } | TrackerEvent::Baselined { .. }
        ) {
            self.last = Some(app);
        }
        event
    }

    /// Map a raw signal to the application it brings forward.
    ///
    /// Watcher pids are resolved here rather than at emission so identity
    /// changes between the two are picked up.
    fn resolve(&self, signal: &FocusSignal) -> std::result::Result<AppId, SkipReason> {
        if signal.lease().is_some_and(|l| !l.is_live()) {
            return Err(SkipReason::StaleWatcher);
        }
        let app = match signal {
            FocusSignal::Activated { app } => Some(app.clone()),
            FocusSignal::WindowFocused { pid, .. } => self.bridge.app_for_pid(*pid),
            FocusSignal::Hidden { .. } => self.bridge.foreground_app(),
        };
        app.ok_or(SkipReason::UnresolvedApp)
    }

    /// Restore the remembered source for `app`, or baseline it.
    fn reconcile(&self, app: AppId) -> TrackerEvent {
        let mut stale = None;
        if let Some(source) = self.store.load(&app) {
            match self.bridge.select_source(&source) {
                Ok(()) => {
                    info!(%app, %source, "restored input source");
                    return TrackerEvent::Restored { app, source };
                }
                Err(e) => {
                    warn!(%app, "stored input source rejected, re-baselining: {}", e);
                    stale = Some(source);
                }
            }
        }
        let Some(source) = self.bridge.current_source() else {
            warn!(%app, "cannot baseline: active input source unavailable");
            return skipped(Pipeline::Focus, SkipReason::NoCurrentSource);
        };
        debug!(%app, %source, "registering baseline input source");
        self.store.save(app.clone(), source.clone());
        TrackerEvent::Baselined {
            app,
            source,
            replaced_stale: stale,
        }
    }
}

/// Shorthand for a skip event.
fn skipped(pipeline: Pipeline, reason: SkipReason) -> TrackerEvent {
    TrackerEvent::Skipped { pipeline, reason }
}

/// Cheap, clonable handle to the running tracker.
#[derive(Clone, Debug)]
pub struct TrackerHandle {
    /// Focus pipeline input.
    focus_tx: mpsc::UnboundedSender<FocusSignal>,
    /// Source pipeline input.
    source_tx: mpsc::UnboundedSender<SourceChanged>,
    /// Outcome stream.
    events: broadcast::Sender<TrackerEvent>,
    /// Store shared by both pipelines.
    store: InputSourceStore,
}

impl TrackerHandle {
    /// Sender for foreground signals; clone into every signal source.
    pub fn focus_sender(&self) -> mpsc::UnboundedSender<FocusSignal> {
        self.focus_tx.clone()
    }

    /// Sender for input-source-changed notifications.
    pub fn source_sender(&self) -> mpsc::UnboundedSender<SourceChanged> {
        self.source_tx.clone()
    }

    /// Queue a foreground signal.
    pub fn notify_focus(&self, signal: FocusSignal) -> Result<()> {
        self.focus_tx.send(signal).map_err(|_| Error::ChannelClosed)
    }

    /// Queue an input-source-changed notification.
    pub fn notify_source_changed(&self) -> Result<()> {
        self.source_tx
            .send(SourceChanged)
            .map_err(|_| Error::ChannelClosed)
    }

    /// Subscribe to the outcome of every handled signal.
    pub fn subscribe(&self) -> broadcast::Receiver<TrackerEvent> {
        self.events.subscribe()
    }

    /// The store shared by both pipelines.
    pub fn store(&self) -> &InputSourceStore {
        &self.store
    }
}

/// Tracker constructor. Spawns both pipelines and returns a handle.
pub struct AppFocusTracker;

impl AppFocusTracker {
    /// Spawn both pipelines on the current Tokio runtime.
    ///
    /// The pipelines stop once every sender (handles and registry sinks) is
    /// dropped.
    pub fn spawn(
        bridge: Arc<dyn InputSourceBridge>,
        store: InputSourceStore,
        cfg: &Config,
    ) -> TrackerHandle {
        let (focus_tx, focus_rx) = mpsc::unbounded_channel();
        let (source_tx, source_rx) = mpsc::unbounded_channel();
        let (events, _rx) = broadcast::channel(cfg.event_capacity.max(1));

        let source = SourcePipeline::new(bridge.clone(), store.clone());
        let focus = FocusPipeline::new(bridge, store.clone());
        tokio::spawn(run_source_pipeline(source_rx, source, events.clone()));
        tokio::spawn(run_focus_pipeline(focus_rx, focus, events.clone()));

        TrackerHandle {
            focus_tx,
            source_tx,
            events,
            store,
        }
    }
}

/// Drain input-source-changed notifications one at a time.
async fn run_source_pipeline(
    mut rx: mpsc::UnboundedReceiver<SourceChanged>,
    pipeline: SourcePipeline,
    events: broadcast::Sender<TrackerEvent>,
) {
    while let Some(signal) = rx.recv().await {
        trace!("input source changed");
        let _ = events.send(pipeline.handle(signal));
    }
    debug!("source pipeline stopped");
}

/// Drain foreground signals one at a time.
async fn run_focus_pipeline(
    mut rx: mpsc::UnboundedReceiver<FocusSignal>,
    mut pipeline: FocusPipeline,
    events: broadcast::Sender<TrackerEvent>,
) {
    while let Some(signal) = rx.recv().await {
        let _ = events.send(pipeline.handle(signal));
    }
    debug!("focus pipeline stopped");
}
