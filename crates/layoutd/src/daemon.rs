//! The long-running daemon: Tao main loop plus a Tokio runtime for the tracker.
//!
//! All OS observers (NSWorkspace, distributed notifications, AX) are installed
//! on the main thread once the Tao loop starts, and deliver on its run loop.
//! They only forward signals into the tracker's channels; the pipelines run on
//! the runtime's worker threads.

use std::{
    future,
    rc::Rc,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use layoutd_engine::{
    AppFocusTracker, AppId, Config, FocusSignal, InputSourceBridge, InputSourceStore,
    ProcessRegistry, TrackerEvent, TrackerHandle,
};
use mac_focus_watcher::{NotificationObserver, RunningApp, WorkspaceNotification};
use tao::{
    event::{Event, StartCause},
    event_loop::{ControlFlow, EventLoop, EventLoopProxy},
    platform::macos::{ActivationPolicy, EventLoopExtMacOS},
};
use tokio::{
    runtime::Runtime,
    signal::unix::{SignalKind, signal},
    sync::broadcast,
};
use tracing::{debug, error, info, trace, warn};

use crate::{
    Result,
    bridge::MacBridge,
    watch::{AxWatcherFactory, process_snapshot},
};

/// Main-thread observers feeding one tracker. Dropping it stops every
/// observer, then disposes every window watcher.
struct Wiring {
    /// Notification registrations; dropped first.
    observers: Vec<NotificationObserver>,
    /// Per-process window watchers.
    registry: Rc<ProcessRegistry<AxWatcherFactory>>,
}

impl Wiring {
    /// Build the registry and install all observers on the current thread.
    fn install(tracker: &TrackerHandle, cfg: &Config) -> Self {
        let registry = Rc::new(ProcessRegistry::new(
            AxWatcherFactory,
            cfg.exclusions.clone(),
            tracker.focus_sender(),
        ));
        refresh(&registry);

        let on_activate = {
            let tracker = tracker.clone();
            let registry = registry.clone();
            move |app: Option<RunningApp>| {
                forward_activation(&tracker, app);
                refresh(&registry);
            }
        };
        let on_lifecycle = {
            let registry = registry.clone();
            move |_: Option<RunningApp>| refresh(&registry)
        };
        let on_source_changed = {
            let tracker = tracker.clone();
            move || {
                if let Err(e) = tracker.notify_source_changed() {
                    warn!("dropping input source change: {}", e);
                }
            }
        };

        let observers = vec![
            NotificationObserver::workspace(
                WorkspaceNotification::DidActivateApplication,
                on_activate,
            ),
            NotificationObserver::workspace(
                WorkspaceNotification::DidLaunchApplication,
                on_lifecycle.clone(),
            ),
            NotificationObserver::workspace(
                WorkspaceNotification::DidTerminateApplication,
                on_lifecycle,
            ),
            NotificationObserver::distributed(
                &mac_input_source::selected_source_changed_notification(),
                on_source_changed,
            ),
        ];
        info!(watched = registry.len(), "observers installed");
        Self {
            observers,
            registry,
        }
    }
}

impl Drop for Wiring {
    fn drop(&mut self) {
        self.observers.clear();
        self.registry.clear();
        debug!("observers removed");
    }
}

/// Re-list processes and reconcile the watcher set.
fn refresh(registry: &ProcessRegistry<AxWatcherFactory>) {
    let report = registry.refresh(&process_snapshot());
    if !report.is_noop() {
        debug!(
            added = ?report.added,
            removed = ?report.removed,
            failed = ?report.failed,
            "process registry refreshed"
        );
    }
}

/// Forward an activation notification; events without a bundle id are dropped.
fn forward_activation(tracker: &TrackerHandle, app: Option<RunningApp>) {
    let Some(app) = app.and_then(|a| a.bundle_id).map(AppId::from) else {
        trace!("activation without bundle id ignored");
        return;
    };
    if let Err(e) = tracker.notify_focus(FocusSignal::Activated { app }) {
        warn!("dropping activation: {}", e);
    }
}

/// Log every tracker decision.
async fn log_events(mut rx: broadcast::Receiver<TrackerEvent>) {
    loop {
        match rx.recv().await {
            Ok(TrackerEvent::Skipped { pipeline, reason }) => {
                trace!(?pipeline, ?reason, "skipped");
            }
            Ok(TrackerEvent::Restored { app, source }) => info!(%app, %source, "restored"),
            Ok(event) => debug!(?event, "tracker"),
            Err(broadcast::error::RecvError::Lagged(n)) => debug!("event log lagged by {}", n),
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

/// Flip `shutdown` on SIGINT/SIGTERM and wake the main loop.
async fn wait_for_signal(shutdown: Arc<AtomicBool>, proxy: EventLoopProxy<()>) {
    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => {
                error!("cannot listen for SIGTERM: {}", e);
                future::pending::<()>().await;
            }
        }
    };
    tokio::select! {
        _ = tokio::signal::ctrl_c() => info!("interrupt received"),
        _ = terminate => info!("terminate received"),
    }
    shutdown.store(true, Ordering::SeqCst);
    let _ = proxy.send_event(());
}

/// Run until interrupted. Must be called on the main thread.
pub fn run(cfg: Config) -> Result<()> {
    if !permissions::request_accessibility() {
        warn!("Accessibility permission not granted; window focus changes will be missed");
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .thread_name("layoutd-rt")
        .enable_all()
        .build()?;
    let bridge: Arc<dyn InputSourceBridge> = Arc::new(MacBridge);
    let tracker = {
        let _guard = runtime.enter();
        AppFocusTracker::spawn(bridge, InputSourceStore::new(), &cfg)
    };
    runtime.spawn(log_events(tracker.subscribe()));

    // Create the tao event loop (must be on main thread for macOS)
    let mut event_loop = EventLoop::new();
    event_loop.set_activation_policy(ActivationPolicy::Accessory);
    let shutdown = Arc::new(AtomicBool::new(false));
    runtime.spawn(wait_for_signal(shutdown.clone(), event_loop.create_proxy()));

    let mut runtime: Option<Runtime> = Some(runtime);
    let mut tracker: Option<TrackerHandle> = Some(tracker);
    let mut wiring: Option<Wiring> = None;
    info!("layoutd started");

    event_loop.run(move |event, _, control_flow| {
        *control_flow = ControlFlow::Wait;

        match step(&event, shutdown.load(Ordering::SeqCst)) {
            Step::Install => {
                if let Some(t) = &tracker {
                    wiring = Some(Wiring::install(t, &cfg));
                }
            }
            Step::Exit => {
                if wiring.take().is_some() {
                    debug!("Shutdown requested, exiting event loop");
                }
                *control_flow = ControlFlow::Exit;
            }
            Step::Teardown => {
                wiring.take();
                // Dropping the last senders lets both pipelines drain and stop.
                tracker.take();
                if let Some(rt) = runtime.take() {
                    rt.shutdown_timeout(Duration::from_millis(500));
                }
                info!("layoutd stopped");
            }
            Step::Continue => {}
        }
    })
}

/// What the main loop does with one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    /// Install observers and the registry.
    Install,
    /// Nothing to do.
    Continue,
    /// Remove observers and leave the loop.
    Exit,
    /// Final cleanup; the loop is gone after this.
    Teardown,
}

/// Decide the loop action. Teardown runs even after shutdown was requested.
fn step(event: &Event<'_, ()>, shutdown: bool) -> Step {
    match event {
        Event::LoopDestroyed => Step::Teardown,
        _ if shutdown => Step::Exit,
        Event::NewEvents(StartCause::Init) => Step::Install,
        _ => Step::Continue,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loop_destroyed_tears_down_after_shutdown() {
        assert_eq!(step(&Event::LoopDestroyed, true), Step::Teardown);
        assert_eq!(step(&Event::LoopDestroyed, false), Step::Teardown);
    }

    #[test]
    fn shutdown_exits_on_any_other_event() {
        assert_eq!(step(&Event::NewEvents(StartCause::Init), true), Step::Exit);
        assert_eq!(step(&Event::MainEventsCleared, true), Step::Exit);
        assert_eq!(step(&Event::UserEvent(()), true), Step::Exit);
    }

    #[test]
    fn init_installs_observers() {
        assert_eq!(step(&Event::NewEvents(StartCause::Init), false), Step::Install);
        assert_eq!(step(&Event::UserEvent(()), false), Step::Continue);
    }
}
