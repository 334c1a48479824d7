use std::sync::Arc;

use layoutd_engine::{
    AppFocusTracker, AppId, Config, Exclusions, FocusSignal, InputSourceStore, ProcessRegistry,
    ProcessSnapshot, RunningProcess, SkipReason, SourceId, TrackerEvent,
    test_support::{MockBridge, MockWatcherFactory, next_event, wait_for_event},
};

const TIMEOUT_MS: u64 = 500;

fn activated(app: &str) -> FocusSignal {
    FocusSignal::Activated {
        app: AppId::from(app),
    }
}

#[tokio::test(flavor = "current_thread")]
async fn focus_events_are_reconciled_in_order() {
    let bridge = Arc::new(MockBridge::with_source("S0"));
    let tracker = AppFocusTracker::spawn(bridge.clone(), InputSourceStore::new(), &Config::default());
    let mut rx = tracker.subscribe();

    for app in ["A", "A", "B", "A"] {
        tracker.notify_focus(activated(app)).expect("send");
    }

    let mut seen = Vec::new();
    for _ in 0..4 {
        seen.push(next_event(&mut rx, TIMEOUT_MS).await.expect("event"));
    }
    assert!(matches!(&seen[0], TrackerEvent::Baselined { app, .. } if *app == AppId::from("A")));
    assert!(matches!(
        &seen[1],
        TrackerEvent::Skipped {
            reason: SkipReason::Duplicate,
            ..
        }
    ));
    assert!(matches!(&seen[2], TrackerEvent::Baselined { app, .. } if *app == AppId::from("B")));
    assert_eq!(
        seen[3],
        TrackerEvent::Restored {
            app: AppId::from("A"),
            source: SourceId::from("S0"),
        }
    );
}

#[tokio::test(flavor = "current_thread")]
async fn manual_switch_is_recorded_and_restored() {
    let bridge = Arc::new(MockBridge::with_source("S0"));
    let tracker = AppFocusTracker::spawn(bridge.clone(), InputSourceStore::new(), &Config::default());
    let mut rx = tracker.subscribe();

    tracker.notify_focus(activated("A")).expect("send");
    wait_for_event(&mut rx, TIMEOUT_MS, |e| matches!(e, TrackerEvent::Baselined { .. }))
        .await
        .expect("baseline A");

    tracker.notify_focus(activated("B")).expect("send");
    wait_for_event(&mut rx, TIMEOUT_MS, |e| matches!(e, TrackerEvent::Baselined { .. }))
        .await
        .expect("baseline B");

    bridge.set_foreground(Some("B"));
    bridge.set_current("S1");
    tracker.notify_source_changed().expect("send");
    let rec = wait_for_event(&mut rx, TIMEOUT_MS, |e| matches!(e, TrackerEvent::Recorded { .. }))
        .await
        .expect("recorded");
    assert_eq!(
        rec,
        TrackerEvent::Recorded {
            app: AppId::from("B"),
            source: SourceId::from("S1"),
        }
    );

    tracker.notify_focus(activated("A")).expect("send");
    tracker.notify_focus(activated("B")).expect("send");
    let a = wait_for_event(&mut rx, TIMEOUT_MS, |e| matches!(e, TrackerEvent::Restored { .. }))
        .await
        .expect("restore A");
    let b = wait_for_event(&mut rx, TIMEOUT_MS, |e| matches!(e, TrackerEvent::Restored { .. }))
        .await
        .expect("restore B");
    assert_eq!(
        a,
        TrackerEvent::Restored {
            app: AppId::from("A"),
            source: SourceId::from("S0"),
        }
    );
    assert_eq!(
        b,
        TrackerEvent::Restored {
            app: AppId::from("B"),
            source: SourceId::from("S1"),
        }
    );
    assert_eq!(tracker.store().len(), 2);
}

#[tokio::test(flavor = "current_thread")]
async fn registry_signals_flow_into_focus_pipeline() {
    let bridge = Arc::new(MockBridge::with_source("S0"));
    bridge.set_app(100, "com.example.spotlightish");
    let tracker = AppFocusTracker::spawn(bridge.clone(), InputSourceStore::new(), &Config::default());
    let mut rx = tracker.subscribe();

    let factory = MockWatcherFactory::default();
    let registry = ProcessRegistry::new(
        factory.clone(),
        Exclusions::default(),
        tracker.focus_sender(),
    );
    registry.refresh(&ProcessSnapshot::new(vec![RunningProcess {
        pid: 100,
        app: Some(AppId::from("com.example.spotlightish")),
        windowed: true,
    }]));

    assert!(factory.fire_window_focused(100));
    let ev = next_event(&mut rx, TIMEOUT_MS).await.expect("event");
    assert!(
        matches!(ev, TrackerEvent::Baselined { ref app, .. } if *app == AppId::from("com.example.spotlightish"))
    );

    // Fire, then dispose before the pipeline gets a chance to run.
    tracker.notify_focus(activated("other")).expect("send");
    assert!(factory.fire_window_focused(100));
    registry.refresh(&ProcessSnapshot::default());

    let first = next_event(&mut rx, TIMEOUT_MS).await.expect("other");
    let second = next_event(&mut rx, TIMEOUT_MS).await.expect("stale");
    assert!(matches!(first, TrackerEvent::Baselined { .. }));
    assert!(matches!(
        second,
        TrackerEvent::Skipped {
            reason: SkipReason::StaleWatcher,
            ..
        }
    ));
}

#[tokio::test(flavor = "current_thread")]
async fn pipelines_stop_when_senders_drop() {
    let bridge = Arc::new(MockBridge::with_source("S0"));
    let tracker = AppFocusTracker::spawn(bridge, InputSourceStore::new(), &Config::default());
    let mut rx = tracker.subscribe();
    drop(tracker);
    assert!(next_event(&mut rx, TIMEOUT_MS).await.is_none());
}
