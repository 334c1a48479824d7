use std::sync::Arc;

use layoutd_engine::{
    AppId, FocusPipeline, FocusSignal, InputSourceStore, Pipeline, SkipReason, SourceChanged,
    SourceId, SourcePipeline, TrackerEvent, WatchLease,
    test_support::{BridgeCall, MockBridge},
};

fn activated(app: &str) -> FocusSignal {
    FocusSignal::Activated {
        app: AppId::from(app),
    }
}

fn setup(source: &str) -> (Arc<MockBridge>, InputSourceStore, FocusPipeline, SourcePipeline) {
    let bridge = Arc::new(MockBridge::with_source(source));
    let store = InputSourceStore::new();
    let focus = FocusPipeline::new(bridge.clone(), store.clone());
    let src = SourcePipeline::new(bridge.clone(), store.clone());
    (bridge, store, focus, src)
}

#[test]
fn first_focus_baselines_without_selecting() {
    let (bridge, store, mut focus, _) = setup("S0");
    let ev = focus.handle(activated("A"));
    assert_eq!(
        ev,
        TrackerEvent::Baselined {
            app: AppId::from("A"),
            source: SourceId::from("S0"),
            replaced_stale: None,
        }
    );
    assert_eq!(store.load(&AppId::from("A")), Some(SourceId::from("S0")));
    assert!(bridge.selects().is_empty());
}

#[test]
fn consecutive_duplicates_reconcile_once() {
    let (bridge, _store, mut focus, _) = setup("S0");
    let first = focus.handle(activated("A"));
    let second = focus.handle(activated("A"));
    assert!(matches!(first, TrackerEvent::Baselined { .. }));
    assert_eq!(
        second,
        TrackerEvent::Skipped {
            pipeline: Pipeline::Focus,
            reason: SkipReason::Duplicate,
        }
    );
    let reads = bridge
        .calls()
        .into_iter()
        .filter(|c| *c == BridgeCall::CurrentSource)
        .count();
    assert_eq!(reads, 1);
}

#[test]
fn duplicates_are_detected_across_signal_kinds() {
    let (bridge, _store, mut focus, _) = setup("S0");
    bridge.set_app(42, "A");
    focus.handle(activated("A"));
    let ev = focus.handle(FocusSignal::WindowFocused {
        pid: 42,
        lease: WatchLease::new(),
    });
    assert!(matches!(
        ev,
        TrackerEvent::Skipped {
            reason: SkipReason::Duplicate,
            ..
        }
    ));
}

#[test]
fn round_trip_restores_each_apps_source() {
    let (bridge, store, mut focus, src) = setup("S0");

    focus.handle(activated("A"));
    focus.handle(activated("B"));
    assert_eq!(store.load(&AppId::from("B")), Some(SourceId::from("S0")));

    bridge.set_foreground(Some("B"));
    bridge.set_current("S1");
    assert_eq!(
        src.handle(SourceChanged),
        TrackerEvent::Recorded {
            app: AppId::from("B"),
            source: SourceId::from("S1"),
        }
    );

    assert_eq!(
        focus.handle(activated("A")),
        TrackerEvent::Restored {
            app: AppId::from("A"),
            source: SourceId::from("S0"),
        }
    );
    assert_eq!(
        focus.handle(activated("B")),
        TrackerEvent::Restored {
            app: AppId::from("B"),
            source: SourceId::from("S1"),
        }
    );
    assert_eq!(
        bridge.selects(),
        vec![SourceId::from("S0"), SourceId::from("S1")]
    );
    assert_eq!(bridge.current(), Some(SourceId::from("S1")));
}

#[test]
fn stale_source_falls_back_to_baseline() {
    let (bridge, store, mut focus, _) = setup("S0");
    store.save(AppId::from("A"), SourceId::from("gone"));
    bridge.reject("gone");

    let ev = focus.handle(activated("A"));
    assert_eq!(
        ev,
        TrackerEvent::Baselined {
            app: AppId::from("A"),
            source: SourceId::from("S0"),
            replaced_stale: Some(SourceId::from("gone")),
        }
    );
    assert_eq!(store.load(&AppId::from("A")), Some(SourceId::from("S0")));
    assert_eq!(bridge.current(), Some(SourceId::from("S0")));
}

#[test]
fn window_signals_resolve_pid_at_consumption() {
    let (bridge, store, mut focus, _) = setup("S0");
    let sig = FocusSignal::WindowFocused {
        pid: 7,
        lease: WatchLease::new(),
    };
    // The pid maps to a different app by the time the signal is handled.
    bridge.set_app(7, "first");
    bridge.set_app(7, "second");
    focus.handle(sig);
    assert!(store.load(&AppId::from("first")).is_none());
    assert_eq!(store.load(&AppId::from("second")), Some(SourceId::from("S0")));
}

#[test]
fn unresolved_pid_is_skipped_without_touching_state() {
    let (bridge, store, mut focus, _) = setup("S0");
    let ev = focus.handle(FocusSignal::WindowFocused {
        pid: 99,
        lease: WatchLease::new(),
    });
    assert_eq!(
        ev,
        TrackerEvent::Skipped {
            pipeline: Pipeline::Focus,
            reason: SkipReason::UnresolvedApp,
        }
    );
    assert!(store.is_empty());
    assert!(focus.last_app().is_none());
    assert!(!bridge.calls().contains(&BridgeCall::CurrentSource));
}

#[test]
fn hidden_resolves_to_current_foreground() {
    let (bridge, store, mut focus, _) = setup("S0");
    focus.handle(activated("Spotlight"));
    bridge.set_foreground(Some("Editor"));
    let ev = focus.handle(FocusSignal::Hidden {
        pid: 5,
        lease: WatchLease::new(),
    });
    assert!(matches!(ev, TrackerEvent::Baselined { ref app, .. } if *app == AppId::from("Editor")));
    assert!(store.load(&AppId::from("Editor")).is_some());
}

#[test]
fn signals_from_revoked_watchers_are_ignored() {
    let (bridge, store, mut focus, _) = setup("S0");
    bridge.set_app(3, "A");
    let lease = WatchLease::new();
    let sig = FocusSignal::WindowFocused {
        pid: 3,
        lease: lease.clone(),
    };
    lease.revoke();
    assert_eq!(
        focus.handle(sig),
        TrackerEvent::Skipped {
            pipeline: Pipeline::Focus,
            reason: SkipReason::StaleWatcher,
        }
    );
    assert!(store.is_empty());
    assert!(bridge.calls().is_empty());
}

#[test]
fn source_change_without_foreground_is_dropped() {
    let (bridge, store, _, src) = setup("S0");
    bridge.set_foreground(None);
    assert_eq!(
        src.handle(SourceChanged),
        TrackerEvent::Skipped {
            pipeline: Pipeline::Source,
            reason: SkipReason::UnresolvedApp,
        }
    );
    assert!(store.is_empty());
}

#[test]
fn baseline_skipped_when_source_unreadable() {
    let (bridge, store, mut focus, _) = setup("S0");
    bridge.clear_current();
    assert_eq!(
        focus.handle(activated("A")),
        TrackerEvent::Skipped {
            pipeline: Pipeline::Focus,
            reason: SkipReason::NoCurrentSource,
        }
    );
    assert!(store.is_empty());
    assert!(focus.last_app().is_none());
}

#[test]
fn unreadable_baseline_is_retried_on_next_signal() {
    let (bridge, store, mut focus, _) = setup("S0");
    bridge.clear_current();
    assert!(matches!(
        focus.handle(activated("A")),
        TrackerEvent::Skipped {
            reason: SkipReason::NoCurrentSource,
            ..
        }
    ));

    // Same app again once the source is readable: not a duplicate.
    bridge.set_current("S0");
    assert_eq!(
        focus.handle(activated("A")),
        TrackerEvent::Baselined {
            app: AppId::from("A"),
            source: SourceId::from("S0"),
            replaced_stale: None,
        }
    );
    assert_eq!(store.load(&AppId::from("A")), Some(SourceId::from("S0")));
    assert_eq!(focus.last_app(), Some(&AppId::from("A")));

    assert!(matches!(
        focus.handle(activated("A")),
        TrackerEvent::Skipped {
            reason: SkipReason::Duplicate,
            ..
        }
    ));
}

/// Whatever the interleaving of switches and focus changes, the store ends up
/// holding the source each app was using when it last lost the foreground.
#[test]
fn store_tracks_source_at_loss_of_foreground() {
    let (bridge, store, mut focus, src) = setup("us");
    // (app to focus, source the user switches to while it is focused)
    let script = [
        ("A", Some("de")),
        ("B", None),
        ("C", Some("fr")),
        ("A", None),
        ("B", Some("jp")),
        ("C", Some("us")),
        ("A", Some("fr")),
        ("B", None),
    ];
    let mut prev: Option<&str> = None;
    for (app, switch) in script {
        let active_before = bridge.current();
        focus.handle(activated(app));
        if let Some(p) = prev {
            assert_eq!(store.load(&AppId::from(p)), active_before, "{p} at loss");
        }
        bridge.set_foreground(Some(app));
        if let Some(s) = switch {
            bridge.set_current(s);
            src.handle(SourceChanged);
        }
        let active = bridge.current().expect("active source");
        assert_eq!(store.load(&AppId::from(app)), Some(active));
        prev = Some(app);
    }
    assert_eq!(store.load(&AppId::from("A")), Some(SourceId::from("fr")));
    assert_eq!(store.load(&AppId::from("B")), Some(SourceId::from("jp")));
    assert_eq!(store.load(&AppId::from("C")), Some(SourceId::from("us")));
}
