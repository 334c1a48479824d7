//! Raw signals feeding the two tracker pipelines.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use crate::types::{AppId, Pid};

/// Liveness flag shared between a registry entry, its watcher's sink, and
/// every signal that watcher emitted.
///
/// Revoked when the registry disposes the watcher, so signals still queued
/// from a disposed watcher can be recognised and dropped by the consumer.
#[derive(Clone, Debug)]
pub struct WatchLease(Arc<AtomicBool>);

impl WatchLease {
    /// A fresh, live lease.
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    /// True until [`WatchLease::revoke`] is called on any clone.
    pub fn is_live(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Mark the owning watcher as disposed.
    pub fn revoke(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl Default for WatchLease {
    fn default() -> Self {
        Self::new()
    }
}

/// One raw "the foreground may have changed" observation.
///
/// Only `Activated` arrives already resolved; the watcher-originated variants
/// carry a pid that is resolved when the tracker consumes the signal.
#[derive(Clone, Debug)]
pub enum FocusSignal {
    /// The OS reported an application activation.
    Activated {
        /// Activated application.
        app: AppId,
    },
    /// The focused window of a watched process changed.
    WindowFocused {
        /// Process whose focused window changed.
        pid: Pid,
        /// Lease of the watcher that emitted the signal.
        lease: WatchLease,
    },
    /// A watched process was hidden; whatever is now frontmost took over.
    Hidden {
        /// Process that was hidden.
        pid: Pid,
        /// Lease of the watcher that emitted the signal.
        lease: WatchLease,
    },
}

impl FocusSignal {
    /// Short name used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Activated { .. } => "activated",
            Self::WindowFocused { .. } => "window_focused",
            Self::Hidden { .. } => "hidden",
        }
    }

    /// The emitting watcher's lease, for watcher-originated signals.
    pub fn lease(&self) -> Option<&WatchLease> {
        match self {
            Self::Activated { .. } => None,
            Self::WindowFocused { lease, .. } | Self::Hidden { lease, .. } => Some(lease),
        }
    }
}

/// The system reported that the selected input source changed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SourceChanged;
