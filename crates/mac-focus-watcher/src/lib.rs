//! mac-focus-watcher: the raw macOS signals behind per-app focus tracking.
//!
//! This crate wraps three system sources and hands their output to plain Rust
//! callbacks, leaving interpretation to the caller:
//! - Accessibility (AX) observers attached to one process each, reporting
//!   focused-window changes and application hiding ([`AxWatcher`]).
//! - Notification center observers for NSWorkspace application lifecycle
//!   events and the distributed input-source-changed notification
//!   ([`NotificationObserver`]).
//! - CoreGraphics window list ownership, used to decide which processes own
//!   windows at all ([`windowed_pids`]).
//!
//! Observers deliver on the run loop of the thread that installed them, so
//! install everything from the main thread and keep its run loop spinning.
//! All operations are macOS-only and AX observers require Accessibility
//! permission.
#![cfg(target_os = "macos")]

mod ax;
mod cg;
mod event;
mod ns;

// Ensure Accessibility symbols (kAX* constants, AX* functions) link correctly
#[link(name = "ApplicationServices", kind = "framework")]
unsafe extern "C" {}

pub use ax::{AxWatcher, focused_app_pid};
pub use cg::windowed_pids;
pub use event::{AxNotification, RunningApp, WorkspaceNotification};
pub use ns::{
    NotificationObserver, bundle_id_for_pid, focused_bundle_id, frontmost_app, running_apps,
};

use thiserror::Error;

/// Errors from installing AX observers or querying AX state.
#[derive(Debug, Error)]
pub enum Error {
    /// `AXObserverCreate` failed for the process.
    #[error("AXObserverCreate failed for pid {pid}: AX error {code}")]
    ObserverCreate {
        /// Target process.
        pid: i32,
        /// AXError code.
        code: i32,
    },
    /// The AX application element could not be created.
    #[error("no AX application element for pid {0}")]
    AppElement(i32),
    /// The observer exposed no run loop source.
    #[error("AX observer for pid {0} has no run loop source")]
    RunLoopSource(i32),
    /// Subscribing to an AX notification failed.
    #[error("subscribing {name} for pid {pid} failed: AX error {code}")]
    Subscribe {
        /// Target process.
        pid: i32,
        /// Notification name.
        name: &'static str,
        /// AXError code.
        code: i32,
    },
    /// Generic AX failure.
    #[error("AX error {0}")]
    AxCode(i32),
}

/// Result alias for this crate.
pub type Result<T> = std::result::Result<T, Error>;
