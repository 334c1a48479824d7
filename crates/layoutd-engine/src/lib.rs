//! layoutd-engine: per-application input source memory.
//!
//! The engine decides *when* the input source should change and *to what*;
//! everything that touches the OS sits behind two seams:
//! - [`InputSourceBridge`]: read/select the active input source and resolve
//!   application identities.
//! - [`WatcherFactory`]: attach a [`WindowChangeWatcher`] to a process.
//!
//! Wiring overview:
//! - Create an [`InputSourceStore`] and call [`AppFocusTracker::spawn`] from
//!   inside a Tokio runtime to start both pipelines.
//! - Build a [`ProcessRegistry`] with the tracker's
//!   [`TrackerHandle::focus_sender`] and call [`ProcessRegistry::refresh`]
//!   whenever the running-process list changes.
//! - Forward activation notifications with [`TrackerHandle::notify_focus`]
//!   and input-source-changed notifications with
//!   [`TrackerHandle::notify_source_changed`].
//!
//! Nothing here is persisted; state lives for the life of the process.

mod bridge;
mod config;
mod error;
mod registry;
mod signal;
mod store;
mod tracker;
mod types;

#[cfg(feature = "test-utils")]
pub mod test_support;

pub use bridge::InputSourceBridge;
pub use config::{Config, DEFAULT_EXCLUDED_APPS, Exclusions};
pub use error::{Error, Result};
pub use registry::{
    ProcessRegistry, ProcessSnapshot, RefreshReport, RunningProcess, WatchSink, WatcherFactory,
    WindowChangeWatcher, qualifying_pids,
};
pub use signal::{FocusSignal, SourceChanged, WatchLease};
pub use store::InputSourceStore;
pub use tracker::{
    AppFocusTracker, FocusPipeline, Pipeline, SkipReason, SourcePipeline, TrackerEvent,
    TrackerHandle,
};
pub use types::{AppId, Pid, SourceId};
