//! OS-facing operations consumed by the tracker.

use crate::{
    Result,
    types::{AppId, Pid, SourceId},
};

/// Read and select the active input source and resolve application identity.
///
/// Implementations call straight into the OS and are expected to be fast and
/// synchronous. Resolution failures are reported as `None` and callers treat
/// them as "skip this event", never as a reason to retry.
pub trait InputSourceBridge: Send + Sync {
    /// The input source that is active right now.
    fn current_source(&self) -> Option<SourceId>;

    /// Make `source` the active input source.
    ///
    /// Fails with [`crate::Error::UnknownSource`] when the id no longer names
    /// an enabled source. Selecting the already active source succeeds.
    fn select_source(&self, source: &SourceId) -> Result<()>;

    /// The application that currently has keyboard focus.
    fn foreground_app(&self) -> Option<AppId>;

    /// The application identity of a running process.
    fn app_for_pid(&self, pid: Pid) -> Option<AppId>;
}
