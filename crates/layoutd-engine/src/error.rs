use std::result::Result as StdResult;

use thiserror::Error;

use crate::types::{Pid, SourceId};

/// Convenient result type for the engine crate.
pub type Result<T> = StdResult<T, Error>;

/// Errors surfaced by the engine and by bridge/watcher implementations.
///
/// None of these are fatal to the daemon: pipelines log them and move on.
#[derive(Debug, Error)]
pub enum Error {
    /// The OS no longer knows this input source (removed or disabled).
    #[error("input source unavailable: {0}")]
    UnknownSource(SourceId),

    /// A window-change watcher could not be attached to a process.
    #[error("failed to watch pid {pid}: {reason}")]
    Watch {
        /// Process that could not be observed.
        pid: Pid,
        /// Platform-specific failure description.
        reason: String,
    },

    /// A tracker pipeline has stopped and no longer accepts signals.
    #[error("tracker channel closed")]
    ChannelClosed,
}
