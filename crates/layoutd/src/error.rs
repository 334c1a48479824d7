use std::{io::Error as IoError, result::Result as StdResult};

use thiserror::Error;

/// Errors that end the `layoutd` process.
#[derive(Error, Debug)]
pub enum Error {
    /// IO-related errors (runtime construction, stdout)
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// Querying input sources failed
    #[error("Input source error: {0}")]
    InputSource(String),

    /// `HOME` is unset or empty
    #[error("HOME is not set")]
    HomeNotSet,

    /// The running executable's path could not be determined
    #[error("cannot determine executable path: {0}")]
    ExePath(IoError),

    /// launchctl exited unsuccessfully
    #[error("launchctl {command} failed ({code:?}): {stderr}")]
    Launchctl {
        /// Arguments passed to launchctl
        command: String,
        /// Exit code, if not killed by a signal
        code: Option<i32>,
        /// Captured stderr
        stderr: String,
    },

    /// The current platform has no input source support
    #[error("layoutd only runs on macOS")]
    Unsupported,
}

/// Convenience type alias for Results using our Error type
pub type Result<T> = StdResult<T, Error>;

#[cfg(target_os = "macos")]
impl From<mac_input_source::Error> for Error {
    fn from(err: mac_input_source::Error) -> Self {
        Self::InputSource(err.to_string())
    }
}
