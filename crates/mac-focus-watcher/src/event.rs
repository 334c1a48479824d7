//! Signal types handed to observer callbacks.

/// Per-process AX notifications an [`crate::AxWatcher`] reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxNotification {
    /// `AXFocusedWindowChanged`: a window of the process became focused.
    FocusedWindowChanged,
    /// `AXApplicationHidden`: the process was hidden.
    ApplicationHidden,
}

impl AxNotification {
    /// The AX notification name.
    pub fn name(self) -> &'static str {
        match self {
            Self::FocusedWindowChanged => "AXFocusedWindowChanged",
            Self::ApplicationHidden => "AXApplicationHidden",
        }
    }
}

/// NSWorkspace application lifecycle notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkspaceNotification {
    /// An application became frontmost.
    DidActivateApplication,
    /// An application finished launching.
    DidLaunchApplication,
    /// An application exited.
    DidTerminateApplication,
}

/// A running application as reported by NSWorkspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunningApp {
    /// Process identifier.
    pub pid: i32,
    /// Bundle identifier, absent for bare executables.
    pub bundle_id: Option<String>,
}
