//! The engine's OS seam, backed by TIS and AppKit.

use layoutd_engine::{AppId, Error, InputSourceBridge, Pid, Result, SourceId};
use tracing::debug;

/// [`InputSourceBridge`] over the live system.
#[derive(Debug, Default, Clone, Copy)]
pub struct MacBridge;

impl InputSourceBridge for MacBridge {
    fn current_source(&self) -> Option<SourceId> {
        mac_input_source::current_source_id().map(SourceId::from)
    }

    fn select_source(&self, source: &SourceId) -> Result<()> {
        mac_input_source::select(source.as_str()).map_err(|e| {
            debug!("select {} failed: {}", source, e);
            Error::UnknownSource(source.clone())
        })
    }

    fn foreground_app(&self) -> Option<AppId> {
        mac_focus_watcher::focused_bundle_id().map(AppId::from)
    }

    fn app_for_pid(&self, pid: Pid) -> Option<AppId> {
        mac_focus_watcher::bundle_id_for_pid(pid).map(AppId::from)
    }
}
