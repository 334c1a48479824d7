//! Notification center observers and NSWorkspace queries.

use std::ptr::NonNull;

use block2::StackBlock;
use objc2::{
    msg_send,
    rc::Retained,
    runtime::{AnyObject, NSObjectProtocol, ProtocolObject},
};
use objc2_app_kit::{
    NSRunningApplication, NSWorkspace, NSWorkspaceApplicationKey,
    NSWorkspaceDidActivateApplicationNotification, NSWorkspaceDidLaunchApplicationNotification,
    NSWorkspaceDidTerminateApplicationNotification,
};
use objc2_foundation::{
    NSDistributedNotificationCenter, NSNotification, NSNotificationCenter, NSNotificationName,
    NSString,
};
use tracing::{debug, trace};

use crate::{
    ax,
    event::{RunningApp, WorkspaceNotification},
};

/// A block-based notification center registration, removed on drop.
///
/// Blocks run synchronously on the posting thread (no operation queue), which
/// for workspace and distributed notifications is the main thread.
pub struct NotificationObserver {
    /// Center the observer is registered with.
    center: Retained<NSNotificationCenter>,
    /// Opaque observer token returned by the center.
    token: Retained<ProtocolObject<dyn NSObjectProtocol>>,
    /// Notification name, for diagnostics.
    name: String,
}

impl NotificationObserver {
    /// Register `handler` for `name` on `center`.
    fn register(
        center: Retained<NSNotificationCenter>,
        name: &NSNotificationName,
        handler: impl Fn(&NSNotification) + Clone + 'static,
    ) -> Self {
        let block = StackBlock::new(move |notif: NonNull<NSNotification>| {
            let notif = unsafe { notif.as_ref() };
            trace!("received `{}`", notif.name());
            handler(notif);
        })
        .copy();
        let token = unsafe {
            center.addObserverForName_object_queue_usingBlock(Some(name), None, None, &block)
        };
        debug!("observing `{}`", name);
        Self {
            center,
            token,
            name: name.to_string(),
        }
    }

    /// Observe an NSWorkspace notification. `handler` receives the
    /// application the notification concerns, if it carried one.
    pub fn workspace(
        kind: WorkspaceNotification,
        handler: impl Fn(Option<RunningApp>) + Clone + 'static,
    ) -> Self {
        let center = NSWorkspace::sharedWorkspace().notificationCenter();
        let name: &NSNotificationName = unsafe {
            match kind {
                WorkspaceNotification::DidActivateApplication => {
                    NSWorkspaceDidActivateApplicationNotification
                }
                WorkspaceNotification::DidLaunchApplication => {
                    NSWorkspaceDidLaunchApplicationNotification
                }
                WorkspaceNotification::DidTerminateApplication => {
                    NSWorkspaceDidTerminateApplicationNotification
                }
            }
        };
        Self::register(center, name, move |notif| {
            handler(app_from_notification(notif))
        })
    }

    /// Observe a distributed (cross-process) notification by name.
    pub fn distributed(name: &str, handler: impl Fn() + Clone + 'static) -> Self {
        let center = Retained::into_super(NSDistributedNotificationCenter::defaultCenter());
        let name = NSString::from_str(name);
        Self::register(center, &name, move |_| handler())
    }

    /// The observed notification name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for NotificationObserver {
    fn drop(&mut self) {
        let _: () = unsafe { msg_send![&*self.center, removeObserver: &*self.token] };
        trace!("stopped observing `{}`", self.name);
    }
}

/// Convert an `NSRunningApplication` into a [`RunningApp`].
fn running_app(app: &NSRunningApplication) -> RunningApp {
    RunningApp {
        pid: app.processIdentifier(),
        bundle_id: app.bundleIdentifier().map(|s| s.to_string()),
    }
}

/// The application carried in a workspace notification's user info.
///
/// Total: returns `None` when the entry is missing or of another type.
fn app_from_notification(notif: &NSNotification) -> Option<RunningApp> {
    unsafe {
        let info = notif.userInfo()?;
        let key: &NSString = NSWorkspaceApplicationKey;
        let obj: Option<Retained<AnyObject>> = msg_send![&*info, objectForKey: key];
        let app = obj?.downcast::<NSRunningApplication>().ok()?;
        Some(running_app(&app))
    }
}

/// Every running application.
pub fn running_apps() -> Vec<RunningApp> {
    NSWorkspace::sharedWorkspace()
        .runningApplications()
        .iter()
        .map(|app| running_app(&app))
        .collect()
}

/// The frontmost application according to NSWorkspace.
pub fn frontmost_app() -> Option<RunningApp> {
    NSWorkspace::sharedWorkspace()
        .frontmostApplication()
        .map(|app| running_app(&app))
}

/// Bundle identifier of the process `pid`, if it is a bundled application.
pub fn bundle_id_for_pid(pid: i32) -> Option<String> {
    let app = NSRunningApplication::runningApplicationWithProcessIdentifier(pid)?;
    running_app(&app).bundle_id
}

/// Bundle identifier of the application owning keyboard focus.
///
/// Asks Accessibility for the system-wide focused application first and falls
/// back to NSWorkspace's frontmost application.
pub fn focused_bundle_id() -> Option<String> {
    match ax::focused_app_pid() {
        Ok(pid) => {
            if let Some(id) = bundle_id_for_pid(pid) {
                return Some(id);
            }
        }
        Err(e) => trace!("AX focused application unavailable: {}", e),
    }
    frontmost_app().and_then(|app| app.bundle_id)
}
