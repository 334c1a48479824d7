//! Per-process Accessibility observers.
//!
//! One [`AxWatcher`] owns one `AXObserver` for one pid, subscribed to the
//! application element's focused-window and hidden notifications. The
//! observer's run loop source is added to the run loop of the installing
//! thread and removed again on [`AxWatcher::dispose`] or drop.

use std::{ffi::c_void, fmt, ptr};

use core_foundation::{
    base::{CFRelease, CFTypeRef, TCFType},
    runloop::{CFRunLoopGetCurrent, CFRunLoopSourceRef, kCFRunLoopDefaultMode},
    string::{CFString, CFStringRef},
};
use tracing::{debug, trace};

use crate::{Error, Result, event::AxNotification};

#[link(name = "ApplicationServices", kind = "framework")]
unsafe extern "C" {
    fn AXObserverCreate(
        pid: i32,
        callback: extern "C" fn(*mut c_void, *mut c_void, CFStringRef, *mut c_void),
        out: *mut *mut c_void,
    ) -> i32;
    fn AXObserverAddNotification(
        observer: *mut c_void,
        element: *mut c_void,
        notification: CFStringRef,
        refcon: *mut c_void,
    ) -> i32;
    fn AXObserverRemoveNotification(
        observer: *mut c_void,
        element: *mut c_void,
        notification: CFStringRef,
    ) -> i32;
    fn AXObserverGetRunLoopSource(observer: *mut c_void) -> *mut c_void;

    fn AXUIElementCreateApplication(pid: i32) -> *mut c_void;
    fn AXUIElementCreateSystemWide() -> *mut c_void;
    fn AXUIElementCopyAttributeValue(
        element: *mut c_void,
        attr: CFStringRef,
        value: *mut CFTypeRef,
    ) -> i32;
    fn AXUIElementGetPid(element: *mut c_void, pid: *mut i32) -> i32;
}

#[link(name = "CoreFoundation", kind = "framework")]
unsafe extern "C" {
    fn CFEqual(a: CFTypeRef, b: CFTypeRef) -> bool;
    fn CFRunLoopAddSource(rl: *mut c_void, source: CFRunLoopSourceRef, mode: CFStringRef);
    fn CFRunLoopRemoveSource(rl: *mut c_void, source: CFRunLoopSourceRef, mode: CFStringRef);
}

/// `kAXErrorNotificationAlreadyRegistered`.
const K_AX_ERROR_ALREADY_REGISTERED: i32 = -25209;

/// Owned CF reference released on drop.
struct CfOwned(*mut c_void);

impl CfOwned {
    /// Take ownership of a create-rule pointer.
    fn from_create(ptr: *mut c_void) -> Option<Self> {
        if ptr.is_null() { None } else { Some(Self(ptr)) }
    }

    /// Raw pointer, still owned by `self`.
    fn as_ptr(&self) -> *mut c_void {
        self.0
    }
}

impl Drop for CfOwned {
    fn drop(&mut self) {
        unsafe { CFRelease(self.0 as CFTypeRef) }
    }
}

/// Pid of the application owning system-wide AX focus.
pub fn focused_app_pid() -> Result<i32> {
    unsafe {
        let system = CfOwned::from_create(AXUIElementCreateSystemWide()).ok_or(Error::AxCode(-1))?;
        let attr = CFString::from_static_string("AXFocusedApplication");
        let mut app: CFTypeRef = ptr::null_mut();
        let err =
            AXUIElementCopyAttributeValue(system.as_ptr(), attr.as_concrete_TypeRef(), &mut app);
        if err != 0 {
            return Err(Error::AxCode(err));
        }
        let app = CfOwned::from_create(app as *mut c_void).ok_or(Error::AxCode(-1))?;
        let mut pid = 0;
        let err = AXUIElementGetPid(app.as_ptr(), &mut pid);
        if err != 0 {
            return Err(Error::AxCode(err));
        }
        Ok(pid)
    }
}

/// Callback context; lives until the watcher is disposed.
struct Ctx {
    /// Observed process.
    pid: i32,
    /// Receiver of translated notifications.
    handler: Box<dyn Fn(AxNotification)>,
    /// `AXFocusedWindowChanged`.
    focused_window_changed: CFString,
    /// `AXApplicationHidden`.
    application_hidden: CFString,
}

extern "C" fn ax_callback(
    _observer: *mut c_void,
    _element: *mut c_void,
    notification: CFStringRef,
    refcon: *mut c_void,
) {
    if refcon.is_null() {
        return;
    }
    let ctx = unsafe { &*(refcon as *const Ctx) };
    let equals = |a: &CFString| unsafe {
        CFEqual(notification as CFTypeRef, a.as_concrete_TypeRef() as CFTypeRef)
    };
    let kind = if equals(&ctx.focused_window_changed) {
        AxNotification::FocusedWindowChanged
    } else if equals(&ctx.application_hidden) {
        AxNotification::ApplicationHidden
    } else {
        return;
    };
    trace!("pid={} {}", ctx.pid, kind.name());
    (ctx.handler)(kind);
}

/// Accessibility observer bound to one process.
///
/// Not `Send`: the run loop source belongs to the installing thread.
pub struct AxWatcher {
    /// Observed process.
    pid: i32,
    /// `AXObserverRef`.
    observer: CfOwned,
    /// `AXUIElementRef` for the application.
    app: CfOwned,
    /// Run loop the source was added to.
    rl: *mut c_void,
    /// Observer's run loop source.
    source: CFRunLoopSourceRef,
    /// Notifications currently subscribed.
    subs: Vec<AxNotification>,
    /// Boxed [`Ctx`]; null once disposed.
    ctx_ptr: *mut c_void,
}

impl AxWatcher {
    /// Observe `pid`, calling `handler` for each focused-window change and
    /// hide of the process. Delivery happens on the current thread's run loop.
    pub fn install(pid: i32, handler: impl Fn(AxNotification) + 'static) -> Result<Self> {
        let mut watcher = unsafe {
            let mut obs_ptr: *mut c_void = ptr::null_mut();
            let err = AXObserverCreate(pid, ax_callback, &mut obs_ptr as *mut _);
            if err != 0 {
                return Err(Error::ObserverCreate { pid, code: err });
            }
            let observer =
                CfOwned::from_create(obs_ptr).ok_or(Error::ObserverCreate { pid, code: err })?;
            let app = CfOwned::from_create(AXUIElementCreateApplication(pid))
                .ok_or(Error::AppElement(pid))?;
            let source = AXObserverGetRunLoopSource(observer.as_ptr()) as CFRunLoopSourceRef;
            if source.is_null() {
                return Err(Error::RunLoopSource(pid));
            }
            let ctx = Box::into_raw(Box::new(Ctx {
                pid,
                handler: Box::new(handler),
                focused_window_changed: CFString::from_static_string(
                    AxNotification::FocusedWindowChanged.name(),
                ),
                application_hidden: CFString::from_static_string(
                    AxNotification::ApplicationHidden.name(),
                ),
            })) as *mut c_void;
            let rl = CFRunLoopGetCurrent() as *mut c_void;
            CFRunLoopAddSource(rl, source, kCFRunLoopDefaultMode);
            Self {
                pid,
                observer,
                app,
                rl,
                source,
                subs: Vec::new(),
                ctx_ptr: ctx,
            }
        };
        // On failure the partially installed watcher is torn down by Drop.
        watcher.subscribe(AxNotification::FocusedWindowChanged)?;
        watcher.subscribe(AxNotification::ApplicationHidden)?;
        debug!("AX watcher installed for pid={}", pid);
        Ok(watcher)
    }

    /// The observed process.
    pub fn pid(&self) -> i32 {
        self.pid
    }

    /// Whether [`Self::dispose`] has run.
    pub fn is_disposed(&self) -> bool {
        self.ctx_ptr.is_null()
    }

    /// Subscribe one notification on the application element.
    fn subscribe(&mut self, kind: AxNotification) -> Result<()> {
        if self.subs.contains(&kind) {
            return Ok(());
        }
        let name = CFString::from_static_string(kind.name());
        let err = unsafe {
            AXObserverAddNotification(
                self.observer.as_ptr(),
                self.app.as_ptr(),
                name.as_concrete_TypeRef(),
                self.ctx_ptr,
            )
        };
        match err {
            0 | K_AX_ERROR_ALREADY_REGISTERED => {
                self.subs.push(kind);
                Ok(())
            }
            code => Err(Error::Subscribe {
                pid: self.pid,
                name: kind.name(),
                code,
            }),
        }
    }

    /// Unsubscribe everything, detach from the run loop and free the callback
    /// context. Idempotent; no callback runs after this returns.
    pub fn dispose(&mut self) {
        if self.is_disposed() {
            return;
        }
        unsafe {
            for kind in self.subs.drain(..) {
                let name = CFString::from_static_string(kind.name());
                let _ = AXObserverRemoveNotification(
                    self.observer.as_ptr(),
                    self.app.as_ptr(),
                    name.as_concrete_TypeRef(),
                );
            }
            CFRunLoopRemoveSource(self.rl, self.source, kCFRunLoopDefaultMode);
            drop(Box::<Ctx>::from_raw(self.ctx_ptr as *mut Ctx));
        }
        self.ctx_ptr = ptr::null_mut();
        trace!("AX watcher disposed for pid={}", self.pid);
    }
}

impl Drop for AxWatcher {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl fmt::Debug for AxWatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AxWatcher")
            .field("pid", &self.pid)
            .field("subs", &self.subs)
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
