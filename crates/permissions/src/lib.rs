//! macOS-only Accessibility permission checks for layoutd.
//!
//! Per-process AX observers and system-wide focus queries need the
//! Accessibility permission. This crate answers whether it is granted and can
//! ask the system to show its permission prompt.
//!
//! - `accessibility_ok()` checks without side effects.
//! - `request_accessibility()` checks and, if missing, lets macOS prompt the
//!   user to grant access in System Settings.
#![cfg(target_os = "macos")]

use core_foundation::{
    base::TCFType,
    boolean::CFBoolean,
    dictionary::{CFDictionary, CFDictionaryRef},
    string::{CFString, CFStringRef},
};

#[link(name = "ApplicationServices", kind = "framework")]
unsafe extern "C" {
    fn AXIsProcessTrusted() -> bool;
    fn AXIsProcessTrustedWithOptions(options: CFDictionaryRef) -> bool;
    static kAXTrustedCheckOptionPrompt: CFStringRef;
}

/// Check if the process holds the Accessibility permission.
pub fn accessibility_ok() -> bool {
    unsafe { AXIsProcessTrusted() }
}

/// Check the Accessibility permission, asking macOS to prompt the user when it
/// is missing. Returns the state at call time; a grant made from the prompt
/// only takes effect for later checks.
pub fn request_accessibility() -> bool {
    let key = unsafe { CFString::wrap_under_get_rule(kAXTrustedCheckOptionPrompt) };
    let options = CFDictionary::from_CFType_pairs(&[(key, CFBoolean::true_value())]);
    unsafe { AXIsProcessTrustedWithOptions(options.as_concrete_TypeRef()) }
}

/// Current permission status for the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PermissionsStatus {
    /// Accessibility (AX) permission; `true` if granted.
    pub accessibility_ok: bool,
}

/// Query every permission layoutd relies on, without prompting.
pub fn check_permissions() -> PermissionsStatus {
    PermissionsStatus {
        accessibility_ok: accessibility_ok(),
    }
}
