use std::collections::HashSet;

use core_foundation::{
    base::{CFRelease, CFTypeRef},
    dictionary::CFDictionaryRef,
    number::{CFNumberRef, kCFNumberSInt32Type},
    string::CFStringRef,
};
use core_graphics::window as cgw;

/// Read an i32 number value from a CF dictionary.
unsafe fn get_number(dict: CFDictionaryRef, key: CFStringRef) -> Option<i32> {
    let value = unsafe {
        core_foundation::dictionary::CFDictionaryGetValue(dict, key as *const core::ffi::c_void)
    };
    if value.is_null() {
        return None;
    }
    let mut out: i32 = 0;
    let ok = unsafe {
        core_foundation::number::CFNumberGetValue(
            value as CFNumberRef,
            kCFNumberSInt32Type,
            &mut out as *mut i32 as *mut core::ffi::c_void,
        )
    };
    ok.then_some(out)
}

/// Pids owning at least one window, on screen or not.
///
/// Off-screen windows are included so that processes whose only window is a
/// transient panel still count as windowed.
pub fn windowed_pids() -> HashSet<i32> {
    let mut out = HashSet::new();
    unsafe {
        let options: cgw::CGWindowListOption =
            cgw::kCGWindowListOptionAll | cgw::kCGWindowListExcludeDesktopElements;
        let arr = cgw::CGWindowListCopyWindowInfo(options, cgw::kCGNullWindowID);
        if arr.is_null() {
            return out;
        }
        let count = core_foundation::array::CFArrayGetCount(arr);
        for i in 0..count {
            let item = core_foundation::array::CFArrayGetValueAtIndex(arr, i);
            if item.is_null() {
                continue;
            }
            if let Some(pid) = get_number(item as CFDictionaryRef, cgw::kCGWindowOwnerPID) {
                out.insert(pid);
            }
        }
        CFRelease(arr as CFTypeRef);
    }
    out
}
