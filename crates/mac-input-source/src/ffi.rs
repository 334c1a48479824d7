//! Carbon Text Input Source declarations.
#![allow(non_upper_case_globals)]

use std::ffi::c_void;

use core_foundation::{
    array::CFArrayRef, base::CFTypeRef, dictionary::CFDictionaryRef, string::CFStringRef,
};

#[link(name = "Carbon", kind = "framework")]
unsafe extern "C" {
    pub(crate) fn TISCopyCurrentKeyboardInputSource() -> CFTypeRef;
    pub(crate) fn TISCreateInputSourceList(
        properties: CFDictionaryRef,
        include_all_installed: bool,
    ) -> CFArrayRef;
    pub(crate) fn TISGetInputSourceProperty(source: CFTypeRef, key: CFStringRef) -> *const c_void;
    pub(crate) fn TISSelectInputSource(source: CFTypeRef) -> i32;

    pub(crate) static kTISPropertyInputSourceID: CFStringRef;
    pub(crate) static kTISPropertyLocalizedName: CFStringRef;
    pub(crate) static kTISPropertyInputSourceCategory: CFStringRef;
    pub(crate) static kTISPropertyInputSourceIsSelectCapable: CFStringRef;
    pub(crate) static kTISCategoryKeyboardInputSource: CFStringRef;
    pub(crate) static kTISNotifySelectedKeyboardInputSourceChanged: CFStringRef;
}
