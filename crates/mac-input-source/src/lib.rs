//! mac-input-source: keyboard input sources via the Carbon TIS API.
//!
//! - [`current_source_id`]: id of the active keyboard input source.
//! - [`select`]: make an enabled source active by id.
//! - [`list_sources`]: enabled, selectable keyboard sources.
//! - [`selected_source_changed_notification`]: distributed notification name
//!   posted whenever the selected keyboard input source changes.
//!
//! TIS calls are safe to make off the main thread.
#![cfg(target_os = "macos")]

mod ffi;

use core_foundation::{
    base::{CFRelease, CFType, CFTypeRef, TCFType},
    boolean::CFBoolean,
    dictionary::CFDictionary,
    string::{CFString, CFStringRef},
};
use thiserror::Error;
use tracing::{debug, trace};

use crate::ffi::{
    TISCopyCurrentKeyboardInputSource, TISCreateInputSourceList, TISGetInputSourceProperty,
    TISSelectInputSource, kTISCategoryKeyboardInputSource,
    kTISNotifySelectedKeyboardInputSourceChanged, kTISPropertyInputSourceCategory,
    kTISPropertyInputSourceID, kTISPropertyInputSourceIsSelectCapable, kTISPropertyLocalizedName,
};

/// Errors from input source operations.
#[derive(Debug, Error)]
pub enum Error {
    /// No enabled input source has this id.
    #[error("no enabled input source with id `{0}`")]
    NotFound(String),

    /// `TISSelectInputSource` returned a non-zero status.
    #[error("selecting `{id}` failed with status {status}")]
    Select {
        /// Requested source id.
        id: String,
        /// OSStatus returned by TIS.
        status: i32,
    },

    /// TIS returned no list at all.
    #[error("input source list unavailable")]
    ListUnavailable,
}

/// Result alias for this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// One enabled keyboard input source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputSourceInfo {
    /// Stable identifier, e.g. `com.apple.keylayout.ABC`.
    pub id: String,
    /// Localized display name.
    pub name: String,
}

/// Read a string property of a TIS source (get rule; not owned).
fn source_string(src: CFTypeRef, key: CFStringRef) -> Option<String> {
    let v = unsafe { TISGetInputSourceProperty(src, key) };
    if v.is_null() {
        return None;
    }
    // SAFETY: string properties are CFStringRefs owned by the source.
    let s = unsafe { CFString::wrap_under_get_rule(v as CFStringRef) };
    Some(s.to_string())
}

/// Identifier of the active keyboard input source.
pub fn current_source_id() -> Option<String> {
    unsafe {
        let src = TISCopyCurrentKeyboardInputSource();
        if src.is_null() {
            return None;
        }
        let id = source_string(src, kTISPropertyInputSourceID);
        CFRelease(src);
        id
    }
}

/// Run `f` over every entry of a TIS source list matching `filter`.
fn with_source_list<R>(
    filter: &CFDictionary<CFString, CFType>,
    f: impl FnOnce(&[CFTypeRef]) -> R,
) -> Result<R> {
    unsafe {
        let arr = TISCreateInputSourceList(filter.as_concrete_TypeRef(), false);
        if arr.is_null() {
            return Err(Error::ListUnavailable);
        }
        let count = core_foundation::array::CFArrayGetCount(arr);
        let items: Vec<CFTypeRef> = (0..count)
            .map(|i| core_foundation::array::CFArrayGetValueAtIndex(arr, i))
            .filter(|p| !p.is_null())
            .collect();
        let out = f(&items);
        CFRelease(arr as CFTypeRef);
        Ok(out)
    }
}

/// Make the enabled input source `id` active.
///
/// Selecting the source that is already active is a no-op.
pub fn select(id: &str) -> Result<()> {
    if current_source_id().as_deref() == Some(id) {
        trace!("input source `{}` already active", id);
        return Ok(());
    }
    let key = unsafe { CFString::wrap_under_get_rule(kTISPropertyInputSourceID) };
    let filter = CFDictionary::from_CFType_pairs(&[(key, CFString::new(id).as_CFType())]);
    let status = with_source_list(&filter, |items| {
        items
            .first()
            .map(|src| unsafe { TISSelectInputSource(*src) })
    })?;
    match status {
        None => Err(Error::NotFound(id.to_string())),
        Some(0) => {
            debug!("selected input source `{}`", id);
            Ok(())
        }
        Some(status) => Err(Error::Select {
            id: id.to_string(),
            status,
        }),
    }
}

/// Enabled keyboard input sources that can be selected.
pub fn list_sources() -> Result<Vec<InputSourceInfo>> {
    let (cat_key, cat_val, sel_key) = unsafe {
        (
            CFString::wrap_under_get_rule(kTISPropertyInputSourceCategory),
            CFString::wrap_under_get_rule(kTISCategoryKeyboardInputSource),
            CFString::wrap_under_get_rule(kTISPropertyInputSourceIsSelectCapable),
        )
    };
    let filter = CFDictionary::from_CFType_pairs(&[
        (cat_key, cat_val.as_CFType()),
        (sel_key, CFBoolean::true_value().as_CFType()),
    ]);
    with_source_list(&filter, |items| {
        items
            .iter()
            .filter_map(|src| {
                let (id_key, name_key) =
                    unsafe { (kTISPropertyInputSourceID, kTISPropertyLocalizedName) };
                let id = source_string(*src, id_key)?;
                let name = source_string(*src, name_key).unwrap_or_default();
                Some(InputSourceInfo { id, name })
            })
            .collect()
    })
}

/// Name of the distributed notification posted when the selected keyboard
/// input source changes.
pub fn selected_source_changed_notification() -> String {
    unsafe { CFString::wrap_under_get_rule(kTISNotifySelectedKeyboardInputSourceChanged) }
        .to_string()
}
