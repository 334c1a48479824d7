//! Identity types shared across the engine.

use std::fmt::{Display, Formatter, Result as FmtResult};

/// Process identifier as reported by the OS. Reused over time.
pub type Pid = i32;

/// Stable identity of an application (a bundle identifier on macOS).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct AppId(String);

impl AppId {
    /// Wrap an application identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for AppId {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(&self.0)
    }
}

impl From<&str> for AppId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for AppId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Opaque identity of a keyboard input source (layout or input method).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SourceId(String);

impl SourceId {
    /// Wrap an input source identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for SourceId {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(&self.0)
    }
}

impl From<&str> for SourceId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for SourceId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_display_raw_value() {
        assert_eq!(AppId::from("com.apple.Terminal").to_string(), "com.apple.Terminal");
        assert_eq!(
            SourceId::from("com.apple.keylayout.ABC").as_str(),
            "com.apple.keylayout.ABC"
        );
    }

    #[test]
    fn app_ids_compare_by_value() {
        assert_eq!(AppId::new(String::from("a.b")), AppId::from("a.b"));
        assert_ne!(AppId::from("a.b"), AppId::from("a.c"));
    }
}
