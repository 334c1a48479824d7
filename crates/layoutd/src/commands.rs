//! One-shot inspection commands.

use std::io::{self, Write};

use crate::Result;

/// Print permission state, the active input source and the focused app.
pub fn status() -> Result<()> {
    let perms = permissions::check_permissions();
    let mut out = io::stdout().lock();
    writeln!(
        out,
        "accessibility: {}",
        if perms.accessibility_ok { "granted" } else { "missing" }
    )?;
    writeln!(
        out,
        "input source:  {}",
        mac_input_source::current_source_id().as_deref().unwrap_or("-")
    )?;
    writeln!(
        out,
        "focused app:   {}",
        mac_focus_watcher::focused_bundle_id().as_deref().unwrap_or("-")
    )?;
    Ok(())
}

/// Print every selectable keyboard input source, marking the active one.
pub fn sources() -> Result<()> {
    let current = mac_input_source::current_source_id();
    let mut out = io::stdout().lock();
    for src in mac_input_source::list_sources()? {
        let mark = if current.as_deref() == Some(src.id.as_str()) { '*' } else { ' ' };
        writeln!(out, "{} {:<48} {}", mark, src.id, src.name)?;
    }
    Ok(())
}
