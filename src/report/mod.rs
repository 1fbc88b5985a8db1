//! Report Generator
//!
//! Turns the protected set into the list of unprotected volumes and renders
//! one line per volume.

use std::collections::BTreeSet;
use std::io::Write;

use crate::domain::model::{Volume, VolumeName};
use crate::error::Result;
use crate::policy::EnabledCheckMode;

/// Volumes not in `protected`, minus those whose name contains `ignore`.
///
/// An empty `ignore` excludes nothing. The result is sorted byte-wise and
/// has no duplicates.
pub fn unprotected(
    all_volumes: &[Volume],
    protected: &BTreeSet<VolumeName>,
    ignore: Option<&str>,
) -> Vec<VolumeName> {
    let ignore = ignore.filter(|s| !s.is_empty());

    all_volumes
        .iter()
        .map(|v| &v.name)
        .filter(|name| !ignore.is_some_and(|s| name.as_str().contains(s)))
        .filter(|name| !protected.contains(*name))
        .cloned()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// One output line for `name`.
pub fn render_line(name: &VolumeName, mode: EnabledCheckMode, quiet: bool) -> String {
    if quiet {
        name.to_string()
    } else {
        format!("{} {}", name, mode.explanation())
    }
}

/// Write every line of the report to `out`.
pub fn write_report<W: Write>(
    out: &mut W,
    names: &[VolumeName],
    mode: EnabledCheckMode,
    quiet: bool,
) -> Result<()> {
    for name in names {
        writeln!(out, "{}", render_line(name, mode, quiet))?;
    }
    out.flush()?;
    Ok(())
}
