//! Fixtures shared by the unit tests.
#![cfg(test)]
#![allow(clippy::unwrap_used)]

use std::path::PathBuf;

use tempfile::TempDir;

/// A prepared document with an Arabic variant.
pub(crate) const ANTI_PHASE_SOURCE: &str = r#"<svg xmlns="http://www.w3.org/2000/svg"><switch><text systemLanguage="ar"><tspan>لكنها موصولة بشكل معاكس</tspan></text><text><tspan>but are connected in anti-phase</tspan></text></switch></svg>"#;

/// The same label as loose text, with no translations yet.
pub(crate) const ANTI_PHASE_TARGET: &str = r#"<svg xmlns="http://www.w3.org/2000/svg"><text x="5" y="9">but are connected in anti-phase</text></svg>"#;

/// Writes `content` to `name` inside `dir`, creating parent directories.
pub(crate) fn write_file(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, content).unwrap();
    path
}
