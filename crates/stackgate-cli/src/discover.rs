//! Locating stack documents in a repository checkout.

use std::io;
use std::path::{Path, PathBuf};

use anyhow::Context;

/// Directory, relative to the repository root, holding stack documents.
pub const STACKS_DIR: &str = ".github/stacks";

const TEMPLATE_STEM: &str = "stack";
const VALUES_STEM: &str = "values";
const EXTENSIONS: [&str; 2] = ["yml", "yaml"];

/// First existing `<root>/.github/stacks/<stem>.yml`, then `.yaml`.
pub fn find_stack_file(root: &Path, stem: &str) -> Option<PathBuf> {
    let dir = root.join(STACKS_DIR);
    EXTENSIONS
        .iter()
        .map(|ext| dir.join(format!("{stem}.{ext}")))
        .find(|path| path.is_file())
}

pub fn find_template(root: &Path) -> Option<PathBuf> {
    find_stack_file(root, TEMPLATE_STEM)
}

pub fn find_values(root: &Path) -> Option<PathBuf> {
    find_stack_file(root, VALUES_STEM)
}

/// Read `path` as UTF-8, treating a missing file as absent.
///
/// # Errors
///
/// Any I/O failure other than "not found".
pub fn read_optional(path: &Path) -> anyhow::Result<Option<String>> {
    match std::fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e).with_context(|| format!("cannot read {}", path.display())),
    }
}
