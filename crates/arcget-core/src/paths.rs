//! Containment for manifest-declared relative paths.

use anyhow::{bail, Result};
use std::path::{Component, Path, PathBuf};

/// Resolve a manifest filename under the record root.
///
/// Manifest filenames may contain nested `/` separators, which are honored.
/// Absolute paths and `..` components are rejected so a hostile manifest
/// cannot name a file outside the record directory.
pub fn entry_path(root: &Path, filename: &str) -> Result<PathBuf> {
    if filename.is_empty() {
        bail!("manifest filename is empty");
    }
    let rel = Path::new(filename);
    for comp in rel.components() {
        match comp {
            Component::Normal(_) | Component::CurDir => {}
            _ => bail!("manifest filename {:?} escapes the record directory", filename),
        }
    }
    Ok(root.join(rel))
}
