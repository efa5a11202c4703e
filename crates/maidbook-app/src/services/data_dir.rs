// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Platform-aware data directory resolution.

use std::path::{Path, PathBuf};

use maidbook_core::error::Result;

/// Return the application data directory, creating it if needed.
///
/// On desktop this uses a conventional location. On mobile the platform
/// shell should pass its documents directory to `data_dir_in` instead.
pub fn data_dir() -> Result<PathBuf> {
    data_dir_in(&base_dir())
}

/// Return (and create) the `maidbook` directory under `base`.
pub fn data_dir_in(base: &Path) -> Result<PathBuf> {
    let dir = base.join("maidbook");
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

fn base_dir() -> PathBuf {
    // Try XDG data dir, then fallback to home
    if let Ok(xdg) = std::env::var("XDG_DATA_HOME") {
        return PathBuf::from(xdg);
    }
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".local").join("share");
    }
    std::env::temp_dir()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_app_directory() {
        let base = tempfile::tempdir().unwrap();
        let dir = data_dir_in(base.path()).unwrap();
        assert!(dir.is_dir());
        assert!(dir.ends_with("maidbook"));
    }
}
