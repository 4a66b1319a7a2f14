//! File naming helpers for installed binaries.

use std::path::{Path, PathBuf};

/// Placeholder replaced by a collision-avoiding index in name patterns.
pub const INDEX_PLACEHOLDER: &str = "{}";

/// Returns the first path in `folder` that does not exist yet.
///
/// Index 0 replaces the placeholder with nothing, then 1, 2, ... are tried.
/// This only picks a name; a concurrent creator can still race for it.
pub fn unique_file_path(folder: &Path, name_pattern: &str) -> PathBuf {
    let folder = std::path::absolute(folder).unwrap_or_else(|_| folder.to_path_buf());
    let mut index: usize = 0;
    loop {
        let suffix = if index == 0 {
            String::new()
        } else {
            index.to_string()
        };
        let candidate = folder.join(name_pattern.replace(INDEX_PLACEHOLDER, &suffix));
        if !candidate.exists() {
            return candidate;
        }
        index += 1;
    }
}

/// Appends `.exe` on Windows.
pub fn executable_name(name: &str) -> String {
    if cfg!(windows) {
        format!("{name}.exe")
    } else {
        name.to_string()
    }
}

/// Replaces the last extension of the file name, or appends `new_ext`.
///
/// `new_ext` includes its leading dot, or is empty to strip the extension.
pub fn change_ext(path: &Path, new_ext: &str) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!("{stem}{new_ext}"))
}
