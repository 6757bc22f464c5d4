//! Phase 1 — discover. Iterative directory walk via `walkdir`,
//! deterministic by construction since `walkdir` yields entries in
//! lexicographic order per directory; we still sort explicitly so the
//! guarantee does not depend on that implementation detail.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::extract::Language;

/// Discovers every regular file under `root` whose extension maps to a
/// known language, skipping directories named in `ignore_dirs` and any
/// entry (file or directory) whose name starts with `.` (except `.`/`..`,
/// which `walkdir` never yields as entries anyway).
pub fn discover_files(root: &Path, ignore_dirs: &[String]) -> Vec<(PathBuf, Language)> {
    let mut out = Vec::new();

    let walker = WalkDir::new(root).into_iter().filter_entry(|entry| {
        let name = entry.file_name().to_string_lossy();
        if name.starts_with('.') {
            return false;
        }
        if entry.file_type().is_dir() && ignore_dirs.iter().any(|d| d == name.as_ref()) {
            return false;
        }
        true
    });

    for entry in walker.filter_map(Result::ok) {
        if !entry.file_type().is_file() {
            continue;
        }
        if let Some(lang) = Language::from_path(entry.path()) {
            out.push((entry.into_path(), lang));
        }
    }

    out.sort_by(|a, b| a.0.cmp(&b.0));
    out
}
