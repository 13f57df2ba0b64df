// src/batch/discovery.rs

use std::path::Path;

use anyhow::Context;

use crate::errors::Result;
use crate::fs::FileSystem;

/// List the entries of `root` whose names start with `prefix`, sorted.
pub fn discover_subjects(fs: &dyn FileSystem, root: &Path, prefix: &str) -> Result<Vec<String>> {
    let entries = fs
        .read_dir(root)
        .with_context(|| format!("listing subjects in {:?}", root))?;

    let mut subjects: Vec<String> = entries
        .iter()
        .filter_map(|p| p.file_name().and_then(|n| n.to_str()))
        .filter(|name| name.starts_with(prefix))
        .map(str::to_string)
        .collect();
    subjects.sort();

    Ok(subjects)
}

/// Prepend `prefix` unless the ID already carries it (`"123"` -> `"sub-123"`).
pub fn normalize_subject_id(id: &str, prefix: &str) -> String {
    let id = id.trim();
    if id.starts_with(prefix) {
        id.to_string()
    } else {
        format!("{prefix}{id}")
    }
}
