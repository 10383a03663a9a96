use std::path::{Path, PathBuf};

/// Lists every persisted document under `root` with the given extension
///
/// Walks the tree recursively, so it finds pages in both flat and
/// hierarchical layouts. This is the contract downstream consumers rely on.
/// The result is sorted. A missing root yields an empty list.
pub fn enumerate_documents(root: &Path, extension: &str) -> std::io::Result<Vec<PathBuf>> {
    let extension = extension.trim_start_matches('.');
    let mut found = Vec::new();

    if !root.exists() {
        return Ok(found);
    }

    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            let path = entry.path();
            let file_type = entry.file_type()?;

            if file_type.is_dir() {
                pending.push(path);
            } else if file_type.is_file()
                && path
                    .extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case(extension))
            {
                found.push(path);
            }
        }
    }

    found.sort();
    Ok(found)
}
