use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Writes a YAML config tree into a fresh temporary directory.
///
/// Each entry is a relative document path and its content; intermediate
/// directories are created as needed. The directory lives until the
/// returned guard is dropped.
pub fn config_tree(documents: &[(&str, &str)]) -> TempDir {
    let dir = TempDir::new().expect("failed to create temp config dir");
    for (relative, content) in documents {
        write_document(dir.path(), relative, content);
    }
    dir
}

pub fn write_document(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("failed to create config subdirectory");
    }
    fs::write(&path, content).expect("failed to write config document");
}
