use crate::document::ConfigNode;
use crate::error::{SyncError, SyncResult};
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// Path segment marking a document as account-specific.
pub const ACCOUNT_SEGMENT: &str = "account";

#[derive(Debug, Clone, PartialEq)]
pub struct FlattenedEntry {
    pub key: String,
    pub value: String
}

/// All flattened entries originating from one document, plus its scope
/// metadata. Recomputed every run; the remote store is the only persisted
/// state. `root` is derived from the relative path and never mutated.
#[derive(Debug, Clone)]
pub struct ConfigGroup {
    pub name: String,
    pub root: String,
    pub relative_path: String,
    pub full_path: PathBuf,
    pub entries: Vec<FlattenedEntry>
}

pub struct ConfigLoader {
    root_dir: PathBuf,
    store_root: String,
    account: Option<String>
}

impl ConfigLoader {
    /// The store root is validated here, before any file or network access.
    pub fn new(
        root_dir: impl Into<PathBuf>,
        store_root: impl Into<String>,
        account: Option<String>
    ) -> SyncResult<Self> {
        let store_root = store_root.into();
        validate_store_root(&store_root)?;

        Ok(Self {
            root_dir: root_dir.into(),
            store_root,
            account
        })
    }

    pub fn load(&self) -> SyncResult<Vec<ConfigGroup>> {
        let files = self.discover()?;
        if files.is_empty() {
            return Err(SyncError::NoDocuments(self.root_dir.display().to_string()));
        }

        let mut groups = Vec::new();
        for path in &files {
            let relative = relative_slash_path(&self.root_dir, path);
            if !self.should_load(&relative) {
                debug!(document = %relative, "Skipped document for another account");
                continue;
            }
            groups.push(self.load_group(path, &relative)?);
        }

        debug!(
            discovered = files.len(),
            loaded = groups.len(),
            "Loaded configuration tree"
        );
        Ok(groups)
    }

    fn discover(&self) -> SyncResult<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in WalkDir::new(&self.root_dir) {
            let entry = entry.map_err(|e| SyncError::ReadDocument {
                path: self.root_dir.display().to_string(),
                source: e.into()
            })?;
            if entry.file_type().is_file() && has_config_extension(entry.path()) {
                files.push(entry.into_path());
            }
        }
        // Byte order on the whole path, not component order: a document
        // sorts before a like-named directory's children, so its entries
        // are overridden by theirs on collision.
        files.sort_by(|a, b| a.as_os_str().cmp(b.as_os_str()));
        Ok(files)
    }

    /// Document inclusion: a path carrying an `account` segment loads only
    /// when it also names the current account. Without account scoping
    /// every document loads.
    fn should_load(&self, relative: &str) -> bool {
        let Some(account) = &self.account else {
            return true;
        };
        if !relative.split('/').any(|segment| segment == ACCOUNT_SEGMENT) {
            return true;
        }
        relative.contains(account.as_str())
    }

    fn load_group(&self, path: &Path, relative: &str) -> SyncResult<ConfigGroup> {
        let raw = std::fs::read_to_string(path).map_err(|e| SyncError::ReadDocument {
            path: path.display().to_string(),
            source: e
        })?;
        let value: serde_yaml::Value =
            serde_yaml::from_str(&raw).map_err(|e| SyncError::ParseDocument {
                path: path.display().to_string(),
                source: e
            })?;
        let node = ConfigNode::from_document(&value)
            .ok_or_else(|| SyncError::EmptyDocument(path.display().to_string()))?;
        // A top-level scalar would flatten to the group root itself, a
        // name recursive listings under that root never report.
        if matches!(node, ConfigNode::Scalar(_)) {
            return Err(SyncError::ScalarDocument(path.display().to_string()));
        }

        let name = strip_extension(relative);
        let root = format!("{}/{}", self.store_root, name);

        // Normalization can collapse distinct document keys onto one
        // absolute key; the first occurrence keeps its position, the
        // later value wins.
        let mut entries: Vec<FlattenedEntry> = Vec::new();
        for (key, value) in node.flatten(&root) {
            let key = self.normalize_key(key);
            match entries.iter_mut().find(|entry| entry.key == key) {
                Some(existing) => existing.value = value,
                None => entries.push(FlattenedEntry { key, value })
            }
        }

        debug!(group = %name, entries = entries.len(), "Loaded configuration group");

        Ok(ConfigGroup {
            name,
            root,
            relative_path: relative.to_string(),
            full_path: path.to_path_buf(),
            entries
        })
    }

    /// Key normalization: strip the first occurrence of the account id and
    /// collapse the doubled separator it leaves behind, so account override
    /// trees land on the shared key space.
    fn normalize_key(&self, key: String) -> String {
        match &self.account {
            Some(account) => key.replacen(account.as_str(), "", 1).replacen("//", "/", 1),
            None => key
        }
    }
}

pub fn validate_store_root(store_root: &str) -> SyncResult<()> {
    if !store_root.starts_with('/') {
        return Err(SyncError::InvalidRootPath {
            path: store_root.to_string(),
            reason: "must start with '/'".to_string()
        });
    }
    if store_root.ends_with('/') {
        return Err(SyncError::InvalidRootPath {
            path: store_root.to_string(),
            reason: "must not end with '/'".to_string()
        });
    }
    Ok(())
}

fn has_config_extension(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|ext| ext.to_str()),
        Some("yaml" | "yml")
    )
}

fn strip_extension(relative: &str) -> String {
    match relative.rsplit_once('.') {
        Some((stem, _)) => stem.to_string(),
        None => relative.to_string()
    }
}

fn relative_slash_path(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|component| component.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
