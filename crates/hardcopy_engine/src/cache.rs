use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetStatus {
    /// Claimed by a scheduled fetch or probe that has not finished yet.
    Pending,
    Fetched { size_bytes: u64 },
    /// Benign skip: nothing was produced for this path.
    Absent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetEntry {
    pub status: AssetStatus,
    /// Set when the real file lives under an extension-qualified name.
    pub redirects_to: Option<PathBuf>,
}

/// Per-variant record of local asset paths.
///
/// Doubles as the set of in-flight fetches: [`AssetCache::try_begin`] is the
/// only way to schedule work for a path, so each path is fetched at most once.
/// A `Fetched` entry is never downgraded.
#[derive(Debug, Default)]
pub struct AssetCache {
    entries: Mutex<HashMap<PathBuf, AssetEntry>>,
}

impl AssetCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `path` as `Pending`. Returns false when the path is already known.
    pub fn try_begin(&self, path: &Path) -> bool {
        let mut entries = self.lock();
        if entries.contains_key(path) {
            return false;
        }
        entries.insert(
            path.to_path_buf(),
            AssetEntry {
                status: AssetStatus::Pending,
                redirects_to: None,
            },
        );
        true
    }

    pub fn mark_fetched(&self, path: &Path, size_bytes: u64) {
        let mut entries = self.lock();
        let entry = entries
            .entry(path.to_path_buf())
            .or_insert_with(|| AssetEntry {
                status: AssetStatus::Pending,
                redirects_to: None,
            });
        entry.status = AssetStatus::Fetched { size_bytes };
    }

    pub fn mark_absent(&self, path: &Path) {
        let mut entries = self.lock();
        let entry = entries
            .entry(path.to_path_buf())
            .or_insert_with(|| AssetEntry {
                status: AssetStatus::Absent,
                redirects_to: None,
            });
        if !matches!(entry.status, AssetStatus::Fetched { .. }) {
            entry.status = AssetStatus::Absent;
        }
    }

    pub fn set_redirect(&self, from: &Path, to: &Path) {
        let mut entries = self.lock();
        let entry = entries
            .entry(from.to_path_buf())
            .or_insert_with(|| AssetEntry {
                status: AssetStatus::Pending,
                redirects_to: None,
            });
        entry.redirects_to = Some(to.to_path_buf());
    }

    pub fn entry(&self, path: &Path) -> Option<AssetEntry> {
        self.lock().get(path).cloned()
    }

    /// Follow at most one redirect from `path` and report where the asset
    /// lives and in which state.
    pub fn resolve(&self, path: &Path) -> Option<(PathBuf, AssetStatus)> {
        let entries = self.lock();
        let entry = entries.get(path)?;
        match &entry.redirects_to {
            Some(target) => entries
                .get(target)
                .map(|target_entry| (target.clone(), target_entry.status)),
            None => Some((path.to_path_buf(), entry.status)),
        }
    }

    /// Final path of a fetched asset strictly larger than `min_bytes`.
    pub fn usable(&self, path: &Path, min_bytes: u64) -> Option<PathBuf> {
        match self.resolve(path)? {
            (target, AssetStatus::Fetched { size_bytes }) if size_bytes > min_bytes => Some(target),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<PathBuf, AssetEntry>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
