// 💾 Snapshot Source - Replays cached threads from `<thread_id>.json`

use super::CommentSource;
use crate::comments::TextItem;
use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

/// Path of the cached snapshot for a thread
pub fn snapshot_path(dir: &Path, thread_id: u64) -> PathBuf {
    dir.join(format!("{}.json", thread_id))
}

/// Write a fetched thread so later runs can work offline
pub fn write_snapshot(dir: &Path, thread_id: u64, items: &[TextItem]) -> Result<PathBuf> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create snapshot directory: {}", dir.display()))?;

    let path = snapshot_path(dir, thread_id);
    let json = serde_json::to_string(items).context("Failed to serialize comments")?;
    fs::write(&path, json)
        .with_context(|| format!("Failed to write snapshot: {}", path.display()))?;

    Ok(path)
}

/// SHA-256 of a snapshot file, hex encoded
pub fn snapshot_digest(path: &Path) -> Result<String> {
    let bytes =
        fs::read(path).with_context(|| format!("Failed to read snapshot: {}", path.display()))?;
    Ok(format!("{:x}", Sha256::digest(&bytes)))
}

/// Reads threads back from a snapshot directory
pub struct SnapshotSource {
    dir: PathBuf,
}

impl SnapshotSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        SnapshotSource { dir: dir.into() }
    }

    pub fn has_snapshot(&self, thread_id: u64) -> bool {
        snapshot_path(&self.dir, thread_id).is_file()
    }
}

impl CommentSource for SnapshotSource {
    fn fetch_thread(&self, thread_id: u64) -> Result<Vec<TextItem>> {
        let path = snapshot_path(&self.dir, thread_id);
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read snapshot: {}", path.display()))?;

        let mut items: Vec<TextItem> = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse snapshot JSON: {}", path.display()))?;
        for item in &mut items {
            item.reset_depths();
        }

        Ok(items)
    }

    fn name(&self) -> &str {
        "snapshot"
    }
}
