use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context as _;
use chrono::{DateTime, Utc};

use crate::foundation::error::{MocksmithError, MocksmithResult};

/// Per-category counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CategoryStats {
    /// Tracked file count.
    pub files: u64,
    /// Tracked total size in bytes.
    pub bytes: u64,
}

/// Persistent cache accounting, the deserialized form of `cache_state.json`.
///
/// Counters are advisory between cleanups; [`CacheState::rebuild_from`]
/// re-derives them from a directory scan so drift never compounds.
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct CacheState {
    /// Total tracked bytes across every category.
    pub total_bytes: u64,
    /// Per-category counters, keyed by category name.
    pub categories: BTreeMap<String, CategoryStats>,
    /// Completion time of the last cleanup run.
    pub last_cleanup: Option<DateTime<Utc>>,
}

impl CacheState {
    /// Load state from disk; a missing file yields the empty default.
    pub fn load(path: &Path) -> MocksmithResult<Self> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => {
                return Err(anyhow::Error::new(e)
                    .context(format!("read cache state '{}'", path.display()))
                    .into());
            }
        };
        serde_json::from_str(&text)
            .map_err(|e| MocksmithError::retention(format!("parse '{}': {e}", path.display())))
    }

    /// Persist state via temp-file-and-rename so a crash never leaves a
    /// truncated state file.
    pub fn persist(&self, path: &Path) -> MocksmithResult<()> {
        let text = serde_json::to_string_pretty(self)
            .map_err(|e| MocksmithError::retention(format!("serialize cache state: {e}")))?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, text)
            .with_context(|| format!("write cache state '{}'", tmp.display()))?;
        std::fs::rename(&tmp, path)
            .with_context(|| format!("rename cache state into '{}'", path.display()))?;
        Ok(())
    }

    /// Account for a newly generated file.
    pub fn record_generated(&mut self, category: &str, bytes: u64) {
        self.total_bytes += bytes;
        let stats = self.categories.entry(category.to_string()).or_default();
        stats.files += 1;
        stats.bytes += bytes;
    }

    /// Account for a removed (deleted or archived-away) file. Saturates
    /// rather than underflows if counters have drifted.
    pub fn record_removed(&mut self, category: &str, bytes: u64) {
        self.total_bytes = self.total_bytes.saturating_sub(bytes);
        if let Some(stats) = self.categories.get_mut(category) {
            stats.files = stats.files.saturating_sub(1);
            stats.bytes = stats.bytes.saturating_sub(bytes);
        }
    }

    /// Replace all counters with ground truth from a fresh inventory scan.
    /// `last_cleanup` is preserved.
    pub fn rebuild_from<'a>(&mut self, inventory: impl IntoIterator<Item = (&'a str, u64)>) {
        self.total_bytes = 0;
        self.categories.clear();
        for (category, bytes) in inventory {
            self.record_generated(category, bytes);
        }
    }

    /// Total tracked file count across every category.
    pub fn total_files(&self) -> u64 {
        self.categories.values().map(|s| s.files).sum()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/retention/state.rs"]
mod tests;
