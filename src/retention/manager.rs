use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use zip::write::SimpleFileOptions;

use crate::foundation::error::{MocksmithError, MocksmithResult};
use crate::retention::classify::{Category, classify};
use crate::retention::policy::RetentionConfig;
use crate::retention::state::CacheState;

const BYTES_PER_MB: u64 = 1024 * 1024;

/// One file discovered by an inventory scan.
#[derive(Clone, Debug)]
pub struct TrackedFile {
    /// Absolute path.
    pub path: PathBuf,
    /// Final path component, used for classification.
    pub file_name: String,
    /// Resolved retention category.
    pub category: Category,
    /// Size in bytes.
    pub bytes: u64,
    /// Last modification time, the age reference for retention rules.
    pub modified: DateTime<Utc>,
}

/// Why a file was selected for removal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActionReason {
    /// Older than the applicable age limit.
    AgeExceeded,
    /// Beyond the category's count cap, oldest first.
    CountExceeded,
    /// Past the category's byte cap, oldest first.
    SizeExceeded,
    /// Removed by the forced size-pressure pass.
    ForcedCleanup,
}

/// A planned disposition for one file.
#[derive(Clone, Debug)]
pub enum RetentionAction {
    /// Remove the file outright.
    Delete {
        /// The file to remove.
        file: TrackedFile,
        /// Selection reason.
        reason: ActionReason,
    },
    /// Move the file into the run's zip archive, then remove the original.
    Archive {
        /// The file to archive.
        file: TrackedFile,
        /// Selection reason.
        reason: ActionReason,
    },
}

impl RetentionAction {
    fn file(&self) -> &TrackedFile {
        match self {
            RetentionAction::Delete { file, .. } | RetentionAction::Archive { file, .. } => file,
        }
    }
}

/// The pure output of [`RetentionManager::plan_cleanup`].
#[derive(Clone, Debug, Default)]
pub struct CleanupPlan {
    /// Dispositions to execute, in order.
    pub actions: Vec<RetentionAction>,
    /// Threshold warnings raised during planning.
    pub alerts: Vec<String>,
    /// Files that expired but have no actionable disposition (archival
    /// disabled and not auto-delete).
    pub skipped: u64,
}

/// Outcome of one cleanup run.
#[derive(Clone, Debug, Default)]
pub struct CleanupReport {
    /// Files deleted.
    pub deleted: u64,
    /// Files moved into the run archive.
    pub archived: u64,
    /// Expired files left in place.
    pub skipped: u64,
    /// Bytes reclaimed from the managed directories.
    pub freed_bytes: u64,
    /// Per-file failures; never fatal to the run.
    pub errors: Vec<String>,
    /// Threshold warnings.
    pub alerts: Vec<String>,
}

/// Point-in-time cache summary derived from persisted state.
#[derive(Clone, Debug, serde::Serialize)]
pub struct CacheStats {
    /// Total tracked bytes.
    pub total_bytes: u64,
    /// Total tracked size in megabytes.
    pub total_mb: f64,
    /// Total tracked file count.
    pub total_files: u64,
    /// Per-category `(files, bytes)` counters.
    pub categories: BTreeMap<String, (u64, u64)>,
    /// Completion time of the last cleanup run.
    pub last_cleanup: Option<DateTime<Utc>>,
}

/// Applies retention policy to the managed output directories: scans,
/// classifies, plans, and executes age/count/size-based cleanup.
#[derive(Clone, Debug)]
pub struct RetentionManager {
    config: RetentionConfig,
    root: PathBuf,
}

impl RetentionManager {
    /// Construct a manager over a validated config rooted at `root`.
    pub fn new(config: RetentionConfig, root: impl Into<PathBuf>) -> Self {
        Self {
            config,
            root: root.into(),
        }
    }

    /// The retention config in effect.
    pub fn config(&self) -> &RetentionConfig {
        &self.config
    }

    /// Walk every managed directory and classify what is there.
    ///
    /// Missing directories are skipped silently; subdirectories are not
    /// descended into.
    pub fn scan_inventory(&self) -> MocksmithResult<Vec<TrackedFile>> {
        let mut inventory = Vec::new();
        for dir in self.config.directories.values() {
            let dir = self.root.join(dir);
            let entries = match std::fs::read_dir(&dir) {
                Ok(entries) => entries,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    tracing::debug!(dir = %dir.display(), "managed directory missing, skipping");
                    continue;
                }
                Err(e) => {
                    return Err(MocksmithError::retention(format!(
                        "scan '{}': {e}",
                        dir.display()
                    )));
                }
            };
            for entry in entries {
                let entry = entry
                    .map_err(|e| MocksmithError::retention(format!("scan '{}': {e}", dir.display())))?;
                let meta = match entry.metadata() {
                    Ok(meta) if meta.is_file() => meta,
                    Ok(_) => continue,
                    // File vanished between readdir and stat.
                    Err(_) => continue,
                };
                let file_name = entry.file_name().to_string_lossy().into_owned();
                let modified = meta
                    .modified()
                    .map(DateTime::<Utc>::from)
                    .unwrap_or_else(|_| Utc::now());
                inventory.push(TrackedFile {
                    path: entry.path(),
                    category: classify(&self.config.file_categories, &file_name),
                    file_name,
                    bytes: meta.len(),
                    modified,
                });
            }
        }
        Ok(inventory)
    }

    /// Decide what to do with an inventory, without touching the filesystem.
    ///
    /// Pure over its inputs so retention behavior is testable with synthetic
    /// inventories and a pinned clock.
    pub fn plan_cleanup(&self, inventory: &[TrackedFile], now: DateTime<Utc>) -> CleanupPlan {
        let mut plan = CleanupPlan::default();
        let total_bytes: u64 = inventory.iter().map(|f| f.bytes).sum();

        let global_age = self
            .config
            .cache_settings
            .max_age_days
            .map(|d| chrono::Duration::days(d as i64));

        // Per-category expiry: age limit, then count cap, then byte cap,
        // all oldest-first past the respective limit.
        let mut expired: Vec<(&TrackedFile, ActionReason)> = Vec::new();
        for policy in &self.config.file_categories {
            let mut members: Vec<&TrackedFile> = inventory
                .iter()
                .filter(|f| f.category == Category::Named(policy.name.clone()))
                .collect();
            members.sort_by(|a, b| b.modified.cmp(&a.modified));

            let age_limit = policy.max_age().or(global_age);
            let mut kept = Vec::new();
            for file in members {
                match age_limit {
                    Some(limit) if now - file.modified > limit => {
                        expired.push((file, ActionReason::AgeExceeded));
                    }
                    _ => kept.push(file),
                }
            }
            if let Some(cap) = policy.max_count {
                for file in kept.split_off(cap.min(kept.len())) {
                    expired.push((file, ActionReason::CountExceeded));
                }
            }
            if let Some(size_mb) = policy.size_limit_mb {
                let cap_bytes = size_mb * BYTES_PER_MB;
                let mut running = 0u64;
                let mut within = 0usize;
                for file in &kept {
                    if running + file.bytes > cap_bytes {
                        break;
                    }
                    running += file.bytes;
                    within += 1;
                }
                for file in kept.split_off(within) {
                    expired.push((file, ActionReason::SizeExceeded));
                }
            }
        }

        // Uncategorized files answer only to the global age limit, and are
        // never deleted outright, only archived.
        if let Some(limit) = global_age {
            for file in inventory
                .iter()
                .filter(|f| f.category == Category::Uncategorized)
            {
                if now - file.modified > limit {
                    expired.push((file, ActionReason::AgeExceeded));
                }
            }
        }

        for (file, reason) in expired {
            let policy = self
                .config
                .file_categories
                .iter()
                .find(|p| Category::Named(p.name.clone()) == file.category);
            let auto_delete = policy.is_some_and(|p| p.auto_delete);
            if auto_delete {
                plan.actions.push(RetentionAction::Delete {
                    file: file.clone(),
                    reason,
                });
            } else if self.should_archive(file, now) {
                plan.actions.push(RetentionAction::Archive {
                    file: file.clone(),
                    reason,
                });
            } else {
                plan.skipped += 1;
            }
        }

        // Forced pass under size pressure: delete oldest files from
        // auto-delete categories until back under the threshold.
        if let Some(force_mb) = self.config.cleanup_schedule.force_cleanup_size_mb {
            let force_bytes = force_mb * BYTES_PER_MB;
            let mut remaining =
                total_bytes.saturating_sub(plan.actions.iter().map(|a| a.file().bytes).sum());
            if remaining > force_bytes {
                let mut candidates: Vec<&TrackedFile> = inventory
                    .iter()
                    .filter(|f| {
                        self.is_auto_delete(f)
                            && !plan
                                .actions
                                .iter()
                                .any(|a| a.file().path == f.path)
                    })
                    .collect();
                candidates.sort_by(|a, b| a.modified.cmp(&b.modified));
                for file in candidates {
                    if remaining <= force_bytes {
                        break;
                    }
                    remaining = remaining.saturating_sub(file.bytes);
                    plan.actions.push(RetentionAction::Delete {
                        file: file.clone(),
                        reason: ActionReason::ForcedCleanup,
                    });
                }
                if remaining > force_bytes {
                    plan.alerts.push(format!(
                        "forced cleanup could not reach {force_mb} MB: {} MB remain",
                        remaining / BYTES_PER_MB
                    ));
                }
            }
        }

        let post_plan_bytes =
            total_bytes.saturating_sub(plan.actions.iter().map(|a| a.file().bytes).sum());
        if post_plan_bytes > self.config.cache_settings.max_total_size_mb * BYTES_PER_MB {
            plan.alerts.push(format!(
                "cache overflow: {} MB tracked, cap is {} MB",
                post_plan_bytes / BYTES_PER_MB,
                self.config.cache_settings.max_total_size_mb
            ));
        }

        let monitoring = &self.config.monitoring;
        if let Some(mb) = monitoring.alert_size_threshold_mb
            && total_bytes > mb * BYTES_PER_MB
        {
            plan.alerts.push(format!(
                "cache size {} MB exceeds alert threshold {mb} MB",
                total_bytes / BYTES_PER_MB
            ));
        }
        if let Some(count) = monitoring.alert_file_count_threshold
            && inventory.len() as u64 > count
        {
            plan.alerts.push(format!(
                "cache holds {} files, alert threshold is {count}",
                inventory.len()
            ));
        }

        plan
    }

    /// Scan, plan, and execute one cleanup run, updating `state` in place.
    ///
    /// Per-file failures land in the report's `errors` and never abort the
    /// run. `last_cleanup` is stamped even when nothing was removed.
    #[tracing::instrument(skip(self, state))]
    pub fn run_cleanup(&self, state: &mut CacheState) -> MocksmithResult<CleanupReport> {
        let now = Utc::now();
        let inventory = self.scan_inventory()?;
        state.rebuild_from(
            inventory
                .iter()
                .map(|f| (f.category.as_str(), f.bytes)),
        );

        let plan = self.plan_cleanup(&inventory, now);
        let mut report = CleanupReport {
            skipped: plan.skipped,
            alerts: plan.alerts,
            ..CleanupReport::default()
        };
        for alert in &report.alerts {
            tracing::warn!(%alert, "retention alert");
        }

        let mut archive = ArchiveSink::new(self.root.join("archive"), now);
        for action in &plan.actions {
            let file = action.file();
            let outcome = match action {
                RetentionAction::Delete { .. } => std::fs::remove_file(&file.path)
                    .map(|()| &mut report.deleted)
                    .map_err(|e| format!("delete '{}': {e}", file.path.display())),
                RetentionAction::Archive { .. } => archive
                    .add(&file.path, &file.file_name)
                    .map(|()| &mut report.archived)
                    .map_err(|e| format!("archive '{}': {e}", file.path.display())),
            };
            match outcome {
                Ok(counter) => {
                    *counter += 1;
                    report.freed_bytes += file.bytes;
                    state.record_removed(file.category.as_str(), file.bytes);
                }
                Err(msg) => {
                    tracing::warn!(error = %msg, "cleanup action failed");
                    report.errors.push(msg);
                }
            }
        }
        if let Err(e) = archive.finish() {
            let msg = format!("finalize archive: {e}");
            tracing::warn!(error = %msg, "cleanup action failed");
            report.errors.push(msg);
        }

        state.last_cleanup = Some(now);
        tracing::info!(
            deleted = report.deleted,
            archived = report.archived,
            freed_bytes = report.freed_bytes,
            errors = report.errors.len(),
            "cleanup run complete"
        );
        Ok(report)
    }

    /// Whether a scheduled run is due.
    ///
    /// Size pressure past `force_cleanup_size_mb` is always due, even with
    /// the schedule disabled. Otherwise a run is due once the schedule's
    /// interval has elapsed since the last cleanup and, when `time_of_day`
    /// is set, the clock has passed it.
    pub fn is_cleanup_due(&self, state: &CacheState, now: DateTime<Utc>) -> bool {
        let schedule = &self.config.cleanup_schedule;
        if let Some(force_mb) = schedule.force_cleanup_size_mb
            && state.total_bytes > force_mb * BYTES_PER_MB
        {
            return true;
        }
        if !schedule.enabled {
            return false;
        }
        if let Some(earliest) = schedule.time_of_day
            && now.time() < earliest
        {
            return false;
        }
        match state.last_cleanup {
            None => true,
            Some(last) => now - last >= schedule.frequency.interval(),
        }
    }

    /// Run a cleanup only if one is due; returns `None` otherwise.
    pub fn run_if_due(&self, state: &mut CacheState) -> MocksmithResult<Option<CleanupReport>> {
        if !self.is_cleanup_due(state, Utc::now()) {
            return Ok(None);
        }
        self.run_cleanup(state).map(Some)
    }

    /// Run the startup pass if `cleanup_on_startup` is configured.
    pub fn run_on_startup(&self, state: &mut CacheState) -> MocksmithResult<Option<CleanupReport>> {
        if !self.config.cache_settings.cleanup_on_startup {
            return Ok(None);
        }
        self.run_cleanup(state).map(Some)
    }

    /// Summarize persisted state for reporting.
    pub fn cache_stats(&self, state: &CacheState) -> CacheStats {
        CacheStats {
            total_bytes: state.total_bytes,
            total_mb: state.total_bytes as f64 / BYTES_PER_MB as f64,
            total_files: state.total_files(),
            categories: state
                .categories
                .iter()
                .map(|(name, s)| (name.clone(), (s.files, s.bytes)))
                .collect(),
            last_cleanup: state.last_cleanup,
        }
    }

    fn is_auto_delete(&self, file: &TrackedFile) -> bool {
        self.config
            .file_categories
            .iter()
            .any(|p| p.auto_delete && Category::Named(p.name.clone()) == file.category)
    }

    fn should_archive(&self, file: &TrackedFile, now: DateTime<Utc>) -> bool {
        let compression = &self.config.compression;
        compression.enabled
            && now - file.modified
                >= chrono::Duration::days(compression.compress_after_days as i64)
    }
}

/// Lazily created zip archive for one cleanup run; files are added deflated
/// and their originals removed only after a successful write.
struct ArchiveSink {
    dir: PathBuf,
    stamp: DateTime<Utc>,
    writer: Option<zip::ZipWriter<File>>,
}

impl ArchiveSink {
    fn new(dir: PathBuf, stamp: DateTime<Utc>) -> Self {
        Self {
            dir,
            stamp,
            writer: None,
        }
    }

    fn add(&mut self, path: &Path, file_name: &str) -> std::io::Result<()> {
        let writer = match &mut self.writer {
            Some(writer) => writer,
            None => {
                std::fs::create_dir_all(&self.dir)?;
                let archive_path = self
                    .dir
                    .join(format!("archive_{}.zip", self.stamp.format("%Y%m%d_%H%M%S")));
                self.writer
                    .insert(zip::ZipWriter::new(File::create(archive_path)?))
            }
        };
        let options =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
        let bytes = std::fs::read(path)?;
        writer.start_file(file_name, options).map_err(io_other)?;
        writer.write_all(&bytes)?;
        std::fs::remove_file(path)
    }

    fn finish(self) -> std::io::Result<()> {
        if let Some(writer) = self.writer {
            writer.finish().map_err(io_other)?;
        }
        Ok(())
    }
}

fn io_other(e: zip::result::ZipError) -> std::io::Error {
    std::io::Error::other(e)
}

#[cfg(test)]
#[path = "../../tests/unit/retention/manager.rs"]
mod tests;
