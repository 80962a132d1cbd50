use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use chrono::Duration;

use crate::foundation::error::{MocksmithError, MocksmithResult};

/// Top-level retention configuration, the deserialized form of
/// `output_config.json`.
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct RetentionConfig {
    /// Global cache limits.
    #[serde(default)]
    pub cache_settings: CacheSettings,
    /// Ordered category policies; first pattern match wins.
    #[serde(default)]
    pub file_categories: Vec<CategoryPolicy>,
    /// Named managed directories, relative to the retention root.
    #[serde(default)]
    pub directories: BTreeMap<String, PathBuf>,
    /// When cleanup runs.
    #[serde(default)]
    pub cleanup_schedule: CleanupSchedule,
    /// Archival of aged files into zip archives.
    #[serde(default)]
    pub compression: CompressionSettings,
    /// Alert thresholds surfaced in cleanup reports.
    #[serde(default)]
    pub monitoring: MonitoringSettings,
}

/// Global cache limits.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct CacheSettings {
    /// Hard cap on total tracked bytes; exceeding it after cleanup raises a
    /// cache-overflow alert.
    pub max_total_size_mb: u64,
    /// Fallback age limit for uncategorized files and for categories that
    /// set no age rule of their own.
    #[serde(default)]
    pub max_age_days: Option<u64>,
    /// Run a cleanup pass when the application starts.
    #[serde(default)]
    pub cleanup_on_startup: bool,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            max_total_size_mb: 10_240,
            max_age_days: None,
            cleanup_on_startup: false,
        }
    }
}

/// One file-category retention policy.
///
/// A file belongs to the first category whose pattern matches its name, so
/// the order of `file_categories` is significant.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct CategoryPolicy {
    /// Category name, used in stats and reports.
    pub name: String,
    /// Filename glob patterns (`*` and `?`).
    pub patterns: Vec<String>,
    /// Age limit in hours. Mutually exclusive with `max_age_days`.
    #[serde(default)]
    pub max_age_hours: Option<u64>,
    /// Age limit in days. Mutually exclusive with `max_age_hours`.
    #[serde(default)]
    pub max_age_days: Option<u64>,
    /// Keep at most this many files, newest first.
    #[serde(default)]
    pub max_count: Option<usize>,
    /// Cap on the category's total bytes; oldest files past the cap expire.
    #[serde(default)]
    pub size_limit_mb: Option<u64>,
    /// Delete expired files outright instead of archiving them.
    #[serde(default)]
    pub auto_delete: bool,
}

impl CategoryPolicy {
    /// The effective age limit, if any.
    pub fn max_age(&self) -> Option<Duration> {
        if let Some(h) = self.max_age_hours {
            return Some(Duration::hours(h as i64));
        }
        self.max_age_days.map(|d| Duration::days(d as i64))
    }
}

/// How often scheduled cleanup runs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleFrequency {
    /// Every hour.
    Hourly,
    /// Once a day.
    #[default]
    Daily,
    /// Once a week.
    Weekly,
}

impl ScheduleFrequency {
    /// Minimum interval between scheduled runs.
    pub fn interval(self) -> Duration {
        match self {
            ScheduleFrequency::Hourly => Duration::hours(1),
            ScheduleFrequency::Daily => Duration::days(1),
            ScheduleFrequency::Weekly => Duration::weeks(1),
        }
    }
}

/// Cleanup cadence and the forced-cleanup trigger.
#[derive(Clone, Copy, Debug, serde::Serialize, serde::Deserialize)]
pub struct CleanupSchedule {
    /// Whether scheduled cleanup runs at all. The forced size-pressure pass
    /// ignores this.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Scheduled run cadence.
    #[serde(default)]
    pub frequency: ScheduleFrequency,
    /// Earliest time of day (`HH:MM:SS`) a daily or weekly run may start.
    #[serde(default)]
    pub time_of_day: Option<chrono::NaiveTime>,
    /// Total size that triggers an immediate forced cleanup pass.
    #[serde(default)]
    pub force_cleanup_size_mb: Option<u64>,
}

fn default_true() -> bool {
    true
}

impl Default for CleanupSchedule {
    fn default() -> Self {
        Self {
            enabled: true,
            frequency: ScheduleFrequency::Daily,
            time_of_day: None,
            force_cleanup_size_mb: None,
        }
    }
}

/// Zip archival of aged files.
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct CompressionSettings {
    /// Archive instead of keeping aged files loose.
    #[serde(default)]
    pub enabled: bool,
    /// Only archive files older than this many days.
    #[serde(default)]
    pub compress_after_days: u64,
}

/// Alert thresholds; crossing one adds an alert line to the cleanup report.
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct MonitoringSettings {
    /// Warn when total tracked size exceeds this.
    #[serde(default)]
    pub alert_size_threshold_mb: Option<u64>,
    /// Warn when total tracked file count exceeds this.
    #[serde(default)]
    pub alert_file_count_threshold: Option<u64>,
}

impl RetentionConfig {
    /// Load and validate a config from a JSON file.
    pub fn load_path(path: &Path) -> MocksmithResult<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read retention config '{}'", path.display()))?;
        let config: Self = serde_json::from_str(&text)
            .map_err(|e| MocksmithError::config(format!("parse '{}': {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a config from an in-memory JSON value.
    pub fn load_value(value: serde_json::Value) -> MocksmithResult<Self> {
        let config: Self = serde_json::from_value(value)
            .map_err(|e| MocksmithError::config(format!("parse retention config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Check structural invariants the serde layer cannot express.
    pub fn validate(&self) -> MocksmithResult<()> {
        if self.cache_settings.max_total_size_mb == 0 {
            return Err(MocksmithError::config("max_total_size_mb must be >= 1"));
        }

        let mut seen = BTreeSet::new();
        for cat in &self.file_categories {
            if cat.name.is_empty() {
                return Err(MocksmithError::config("category name must not be empty"));
            }
            if !seen.insert(cat.name.as_str()) {
                return Err(MocksmithError::config(format!(
                    "duplicate category name '{}'",
                    cat.name
                )));
            }
            if cat.patterns.is_empty() {
                return Err(MocksmithError::config(format!(
                    "category '{}' has no patterns",
                    cat.name
                )));
            }
            if cat.max_age_hours.is_some() && cat.max_age_days.is_some() {
                return Err(MocksmithError::config(format!(
                    "category '{}' sets both max_age_hours and max_age_days",
                    cat.name
                )));
            }
            if cat.size_limit_mb == Some(0) {
                return Err(MocksmithError::config(format!(
                    "category '{}' size_limit_mb must be >= 1 when set",
                    cat.name
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/retention/policy.rs"]
mod tests;
