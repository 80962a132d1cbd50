use super::*;

use chrono::{Duration, TimeZone};
use serde_json::json;

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 8, 30, 12, 0, 0).unwrap()
}

fn config(doc: serde_json::Value) -> RetentionConfig {
    RetentionConfig::load_value(doc).unwrap()
}

fn mockup_policy_config() -> RetentionConfig {
    config(json!({
        "cache_settings": { "max_total_size_mb": 100 },
        "file_categories": [
            {
                "name": "mockups",
                "patterns": ["*_tshirts_*.png"],
                "max_age_hours": 24,
                "max_count": 5,
                "auto_delete": true
            },
            {
                "name": "reports",
                "patterns": ["report_*.json"],
                "max_age_days": 7
            }
        ],
        "directories": { "mockups": "generated_mockups" },
        "compression": { "enabled": true, "compress_after_days": 0 }
    }))
}

fn tracked(name: &str, category: Category, bytes: u64, age_hours: i64) -> TrackedFile {
    TrackedFile {
        path: PathBuf::from("/cache").join(name),
        file_name: name.to_string(),
        category,
        bytes,
        modified: now() - Duration::hours(age_hours),
    }
}

fn mockup(name: &str, bytes: u64, age_hours: i64) -> TrackedFile {
    tracked(name, Category::Named("mockups".into()), bytes, age_hours)
}

fn planned_names(plan: &CleanupPlan) -> Vec<&str> {
    plan.actions
        .iter()
        .map(|a| match a {
            RetentionAction::Delete { file, .. } | RetentionAction::Archive { file, .. } => {
                file.file_name.as_str()
            }
        })
        .collect()
}

#[test]
fn age_rule_expires_only_files_past_the_limit() {
    let manager = RetentionManager::new(mockup_policy_config(), "/cache");
    let inventory = vec![
        mockup("old_tshirts_a.png", 100, 25),
        mockup("fresh_tshirts_b.png", 100, 23),
    ];
    let plan = manager.plan_cleanup(&inventory, now());
    assert_eq!(planned_names(&plan), vec!["old_tshirts_a.png"]);
    assert!(matches!(
        plan.actions[0],
        RetentionAction::Delete {
            reason: ActionReason::AgeExceeded,
            ..
        }
    ));
}

#[test]
fn count_rule_keeps_the_newest_files() {
    let manager = RetentionManager::new(mockup_policy_config(), "/cache");
    // Ten files aged 1..=10 hours; cap is 5, so the five oldest go.
    let inventory: Vec<TrackedFile> = (1..=10)
        .map(|i| mockup(&format!("m{i}_tshirts_x.png"), 10, i))
        .collect();
    let plan = manager.plan_cleanup(&inventory, now());
    let mut names = planned_names(&plan);
    names.sort();
    assert_eq!(
        names,
        vec![
            "m10_tshirts_x.png",
            "m6_tshirts_x.png",
            "m7_tshirts_x.png",
            "m8_tshirts_x.png",
            "m9_tshirts_x.png"
        ]
    );
    for action in &plan.actions {
        assert!(matches!(
            action,
            RetentionAction::Delete {
                reason: ActionReason::CountExceeded,
                ..
            }
        ));
    }
}

#[test]
fn age_expired_files_do_not_consume_count_slots() {
    let manager = RetentionManager::new(mockup_policy_config(), "/cache");
    let mut inventory: Vec<TrackedFile> = (1..=5)
        .map(|i| mockup(&format!("fresh{i}_tshirts_x.png"), 10, i))
        .collect();
    inventory.push(mockup("ancient_tshirts_x.png", 10, 48));
    let plan = manager.plan_cleanup(&inventory, now());
    // The ancient file expires by age; the five fresh ones all fit the cap.
    assert_eq!(planned_names(&plan), vec!["ancient_tshirts_x.png"]);
}

#[test]
fn non_auto_delete_categories_archive_when_compression_is_on() {
    let manager = RetentionManager::new(mockup_policy_config(), "/cache");
    let inventory = vec![tracked(
        "report_old.json",
        Category::Named("reports".into()),
        50,
        8 * 24,
    )];
    let plan = manager.plan_cleanup(&inventory, now());
    assert!(matches!(
        plan.actions[0],
        RetentionAction::Archive {
            reason: ActionReason::AgeExceeded,
            ..
        }
    ));
}

#[test]
fn non_auto_delete_without_compression_is_skipped() {
    let mut cfg = mockup_policy_config();
    cfg.compression.enabled = false;
    let manager = RetentionManager::new(cfg, "/cache");
    let inventory = vec![tracked(
        "report_old.json",
        Category::Named("reports".into()),
        50,
        8 * 24,
    )];
    let plan = manager.plan_cleanup(&inventory, now());
    assert!(plan.actions.is_empty());
    assert_eq!(plan.skipped, 1);
}

#[test]
fn uncategorized_files_are_exempt() {
    let manager = RetentionManager::new(mockup_policy_config(), "/cache");
    let inventory = vec![tracked("notes.txt", Category::Uncategorized, 50, 999)];
    let plan = manager.plan_cleanup(&inventory, now());
    assert!(plan.actions.is_empty());
    assert_eq!(plan.skipped, 0);
}

#[test]
fn forced_cleanup_deletes_oldest_auto_delete_files_first() {
    let cfg = config(json!({
        "cache_settings": { "max_total_size_mb": 100 },
        "file_categories": [
            { "name": "mockups", "patterns": ["*.png"], "auto_delete": true },
            { "name": "reports", "patterns": ["*.json"] }
        ],
        "cleanup_schedule": { "force_cleanup_size_mb": 2 }
    }));
    let manager = RetentionManager::new(cfg, "/cache");
    const MB: u64 = 1024 * 1024;
    let inventory = vec![
        tracked("a.png", Category::Named("mockups".into()), MB, 10),
        tracked("b.png", Category::Named("mockups".into()), MB, 5),
        tracked("c.png", Category::Named("mockups".into()), MB, 1),
        tracked("r.json", Category::Named("reports".into()), MB, 99),
    ];
    let plan = manager.plan_cleanup(&inventory, now());
    // 4 MB total, threshold 2 MB: drop the two oldest pngs, leave the report.
    assert_eq!(planned_names(&plan), vec!["a.png", "b.png"]);
    for action in &plan.actions {
        assert!(matches!(
            action,
            RetentionAction::Delete {
                reason: ActionReason::ForcedCleanup,
                ..
            }
        ));
    }
}

#[test]
fn overflow_past_the_hard_cap_raises_an_alert() {
    let cfg = config(json!({
        "cache_settings": { "max_total_size_mb": 1 },
        "file_categories": [
            { "name": "reports", "patterns": ["*.json"] }
        ]
    }));
    let manager = RetentionManager::new(cfg, "/cache");
    let inventory = vec![tracked(
        "r.json",
        Category::Named("reports".into()),
        3 * 1024 * 1024,
        1,
    )];
    let plan = manager.plan_cleanup(&inventory, now());
    assert!(plan.alerts.iter().any(|a| a.contains("cache overflow")));
}

#[test]
fn monitoring_thresholds_raise_alerts() {
    let cfg = config(json!({
        "cache_settings": { "max_total_size_mb": 1000 },
        "monitoring": { "alert_size_threshold_mb": 1, "alert_file_count_threshold": 1 }
    }));
    let manager = RetentionManager::new(cfg, "/cache");
    let inventory = vec![
        tracked("a.bin", Category::Uncategorized, 2 * 1024 * 1024, 1),
        tracked("b.bin", Category::Uncategorized, 1, 1),
    ];
    let plan = manager.plan_cleanup(&inventory, now());
    assert!(plan.alerts.iter().any(|a| a.contains("alert threshold")));
    assert!(plan.alerts.iter().any(|a| a.contains("files")));
}

#[test]
fn empty_inventory_plans_nothing() {
    let manager = RetentionManager::new(mockup_policy_config(), "/cache");
    let plan = manager.plan_cleanup(&[], now());
    assert!(plan.actions.is_empty());
    assert!(plan.alerts.is_empty());
    assert_eq!(plan.skipped, 0);
}

#[test]
fn cleanup_due_when_never_ran_or_interval_elapsed() {
    let cfg = config(json!({
        "cleanup_schedule": { "frequency": "daily", "force_cleanup_size_mb": 10 }
    }));
    let manager = RetentionManager::new(cfg, "/cache");

    let mut state = CacheState::default();
    assert!(manager.is_cleanup_due(&state, now()));

    state.last_cleanup = Some(now() - Duration::hours(23));
    assert!(!manager.is_cleanup_due(&state, now()));

    state.last_cleanup = Some(now() - Duration::hours(25));
    assert!(manager.is_cleanup_due(&state, now()));

    // Size pressure overrides the schedule.
    state.last_cleanup = Some(now());
    state.total_bytes = 11 * 1024 * 1024;
    assert!(manager.is_cleanup_due(&state, now()));
}

#[test]
fn disabled_schedule_only_yields_to_size_pressure() {
    let cfg = config(json!({
        "cleanup_schedule": { "enabled": false, "force_cleanup_size_mb": 10 }
    }));
    let manager = RetentionManager::new(cfg, "/cache");

    let mut state = CacheState::default();
    assert!(!manager.is_cleanup_due(&state, now()));

    state.total_bytes = 11 * 1024 * 1024;
    assert!(manager.is_cleanup_due(&state, now()));
}

#[test]
fn time_of_day_gates_the_scheduled_run() {
    let cfg = config(json!({
        "cleanup_schedule": { "frequency": "daily", "time_of_day": "15:00:00" }
    }));
    let manager = RetentionManager::new(cfg, "/cache");
    let state = CacheState::default();

    // `now()` is 12:00 UTC, before the 15:00 gate.
    assert!(!manager.is_cleanup_due(&state, now()));
    assert!(manager.is_cleanup_due(&state, now() + Duration::hours(4)));
}

#[test]
fn global_age_limit_covers_uncategorized_and_unaged_categories() {
    let cfg = config(json!({
        "cache_settings": { "max_total_size_mb": 100, "max_age_days": 7 },
        "file_categories": [
            { "name": "mockups", "patterns": ["*.png"], "auto_delete": true }
        ],
        "compression": { "enabled": true, "compress_after_days": 0 }
    }));
    let manager = RetentionManager::new(cfg, "/cache");
    let inventory = vec![
        tracked("old.png", Category::Named("mockups".into()), 10, 8 * 24),
        tracked("fresh.png", Category::Named("mockups".into()), 10, 24),
        tracked("old_note.txt", Category::Uncategorized, 10, 8 * 24),
    ];
    let plan = manager.plan_cleanup(&inventory, now());
    let names = planned_names(&plan);
    assert!(names.contains(&"old.png"));
    assert!(names.contains(&"old_note.txt"));
    assert!(!names.contains(&"fresh.png"));

    // Uncategorized expirations archive rather than delete.
    let uncategorized = plan
        .actions
        .iter()
        .find(|a| match a {
            RetentionAction::Delete { file, .. } | RetentionAction::Archive { file, .. } => {
                file.file_name == "old_note.txt"
            }
        })
        .unwrap();
    assert!(matches!(uncategorized, RetentionAction::Archive { .. }));
}

#[test]
fn category_size_cap_expires_oldest_past_the_limit() {
    const MB: u64 = 1024 * 1024;
    let cfg = config(json!({
        "file_categories": [{
            "name": "mockups",
            "patterns": ["*.png"],
            "size_limit_mb": 2,
            "auto_delete": true
        }]
    }));
    let manager = RetentionManager::new(cfg, "/cache");
    let inventory = vec![
        mockup("new.png", MB, 1),
        mockup("mid.png", MB, 2),
        mockup("old.png", MB, 3),
    ];
    let plan = manager.plan_cleanup(&inventory, now());
    assert_eq!(planned_names(&plan), vec!["old.png"]);
    assert!(matches!(
        plan.actions[0],
        RetentionAction::Delete {
            reason: ActionReason::SizeExceeded,
            ..
        }
    ));
}

#[test]
fn cache_stats_summarize_state() {
    let manager = RetentionManager::new(mockup_policy_config(), "/cache");
    let mut state = CacheState::default();
    state.record_generated("mockups", 2 * 1024 * 1024);
    state.record_generated("reports", 1024);

    let stats = manager.cache_stats(&state);
    assert_eq!(stats.total_files, 2);
    assert_eq!(stats.total_bytes, 2 * 1024 * 1024 + 1024);
    assert!(stats.total_mb > 2.0 && stats.total_mb < 2.1);
    assert_eq!(stats.categories["mockups"], (1, 2 * 1024 * 1024));
}
