use super::*;

use chrono::TimeZone;

#[test]
fn missing_state_file_loads_as_default() {
    let dir = tempfile::tempdir().unwrap();
    let state = CacheState::load(&dir.path().join("cache_state.json")).unwrap();
    assert_eq!(state.total_bytes, 0);
    assert!(state.categories.is_empty());
    assert!(state.last_cleanup.is_none());
}

#[test]
fn persist_then_load_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cache_state.json");

    let mut state = CacheState::default();
    state.record_generated("mockups", 1000);
    state.record_generated("mockups", 500);
    state.record_generated("reports", 200);
    state.last_cleanup = Some(Utc.with_ymd_and_hms(2026, 8, 30, 12, 0, 0).unwrap());
    state.persist(&path).unwrap();

    let loaded = CacheState::load(&path).unwrap();
    assert_eq!(loaded.total_bytes, 1700);
    assert_eq!(loaded.categories["mockups"], CategoryStats { files: 2, bytes: 1500 });
    assert_eq!(loaded.categories["reports"], CategoryStats { files: 1, bytes: 200 });
    assert_eq!(loaded.last_cleanup, state.last_cleanup);
    // No temp file left behind.
    assert!(!dir.path().join("cache_state.json.tmp").exists());
}

#[test]
fn corrupt_state_is_a_retention_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cache_state.json");
    std::fs::write(&path, "{ not json").unwrap();
    let err = CacheState::load(&path).unwrap_err();
    assert!(matches!(err, MocksmithError::Retention(_)));
}

#[test]
fn removal_saturates_rather_than_underflows() {
    let mut state = CacheState::default();
    state.record_generated("mockups", 100);
    state.record_removed("mockups", 500);
    state.record_removed("unknown", 50);
    assert_eq!(state.total_bytes, 0);
    assert_eq!(state.categories["mockups"].files, 0);
    assert_eq!(state.categories["mockups"].bytes, 0);
}

#[test]
fn rebuild_replaces_counters_and_keeps_last_cleanup() {
    let mut state = CacheState::default();
    state.record_generated("stale", 9999);
    let stamp = Utc.with_ymd_and_hms(2026, 8, 1, 0, 0, 0).unwrap();
    state.last_cleanup = Some(stamp);

    state.rebuild_from([("mockups", 300u64), ("mockups", 200u64), ("reports", 50u64)]);
    assert_eq!(state.total_bytes, 550);
    assert!(!state.categories.contains_key("stale"));
    assert_eq!(state.categories["mockups"].files, 2);
    assert_eq!(state.total_files(), 3);
    assert_eq!(state.last_cleanup, Some(stamp));
}
