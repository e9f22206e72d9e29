//! Common test utilities for store integration tests.

use chrono::{DateTime, Duration, TimeZone, Utc};
use tempfile::TempDir;
use tracker_core::ConversationStore;

/// Open a fresh on-disk store inside a temporary directory.
pub fn open_store() -> (ConversationStore, TempDir) {
    let temp_dir = TempDir::new().unwrap_or_else(|e| panic!("Failed to create temp dir: {}", e));
    let db_path = temp_dir.path().join("data").join("history.db");
    let store = ConversationStore::open(&db_path)
        .unwrap_or_else(|e| panic!("Failed to open store at {}: {}", db_path.display(), e));
    (store, temp_dir)
}

/// A fixed base time so ordering tests do not depend on the clock.
pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 2, 14, 9, 30, 0).unwrap()
}

/// `n` minutes after [`base_time`].
pub fn minutes_after_base(n: i64) -> DateTime<Utc> {
    base_time() + Duration::minutes(n)
}
