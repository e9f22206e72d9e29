//! SQLite persistence for conversation history.

use crate::path::normalize_project_path;
use crate::timestamp::{format_timestamp, parse_timestamp};
use crate::{Result, TrackerError};
use chrono::{DateTime, Utc};
use rusqlite::types::{Value, ValueRef};
use rusqlite::{Connection, OptionalExtension, params, params_from_iter};
use std::path::{Path, PathBuf};
use tracker_types::{Conversation, ConversationStatus, QueryOptions};

/// Orders by the instant a start time denotes, whatever layout it was stored
/// in. The text comparison separates rows inside one millisecond.
const NEWEST_FIRST: &str = "julianday(started_at) DESC, started_at DESC, id DESC";

const SELECT_COLUMNS: &str = "SELECT id, project_path, session_id, started_at, ended_at, \
     user_prompt, assistant_reply, transcript_path FROM conversations";

/// Default location of the history database: `~/.config/agent-tracker/data/history.db`.
pub fn default_db_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("agent-tracker")
        .join("data")
        .join("history.db")
}

/// SQLite-based conversation store.
///
/// Owns a single connection. Cross-process writers are serialized by SQLite's
/// own locking; nothing here adds to it.
pub struct ConversationStore {
    conn: Connection,
}

impl ConversationStore {
    /// Open or create the database at the given path.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            create_data_dir(parent)
                .map_err(|e| TrackerError::unavailable("create data directory", e))?;
        }

        let conn = Connection::open(path)
            .map_err(|e| TrackerError::unavailable("open database", e))?;
        let store = Self { conn };
        store.init_schema()?;
        tracing::debug!(
            target: "tracker::db",
            "Opened conversation store at {}",
            path.display()
        );
        Ok(store)
    }

    /// Open a private in-memory store.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| TrackerError::unavailable("open database", e))?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    /// Close the connection, surfacing any error SQLite reports while doing so.
    pub fn close(self) -> Result<()> {
        self.conn
            .close()
            .map_err(|(_, e)| TrackerError::unavailable("close database", e))
    }

    /// Create the table and indexes if they do not exist yet.
    fn init_schema(&self) -> Result<()> {
        self.conn
            .execute_batch(
                r#"
                CREATE TABLE IF NOT EXISTS conversations (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    project_path TEXT NOT NULL,
                    session_id TEXT,
                    started_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                    ended_at DATETIME,
                    user_prompt TEXT,
                    assistant_reply TEXT,
                    transcript_path TEXT
                );

                CREATE INDEX IF NOT EXISTS idx_project_path ON conversations(project_path);
                CREATE INDEX IF NOT EXISTS idx_started_at ON conversations(started_at);
                "#,
            )
            .map_err(|e| TrackerError::unavailable("create schema", e))?;
        Ok(())
    }

    /// Record a new open conversation started now. Returns its id.
    pub fn create_conversation(
        &self,
        project_path: &str,
        session_id: &str,
        user_prompt: &str,
    ) -> Result<i64> {
        self.create_conversation_at(project_path, session_id, user_prompt, Utc::now())
    }

    /// Record a new open conversation with a known start time.
    pub fn create_conversation_at(
        &self,
        project_path: &str,
        session_id: &str,
        user_prompt: &str,
        started_at: DateTime<Utc>,
    ) -> Result<i64> {
        let project_path = normalize_project_path(project_path);
        self.conn
            .execute(
                r#"
                INSERT INTO conversations (project_path, session_id, user_prompt, started_at)
                VALUES (?1, ?2, ?3, ?4)
                "#,
                params![
                    project_path,
                    session_id,
                    user_prompt,
                    format_timestamp(&started_at)
                ],
            )
            .map_err(|e| TrackerError::write("insert conversation", e))?;

        let id = self.conn.last_insert_rowid();
        tracing::debug!(
            target: "tracker::db",
            "Created conversation {} for {}",
            id,
            project_path
        );
        Ok(id)
    }

    /// Complete the most recently started conversation for a project.
    ///
    /// Targets the latest record whether or not it was already completed.
    /// Returns the number of rows changed; zero means the project has no
    /// records and is not an error.
    pub fn update_conversation(
        &self,
        project_path: &str,
        assistant_reply: &str,
        transcript_path: &str,
    ) -> Result<usize> {
        let project_path = normalize_project_path(project_path);
        let sql = format!(
            "UPDATE conversations \
             SET assistant_reply = ?1, transcript_path = ?2, ended_at = ?3 \
             WHERE id = (\
                 SELECT id FROM conversations WHERE project_path = ?4 \
                 ORDER BY {NEWEST_FIRST} LIMIT 1\
             )"
        );
        let changed = self
            .conn
            .execute(
                &sql,
                params![
                    assistant_reply,
                    transcript_path,
                    format_timestamp(&Utc::now()),
                    project_path
                ],
            )
            .map_err(|e| TrackerError::write("update conversation", e))?;

        if changed == 0 {
            tracing::debug!(
                target: "tracker::db",
                "No conversation to complete for {}",
                project_path
            );
        } else {
            tracing::debug!(
                target: "tracker::db",
                "Completed latest conversation for {}",
                project_path
            );
        }
        Ok(changed)
    }

    /// List conversations for a project, most recent first.
    pub fn query_conversations(&self, opts: &QueryOptions) -> Result<Vec<Conversation>> {
        let project_path = normalize_project_path(&opts.project_path);

        let mut sql = format!("{SELECT_COLUMNS} WHERE project_path = ?");
        let mut args: Vec<Value> = vec![Value::Text(project_path)];

        if let Some(search) = opts.search_term() {
            sql.push_str(
                r" AND (user_prompt LIKE ? ESCAPE '\' OR assistant_reply LIKE ? ESCAPE '\')",
            );
            let pattern = format!("%{}%", escape_like(search));
            args.push(Value::Text(pattern.clone()));
            args.push(Value::Text(pattern));
        }

        sql.push_str(&format!(" ORDER BY {NEWEST_FIRST} LIMIT ? OFFSET ?"));
        args.push(Value::Integer(opts.effective_limit()));
        args.push(Value::Integer(opts.effective_offset()));

        let mut stmt = self
            .conn
            .prepare(&sql)
            .map_err(|e| TrackerError::read("query conversations", e))?;
        let conversations = stmt
            .query_map(params_from_iter(args), row_to_conversation)
            .map_err(|e| TrackerError::read("query conversations", e))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| TrackerError::read("scan conversation", e))?;
        Ok(conversations)
    }

    /// Get a single conversation by id.
    pub fn get_conversation(&self, id: i64) -> Result<Option<Conversation>> {
        self.conn
            .query_row(
                &format!("{SELECT_COLUMNS} WHERE id = ?1"),
                params![id],
                row_to_conversation,
            )
            .optional()
            .map_err(|e| TrackerError::read("get conversation", e))
    }

    /// Number of conversations recorded for a project.
    pub fn count_conversations(&self, project_path: &str) -> Result<u64> {
        let project_path = normalize_project_path(project_path);
        let count: i64 = self
            .conn
            .query_row(
                "SELECT COUNT(*) FROM conversations WHERE project_path = ?1",
                params![project_path],
                |row| row.get(0),
            )
            .map_err(|e| TrackerError::read("count conversations", e))?;
        Ok(count as u64)
    }

    /// Session id of the most recently started conversation that has one.
    ///
    /// Returns an empty string when no record for the project carries a
    /// non-empty session id.
    pub fn get_latest_session_id(&self, project_path: &str) -> Result<String> {
        let project_path = normalize_project_path(project_path);
        let sql = format!(
            "SELECT session_id FROM conversations \
             WHERE project_path = ?1 AND session_id IS NOT NULL AND session_id != '' \
             ORDER BY {NEWEST_FIRST} LIMIT 1"
        );
        let session_id: Option<String> = self
            .conn
            .query_row(&sql, params![project_path], |row| row.get(0))
            .optional()
            .map_err(|e| TrackerError::read("get latest session", e))?;
        Ok(session_id.unwrap_or_default())
    }
}

#[cfg(unix)]
fn create_data_dir(dir: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::DirBuilderExt;

    std::fs::DirBuilder::new().recursive(true).mode(0o755).create(dir)
}

#[cfg(not(unix))]
fn create_data_dir(dir: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(dir)
}

/// Escape LIKE wildcards so the needle matches literally.
fn escape_like(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len());
    for c in needle.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn row_to_conversation(row: &rusqlite::Row) -> rusqlite::Result<Conversation> {
    let id: i64 = row.get("id")?;
    let project_path: String = row.get("project_path")?;
    let session_id: Option<String> = row.get("session_id")?;
    let user_prompt: Option<String> = row.get("user_prompt")?;
    let assistant_reply: Option<String> = row.get("assistant_reply")?;
    let transcript_path: Option<String> = row.get("transcript_path")?;

    let started_at = timestamp_column(row, id, "started_at")?.unwrap_or_default();
    let ended_at = timestamp_column(row, id, "ended_at")?;
    // An unreadable end time still means the conversation was completed.
    let end_recorded = !matches!(row.get_ref("ended_at")?, ValueRef::Null);

    Ok(Conversation {
        id,
        project_path,
        session_id,
        started_at,
        status: ConversationStatus::from_end_recorded(end_recorded),
        ended_at,
        user_prompt,
        assistant_reply,
        transcript_path,
    })
}

/// Read a timestamp column, leaving it unset when the stored value is not a
/// recognizable timestamp.
fn timestamp_column(
    row: &rusqlite::Row,
    id: i64,
    column: &str,
) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let parsed = match row.get_ref(column)? {
        ValueRef::Null => return Ok(None),
        ValueRef::Text(bytes) => std::str::from_utf8(bytes).ok().and_then(parse_timestamp),
        _ => None,
    };
    if parsed.is_none() {
        tracing::warn!(
            target: "tracker::db",
            "Conversation {} has unreadable {} value; leaving it unset",
            id,
            column
        );
    }
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use tempfile::TempDir;

    fn create_test_store() -> (ConversationStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("data").join("history.db");
        let store = ConversationStore::open(&db_path).unwrap();
        (store, temp_dir)
    }

    fn insert_raw(
        store: &ConversationStore,
        project: &str,
        started_at: &str,
        ended_at: Option<&str>,
    ) -> i64 {
        store
            .conn
            .execute(
                r#"
                INSERT INTO conversations
                    (project_path, session_id, started_at, ended_at, user_prompt)
                VALUES (?1, 's', ?2, ?3, 'p')
                "#,
                params![project, started_at, ended_at],
            )
            .unwrap();
        store.conn.last_insert_rowid()
    }

    #[test]
    fn test_open_creates_parent_directory() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("a").join("b").join("history.db");
        let store = ConversationStore::open(&db_path).unwrap();
        assert!(db_path.parent().unwrap().is_dir());
        store.close().unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn test_data_directory_mode() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("data");
        ConversationStore::open(&dir.join("history.db")).unwrap();
        let mode = std::fs::metadata(&dir).unwrap().permissions().mode() & 0o777;
        // The process umask can only clear bits.
        assert_eq!(mode & !0o755, 0);
        assert_ne!(mode & 0o700, 0);
    }

    #[test]
    fn test_open_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("history.db");

        let store = ConversationStore::open(&db_path).unwrap();
        let id = store.create_conversation("/p", "s1", "hello").unwrap();
        store.close().unwrap();

        let store = ConversationStore::open(&db_path).unwrap();
        assert!(store.get_conversation(id).unwrap().is_some());

        let indexes: i64 = store
            .conn
            .query_row(
                r#"
                SELECT COUNT(*) FROM sqlite_master
                WHERE type = 'index' AND tbl_name = 'conversations' AND name LIKE 'idx_%'
                "#,
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(indexes, 2);
    }

    #[test]
    fn test_open_fails_when_parent_is_a_file() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join("blocker");
        std::fs::write(&blocker, b"not a directory").unwrap();

        let result = ConversationStore::open(&blocker.join("history.db"));
        assert!(matches!(result, Err(TrackerError::StorageUnavailable { .. })));
    }

    #[test]
    fn test_create_stores_empty_strings_as_given() {
        let (store, _dir) = create_test_store();
        let id = store.create_conversation("/p", "", "").unwrap();
        let loaded = store.get_conversation(id).unwrap().unwrap();
        assert_eq!(loaded.session_id.as_deref(), Some(""));
        assert_eq!(loaded.user_prompt.as_deref(), Some(""));
        assert_eq!(loaded.assistant_reply, None);
        assert_eq!(loaded.status, ConversationStatus::Open);
    }

    #[test]
    fn test_update_with_empty_reply_is_completed() {
        let (store, _dir) = create_test_store();
        let id = store.create_conversation("/p", "s", "prompt").unwrap();
        store.update_conversation("/p", "", "").unwrap();

        let loaded = store.get_conversation(id).unwrap().unwrap();
        assert_eq!(loaded.assistant_reply.as_deref(), Some(""));
        assert_eq!(loaded.transcript_path.as_deref(), Some(""));
        assert_eq!(loaded.status, ConversationStatus::Completed);
        assert!(loaded.ended_at.is_some());
    }

    #[test]
    fn test_update_rewrites_completed_record() {
        let (store, _dir) = create_test_store();
        let id = store.create_conversation("/p", "s", "prompt").unwrap();
        store.update_conversation("/p", "first", "/t/1.md").unwrap();
        store.update_conversation("/p", "second", "/t/2.md").unwrap();

        let loaded = store.get_conversation(id).unwrap().unwrap();
        assert_eq!(loaded.assistant_reply.as_deref(), Some("second"));
        assert_eq!(loaded.transcript_path.as_deref(), Some("/t/2.md"));
    }

    #[test]
    fn test_equal_start_times_break_ties_by_id() {
        let (store, _dir) = create_test_store();
        let at = Utc.with_ymd_and_hms(2025, 5, 5, 5, 5, 5).unwrap();
        let first = store.create_conversation_at("/p", "a", "one", at).unwrap();
        let second = store.create_conversation_at("/p", "b", "two", at).unwrap();

        store.update_conversation("/p", "reply", "").unwrap();
        assert!(store.get_conversation(first).unwrap().unwrap().assistant_reply.is_none());
        assert!(store.get_conversation(second).unwrap().unwrap().is_completed());
        assert_eq!(store.get_latest_session_id("/p").unwrap(), "b");
    }

    #[test]
    fn test_decodes_legacy_timestamp_layouts() {
        let (store, _dir) = create_test_store();
        let sqlite_id =
            insert_raw(&store, "/p", "2024-01-01 10:00:00", Some("2024-01-01 10:05:00"));
        let rfc_id = insert_raw(&store, "/p", "2024-01-02T10:00:00Z", None);

        let sqlite_row = store.get_conversation(sqlite_id).unwrap().unwrap();
        assert_eq!(sqlite_row.started_at, Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap());
        assert_eq!(sqlite_row.duration(), Some(Duration::minutes(5)));

        let rfc_row = store.get_conversation(rfc_id).unwrap().unwrap();
        assert_eq!(rfc_row.started_at, Utc.with_ymd_and_hms(2024, 1, 2, 10, 0, 0).unwrap());
        assert_eq!(rfc_row.status, ConversationStatus::Open);
    }

    #[test]
    fn test_unreadable_timestamp_degrades_without_error() {
        let (store, _dir) = create_test_store();
        insert_raw(&store, "/p", "not a time", Some("also not a time"));
        store.create_conversation("/p", "s", "fine").unwrap();

        let rows = store.query_conversations(&QueryOptions::for_project("/p")).unwrap();
        assert_eq!(rows.len(), 2);

        let broken = rows.iter().find(|c| c.user_prompt.as_deref() == Some("p")).unwrap();
        assert_eq!(broken.started_at, DateTime::<Utc>::default());
        assert_eq!(broken.ended_at, None);
    }

    #[test]
    fn test_unreadable_end_time_still_completed() {
        let (store, _dir) = create_test_store();
        let id = insert_raw(&store, "/p", "2024-01-01 10:00:00", Some("garbage"));
        store
            .conn
            .execute(
                "UPDATE conversations SET assistant_reply = 'done' WHERE id = ?1",
                params![id],
            )
            .unwrap();

        let loaded = store.get_conversation(id).unwrap().unwrap();
        assert_eq!(loaded.status, ConversationStatus::Completed);
        assert_eq!(loaded.ended_at, None);
        assert_eq!(loaded.assistant_reply.as_deref(), Some("done"));
    }

    #[test]
    fn test_mixed_timestamp_layouts_order_by_instant() {
        let (store, _dir) = create_test_store();
        store
            .conn
            .execute(
                r#"
                INSERT INTO conversations (project_path, session_id, started_at, user_prompt)
                VALUES ('/p', 'legacy', '2024-01-01T08:00:00Z', 'old'),
                       ('/p', 'offset', '2024-01-01T20:00:00+05:00', 'middle')
                "#,
                [],
            )
            .unwrap();
        let newer_at = Utc.with_ymd_and_hms(2024, 1, 1, 18, 0, 0).unwrap();
        let newer = store.create_conversation_at("/p", "newer", "new", newer_at).unwrap();

        let rows = store.query_conversations(&QueryOptions::for_project("/p")).unwrap();
        let sessions: Vec<_> = rows.iter().map(|c| c.session_id.as_deref()).collect();
        assert_eq!(sessions, vec![Some("newer"), Some("offset"), Some("legacy")]);
        assert_eq!(store.get_latest_session_id("/p").unwrap(), "newer");

        assert_eq!(store.update_conversation("/p", "reply", "").unwrap(), 1);
        assert!(store.get_conversation(newer).unwrap().unwrap().is_completed());
        let rows = store.query_conversations(&QueryOptions::for_project("/p")).unwrap();
        assert_eq!(rows.iter().filter(|c| c.is_completed()).count(), 1);
    }

    #[test]
    fn test_default_started_at_when_omitted() {
        let (store, _dir) = create_test_store();
        store
            .conn
            .execute("INSERT INTO conversations (project_path) VALUES ('/p')", [])
            .unwrap();

        let rows = store.query_conversations(&QueryOptions::for_project("/p")).unwrap();
        assert_eq!(rows.len(), 1);
        assert!(Utc::now() - rows[0].started_at < Duration::minutes(5));
        assert_eq!(rows[0].session_id, None);
        assert_eq!(rows[0].user_prompt, None);
    }

    #[test]
    fn test_search_treats_wildcards_literally() {
        let (store, _dir) = create_test_store();
        store.create_conversation("/p", "", "100% done").unwrap();
        store.create_conversation("/p", "", "100 percent").unwrap();
        store.create_conversation("/p", "", "snake_case").unwrap();
        store.create_conversation("/p", "", "snakeXcase").unwrap();

        let rows = store
            .query_conversations(&QueryOptions::for_project("/p").with_search("0%"))
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].user_prompt.as_deref(), Some("100% done"));

        let rows = store
            .query_conversations(&QueryOptions::for_project("/p").with_search("e_c"))
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].user_prompt.as_deref(), Some("snake_case"));
    }

    #[test]
    fn test_count_conversations() {
        let (store, _dir) = create_test_store();
        assert_eq!(store.count_conversations("/p").unwrap(), 0);
        store.create_conversation("/p", "", "a").unwrap();
        store.create_conversation("/p/", "", "b").unwrap();
        store.create_conversation("/q", "", "c").unwrap();
        assert_eq!(store.count_conversations("/p").unwrap(), 2);
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("plain"), "plain");
        assert_eq!(escape_like(r"a%b_c\d"), r"a\%b\_c\\d");
    }
}
