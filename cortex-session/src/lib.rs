//! # cortex-session
//!
//! Checkpoint-based session persistence: save a snapshot of progress on a
//! project, and recover a markdown briefing from the latest one in a later
//! conversation. Grounded on the reference implementation's session
//! manager, rewritten against `cortex-storage`'s connection pool instead of
//! loose `sqlite3.connect()` calls.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};
use sha2::{Digest, Sha256};

use cortex_core::errors::CortexResult;
use cortex_core::session::{Checkpoint, Session, SessionStatus};
use cortex_storage::ConnectionPool;

/// Monotonic per-process counter mixed into generated session ids so two
/// ids minted in the same second never collide, without reaching for a
/// random-number crate the rest of the workspace doesn't otherwise need.
static SESSION_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

fn generate_session_id() -> String {
    let now = Utc::now();
    let counter = SESSION_ID_COUNTER.fetch_add(1, Ordering::Relaxed);
    let mut hasher = Sha256::new();
    hasher.update(now.timestamp_nanos_opt().unwrap_or_default().to_le_bytes());
    hasher.update(std::process::id().to_le_bytes());
    hasher.update(counter.to_le_bytes());
    let digest = hasher.finalize();
    let suffix = digest.iter().take(3).map(|b| format!("{b:02x}")).collect::<String>();
    format!("session_{}_{}", now.format("%Y%m%d_%H%M%S"), suffix)
}

fn parse_dt(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).map(|dt| dt.with_timezone(&Utc)).unwrap_or_else(|_| Utc::now())
}

/// Column order matches `CREATE TABLE sessions` in the v1 migration:
/// id, project, status, started_at, ended_at, checkpoint_count, summary.
fn row_to_session(row: &Row<'_>) -> rusqlite::Result<Session> {
    let status: String = row.get(2)?;
    let started_at: String = row.get(3)?;
    let ended_at: Option<String> = row.get(4)?;
    Ok(Session {
        id: row.get(0)?,
        project: row.get(1)?,
        status: SessionStatus::parse(&status).unwrap_or(SessionStatus::Active),
        started_at: parse_dt(&started_at),
        ended_at: ended_at.as_deref().map(parse_dt),
        checkpoint_count: row.get(5)?,
        summary: row.get(6)?,
    })
}

/// Column order matches `CREATE TABLE checkpoints`: id, session_id,
/// checkpoint_num, summary, key_facts, open_tasks, files_modified,
/// created_at.
fn row_to_checkpoint(row: &Row<'_>) -> rusqlite::Result<Checkpoint> {
    let key_facts: String = row.get(4)?;
    let open_tasks: String = row.get(5)?;
    let files_modified: String = row.get(6)?;
    let created_at: String = row.get(7)?;
    Ok(Checkpoint {
        id: row.get(0)?,
        session_id: row.get(1)?,
        checkpoint_num: row.get(2)?,
        summary: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
        key_facts: serde_json::from_str(&key_facts).unwrap_or_default(),
        open_tasks: serde_json::from_str(&open_tasks).unwrap_or_default(),
        files_modified: serde_json::from_str(&files_modified).unwrap_or_default(),
        created_at: parse_dt(&created_at),
    })
}

/// Info returned by [`SessionStore::save_checkpoint`].
#[derive(Debug, Clone)]
pub struct CheckpointInfo {
    pub session_id: String,
    pub checkpoint_num: i64,
    pub summary: String,
    pub project: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Checkpoint persistence for one tenant's sessions, sharing a
/// [`ConnectionPool`] with `cortex-storage` and `cortex-links`.
pub struct SessionStore {
    pool: Arc<ConnectionPool>,
}

impl SessionStore {
    pub fn new(pool: Arc<ConnectionPool>) -> Self {
        Self { pool }
    }

    /// Find the most recent active session for `project` (or with no
    /// project at all when `project` is `None`), or start a new one.
    fn get_or_create_session(&self, project: Option<&str>) -> CortexResult<String> {
        let existing = self.pool.with_reader(|conn| {
            conn.query_row(
                "SELECT id FROM sessions
                 WHERE status = 'active' AND (project = ?1 OR project IS NULL)
                 ORDER BY started_at DESC LIMIT 1",
                params![project],
                |row| row.get::<_, String>(0),
            )
            .optional()
            .map_err(|e| cortex_storage::to_storage_err(e.to_string()))
        })?;

        if let Some(id) = existing {
            return Ok(id);
        }

        let session_id = generate_session_id();
        let now = Utc::now().to_rfc3339();
        self.pool.with_writer(|conn| {
            conn.execute(
                "INSERT INTO sessions (id, project, status, started_at, checkpoint_count) VALUES (?1, ?2, 'active', ?3, 0)",
                params![session_id, project, now],
            )
            .map_err(|e| cortex_storage::to_storage_err(e.to_string()))?;
            Ok(())
        })?;
        Ok(session_id)
    }

    /// Save a checkpoint, creating or reusing the active session for
    /// `project` as needed. `checkpoint_num` increments per session.
    #[allow(clippy::too_many_arguments)]
    pub fn save_checkpoint(
        &self,
        project: Option<&str>,
        summary: &str,
        key_facts: Vec<String>,
        open_tasks: Vec<String>,
        files_modified: Vec<String>,
    ) -> CortexResult<CheckpointInfo> {
        let session_id = self.get_or_create_session(project)?;
        let now = Utc::now();
        let now_str = now.to_rfc3339();

        let key_facts_json = serde_json::to_string(&key_facts).unwrap_or_else(|_| "[]".to_string());
        let open_tasks_json = serde_json::to_string(&open_tasks).unwrap_or_else(|_| "[]".to_string());
        let files_modified_json = serde_json::to_string(&files_modified).unwrap_or_else(|_| "[]".to_string());
        let summary = summary.to_string();
        let session_id_for_write = session_id.clone();

        let num = self.pool.with_writer(move |conn| {
            let num: i64 = conn
                .query_row(
                    "SELECT COALESCE(MAX(checkpoint_num), 0) FROM checkpoints WHERE session_id = ?1",
                    params![session_id_for_write],
                    |row| row.get(0),
                )
                .map_err(|e| cortex_storage::to_storage_err(e.to_string()))?;
            let num = num + 1;

            conn.execute(
                "INSERT INTO checkpoints
                 (session_id, checkpoint_num, summary, key_facts, open_tasks, files_modified, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![session_id_for_write, num, summary, key_facts_json, open_tasks_json, files_modified_json, now_str],
            )
            .map_err(|e| cortex_storage::to_storage_err(e.to_string()))?;

            conn.execute(
                "UPDATE sessions SET checkpoint_count = ?1, summary = ?2 WHERE id = ?3",
                params![num, summary, session_id_for_write],
            )
            .map_err(|e| cortex_storage::to_storage_err(e.to_string()))?;

            Ok(num)
        })?;

        Ok(CheckpointInfo {
            session_id,
            checkpoint_num: num,
            summary,
            project: project.map(str::to_string),
            created_at: now,
        })
    }

    /// Load the latest checkpoint, selected by (in priority order) an
    /// explicit session id, a project name, or — if neither is given — the
    /// single most recent checkpoint across all sessions.
    pub fn load_checkpoint(&self, session_id: Option<&str>, project: Option<&str>) -> CortexResult<Option<Checkpoint>> {
        self.pool.with_reader(|conn| {
            let result = if let Some(sid) = session_id {
                conn.query_row(
                    "SELECT c.* FROM checkpoints c
                     WHERE c.session_id = ?1
                     ORDER BY c.created_at DESC LIMIT 1",
                    params![sid],
                    row_to_checkpoint,
                )
                .optional()
            } else if let Some(proj) = project {
                conn.query_row(
                    "SELECT c.* FROM checkpoints c
                     JOIN sessions s ON c.session_id = s.id
                     WHERE s.project = ?1
                     ORDER BY c.created_at DESC LIMIT 1",
                    params![proj],
                    row_to_checkpoint,
                )
                .optional()
            } else {
                conn.query_row(
                    "SELECT c.* FROM checkpoints c ORDER BY c.created_at DESC LIMIT 1",
                    [],
                    row_to_checkpoint,
                )
                .optional()
            };
            result.map_err(|e| cortex_storage::to_storage_err(e.to_string()))
        })
    }

    /// List recent sessions, most recently started first.
    pub fn list_sessions(&self, project: Option<&str>, limit: i64) -> CortexResult<Vec<Session>> {
        self.pool.with_reader(|conn| {
            let rows = match project {
                Some(proj) => {
                    let mut stmt = conn
                        .prepare("SELECT * FROM sessions WHERE project = ?1 ORDER BY started_at DESC LIMIT ?2")
                        .map_err(|e| cortex_storage::to_storage_err(e.to_string()))?;
                    let sessions: Vec<Session> = stmt
                        .query_map(params![proj, limit], row_to_session)
                        .map_err(|e| cortex_storage::to_storage_err(e.to_string()))?
                        .collect::<Result<_, _>>()
                        .map_err(|e| cortex_storage::to_storage_err(e.to_string()))?;
                    sessions
                }
                None => {
                    let mut stmt = conn
                        .prepare("SELECT * FROM sessions ORDER BY started_at DESC LIMIT ?1")
                        .map_err(|e| cortex_storage::to_storage_err(e.to_string()))?;
                    let sessions: Vec<Session> = stmt
                        .query_map(params![limit], row_to_session)
                        .map_err(|e| cortex_storage::to_storage_err(e.to_string()))?
                        .collect::<Result<_, _>>()
                        .map_err(|e| cortex_storage::to_storage_err(e.to_string()))?;
                    sessions
                }
            };
            Ok(rows)
        })
    }

    /// Mark a session ended. No-op if the session does not exist.
    pub fn end_session(&self, session_id: &str) -> CortexResult<()> {
        let now = Utc::now().to_rfc3339();
        self.pool.with_writer(|conn| {
            conn.execute(
                "UPDATE sessions SET status = 'ended', ended_at = ?1 WHERE id = ?2",
                params![now, session_id],
            )
            .map_err(|e| cortex_storage::to_storage_err(e.to_string()))?;
            Ok(())
        })
    }

    /// Render a markdown briefing from the latest checkpoint for `project`,
    /// or a "fresh start" message if there is none.
    pub fn recover_context(&self, project: Option<&str>) -> CortexResult<String> {
        let checkpoint = self.load_checkpoint(None, project)?;
        let Some(cp) = checkpoint else {
            return Ok("No previous session found. This is a fresh start.".to_string());
        };

        let mut lines = vec![
            "## Session Recovery".to_string(),
            String::new(),
            format!("**Last checkpoint:** {}", cp.created_at.to_rfc3339()),
            format!("**Project:** {}", project.unwrap_or("General")),
            format!("**Checkpoint #{}**", cp.checkpoint_num),
            String::new(),
            "### Summary".to_string(),
            cp.summary.clone(),
        ];

        if !cp.key_facts.is_empty() {
            lines.push("\n### Key Facts".to_string());
            for fact in &cp.key_facts {
                lines.push(format!("- {fact}"));
            }
        }

        if !cp.open_tasks.is_empty() {
            lines.push("\n### Open Tasks".to_string());
            for task in &cp.open_tasks {
                lines.push(format!("- [ ] {task}"));
            }
        }

        if !cp.files_modified.is_empty() {
            lines.push("\n### Files Modified".to_string());
            for f in &cp.files_modified {
                lines.push(format!("- {f}"));
            }
        }

        Ok(lines.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cortex_storage::Store;

    fn store_and_sessions() -> (Store, SessionStore) {
        let store = Store::open_in_memory().unwrap();
        let sessions = SessionStore::new(store.pool());
        (store, sessions)
    }

    #[test]
    fn session_ids_are_unique() {
        let a = generate_session_id();
        let b = generate_session_id();
        assert_ne!(a, b);
        assert!(a.starts_with("session_"));
    }

    #[test]
    fn save_checkpoint_creates_a_session_and_numbers_from_one() {
        let (_store, sessions) = store_and_sessions();
        let info = sessions
            .save_checkpoint(Some("demo"), "did the thing", vec!["fact one".into()], vec![], vec![])
            .unwrap();
        assert_eq!(info.checkpoint_num, 1);
        assert_eq!(info.project.as_deref(), Some("demo"));
    }

    #[test]
    fn repeated_checkpoints_reuse_the_active_session_and_increment() {
        let (_store, sessions) = store_and_sessions();
        let first = sessions.save_checkpoint(Some("demo"), "step one", vec![], vec![], vec![]).unwrap();
        let second = sessions.save_checkpoint(Some("demo"), "step two", vec![], vec![], vec![]).unwrap();
        assert_eq!(first.session_id, second.session_id);
        assert_eq!(second.checkpoint_num, 2);
    }

    #[test]
    fn load_checkpoint_returns_the_latest_one() {
        let (_store, sessions) = store_and_sessions();
        sessions.save_checkpoint(Some("demo"), "older", vec![], vec![], vec![]).unwrap();
        sessions.save_checkpoint(Some("demo"), "newer", vec![], vec![], vec![]).unwrap();
        let loaded = sessions.load_checkpoint(None, Some("demo")).unwrap().unwrap();
        assert_eq!(loaded.summary, "newer");
        assert_eq!(loaded.checkpoint_num, 2);
    }

    #[test]
    fn recover_context_reports_fresh_start_with_no_checkpoints() {
        let (_store, sessions) = store_and_sessions();
        let context = sessions.recover_context(Some("new-project")).unwrap();
        assert!(context.contains("fresh start"));
    }

    #[test]
    fn recover_context_renders_facts_tasks_and_files() {
        let (_store, sessions) = store_and_sessions();
        sessions
            .save_checkpoint(
                Some("demo"),
                "wired up the parser",
                vec!["uses recursive descent".into()],
                vec!["add error recovery".into()],
                vec!["src/parser.rs".into()],
            )
            .unwrap();
        let context = sessions.recover_context(Some("demo")).unwrap();
        assert!(context.contains("recursive descent"));
        assert!(context.contains("add error recovery"));
        assert!(context.contains("src/parser.rs"));
    }

    #[test]
    fn list_sessions_orders_most_recent_first() {
        let (_store, sessions) = store_and_sessions();
        sessions.save_checkpoint(Some("a"), "first", vec![], vec![], vec![]).unwrap();
        sessions.save_checkpoint(Some("b"), "second", vec![], vec![], vec![]).unwrap();
        let list = sessions.list_sessions(None, 10).unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].project.as_deref(), Some("b"));
    }
}
