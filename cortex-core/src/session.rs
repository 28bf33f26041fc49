use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status of a work session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Active,
    Ended,
}

impl SessionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionStatus::Active => "active",
            SessionStatus::Ended => "ended",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "active" => SessionStatus::Active,
            "ended" => SessionStatus::Ended,
            _ => return None,
        })
    }
}

/// One continuous unit of work, optionally scoped to a project. At most one
/// session per `(tenant, project)` is `Active` at a time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub project: Option<String>,
    pub status: SessionStatus,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub checkpoint_count: i64,
    pub summary: Option<String>,
}

/// A saved snapshot of a session's progress, numbered sequentially within
/// the session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    pub id: i64,
    pub session_id: String,
    pub checkpoint_num: i64,
    pub summary: String,
    pub key_facts: Vec<String>,
    pub open_tasks: Vec<String>,
    pub files_modified: Vec<String>,
    pub created_at: DateTime<Utc>,
}
