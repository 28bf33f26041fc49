//! Base schema for memories, full-text search, the link graph, and
//! session/checkpoint persistence.

use rusqlite::Connection;

use cortex_core::errors::CortexResult;

use crate::to_storage_err;

pub fn apply(conn: &Connection) -> CortexResult<()> {
    conn.execute_batch(
        "
        CREATE TABLE memories (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            content         TEXT NOT NULL,
            content_hash    TEXT NOT NULL,
            memory_type     TEXT NOT NULL,
            importance      INTEGER NOT NULL,
            namespace       TEXT NOT NULL,
            tags            TEXT NOT NULL DEFAULT '[]',
            metadata        TEXT NOT NULL DEFAULT '{}',
            embedding       BLOB,
            decay_score     REAL NOT NULL DEFAULT 1.0,
            created_at      TEXT NOT NULL,
            accessed_at     TEXT NOT NULL,
            access_count    INTEGER NOT NULL DEFAULT 0,
            expires_at      TEXT
        );

        CREATE UNIQUE INDEX idx_memories_content_hash ON memories(content_hash);
        CREATE INDEX idx_memories_namespace ON memories(namespace);
        CREATE INDEX idx_memories_type ON memories(memory_type);
        CREATE INDEX idx_memories_importance ON memories(importance);
        CREATE INDEX idx_memories_accessed ON memories(accessed_at);
        CREATE INDEX idx_memories_expires ON memories(expires_at) WHERE expires_at IS NOT NULL;

        CREATE VIRTUAL TABLE memories_fts USING fts5(
            content,
            content = 'memories',
            content_rowid = 'id',
            tokenize = 'porter unicode61'
        );

        CREATE TRIGGER memories_ai AFTER INSERT ON memories BEGIN
            INSERT INTO memories_fts(rowid, content) VALUES (new.id, new.content);
        END;

        CREATE TRIGGER memories_ad AFTER DELETE ON memories BEGIN
            INSERT INTO memories_fts(memories_fts, rowid, content) VALUES ('delete', old.id, old.content);
        END;

        CREATE TRIGGER memories_au AFTER UPDATE ON memories BEGIN
            INSERT INTO memories_fts(memories_fts, rowid, content) VALUES ('delete', old.id, old.content);
            INSERT INTO memories_fts(rowid, content) VALUES (new.id, new.content);
        END;

        CREATE TABLE memory_links (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            source_id   INTEGER NOT NULL REFERENCES memories(id) ON DELETE CASCADE,
            target_id   INTEGER NOT NULL REFERENCES memories(id) ON DELETE CASCADE,
            relation    TEXT NOT NULL,
            metadata    TEXT NOT NULL DEFAULT '{}',
            created_at  TEXT NOT NULL,
            UNIQUE(source_id, target_id, relation)
        );

        CREATE INDEX idx_memory_links_source ON memory_links(source_id);
        CREATE INDEX idx_memory_links_target ON memory_links(target_id);

        CREATE TABLE sessions (
            id              TEXT PRIMARY KEY,
            project         TEXT,
            status          TEXT NOT NULL DEFAULT 'active',
            started_at      TEXT NOT NULL,
            ended_at        TEXT,
            checkpoint_count INTEGER NOT NULL DEFAULT 0,
            summary         TEXT
        );

        CREATE INDEX idx_sessions_status ON sessions(status);
        CREATE INDEX idx_sessions_project ON sessions(project);

        CREATE TABLE checkpoints (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            session_id      TEXT NOT NULL REFERENCES sessions(id) ON DELETE CASCADE,
            checkpoint_num  INTEGER NOT NULL,
            summary         TEXT,
            key_facts       TEXT NOT NULL DEFAULT '[]',
            open_tasks      TEXT NOT NULL DEFAULT '[]',
            files_modified  TEXT NOT NULL DEFAULT '[]',
            created_at      TEXT NOT NULL
        );

        CREATE INDEX idx_checkpoints_session ON checkpoints(session_id);
        ",
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}
