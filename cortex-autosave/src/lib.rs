//! # cortex-autosave
//!
//! Trigger-based automatic checkpointing: tracks memory operations as a
//! delta, evaluates configurable triggers (RAM pressure, message count,
//! timer), and hands off to `cortex-session` for the actual checkpoint.
//! Grounded on the reference implementation's `AutoSave`, rewritten with
//! the mutable state behind a single mutex instead of a handful of loose
//! instance attributes.

use std::sync::Mutex;
use std::time::Instant;

use serde::Serialize;
use serde_json::json;

use cortex_core::config::AutoSaveDefaults;
use cortex_core::errors::CortexResult;
use cortex_session::{CheckpointInfo, SessionStore};

/// Why a checkpoint was triggered, in priority order when more than one
/// condition is satisfied at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveReason {
    RamThreshold,
    MessageThreshold,
    Timer,
    Manual,
}

impl SaveReason {
    pub fn as_str(self) -> &'static str {
        match self {
            SaveReason::RamThreshold => "ram_threshold",
            SaveReason::MessageThreshold => "message_threshold",
            SaveReason::Timer => "timer",
            SaveReason::Manual => "manual",
        }
    }
}

/// Memory ids changed since the last checkpoint.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Delta {
    pub stored_ids: Vec<i64>,
    pub updated_ids: Vec<i64>,
    pub deleted_ids: Vec<i64>,
    pub link_ids: Vec<i64>,
}

impl Delta {
    pub fn total_changes(&self) -> usize {
        self.stored_ids.len() + self.updated_ids.len() + self.deleted_ids.len() + self.link_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total_changes() == 0
    }

    pub fn reset(&mut self) {
        self.stored_ids.clear();
        self.updated_ids.clear();
        self.deleted_ids.clear();
        self.link_ids.clear();
    }
}

/// Metadata returned after a checkpoint is saved.
#[derive(Debug, Clone, Serialize)]
pub struct AutoSaveResult {
    pub session_id: String,
    pub checkpoint_num: i64,
    pub reason: SaveReason,
    pub delta: Delta,
}

/// Snapshot of autosave state for diagnostics.
#[derive(Debug, Clone, Serialize)]
pub struct AutoSaveStatus {
    pub enabled: bool,
    pub config: AutoSaveConfigView,
    pub delta_total_changes: usize,
    pub message_count: u64,
    pub seconds_since_last_save: f64,
    pub total_checkpoints: u64,
    pub last_trigger: Option<SaveReason>,
    pub project: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct AutoSaveConfigView {
    pub enabled: bool,
    pub interval_seconds: u64,
    pub message_threshold: u64,
    pub ram_threshold_pct: f64,
    pub on_session_end: bool,
}

impl From<AutoSaveDefaults> for AutoSaveConfigView {
    fn from(c: AutoSaveDefaults) -> Self {
        Self {
            enabled: c.enabled,
            interval_seconds: c.interval_seconds,
            message_threshold: c.message_threshold,
            ram_threshold_pct: c.ram_threshold_pct,
            on_session_end: c.on_session_end,
        }
    }
}

struct Inner {
    config: AutoSaveDefaults,
    delta: Delta,
    message_count: u64,
    last_save_at: Instant,
    total_checkpoints: u64,
    last_trigger: Option<SaveReason>,
}

/// Tracks pending changes for one project and decides when to checkpoint
/// them via a shared [`SessionStore`].
pub struct AutoSave {
    session: SessionStore,
    project: Option<String>,
    state: Mutex<Inner>,
}

impl AutoSave {
    pub fn new(session: SessionStore, project: Option<String>, config: AutoSaveDefaults) -> Self {
        Self {
            session,
            project,
            state: Mutex::new(Inner {
                config,
                delta: Delta::default(),
                message_count: 0,
                last_save_at: Instant::now(),
                total_checkpoints: 0,
                last_trigger: None,
            }),
        }
    }

    pub fn track_store(&self, memory_id: i64) {
        self.state.lock().unwrap().delta.stored_ids.push(memory_id);
    }

    pub fn track_update(&self, memory_id: i64) {
        self.state.lock().unwrap().delta.updated_ids.push(memory_id);
    }

    pub fn track_delete(&self, memory_id: i64) {
        self.state.lock().unwrap().delta.deleted_ids.push(memory_id);
    }

    pub fn track_link(&self, link_id: i64) {
        self.state.lock().unwrap().delta.link_ids.push(link_id);
    }

    pub fn track_message(&self) {
        self.state.lock().unwrap().message_count += 1;
    }

    pub fn delta(&self) -> Delta {
        self.state.lock().unwrap().delta.clone()
    }

    /// Evaluate triggers in priority order (RAM, then message count, then
    /// timer) and return the reason to save, if any. `ram_pct` is the
    /// caller-measured current memory pressure, when available.
    pub fn should_save(&self, ram_pct: Option<f64>) -> Option<SaveReason> {
        let state = self.state.lock().unwrap();
        if !state.config.enabled {
            return None;
        }
        if state.delta.is_empty() && state.message_count == 0 {
            return None;
        }

        if let Some(pct) = ram_pct {
            if pct >= state.config.ram_threshold_pct {
                return Some(SaveReason::RamThreshold);
            }
        }

        if state.message_count >= state.config.message_threshold {
            return Some(SaveReason::MessageThreshold);
        }

        let elapsed = state.last_save_at.elapsed().as_secs();
        if elapsed >= state.config.interval_seconds {
            return Some(SaveReason::Timer);
        }

        None
    }

    /// Call after each message exchange (or periodically): evaluates
    /// triggers and checkpoints if one fires.
    pub fn tick(&self, ram_pct: Option<f64>) -> CortexResult<Option<AutoSaveResult>> {
        self.track_message();
        match self.should_save(ram_pct) {
            Some(reason) => Ok(Some(self.checkpoint(reason)?)),
            None => Ok(None),
        }
    }

    /// Save an incremental checkpoint for the current delta and reset
    /// tracking state.
    pub fn checkpoint(&self, reason: SaveReason) -> CortexResult<AutoSaveResult> {
        let (delta, message_count) = {
            let state = self.state.lock().unwrap();
            (state.delta.clone(), state.message_count)
        };

        let summary = format!("[autosave:{}] {} (msgs: {})", reason.as_str(), change_summary(&delta), message_count);
        let key_facts = vec![
            format!("trigger: {}", reason.as_str()),
            format!("delta: {}", delta_json(&delta)),
            format!("messages_since_last_save: {message_count}"),
        ];

        let info: CheckpointInfo = self.session.save_checkpoint(self.project.as_deref(), &summary, key_facts, vec![], vec![])?;

        let mut state = self.state.lock().unwrap();
        state.delta.reset();
        state.message_count = 0;
        state.last_save_at = Instant::now();
        state.total_checkpoints += 1;
        state.last_trigger = Some(reason);

        Ok(AutoSaveResult {
            session_id: info.session_id,
            checkpoint_num: info.checkpoint_num,
            reason,
            delta,
        })
    }

    /// Restore the latest checkpoint for the current project, rendered as
    /// a recovery briefing. Returns `None` if there is no prior checkpoint.
    pub fn restore(&self) -> CortexResult<Option<String>> {
        let checkpoint = self.session.load_checkpoint(None, self.project.as_deref())?;
        if checkpoint.is_none() {
            return Ok(None);
        }
        Ok(Some(self.session.recover_context(self.project.as_deref())?))
    }

    pub fn status(&self) -> AutoSaveStatus {
        let state = self.state.lock().unwrap();
        AutoSaveStatus {
            enabled: state.config.enabled,
            config: state.config.into(),
            delta_total_changes: state.delta.total_changes(),
            message_count: state.message_count,
            seconds_since_last_save: state.last_save_at.elapsed().as_secs_f64(),
            total_checkpoints: state.total_checkpoints,
            last_trigger: state.last_trigger,
            project: self.project.clone(),
        }
    }
}

fn change_summary(delta: &Delta) -> String {
    let mut parts = Vec::new();
    if !delta.stored_ids.is_empty() {
        parts.push(format!("{} new memories", delta.stored_ids.len()));
    }
    if !delta.updated_ids.is_empty() {
        parts.push(format!("{} updated", delta.updated_ids.len()));
    }
    if !delta.deleted_ids.is_empty() {
        parts.push(format!("{} deleted", delta.deleted_ids.len()));
    }
    if !delta.link_ids.is_empty() {
        parts.push(format!("{} new links", delta.link_ids.len()));
    }
    if parts.is_empty() {
        "no changes".to_string()
    } else {
        parts.join(", ")
    }
}

fn delta_json(delta: &Delta) -> String {
    json!({
        "stored_ids": delta.stored_ids,
        "updated_ids": delta.updated_ids,
        "deleted_ids": delta.deleted_ids,
        "link_ids": delta.link_ids,
        "total_changes": delta.total_changes(),
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use cortex_storage::Store;

    fn autosaver(config: AutoSaveDefaults) -> AutoSave {
        let store = Store::open_in_memory().unwrap();
        let session = SessionStore::new(store.pool());
        AutoSave::new(session, Some("demo".to_string()), config)
    }

    fn fast_config() -> AutoSaveDefaults {
        AutoSaveDefaults {
            enabled: true,
            interval_seconds: 3600,
            message_threshold: 3,
            ram_threshold_pct: 90.0,
            on_session_end: true,
        }
    }

    #[test]
    fn no_trigger_fires_with_nothing_tracked() {
        let saver = autosaver(fast_config());
        assert_eq!(saver.should_save(None), None);
    }

    #[test]
    fn message_threshold_fires_once_reached() {
        let saver = autosaver(fast_config());
        saver.track_store(1);
        saver.track_message();
        saver.track_message();
        saver.track_message();
        assert_eq!(saver.should_save(None), Some(SaveReason::MessageThreshold));
    }

    #[test]
    fn ram_threshold_outranks_message_threshold() {
        let saver = autosaver(fast_config());
        saver.track_store(1);
        saver.track_message();
        assert_eq!(saver.should_save(Some(95.0)), Some(SaveReason::RamThreshold));
    }

    #[test]
    fn checkpoint_resets_delta_and_message_count() {
        let saver = autosaver(fast_config());
        saver.track_store(42);
        saver.track_link(7);
        let result = saver.checkpoint(SaveReason::Manual).unwrap();
        assert_eq!(result.delta.stored_ids, vec![42]);
        assert_eq!(result.delta.link_ids, vec![7]);
        assert!(saver.delta().is_empty());
        assert_eq!(saver.status().message_count, 0);
    }

    #[test]
    fn disabled_config_never_triggers() {
        let mut config = fast_config();
        config.enabled = false;
        let saver = autosaver(config);
        saver.track_store(1);
        for _ in 0..10 {
            saver.track_message();
        }
        assert_eq!(saver.should_save(Some(99.0)), None);
    }

    #[test]
    fn restore_reports_none_with_no_checkpoints() {
        let saver = autosaver(fast_config());
        assert!(saver.restore().unwrap().is_none());
    }

    #[test]
    fn restore_returns_recovery_text_after_checkpoint() {
        let saver = autosaver(fast_config());
        saver.track_store(1);
        saver.checkpoint(SaveReason::Manual).unwrap();
        let restored = saver.restore().unwrap().unwrap();
        assert!(restored.contains("Session Recovery"));
    }
}
