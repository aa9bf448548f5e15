//! Presence payload derivation

use std::time::{SystemTime, UNIX_EPOCH};

use crate::core::config::DiscordConfig;
use crate::editor::EditorSnapshot;

/// Everything a single presence push carries.
///
/// `start_timestamp` marks the beginning of the editing session (the last
/// successful editor connection), not the time of the push.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresencePayload {
    pub state: String,
    pub details: String,
    pub start_timestamp: i64,
    pub large_image_key: String,
    pub large_image_text: String,
}

impl PresencePayload {
    /// Derive the display payload from a fresh snapshot
    pub fn derive(snapshot: &EditorSnapshot, session_start: i64, config: &DiscordConfig) -> Self {
        let (state, details) = match &snapshot.timeline_name {
            Some(timeline) => (
                format!("Editing: {}", timeline),
                format!("Project: {}", snapshot.project_name),
            ),
            None => (
                "Editing: No active Timeline".to_string(),
                format!("Project: {} (Manager)", snapshot.project_name),
            ),
        };

        Self {
            state,
            details,
            start_timestamp: session_start,
            large_image_key: config.large_image_key.clone(),
            large_image_text: config.large_image_text.clone(),
        }
    }
}

/// Current wall clock as unix seconds
pub fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs() as i64)
        .unwrap_or(0)
}
