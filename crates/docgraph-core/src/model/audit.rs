//! Audit trail embedded by entities that track who created, touched and
//! deleted them.

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Who did something, and when (UTC unix seconds)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeEvent {
    pub timestamp: i64,
    pub user_id: String,
}

impl TimeEvent {
    pub fn now(user_id: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now().timestamp(),
            user_id: user_id.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Audit {
    pub creation: Option<TimeEvent>,
    pub updated: Vec<TimeEvent>,
    pub deleted: Option<TimeEvent>,
}

impl Audit {
    /// Fresh audit trail created by `user_id`
    pub fn created_by(user_id: impl Into<String>) -> Self {
        let mut audit = Self::default();
        audit.set_created(user_id);
        audit
    }

    /// Text identity for new entities that carry their own ids
    pub fn new_identity() -> String {
        uuid::Uuid::new_v4().to_string()
    }

    /// Record creation; the update history restarts with the same event
    pub fn set_created(&mut self, user_id: impl Into<String>) {
        let event = TimeEvent::now(user_id);
        self.updated = vec![event.clone()];
        self.creation = Some(event);
    }

    pub fn set_updated(&mut self, user_id: impl Into<String>) {
        self.updated.push(TimeEvent::now(user_id));
    }

    /// Soft delete; also counts as an update
    pub fn set_deleted(&mut self, user_id: impl Into<String>) {
        let event = TimeEvent::now(user_id);
        self.updated.push(event.clone());
        self.deleted = Some(event);
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted.is_some()
    }

    pub fn was_created_by(&self, user_id: &str) -> bool {
        self.creation
            .as_ref()
            .is_some_and(|event| event.user_id == user_id)
    }

    /// Most recent update event
    pub fn last_updated(&self) -> Option<&TimeEvent> {
        self.updated.last()
    }
}
