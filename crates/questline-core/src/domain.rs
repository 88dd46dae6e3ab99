// Domain value types shared across the workspace.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Role assigned at registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Participant,
    Organizer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Participant => "participant",
            Role::Organizer => "organizer",
        }
    }

    pub fn parse(s: &str) -> Option<Role> {
        match s {
            "participant" => Some(Role::Participant),
            "organizer" => Some(Role::Organizer),
            _ => None,
        }
    }
}

/// A registered chat user. The id is assigned by the chat platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub user_id: i64,
    pub full_name: String,
    pub role: Role,
    /// Cumulative point total, only ever incremented
    pub points: i64,
}

/// One quiz question. `answers[0]` is canonical-correct; display order is
/// shuffled at render time without touching this canonical order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub prompt: String,
    pub answers: [String; 3],
}

/// The authored game for one catalog event: an ordered checkpoint list to
/// walk during the event and an ordered question list for afterwards. Both
/// sequences are immutable once the game is created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventGame {
    pub event_id: String,
    pub title: String,
    pub checkpoints: Vec<String>,
    pub questions: Vec<Question>,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
}

/// Per-user, per-event record of notification and completion flags.
/// Every flag is monotonic: false to true, never reset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Enrollment {
    pub user_id: i64,
    pub event_id: String,
    pub notified_pre_start: bool,
    pub notified_start: bool,
    pub notified_end: bool,
    pub checkpoints_done: bool,
    pub questions_done: bool,
}

impl Enrollment {
    /// A fresh enrollment with all flags unset
    pub fn new(user_id: i64, event_id: impl Into<String>) -> Self {
        Self {
            user_id,
            event_id: event_id.into(),
            notified_pre_start: false,
            notified_start: false,
            notified_end: false,
            checkpoints_done: false,
            questions_done: false,
        }
    }
}

/// The two fixed mini-game shapes. This set is closed: the progression
/// engine supports exactly these traversals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MiniGame {
    Checkpoints,
    Quiz,
}

/// Announcement-list entry from the external catalog: id, title and a
/// coarse date only. Full detail requires a second fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoughEvent {
    pub id: String,
    pub title: String,
    pub date: NaiveDate,
}

/// Full event detail from the external catalog
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventDetail {
    pub id: String,
    pub title: String,
    pub description: String,
    pub address: String,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
}
