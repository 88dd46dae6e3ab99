// Database row models (internal, converted to core domain types at the edge)

use chrono::{DateTime, Utc};
use questline_core::{Enrollment, EventGame, Question, Role, User};
use sqlx::types::Json;
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub user_id: i64,
    pub full_name: String,
    pub role: String,
    pub points: i32,
}

impl UserRow {
    /// Convert to the domain type. An unrecognized role string means the
    /// row predates the current schema; surface that loudly.
    pub fn into_domain(self) -> anyhow::Result<User> {
        let role = Role::parse(&self.role)
            .ok_or_else(|| anyhow::anyhow!("unknown role in users row: {}", self.role))?;
        Ok(User {
            user_id: self.user_id,
            full_name: self.full_name,
            role,
            points: self.points as i64,
        })
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct EventGameRow {
    pub event_id: String,
    pub title: String,
    pub checkpoints: Json<Vec<String>>,
    pub questions: Json<Vec<Question>>,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
}

impl EventGameRow {
    pub fn into_domain(self) -> EventGame {
        EventGame {
            event_id: self.event_id,
            title: self.title,
            checkpoints: self.checkpoints.0,
            questions: self.questions.0,
            start_at: self.start_at,
            end_at: self.end_at,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct EnrollmentRow {
    pub user_id: i64,
    pub event_id: String,
    pub notified_pre_start: bool,
    pub notified_start: bool,
    pub notified_end: bool,
    pub checkpoints_done: bool,
    pub questions_done: bool,
}

impl EnrollmentRow {
    pub fn into_domain(self) -> Enrollment {
        Enrollment {
            user_id: self.user_id,
            event_id: self.event_id,
            notified_pre_start: self.notified_pre_start,
            notified_start: self.notified_start,
            notified_end: self.notified_end,
            checkpoints_done: self.checkpoints_done,
            questions_done: self.questions_done,
        }
    }
}

/// Enrollment joined with the enrollee's display name, for notification
/// delivery.
#[derive(Debug, Clone, FromRow)]
pub struct NotifyTargetRow {
    pub user_id: i64,
    pub event_id: String,
    pub notified_pre_start: bool,
    pub notified_start: bool,
    pub notified_end: bool,
    pub checkpoints_done: bool,
    pub questions_done: bool,
    pub full_name: String,
}

impl NotifyTargetRow {
    pub fn into_parts(self) -> (Enrollment, String) {
        let enrollment = Enrollment {
            user_id: self.user_id,
            event_id: self.event_id,
            notified_pre_start: self.notified_pre_start,
            notified_start: self.notified_start,
            notified_end: self.notified_end,
            checkpoints_done: self.checkpoints_done,
            questions_done: self.questions_done,
        };
        (enrollment, self.full_name)
    }
}

/// Input for authoring a new event game
#[derive(Debug, Clone)]
pub struct CreateEventGame {
    pub event_id: String,
    pub title: String,
    pub checkpoints: Vec<String>,
    pub questions: Vec<Question>,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
}
