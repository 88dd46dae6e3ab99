// Repository layer for database operations

use std::collections::HashSet;

use anyhow::{Context, Result};
use questline_core::{Enrollment, EventGame, MiniGame, Trigger, User};
use sqlx::types::Json;
use sqlx::PgPool;

use crate::models::*;

#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create database connection from URL
    pub async fn from_url(database_url: &str) -> Result<Self> {
        let pool = PgPool::connect(database_url)
            .await
            .context("Failed to connect to database")?;
        Ok(Self { pool })
    }

    /// Apply pending migrations
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("Failed to run migrations")?;
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    // ============================================
    // Users
    // ============================================

    pub async fn create_user(&self, user_id: i64, full_name: &str, role: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO users (user_id, full_name, role, points)
            VALUES ($1, $2, $3, 0)
            "#,
        )
        .bind(user_id)
        .bind(full_name)
        .bind(role)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_user(&self, user_id: i64) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT user_id, full_name, role, points
            FROM users
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(UserRow::into_domain).transpose()
    }

    // ============================================
    // Event games
    // ============================================

    pub async fn create_event_game(&self, input: CreateEventGame) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO event_games (event_id, title, checkpoints, questions, start_at, end_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(&input.event_id)
        .bind(&input.title)
        .bind(Json(&input.checkpoints))
        .bind(Json(&input.questions))
        .bind(input.start_at)
        .bind(input.end_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_event_game(&self, event_id: &str) -> Result<Option<EventGame>> {
        let row = sqlx::query_as::<_, EventGameRow>(
            r#"
            SELECT event_id, title, checkpoints, questions, start_at, end_at
            FROM event_games
            WHERE event_id = $1
            "#,
        )
        .bind(event_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(EventGameRow::into_domain))
    }

    pub async fn list_event_games(&self) -> Result<Vec<EventGame>> {
        let rows = sqlx::query_as::<_, EventGameRow>(
            r#"
            SELECT event_id, title, checkpoints, questions, start_at, end_at
            FROM event_games
            ORDER BY start_at
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(EventGameRow::into_domain).collect())
    }

    /// Ids of every event that has an authored game, for the enrollment gate
    pub async fn event_game_ids(&self) -> Result<HashSet<String>> {
        let ids: Vec<(String,)> = sqlx::query_as("SELECT event_id FROM event_games")
            .fetch_all(&self.pool)
            .await?;
        Ok(ids.into_iter().map(|(id,)| id).collect())
    }

    // ============================================
    // Enrollments
    // ============================================

    pub async fn enroll(&self, user_id: i64, event_id: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO enrollments (user_id, event_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id, event_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(event_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_enrollment(
        &self,
        user_id: i64,
        event_id: &str,
    ) -> Result<Option<Enrollment>> {
        let row = sqlx::query_as::<_, EnrollmentRow>(
            r#"
            SELECT user_id, event_id, notified_pre_start, notified_start, notified_end,
                   checkpoints_done, questions_done
            FROM enrollments
            WHERE user_id = $1 AND event_id = $2
            "#,
        )
        .bind(user_id)
        .bind(event_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(EnrollmentRow::into_domain))
    }

    pub async fn enrollments_for_user(&self, user_id: i64) -> Result<Vec<Enrollment>> {
        let rows = sqlx::query_as::<_, EnrollmentRow>(
            r#"
            SELECT user_id, event_id, notified_pre_start, notified_start, notified_end,
                   checkpoints_done, questions_done
            FROM enrollments
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(EnrollmentRow::into_domain).collect())
    }

    /// Enrollments on one event joined with each enrollee's display name,
    /// for the notification pass
    pub async fn notify_targets_for_event(
        &self,
        event_id: &str,
    ) -> Result<Vec<(Enrollment, String)>> {
        let rows = sqlx::query_as::<_, NotifyTargetRow>(
            r#"
            SELECT e.user_id, e.event_id, e.notified_pre_start, e.notified_start,
                   e.notified_end, e.checkpoints_done, e.questions_done, u.full_name
            FROM enrollments e
            JOIN users u ON u.user_id = e.user_id
            WHERE e.event_id = $1
            "#,
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(NotifyTargetRow::into_parts).collect())
    }

    /// Flip one notification flag, guarded on it still being false.
    /// Single-column conditional UPDATE: concurrent writers to the other
    /// columns of the same row are never clobbered. Returns whether this
    /// call actually flipped the flag.
    pub async fn mark_notified(
        &self,
        user_id: i64,
        event_id: &str,
        trigger: Trigger,
    ) -> Result<bool> {
        let sql = match trigger {
            Trigger::PreStart => {
                r#"
                UPDATE enrollments SET notified_pre_start = TRUE
                WHERE user_id = $1 AND event_id = $2 AND notified_pre_start = FALSE
                "#
            }
            Trigger::Start => {
                r#"
                UPDATE enrollments SET notified_start = TRUE
                WHERE user_id = $1 AND event_id = $2 AND notified_start = FALSE
                "#
            }
            Trigger::End => {
                r#"
                UPDATE enrollments SET notified_end = TRUE
                WHERE user_id = $1 AND event_id = $2 AND notified_end = FALSE
                "#
            }
        };

        let result = sqlx::query(sql)
            .bind(user_id)
            .bind(event_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Commit a terminal mini-game outcome: flip the completion flag and
    /// credit the earned points, as one transaction.
    ///
    /// The flag flip is guarded on the flag still being false and the
    /// credit only happens when the flip did, so replaying a terminal token
    /// can never double-credit. The credit itself is an atomic
    /// `points = points + n` update, so the two independent mini-game
    /// completions of one user cannot race each other either. Returns
    /// whether this call was the one that committed.
    pub async fn complete_minigame(
        &self,
        user_id: i64,
        event_id: &str,
        game: MiniGame,
        points: u32,
    ) -> Result<bool> {
        let flag_sql = match game {
            MiniGame::Checkpoints => {
                r#"
                UPDATE enrollments SET checkpoints_done = TRUE
                WHERE user_id = $1 AND event_id = $2 AND checkpoints_done = FALSE
                "#
            }
            MiniGame::Quiz => {
                r#"
                UPDATE enrollments SET questions_done = TRUE
                WHERE user_id = $1 AND event_id = $2 AND questions_done = FALSE
                "#
            }
        };

        let mut tx = self.pool.begin().await?;

        let flipped = sqlx::query(flag_sql)
            .bind(user_id)
            .bind(event_id)
            .execute(&mut *tx)
            .await?
            .rows_affected()
            == 1;

        if flipped && points > 0 {
            sqlx::query("UPDATE users SET points = points + $1 WHERE user_id = $2")
                .bind(points as i32)
                .bind(user_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        if flipped {
            tracing::info!(user_id, event_id, ?game, points, "mini-game completed");
        }
        Ok(flipped)
    }
}
