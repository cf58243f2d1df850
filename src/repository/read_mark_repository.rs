use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::{FromRow, SqlitePool};

use crate::{
    domain::ReadMark,
    error::{AppError, Result},
    repository::{sql_placeholders, ReadMarkRepository},
};

#[derive(FromRow)]
struct ReadMarkRow {
    announcement_id: i64,
    created: NaiveDateTime,
}

pub struct SqliteReadMarkRepository {
    pool: SqlitePool,
}

impl SqliteReadMarkRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReadMarkRepository for SqliteReadMarkRepository {
    async fn mark_read(&self, user_id: i64, announcement_id: i64) -> Result<ReadMark> {
        let now = Utc::now();

        // The unique (user_id, announcement_id) constraint makes this a
        // race-safe get-or-create; re-reading refreshes the timestamp.
        sqlx::query(
            r#"
            INSERT INTO user_announcements (user_id, announcement_id, created)
            VALUES (?, ?, ?)
            ON CONFLICT (user_id, announcement_id) DO UPDATE SET created = excluded.created
            "#,
        )
        .bind(user_id)
        .bind(announcement_id)
        .bind(now.naive_utc())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(ReadMark {
            user_id,
            announcement_id,
            created: now,
        })
    }

    async fn mark_unread(&self, user_id: i64, announcement_id: i64) -> Result<()> {
        sqlx::query("DELETE FROM user_announcements WHERE user_id = ? AND announcement_id = ?")
            .bind(user_id)
            .bind(announcement_id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(())
    }

    async fn read_marks_for(
        &self,
        user_id: i64,
        announcement_ids: &[i64],
    ) -> Result<HashMap<i64, DateTime<Utc>>> {
        if announcement_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let sql = format!(
            "SELECT announcement_id, created FROM user_announcements \
             WHERE user_id = ? AND announcement_id IN ({})",
            sql_placeholders(announcement_ids.len())
        );

        let mut query = sqlx::query_as::<_, ReadMarkRow>(&sql).bind(user_id);
        for id in announcement_ids {
            query = query.bind(id);
        }

        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(rows
            .into_iter()
            .map(|row| {
                (
                    row.announcement_id,
                    DateTime::from_naive_utc_and_offset(row.created, Utc),
                )
            })
            .collect())
    }
}
