use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::{FromRow, SqlitePool};

use crate::{
    domain::{Announcement, AnnouncementInput, Audience},
    error::{AppError, Result},
    repository::AnnouncementRepository,
};

#[derive(FromRow)]
struct AnnouncementRow {
    id: i64,
    subject: String,
    body: String,
    visible_from: NaiveDateTime,
    visible_to: NaiveDateTime,
    is_urgent: i32,
    audience: String,
    programme_id: Option<i64>,
    scheduled_course_id: Option<i64>,
    scheduled_course_group_id: Option<i64>,
    author_id: Option<i64>,
    created: NaiveDateTime,
    modified: NaiveDateTime,
}

const SELECT_COLUMNS: &str = r#"
    SELECT id, subject, body, visible_from, visible_to, is_urgent, audience,
           programme_id, scheduled_course_id, scheduled_course_group_id,
           author_id, created, modified
    FROM announcements
"#;

pub struct SqliteAnnouncementRepository {
    pool: SqlitePool,
}

impl SqliteAnnouncementRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_announcement(row: AnnouncementRow) -> Result<Announcement> {
        Ok(Announcement {
            id: row.id,
            subject: row.subject,
            body: row.body,
            visible_from: DateTime::from_naive_utc_and_offset(row.visible_from, Utc),
            visible_to: DateTime::from_naive_utc_and_offset(row.visible_to, Utc),
            is_urgent: row.is_urgent != 0,
            audience: Self::parse_audience(&row.audience)?,
            programme_id: row.programme_id,
            scheduled_course_id: row.scheduled_course_id,
            scheduled_course_group_id: row.scheduled_course_group_id,
            author_id: row.author_id,
            created: DateTime::from_naive_utc_and_offset(row.created, Utc),
            modified: DateTime::from_naive_utc_and_offset(row.modified, Utc),
        })
    }

    fn parse_audience(s: &str) -> Result<Audience> {
        Audience::from_code(s)
            .ok_or_else(|| AppError::Database(format!("Invalid audience: {}", s)))
    }
}

#[async_trait]
impl AnnouncementRepository for SqliteAnnouncementRepository {
    async fn create(&self, input: &AnnouncementInput, author_id: Option<i64>) -> Result<Announcement> {
        let is_urgent_int = if input.is_urgent { 1i32 } else { 0i32 };
        let now = Utc::now().naive_utc();

        let result = sqlx::query(
            r#"
            INSERT INTO announcements (
                subject, body, visible_from, visible_to, is_urgent, audience,
                programme_id, scheduled_course_id, scheduled_course_group_id,
                author_id, created, modified
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&input.subject)
        .bind(&input.body)
        .bind(input.visible_from.naive_utc())
        .bind(input.visible_to.naive_utc())
        .bind(is_urgent_int)
        .bind(input.audience.code())
        .bind(input.programme_id)
        .bind(input.scheduled_course_id)
        .bind(input.scheduled_course_group_id)
        .bind(author_id)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        self.find_by_id(result.last_insert_rowid()).await?.ok_or_else(|| {
            AppError::Database("Failed to retrieve created announcement".to_string())
        })
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Announcement>> {
        let row = sqlx::query_as::<_, AnnouncementRow>(&format!("{} WHERE id = ?", SELECT_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        match row {
            Some(r) => Ok(Some(Self::row_to_announcement(r)?)),
            None => Ok(None),
        }
    }

    async fn list_all(&self) -> Result<Vec<Announcement>> {
        let rows =
            sqlx::query_as::<_, AnnouncementRow>(&format!("{} ORDER BY id", SELECT_COLUMNS))
                .fetch_all(&self.pool)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;

        rows.into_iter().map(Self::row_to_announcement).collect()
    }

    async fn list_visible_at(&self, at: DateTime<Utc>) -> Result<Vec<Announcement>> {
        let rows = sqlx::query_as::<_, AnnouncementRow>(&format!(
            "{} WHERE visible_from <= ? AND visible_to >= ? ORDER BY is_urgent DESC, visible_from DESC, id DESC",
            SELECT_COLUMNS
        ))
        .bind(at.naive_utc())
        .bind(at.naive_utc())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        rows.into_iter().map(Self::row_to_announcement).collect()
    }

    async fn update(&self, id: i64, input: &AnnouncementInput) -> Result<Announcement> {
        let is_urgent_int = if input.is_urgent { 1i32 } else { 0i32 };
        let now = Utc::now().naive_utc();

        sqlx::query(
            r#"
            UPDATE announcements
            SET subject = ?, body = ?, visible_from = ?, visible_to = ?,
                is_urgent = ?, audience = ?, programme_id = ?,
                scheduled_course_id = ?, scheduled_course_group_id = ?,
                modified = ?
            WHERE id = ?
            "#,
        )
        .bind(&input.subject)
        .bind(&input.body)
        .bind(input.visible_from.naive_utc())
        .bind(input.visible_to.naive_utc())
        .bind(is_urgent_int)
        .bind(input.audience.code())
        .bind(input.programme_id)
        .bind(input.scheduled_course_id)
        .bind(input.scheduled_course_group_id)
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        self.find_by_id(id).await?.ok_or_else(|| {
            AppError::Database("Failed to retrieve updated announcement".to_string())
        })
    }

    async fn delete(&self, id: i64) -> Result<()> {
        sqlx::query("DELETE FROM announcements WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(())
    }
}
