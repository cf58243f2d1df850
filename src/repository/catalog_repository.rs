use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::{
    domain::{MasterCourse, Programme, ScheduledCourse, ScheduledCourseGroup},
    error::{AppError, Result},
    repository::{sql_placeholders, CatalogRepository},
};

pub struct SqliteCatalogRepository {
    pool: SqlitePool,
}

impl SqliteCatalogRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn fetch_by_ids<T>(&self, sql_template: &str, ids: &[i64]) -> Result<Vec<T>>
    where
        T: for<'r> sqlx::FromRow<'r, sqlx::sqlite::SqliteRow> + Send + Unpin,
    {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let sql = sql_template.replace("{ids}", &sql_placeholders(ids.len()));
        let mut query = sqlx::query_as::<_, T>(&sql);
        for id in ids {
            query = query.bind(id);
        }

        query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

#[async_trait]
impl CatalogRepository for SqliteCatalogRepository {
    async fn programmes(&self) -> Result<Vec<Programme>> {
        sqlx::query_as::<_, Programme>("SELECT id, display_name FROM programmes ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn available_master_courses_by_programme(&self) -> Result<Vec<(i64, i64)>> {
        sqlx::query_as(
            r#"
            SELECT DISTINCT programme_id, master_course_id
            FROM programme_master_courses
            WHERE available = 1
            ORDER BY programme_id, master_course_id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn master_course_ids_for_programme(&self, programme_id: i64) -> Result<Vec<i64>> {
        let rows: Vec<(i64,)> = sqlx::query_as(
            r#"
            SELECT DISTINCT master_course_id
            FROM programme_master_courses
            WHERE programme_id = ?
            ORDER BY master_course_id
            "#,
        )
        .bind(programme_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    async fn master_courses_with_schedules(&self, ids: &[i64]) -> Result<Vec<MasterCourse>> {
        self.fetch_by_ids(
            r#"
            SELECT mc.id, mc.display_name, mc.vle_course_id
            FROM master_courses mc
            WHERE mc.id IN ({ids})
              AND EXISTS (
                  SELECT 1 FROM scheduled_courses sc WHERE sc.master_course_id = mc.id
              )
            ORDER BY mc.id
            "#,
            ids,
        )
        .await
    }

    async fn scheduled_courses_for_masters(
        &self,
        master_course_ids: &[i64],
    ) -> Result<Vec<ScheduledCourse>> {
        self.fetch_by_ids(
            r#"
            SELECT id, master_course_id, display_name, vle_course_id
            FROM scheduled_courses
            WHERE master_course_id IN ({ids})
            ORDER BY master_course_id, id
            "#,
            master_course_ids,
        )
        .await
    }

    async fn scheduled_courses(&self, ids: &[i64]) -> Result<Vec<ScheduledCourse>> {
        self.fetch_by_ids(
            r#"
            SELECT id, master_course_id, display_name, vle_course_id
            FROM scheduled_courses
            WHERE id IN ({ids})
            ORDER BY id
            "#,
            ids,
        )
        .await
    }

    async fn groups_for_scheduled_courses(
        &self,
        scheduled_course_ids: &[i64],
    ) -> Result<Vec<ScheduledCourseGroup>> {
        self.fetch_by_ids(
            r#"
            SELECT id, scheduled_course_id, display_name, vle_group_id
            FROM scheduled_course_groups
            WHERE scheduled_course_id IN ({ids})
            ORDER BY scheduled_course_id, id
            "#,
            scheduled_course_ids,
        )
        .await
    }

    async fn scheduled_course_groups(&self, ids: &[i64]) -> Result<Vec<ScheduledCourseGroup>> {
        self.fetch_by_ids(
            r#"
            SELECT id, scheduled_course_id, display_name, vle_group_id
            FROM scheduled_course_groups
            WHERE id IN ({ids})
            ORDER BY id
            "#,
            ids,
        )
        .await
    }
}
