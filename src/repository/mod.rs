use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::*;
use crate::error::Result;

pub mod announcement_repository;
pub mod catalog_repository;
pub mod read_mark_repository;
pub mod user_repository;

pub use announcement_repository::SqliteAnnouncementRepository;
pub use catalog_repository::SqliteCatalogRepository;
pub use read_mark_repository::SqliteReadMarkRepository;
pub use user_repository::SqliteUserRepository;

#[async_trait]
pub trait AnnouncementRepository: Send + Sync {
    async fn create(&self, input: &AnnouncementInput, author_id: Option<i64>) -> Result<Announcement>;
    async fn find_by_id(&self, id: i64) -> Result<Option<Announcement>>;
    async fn list_all(&self) -> Result<Vec<Announcement>>;
    /// Announcements whose visibility window contains `at`, ordered
    /// urgent first, then visible_from descending, then id descending.
    async fn list_visible_at(&self, at: DateTime<Utc>) -> Result<Vec<Announcement>>;
    async fn update(&self, id: i64, input: &AnnouncementInput) -> Result<Announcement>;
    async fn delete(&self, id: i64) -> Result<()>;
}

#[async_trait]
pub trait ReadMarkRepository: Send + Sync {
    /// Idempotent upsert keyed on (user, announcement); every call
    /// refreshes the read-at timestamp.
    async fn mark_read(&self, user_id: i64, announcement_id: i64) -> Result<ReadMark>;
    async fn mark_unread(&self, user_id: i64, announcement_id: i64) -> Result<()>;
    async fn read_marks_for(
        &self,
        user_id: i64,
        announcement_ids: &[i64],
    ) -> Result<HashMap<i64, DateTime<Utc>>>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>>;
    async fn list_active(&self) -> Result<Vec<User>>;
    async fn programme_ids_for(&self, user_id: i64) -> Result<HashSet<i64>>;
    async fn programme_member_ids(&self, programme_id: i64) -> Result<HashSet<i64>>;
}

#[async_trait]
pub trait CatalogRepository: Send + Sync {
    async fn programmes(&self) -> Result<Vec<Programme>>;
    /// (programme_id, master_course_id) pairs marked available, ordered
    /// by programme then master course.
    async fn available_master_courses_by_programme(&self) -> Result<Vec<(i64, i64)>>;
    async fn master_course_ids_for_programme(&self, programme_id: i64) -> Result<Vec<i64>>;
    /// Master courses among `ids` with at least one scheduled course.
    async fn master_courses_with_schedules(&self, ids: &[i64]) -> Result<Vec<MasterCourse>>;
    async fn scheduled_courses_for_masters(
        &self,
        master_course_ids: &[i64],
    ) -> Result<Vec<ScheduledCourse>>;
    async fn scheduled_courses(&self, ids: &[i64]) -> Result<Vec<ScheduledCourse>>;
    async fn groups_for_scheduled_courses(
        &self,
        scheduled_course_ids: &[i64],
    ) -> Result<Vec<ScheduledCourseGroup>>;
    async fn scheduled_course_groups(&self, ids: &[i64]) -> Result<Vec<ScheduledCourseGroup>>;
}

/// "?, ?, ?" for binding id lists into an IN clause.
pub(crate) fn sql_placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}
