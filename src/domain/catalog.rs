use serde::{Deserialize, Serialize};

// Catalog entities are owned by the programmes subsystem; this service
// reads their identifiers and display names only. Course and group
// membership is resolved through the VLE membership snapshot, never
// through relational tables.

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Programme {
    pub id: i64,
    pub display_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct MasterCourse {
    pub id: i64,
    pub display_name: String,
    pub vle_course_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ScheduledCourse {
    pub id: i64,
    pub master_course_id: i64,
    pub display_name: String,
    pub vle_course_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ScheduledCourseGroup {
    pub id: i64,
    pub scheduled_course_id: i64,
    pub display_name: String,
    pub vle_group_id: String,
}
