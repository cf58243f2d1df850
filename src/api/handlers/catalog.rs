use std::collections::BTreeMap;

use axum::{extract::State, Json};

use crate::{
    api::state::AppState,
    error::Result,
    service::catalog_service::{AudiencesAndProgrammes, MasterCourseEntry, ScheduledCourseEntry},
};

// Lookup endpoints for the compose form's cascading selects. Each takes
// a JSON list of ids and returns a keyed map.

pub async fn master_courses(
    State(state): State<AppState>,
    Json(ids): Json<Vec<i64>>,
) -> Result<Json<BTreeMap<i64, MasterCourseEntry>>> {
    let entries = state.service_context.catalog_service.master_courses(&ids).await?;
    Ok(Json(entries))
}

pub async fn scheduled_courses(
    State(state): State<AppState>,
    Json(ids): Json<Vec<i64>>,
) -> Result<Json<BTreeMap<i64, ScheduledCourseEntry>>> {
    let entries = state
        .service_context
        .catalog_service
        .scheduled_courses(&ids)
        .await?;
    Ok(Json(entries))
}

pub async fn scheduled_course_groups(
    State(state): State<AppState>,
    Json(ids): Json<Vec<i64>>,
) -> Result<Json<BTreeMap<i64, String>>> {
    let entries = state
        .service_context
        .catalog_service
        .scheduled_course_groups(&ids)
        .await?;
    Ok(Json(entries))
}

pub async fn compose_options(
    State(state): State<AppState>,
) -> Result<Json<AudiencesAndProgrammes>> {
    let options = state
        .service_context
        .catalog_service
        .audiences_and_programmes()
        .await?;
    Ok(Json(options))
}
