use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Serialize};

use crate::{
    api::{middleware::auth::CurrentUser, state::AppState},
    domain::{Announcement, AnnouncementInput},
    error::{AppError, Result},
    service::catalog_service::ComposeOptions,
    service::query::{ListParams, ListedAnnouncement},
};

#[derive(Debug, Deserialize)]
pub struct ListAnnouncementsQuery {
    pub q: Option<String>,
    pub column: Option<String>,
    pub order: Option<String>,
    pub page: Option<usize>,
    pub per_page: Option<usize>,
}

#[derive(Serialize)]
pub struct ListAnnouncementsResponse {
    pub announcements: Vec<ListedAnnouncement>,
    pub total: usize,
}

pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<ListAnnouncementsQuery>,
) -> Result<Json<ListAnnouncementsResponse>> {
    // page is 1-based; pagination only applies when per_page is given.
    let count = params.per_page;
    let offset = match (params.page, params.per_page) {
        (Some(page), Some(per_page)) => Some(page.saturating_sub(1) * per_page),
        _ => None,
    };

    let list_params = ListParams {
        column: params.column.unwrap_or_default(),
        order: params.order.unwrap_or_default(),
        q: params.q.unwrap_or_default(),
        offset,
        count,
    };

    let (announcements, total) = state
        .service_context
        .announcement_service
        .list(&list_params)
        .await?;

    Ok(Json(ListAnnouncementsResponse {
        announcements,
        total,
    }))
}

#[derive(Serialize)]
pub struct AnnouncementDetail {
    #[serde(flatten)]
    pub announcement: ListedAnnouncement,
    pub options: ComposeOptions,
}

pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<AnnouncementDetail>> {
    let announcement = state
        .service_context
        .announcement_service
        .get(id)
        .await?
        .ok_or_else(|| not_found(id))?;

    let catalog = &state.service_context.catalog_service;
    let programme_name = match announcement.programme_id {
        Some(programme_id) => catalog.programme_name(programme_id).await?,
        None => None,
    };
    let options = catalog.announcement_options(announcement.programme_id).await?;

    Ok(Json(AnnouncementDetail {
        announcement: ListedAnnouncement::new(announcement, programme_name),
        options,
    }))
}

pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(input): Json<AnnouncementInput>,
) -> Result<(StatusCode, Json<Announcement>)> {
    let created = state
        .service_context
        .announcement_service
        .create(input, &user.user)
        .await?;

    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<AnnouncementInput>,
) -> Result<Json<Announcement>> {
    let updated = state
        .service_context
        .announcement_service
        .update(id, input)
        .await?;

    Ok(Json(updated))
}

pub async fn delete(State(state): State<AppState>, Path(id): Path<i64>) -> Result<StatusCode> {
    state.service_context.announcement_service.delete(id).await?;

    Ok(StatusCode::NO_CONTENT)
}

#[derive(Serialize)]
pub struct RecipientPreview {
    pub username: String,
    pub display_name: String,
    pub email: String,
}

/// Audience preview for the compose form, via the course/group-aware
/// resolver.
pub async fn recipients(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<RecipientPreview>>> {
    let announcement = state
        .service_context
        .announcement_service
        .get(id)
        .await?
        .ok_or_else(|| not_found(id))?;

    let users = state
        .service_context
        .announcement_service
        .recipients_on_course(&announcement)
        .await?;

    Ok(Json(
        users
            .into_iter()
            .map(|user| RecipientPreview {
                display_name: user.display_name(),
                username: user.username,
                email: user.email,
            })
            .collect(),
    ))
}

fn not_found(id: i64) -> AppError {
    AppError::NotFound(format!("Announcement with id {} does not exist", id))
}
