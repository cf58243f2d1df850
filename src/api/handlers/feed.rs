use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::{
    api::{middleware::auth::CurrentUser, state::AppState},
    domain::FeedItem,
    error::Result,
};

#[derive(Debug, Deserialize)]
pub struct FeedQuery {
    pub urgent_only: Option<bool>,
}

/// The caller's current feed: visible announcements annotated with
/// read state, capped by the feed limit.
pub async fn visible(
    State(state): State<AppState>,
    Query(params): Query<FeedQuery>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<Vec<FeedItem>>> {
    let items = state
        .service_context
        .announcement_service
        .feed(&user.user, Utc::now(), params.urgent_only.unwrap_or(false))
        .await?;

    Ok(Json(items))
}

#[derive(Serialize)]
pub struct UnreadCountResponse {
    pub announcements: usize,
}

pub async fn unread_count(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<UnreadCountResponse>> {
    let announcements = state
        .service_context
        .announcement_service
        .unread_count(&user.user, Utc::now())
        .await?;

    Ok(Json(UnreadCountResponse { announcements }))
}

pub async fn mark_read(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Extension(user): Extension<CurrentUser>,
) -> Result<(StatusCode, Json<FeedItem>)> {
    let item = state
        .service_context
        .announcement_service
        .mark_read(&user.user, id)
        .await?;

    Ok((StatusCode::CREATED, Json(item)))
}

pub async fn mark_unread(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Extension(user): Extension<CurrentUser>,
) -> Result<StatusCode> {
    state
        .service_context
        .announcement_service
        .mark_unread(&user.user, id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
