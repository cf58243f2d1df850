use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

pub async fn root() -> impl IntoResponse {
    Json(json!({
        "name": "Noticeboard API",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Targeted announcements with read tracking for the learning platform",
        "status": "operational",
        "endpoints": {
            "health": "/health",
            "announcements": "/api/announcements",
            "catalog": "/api/catalog"
        }
    }))
}

pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    })))
}
