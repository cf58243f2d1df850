pub mod handlers;
pub mod middleware;
pub mod state;

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};
use std::sync::Arc;

use crate::{config::Settings, service::ServiceContext};
use state::AppState;

pub fn create_app(service_context: Arc<ServiceContext>, settings: Arc<Settings>) -> Router {
    let app_state = AppState::new(service_context, settings);

    Router::new()
        // Root and health endpoints
        .route("/", get(handlers::root::root))
        .route("/health", get(handlers::root::health_check))

        // API routes
        .nest("/api/announcements", announcement_routes(app_state.clone()))
        .nest("/api/catalog", catalog_routes(app_state.clone()))

        // Add state to the router
        .with_state(app_state)

        // Middleware
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive()) // Configure properly for production
        .layer(TraceLayer::new_for_http())
}

fn announcement_routes(state: AppState) -> Router<AppState> {
    Router::new()
        // Feed routes for any signed-in user
        .route("/visible", get(handlers::feed::visible))
        .route("/unread-count", get(handlers::feed::unread_count))
        .route("/:id/read", post(handlers::feed::mark_read))
        .route("/:id/read", delete(handlers::feed::mark_unread))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::require_user,
        ))
        // Management routes - staff only
        .merge(
            Router::new()
                .route("/", get(handlers::announcements::list))
                .route("/", post(handlers::announcements::create))
                .route("/:id", get(handlers::announcements::get))
                .route("/:id", put(handlers::announcements::update))
                .route("/:id", delete(handlers::announcements::delete))
                .route("/:id/recipients", get(handlers::announcements::recipients))
                .route_layer(axum::middleware::from_fn_with_state(
                    state,
                    middleware::auth::require_staff,
                )),
        )
}

fn catalog_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/master-courses", post(handlers::catalog::master_courses))
        .route("/scheduled-courses", post(handlers::catalog::scheduled_courses))
        .route(
            "/scheduled-course-groups",
            post(handlers::catalog::scheduled_course_groups),
        )
        .route("/compose-options", get(handlers::catalog::compose_options))
        .route_layer(axum::middleware::from_fn_with_state(
            state,
            middleware::auth::require_staff,
        ))
}
