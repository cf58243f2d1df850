use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::{
    api::state::AppState, domain::User, error::AppError, repository::UserRepository,
};

/// The account resolved from the SSO proxy's remote-user header.
#[derive(Clone)]
pub struct CurrentUser {
    pub user: User,
}

async fn resolve_user(state: &AppState, request: &Request) -> Result<User, AppError> {
    let header_name = state.settings.auth.remote_user_header.as_str();

    let username = request
        .headers()
        .get(header_name)
        .and_then(|value| value.to_str().ok())
        .ok_or(AppError::Unauthorized)?;

    let user = state
        .service_context
        .user_repo
        .find_by_username(username)
        .await?
        .ok_or(AppError::Unauthorized)?;

    if !user.is_active {
        return Err(AppError::Unauthorized);
    }

    Ok(user)
}

pub async fn require_user(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let user = resolve_user(&state, &request).await?;

    request.extensions_mut().insert(CurrentUser { user });

    Ok(next.run(request).await)
}

pub async fn require_staff(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let user = resolve_user(&state, &request).await?;

    if !user.is_staff {
        return Err(AppError::Forbidden);
    }

    request.extensions_mut().insert(CurrentUser { user });

    Ok(next.run(request).await)
}
