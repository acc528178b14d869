use axum::{extract::State, http::StatusCode, response::Json};

use crate::errors::Result;
use crate::handlers::AppState;
use crate::models::{CreateUserRequest, Registration, UserListResponse};

pub async fn create_user(
    State(state): State<AppState>,
    Json(request): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<Registration>)> {
    let registration = state.directory.register_user(&request.username).await?;

    let status = if registration.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(registration)))
}

pub async fn list_users(State(state): State<AppState>) -> Result<Json<UserListResponse>> {
    let users = state.directory.list_users().await?;
    Ok(Json(UserListResponse { users }))
}
