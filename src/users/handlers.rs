use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::handlers::normalized_email,
    auth::password::hash_password,
    error::{ApiError, ValidatedJson},
    state::AppState,
    users::dto::{CreateUserRequest, MessageResponse, UpdateUserRequest, UserOut},
    users::repo::User,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route(
            "/users/:id",
            get(get_user).put(update_user).delete(delete_user),
        )
}

fn user_not_found(id: Uuid) -> ApiError {
    ApiError::NotFound(format!("User {id} does not exist"))
}

#[instrument(skip(state))]
pub async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<UserOut>>, ApiError> {
    let users = User::list_all(&state.db).await?;
    Ok(Json(users.into_iter().map(UserOut::from).collect()))
}

#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<UserOut>, ApiError> {
    let user = User::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| user_not_found(id))?;
    Ok(Json(UserOut::from(user)))
}

#[instrument(skip(state, payload))]
pub async fn create_user(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<CreateUserRequest>,
) -> Result<(StatusCode, Json<MessageResponse>), ApiError> {
    let username = payload.username.trim();
    if username.is_empty() || payload.password.is_empty() {
        warn!("missing user fields");
        return Err(ApiError::Validation);
    }
    let email = normalized_email(&payload.email)?;

    let hash = hash_password(&payload.password, &state.config.hash)?;
    // A duplicate email violates the unique index and surfaces as Conflict.
    let user = User::create(&state.db, username, &email, &hash).await?;

    info!(user_id = %user.id, email = %user.email, "user created");
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            message: format!("{} was added!", user.email),
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<UpdateUserRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let username = payload.username.trim();
    if username.is_empty() {
        warn!("missing user fields");
        return Err(ApiError::Validation);
    }
    let email = normalized_email(&payload.email)?;

    User::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| user_not_found(id))?;

    // Touches username and email only; the password hash is unreachable
    // through this path. Duplicate emails surface as Conflict.
    let user = User::update_profile(&state.db, id, username, &email).await?;

    info!(user_id = %user.id, "user updated");
    Ok(Json(MessageResponse {
        message: format!("{} was updated!", user.id),
    }))
}

#[instrument(skip(state))]
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, ApiError> {
    let user = User::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| user_not_found(id))?;

    User::delete(&state.db, id).await?;

    info!(user_id = %user.id, email = %user.email, "user removed");
    Ok(Json(MessageResponse {
        message: format!("{} was removed!", user.email),
    }))
}
