use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::auth::dto::PublicUser;
use crate::auth::extractors::Authenticated;
use crate::auth::handlers::{invalid_username, is_valid_email, is_valid_username};
use crate::auth::password::hash_password;
use crate::error::ApiError;
use crate::state::AppState;

use super::dto::{
    AdminCreateUser, MessageResponse, Pagination, UserListQuery, UserListResponse,
    UserMutationResponse, UserResponse,
};
use super::guard::{ensure_admin, ensure_can_manage};
use super::repo::{NewUser, Role, User, UserChanges};

// Clamped paging window; an absurd page saturates to an offset past the end
// (empty result) instead of overflowing.
fn list_window(page: i64, limit: i64) -> (i64, i64, i64) {
    let page = page.max(1);
    let limit = limit.clamp(1, 100);
    (page, limit, (page - 1).saturating_mul(limit))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route(
            "/users/:username",
            get(get_user).put(update_user).delete(delete_user),
        )
}

#[instrument(skip(state, actor))]
async fn list_users(
    State(state): State<AppState>,
    Authenticated(actor): Authenticated,
    Query(query): Query<UserListQuery>,
) -> Result<Json<UserListResponse>, ApiError> {
    ensure_admin(&actor)?;

    let (page, limit, offset) = list_window(query.page, query.limit);

    let users = User::list(&state.db, query.role, limit, offset).await?;
    let total = User::count(&state.db, query.role).await?;

    Ok(Json(UserListResponse {
        users: users.into_iter().map(PublicUser::from).collect(),
        pagination: Pagination::new(page, limit, total),
    }))
}

#[instrument(skip(state, actor, payload))]
async fn create_user(
    State(state): State<AppState>,
    Authenticated(actor): Authenticated,
    Json(mut payload): Json<AdminCreateUser>,
) -> Result<(StatusCode, Json<UserMutationResponse>), ApiError> {
    ensure_admin(&actor)?;

    payload.email = payload.email.trim().to_lowercase();
    if payload.email.is_empty() || payload.username.trim().is_empty() {
        return Err(ApiError::Validation(
            "Email and username are required".into(),
        ));
    }
    if !is_valid_email(&payload.email) {
        return Err(ApiError::Validation("Invalid email".into()));
    }
    if !is_valid_username(&payload.username) {
        return Err(invalid_username());
    }
    if let Some(password) = &payload.password {
        if password.len() < 8 {
            return Err(ApiError::Validation(
                "Password must be at least 8 characters long".into(),
            ));
        }
    }

    if User::email_or_username_taken(&state.db, &payload.email, &payload.username).await? {
        return Err(ApiError::Conflict(
            "User with this email or username already exists".into(),
        ));
    }

    let hash = payload
        .password
        .as_deref()
        .map(hash_password)
        .transpose()?;
    let user = User::create(
        &state.db,
        NewUser {
            email: &payload.email,
            password_hash: hash.as_deref(),
            username: &payload.username,
            phone: payload.phone.as_deref(),
            location: payload.location.as_deref(),
            role: payload.role,
        },
    )
    .await?;

    info!(user_id = user.id, actor_id = actor.id, "user created by admin");
    Ok((
        StatusCode::CREATED,
        Json(UserMutationResponse {
            message: "User created successfully",
            user: user.into(),
        }),
    ))
}

#[instrument(skip(state, actor))]
async fn get_user(
    State(state): State<AppState>,
    Authenticated(actor): Authenticated,
    Path(username): Path<String>,
) -> Result<Json<UserResponse>, ApiError> {
    ensure_can_manage(&actor, &username)?;

    let user = User::find_by_username(&state.db, &username)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    Ok(Json(UserResponse { user: user.into() }))
}

#[instrument(skip(state, actor, changes))]
async fn update_user(
    State(state): State<AppState>,
    Authenticated(actor): Authenticated,
    Path(username): Path<String>,
    Json(mut changes): Json<UserChanges>,
) -> Result<Json<UserMutationResponse>, ApiError> {
    ensure_can_manage(&actor, &username)?;

    let target = User::find_by_username(&state.db, &username)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    // Renaming to the current name is a no-op, not a conflict.
    if changes.username.as_deref() == Some(target.username.as_str()) {
        changes.username = None;
    }
    if changes.is_empty() {
        return Err(ApiError::Validation("No valid fields to update".into()));
    }

    // Role is admin-only, even on one's own record; a plain user sending a
    // role field is denied rather than silently ignored.
    if changes.role.is_some() && actor.role != Role::Admin {
        warn!(actor_id = actor.id, "non-admin attempted role change");
        return Err(ApiError::Forbidden("Only admins may change roles".into()));
    }

    if let Some(email) = &changes.email {
        if !is_valid_email(email) {
            return Err(ApiError::Validation("Invalid email".into()));
        }
    }
    if let Some(new_username) = &changes.username {
        if !is_valid_username(new_username) {
            return Err(invalid_username());
        }
        if User::username_taken(&state.db, new_username).await? {
            return Err(ApiError::Conflict("Username already exists".into()));
        }
    }

    let user = User::update(&state.db, target.id, &changes).await?;
    info!(user_id = user.id, actor_id = actor.id, "user updated");
    Ok(Json(UserMutationResponse {
        message: "User updated successfully",
        user: user.into(),
    }))
}

#[instrument(skip(state, actor))]
async fn delete_user(
    State(state): State<AppState>,
    Authenticated(actor): Authenticated,
    Path(username): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    ensure_can_manage(&actor, &username)?;

    let target = User::find_by_username(&state.db, &username)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    User::delete(&state.db, target.id).await?;
    info!(user_id = target.id, actor_id = actor.id, "user deleted");
    Ok(Json(MessageResponse {
        message: "User deleted successfully",
    }))
}
