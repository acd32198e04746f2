use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::cookie::CookieJar;
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, instrument, warn};

use crate::error::ApiError;
use crate::state::AppState;
use crate::users::repo::{NewUser, Role, User};

use super::dto::{AuthResponse, LoginRequest, MeResponse, RegisterRequest};
use super::extractors::CurrentUser;
use super::password::{hash_password, verify_password};
use super::session;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/auth/me", get(me))
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

// Usernames are written into a Set-Cookie value verbatim, so the charset
// must stay header-safe: no separators, no control characters.
pub(crate) fn is_valid_username(username: &str) -> bool {
    lazy_static! {
        static ref USERNAME_RE: Regex = Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_.+-]{0,63}$").unwrap();
    }
    USERNAME_RE.is_match(username)
}

pub(crate) fn invalid_username() -> ApiError {
    ApiError::Validation("Username may only contain letters, digits and . _ + - characters".into())
}

/// Local part of the email, used when registration omits a username.
fn username_from_email(email: &str) -> String {
    email.split('@').next().unwrap_or(email).to_string()
}

// Unknown email and wrong password collapse into one answer so a caller
// cannot probe which accounts exist.
fn invalid_credentials() -> ApiError {
    ApiError::Authentication("Invalid email or password".into())
}

#[instrument(skip(state, jar, payload))]
async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(mut payload): Json<RegisterRequest>,
) -> Result<(StatusCode, CookieJar, Json<AuthResponse>), ApiError> {
    payload.email = payload.email.trim().to_lowercase();

    if payload.email.is_empty() || payload.password.is_empty() {
        return Err(ApiError::Validation(
            "Email and password are required".into(),
        ));
    }
    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(ApiError::Validation("Invalid email".into()));
    }
    if payload.password.len() < 8 {
        return Err(ApiError::Validation(
            "Password must be at least 8 characters long".into(),
        ));
    }

    let username = payload
        .username
        .filter(|u| !u.trim().is_empty())
        .unwrap_or_else(|| username_from_email(&payload.email));
    if !is_valid_username(&username) {
        warn!(email = %payload.email, "registration with header-unsafe username");
        return Err(invalid_username());
    }

    // Friendly pre-check; the unique indexes stay authoritative under
    // concurrent registration.
    if User::email_or_username_taken(&state.db, &payload.email, &username).await? {
        warn!(email = %payload.email, %username, "registration collision");
        return Err(ApiError::Conflict(
            "User already exists with this email or username".into(),
        ));
    }

    let hash = hash_password(&payload.password)?;
    let user = User::create(
        &state.db,
        NewUser {
            email: &payload.email,
            password_hash: Some(&hash),
            username: &username,
            phone: payload.phone.as_deref(),
            location: payload.location.as_deref(),
            role: Role::User,
        },
    )
    .await?;

    let jar = session::issue(jar, &user, &state.config);
    info!(user_id = user.id, email = %user.email, "user registered");
    Ok((
        StatusCode::CREATED,
        jar,
        Json(AuthResponse {
            message: "User created successfully",
            user: user.into(),
        }),
    ))
}

#[instrument(skip(state, jar, payload))]
async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(mut payload): Json<LoginRequest>,
) -> Result<(CookieJar, Json<AuthResponse>), ApiError> {
    payload.email = payload.email.trim().to_lowercase();

    if payload.email.is_empty() || payload.password.is_empty() {
        return Err(ApiError::Validation(
            "Email and password are required".into(),
        ));
    }

    let Some(user) = User::find_by_email(&state.db, &payload.email).await? else {
        warn!(email = %payload.email, "login with unknown email");
        return Err(invalid_credentials());
    };

    // Accounts created by an admin without a password cannot log in.
    let ok = user
        .password_hash
        .as_deref()
        .map(|hash| verify_password(&payload.password, hash))
        .unwrap_or(false);
    if !ok {
        warn!(user_id = user.id, "login with invalid password");
        return Err(invalid_credentials());
    }

    let jar = session::issue(jar, &user, &state.config);
    info!(user_id = user.id, email = %user.email, "user logged in");
    Ok((
        jar,
        Json(AuthResponse {
            message: "Login successful",
            user: user.into(),
        }),
    ))
}

async fn logout(jar: CookieJar) -> (CookieJar, Json<serde_json::Value>) {
    (
        session::clear(jar),
        Json(serde_json::json!({ "message": "Logged out" })),
    )
}

#[instrument(skip_all)]
async fn me(CurrentUser(user): CurrentUser) -> Result<Json<MeResponse>, ApiError> {
    let user = user.ok_or_else(|| ApiError::Authentication("Not authenticated".into()))?;
    Ok(Json(MeResponse { user: user.into() }))
}
