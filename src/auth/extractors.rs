use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use axum_extra::extract::cookie::CookieJar;
use tracing::error;

use crate::error::ApiError;
use crate::state::AppState;
use crate::users::repo::User;

use super::session::USER_ID_COOKIE;

/// Resolves the session cookie to a user, if any. Never rejects: a missing
/// cookie, an unknown id and a store outage all read as "no session".
pub struct CurrentUser(pub Option<User>);

/// Strict variant for handlers that must not run unauthenticated.
pub struct Authenticated(pub User);

async fn resolve(parts: &Parts, state: &AppState) -> Option<User> {
    let jar = CookieJar::from_headers(&parts.headers);
    let id = jar.get(USER_ID_COOKIE)?.value().parse::<i64>().ok()?;
    match User::find_by_id(&state.db, id).await {
        Ok(user) => user,
        Err(e) => {
            // Fail closed: the caller sees an unauthenticated request.
            error!(error = %e, user_id = id, "session lookup failed");
            None
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(CurrentUser(resolve(parts, state).await))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for Authenticated {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        resolve(parts, state)
            .await
            .map(Authenticated)
            .ok_or_else(|| ApiError::Authentication("Authentication required".into()))
    }
}
