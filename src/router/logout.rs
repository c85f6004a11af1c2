//! Session teardown. POST only; anything else on the path is a 404.

use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum_extra::extract::CookieJar;

use crate::AppState;
use crate::error::{Result, ServerError};
use crate::router::found;
use crate::session::{SESSION_COOKIE, removal_cookie};

pub const LOGIN_PATH: &str = "/login";

/// Destroy the caller's session and clear the cookie.
pub async fn handler(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<Response> {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        state.sessions.destroy(cookie.value()).await?;
        tracing::debug!("session destroyed");
    }

    let jar = jar.remove(removal_cookie());
    Ok((jar, found(LOGIN_PATH)).into_response())
}

/// Method fallback: the endpoint does not exist for non-POST requests.
pub async fn not_found() -> ServerError {
    ServerError::NotFound
}
