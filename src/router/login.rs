//! Login flow, gated on activation state.
//!
//! A session is only established when the user exists, the password
//! verifies and the account is active. Whichever condition fails, the
//! response is byte-identical; account enumeration gets no signal.

use axum::Json;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum_extra::extract::CookieJar;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::AppState;
use crate::error::{Result, ServerError};
use crate::router::{FormDescriptor, ValidJson, found};
use crate::session::{SESSION_COOKIE, session_cookie};
use crate::user::{UserRepository, normalize_email};

/// Where a logged-in caller lands.
pub const HOME_PATH: &str = "/";

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct Body {
    /// Account email; the field keeps its historical form name.
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// Whether the request carries a live session.
pub(crate) async fn authenticated(
    state: &AppState,
    jar: &CookieJar,
) -> Result<bool> {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        return Ok(state.sessions.find(cookie.value()).await?.is_some());
    }
    Ok(false)
}

/// Login form; an authenticated caller is redirected away.
pub async fn form(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<Response> {
    if authenticated(&state, &jar).await? {
        return Ok(found(HOME_PATH).into_response());
    }

    Ok(Json(FormDescriptor {
        fields: &["username", "password"],
    })
    .into_response())
}

/// Handler to establish a session.
pub async fn handler(
    State(state): State<AppState>,
    jar: CookieJar,
    ValidJson(body): ValidJson<Body>,
) -> Result<Response> {
    // Idempotent no-op for an already-authenticated caller; credentials
    // are not re-evaluated.
    if authenticated(&state, &jar).await? {
        return Ok(found(HOME_PATH).into_response());
    }

    let email = normalize_email(&body.username);
    let repo = UserRepository::new(state.db.postgres.clone());
    let user = repo
        .find_by_email(&email)
        .await?
        .ok_or(ServerError::Authentication)?;

    state
        .crypto
        .verify_password(&body.password, &user.password)
        .map_err(|_| ServerError::Authentication)?;

    if !user.is_active {
        return Err(ServerError::Authentication);
    }

    let id = state.sessions.create(&user.email).await?;
    tracing::info!(name = %user.name, "session established");

    Ok((jar.add(session_cookie(id)), found(HOME_PATH)).into_response())
}

#[cfg(test)]
pub(super) mod tests {
    use axum::http::{Method, StatusCode, header};
    use http_body_util::BodyExt;
    use serde_json::json;
    use sqlx::{Pool, Postgres};

    use crate::user::UserRepository;
    use crate::{app, make_request, router};

    pub(crate) async fn register(app: axum::Router, email: &str) {
        let body = json!({
            "email": email,
            "name": "Alice",
            "password1": "Secret123!",
            "password2": "Secret123!",
        })
        .to_string();
        let response =
            make_request(app, Method::POST, "/registration", body, None).await;
        assert_eq!(response.status(), StatusCode::FOUND);
    }

    pub(crate) async fn activate(
        app: axum::Router,
        pool: &Pool<Postgres>,
        email: &str,
    ) {
        let user = UserRepository::new(pool.clone())
            .find_by_email(email)
            .await
            .unwrap()
            .expect("user row");
        let path = format!(
            "/activation/{}/{}",
            user.activation_token1, user.activation_token2
        );
        let response =
            make_request(app, Method::GET, &path, String::default(), None)
                .await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    pub(crate) fn login_body(username: &str, password: &str) -> String {
        json!({ "username": username, "password": password }).to_string()
    }

    /// Pull the session ID out of the login response.
    pub(crate) fn session_of(
        response: &axum::http::Response<axum::body::Body>,
    ) -> String {
        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .expect("set-cookie header")
            .to_str()
            .unwrap();
        cookie
            .split(';')
            .next()
            .unwrap()
            .to_owned()
    }

    #[sqlx::test]
    async fn test_gate_conditions_share_response_shape(pool: Pool<Postgres>) {
        let state = router::state(pool.clone());
        let app = app(state);

        // alice is pending, carol is active.
        register(app.clone(), "alice@example.com").await;
        register(app.clone(), "carol@example.com").await;
        activate(app.clone(), &pool, "carol@example.com").await;

        let attempts = [
            // No such user.
            login_body("nobody@example.com", "Secret123!"),
            // Wrong password on an active account.
            login_body("carol@example.com", "WrongPass1!"),
            // Correct password, account not yet activated.
            login_body("alice@example.com", "Secret123!"),
        ];

        let mut observed = Vec::new();
        for body in attempts {
            let response = make_request(
                app.clone(),
                Method::POST,
                "/login",
                body,
                None,
            )
            .await;
            let status = response.status();
            assert!(response.headers().get(header::SET_COOKIE).is_none());
            let bytes =
                response.into_body().collect().await.unwrap().to_bytes();
            observed.push((status, bytes));
        }

        assert_eq!(observed[0].0, StatusCode::OK);
        assert_eq!(observed[0], observed[1]);
        assert_eq!(observed[1], observed[2]);
    }

    #[sqlx::test]
    async fn test_login_succeeds_after_activation(pool: Pool<Postgres>) {
        let state = router::state(pool.clone());
        let app = app(state);

        register(app.clone(), "alice@example.com").await;

        // Activation window: authentication is refused first.
        let response = make_request(
            app.clone(),
            Method::POST,
            "/login",
            login_body("alice@example.com", "Secret123!"),
            None,
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        activate(app.clone(), &pool, "alice@example.com").await;

        let response = make_request(
            app.clone(),
            Method::POST,
            "/login",
            login_body("alice@example.com", "Secret123!"),
            None,
        )
        .await;
        assert_eq!(response.status(), StatusCode::FOUND);
        let session = session_of(&response);

        // The session now redirects the login form away.
        let response = make_request(
            app,
            Method::GET,
            "/login",
            String::default(),
            Some(&session),
        )
        .await;
        assert_eq!(response.status(), StatusCode::FOUND);
    }

    #[sqlx::test]
    async fn test_authenticated_login_short_circuits(pool: Pool<Postgres>) {
        let state = router::state(pool.clone());
        let app = app(state);

        register(app.clone(), "alice@example.com").await;
        activate(app.clone(), &pool, "alice@example.com").await;

        let response = make_request(
            app.clone(),
            Method::POST,
            "/login",
            login_body("alice@example.com", "Secret123!"),
            None,
        )
        .await;
        let session = session_of(&response);

        // Even garbage credentials redirect: nothing is re-evaluated.
        let response = make_request(
            app,
            Method::POST,
            "/login",
            login_body("alice@example.com", "not-checked-at-all"),
            Some(&session),
        )
        .await;
        assert_eq!(response.status(), StatusCode::FOUND);
        assert!(response.headers().get(header::SET_COOKIE).is_none());
    }

    #[sqlx::test]
    async fn test_malformed_login_body_is_bad_request(pool: Pool<Postgres>) {
        let state = router::state(pool);
        let app = app(state);

        let response = make_request(
            app,
            Method::POST,
            "/login",
            "{not json".to_owned(),
            None,
        )
        .await;

        // Broken JSON takes the same rejection path as every other body
        // on the auth surface.
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(response.headers().get(header::SET_COOKIE).is_none());
    }

    #[sqlx::test]
    async fn test_login_accepts_unnormalized_email(pool: Pool<Postgres>) {
        let state = router::state(pool.clone());
        let app = app(state);

        register(app.clone(), "alice@example.com").await;
        activate(app.clone(), &pool, "alice@example.com").await;

        let response = make_request(
            app,
            Method::POST,
            "/login",
            login_body("Alice@Example.com", "Secret123!"),
            None,
        )
        .await;
        assert_eq!(response.status(), StatusCode::FOUND);
    }
}
