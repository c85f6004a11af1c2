//! Server-side sessions keyed by an opaque identifier.
//!
//! Replaces framework-managed ambient session state: the cookie only ever
//! carries a random ID, the record of who is authenticated lives in the
//! `sessions` table.

use axum_extra::extract::cookie::{Cookie, SameSite};
use sqlx::{Pool, Postgres};

use crate::error::Result;
use crate::token;

/// Name of the cookie carrying the session ID.
pub const SESSION_COOKIE: &str = "sesame_session";

#[derive(Clone)]
pub struct SessionStore {
    pool: Pool<Postgres>,
}

impl SessionStore {
    /// Create a new [`SessionStore`].
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Open a session for `email` and return its opaque ID.
    pub async fn create(&self, email: &str) -> Result<String> {
        let id = token::session_token();

        sqlx::query(
            r#"INSERT INTO sessions (id, user_email) VALUES ($1, $2)"#,
        )
        .bind(&id)
        .bind(email)
        .execute(&self.pool)
        .await?;

        Ok(id)
    }

    /// Resolve a session ID to the authenticated user's email.
    pub async fn find(&self, id: &str) -> Result<Option<String>> {
        let email: Option<(String,)> = sqlx::query_as(
            r#"SELECT user_email FROM sessions WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(email.map(|row| row.0))
    }

    /// Destroy a session. Destroying an unknown ID is a no-op.
    pub async fn destroy(&self, id: &str) -> Result<()> {
        sqlx::query(r#"DELETE FROM sessions WHERE id = $1"#)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

/// Build the session cookie sent on successful login.
pub fn session_cookie(id: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, id))
        .http_only(true)
        .same_site(SameSite::Lax)
        .path("/")
        .build()
}

/// Cookie used to clear the session on logout.
pub fn removal_cookie() -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, ""))
        .path("/")
        .build()
}
