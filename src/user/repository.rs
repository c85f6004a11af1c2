//! Handle database requests.

use serde::Serialize;
use sqlx::{Pool, Postgres};
use validator::{ValidationError, ValidationErrors};

use crate::error::Result;
use crate::user::User;

const SELECT_USER: &str = r#"SELECT
        email, name, password, is_active, is_staff, is_superuser,
        activation_token1, activation_token2, created_at
    FROM users WHERE email = $1"#;

/// Identity of a freshly activated account.
#[derive(Clone, Debug, PartialEq, Serialize, sqlx::FromRow)]
pub struct ActivatedUser {
    pub email: String,
    pub name: String,
}

#[derive(Clone)]
pub struct UserRepository {
    pool: Pool<Postgres>,
}

impl UserRepository {
    /// Create a new [`UserRepository`].
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Insert [`User`] into database.
    ///
    /// Email uniqueness is the primary-key constraint: under concurrent
    /// inserts of the same address exactly one succeeds, the rest surface
    /// as the standard duplicate-email validation failure.
    pub async fn insert(&self, user: &User) -> Result<()> {
        sqlx::query(
            r#"INSERT INTO users
                (email, name, password, is_active, is_staff, is_superuser,
                 activation_token1, activation_token2)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)"#,
        )
        .bind(&user.email)
        .bind(&user.name)
        .bind(&user.password)
        .bind(user.is_active)
        .bind(user.is_staff)
        .bind(user.is_superuser)
        .bind(&user.activation_token1)
        .bind(&user.activation_token2)
        .execute(&self.pool)
        .await
        .map_err(|err| {
            if err
                .as_database_error()
                .is_some_and(|db| db.is_unique_violation())
            {
                return duplicate_email().into();
            }
            crate::error::ServerError::Sql(err)
        })?;

        Ok(())
    }

    /// Find user using the normalized `email` key.
    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(SELECT_USER)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    /// Flip `is_active` for the account matching both tokens, exactly once.
    ///
    /// The conditional UPDATE is the whole state machine: a pair that does
    /// not match any row, matches only one token, or matches an
    /// already-active row all touch zero rows and return `None`.
    pub async fn activate(
        &self,
        token1: &str,
        token2: &str,
    ) -> Result<Option<ActivatedUser>> {
        let user = sqlx::query_as::<_, ActivatedUser>(
            r#"UPDATE users SET is_active = TRUE
                WHERE activation_token1 = $1 AND activation_token2 = $2
                  AND is_active = FALSE
                RETURNING email, name"#,
        )
        .bind(token1)
        .bind(token2)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }
}

/// The duplicate-email failure, shaped like any other field error so a
/// losing racer in a concurrent registration sees the normal form error.
pub(crate) fn duplicate_email() -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    errors.add(
        "email",
        ValidationError::new("duplicate_email")
            .with_message("A user with that email already exists.".into()),
    );
    errors
}
