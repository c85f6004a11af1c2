//! Typed builder for User.

use std::sync::Arc;

use sqlx::{Pool, Postgres};

use crate::crypto::PasswordManager;
use crate::user::{User, UserService, normalize_email};

/// [`User`] builder. `Email` is a typed-state marker: a user cannot be
/// built without its unique key.
#[derive(Debug, Clone)]
pub struct UserBuilder<Email> {
    email: Email,
    name: String,
    password: String,
}

/// Value is missing on [`UserBuilder`].
#[derive(Debug, Clone)]
pub struct Missing;

/// Value is present on [`UserBuilder`].
#[derive(Debug, Clone)]
pub struct Present<T>(pub T);

impl UserBuilder<Missing> {
    /// Create a new [`UserBuilder`].
    pub fn new() -> Self {
        Self {
            email: Missing,
            name: String::default(),
            password: String::default(),
        }
    }

    /// Update `email` field on [`UserBuilder`]; normalized on entry.
    pub fn email(self, email: impl AsRef<str>) -> UserBuilder<Present<String>> {
        UserBuilder {
            email: Present(normalize_email(email.as_ref())),
            name: self.name,
            password: self.password,
        }
    }
}

impl Default for UserBuilder<Missing> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Email> UserBuilder<Email> {
    /// Update `name` field on [`UserBuilder`].
    pub fn name(mut self, name: impl ToString) -> Self {
        self.name = name.to_string();
        self
    }

    /// Update `password` field on [`UserBuilder`].
    pub fn password(mut self, password: impl ToString) -> Self {
        self.password = password.to_string();
        self
    }
}

impl UserBuilder<Present<String>> {
    /// Build a [`User`] with `email`.
    ///
    /// Privilege flags and `is_active` are hardwired false here; only
    /// [`UserService::create_superuser`] may raise them.
    pub fn build(
        self,
        pool: Pool<Postgres>,
        crypto: Arc<PasswordManager>,
    ) -> UserService {
        let user = User {
            email: self.email.0,
            name: self.name,
            password: self.password,
            ..Default::default()
        };

        UserService::new(user, pool, crypto)
    }
}
