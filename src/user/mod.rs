mod builder;
mod repository;
mod service;

pub use builder::*;
pub use repository::*;
pub use service::*;

use serde::{Deserialize, Serialize};

/// User as saved on database.
#[derive(
    Clone, Debug, Default, PartialEq, Serialize, Deserialize, sqlx::FromRow,
)]
pub struct User {
    /// Unique account key, always stored lowercase.
    pub email: String,
    pub name: String,
    #[serde(skip)]
    pub password: String,
    /// Single authorization gate for login. False until the activation
    /// link is presented.
    pub is_active: bool,
    /// Never settable through the public registration path.
    pub is_staff: bool,
    /// Never settable through the public registration path.
    pub is_superuser: bool,
    #[serde(skip)]
    pub activation_token1: String,
    #[serde(skip)]
    pub activation_token2: String,
    pub created_at: chrono::NaiveDate,
}

impl User {
    /// Start building a new [`User`].
    pub fn builder() -> UserBuilder<Missing> {
        UserBuilder::new()
    }
}

/// Normalization policy: the whole address is lowercased, local part
/// included. Uniqueness is enforced on the normalized form.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
