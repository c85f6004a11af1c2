use std::sync::Arc;

use sqlx::{Pool, Postgres};

use crate::crypto::PasswordManager;
use crate::error::Result;
use crate::token;
use crate::user::{User, UserRepository};

/// User manager.
#[derive(Clone)]
pub struct UserService {
    pub repo: UserRepository,
    pub crypto: Arc<PasswordManager>,
    pub data: User,
}

impl UserService {
    /// Create a new [`UserService`].
    pub fn new(
        user: User,
        pool: Pool<Postgres>,
        crypto: Arc<PasswordManager>,
    ) -> Self {
        Self {
            data: user,
            repo: UserRepository::new(pool),
            crypto,
        }
    }

    /// Create builded user.
    ///
    /// Hash password and assign both activation tokens from independent
    /// randomness. The account starts pending: `is_active` is false until
    /// the link is presented.
    pub async fn create_user(mut self) -> Result<Self> {
        self.data.password = self.crypto.hash_password(&self.data.password)?;
        self.data.activation_token1 = token::activation_token();
        self.data.activation_token2 = token::activation_token();
        self.data.is_active = false;

        self.repo.insert(&self.data).await?;
        Ok(self)
    }

    /// Create a privileged account: staff, superuser and active in one
    /// insert. Only reachable from administrative code paths.
    pub async fn create_superuser(mut self) -> Result<Self> {
        self.data.password = self.crypto.hash_password(&self.data.password)?;
        self.data.activation_token1 = token::activation_token();
        self.data.activation_token2 = token::activation_token();
        self.data.is_staff = true;
        self.data.is_superuser = true;
        self.data.is_active = true;

        self.repo.insert(&self.data).await?;
        Ok(self)
    }
}
