pub mod activation;
pub mod login;
pub mod logout;
pub mod registration;
pub mod status;

use axum::Json;
use axum::extract::{FromRequest, Request};
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use serde::de::DeserializeOwned;
use serde::Serialize;
use validator::Validate;

use crate::error::ServerError;

/// JSON body extractor running `validator` checks before the handler.
pub struct ValidJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = ServerError;

    async fn from_request(
        req: Request,
        state: &S,
    ) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        value.validate()?;
        Ok(Self(value))
    }
}

/// Field list of a form endpoint; the excluded view layer renders it.
#[derive(Debug, Serialize)]
pub struct FormDescriptor {
    pub fields: &'static [&'static str],
}

/// 302 FOUND redirect, as the original form flow specifies.
pub(crate) fn found(location: &str) -> impl IntoResponse {
    (StatusCode::FOUND, [(header::LOCATION, location.to_owned())])
}

#[cfg(test)]
pub(crate) fn test_password_manager()
-> std::sync::Arc<crate::crypto::PasswordManager> {
    // Cheap parameters; production strength is pointless in tests.
    std::sync::Arc::new(
        crate::crypto::PasswordManager::new(Some(crate::config::Argon2 {
            memory_cost: 8,
            iterations: 1,
            parallelism: 1,
            hash_length: 32,
        }))
        .expect("argon2 test params"),
    )
}

#[cfg(test)]
pub(crate) fn state(pool: sqlx::PgPool) -> crate::AppState {
    use std::sync::Arc;

    crate::AppState {
        config: Arc::new(crate::config::Configuration::default()),
        db: crate::database::Database {
            postgres: pool.clone(),
        },
        crypto: test_password_manager(),
        mail: crate::mail::MailManager::default(),
        sessions: crate::session::SessionStore::new(pool),
    }
}
