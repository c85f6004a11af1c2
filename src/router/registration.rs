//! Registration flow: create a pending account and send its activation link.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError, ValidationErrors};

use crate::AppState;
use crate::error::Result;
use crate::mail::Template::ActivationLink;
use crate::router::{FormDescriptor, ValidJson, found};
use crate::user::User;

pub const THANKS_PATH: &str = "/registration/thanks";

/// Public registration body. Privilege and activation flags deliberately
/// have no field here; whatever a caller submits for them is dropped
/// during deserialization.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct Body {
    #[serde(default)]
    #[validate(email(message = "Enter a valid email address."))]
    pub email: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    #[validate(length(
        min = 8,
        message = "Password must contain at least 8 characters."
    ))]
    pub password1: String,
    #[serde(default)]
    pub password2: String,
}

fn password_mismatch() -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    errors.add(
        "password2",
        ValidationError::new("password_mismatch")
            .with_message("The two password fields didn't match.".into()),
    );
    errors
}

/// Empty registration form.
pub async fn form() -> Json<FormDescriptor> {
    Json(FormDescriptor {
        fields: &["email", "name", "password1", "password2"],
    })
}

/// Confirmation page reached after a successful registration.
pub async fn thanks() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "message": "Thanks for registering. An activation link is on its way.",
    }))
}

/// Handler to create a pending user.
pub async fn handler(
    State(state): State<AppState>,
    ValidJson(body): ValidJson<Body>,
) -> Result<Response> {
    if body.password1 != body.password2 {
        return Err(password_mismatch().into());
    }

    let service = User::builder()
        .email(&body.email)
        .name(&body.name)
        .password(&body.password1)
        .build(state.db.postgres.clone(), Arc::clone(&state.crypto))
        .create_user()
        .await?;

    let user = &service.data;
    let link = format!(
        "{}activation/{}/{}",
        state.config.url, user.activation_token1, user.activation_token2
    );
    state.mail.publish_event(ActivationLink, user, &link).await?;

    tracing::info!(name = %user.name, "pending account created");

    Ok(found(THANKS_PATH).into_response())
}

#[cfg(test)]
pub(super) mod tests {
    use axum::http::{Method, StatusCode, header};
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use sqlx::{Pool, Postgres};

    use super::*;
    use crate::user::UserRepository;
    use crate::{app, make_request, router, token};

    fn alice() -> String {
        json!({
            "email": "alice@example.com",
            "name": "Alice",
            "password1": "Secret123!",
            "password2": "Secret123!",
        })
        .to_string()
    }

    #[sqlx::test]
    async fn test_registration_creates_pending_user(pool: Pool<Postgres>) {
        let state = router::state(pool.clone());
        let app = app(state);

        let response =
            make_request(app, Method::POST, "/registration", alice(), None)
                .await;

        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(
            response.headers().get(header::LOCATION).unwrap(),
            THANKS_PATH
        );

        let user = UserRepository::new(pool)
            .find_by_email("alice@example.com")
            .await
            .unwrap()
            .expect("user row");
        assert!(!user.is_active);
        assert!(!user.is_staff);
        assert!(!user.is_superuser);
        assert!(token::is_activation_token(&user.activation_token1));
        assert!(token::is_activation_token(&user.activation_token2));
        assert_ne!(user.activation_token1, user.activation_token2);
        // Raw password never reaches the store.
        assert!(user.password.starts_with("$argon2id$"));
    }

    #[sqlx::test]
    async fn test_password_mismatch_rerenders_form(pool: Pool<Postgres>) {
        let state = router::state(pool.clone());
        let app = app(state);

        let body = json!({
            "email": "bob@example.com",
            "name": "Bob",
            "password1": "Secret123!",
            "password2": "Different1!",
        })
        .to_string();
        let response =
            make_request(app, Method::POST, "/registration", body, None).await;

        // Form semantics: errors come back on a 200.
        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let body: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["errors"][0]["field"], "password2");

        let user = UserRepository::new(pool)
            .find_by_email("bob@example.com")
            .await
            .unwrap();
        assert!(user.is_none());
    }

    #[sqlx::test]
    async fn test_missing_fields_rejected(pool: Pool<Postgres>) {
        let state = router::state(pool);
        let app = app(state);

        let response = make_request(
            app,
            Method::POST,
            "/registration",
            json!({ "name": "Carol" }).to_string(),
            None,
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let body: Value = serde_json::from_slice(&body).unwrap();
        let fields: Vec<&str> = body["errors"]
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["field"].as_str().unwrap())
            .collect();
        assert!(fields.contains(&"email"));
        assert!(fields.contains(&"password1"));
    }

    #[sqlx::test]
    async fn test_duplicate_email_case_folded(pool: Pool<Postgres>) {
        let state = router::state(pool);
        let app = app(state);

        let response = make_request(
            app.clone(),
            Method::POST,
            "/registration",
            alice(),
            None,
        )
        .await;
        assert_eq!(response.status(), StatusCode::FOUND);

        // Same address, different case: folds to the same unique key.
        let body = json!({
            "email": "Alice@Example.com",
            "name": "Other Alice",
            "password1": "Another123!",
            "password2": "Another123!",
        })
        .to_string();
        let response =
            make_request(app, Method::POST, "/registration", body, None).await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let body: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["errors"][0]["field"], "email");
    }

    #[sqlx::test]
    async fn test_privilege_fields_are_ignored(pool: Pool<Postgres>) {
        let state = router::state(pool.clone());
        let app = app(state);

        let body = json!({
            "email": "mallory@example.com",
            "name": "Mallory",
            "password1": "Secret123!",
            "password2": "Secret123!",
            "is_active": true,
            "is_staff": true,
            "is_superuser": true,
        })
        .to_string();
        let response =
            make_request(app, Method::POST, "/registration", body, None).await;
        assert_eq!(response.status(), StatusCode::FOUND);

        let user = UserRepository::new(pool)
            .find_by_email("mallory@example.com")
            .await
            .unwrap()
            .expect("user row");
        assert!(!user.is_active);
        assert!(!user.is_staff);
        assert!(!user.is_superuser);
    }

    #[sqlx::test]
    async fn test_token_pairs_differ_between_users(pool: Pool<Postgres>) {
        let state = router::state(pool.clone());
        let app = app(state);

        for email in ["one@example.com", "two@example.com"] {
            let body = json!({
                "email": email,
                "name": "",
                "password1": "Secret123!",
                "password2": "Secret123!",
            })
            .to_string();
            let response =
                make_request(app.clone(), Method::POST, "/registration", body, None)
                    .await;
            assert_eq!(response.status(), StatusCode::FOUND);
        }

        let repo = UserRepository::new(pool);
        let first = repo.find_by_email("one@example.com").await.unwrap().unwrap();
        let second = repo.find_by_email("two@example.com").await.unwrap().unwrap();
        assert_ne!(
            (first.activation_token1, first.activation_token2),
            (second.activation_token1, second.activation_token2)
        );
    }
}
