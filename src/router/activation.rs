//! Activation link endpoint.
//!
//! Both tokens must match a pending account. Unknown pairs, half-matching
//! pairs and already-used links all answer with the same 404 so the
//! response leaks nothing about which half was wrong.

use axum::Json;
use axum::extract::{Path, State};
use serde::Serialize;

use crate::AppState;
use crate::error::{Result, ServerError};
use crate::token;
use crate::user::UserRepository;

#[derive(Debug, Serialize)]
pub struct Response {
    pub message: &'static str,
}

pub async fn handler(
    State(state): State<AppState>,
    Path((token1, token2)): Path<(String, String)>,
) -> Result<Json<Response>> {
    if !token::is_activation_token(&token1)
        || !token::is_activation_token(&token2)
    {
        return Err(ServerError::NotFound);
    }

    let repo = UserRepository::new(state.db.postgres.clone());
    let user = repo
        .activate(&token1, &token2)
        .await?
        .ok_or(ServerError::NotFound)?;

    tracing::info!(name = %user.name, "account activated");

    Ok(Json(Response {
        message: "Account has been activated",
    }))
}
