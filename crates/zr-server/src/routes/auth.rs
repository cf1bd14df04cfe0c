//! Account route handlers: register, login, verify.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::auth::{CREDENTIALS_REQUIRED, INVALID_CREDENTIALS, NO_TOKEN};
use crate::context::AppContext;
use crate::error::AppError;
use crate::middleware::auth::token_from_headers;

pub const ACCOUNT_CREATED: &str = "Account created successfully. Please login.";
pub const LOGIN_SUCCESS: &str = "Login success";
pub const TOKEN_VALID: &str = "Token valid";

/// Register/login request payload. Missing fields read as empty.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub message: &'static str,
    pub token: String,
}

/// POST /register
pub async fn register(
    State(ctx): State<AppContext>,
    payload: Result<Json<Credentials>, JsonRejection>,
) -> Result<Json<MessageResponse>, AppError> {
    let Json(creds) =
        payload.map_err(|_| zr_core::Error::Validation(CREDENTIALS_REQUIRED.into()))?;

    ctx.auth.register(creds.email.trim(), &creds.password).await?;

    Ok(Json(MessageResponse {
        message: ACCOUNT_CREATED,
    }))
}

/// POST /login
pub async fn login(
    State(ctx): State<AppContext>,
    payload: Result<Json<Credentials>, JsonRejection>,
) -> Result<Json<LoginResponse>, AppError> {
    let Json(creds) =
        payload.map_err(|_| zr_core::Error::Unauthorized(INVALID_CREDENTIALS.into()))?;

    let token = ctx.auth.login(creds.email.trim(), &creds.password).await?;

    Ok(Json(LoginResponse {
        message: LOGIN_SUCCESS,
        token,
    }))
}

/// GET /verify
pub async fn verify(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
) -> Result<Json<MessageResponse>, AppError> {
    let token = token_from_headers(&headers)
        .ok_or_else(|| zr_core::Error::Unauthorized(NO_TOKEN.into()))?;

    ctx.auth.verify(&token)?;

    Ok(Json(MessageResponse {
        message: TOKEN_VALID,
    }))
}
