//! Token guard for routes that need a signed-in account.
//!
//! The token is read from the `Authorization` header, either raw or with a
//! `Bearer ` prefix. Verified [`Claims`] are inserted into request extensions.

use axum::extract::State;
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, Request};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::auth::{Claims, NO_TOKEN};
use crate::context::AppContext;
use crate::error::AppError;

/// Extract the session token from request headers.
pub fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?.trim_start();
    let token = value.strip_prefix("Bearer ").unwrap_or(value).trim();
    (!token.is_empty()).then(|| token.to_string())
}

/// Reject the request with 401 unless it carries a valid token.
pub async fn auth_guard(
    State(ctx): State<AppContext>,
    mut request: Request<axum::body::Body>,
    next: Next,
) -> Response {
    let Some(token) = token_from_headers(request.headers()) else {
        return AppError::new(zr_core::Error::Unauthorized(NO_TOKEN.into())).into_response();
    };

    match ctx.auth.verify(&token) {
        Ok(claims) => {
            tracing::debug!(account = %claims.sub, "Authenticated request");
            request.extensions_mut().insert::<Claims>(claims);
            next.run(request).await
        }
        Err(e) => AppError::new(e).into_response(),
    }
}
