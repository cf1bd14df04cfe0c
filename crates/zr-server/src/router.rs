//! Axum router construction.
//!
//! Builds the application router with the account routes, the generation
//! endpoint, static serving of finished videos and the middleware stack.

use std::any::Any;

use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::middleware;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any as AnyOrigin, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use zr_core::AssetKind;

use crate::context::AppContext;
use crate::middleware::auth::auth_guard;
use crate::middleware::request_id::request_id_middleware;
use crate::routes;

/// Build the complete Axum router.
pub fn build_router(ctx: AppContext) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AnyOrigin)
        .allow_methods(AnyOrigin)
        .allow_headers(AnyOrigin);

    let mut generate = Router::new()
        .route("/ai-generate", post(routes::generate::generate))
        .layer(DefaultBodyLimit::max(ctx.config.server.max_upload_bytes));

    if ctx.config.auth.require_for_generate {
        tracing::info!("POST /ai-generate requires a session token");
        generate = generate.route_layer(middleware::from_fn_with_state(ctx.clone(), auth_guard));
    }

    let outputs = ServeDir::new(ctx.assets.dir(AssetKind::Output));

    Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/register", post(routes::auth::register))
        .route("/login", post(routes::auth::login))
        .route("/verify", get(routes::auth::verify))
        .merge(generate)
        .nest_service("/outputs", outputs)
        .layer(middleware::from_fn(request_id_middleware))
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(ctx)
}

/// Generic 500 for a handler that panicked; the payload is only logged.
fn panic_response(payload: Box<dyn Any + Send + 'static>) -> Response {
    let detail = payload
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| payload.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    tracing::error!("Handler panicked: {detail}");

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "message": "Server error", "code": "internal_error" })),
    )
        .into_response()
}
