//! HTTP API for the browser front end
//!
//! Every authenticated route reads `Authorization: Bearer <session id>`;
//! the id comes from `POST /api/auth/login`.

pub mod ase_routes;
pub mod auth_routes;
pub mod dashboard_routes;
pub mod form_routes;
pub mod registry_routes;
pub mod state;

use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use tracing::error;

use crate::error::{AseError, AuthError, GatewayError, ValidationError};

pub use state::{create_session_store, AppState, SessionStore};

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .merge(auth_routes::routes())
        .merge(ase_routes::routes())
        .merge(form_routes::routes())
        .merge(dashboard_routes::routes())
        .merge(registry_routes::routes())
        .with_state(state)
}

/// GET /api/health
async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

impl AseError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AseError::Auth(AuthError::Network { .. }) => StatusCode::BAD_GATEWAY,
            AseError::Auth(_) => StatusCode::UNAUTHORIZED,
            AseError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AseError::Import(_) => StatusCode::BAD_REQUEST,
            AseError::Forbidden { .. } => StatusCode::FORBIDDEN,
            AseError::NotFound { .. } => StatusCode::NOT_FOUND,
            AseError::Gateway(GatewayError::NotFound { .. }) => StatusCode::NOT_FOUND,
            AseError::Gateway(GatewayError::Conflict { .. }) => StatusCode::CONFLICT,
            AseError::Gateway(GatewayError::Backend { status, .. }) if *status < 500 => {
                StatusCode::BAD_REQUEST
            }
            AseError::Gateway(_) | AseError::Load { .. } => StatusCode::BAD_GATEWAY,
            AseError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AseError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!("{}", self);
        }
        let body = match &self {
            AseError::Validation(e) => json!({
                "error": self.user_message(),
                "details": validation_details(e),
            }),
            _ => json!({ "error": self.user_message() }),
        };
        (status, Json(body)).into_response()
    }
}

/// One message per field problem
fn validation_details(error: &ValidationError) -> Vec<String> {
    match error {
        ValidationError::Multiple(all) => all.iter().map(ValidationError::user_message).collect(),
        single => vec![single.user_message()],
    }
}
