//! Dashboard and navigation menu

use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::routing::get;
use axum::{Json, Router};

use super::state::AppState;
use crate::error::AseResult;
use crate::rules::{visible_menu, DashboardStats, MenuItem};
use crate::services::DashboardService;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/dashboard", get(dashboard))
        .route("/api/menu", get(menu))
}

/// GET /api/dashboard
async fn dashboard(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> AseResult<Json<DashboardStats>> {
    let (_, ctx) = state.authenticate(&headers).await?;
    let stats = DashboardService::new(state.gateway_for(&ctx)).stats().await?;
    Ok(Json(stats))
}

/// GET /api/menu: entries visible to the session's role
async fn menu(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> AseResult<Json<Vec<&'static MenuItem>>> {
    let (_, ctx) = state.authenticate(&headers).await?;
    Ok(Json(visible_menu(ctx.role())))
}
