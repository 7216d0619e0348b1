//! Personnel registry (Efetivo) routes

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{Map, Value};

use super::state::AppState;
use crate::error::AseResult;
use crate::import::{self, ImportRow};
use crate::models::EmployeeListItem;
use crate::services::{ImportReport, RegistryService};

#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
}

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/efetivo", get(list_employees))
        .route("/api/efetivo/import/preview", post(preview_import))
        .route("/api/efetivo/import", post(confirm_import))
}

async fn registry(state: &AppState, headers: &HeaderMap) -> AseResult<RegistryService> {
    let (_, ctx) = state.authenticate(headers).await?;
    Ok(RegistryService::new(state.gateway_for(&ctx)))
}

/// GET /api/efetivo?q=
async fn list_employees(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<SearchParams>,
) -> AseResult<Json<Vec<EmployeeListItem>>> {
    let employees = registry(&state, &headers)
        .await?
        .list_employees(params.q.as_deref())
        .await?;
    Ok(Json(employees))
}

/// POST /api/efetivo/import/preview with a CSV body
async fn preview_import(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: String,
) -> AseResult<Json<Vec<ImportRow>>> {
    let rows = registry(&state, &headers).await?.preview_import(&body)?;
    Ok(Json(rows))
}

/// POST /api/efetivo/import with decoded rows as JSON objects
async fn confirm_import(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(raw): Json<Vec<Map<String, Value>>>,
) -> AseResult<Json<ImportReport>> {
    let rows = import::from_json_rows(&raw);
    let report = registry(&state, &headers).await?.confirm_import(&rows).await?;
    Ok(Json(report))
}
