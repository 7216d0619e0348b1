//! Authorization routes: list, create, load, update, export, share

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Local;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::state::AppState;
use crate::error::AseResult;
use crate::models::{Ase, AseForm, AseListItem, StatusBadge, TeamSnapshot};
use crate::rules::{format_hours, man_hours_decimal, SubmitAction};
use crate::services::{AseService, EditableAse, ListMode, ShareLink};
use crate::session::SessionContext;

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    #[serde(default)]
    pub mode: ListMode,
    pub q: Option<String>,
}

/// Body of create and update
#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    #[serde(flatten)]
    pub form: AseForm,
    #[serde(default)]
    pub team: Vec<TeamSnapshot>,
    pub action: SubmitAction,
}

#[derive(Debug, Serialize)]
pub struct AseListEntry {
    #[serde(flatten)]
    pub item: AseListItem,
    pub badge: StatusBadge,
    pub man_hours: String,
}

impl From<AseListItem> for AseListEntry {
    fn from(item: AseListItem) -> Self {
        let hh = man_hours_decimal(item.ase.start_time, item.ase.end_time, item.team_size);
        Self {
            badge: item.ase.status.badge(),
            man_hours: format_hours(hh),
            item,
        }
    }
}

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/ase", get(list_ases).post(create_ase))
        .route("/api/ase/:id", get(get_ase).put(update_ase))
        .route("/api/ase/:id/export", get(export_ase))
        .route("/api/ase/:id/share", get(share_ase))
}

async fn service(
    state: &AppState,
    headers: &HeaderMap,
) -> AseResult<(AseService, SessionContext)> {
    let (_, ctx) = state.authenticate(headers).await?;
    Ok((AseService::new(state.gateway_for(&ctx)), ctx))
}

/// GET /api/ase?mode=my|all&q=
async fn list_ases(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<ListParams>,
) -> AseResult<Json<Vec<AseListEntry>>> {
    let (service, ctx) = service(&state, &headers).await?;
    let items = service.list(&ctx, params.mode, params.q.as_deref()).await?;
    Ok(Json(items.into_iter().map(Into::into).collect()))
}

/// POST /api/ase
async fn create_ase(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<SubmitRequest>,
) -> AseResult<(StatusCode, Json<Ase>)> {
    let (service, ctx) = service(&state, &headers).await?;
    let saved = service
        .submit(ctx.requester(), None, &req.form, &req.team, req.action)
        .await?;
    Ok((StatusCode::CREATED, Json(saved)))
}

/// GET /api/ase/:id
async fn get_ase(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> AseResult<Json<EditableAse>> {
    let (service, _) = service(&state, &headers).await?;
    Ok(Json(service.load_for_edit(id).await?))
}

/// PUT /api/ase/:id
async fn update_ase(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(req): Json<SubmitRequest>,
) -> AseResult<Json<Ase>> {
    let (service, ctx) = service(&state, &headers).await?;
    let saved = service
        .submit(ctx.requester(), Some(id), &req.form, &req.team, req.action)
        .await?;
    Ok(Json(saved))
}

/// GET /api/ase/:id/export
async fn export_ase(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> AseResult<impl IntoResponse> {
    let (service, _) = service(&state, &headers).await?;
    let document = service.export(id, Local::now().naive_local()).await?;
    Ok((
        [
            (header::CONTENT_TYPE, document.content_type.to_string()),
            (header::CONTENT_DISPOSITION, document.disposition()),
        ],
        document.body,
    ))
}

/// GET /api/ase/:id/share
async fn share_ase(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> AseResult<Json<ShareLink>> {
    let (service, _) = service(&state, &headers).await?;
    Ok(Json(service.share(id, &state.app_origin).await?))
}
