//! Form support: selection lists, subdisciplines, HH preview

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{Local, NaiveTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::state::AppState;
use crate::error::AseResult;
use crate::models::{wall_time, AseForm, Subdiscipline};
use crate::rules::HhSummary;
use crate::services::{AseService, FormOptions};

#[derive(Debug, Serialize)]
pub struct FormOptionsResponse {
    #[serde(flatten)]
    pub options: FormOptions,
    /// Blank form for today
    pub defaults: AseForm,
}

#[derive(Debug, Deserialize)]
pub struct ManHoursRequest {
    #[serde(with = "wall_time")]
    pub start_time: NaiveTime,
    #[serde(with = "wall_time")]
    pub end_time: NaiveTime,
    pub team_size: usize,
}

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/form/options", get(form_options))
        .route(
            "/api/form/disciplines/:id/subdisciplines",
            get(subdisciplines),
        )
        .route("/api/form/man-hours", post(man_hours))
}

/// GET /api/form/options
async fn form_options(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> AseResult<Json<FormOptionsResponse>> {
    let (_, ctx) = state.authenticate(&headers).await?;
    let options = AseService::new(state.gateway_for(&ctx)).form_options().await?;
    Ok(Json(FormOptionsResponse {
        options,
        defaults: AseForm::blank(Local::now().date_naive()),
    }))
}

/// GET /api/form/disciplines/:id/subdisciplines
async fn subdisciplines(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(discipline_id): Path<Uuid>,
) -> AseResult<Json<Vec<Subdiscipline>>> {
    let (_, ctx) = state.authenticate(&headers).await?;
    let subs = AseService::new(state.gateway_for(&ctx))
        .subdisciplines_for(discipline_id)
        .await?;
    Ok(Json(subs))
}

/// POST /api/form/man-hours
async fn man_hours(Json(req): Json<ManHoursRequest>) -> Json<HhSummary> {
    Json(HhSummary::compute(req.start_time, req.end_time, req.team_size))
}
