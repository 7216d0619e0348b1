//! Sign-in, sign-out and current-user routes

use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use super::state::AppState;
use crate::error::{AseResult, AuthError};
use crate::models::{Profile, Role};
use crate::session::{AuthUser, SessionContext};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub session_id: Uuid,
    pub user: AuthUser,
    pub profile: Option<Profile>,
    pub role: Option<Role>,
}

impl SessionResponse {
    fn new(session_id: Uuid, ctx: &SessionContext) -> Self {
        Self {
            session_id,
            user: ctx.user().clone(),
            profile: ctx.profile().cloned(),
            role: ctx.role(),
        }
    }
}

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/me", get(me))
}

/// POST /api/auth/login
async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> AseResult<Json<SessionResponse>> {
    let ctx = SessionContext::sign_in(
        state.identity.as_ref(),
        state.gateways.as_ref(),
        req.email.trim(),
        &req.password,
    )
    .await?;

    state.prune_sessions(Utc::now()).await;
    let session_id = Uuid::new_v4();
    let response = SessionResponse::new(session_id, &ctx);
    state.sessions.write().await.insert(session_id, ctx);
    info!("Session {} opened", session_id);
    Ok(Json(response))
}

/// POST /api/auth/logout
async fn logout(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> AseResult<StatusCode> {
    let (session_id, _) = state.authenticate(&headers).await?;
    let ctx = state
        .sessions
        .write()
        .await
        .remove(&session_id)
        .ok_or_else(|| AuthError::SessionExpired {
            session_id: session_id.to_string(),
        })?;
    ctx.sign_out(state.identity.as_ref()).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/auth/me
async fn me(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> AseResult<Json<SessionResponse>> {
    let (session_id, ctx) = state.authenticate(&headers).await?;
    Ok(Json(SessionResponse::new(session_id, &ctx)))
}
