//! Shared server state: identity provider, gateways and live sessions

use std::collections::HashMap;
use std::sync::Arc;

use axum::http::{header, HeaderMap};
use chrono::{DateTime, Duration, Utc};
use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{AseResult, AuthError};
use crate::gateway::{AseGateway, GatewayProvider};
use crate::session::{AuthEvent, IdentityProvider, SessionContext};

/// Sessions whose token lapsed this many hours ago are treated as abandoned
pub const ABANDONED_AFTER_HOURS: i64 = 12;

/// Signed-in sessions keyed by the id handed to the client
pub type SessionStore = Arc<RwLock<HashMap<Uuid, SessionContext>>>;

pub fn create_session_store() -> SessionStore {
    Arc::new(RwLock::new(HashMap::new()))
}

pub struct AppState {
    pub identity: Arc<dyn IdentityProvider>,
    pub gateways: Arc<dyn GatewayProvider>,
    pub sessions: SessionStore,
    /// Front-end origin used in share links
    pub app_origin: String,
}

impl AppState {
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        gateways: Arc<dyn GatewayProvider>,
        app_origin: impl Into<String>,
    ) -> Self {
        Self {
            identity,
            gateways,
            sessions: create_session_store(),
            app_origin: app_origin.into(),
        }
    }

    /// Resolve `Authorization: Bearer <session id>` to its session.
    ///
    /// A token about to expire is refreshed first; a session that can no
    /// longer be refreshed is dropped.
    pub async fn authenticate(&self, headers: &HeaderMap) -> AseResult<(Uuid, SessionContext)> {
        let raw = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or(AuthError::NotAuthenticated)?
            .trim();
        let session_id = Uuid::parse_str(raw).map_err(|_| AuthError::SessionExpired {
            session_id: raw.to_string(),
        })?;
        let expired = || AuthError::SessionExpired {
            session_id: session_id.to_string(),
        };

        let mut ctx = self
            .sessions
            .read()
            .await
            .get(&session_id)
            .cloned()
            .ok_or_else(expired)?;
        if !ctx.needs_refresh(Utc::now()) {
            return Ok((session_id, ctx));
        }

        match ctx.refresh(self.identity.as_ref()).await {
            Ok(()) => {
                if let Some(slot) = self.sessions.write().await.get_mut(&session_id) {
                    *slot = ctx.clone();
                }
                Ok((session_id, ctx))
            }
            Err(e @ AuthError::Network { .. }) => Err(e.into()),
            Err(e) => {
                warn!("Session {} could not be refreshed: {}", session_id, e);
                self.sessions.write().await.remove(&session_id);
                Err(expired().into())
            }
        }
    }

    /// Drop sessions whose token lapsed more than `ABANDONED_AFTER_HOURS` ago
    pub async fn prune_sessions(&self, now: DateTime<Utc>) -> usize {
        let cutoff = now - Duration::hours(ABANDONED_AFTER_HOURS);
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, ctx| ctx.session().expires_at.map_or(true, |at| at > cutoff));
        let pruned = before - sessions.len();
        if pruned > 0 {
            info!("Pruned {} abandoned sessions", pruned);
        }
        pruned
    }

    /// Gateway acting as the session's user
    pub fn gateway_for(&self, ctx: &SessionContext) -> Arc<dyn AseGateway> {
        ctx.gateway(self.gateways.as_ref())
    }

    /// Apply one auth event to the stored sessions of its user.
    ///
    /// Contexts are updated outside the store lock since `SignedIn` reloads
    /// the profile over the network.
    pub async fn apply_auth_event(&self, event: &AuthEvent) {
        let user_id = event.user_id();
        let affected: Vec<(Uuid, SessionContext)> = self
            .sessions
            .read()
            .await
            .iter()
            .filter(|(_, ctx)| ctx.user().id == user_id)
            .map(|(id, ctx)| (*id, ctx.clone()))
            .collect();
        if affected.is_empty() {
            return;
        }

        let mut updates = Vec::with_capacity(affected.len());
        for (id, mut ctx) in affected {
            let alive = ctx.apply(event, self.gateways.as_ref()).await;
            updates.push((id, alive.then_some(ctx)));
        }

        let mut sessions = self.sessions.write().await;
        for (id, update) in updates {
            match update {
                Some(ctx) => {
                    // Only sessions still open; a concurrent logout wins
                    if let Some(slot) = sessions.get_mut(&id) {
                        *slot = ctx;
                    }
                }
                None => {
                    if sessions.remove(&id).is_some() {
                        info!("Session {} ended", id);
                    }
                }
            }
        }
    }

    /// Keep stored sessions in step with the identity provider's events.
    /// Sessions whose user signed out are dropped.
    pub fn spawn_auth_listener(self: &Arc<Self>) -> JoinHandle<()> {
        let state = Arc::clone(self);
        let mut events = state.identity.subscribe();
        tokio::spawn(async move {
            loop {
                let event = match events.recv().await {
                    Ok(event) => event,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!("Auth listener lagged, skipped {} events", skipped);
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                };
                debug!("Auth event: {}", event_kind(&event));
                state.apply_auth_event(&event).await;
            }
        })
    }
}

fn event_kind(event: &AuthEvent) -> String {
    match event {
        AuthEvent::SignedIn(s) => format!("signed in {}", s.user.id),
        AuthEvent::TokenRefreshed(s) => format!("token refreshed {}", s.user.id),
        AuthEvent::SignedOut { user_id } => format!("signed out {}", user_id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::InMemoryGateway;
    use crate::session::InMemoryIdentity;
    use axum::http::HeaderValue;

    async fn state_with(identity: InMemoryIdentity) -> (Arc<AppState>, InMemoryIdentity) {
        identity.add_user("ana@hc.eng.br", "segredo", true).await;
        let state = AppState::new(
            Arc::new(identity.clone()),
            Arc::new(InMemoryGateway::new()),
            "https://ase.hc.eng.br",
        );
        (Arc::new(state), identity)
    }

    async fn open_session(state: &AppState) -> (Uuid, SessionContext) {
        let ctx = SessionContext::sign_in(
            state.identity.as_ref(),
            state.gateways.as_ref(),
            "ana@hc.eng.br",
            "segredo",
        )
        .await
        .unwrap();
        let id = Uuid::new_v4();
        state.sessions.write().await.insert(id, ctx.clone());
        (id, ctx)
    }

    fn bearer(id: Uuid) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {id}")).unwrap(),
        );
        headers
    }

    #[tokio::test]
    async fn test_authenticate_refreshes_expiring_token() {
        let identity = InMemoryIdentity::new().with_token_lifetime(Duration::seconds(30));
        let (state, _) = state_with(identity).await;
        let (id, original) = open_session(&state).await;

        let (_, ctx) = state.authenticate(&bearer(id)).await.unwrap();
        assert_ne!(ctx.access_token(), original.access_token());
        let stored = state.sessions.read().await.get(&id).cloned().unwrap();
        assert_eq!(stored.access_token(), ctx.access_token());
    }

    #[tokio::test]
    async fn test_unrefreshable_session_is_dropped() {
        let identity = InMemoryIdentity::new().with_token_lifetime(Duration::seconds(30));
        let (state, identity) = state_with(identity).await;
        let (id, ctx) = open_session(&state).await;

        // Revokes the refresh token; no listener is running
        identity.sign_out(ctx.access_token()).await.unwrap();

        let err = state.authenticate(&bearer(id)).await.unwrap_err();
        assert!(matches!(
            err,
            crate::error::AseError::Auth(AuthError::SessionExpired { .. })
        ));
        assert!(state.sessions.read().await.is_empty());
    }

    #[tokio::test]
    async fn test_listener_drops_signed_out_sessions() {
        let (state, identity) = state_with(InMemoryIdentity::new()).await;
        let listener = state.spawn_auth_listener();
        let (_, ctx) = open_session(&state).await;
        open_session(&state).await;
        assert_eq!(state.sessions.read().await.len(), 2);

        identity.sign_out(ctx.access_token()).await.unwrap();

        tokio::time::timeout(std::time::Duration::from_secs(2), async {
            while !state.sessions.read().await.is_empty() {
                tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("sessions of the signed-out user should be dropped");
        listener.abort();
    }

    #[tokio::test]
    async fn test_refresh_event_updates_stored_session() {
        let (state, identity) = state_with(InMemoryIdentity::new()).await;
        let (id, ctx) = open_session(&state).await;

        let refreshed = identity
            .refresh(&ctx.session().refresh_token)
            .await
            .unwrap();
        state
            .apply_auth_event(&AuthEvent::TokenRefreshed(refreshed.clone()))
            .await;

        let stored = state.sessions.read().await.get(&id).cloned().unwrap();
        assert_eq!(stored.access_token(), refreshed.access_token);
    }

    #[tokio::test]
    async fn test_prune_abandoned_sessions() {
        let identity = InMemoryIdentity::new().with_token_lifetime(Duration::hours(-13));
        let (state, _) = state_with(identity).await;
        open_session(&state).await;

        assert_eq!(state.prune_sessions(Utc::now()).await, 1);
        assert!(state.sessions.read().await.is_empty());
    }
}
