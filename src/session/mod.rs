//! Identity and session state
//!
//! `IdentityProvider` wraps the hosted auth service. `SessionContext` is the
//! explicit per-user session: built at sign-in (or when restoring a stored
//! session), updated from auth-change events and consumed at sign-out.

pub mod hosted;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::AuthError;
use crate::gateway::{AseGateway, GatewayProvider};
use crate::models::{Profile, Role};

pub use hosted::HostedIdentity;

/// Authenticated user as reported by the identity provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    pub refresh_token: String,
    pub user: AuthUser,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Session-change notifications
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    SignedIn(AuthSession),
    TokenRefreshed(AuthSession),
    SignedOut { user_id: Uuid },
}

impl AuthEvent {
    pub fn user_id(&self) -> Uuid {
        match self {
            AuthEvent::SignedIn(session) | AuthEvent::TokenRefreshed(session) => session.user.id,
            AuthEvent::SignedOut { user_id } => *user_id,
        }
    }
}

/// Access tokens this close to expiry (seconds) are refreshed before use
pub const REFRESH_MARGIN_SECS: i64 = 60;

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, AuthError>;

    async fn refresh(&self, refresh_token: &str) -> Result<AuthSession, AuthError>;

    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError>;

    /// Resolve the user behind an access token
    async fn get_user(&self, access_token: &str) -> Result<AuthUser, AuthError>;

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent>;
}

/// Current user plus application profile.
///
/// `profile` is `None` only when the profile lookup failed; a user without a
/// profile row gets the read-only role instead.
#[derive(Debug, Clone)]
pub struct SessionContext {
    session: AuthSession,
    profile: Option<Profile>,
}

impl SessionContext {
    /// Build the context for an existing session, loading the user's profile.
    pub async fn start(session: AuthSession, gateways: &dyn GatewayProvider) -> Self {
        let gateway = gateways.scoped(&session.access_token);
        let profile = load_profile(gateway.as_ref(), &session.user).await;
        Self { session, profile }
    }

    pub async fn sign_in(
        identity: &dyn IdentityProvider,
        gateways: &dyn GatewayProvider,
        email: &str,
        password: &str,
    ) -> Result<Self, AuthError> {
        let session = identity.sign_in_with_password(email, password).await?;
        info!("User {} signed in", session.user.id);
        Ok(Self::start(session, gateways).await)
    }

    /// Apply an auth-change event. Returns `false` once the session has ended.
    pub async fn apply(&mut self, event: &AuthEvent, gateways: &dyn GatewayProvider) -> bool {
        match event {
            AuthEvent::TokenRefreshed(session) if session.user.id == self.session.user.id => {
                self.session = session.clone();
                true
            }
            AuthEvent::SignedIn(session) if session.user.id == self.session.user.id => {
                self.session = session.clone();
                let gateway = gateways.scoped(&self.session.access_token);
                self.profile = load_profile(gateway.as_ref(), &self.session.user).await;
                true
            }
            AuthEvent::SignedOut { user_id } => *user_id != self.session.user.id,
            _ => true,
        }
    }

    /// Whether the access token expires within `REFRESH_MARGIN_SECS` of `now`
    pub fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        self.session
            .expires_at
            .is_some_and(|expires_at| expires_at - now <= Duration::seconds(REFRESH_MARGIN_SECS))
    }

    /// Trade the refresh token for a new session, keeping the loaded profile
    pub async fn refresh(&mut self, identity: &dyn IdentityProvider) -> Result<(), AuthError> {
        let session = identity.refresh(&self.session.refresh_token).await?;
        debug!("Refreshed access token for user {}", session.user.id);
        self.session = session;
        Ok(())
    }

    pub async fn sign_out(self, identity: &dyn IdentityProvider) -> Result<(), AuthError> {
        identity.sign_out(&self.session.access_token).await?;
        info!("User {} signed out", self.session.user.id);
        Ok(())
    }

    pub fn user(&self) -> &AuthUser {
        &self.session.user
    }

    pub fn profile(&self) -> Option<&Profile> {
        self.profile.as_ref()
    }

    pub fn role(&self) -> Option<Role> {
        self.profile.as_ref().map(|p| p.role)
    }

    /// Profile to record as requester on new authorizations
    pub fn requester(&self) -> Option<&Profile> {
        self.profile.as_ref()
    }

    pub fn access_token(&self) -> &str {
        &self.session.access_token
    }

    pub fn session(&self) -> &AuthSession {
        &self.session
    }

    /// Gateway acting as this user
    pub fn gateway(&self, gateways: &dyn GatewayProvider) -> Arc<dyn AseGateway> {
        gateways.scoped(&self.session.access_token)
    }
}

async fn load_profile(gateway: &dyn AseGateway, user: &AuthUser) -> Option<Profile> {
    match gateway.fetch_profile(user.id).await {
        Ok(Some(profile)) => Some(profile),
        Ok(None) => {
            info!("No profile for user {}, using read-only role", user.id);
            Some(Profile::read_only(user.id, user.email.as_deref()))
        }
        Err(e) => {
            warn!("Failed to load profile for user {}: {}", user.id, e);
            None
        }
    }
}

// ============================================================================
// In-process identity provider
// ============================================================================

struct LocalAccount {
    user: AuthUser,
    password: String,
    confirmed: bool,
}

#[derive(Default)]
struct LocalState {
    accounts: HashMap<String, LocalAccount>,
    /// access token -> user id
    access: HashMap<String, Uuid>,
    /// refresh token -> user id
    refresh: HashMap<String, Uuid>,
}

/// Identity provider kept in memory, for tests, demos and offline runs
#[derive(Clone)]
pub struct InMemoryIdentity {
    state: Arc<RwLock<LocalState>>,
    events: broadcast::Sender<AuthEvent>,
    token_lifetime: Duration,
}

impl Default for InMemoryIdentity {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryIdentity {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            state: Arc::new(RwLock::new(LocalState::default())),
            events,
            token_lifetime: Duration::hours(1),
        }
    }

    /// Issue access tokens valid for `lifetime` (negative issues expired ones)
    pub fn with_token_lifetime(mut self, lifetime: Duration) -> Self {
        self.token_lifetime = lifetime;
        self
    }

    /// Register an account and return its user
    pub async fn add_user(&self, email: &str, password: &str, confirmed: bool) -> AuthUser {
        let user = AuthUser {
            id: Uuid::new_v4(),
            email: Some(email.to_string()),
        };
        self.state.write().await.accounts.insert(
            email.to_lowercase(),
            LocalAccount {
                user: user.clone(),
                password: password.to_string(),
                confirmed,
            },
        );
        user
    }

    fn issue(&self, state: &mut LocalState, user: &AuthUser) -> AuthSession {
        let session = AuthSession {
            access_token: Uuid::new_v4().to_string(),
            refresh_token: Uuid::new_v4().to_string(),
            user: user.clone(),
            expires_at: Some(Utc::now() + self.token_lifetime),
        };
        state.access.insert(session.access_token.clone(), user.id);
        state.refresh.insert(session.refresh_token.clone(), user.id);
        session
    }

    fn notify(&self, event: AuthEvent) {
        // No subscribers is not an error
        let _ = self.events.send(event);
    }
}

fn find_user(state: &LocalState, id: Uuid) -> Option<AuthUser> {
    state
        .accounts
        .values()
        .find(|a| a.user.id == id)
        .map(|a| a.user.clone())
}

#[async_trait]
impl IdentityProvider for InMemoryIdentity {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, AuthError> {
        let mut state = self.state.write().await;
        let account = state
            .accounts
            .get(&email.trim().to_lowercase())
            .filter(|a| a.password == password)
            .ok_or(AuthError::InvalidCredentials)?;
        if !account.confirmed {
            return Err(AuthError::EmailNotConfirmed);
        }
        let user = account.user.clone();
        let session = self.issue(&mut state, &user);
        drop(state);
        self.notify(AuthEvent::SignedIn(session.clone()));
        Ok(session)
    }

    async fn refresh(&self, refresh_token: &str) -> Result<AuthSession, AuthError> {
        let mut state = self.state.write().await;
        let user_id = state
            .refresh
            .remove(refresh_token)
            .ok_or(AuthError::NotAuthenticated)?;
        let user = find_user(&state, user_id).ok_or(AuthError::NotAuthenticated)?;
        let session = self.issue(&mut state, &user);
        drop(state);
        self.notify(AuthEvent::TokenRefreshed(session.clone()));
        Ok(session)
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError> {
        let mut state = self.state.write().await;
        let user_id = state
            .access
            .remove(access_token)
            .ok_or(AuthError::NotAuthenticated)?;
        state.refresh.retain(|_, id| *id != user_id);
        drop(state);
        self.notify(AuthEvent::SignedOut { user_id });
        Ok(())
    }

    async fn get_user(&self, access_token: &str) -> Result<AuthUser, AuthError> {
        let state = self.state.read().await;
        state
            .access
            .get(access_token)
            .and_then(|id| find_user(&state, *id))
            .ok_or(AuthError::NotAuthenticated)
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::InMemoryGateway;

    #[tokio::test]
    async fn test_sign_in_loads_profile_role() {
        let identity = InMemoryIdentity::new();
        let gateway = InMemoryGateway::new();
        let user = identity.add_user("ana@hc.eng.br", "segredo", true).await;
        gateway
            .add_profile(Profile {
                id: user.id,
                email: "ana@hc.eng.br".into(),
                role: Role::Gerente,
            })
            .await;

        let ctx = SessionContext::sign_in(&identity, &gateway, "ana@hc.eng.br", "segredo")
            .await
            .unwrap();
        assert_eq!(ctx.role(), Some(Role::Gerente));
        assert_eq!(ctx.user().id, user.id);
    }

    #[tokio::test]
    async fn test_missing_profile_defaults_to_read_only() {
        let identity = InMemoryIdentity::new();
        let gateway = InMemoryGateway::new();
        identity.add_user("novo@hc.eng.br", "x", true).await;

        let ctx = SessionContext::sign_in(&identity, &gateway, "novo@hc.eng.br", "x")
            .await
            .unwrap();
        assert_eq!(ctx.role(), Some(Role::Visualizador));
        assert_eq!(ctx.profile().unwrap().email, "novo@hc.eng.br");
    }

    #[tokio::test]
    async fn test_sign_in_failures() {
        let identity = InMemoryIdentity::new();
        let gateway = InMemoryGateway::new();
        identity.add_user("pendente@hc.eng.br", "x", false).await;

        let wrong = SessionContext::sign_in(&identity, &gateway, "pendente@hc.eng.br", "y").await;
        assert_eq!(wrong.unwrap_err(), AuthError::InvalidCredentials);

        let unconfirmed =
            SessionContext::sign_in(&identity, &gateway, "pendente@hc.eng.br", "x").await;
        assert_eq!(unconfirmed.unwrap_err(), AuthError::EmailNotConfirmed);
    }

    #[tokio::test]
    async fn test_events_refresh_and_end_session() {
        let identity = InMemoryIdentity::new();
        let gateway = InMemoryGateway::new();
        identity.add_user("ana@hc.eng.br", "x", true).await;
        let mut events = identity.subscribe();

        let mut ctx = SessionContext::sign_in(&identity, &gateway, "ana@hc.eng.br", "x")
            .await
            .unwrap();
        assert!(matches!(events.recv().await.unwrap(), AuthEvent::SignedIn(_)));

        let refreshed = identity.refresh(&ctx.session().refresh_token).await.unwrap();
        let event = events.recv().await.unwrap();
        assert!(ctx.apply(&event, &gateway).await);
        assert_eq!(ctx.access_token(), refreshed.access_token);

        let token = ctx.access_token().to_string();
        ctx.clone().sign_out(&identity).await.unwrap();
        let event = events.recv().await.unwrap();
        assert!(!ctx.apply(&event, &gateway).await);
        assert_eq!(
            identity.get_user(&token).await.unwrap_err(),
            AuthError::NotAuthenticated
        );
    }

    #[tokio::test]
    async fn test_refresh_near_expiry() {
        let identity = InMemoryIdentity::new().with_token_lifetime(Duration::seconds(30));
        let gateway = InMemoryGateway::new();
        identity.add_user("ana@hc.eng.br", "x", true).await;

        let mut ctx = SessionContext::sign_in(&identity, &gateway, "ana@hc.eng.br", "x")
            .await
            .unwrap();
        assert!(ctx.needs_refresh(Utc::now()));
        let before = ctx.access_token().to_string();

        ctx.refresh(&identity).await.unwrap();
        assert_ne!(ctx.access_token(), before);
        assert_eq!(ctx.role(), Some(Role::Visualizador));

        // The old refresh token was consumed
        let mut stale = ctx.clone();
        stale.session.refresh_token = "consumed".into();
        assert_eq!(
            stale.refresh(&identity).await.unwrap_err(),
            AuthError::NotAuthenticated
        );
    }

    #[test]
    fn test_fresh_session_does_not_need_refresh() {
        let ctx = SessionContext {
            session: AuthSession {
                access_token: "a".into(),
                refresh_token: "r".into(),
                user: AuthUser {
                    id: Uuid::new_v4(),
                    email: None,
                },
                expires_at: Some(Utc::now() + Duration::hours(1)),
            },
            profile: None,
        };
        assert!(!ctx.needs_refresh(Utc::now()));
        assert!(ctx.needs_refresh(Utc::now() + Duration::minutes(59) + Duration::seconds(30)));
    }
}
