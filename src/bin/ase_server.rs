//! ASE Fidel REST API server
//!
//! ## Usage
//!
//! ```bash
//! ASE_BACKEND_URL=https://<project>.supabase.co ASE_BACKEND_ANON_KEY=<key> \
//!   cargo run --bin ase_server
//!
//! curl -X POST http://localhost:3000/api/auth/login \
//!   -H "Content-Type: application/json" \
//!   -d '{"email": "ana@hc.eng.br", "password": "..."}'
//!
//! curl http://localhost:3000/api/ase?mode=my -H "Authorization: Bearer <session_id>"
//! curl http://localhost:3000/api/health
//! ```

use std::sync::Arc;

use anyhow::Context;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use ase_fidel::api::{create_router, AppState};
use ase_fidel::config::AppConfig;
use ase_fidel::gateway::{GatewayProvider, RestGateway};
use ase_fidel::session::HostedIdentity;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ase_fidel=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env().context("Failed to load configuration")?;
    info!("Starting ASE Fidel server, backend {}", config.backend.url);

    let identity = Arc::new(HostedIdentity::new(&config.backend)?);
    let gateways = gateway_provider(&config).await?;

    let state = Arc::new(AppState::new(identity, gateways, config.app_origin.clone()));
    let _listener = state.spawn_auth_listener();

    let app = create_router(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
    info!("Server running on http://{}", config.bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(feature = "database")]
async fn gateway_provider(config: &AppConfig) -> anyhow::Result<Arc<dyn GatewayProvider>> {
    if let Some(database) = &config.database {
        let gateway = ase_fidel::gateway::PgGateway::connect(database).await?;
        info!("Using direct database gateway");
        return Ok(Arc::new(gateway));
    }
    Ok(Arc::new(RestGateway::new(&config.backend)?))
}

#[cfg(not(feature = "database"))]
async fn gateway_provider(config: &AppConfig) -> anyhow::Result<Arc<dyn GatewayProvider>> {
    Ok(Arc::new(RestGateway::new(&config.backend)?))
}
