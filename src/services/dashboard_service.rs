//! Dashboard totals

use std::sync::Arc;

use tracing::warn;

use crate::error::{AseError, AseResult};
use crate::gateway::AseGateway;
use crate::rules::DashboardStats;

#[derive(Clone)]
pub struct DashboardService {
    gateway: Arc<dyn AseGateway>,
}

impl DashboardService {
    pub fn new(gateway: Arc<dyn AseGateway>) -> Self {
        Self { gateway }
    }

    pub async fn stats(&self) -> AseResult<DashboardStats> {
        let rows = self.gateway.ase_stats().await.map_err(|e| {
            warn!("Failed to load dashboard: {}", e);
            AseError::load("o painel", e)
        })?;
        Ok(DashboardStats::from_rows(&rows))
    }
}
