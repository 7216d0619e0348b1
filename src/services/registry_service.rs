//! Personnel registry (Efetivo): listing and spreadsheet import

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{AseError, AseResult};
use crate::gateway::AseGateway;
use crate::import::{self, ImportRow};
use crate::models::{EmployeeListItem, EmployeeUpsert};

/// Row the backend refused during an import
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportFailure {
    pub matricula: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub imported: usize,
    pub failed: Vec<ImportFailure>,
}

#[derive(Clone)]
pub struct RegistryService {
    gateway: Arc<dyn AseGateway>,
}

impl RegistryService {
    pub fn new(gateway: Arc<dyn AseGateway>) -> Self {
        Self { gateway }
    }

    /// Employees ordered by name, optionally filtered by name or matricula
    pub async fn list_employees(&self, search: Option<&str>) -> AseResult<Vec<EmployeeListItem>> {
        let employees = self.gateway.list_employees().await.map_err(|e| {
            warn!("Failed to load employees: {}", e);
            AseError::load("o efetivo", e)
        })?;
        Ok(match search {
            Some(term) => employees
                .into_iter()
                .filter(|item| item.employee.matches(term))
                .collect(),
            None => employees,
        })
    }

    /// Normalize CSV text into the rows that would be imported
    pub fn preview_import(&self, csv: &str) -> AseResult<Vec<ImportRow>> {
        Ok(import::read_csv(csv)?)
    }

    /// Upsert every row keyed on matricula. A failing row is logged and
    /// reported; the rest still go through.
    pub async fn confirm_import(&self, rows: &[ImportRow]) -> AseResult<ImportReport> {
        let sectors: HashMap<String, Uuid> = self
            .gateway
            .list_sectors()
            .await
            .map_err(|e| AseError::load("os setores", e))?
            .into_iter()
            .map(|s| (s.name.trim().to_lowercase(), s.id))
            .collect();

        let mut report = ImportReport::default();
        for row in rows {
            let upsert = EmployeeUpsert {
                matricula: row.matricula.clone(),
                name: row.name.clone(),
                function: row.function.clone(),
                sector_id: sectors.get(&row.sector_name.trim().to_lowercase()).copied(),
                email: row.email.clone(),
            };
            match self.gateway.upsert_employee(&upsert).await {
                Ok(_) => report.imported += 1,
                Err(e) => {
                    warn!("Import of matricula {} failed: {}", row.matricula, e);
                    report.failed.push(ImportFailure {
                        matricula: row.matricula.clone(),
                        message: e.backend_message(),
                    });
                }
            }
        }

        info!(
            "Imported {} employees ({} failed)",
            report.imported,
            report.failed.len()
        );
        Ok(report)
    }
}
