//! Personnel registry (Efetivo) records

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    pub id: Uuid,
    /// Registration number, unique across the registry
    pub matricula: String,
    pub name: String,
    #[serde(default)]
    pub function: Option<String>,
    #[serde(default)]
    pub sector_id: Option<Uuid>,
    #[serde(default)]
    pub email: Option<String>,
}

impl Employee {
    /// Case-insensitive name match or registration-number substring match.
    /// An empty term matches everyone.
    pub fn matches(&self, term: &str) -> bool {
        let term = term.trim();
        term.is_empty()
            || self.name.to_lowercase().contains(&term.to_lowercase())
            || self.matricula.contains(term)
    }
}

/// Employee with its sector name resolved, for the registry screen
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeListItem {
    #[serde(flatten)]
    pub employee: Employee,
    pub sector_name: Option<String>,
}

/// Upsert payload keyed on `matricula`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeUpsert {
    pub matricula: String,
    pub name: String,
    pub function: String,
    pub sector_id: Option<Uuid>,
    pub email: Option<String>,
}
