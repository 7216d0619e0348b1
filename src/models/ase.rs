//! Authorization (ASE) records and team snapshots

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use super::employee::Employee;
use super::status::AseStatus;
use super::wall_time;

/// Stored authorization record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ase {
    pub id: Uuid,
    /// Display number generated by the store, e.g. `ASE-2026-0042`
    pub number: String,
    pub date: NaiveDate,
    #[serde(with = "wall_time")]
    pub start_time: NaiveTime,
    #[serde(with = "wall_time")]
    pub end_time: NaiveTime,
    pub sector_id: Uuid,
    pub manager_id: Uuid,
    #[serde(default)]
    pub supervisor_id: Option<Uuid>,
    #[serde(default)]
    pub encarregado_id: Option<Uuid>,
    pub discipline_id: Uuid,
    pub subdiscipline_id: Uuid,
    #[serde(default)]
    pub justification: String,
    pub status: AseStatus,
    pub requester_user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Editable fields of the authorization form.
///
/// Selection fields are optional so a half-filled form can be validated and
/// reported field by field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AseForm {
    pub date: NaiveDate,
    #[serde(with = "wall_time")]
    pub start_time: NaiveTime,
    #[serde(with = "wall_time")]
    pub end_time: NaiveTime,
    #[serde(default)]
    pub sector_id: Option<Uuid>,
    #[serde(default)]
    pub manager_id: Option<Uuid>,
    #[serde(default)]
    pub supervisor_id: Option<Uuid>,
    #[serde(default)]
    pub encarregado_id: Option<Uuid>,
    #[serde(default)]
    pub discipline_id: Option<Uuid>,
    #[serde(default)]
    pub subdiscipline_id: Option<Uuid>,
    #[serde(default)]
    pub justification: String,
}

impl AseForm {
    /// Blank form for `date`, using the usual 17:00-19:00 overtime window
    pub fn blank(date: NaiveDate) -> Self {
        Self {
            date,
            start_time: NaiveTime::from_hms_opt(17, 0, 0).unwrap_or(NaiveTime::MIN),
            end_time: NaiveTime::from_hms_opt(19, 0, 0).unwrap_or(NaiveTime::MIN),
            sector_id: None,
            manager_id: None,
            supervisor_id: None,
            encarregado_id: None,
            discipline_id: None,
            subdiscipline_id: None,
            justification: String::new(),
        }
    }
}

impl From<&Ase> for AseForm {
    fn from(ase: &Ase) -> Self {
        Self {
            date: ase.date,
            start_time: ase.start_time,
            end_time: ase.end_time,
            sector_id: Some(ase.sector_id),
            manager_id: Some(ase.manager_id),
            supervisor_id: ase.supervisor_id,
            encarregado_id: ase.encarregado_id,
            discipline_id: Some(ase.discipline_id),
            subdiscipline_id: Some(ase.subdiscipline_id),
            justification: ase.justification.clone(),
        }
    }
}

/// Validated write payload for the `ase` collection
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AsePayload {
    pub date: NaiveDate,
    #[serde(with = "wall_time")]
    pub start_time: NaiveTime,
    #[serde(with = "wall_time")]
    pub end_time: NaiveTime,
    pub sector_id: Uuid,
    pub manager_id: Uuid,
    pub supervisor_id: Option<Uuid>,
    pub encarregado_id: Option<Uuid>,
    pub discipline_id: Uuid,
    pub subdiscipline_id: Uuid,
    pub justification: String,
    pub status: AseStatus,
    pub requester_user_id: Uuid,
}

/// Employee snapshot owned by one authorization. Not updated when the
/// employee record changes later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamSnapshot {
    pub employee_id: Uuid,
    #[serde(rename = "snapshot_matricula")]
    pub matricula: String,
    #[serde(rename = "snapshot_name")]
    pub name: String,
    #[serde(
        rename = "snapshot_function",
        default,
        deserialize_with = "null_as_empty"
    )]
    pub function: String,
}

/// The store keeps `null` for employees registered without a function
fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

impl From<&Employee> for TeamSnapshot {
    fn from(employee: &Employee) -> Self {
        Self {
            employee_id: employee.id,
            matricula: employee.matricula.clone(),
            name: employee.name.clone(),
            function: employee.function.clone().unwrap_or_default(),
        }
    }
}

/// Authorization with its team, as loaded for editing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AseWithTeam {
    #[serde(flatten)]
    pub ase: Ase,
    #[serde(rename = "ase_team", default)]
    pub team: Vec<TeamSnapshot>,
}

/// Row of the authorization list, with references resolved to names
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AseListItem {
    #[serde(flatten)]
    pub ase: Ase,
    pub sector_name: Option<String>,
    pub manager_name: Option<String>,
    pub manager_email: Option<String>,
    pub requester_email: Option<String>,
    pub team_size: usize,
}

/// Query filter for the authorization list
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AseQuery {
    pub id: Option<Uuid>,
    pub requester: Option<Uuid>,
}

impl AseQuery {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn requested_by(user_id: Uuid) -> Self {
        Self {
            requester: Some(user_id),
            ..Self::default()
        }
    }

    pub fn by_id(id: Uuid) -> Self {
        Self {
            id: Some(id),
            ..Self::default()
        }
    }

    pub fn matches(&self, ase: &Ase) -> bool {
        self.id.map_or(true, |id| ase.id == id)
            && self.requester.map_or(true, |r| ase.requester_user_id == r)
    }
}

/// Minimal projection used by the dashboard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AseStatRow {
    pub status: AseStatus,
    pub date: NaiveDate,
    #[serde(with = "wall_time")]
    pub start_time: NaiveTime,
    #[serde(with = "wall_time")]
    pub end_time: NaiveTime,
    pub team_size: usize,
}
