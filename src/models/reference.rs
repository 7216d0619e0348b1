//! Reference tables: sectors, people (approvers), disciplines, profiles

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::role::{PersonType, Role};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sector {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub id: Uuid,
    pub name: String,
    #[serde(rename = "type")]
    pub person_type: PersonType,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Discipline {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subdiscipline {
    pub id: Uuid,
    pub discipline_id: Uuid,
    pub name: String,
}

/// Application profile attached to an authenticated user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    #[serde(default)]
    pub email: String,
    pub role: Role,
}

impl Profile {
    /// Fallback used when the user has no profile row yet
    pub fn read_only(id: Uuid, email: Option<&str>) -> Self {
        Self {
            id,
            email: email.unwrap_or_default().to_string(),
            role: Role::default(),
        }
    }
}
