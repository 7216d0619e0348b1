//! User roles and approver type tags

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Role governing feature visibility
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    SuperAdmin,
    Admin,
    Gerente,
    Coordenador,
    Supervisor,
    Encarregado,
    Visualizador,
}

impl Role {
    pub const ALL: [Role; 7] = [
        Role::SuperAdmin,
        Role::Admin,
        Role::Gerente,
        Role::Coordenador,
        Role::Supervisor,
        Role::Encarregado,
        Role::Visualizador,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::SuperAdmin => "SUPER_ADMIN",
            Role::Admin => "ADMIN",
            Role::Gerente => "GERENTE",
            Role::Coordenador => "COORDENADOR",
            Role::Supervisor => "SUPERVISOR",
            Role::Encarregado => "ENCARREGADO",
            Role::Visualizador => "VISUALIZADOR",
        }
    }
}

impl Default for Role {
    /// Minimal read-only role, used when a user has no profile record
    fn default() -> Self {
        Role::Visualizador
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| ValidationError::UnknownValue {
                kind: "role",
                value: s.to_string(),
            })
    }
}

/// Type tag on approver records, used to filter the form's selection lists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PersonType {
    Gerente,
    Supervisor,
    Encarregado,
}

impl PersonType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PersonType::Gerente => "GERENTE",
            PersonType::Supervisor => "SUPERVISOR",
            PersonType::Encarregado => "ENCARREGADO",
        }
    }
}

impl FromStr for PersonType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [PersonType::Gerente, PersonType::Supervisor, PersonType::Encarregado]
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ValidationError::UnknownValue {
                kind: "person type",
                value: s.to_string(),
            })
    }
}
