//! Authorization status and its display mapping

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Lifecycle state of an authorization. Wire values are the stored strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AseStatus {
    #[serde(rename = "RASCUNHO")]
    Draft,
    #[serde(rename = "PENDENTE")]
    Pending,
    #[serde(rename = "APROVADA")]
    Approved,
    #[serde(rename = "REPROVADA")]
    Rejected,
    #[serde(rename = "ENVIADA_DP")]
    SentToHr,
    #[serde(rename = "CONCLUIDA")]
    Completed,
}

impl AseStatus {
    pub const ALL: [AseStatus; 6] = [
        AseStatus::Draft,
        AseStatus::Pending,
        AseStatus::Approved,
        AseStatus::Rejected,
        AseStatus::SentToHr,
        AseStatus::Completed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AseStatus::Draft => "RASCUNHO",
            AseStatus::Pending => "PENDENTE",
            AseStatus::Approved => "APROVADA",
            AseStatus::Rejected => "REPROVADA",
            AseStatus::SentToHr => "ENVIADA_DP",
            AseStatus::Completed => "CONCLUIDA",
        }
    }

    /// Early states in which the requester may still edit the record
    pub fn is_editable(&self) -> bool {
        matches!(self, AseStatus::Draft | AseStatus::Pending)
    }

    /// Approved or any state past approval; these count toward HH totals.
    pub fn counts_as_approved(&self) -> bool {
        matches!(
            self,
            AseStatus::Approved | AseStatus::SentToHr | AseStatus::Completed
        )
    }

    pub fn badge(&self) -> StatusBadge {
        status_badge(self.as_str())
    }
}

impl fmt::Display for AseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AseStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AseStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ValidationError::UnknownValue {
                kind: "status",
                value: s.to_string(),
            })
    }
}

/// Icon shown next to a status label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StatusIcon {
    Edit,
    Clock,
    CheckCircle,
    XCircle,
    Send,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusBadge {
    pub label: String,
    pub icon: StatusIcon,
}

/// Display mapping for a raw status value. Total: unknown values keep their
/// text and fall back to the clock icon.
pub fn status_badge(raw: &str) -> StatusBadge {
    let icon = match raw {
        "RASCUNHO" => StatusIcon::Edit,
        "PENDENTE" => StatusIcon::Clock,
        "APROVADA" | "CONCLUIDA" => StatusIcon::CheckCircle,
        "REPROVADA" => StatusIcon::XCircle,
        "ENVIADA_DP" => StatusIcon::Send,
        _ => StatusIcon::Clock,
    };
    StatusBadge {
        label: raw.replacen('_', " ", 1),
        icon,
    }
}
