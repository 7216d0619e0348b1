//! In-progress team selection for the authorization form

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Employee, TeamSnapshot};
use crate::rules::HhSummary;

/// Team being assembled on the form. Each employee appears at most once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TeamDraft {
    members: Vec<TeamSnapshot>,
}

impl TeamDraft {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from stored snapshots, dropping repeated employees
    pub fn from_snapshots(snapshots: impl IntoIterator<Item = TeamSnapshot>) -> Self {
        let mut draft = Self::new();
        for snapshot in snapshots {
            draft.push(snapshot);
        }
        draft
    }

    fn push(&mut self, snapshot: TeamSnapshot) -> bool {
        if self.contains(snapshot.employee_id) {
            return false;
        }
        self.members.push(snapshot);
        true
    }

    /// Add `employee`; returns `false` if already on the team
    pub fn add(&mut self, employee: &Employee) -> bool {
        self.push(TeamSnapshot::from(employee))
    }

    pub fn remove(&mut self, employee_id: Uuid) -> bool {
        let before = self.members.len();
        self.members.retain(|m| m.employee_id != employee_id);
        self.members.len() != before
    }

    pub fn contains(&self, employee_id: Uuid) -> bool {
        self.members.iter().any(|m| m.employee_id == employee_id)
    }

    pub fn members(&self) -> &[TeamSnapshot] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Employees matching `term` that are not on the team yet
    pub fn available<'a>(&self, employees: &'a [Employee], term: &str) -> Vec<&'a Employee> {
        employees
            .iter()
            .filter(|e| !self.contains(e.id) && e.matches(term))
            .collect()
    }

    pub fn summary(&self, start: NaiveTime, end: NaiveTime) -> HhSummary {
        HhSummary::compute(start, end, self.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn employee(matricula: &str, name: &str) -> Employee {
        Employee {
            id: Uuid::new_v4(),
            matricula: matricula.into(),
            name: name.into(),
            function: Some("Mecânico".into()),
            sector_id: None,
            email: None,
        }
    }

    #[test]
    fn test_add_ignores_duplicates() {
        let maria = employee("100", "Maria Souza");
        let mut team = TeamDraft::new();
        assert!(team.add(&maria));
        assert!(!team.add(&maria));
        assert_eq!(team.len(), 1);
        assert_eq!(team.members()[0].function, "Mecânico");
    }

    #[test]
    fn test_remove_and_available() {
        let maria = employee("100", "Maria Souza");
        let joao = employee("200", "João Pereira");
        let roster = vec![maria.clone(), joao.clone()];

        let mut team = TeamDraft::new();
        team.add(&maria);
        let available: Vec<_> = team.available(&roster, "").iter().map(|e| e.id).collect();
        assert_eq!(available, vec![joao.id]);
        assert!(team.available(&roster, "20").len() == 1);
        assert!(team.available(&roster, "maria").is_empty());

        assert!(team.remove(maria.id));
        assert!(!team.remove(maria.id));
        assert!(team.is_empty());
    }

    #[test]
    fn test_summary_uses_team_size() {
        let mut team = TeamDraft::new();
        team.add(&employee("1", "A"));
        team.add(&employee("2", "B"));
        let t = |h, m| NaiveTime::from_hms_opt(h, m, 0).unwrap();
        let summary = team.summary(t(17, 0), t(19, 30));
        assert_eq!(summary.man_hours, Decimal::new(50, 1));
        assert_eq!(summary.display, "5.0");
    }
}
