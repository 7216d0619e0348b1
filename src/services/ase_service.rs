//! Authorization form, list and detail operations

use std::sync::Arc;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use super::team_draft::TeamDraft;
use crate::error::{AseError, AseResult};
use crate::export::{self, ExportDocument};
use crate::gateway::AseGateway;
use crate::models::{
    Ase, AseForm, AseListItem, AsePayload, AseQuery, AseStatus, AseWithTeam, Discipline,
    EmployeeListItem, Person, PersonType, Profile, Sector, StatusBadge, Subdiscipline,
    TeamSnapshot,
};
use crate::rules::{
    authorize, build_payload, ensure_editable, HhSummary, SubmitAction, VIEW_ALL_ASES,
};
use crate::session::SessionContext;

/// Selection lists for the form
#[derive(Debug, Clone, Default, Serialize)]
pub struct FormOptions {
    pub sectors: Vec<Sector>,
    pub managers: Vec<Person>,
    pub supervisors: Vec<Person>,
    pub foremen: Vec<Person>,
    pub disciplines: Vec<Discipline>,
    pub employees: Vec<EmployeeListItem>,
}

impl FormOptions {
    fn people_of(people: &[Person], person_type: PersonType) -> Vec<Person> {
        people
            .iter()
            .filter(|p| p.person_type == person_type)
            .cloned()
            .collect()
    }
}

/// Stored authorization prepared for the edit form
#[derive(Debug, Clone, Serialize)]
pub struct EditableAse {
    pub ase: Ase,
    pub form: AseForm,
    pub team: Vec<TeamSnapshot>,
    pub subdisciplines: Vec<Subdiscipline>,
    pub hh: HhSummary,
    pub badge: StatusBadge,
    pub editable: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListMode {
    /// Only the current user's authorizations
    #[default]
    My,
    /// Everyone's; restricted by role
    All,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShareLink {
    pub text: String,
    pub url: String,
    pub deep_link: String,
}

/// Case-insensitive match on display number or sector name
fn matches_search(item: &AseListItem, term: &str) -> bool {
    let term = term.trim().to_lowercase();
    term.is_empty()
        || item.ase.number.to_lowercase().contains(&term)
        || item
            .sector_name
            .as_deref()
            .is_some_and(|s| s.to_lowercase().contains(&term))
}

#[derive(Clone)]
pub struct AseService {
    gateway: Arc<dyn AseGateway>,
}

impl AseService {
    pub fn new(gateway: Arc<dyn AseGateway>) -> Self {
        Self { gateway }
    }

    pub async fn form_options(&self) -> AseResult<FormOptions> {
        let (sectors, people, disciplines, employees) = tokio::try_join!(
            self.gateway.list_sectors(),
            self.gateway.list_people(),
            self.gateway.list_disciplines(),
            self.gateway.list_employees(),
        )
        .map_err(|e| {
            warn!("Failed to load form options: {}", e);
            AseError::load("as opções do formulário", e)
        })?;

        Ok(FormOptions {
            managers: FormOptions::people_of(&people, PersonType::Gerente),
            supervisors: FormOptions::people_of(&people, PersonType::Supervisor),
            foremen: FormOptions::people_of(&people, PersonType::Encarregado),
            sectors,
            disciplines,
            employees,
        })
    }

    pub async fn subdisciplines_for(&self, discipline_id: Uuid) -> AseResult<Vec<Subdiscipline>> {
        self.gateway
            .list_subdisciplines(discipline_id)
            .await
            .map_err(|e| AseError::load("as subdisciplinas", e))
    }

    pub async fn load_for_edit(&self, id: Uuid) -> AseResult<EditableAse> {
        let loaded = self.gateway.get_ase(id).await.map_err(|e| {
            warn!("Failed to load ASE {}: {}", id, e);
            AseError::load("a ASE", e)
        })?;
        let loaded = loaded.ok_or_else(|| AseError::NotFound { id: id.to_string() })?;
        let subdisciplines = self.subdisciplines_for(loaded.ase.discipline_id).await?;

        let ase = loaded.ase;
        Ok(EditableAse {
            form: AseForm::from(&ase),
            hh: HhSummary::compute(ase.start_time, ase.end_time, loaded.team.len()),
            badge: ase.status.badge(),
            editable: ase.status.is_editable(),
            team: loaded.team,
            subdisciplines,
            ase,
        })
    }

    /// Save the form as a new authorization or over `existing`, then replace
    /// its whole team.
    ///
    /// The backend has no multi-collection transaction, so writes are ordered
    /// to never leave a non-draft record without its team: a new record is
    /// stored as a draft until its team is in place, and an existing record
    /// gets its previous team back when a later write fails.
    pub async fn submit(
        &self,
        requester: Option<&Profile>,
        existing: Option<Uuid>,
        form: &AseForm,
        team: &[TeamSnapshot],
        action: SubmitAction,
    ) -> AseResult<Ase> {
        let team = TeamDraft::from_snapshots(team.iter().cloned());
        let payload = build_payload(form, team.len(), requester, action)?;

        let saved = match existing {
            Some(id) => self.save_existing(id, &payload, &team).await?,
            None => self.save_new(&payload, &team).await?,
        };

        info!(
            "Saved ASE {} ({}) as {} with {} team members",
            saved.number,
            saved.id,
            saved.status,
            team.len()
        );
        Ok(saved)
    }

    async fn save_new(&self, payload: &AsePayload, team: &TeamDraft) -> AseResult<Ase> {
        let staged = AsePayload {
            status: AseStatus::Draft,
            ..payload.clone()
        };
        let draft = self.gateway.insert_ase(&staged).await?;
        if let Err(e) = self.gateway.replace_team(draft.id, team.members()).await {
            warn!("Team write failed, ASE {} kept as draft: {}", draft.number, e);
            return Err(e.into());
        }
        if payload.status == AseStatus::Draft {
            return Ok(draft);
        }
        Ok(self.gateway.update_ase(draft.id, payload).await?)
    }

    async fn save_existing(
        &self,
        id: Uuid,
        payload: &AsePayload,
        team: &TeamDraft,
    ) -> AseResult<Ase> {
        let current = self
            .gateway
            .get_ase(id)
            .await
            .map_err(|e| AseError::load("a ASE", e))?
            .ok_or_else(|| AseError::NotFound { id: id.to_string() })?;
        ensure_editable(current.ase.status)?;

        // A partial replace may have removed the old rows already
        if let Err(e) = self.gateway.replace_team(id, team.members()).await {
            warn!("Team write failed for ASE {}: {}", current.ase.number, e);
            self.restore_team(&current).await;
            return Err(e.into());
        }
        match self.gateway.update_ase(id, payload).await {
            Ok(saved) => Ok(saved),
            Err(e) => {
                self.restore_team(&current).await;
                Err(e.into())
            }
        }
    }

    async fn restore_team(&self, previous: &AseWithTeam) {
        match self
            .gateway
            .replace_team(previous.ase.id, &previous.team)
            .await
        {
            Ok(()) => info!("Restored previous team of ASE {}", previous.ase.number),
            Err(e) => warn!(
                "Could not restore previous team of ASE {}: {}",
                previous.ase.number, e
            ),
        }
    }

    pub async fn list(
        &self,
        session: &SessionContext,
        mode: ListMode,
        search: Option<&str>,
    ) -> AseResult<Vec<AseListItem>> {
        let query = match mode {
            ListMode::My => AseQuery::requested_by(session.user().id),
            ListMode::All => {
                authorize(
                    session.role().unwrap_or_default(),
                    VIEW_ALL_ASES,
                    "list all authorizations",
                )?;
                AseQuery::all()
            }
        };

        let items = self.gateway.list_ases(&query).await.map_err(|e| {
            warn!("Failed to list ASEs: {}", e);
            AseError::load("as ASEs", e)
        })?;
        Ok(match search {
            Some(term) => items
                .into_iter()
                .filter(|item| matches_search(item, term))
                .collect(),
            None => items,
        })
    }

    pub async fn detail(&self, id: Uuid) -> AseResult<AseListItem> {
        self.gateway
            .list_ases(&AseQuery::by_id(id))
            .await
            .map_err(|e| AseError::load("a ASE", e))?
            .into_iter()
            .next()
            .ok_or_else(|| AseError::NotFound { id: id.to_string() })
    }

    pub async fn export(&self, id: Uuid, generated_at: NaiveDateTime) -> AseResult<ExportDocument> {
        let item = self.detail(id).await?;
        info!("Exporting ASE {}", item.ase.number);
        Ok(export::render(&item, generated_at))
    }

    pub async fn share(&self, id: Uuid, origin: &str) -> AseResult<ShareLink> {
        let item = self.detail(id).await?;
        Ok(ShareLink {
            text: export::share_text(origin, &item),
            url: export::whatsapp_url(origin, &item),
            deep_link: export::deep_link(origin, &item),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime, Utc};

    fn item(number: &str, sector: Option<&str>) -> AseListItem {
        AseListItem {
            ase: Ase {
                id: Uuid::new_v4(),
                number: number.into(),
                date: NaiveDate::from_ymd_opt(2026, 1, 5).unwrap(),
                start_time: NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
                end_time: NaiveTime::from_hms_opt(19, 0, 0).unwrap(),
                sector_id: Uuid::new_v4(),
                manager_id: Uuid::new_v4(),
                supervisor_id: None,
                encarregado_id: None,
                discipline_id: Uuid::new_v4(),
                subdiscipline_id: Uuid::new_v4(),
                justification: String::new(),
                status: AseStatus::Draft,
                requester_user_id: Uuid::new_v4(),
                created_at: Utc::now(),
            },
            sector_name: sector.map(str::to_string),
            manager_name: None,
            manager_email: None,
            requester_email: None,
            team_size: 0,
        }
    }

    #[test]
    fn test_search_by_number_or_sector() {
        let a = item("ASE-2026-0001", Some("Manutenção"));
        assert!(matches_search(&a, "0001"));
        assert!(matches_search(&a, "manut"));
        assert!(matches_search(&a, "  "));
        assert!(!matches_search(&a, "elétrica"));
        assert!(!matches_search(&item("ASE-2026-0002", None), "manut"));
    }

    #[test]
    fn test_list_mode_wire_values() {
        assert_eq!(serde_json::from_str::<ListMode>("\"all\"").unwrap(), ListMode::All);
        assert_eq!(ListMode::default(), ListMode::My);
    }
}
