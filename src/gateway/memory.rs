//! In-process gateway backed by plain collections.
//!
//! Mirrors the hosted store's observable behavior: display numbers are
//! generated on insert, employees are unique by `matricula`, lists come back
//! ordered the same way.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Datelike, Utc};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use super::{collections, AseGateway, GatewayProvider, GatewayResult};
use crate::error::GatewayError;
use crate::models::{
    Ase, AseListItem, AsePayload, AseQuery, AseStatRow, AseStatus, AseWithTeam, Discipline,
    Employee, EmployeeListItem, EmployeeUpsert, Person, PersonType, Profile, Sector,
    Subdiscipline, TeamSnapshot,
};

#[derive(Default)]
struct MemoryStore {
    profiles: HashMap<Uuid, Profile>,
    sectors: Vec<Sector>,
    people: Vec<Person>,
    disciplines: Vec<Discipline>,
    subdisciplines: Vec<Subdiscipline>,
    employees: Vec<Employee>,
    ases: Vec<Ase>,
    teams: HashMap<Uuid, Vec<TeamSnapshot>>,
    next_number: u32,
    write_failure: Option<WriteFailure>,
}

/// Injected backend failure for mutations
struct WriteFailure {
    /// `None` fails writes to every collection
    collection: Option<String>,
    message: String,
}

impl MemoryStore {
    fn check_writable(&self, collection: &str) -> GatewayResult<()> {
        match &self.write_failure {
            Some(failure) if failure.collection.as_deref().map_or(true, |c| c == collection) => {
                Err(GatewayError::Backend {
                    collection: collection.to_string(),
                    status: 400,
                    message: failure.message.clone(),
                })
            }
            _ => Ok(()),
        }
    }

    fn list_item(&self, ase: &Ase) -> AseListItem {
        let manager = self.people.iter().find(|p| p.id == ase.manager_id);
        AseListItem {
            ase: ase.clone(),
            sector_name: self
                .sectors
                .iter()
                .find(|s| s.id == ase.sector_id)
                .map(|s| s.name.clone()),
            manager_name: manager.map(|p| p.name.clone()),
            manager_email: manager.and_then(|p| p.email.clone()),
            requester_email: self
                .profiles
                .get(&ase.requester_user_id)
                .map(|p| p.email.clone()),
            team_size: self.teams.get(&ase.id).map_or(0, Vec::len),
        }
    }
}

fn sorted_by_name<T: Clone>(items: &[T], name: impl Fn(&T) -> &str) -> Vec<T> {
    let mut items = items.to_vec();
    items.sort_by(|a, b| name(a).cmp(name(b)));
    items
}

#[derive(Clone, Default)]
pub struct InMemoryGateway {
    store: Arc<RwLock<MemoryStore>>,
}

impl InMemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_profile(&self, profile: Profile) {
        self.store.write().await.profiles.insert(profile.id, profile);
    }

    pub async fn add_sector(&self, name: &str) -> Sector {
        let sector = Sector {
            id: Uuid::new_v4(),
            name: name.to_string(),
        };
        self.store.write().await.sectors.push(sector.clone());
        sector
    }

    pub async fn add_person(&self, name: &str, person_type: PersonType) -> Person {
        let person = Person {
            id: Uuid::new_v4(),
            name: name.to_string(),
            person_type,
            email: None,
        };
        self.store.write().await.people.push(person.clone());
        person
    }

    pub async fn add_discipline(&self, name: &str) -> Discipline {
        let discipline = Discipline {
            id: Uuid::new_v4(),
            name: name.to_string(),
        };
        self.store.write().await.disciplines.push(discipline.clone());
        discipline
    }

    pub async fn add_subdiscipline(&self, discipline_id: Uuid, name: &str) -> Subdiscipline {
        let sub = Subdiscipline {
            id: Uuid::new_v4(),
            discipline_id,
            name: name.to_string(),
        };
        self.store.write().await.subdisciplines.push(sub.clone());
        sub
    }

    pub async fn add_employee(&self, matricula: &str, name: &str, function: &str) -> Employee {
        let employee = Employee {
            id: Uuid::new_v4(),
            matricula: matricula.to_string(),
            name: name.to_string(),
            function: Some(function.to_string()),
            sector_id: None,
            email: None,
        };
        self.store.write().await.employees.push(employee.clone());
        employee
    }

    /// Make every subsequent write fail with `message`, or clear with `None`.
    pub async fn fail_writes(&self, message: Option<&str>) {
        self.store.write().await.write_failure = message.map(|message| WriteFailure {
            collection: None,
            message: message.to_string(),
        });
    }

    /// Make writes to `collection` alone fail with `message`
    pub async fn fail_writes_to(&self, collection: &str, message: &str) {
        self.store.write().await.write_failure = Some(WriteFailure {
            collection: Some(collection.to_string()),
            message: message.to_string(),
        });
    }

    /// Move a record to `status` the way an external approver would
    pub async fn set_status(&self, ase_id: Uuid, status: AseStatus) -> bool {
        let mut store = self.store.write().await;
        match store.ases.iter_mut().find(|a| a.id == ase_id) {
            Some(ase) => {
                ase.status = status;
                true
            }
            None => false,
        }
    }

    pub async fn ase_count(&self) -> usize {
        self.store.read().await.ases.len()
    }

    pub async fn team_of(&self, ase_id: Uuid) -> Vec<TeamSnapshot> {
        self.store
            .read()
            .await
            .teams
            .get(&ase_id)
            .cloned()
            .unwrap_or_default()
    }
}

impl GatewayProvider for InMemoryGateway {
    fn scoped(&self, _access_token: &str) -> Arc<dyn AseGateway> {
        Arc::new(self.clone())
    }
}

#[async_trait]
impl AseGateway for InMemoryGateway {
    async fn fetch_profile(&self, user_id: Uuid) -> GatewayResult<Option<Profile>> {
        Ok(self.store.read().await.profiles.get(&user_id).cloned())
    }

    async fn list_sectors(&self) -> GatewayResult<Vec<Sector>> {
        Ok(sorted_by_name(&self.store.read().await.sectors, |s| &s.name))
    }

    async fn list_people(&self) -> GatewayResult<Vec<Person>> {
        Ok(sorted_by_name(&self.store.read().await.people, |p| &p.name))
    }

    async fn list_disciplines(&self) -> GatewayResult<Vec<Discipline>> {
        Ok(sorted_by_name(&self.store.read().await.disciplines, |d| &d.name))
    }

    async fn list_subdisciplines(&self, discipline_id: Uuid) -> GatewayResult<Vec<Subdiscipline>> {
        let store = self.store.read().await;
        let subs: Vec<_> = store
            .subdisciplines
            .iter()
            .filter(|s| s.discipline_id == discipline_id)
            .cloned()
            .collect();
        Ok(sorted_by_name(&subs, |s| &s.name))
    }

    async fn list_employees(&self) -> GatewayResult<Vec<EmployeeListItem>> {
        let store = self.store.read().await;
        Ok(sorted_by_name(&store.employees, |e| &e.name)
            .into_iter()
            .map(|employee| {
                let sector_name = employee
                    .sector_id
                    .and_then(|id| store.sectors.iter().find(|s| s.id == id))
                    .map(|s| s.name.clone());
                EmployeeListItem {
                    employee,
                    sector_name,
                }
            })
            .collect())
    }

    async fn upsert_employee(&self, upsert: &EmployeeUpsert) -> GatewayResult<Employee> {
        let mut store = self.store.write().await;
        store.check_writable(collections::EMPLOYEES)?;

        if let Some(existing) = store
            .employees
            .iter_mut()
            .find(|e| e.matricula == upsert.matricula)
        {
            existing.name = upsert.name.clone();
            existing.function = Some(upsert.function.clone());
            existing.sector_id = upsert.sector_id;
            existing.email = upsert.email.clone();
            return Ok(existing.clone());
        }

        let employee = Employee {
            id: Uuid::new_v4(),
            matricula: upsert.matricula.clone(),
            name: upsert.name.clone(),
            function: Some(upsert.function.clone()),
            sector_id: upsert.sector_id,
            email: upsert.email.clone(),
        };
        store.employees.push(employee.clone());
        Ok(employee)
    }

    async fn get_ase(&self, id: Uuid) -> GatewayResult<Option<AseWithTeam>> {
        let store = self.store.read().await;
        Ok(store.ases.iter().find(|a| a.id == id).map(|ase| AseWithTeam {
            ase: ase.clone(),
            team: store.teams.get(&id).cloned().unwrap_or_default(),
        }))
    }

    async fn insert_ase(&self, payload: &AsePayload) -> GatewayResult<Ase> {
        let mut store = self.store.write().await;
        store.check_writable(collections::ASE)?;

        store.next_number += 1;
        let ase = Ase {
            id: Uuid::new_v4(),
            number: format!("ASE-{}-{:04}", payload.date.year(), store.next_number),
            date: payload.date,
            start_time: payload.start_time,
            end_time: payload.end_time,
            sector_id: payload.sector_id,
            manager_id: payload.manager_id,
            supervisor_id: payload.supervisor_id,
            encarregado_id: payload.encarregado_id,
            discipline_id: payload.discipline_id,
            subdiscipline_id: payload.subdiscipline_id,
            justification: payload.justification.clone(),
            status: payload.status,
            requester_user_id: payload.requester_user_id,
            created_at: Utc::now(),
        };
        debug!("memory gateway: inserted {} ({})", ase.number, ase.id);
        store.ases.push(ase.clone());
        Ok(ase)
    }

    async fn update_ase(&self, id: Uuid, payload: &AsePayload) -> GatewayResult<Ase> {
        let mut store = self.store.write().await;
        store.check_writable(collections::ASE)?;

        let ase = store
            .ases
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| GatewayError::not_found(collections::ASE, id))?;
        ase.date = payload.date;
        ase.start_time = payload.start_time;
        ase.end_time = payload.end_time;
        ase.sector_id = payload.sector_id;
        ase.manager_id = payload.manager_id;
        ase.supervisor_id = payload.supervisor_id;
        ase.encarregado_id = payload.encarregado_id;
        ase.discipline_id = payload.discipline_id;
        ase.subdiscipline_id = payload.subdiscipline_id;
        ase.justification = payload.justification.clone();
        ase.status = payload.status;
        ase.requester_user_id = payload.requester_user_id;
        Ok(ase.clone())
    }

    async fn replace_team(&self, ase_id: Uuid, team: &[TeamSnapshot]) -> GatewayResult<()> {
        let mut store = self.store.write().await;
        store.check_writable(collections::ASE_TEAM)?;
        store.teams.insert(ase_id, team.to_vec());
        Ok(())
    }

    async fn list_ases(&self, query: &AseQuery) -> GatewayResult<Vec<AseListItem>> {
        let store = self.store.read().await;
        // Reverse first so equal timestamps keep the latest insert on top
        let mut ases: Vec<&Ase> = store.ases.iter().rev().filter(|a| query.matches(a)).collect();
        ases.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(ases.into_iter().map(|a| store.list_item(a)).collect())
    }

    async fn ase_stats(&self) -> GatewayResult<Vec<AseStatRow>> {
        let store = self.store.read().await;
        Ok(store
            .ases
            .iter()
            .map(|a| AseStatRow {
                status: a.status,
                date: a.date,
                start_time: a.start_time,
                end_time: a.end_time,
                team_size: store.teams.get(&a.id).map_or(0, Vec::len),
            })
            .collect())
    }
}
