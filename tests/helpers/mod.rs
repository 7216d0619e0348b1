//! Shared fixture: an in-memory backend seeded with reference data and a
//! signed-in requester.

#![allow(dead_code)]

use chrono::{NaiveDate, NaiveTime};

use ase_fidel::gateway::InMemoryGateway;
use ase_fidel::models::{
    AseForm, Discipline, Employee, Person, PersonType, Profile, Role, Sector, Subdiscipline,
    TeamSnapshot,
};
use ase_fidel::session::{InMemoryIdentity, SessionContext};

pub const PASSWORD: &str = "senha-de-teste";

pub struct Fixture {
    pub gateway: InMemoryGateway,
    pub identity: InMemoryIdentity,
    pub sector: Sector,
    pub manager: Person,
    pub supervisor: Person,
    pub discipline: Discipline,
    pub subdiscipline: Subdiscipline,
    pub employees: Vec<Employee>,
}

impl Fixture {
    pub async fn new() -> Self {
        let gateway = InMemoryGateway::new();
        let identity = InMemoryIdentity::new();

        let sector = gateway.add_sector("Manutenção").await;
        gateway.add_sector("Elétrica").await;
        let manager = gateway.add_person("Carlos Lima", PersonType::Gerente).await;
        let supervisor = gateway
            .add_person("Beatriz Nunes", PersonType::Supervisor)
            .await;
        gateway
            .add_person("Rui Matos", PersonType::Encarregado)
            .await;
        let discipline = gateway.add_discipline("Mecânica").await;
        let subdiscipline = gateway
            .add_subdiscipline(discipline.id, "Caldeiraria")
            .await;

        let mut employees = Vec::new();
        for (matricula, name, function) in [
            ("1001", "Ana Ribeiro", "Soldadora"),
            ("1002", "Bruno Dias", "Mecânico"),
            ("1003", "Célia Rocha", "Eletricista"),
        ] {
            employees.push(gateway.add_employee(matricula, name, function).await);
        }

        Self {
            gateway,
            identity,
            sector,
            manager,
            supervisor,
            discipline,
            subdiscipline,
            employees,
        }
    }

    /// Register a user with `role` and sign them in
    pub async fn sign_in(&self, email: &str, role: Role) -> SessionContext {
        let user = self.identity.add_user(email, PASSWORD, true).await;
        self.gateway
            .add_profile(Profile {
                id: user.id,
                email: email.to_string(),
                role,
            })
            .await;
        SessionContext::sign_in(&self.identity, &self.gateway, email, PASSWORD)
            .await
            .expect("fixture sign-in")
    }

    /// Form ready for submission: references set, 17:00-19:00, justified
    pub fn complete_form(&self) -> AseForm {
        let mut form = AseForm::blank(NaiveDate::from_ymd_opt(2026, 4, 10).unwrap());
        form.sector_id = Some(self.sector.id);
        form.manager_id = Some(self.manager.id);
        form.supervisor_id = Some(self.supervisor.id);
        form.discipline_id = Some(self.discipline.id);
        form.subdiscipline_id = Some(self.subdiscipline.id);
        form.justification = "Parada programada da linha 2".to_string();
        form
    }

    pub fn team(&self, indexes: &[usize]) -> Vec<TeamSnapshot> {
        indexes
            .iter()
            .map(|&i| TeamSnapshot::from(&self.employees[i]))
            .collect()
    }
}

pub fn time(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}
