//! Data gateway: typed queries and mutations against the backend collections.
//!
//! `AseGateway` is the only way the services reach stored data. Three
//! implementations exist:
//! - `RestGateway`: the hosted backend's REST API (default)
//! - `PgGateway`: direct PostgreSQL connection (feature `database`)
//! - `InMemoryGateway`: in-process store for tests, demos and the CLI

pub mod memory;
#[cfg(feature = "database")]
pub mod postgres;
pub mod rest;

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::GatewayError;
use crate::models::{
    Ase, AseListItem, AsePayload, AseQuery, AseStatRow, AseWithTeam, Discipline, Employee,
    EmployeeListItem, EmployeeUpsert, Person, Profile, Sector, Subdiscipline, TeamSnapshot,
};

pub use memory::InMemoryGateway;
#[cfg(feature = "database")]
pub use postgres::PgGateway;
pub use rest::RestGateway;

pub type GatewayResult<T> = Result<T, GatewayError>;

/// Collection names in the backend
pub mod collections {
    pub const ASE: &str = "ase";
    pub const ASE_TEAM: &str = "ase_team";
    pub const EMPLOYEES: &str = "employees";
    pub const SECTORS: &str = "sectors";
    pub const PEOPLE: &str = "people";
    pub const DISCIPLINES: &str = "disciplines";
    pub const SUBDISCIPLINES: &str = "subdisciplines";
    pub const PROFILES: &str = "profiles";
}

#[async_trait]
pub trait AseGateway: Send + Sync {
    /// `Ok(None)` when the user has no profile row
    async fn fetch_profile(&self, user_id: Uuid) -> GatewayResult<Option<Profile>>;

    // Reference data, each ordered by name

    async fn list_sectors(&self) -> GatewayResult<Vec<Sector>>;
    async fn list_people(&self) -> GatewayResult<Vec<Person>>;
    async fn list_disciplines(&self) -> GatewayResult<Vec<Discipline>>;
    async fn list_subdisciplines(&self, discipline_id: Uuid) -> GatewayResult<Vec<Subdiscipline>>;

    // Personnel registry

    async fn list_employees(&self) -> GatewayResult<Vec<EmployeeListItem>>;

    /// Insert or update keyed on `matricula`
    async fn upsert_employee(&self, employee: &EmployeeUpsert) -> GatewayResult<Employee>;

    // Authorizations

    async fn get_ase(&self, id: Uuid) -> GatewayResult<Option<AseWithTeam>>;
    async fn insert_ase(&self, payload: &AsePayload) -> GatewayResult<Ase>;
    async fn update_ase(&self, id: Uuid, payload: &AsePayload) -> GatewayResult<Ase>;

    /// Delete every team snapshot of `ase_id`, then insert `team`.
    async fn replace_team(&self, ase_id: Uuid, team: &[TeamSnapshot]) -> GatewayResult<()>;

    /// Newest first, with sector/manager/requester resolved
    async fn list_ases(&self, query: &AseQuery) -> GatewayResult<Vec<AseListItem>>;

    async fn ase_stats(&self) -> GatewayResult<Vec<AseStatRow>>;
}

/// Hands out gateways scoped to one user's access token, so row-level
/// security in the backend sees the right user.
pub trait GatewayProvider: Send + Sync {
    fn scoped(&self, access_token: &str) -> Arc<dyn AseGateway>;
}
