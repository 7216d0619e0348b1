//! Gateway over the hosted backend's REST API.
//!
//! Every collection is exposed at `<backend>/rest/v1/<collection>` with
//! PostgREST query syntax (`select`, `order`, `col=eq.value`). Responses are
//! parsed straight into typed rows; any mismatch is a `GatewayError::Shape`.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;
use uuid::Uuid;

use super::{collections, AseGateway, GatewayProvider, GatewayResult};
use crate::config::BackendConfig;
use crate::error::GatewayError;
use crate::models::{
    wall_time, Ase, AseListItem, AsePayload, AseQuery, AseStatRow, AseStatus, AseWithTeam,
    Discipline, Employee, EmployeeListItem, EmployeeUpsert, Person, Profile, Sector,
    Subdiscipline, TeamSnapshot,
};

const LIST_SELECT: &str =
    "*,sector:sectors(name),manager:people(name,email),requester:profiles(email),ase_team(id)";
const STATS_SELECT: &str = "status,date,start_time,end_time,ase_team(id)";

#[derive(Clone)]
pub struct RestGateway {
    client: Client,
    base: Url,
    anon_key: String,
    /// User access token; the anon key is used when absent
    access_token: Option<String>,
}

impl RestGateway {
    pub fn new(config: &BackendConfig) -> GatewayResult<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;
        let base = config
            .url
            .join("rest/v1/")
            .map_err(|e| GatewayError::Network {
                message: format!("invalid backend url: {}", e),
            })?;
        Ok(Self {
            client,
            base,
            anon_key: config.anon_key.clone(),
            access_token: None,
        })
    }

    /// Same connection, acting as the user behind `access_token`
    pub fn with_token(&self, access_token: &str) -> Self {
        Self {
            access_token: Some(access_token.to_string()),
            ..self.clone()
        }
    }

    fn request(&self, method: Method, collection: &str) -> GatewayResult<RequestBuilder> {
        let url = self
            .base
            .join(collection)
            .map_err(|e| GatewayError::Network {
                message: e.to_string(),
            })?;
        let bearer = self.access_token.as_deref().unwrap_or(&self.anon_key);
        Ok(self
            .client
            .request(method, url)
            .header("apikey", &self.anon_key)
            .bearer_auth(bearer))
    }

    async fn send<T: DeserializeOwned>(
        &self,
        collection: &str,
        request: RequestBuilder,
    ) -> GatewayResult<T> {
        let body = self.send_raw(collection, request).await?;
        serde_json::from_str(&body).map_err(|e| GatewayError::shape(collection, e.to_string()))
    }

    async fn send_raw(&self, collection: &str, request: RequestBuilder) -> GatewayResult<String> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        if status.is_success() {
            debug!("{} -> {} ({} bytes)", collection, status, body.len());
            return Ok(body);
        }
        let message = serde_json::from_str::<BackendErrorBody>(&body)
            .ok()
            .and_then(BackendErrorBody::into_message)
            .unwrap_or(body);
        warn!("{} request failed with {}: {}", collection, status, message);
        if status == StatusCode::UNAUTHORIZED {
            return Err(GatewayError::Unauthorized {
                collection: collection.to_string(),
                message,
            });
        }
        Err(GatewayError::Backend {
            collection: collection.to_string(),
            status: status.as_u16(),
            message,
        })
    }

    async fn list<T: DeserializeOwned>(
        &self,
        collection: &str,
        query: &[(&str, String)],
    ) -> GatewayResult<Vec<T>> {
        let request = self.request(Method::GET, collection)?.query(query);
        self.send(collection, request).await
    }

    /// Write `body` and return the single representation the store sends back
    async fn write_one<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        method: Method,
        collection: &str,
        query: &[(&str, String)],
        prefer: &str,
        body: &B,
    ) -> GatewayResult<T> {
        let request = self
            .request(method, collection)?
            .query(query)
            .header("Prefer", prefer)
            .json(body);
        let mut rows: Vec<T> = self.send(collection, request).await?;
        if rows.is_empty() {
            return Err(GatewayError::shape(collection, "write returned no rows"));
        }
        Ok(rows.swap_remove(0))
    }
}

impl GatewayProvider for RestGateway {
    fn scoped(&self, access_token: &str) -> Arc<dyn AseGateway> {
        Arc::new(self.with_token(access_token))
    }
}

fn eq(value: impl std::fmt::Display) -> String {
    format!("eq.{}", value)
}

fn by_name() -> (&'static str, String) {
    ("order", "name.asc".to_string())
}

fn select_all() -> (&'static str, String) {
    ("select", "*".to_string())
}

/// PostgREST error body; auth errors use `msg`/`error_description` instead
#[derive(Deserialize)]
struct BackendErrorBody {
    message: Option<String>,
    msg: Option<String>,
    error_description: Option<String>,
}

impl BackendErrorBody {
    fn into_message(self) -> Option<String> {
        self.message.or(self.msg).or(self.error_description)
    }
}

// ============================================================================
// Embedded-resource row shapes, converted to the public models
// ============================================================================

#[derive(Deserialize)]
struct NameRef {
    name: String,
    #[serde(default)]
    email: Option<String>,
}

#[derive(Deserialize)]
struct EmailRef {
    #[serde(default)]
    email: Option<String>,
}

#[derive(Deserialize)]
struct IdRef {
    #[allow(dead_code)]
    id: Uuid,
}

#[derive(Deserialize)]
struct EmployeeRow {
    #[serde(flatten)]
    employee: Employee,
    sector: Option<NameRef>,
}

impl From<EmployeeRow> for EmployeeListItem {
    fn from(row: EmployeeRow) -> Self {
        Self {
            employee: row.employee,
            sector_name: row.sector.map(|s| s.name),
        }
    }
}

#[derive(Deserialize)]
struct AseListRow {
    #[serde(flatten)]
    ase: Ase,
    sector: Option<NameRef>,
    manager: Option<NameRef>,
    requester: Option<EmailRef>,
    #[serde(default)]
    ase_team: Vec<IdRef>,
}

impl From<AseListRow> for AseListItem {
    fn from(row: AseListRow) -> Self {
        let (manager_name, manager_email) = match row.manager {
            Some(m) => (Some(m.name), m.email),
            None => (None, None),
        };
        Self {
            ase: row.ase,
            sector_name: row.sector.map(|s| s.name),
            manager_name,
            manager_email,
            requester_email: row.requester.and_then(|r| r.email),
            team_size: row.ase_team.len(),
        }
    }
}

#[derive(Deserialize)]
struct AseStatsRow {
    status: AseStatus,
    date: NaiveDate,
    #[serde(with = "wall_time")]
    start_time: NaiveTime,
    #[serde(with = "wall_time")]
    end_time: NaiveTime,
    #[serde(default)]
    ase_team: Vec<IdRef>,
}

#[derive(Serialize)]
struct TeamInsert<'a> {
    ase_id: Uuid,
    employee_id: Uuid,
    snapshot_matricula: &'a str,
    snapshot_name: &'a str,
    snapshot_function: &'a str,
}

#[async_trait]
impl AseGateway for RestGateway {
    async fn fetch_profile(&self, user_id: Uuid) -> GatewayResult<Option<Profile>> {
        let rows: Vec<Profile> = self
            .list(collections::PROFILES, &[select_all(), ("id", eq(user_id))])
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn list_sectors(&self) -> GatewayResult<Vec<Sector>> {
        self.list(collections::SECTORS, &[select_all(), by_name()])
            .await
    }

    async fn list_people(&self) -> GatewayResult<Vec<Person>> {
        self.list(collections::PEOPLE, &[select_all(), by_name()])
            .await
    }

    async fn list_disciplines(&self) -> GatewayResult<Vec<Discipline>> {
        self.list(collections::DISCIPLINES, &[select_all(), by_name()])
            .await
    }

    async fn list_subdisciplines(&self, discipline_id: Uuid) -> GatewayResult<Vec<Subdiscipline>> {
        self.list(
            collections::SUBDISCIPLINES,
            &[select_all(), ("discipline_id", eq(discipline_id)), by_name()],
        )
        .await
    }

    async fn list_employees(&self) -> GatewayResult<Vec<EmployeeListItem>> {
        let rows: Vec<EmployeeRow> = self
            .list(
                collections::EMPLOYEES,
                &[("select", "*,sector:sectors(name)".to_string()), by_name()],
            )
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn upsert_employee(&self, employee: &EmployeeUpsert) -> GatewayResult<Employee> {
        self.write_one(
            Method::POST,
            collections::EMPLOYEES,
            &[("on_conflict", "matricula".to_string())],
            "resolution=merge-duplicates,return=representation",
            employee,
        )
        .await
    }

    async fn get_ase(&self, id: Uuid) -> GatewayResult<Option<AseWithTeam>> {
        let rows: Vec<AseWithTeam> = self
            .list(
                collections::ASE,
                &[("select", "*,ase_team(*)".to_string()), ("id", eq(id))],
            )
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn insert_ase(&self, payload: &AsePayload) -> GatewayResult<Ase> {
        self.write_one(
            Method::POST,
            collections::ASE,
            &[],
            "return=representation",
            payload,
        )
        .await
    }

    async fn update_ase(&self, id: Uuid, payload: &AsePayload) -> GatewayResult<Ase> {
        self.write_one(
            Method::PATCH,
            collections::ASE,
            &[("id", eq(id))],
            "return=representation",
            payload,
        )
        .await
        .map_err(|e| match e {
            GatewayError::Shape { .. } => GatewayError::not_found(collections::ASE, id),
            other => other,
        })
    }

    async fn replace_team(&self, ase_id: Uuid, team: &[TeamSnapshot]) -> GatewayResult<()> {
        let delete = self
            .request(Method::DELETE, collections::ASE_TEAM)?
            .query(&[("ase_id", eq(ase_id))]);
        self.send_raw(collections::ASE_TEAM, delete).await?;

        if team.is_empty() {
            return Ok(());
        }
        let rows: Vec<TeamInsert<'_>> = team
            .iter()
            .map(|m| TeamInsert {
                ase_id,
                employee_id: m.employee_id,
                snapshot_matricula: &m.matricula,
                snapshot_name: &m.name,
                snapshot_function: &m.function,
            })
            .collect();
        let insert = self
            .request(Method::POST, collections::ASE_TEAM)?
            .header("Prefer", "return=minimal")
            .json(&rows);
        self.send_raw(collections::ASE_TEAM, insert).await?;
        Ok(())
    }

    async fn list_ases(&self, query: &AseQuery) -> GatewayResult<Vec<AseListItem>> {
        let mut params = vec![
            ("select", LIST_SELECT.to_string()),
            ("order", "created_at.desc".to_string()),
        ];
        if let Some(id) = query.id {
            params.push(("id", eq(id)));
        }
        if let Some(requester) = query.requester {
            params.push(("requester_user_id", eq(requester)));
        }
        let rows: Vec<AseListRow> = self.list(collections::ASE, &params).await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn ase_stats(&self) -> GatewayResult<Vec<AseStatRow>> {
        let rows: Vec<AseStatsRow> = self
            .list(collections::ASE, &[("select", STATS_SELECT.to_string())])
            .await?;
        Ok(rows
            .into_iter()
            .map(|r| AseStatRow {
                status: r.status,
                date: r.date,
                start_time: r.start_time,
                end_time: r.end_time,
                team_size: r.ase_team.len(),
            })
            .collect())
    }
}
