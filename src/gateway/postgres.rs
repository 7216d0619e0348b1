//! Direct PostgreSQL gateway
//!
//! Reads the same tables the REST API exposes. Display numbers are still
//! assigned by the database on insert.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool};
use tracing::info;
use uuid::Uuid;

use super::{collections, AseGateway, GatewayProvider, GatewayResult};
use crate::config::{mask_url, DatabaseConfig};
use crate::error::{GatewayError, ValidationError};
use crate::models::{
    Ase, AseListItem, AsePayload, AseQuery, AseStatRow, AseStatus, AseWithTeam, Discipline,
    Employee, EmployeeListItem, EmployeeUpsert, Person, PersonType, Profile, Role, Sector,
    Subdiscipline, TeamSnapshot,
};

const ASE_COLUMNS: &str = "a.id, a.number, a.date, a.start_time, a.end_time, a.sector_id, \
     a.manager_id, a.supervisor_id, a.encarregado_id, a.discipline_id, a.subdiscipline_id, \
     a.justification, a.status, a.requester_user_id, a.created_at";

#[derive(Clone, Debug)]
pub struct PgGateway {
    pool: PgPool,
}

impl PgGateway {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(config: &DatabaseConfig) -> GatewayResult<Self> {
        info!("Connecting to {}", mask_url(&config.database_url));
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.connection_timeout)
            .connect(&config.database_url)
            .await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Row-level security does not apply to a direct connection; every scope
/// shares the pool.
impl GatewayProvider for PgGateway {
    fn scoped(&self, _access_token: &str) -> Arc<dyn AseGateway> {
        Arc::new(self.clone())
    }
}

// ============================================================================
// Row types
// ============================================================================

#[derive(FromRow)]
struct ProfileRow {
    id: Uuid,
    email: Option<String>,
    role: String,
}

impl TryFrom<ProfileRow> for Profile {
    type Error = GatewayError;

    fn try_from(row: ProfileRow) -> Result<Self, Self::Error> {
        let role: Role = row
            .role
            .parse()
            .map_err(|e: ValidationError| {
                GatewayError::shape(collections::PROFILES, e.to_string())
            })?;
        Ok(Profile {
            id: row.id,
            email: row.email.unwrap_or_default(),
            role,
        })
    }
}

#[derive(FromRow)]
struct NamedRow {
    id: Uuid,
    name: String,
}

#[derive(FromRow)]
struct PersonRow {
    id: Uuid,
    name: String,
    #[sqlx(rename = "type")]
    person_type: String,
    email: Option<String>,
}

impl TryFrom<PersonRow> for Person {
    type Error = GatewayError;

    fn try_from(row: PersonRow) -> Result<Self, Self::Error> {
        let person_type: PersonType = row.person_type.parse().map_err(
            |e: ValidationError| GatewayError::shape(collections::PEOPLE, e.to_string()),
        )?;
        Ok(Person {
            id: row.id,
            name: row.name,
            person_type,
            email: row.email,
        })
    }
}

#[derive(FromRow)]
struct SubdisciplineRow {
    id: Uuid,
    discipline_id: Uuid,
    name: String,
}

#[derive(FromRow)]
struct EmployeeRow {
    id: Uuid,
    matricula: String,
    name: String,
    function: Option<String>,
    sector_id: Option<Uuid>,
    email: Option<String>,
}

impl From<EmployeeRow> for Employee {
    fn from(row: EmployeeRow) -> Self {
        Employee {
            id: row.id,
            matricula: row.matricula,
            name: row.name,
            function: row.function,
            sector_id: row.sector_id,
            email: row.email,
        }
    }
}

#[derive(FromRow)]
struct EmployeeListRow {
    #[sqlx(flatten)]
    employee: EmployeeRow,
    sector_name: Option<String>,
}

#[derive(FromRow)]
struct AseRow {
    id: Uuid,
    number: String,
    date: NaiveDate,
    start_time: NaiveTime,
    end_time: NaiveTime,
    sector_id: Uuid,
    manager_id: Uuid,
    supervisor_id: Option<Uuid>,
    encarregado_id: Option<Uuid>,
    discipline_id: Uuid,
    subdiscipline_id: Uuid,
    justification: Option<String>,
    status: String,
    requester_user_id: Uuid,
    created_at: DateTime<Utc>,
}

fn parse_status(raw: &str) -> GatewayResult<AseStatus> {
    raw.parse()
        .map_err(|e: ValidationError| GatewayError::shape(collections::ASE, e.to_string()))
}

impl TryFrom<AseRow> for Ase {
    type Error = GatewayError;

    fn try_from(row: AseRow) -> Result<Self, Self::Error> {
        Ok(Ase {
            id: row.id,
            number: row.number,
            date: row.date,
            start_time: row.start_time,
            end_time: row.end_time,
            sector_id: row.sector_id,
            manager_id: row.manager_id,
            supervisor_id: row.supervisor_id,
            encarregado_id: row.encarregado_id,
            discipline_id: row.discipline_id,
            subdiscipline_id: row.subdiscipline_id,
            justification: row.justification.unwrap_or_default(),
            status: parse_status(&row.status)?,
            requester_user_id: row.requester_user_id,
            created_at: row.created_at,
        })
    }
}

#[derive(FromRow)]
struct AseListRow {
    #[sqlx(flatten)]
    ase: AseRow,
    sector_name: Option<String>,
    manager_name: Option<String>,
    manager_email: Option<String>,
    requester_email: Option<String>,
    team_size: i64,
}

#[derive(FromRow)]
struct TeamRow {
    employee_id: Uuid,
    snapshot_matricula: String,
    snapshot_name: String,
    snapshot_function: Option<String>,
}

#[derive(FromRow)]
struct StatRow {
    status: String,
    date: NaiveDate,
    start_time: NaiveTime,
    end_time: NaiveTime,
    team_size: i64,
}

#[async_trait]
impl AseGateway for PgGateway {
    async fn fetch_profile(&self, user_id: Uuid) -> GatewayResult<Option<Profile>> {
        let row = sqlx::query_as::<_, ProfileRow>(
            "SELECT id, email, role FROM profiles WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Profile::try_from).transpose()
    }

    async fn list_sectors(&self) -> GatewayResult<Vec<Sector>> {
        let rows = sqlx::query_as::<_, NamedRow>("SELECT id, name FROM sectors ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .into_iter()
            .map(|r| Sector { id: r.id, name: r.name })
            .collect())
    }

    async fn list_people(&self) -> GatewayResult<Vec<Person>> {
        sqlx::query_as::<_, PersonRow>("SELECT id, name, type, email FROM people ORDER BY name")
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(Person::try_from)
            .collect()
    }

    async fn list_disciplines(&self) -> GatewayResult<Vec<Discipline>> {
        let rows =
            sqlx::query_as::<_, NamedRow>("SELECT id, name FROM disciplines ORDER BY name")
                .fetch_all(&self.pool)
                .await?;
        Ok(rows
            .into_iter()
            .map(|r| Discipline { id: r.id, name: r.name })
            .collect())
    }

    async fn list_subdisciplines(&self, discipline_id: Uuid) -> GatewayResult<Vec<Subdiscipline>> {
        let rows = sqlx::query_as::<_, SubdisciplineRow>(
            "SELECT id, discipline_id, name FROM subdisciplines WHERE discipline_id = $1 ORDER BY name",
        )
        .bind(discipline_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|r| Subdiscipline {
                id: r.id,
                discipline_id: r.discipline_id,
                name: r.name,
            })
            .collect())
    }

    async fn list_employees(&self) -> GatewayResult<Vec<EmployeeListItem>> {
        let rows = sqlx::query_as::<_, EmployeeListRow>(
            r#"SELECT e.id, e.matricula, e.name, e.function, e.sector_id, e.email, s.name AS sector_name
               FROM employees e LEFT JOIN sectors s ON s.id = e.sector_id
               ORDER BY e.name"#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|r| EmployeeListItem {
                employee: r.employee.into(),
                sector_name: r.sector_name,
            })
            .collect())
    }

    async fn upsert_employee(&self, employee: &EmployeeUpsert) -> GatewayResult<Employee> {
        let row = sqlx::query_as::<_, EmployeeRow>(
            r#"INSERT INTO employees (matricula, name, function, sector_id, email)
               VALUES ($1, $2, $3, $4, $5)
               ON CONFLICT (matricula) DO UPDATE SET
                   name = EXCLUDED.name,
                   function = EXCLUDED.function,
                   sector_id = EXCLUDED.sector_id,
                   email = EXCLUDED.email
               RETURNING id, matricula, name, function, sector_id, email"#,
        )
        .bind(&employee.matricula)
        .bind(&employee.name)
        .bind(&employee.function)
        .bind(employee.sector_id)
        .bind(&employee.email)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    async fn get_ase(&self, id: Uuid) -> GatewayResult<Option<AseWithTeam>> {
        let sql = format!("SELECT {} FROM ase a WHERE a.id = $1", ASE_COLUMNS);
        let Some(row) = sqlx::query_as::<_, AseRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
        else {
            return Ok(None);
        };

        let team = sqlx::query_as::<_, TeamRow>(
            r#"SELECT employee_id, snapshot_matricula, snapshot_name, snapshot_function
               FROM ase_team WHERE ase_id = $1 ORDER BY snapshot_name"#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(AseWithTeam {
            ase: row.try_into()?,
            team: team
                .into_iter()
                .map(|t| TeamSnapshot {
                    employee_id: t.employee_id,
                    matricula: t.snapshot_matricula,
                    name: t.snapshot_name,
                    function: t.snapshot_function.unwrap_or_default(),
                })
                .collect(),
        }))
    }

    async fn insert_ase(&self, payload: &AsePayload) -> GatewayResult<Ase> {
        let sql = format!(
            r#"INSERT INTO ase AS a (date, start_time, end_time, sector_id, manager_id, supervisor_id,
                   encarregado_id, discipline_id, subdiscipline_id, justification, status, requester_user_id)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
               RETURNING {}"#,
            ASE_COLUMNS
        );
        let row = sqlx::query_as::<_, AseRow>(&sql)
            .bind(payload.date)
            .bind(payload.start_time)
            .bind(payload.end_time)
            .bind(payload.sector_id)
            .bind(payload.manager_id)
            .bind(payload.supervisor_id)
            .bind(payload.encarregado_id)
            .bind(payload.discipline_id)
            .bind(payload.subdiscipline_id)
            .bind(&payload.justification)
            .bind(payload.status.as_str())
            .bind(payload.requester_user_id)
            .fetch_one(&self.pool)
            .await?;
        info!("Inserted ASE {} ({})", row.number, row.id);
        row.try_into()
    }

    async fn update_ase(&self, id: Uuid, payload: &AsePayload) -> GatewayResult<Ase> {
        let sql = format!(
            r#"UPDATE ase AS a SET date = $2, start_time = $3, end_time = $4, sector_id = $5,
                   manager_id = $6, supervisor_id = $7, encarregado_id = $8, discipline_id = $9,
                   subdiscipline_id = $10, justification = $11, status = $12, requester_user_id = $13
               WHERE a.id = $1
               RETURNING {}"#,
            ASE_COLUMNS
        );
        let row = sqlx::query_as::<_, AseRow>(&sql)
            .bind(id)
            .bind(payload.date)
            .bind(payload.start_time)
            .bind(payload.end_time)
            .bind(payload.sector_id)
            .bind(payload.manager_id)
            .bind(payload.supervisor_id)
            .bind(payload.encarregado_id)
            .bind(payload.discipline_id)
            .bind(payload.subdiscipline_id)
            .bind(&payload.justification)
            .bind(payload.status.as_str())
            .bind(payload.requester_user_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| GatewayError::not_found(collections::ASE, id))?;
        row.try_into()
    }

    async fn replace_team(&self, ase_id: Uuid, team: &[TeamSnapshot]) -> GatewayResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM ase_team WHERE ase_id = $1")
            .bind(ase_id)
            .execute(&mut *tx)
            .await?;

        for member in team {
            sqlx::query(
                r#"INSERT INTO ase_team (ase_id, employee_id, snapshot_matricula, snapshot_name, snapshot_function)
                   VALUES ($1, $2, $3, $4, $5)"#,
            )
            .bind(ase_id)
            .bind(member.employee_id)
            .bind(&member.matricula)
            .bind(&member.name)
            .bind(&member.function)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn list_ases(&self, query: &AseQuery) -> GatewayResult<Vec<AseListItem>> {
        let sql = format!(
            r#"SELECT {},
                   s.name AS sector_name, p.name AS manager_name, p.email AS manager_email,
                   pr.email AS requester_email,
                   (SELECT COUNT(*) FROM ase_team t WHERE t.ase_id = a.id) AS team_size
               FROM ase a
               LEFT JOIN sectors s ON s.id = a.sector_id
               LEFT JOIN people p ON p.id = a.manager_id
               LEFT JOIN profiles pr ON pr.id = a.requester_user_id
               WHERE ($1::uuid IS NULL OR a.id = $1)
                 AND ($2::uuid IS NULL OR a.requester_user_id = $2)
               ORDER BY a.created_at DESC"#,
            ASE_COLUMNS
        );
        let rows = sqlx::query_as::<_, AseListRow>(&sql)
            .bind(query.id)
            .bind(query.requester)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter()
            .map(|r| {
                Ok(AseListItem {
                    ase: r.ase.try_into()?,
                    sector_name: r.sector_name,
                    manager_name: r.manager_name,
                    manager_email: r.manager_email,
                    requester_email: r.requester_email,
                    team_size: usize::try_from(r.team_size).unwrap_or(0),
                })
            })
            .collect()
    }

    async fn ase_stats(&self) -> GatewayResult<Vec<AseStatRow>> {
        let rows = sqlx::query_as::<_, StatRow>(
            r#"SELECT a.status, a.date, a.start_time, a.end_time,
                   (SELECT COUNT(*) FROM ase_team t WHERE t.ase_id = a.id) AS team_size
               FROM ase a"#,
        )
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter()
            .map(|r| {
                Ok(AseStatRow {
                    status: parse_status(&r.status)?,
                    date: r.date,
                    start_time: r.start_time,
                    end_time: r.end_time,
                    team_size: usize::try_from(r.team_size).unwrap_or(0),
                })
            })
            .collect()
    }
}
