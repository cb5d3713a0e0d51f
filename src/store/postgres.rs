//! Postgres-backed store
//!
//! Money is stored as BIGINT cents and enums as lowercase text. State
//! changes run inside a transaction that locks the project row first (and
//! the bid row second, when one is involved), then applies the same domain
//! transition the services checked up front.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use std::collections::HashMap;
use uuid::Uuid;

use super::{Acceptance, MarketplaceStore, StoreError};
use crate::domain::{
    Availability, Bid, BidStatus, Category, ClientProfile, FreelancerProfile, Money, Principal,
    Project, ProjectStatus, Role, RoleProfile, Skill, SkillName, StateError,
};

const PRINCIPAL_COLUMNS: &str = "id, username, name, email, bio, role, company_name, \
     company_website, availability, hourly_rate_cents, payment_account, created_at";

const PROJECT_COLUMNS: &str = "id, client_id, freelancer_id, title, description, category, \
     required_skills, budget_cents, status, payment_intent_id, submission_notes, submitted_at, \
     created_at, updated_at";

const BID_COLUMNS: &str =
    "id, project_id, freelancer_id, amount_cents, proposal, status, created_at, updated_at";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// ========== Row types ==========

#[derive(Debug, sqlx::FromRow)]
struct PrincipalRow {
    id: Uuid,
    username: String,
    name: String,
    email: Option<String>,
    bio: Option<String>,
    role: String,
    company_name: Option<String>,
    company_website: Option<String>,
    availability: Option<String>,
    hourly_rate_cents: Option<i64>,
    payment_account: Option<String>,
    created_at: DateTime<Utc>,
}

impl PrincipalRow {
    fn into_principal(self, skills: Vec<Skill>) -> Result<Principal, StoreError> {
        let role = Role::from_db(&self.role)
            .ok_or_else(|| StoreError::Corrupt(format!("unknown role '{}'", self.role)))?;

        let profile = match role {
            Role::Client => RoleProfile::Client(ClientProfile {
                company_name: self.company_name,
                company_website: self.company_website,
            }),
            Role::Freelancer => {
                let availability = match self.availability.as_deref() {
                    Some(raw) => Availability::from_db(raw).ok_or_else(|| {
                        StoreError::Corrupt(format!("unknown availability '{raw}'"))
                    })?,
                    None => Availability::default(),
                };
                RoleProfile::Freelancer(FreelancerProfile {
                    availability,
                    hourly_rate: self.hourly_rate_cents.map(Money::from_cents),
                    skills,
                    payment_account: self.payment_account,
                })
            }
        };

        Ok(Principal {
            id: self.id,
            username: self.username,
            name: self.name,
            email: self.email,
            bio: self.bio,
            profile,
            created_at: self.created_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SkillRow {
    id: Uuid,
    name: String,
}

impl From<SkillRow> for Skill {
    fn from(row: SkillRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct PrincipalSkillRow {
    principal_id: Uuid,
    id: Uuid,
    name: String,
}

#[derive(Debug, sqlx::FromRow)]
struct ProjectRow {
    id: Uuid,
    client_id: Uuid,
    freelancer_id: Option<Uuid>,
    title: String,
    description: String,
    category: String,
    required_skills: String,
    budget_cents: i64,
    status: String,
    payment_intent_id: Option<String>,
    submission_notes: Option<String>,
    submitted_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ProjectRow> for Project {
    type Error = StoreError;

    fn try_from(row: ProjectRow) -> Result<Self, Self::Error> {
        let status = ProjectStatus::from_db(&row.status)
            .ok_or_else(|| StoreError::Corrupt(format!("unknown project status '{}'", row.status)))?;
        let category = Category::from_db(&row.category)
            .ok_or_else(|| StoreError::Corrupt(format!("unknown category '{}'", row.category)))?;

        Ok(Self {
            id: row.id,
            client_id: row.client_id,
            freelancer_id: row.freelancer_id,
            title: row.title,
            description: row.description,
            category,
            required_skills: row.required_skills,
            budget: Money::from_cents(row.budget_cents),
            status,
            payment_intent_id: row.payment_intent_id,
            submission_notes: row.submission_notes,
            submitted_at: row.submitted_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct BidRow {
    id: Uuid,
    project_id: Uuid,
    freelancer_id: Uuid,
    amount_cents: i64,
    proposal: String,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<BidRow> for Bid {
    type Error = StoreError;

    fn try_from(row: BidRow) -> Result<Self, Self::Error> {
        let status = BidStatus::from_db(&row.status)
            .ok_or_else(|| StoreError::Corrupt(format!("unknown bid status '{}'", row.status)))?;

        Ok(Self {
            id: row.id,
            project_id: row.project_id,
            freelancer_id: row.freelancer_id,
            amount: Money::from_cents(row.amount_cents),
            proposal: row.proposal,
            status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn collect<R, T>(rows: Vec<R>) -> Result<Vec<T>, StoreError>
where
    T: TryFrom<R, Error = StoreError>,
{
    rows.into_iter().map(T::try_from).collect()
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .map_or(false, |db| db.is_unique_violation())
}

fn constraint_of(err: &sqlx::Error) -> Option<&str> {
    err.as_database_error().and_then(|db| db.constraint())
}

// ========== Locked reads and write-backs ==========

#[derive(Clone, Copy)]
enum RowLock {
    Share,
    Update,
}

impl RowLock {
    fn clause(self) -> &'static str {
        match self {
            Self::Share => "FOR SHARE",
            Self::Update => "FOR UPDATE",
        }
    }
}

async fn lock_project(
    conn: &mut PgConnection,
    id: Uuid,
    lock: RowLock,
) -> Result<Project, StoreError> {
    let sql = format!(
        "SELECT {PROJECT_COLUMNS} FROM projects WHERE id = $1 {}",
        lock.clause()
    );
    let row = sqlx::query_as::<_, ProjectRow>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or(StoreError::NotFound("project"))?;
    row.try_into()
}

async fn lock_bid(conn: &mut PgConnection, id: Uuid) -> Result<Bid, StoreError> {
    let sql = format!("SELECT {BID_COLUMNS} FROM bids WHERE id = $1 FOR UPDATE");
    let row = sqlx::query_as::<_, BidRow>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or(StoreError::NotFound("bid"))?;
    row.try_into()
}

async fn write_project(conn: &mut PgConnection, project: &Project) -> Result<(), StoreError> {
    sqlx::query(
        r#"
        UPDATE projects
        SET freelancer_id = $2, budget_cents = $3, status = $4, payment_intent_id = $5,
            submission_notes = $6, submitted_at = $7, updated_at = $8
        WHERE id = $1
        "#,
    )
    .bind(project.id)
    .bind(project.freelancer_id)
    .bind(project.budget.cents())
    .bind(project.status.as_db_str())
    .bind(&project.payment_intent_id)
    .bind(&project.submission_notes)
    .bind(project.submitted_at)
    .bind(project.updated_at)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn write_bid_status(conn: &mut PgConnection, bid: &Bid) -> Result<(), StoreError> {
    sqlx::query("UPDATE bids SET status = $2, updated_at = $3 WHERE id = $1")
        .bind(bid.id)
        .bind(bid.status.as_db_str())
        .bind(bid.updated_at)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

async fn bid_project_id(pool: &PgPool, bid_id: Uuid) -> Result<Uuid, StoreError> {
    sqlx::query_scalar("SELECT project_id FROM bids WHERE id = $1")
        .bind(bid_id)
        .fetch_optional(pool)
        .await?
        .ok_or(StoreError::NotFound("bid"))
}

async fn replace_skill_links(
    conn: &mut PgConnection,
    principal_id: Uuid,
    skills: &[Skill],
) -> Result<(), StoreError> {
    sqlx::query("DELETE FROM freelancer_skills WHERE principal_id = $1")
        .bind(principal_id)
        .execute(&mut *conn)
        .await?;

    if !skills.is_empty() {
        let ids: Vec<Uuid> = skills.iter().map(|s| s.id).collect();
        sqlx::query(
            "INSERT INTO freelancer_skills (principal_id, skill_id) SELECT $1, UNNEST($2::uuid[])",
        )
        .bind(principal_id)
        .bind(ids)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

impl PgStore {
    async fn skills_for(&self, principal_ids: &[Uuid]) -> Result<HashMap<Uuid, Vec<Skill>>, StoreError> {
        let rows = sqlx::query_as::<_, PrincipalSkillRow>(
            r#"
            SELECT fs.principal_id, s.id, s.name
            FROM freelancer_skills fs
            JOIN skills s ON s.id = fs.skill_id
            WHERE fs.principal_id = ANY($1)
            ORDER BY s.name
            "#,
        )
        .bind(principal_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut by_principal: HashMap<Uuid, Vec<Skill>> = HashMap::new();
        for row in rows {
            by_principal.entry(row.principal_id).or_default().push(Skill {
                id: row.id,
                name: row.name,
            });
        }
        Ok(by_principal)
    }

    async fn hydrate(&self, rows: Vec<PrincipalRow>) -> Result<Vec<Principal>, StoreError> {
        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let mut skills = self.skills_for(&ids).await?;
        rows.into_iter()
            .map(|row| {
                let own = skills.remove(&row.id).unwrap_or_default();
                row.into_principal(own)
            })
            .collect()
    }
}

#[async_trait]
impl MarketplaceStore for PgStore {
    async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await.is_ok()
    }

    // ========== Principals ==========

    async fn insert_principal(&self, principal: &Principal) -> Result<(), StoreError> {
        let (company_name, company_website) = match principal.as_client() {
            Some(c) => (c.company_name.clone(), c.company_website.clone()),
            None => (None, None),
        };
        let freelancer = principal.as_freelancer();

        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO principals (id, username, name, email, bio, role, company_name,
                                    company_website, availability, hourly_rate_cents, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(principal.id)
        .bind(&principal.username)
        .bind(&principal.name)
        .bind(&principal.email)
        .bind(&principal.bio)
        .bind(principal.role().as_db_str())
        .bind(company_name)
        .bind(company_website)
        .bind(freelancer.map(|f| f.availability.as_db_str()))
        .bind(freelancer.and_then(|f| f.hourly_rate).map(Money::cents))
        .bind(principal.created_at)
        .execute(&mut *tx)
        .await;

        if let Err(err) = inserted {
            if is_unique_violation(&err) {
                let message = match constraint_of(&err) {
                    Some("principals_pkey") => "profile already registered".to_string(),
                    _ => format!("username '{}' is already taken", principal.username),
                };
                return Err(StoreError::Conflict(message));
            }
            return Err(err.into());
        }

        replace_skill_links(&mut tx, principal.id, principal.skills()).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn get_principal(&self, id: Uuid) -> Result<Option<Principal>, StoreError> {
        let sql = format!("SELECT {PRINCIPAL_COLUMNS} FROM principals WHERE id = $1");
        let row = sqlx::query_as::<_, PrincipalRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(self.hydrate(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn update_principal(&self, principal: &Principal) -> Result<(), StoreError> {
        let (company_name, company_website) = match principal.as_client() {
            Some(c) => (c.company_name.clone(), c.company_website.clone()),
            None => (None, None),
        };
        let freelancer = principal.as_freelancer();

        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE principals
            SET name = $3, email = $4, bio = $5, company_name = $6, company_website = $7,
                availability = $8, hourly_rate_cents = $9, updated_at = NOW()
            WHERE id = $1 AND role = $2
            "#,
        )
        .bind(principal.id)
        .bind(principal.role().as_db_str())
        .bind(&principal.name)
        .bind(&principal.email)
        .bind(&principal.bio)
        .bind(company_name)
        .bind(company_website)
        .bind(freelancer.map(|f| f.availability.as_db_str()))
        .bind(freelancer.and_then(|f| f.hourly_rate).map(Money::cents))
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(StoreError::NotFound("principal"));
        }

        if principal.is_freelancer() {
            replace_skill_links(&mut tx, principal.id, principal.skills()).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn set_payment_account(
        &self,
        principal_id: Uuid,
        account: &str,
    ) -> Result<String, StoreError> {
        let stored: Option<Option<String>> = sqlx::query_scalar(
            r#"
            UPDATE principals
            SET payment_account = COALESCE(payment_account, $2), updated_at = NOW()
            WHERE id = $1 AND role = 'freelancer'
            RETURNING payment_account
            "#,
        )
        .bind(principal_id)
        .bind(account)
        .fetch_optional(&self.pool)
        .await?;

        match stored {
            Some(Some(handle)) => Ok(handle),
            Some(None) => Err(StoreError::Corrupt("payment account not stored".into())),
            None => {
                let exists: bool =
                    sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM principals WHERE id = $1)")
                        .bind(principal_id)
                        .fetch_one(&self.pool)
                        .await?;
                if exists {
                    Err(StoreError::Conflict(
                        "only freelancers hold payment accounts".into(),
                    ))
                } else {
                    Err(StoreError::NotFound("principal"))
                }
            }
        }
    }

    async fn list_freelancers_with_any_skill(
        &self,
        skill_ids: &[Uuid],
    ) -> Result<Vec<Principal>, StoreError> {
        let sql = format!(
            r#"
            SELECT {PRINCIPAL_COLUMNS} FROM principals p
            WHERE p.role = 'freelancer'
              AND EXISTS (
                  SELECT 1 FROM freelancer_skills fs
                  WHERE fs.principal_id = p.id AND fs.skill_id = ANY($1)
              )
            ORDER BY p.created_at, p.id
            "#
        );
        let rows = sqlx::query_as::<_, PrincipalRow>(&sql)
            .bind(skill_ids)
            .fetch_all(&self.pool)
            .await?;
        self.hydrate(rows).await
    }

    // ========== Skills ==========

    async fn insert_skill(&self, name: &SkillName) -> Result<Skill, StoreError> {
        let row = sqlx::query_as::<_, SkillRow>(
            "INSERT INTO skills (id, name, name_key) VALUES ($1, $2, $3) RETURNING id, name",
        )
        .bind(Uuid::new_v4())
        .bind(name.display())
        .bind(name.key())
        .fetch_one(&self.pool)
        .await;

        match row {
            Ok(row) => Ok(row.into()),
            Err(err) if is_unique_violation(&err) => Err(StoreError::Conflict(format!(
                "skill '{}' already exists",
                name.display()
            ))),
            Err(err) => Err(err.into()),
        }
    }

    async fn ensure_skills(&self, names: &[SkillName]) -> Result<Vec<Skill>, StoreError> {
        if names.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = names.iter().map(|_| Uuid::new_v4()).collect();
        let displays: Vec<String> = names.iter().map(|n| n.display().to_string()).collect();
        let keys: Vec<String> = names.iter().map(|n| n.key().to_string()).collect();

        sqlx::query(
            r#"
            INSERT INTO skills (id, name, name_key)
            SELECT * FROM UNNEST($1::uuid[], $2::text[], $3::text[])
            ON CONFLICT (name_key) DO NOTHING
            "#,
        )
        .bind(ids)
        .bind(displays)
        .bind(&keys)
        .execute(&self.pool)
        .await?;

        let rows = sqlx::query_as::<_, SkillRow>(
            "SELECT id, name FROM skills WHERE name_key = ANY($1) ORDER BY name",
        )
        .bind(&keys)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Skill::from).collect())
    }

    async fn find_skills(&self, names: &[SkillName]) -> Result<Vec<Skill>, StoreError> {
        let keys: Vec<String> = names.iter().map(|n| n.key().to_string()).collect();
        let rows = sqlx::query_as::<_, SkillRow>(
            "SELECT id, name FROM skills WHERE name_key = ANY($1) ORDER BY name",
        )
        .bind(keys)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Skill::from).collect())
    }

    async fn list_skills(&self) -> Result<Vec<Skill>, StoreError> {
        let rows = sqlx::query_as::<_, SkillRow>("SELECT id, name FROM skills ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Skill::from).collect())
    }

    // ========== Projects ==========

    async fn insert_project(&self, project: &Project) -> Result<(), StoreError> {
        let inserted = sqlx::query(
            r#"
            INSERT INTO projects (id, client_id, title, description, category, required_skills,
                                  budget_cents, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(project.id)
        .bind(project.client_id)
        .bind(&project.title)
        .bind(&project.description)
        .bind(project.category.as_db_str())
        .bind(&project.required_skills)
        .bind(project.budget.cents())
        .bind(project.status.as_db_str())
        .bind(project.created_at)
        .bind(project.updated_at)
        .execute(&self.pool)
        .await;

        match inserted {
            Ok(_) => Ok(()),
            Err(err)
                if err
                    .as_database_error()
                    .map_or(false, |db| db.is_foreign_key_violation()) =>
            {
                Err(StoreError::NotFound("client"))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn get_project(&self, id: Uuid) -> Result<Option<Project>, StoreError> {
        let sql = format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE id = $1");
        sqlx::query_as::<_, ProjectRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Project::try_from)
            .transpose()
    }

    async fn list_client_projects(&self, client_id: Uuid) -> Result<Vec<Project>, StoreError> {
        let sql = format!(
            "SELECT {PROJECT_COLUMNS} FROM projects WHERE client_id = $1 ORDER BY created_at DESC, id"
        );
        let rows = sqlx::query_as::<_, ProjectRow>(&sql)
            .bind(client_id)
            .fetch_all(&self.pool)
            .await?;
        collect(rows)
    }

    async fn list_freelancer_projects(
        &self,
        freelancer_id: Uuid,
    ) -> Result<Vec<Project>, StoreError> {
        let sql = format!(
            "SELECT {PROJECT_COLUMNS} FROM projects WHERE freelancer_id = $1 ORDER BY created_at DESC, id"
        );
        let rows = sqlx::query_as::<_, ProjectRow>(&sql)
            .bind(freelancer_id)
            .fetch_all(&self.pool)
            .await?;
        collect(rows)
    }

    async fn attach_payment_intent(
        &self,
        project_id: Uuid,
        handle: &str,
    ) -> Result<Project, StoreError> {
        let mut tx = self.pool.begin().await?;
        let mut project = lock_project(&mut tx, project_id, RowLock::Update).await?;
        project.attach_payment_intent(handle, Utc::now())?;
        write_project(&mut tx, &project).await?;
        tx.commit().await?;
        Ok(project)
    }

    async fn complete_project(&self, project_id: Uuid) -> Result<Project, StoreError> {
        let mut tx = self.pool.begin().await?;
        let mut project = lock_project(&mut tx, project_id, RowLock::Update).await?;
        if project.complete(Utc::now())? {
            write_project(&mut tx, &project).await?;
        }
        tx.commit().await?;
        Ok(project)
    }

    async fn record_submission(
        &self,
        project_id: Uuid,
        notes: &str,
    ) -> Result<Project, StoreError> {
        let mut tx = self.pool.begin().await?;
        let mut project = lock_project(&mut tx, project_id, RowLock::Update).await?;
        project.record_submission(notes, Utc::now())?;
        write_project(&mut tx, &project).await?;
        tx.commit().await?;
        Ok(project)
    }

    // ========== Bids ==========

    async fn insert_bid(&self, bid: &Bid) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        // Shared lock: concurrent bids proceed, an acceptance waits for them.
        let project = lock_project(&mut tx, bid.project_id, RowLock::Share).await?;
        project.ensure_assignable()?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO bids (id, project_id, freelancer_id, amount_cents, proposal, status,
                              created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(bid.id)
        .bind(bid.project_id)
        .bind(bid.freelancer_id)
        .bind(bid.amount.cents())
        .bind(&bid.proposal)
        .bind(bid.status.as_db_str())
        .bind(bid.created_at)
        .bind(bid.updated_at)
        .execute(&mut *tx)
        .await;

        match inserted {
            Ok(_) => {}
            Err(err) if is_unique_violation(&err) => {
                return Err(StoreError::Conflict(
                    "you have already placed a bid on this project".into(),
                ));
            }
            Err(err) => return Err(err.into()),
        }

        tx.commit().await?;
        Ok(())
    }

    async fn get_bid(&self, id: Uuid) -> Result<Option<Bid>, StoreError> {
        let sql = format!("SELECT {BID_COLUMNS} FROM bids WHERE id = $1");
        sqlx::query_as::<_, BidRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Bid::try_from)
            .transpose()
    }

    async fn find_bid(
        &self,
        project_id: Uuid,
        freelancer_id: Uuid,
    ) -> Result<Option<Bid>, StoreError> {
        let sql = format!("SELECT {BID_COLUMNS} FROM bids WHERE project_id = $1 AND freelancer_id = $2");
        sqlx::query_as::<_, BidRow>(&sql)
            .bind(project_id)
            .bind(freelancer_id)
            .fetch_optional(&self.pool)
            .await?
            .map(Bid::try_from)
            .transpose()
    }

    async fn list_project_bids(&self, project_id: Uuid) -> Result<Vec<Bid>, StoreError> {
        let sql = format!(
            "SELECT {BID_COLUMNS} FROM bids WHERE project_id = $1 ORDER BY amount_cents ASC, created_at ASC"
        );
        let rows = sqlx::query_as::<_, BidRow>(&sql)
            .bind(project_id)
            .fetch_all(&self.pool)
            .await?;
        collect(rows)
    }

    async fn list_freelancer_bids(&self, freelancer_id: Uuid) -> Result<Vec<Bid>, StoreError> {
        let sql = format!(
            "SELECT {BID_COLUMNS} FROM bids WHERE freelancer_id = $1 ORDER BY created_at DESC, id"
        );
        let rows = sqlx::query_as::<_, BidRow>(&sql)
            .bind(freelancer_id)
            .fetch_all(&self.pool)
            .await?;
        collect(rows)
    }

    async fn commit_acceptance(&self, bid_id: Uuid) -> Result<Acceptance, StoreError> {
        let project_id = bid_project_id(&self.pool, bid_id).await?;
        let now = Utc::now();

        let mut tx = self.pool.begin().await?;

        // Project row first, then the bid: the same order everywhere.
        let mut project = lock_project(&mut tx, project_id, RowLock::Update).await?;
        let mut bid = lock_bid(&mut tx, bid_id).await?;

        project.assign(&bid, now)?;
        bid.accept(now)?;

        write_project(&mut tx, &project).await?;
        write_bid_status(&mut tx, &bid).await?;

        let rejected = sqlx::query(
            r#"
            UPDATE bids SET status = 'rejected', updated_at = $3
            WHERE project_id = $1 AND id <> $2 AND status = 'pending'
            "#,
        )
        .bind(project.id)
        .bind(bid.id)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Acceptance {
            project,
            bid,
            rejected_bids: rejected.rows_affected(),
        })
    }

    async fn reject_bid(&self, bid_id: Uuid) -> Result<Bid, StoreError> {
        let project_id = bid_project_id(&self.pool, bid_id).await?;

        let mut tx = self.pool.begin().await?;
        let project = lock_project(&mut tx, project_id, RowLock::Update).await?;
        project.ensure_assignable()?;

        let mut bid = lock_bid(&mut tx, bid_id).await?;
        if bid.status != BidStatus::Pending {
            return Err(StoreError::State(StateError::BidNotPending));
        }
        bid.reject(Utc::now())?;
        write_bid_status(&mut tx, &bid).await?;

        tx.commit().await?;
        Ok(bid)
    }
}
