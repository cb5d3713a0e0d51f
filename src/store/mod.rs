//! Persistence seam.
//!
//! [`MarketplaceStore`] lists the reads and the transactional writes the
//! services need. Every write that changes project or bid state re-reads the
//! affected rows under a lock and re-runs the domain transition there, so a
//! precondition checked by a service is confirmed again at commit time.

pub mod memory;
pub mod postgres;

pub use memory::InMemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::{Bid, Principal, Project, Skill, SkillName, StateError};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    State(#[from] StateError),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("corrupt row: {0}")]
    Corrupt(String),
}

/// Result of a committed bid acceptance.
#[derive(Debug, Clone)]
pub struct Acceptance {
    pub project: Project,
    pub bid: Bid,
    /// Number of competing bids moved from pending to rejected.
    pub rejected_bids: u64,
}

#[async_trait]
pub trait MarketplaceStore: Send + Sync {
    async fn health_check(&self) -> bool;

    // ========== Principals ==========

    /// Insert a new principal (and its skill links). Duplicate id or
    /// username is a conflict.
    async fn insert_principal(&self, principal: &Principal) -> Result<(), StoreError>;

    async fn get_principal(&self, id: Uuid) -> Result<Option<Principal>, StoreError>;

    /// Persist profile fields and skill links. The payment account is not
    /// touched; see [`MarketplaceStore::set_payment_account`].
    async fn update_principal(&self, principal: &Principal) -> Result<(), StoreError>;

    /// Store a freelancer's payment account handle unless one is already
    /// set. Returns the handle that is stored afterwards.
    async fn set_payment_account(
        &self,
        principal_id: Uuid,
        account: &str,
    ) -> Result<String, StoreError>;

    /// Freelancers holding at least one of `skill_ids`, oldest first.
    async fn list_freelancers_with_any_skill(
        &self,
        skill_ids: &[Uuid],
    ) -> Result<Vec<Principal>, StoreError>;

    // ========== Skills ==========

    /// Create a skill; an existing skill with the same key is a conflict.
    async fn insert_skill(&self, name: &SkillName) -> Result<Skill, StoreError>;

    /// Create any missing skills and return all of them.
    async fn ensure_skills(&self, names: &[SkillName]) -> Result<Vec<Skill>, StoreError>;

    /// Existing skills matching `names` by key. Unknown names are skipped.
    async fn find_skills(&self, names: &[SkillName]) -> Result<Vec<Skill>, StoreError>;

    async fn list_skills(&self) -> Result<Vec<Skill>, StoreError>;

    // ========== Projects ==========

    async fn insert_project(&self, project: &Project) -> Result<(), StoreError>;

    async fn get_project(&self, id: Uuid) -> Result<Option<Project>, StoreError>;

    async fn list_client_projects(&self, client_id: Uuid) -> Result<Vec<Project>, StoreError>;

    async fn list_freelancer_projects(
        &self,
        freelancer_id: Uuid,
    ) -> Result<Vec<Project>, StoreError>;

    /// Set the payment-intent handle if the project is in progress and not
    /// yet funded.
    async fn attach_payment_intent(
        &self,
        project_id: Uuid,
        handle: &str,
    ) -> Result<Project, StoreError>;

    /// Mark a funded project completed. Completing a completed project is a
    /// no-op.
    async fn complete_project(&self, project_id: Uuid) -> Result<Project, StoreError>;

    async fn record_submission(&self, project_id: Uuid, notes: &str)
        -> Result<Project, StoreError>;

    // ========== Bids ==========

    /// Insert a pending bid. Fails if the project is no longer open or the
    /// freelancer already has a bid on it.
    async fn insert_bid(&self, bid: &Bid) -> Result<(), StoreError>;

    async fn get_bid(&self, id: Uuid) -> Result<Option<Bid>, StoreError>;

    async fn find_bid(
        &self,
        project_id: Uuid,
        freelancer_id: Uuid,
    ) -> Result<Option<Bid>, StoreError>;

    async fn list_project_bids(&self, project_id: Uuid) -> Result<Vec<Bid>, StoreError>;

    async fn list_freelancer_bids(&self, freelancer_id: Uuid) -> Result<Vec<Bid>, StoreError>;

    /// Accept `bid_id` atomically: assign the project, accept the bid and
    /// reject every other pending bid on the project.
    async fn commit_acceptance(&self, bid_id: Uuid) -> Result<Acceptance, StoreError>;

    /// Reject one pending bid on an open project.
    async fn reject_bid(&self, bid_id: Uuid) -> Result<Bid, StoreError>;
}
