//! Project creation, views and work submission.

use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use super::locks::ProjectLocks;
use crate::domain::{CreateProjectRequest, Principal, Project, Role, SubmitWorkRequest, ValidationError};
use crate::error::{ApiError, ApiResult};
use crate::store::MarketplaceStore;

pub struct ProjectService {
    store: Arc<dyn MarketplaceStore>,
    locks: Arc<ProjectLocks>,
}

impl ProjectService {
    pub fn new(store: Arc<dyn MarketplaceStore>, locks: Arc<ProjectLocks>) -> Self {
        Self { store, locks }
    }

    pub async fn create(&self, actor: &Principal, req: CreateProjectRequest) -> ApiResult<Project> {
        if !actor.is_client() {
            return Err(ApiError::forbidden("only clients can post projects"));
        }

        let project = req.into_project(actor.id, Utc::now())?;
        self.store.insert_project(&project).await?;

        tracing::info!(
            project_id = %project.id,
            principal_id = %actor.id,
            budget_cents = project.budget.cents(),
            "Project created"
        );
        Ok(project)
    }

    pub async fn get(&self, project_id: Uuid) -> ApiResult<Project> {
        self.store
            .get_project(project_id)
            .await?
            .ok_or_else(|| ApiError::not_found("project not found"))
    }

    /// Owned projects for a client, assigned projects for a freelancer.
    pub async fn my_projects(&self, actor: &Principal) -> ApiResult<Vec<Project>> {
        let projects = match actor.role() {
            Role::Client => self.store.list_client_projects(actor.id).await?,
            Role::Freelancer => self.store.list_freelancer_projects(actor.id).await?,
        };
        Ok(projects)
    }

    /// Record the assigned freelancer's delivery notes.
    pub async fn submit_work(
        &self,
        project_id: Uuid,
        actor: &Principal,
        req: SubmitWorkRequest,
    ) -> ApiResult<Project> {
        let notes = req.submission_notes.trim();
        if notes.is_empty() {
            return Err(ValidationError::new("submission_notes must not be empty").into());
        }

        let _guard = self.locks.acquire(project_id).await;

        let project = self.get(project_id).await?;
        if !project.is_assigned_to(actor.id) {
            return Err(ApiError::forbidden(
                "only the assigned freelancer can submit work",
            ));
        }

        let project = self.store.record_submission(project_id, notes).await?;

        tracing::info!(
            project_id = %project_id,
            principal_id = %actor.id,
            "Work submitted"
        );
        Ok(project)
    }
}
