//! In-process store with the same semantics as [`super::PgStore`].
//!
//! A single mutex guards all tables, so each trait method is one atomic
//! step, matching the transactions the Postgres store runs. Used by the test
//! suite and handy for local experiments without a database.

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::HashMap;
use uuid::Uuid;

use super::{Acceptance, MarketplaceStore, StoreError};
use crate::domain::{
    Bid, BidStatus, Principal, Project, RoleProfile, Skill, SkillName, StateError,
};

#[derive(Default)]
pub struct InMemoryStore {
    inner: Mutex<Tables>,
}

#[derive(Default)]
struct Tables {
    /// Insertion order doubles as registration order.
    principals: Vec<Principal>,
    /// (normalized key, skill)
    skills: Vec<(String, Skill)>,
    projects: HashMap<Uuid, Project>,
    bids: Vec<Bid>,
}

impl Tables {
    fn principal_mut(&mut self, id: Uuid) -> Result<&mut Principal, StoreError> {
        self.principals
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(StoreError::NotFound("principal"))
    }

    fn project_mut(&mut self, id: Uuid) -> Result<&mut Project, StoreError> {
        self.projects
            .get_mut(&id)
            .ok_or(StoreError::NotFound("project"))
    }

    fn bid_index(&self, id: Uuid) -> Result<usize, StoreError> {
        self.bids
            .iter()
            .position(|b| b.id == id)
            .ok_or(StoreError::NotFound("bid"))
    }

    fn skill_by_key(&self, key: &str) -> Option<&Skill> {
        self.skills
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, skill)| skill)
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn newest_first<T: Clone>(items: Vec<&T>, created_at: impl Fn(&T) -> chrono::DateTime<Utc>) -> Vec<T> {
    let mut items: Vec<T> = items.into_iter().rev().cloned().collect();
    items.sort_by(|a, b| created_at(b).cmp(&created_at(a)));
    items
}

#[async_trait]
impl MarketplaceStore for InMemoryStore {
    async fn health_check(&self) -> bool {
        true
    }

    async fn insert_principal(&self, principal: &Principal) -> Result<(), StoreError> {
        let mut tables = self.inner.lock();
        if tables.principals.iter().any(|p| p.id == principal.id) {
            return Err(StoreError::Conflict("profile already registered".into()));
        }
        if tables
            .principals
            .iter()
            .any(|p| p.username.eq_ignore_ascii_case(&principal.username))
        {
            return Err(StoreError::Conflict(format!(
                "username '{}' is already taken",
                principal.username
            )));
        }
        tables.principals.push(principal.clone());
        Ok(())
    }

    async fn get_principal(&self, id: Uuid) -> Result<Option<Principal>, StoreError> {
        let tables = self.inner.lock();
        Ok(tables.principals.iter().find(|p| p.id == id).cloned())
    }

    async fn update_principal(&self, principal: &Principal) -> Result<(), StoreError> {
        let mut tables = self.inner.lock();
        let stored = tables.principal_mut(principal.id)?;
        if stored.role() != principal.role() {
            return Err(StoreError::Conflict("role cannot change".into()));
        }

        let account = stored.payment_account().map(str::to_string);
        *stored = principal.clone();
        if let RoleProfile::Freelancer(f) = &mut stored.profile {
            f.payment_account = account;
        }
        Ok(())
    }

    async fn set_payment_account(
        &self,
        principal_id: Uuid,
        account: &str,
    ) -> Result<String, StoreError> {
        let mut tables = self.inner.lock();
        let stored = tables.principal_mut(principal_id)?;
        match &mut stored.profile {
            RoleProfile::Freelancer(f) => {
                let handle = f.payment_account.get_or_insert_with(|| account.to_string());
                Ok(handle.clone())
            }
            RoleProfile::Client(_) => Err(StoreError::Conflict(
                "only freelancers hold payment accounts".into(),
            )),
        }
    }

    async fn list_freelancers_with_any_skill(
        &self,
        skill_ids: &[Uuid],
    ) -> Result<Vec<Principal>, StoreError> {
        let tables = self.inner.lock();
        Ok(tables
            .principals
            .iter()
            .filter(|p| p.skills().iter().any(|s| skill_ids.contains(&s.id)))
            .cloned()
            .collect())
    }

    async fn insert_skill(&self, name: &SkillName) -> Result<Skill, StoreError> {
        let mut tables = self.inner.lock();
        if let Some(existing) = tables.skill_by_key(name.key()) {
            return Err(StoreError::Conflict(format!(
                "skill '{}' already exists",
                existing.name
            )));
        }
        let skill = Skill {
            id: Uuid::new_v4(),
            name: name.display().to_string(),
        };
        tables.skills.push((name.key().to_string(), skill.clone()));
        Ok(skill)
    }

    async fn ensure_skills(&self, names: &[SkillName]) -> Result<Vec<Skill>, StoreError> {
        let mut tables = self.inner.lock();
        let mut skills = Vec::with_capacity(names.len());
        for name in names {
            let skill = match tables.skill_by_key(name.key()) {
                Some(existing) => existing.clone(),
                None => {
                    let skill = Skill {
                        id: Uuid::new_v4(),
                        name: name.display().to_string(),
                    };
                    tables.skills.push((name.key().to_string(), skill.clone()));
                    skill
                }
            };
            skills.push(skill);
        }
        skills.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(skills)
    }

    async fn find_skills(&self, names: &[SkillName]) -> Result<Vec<Skill>, StoreError> {
        let tables = self.inner.lock();
        Ok(names
            .iter()
            .filter_map(|name| tables.skill_by_key(name.key()).cloned())
            .collect())
    }

    async fn list_skills(&self) -> Result<Vec<Skill>, StoreError> {
        let tables = self.inner.lock();
        let mut skills: Vec<Skill> = tables.skills.iter().map(|(_, s)| s.clone()).collect();
        skills.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(skills)
    }

    async fn insert_project(&self, project: &Project) -> Result<(), StoreError> {
        let mut tables = self.inner.lock();
        if !tables.principals.iter().any(|p| p.id == project.client_id) {
            return Err(StoreError::NotFound("client"));
        }
        tables.projects.insert(project.id, project.clone());
        Ok(())
    }

    async fn get_project(&self, id: Uuid) -> Result<Option<Project>, StoreError> {
        let tables = self.inner.lock();
        Ok(tables.projects.get(&id).cloned())
    }

    async fn list_client_projects(&self, client_id: Uuid) -> Result<Vec<Project>, StoreError> {
        let tables = self.inner.lock();
        let owned = tables
            .projects
            .values()
            .filter(|p| p.client_id == client_id)
            .collect();
        Ok(newest_first(owned, |p| p.created_at))
    }

    async fn list_freelancer_projects(
        &self,
        freelancer_id: Uuid,
    ) -> Result<Vec<Project>, StoreError> {
        let tables = self.inner.lock();
        let assigned = tables
            .projects
            .values()
            .filter(|p| p.freelancer_id == Some(freelancer_id))
            .collect();
        Ok(newest_first(assigned, |p| p.created_at))
    }

    async fn attach_payment_intent(
        &self,
        project_id: Uuid,
        handle: &str,
    ) -> Result<Project, StoreError> {
        let mut tables = self.inner.lock();
        let project = tables.project_mut(project_id)?;
        project.attach_payment_intent(handle, Utc::now())?;
        Ok(project.clone())
    }

    async fn complete_project(&self, project_id: Uuid) -> Result<Project, StoreError> {
        let mut tables = self.inner.lock();
        let project = tables.project_mut(project_id)?;
        project.complete(Utc::now())?;
        Ok(project.clone())
    }

    async fn record_submission(
        &self,
        project_id: Uuid,
        notes: &str,
    ) -> Result<Project, StoreError> {
        let mut tables = self.inner.lock();
        let project = tables.project_mut(project_id)?;
        project.record_submission(notes, Utc::now())?;
        Ok(project.clone())
    }

    async fn insert_bid(&self, bid: &Bid) -> Result<(), StoreError> {
        let mut tables = self.inner.lock();
        let project = tables
            .projects
            .get(&bid.project_id)
            .ok_or(StoreError::NotFound("project"))?;
        project.ensure_assignable()?;

        if tables
            .bids
            .iter()
            .any(|b| b.project_id == bid.project_id && b.freelancer_id == bid.freelancer_id)
        {
            return Err(StoreError::Conflict(
                "you have already placed a bid on this project".into(),
            ));
        }
        tables.bids.push(bid.clone());
        Ok(())
    }

    async fn get_bid(&self, id: Uuid) -> Result<Option<Bid>, StoreError> {
        let tables = self.inner.lock();
        Ok(tables.bids.iter().find(|b| b.id == id).cloned())
    }

    async fn find_bid(
        &self,
        project_id: Uuid,
        freelancer_id: Uuid,
    ) -> Result<Option<Bid>, StoreError> {
        let tables = self.inner.lock();
        Ok(tables
            .bids
            .iter()
            .find(|b| b.project_id == project_id && b.freelancer_id == freelancer_id)
            .cloned())
    }

    async fn list_project_bids(&self, project_id: Uuid) -> Result<Vec<Bid>, StoreError> {
        let tables = self.inner.lock();
        let mut bids: Vec<Bid> = tables
            .bids
            .iter()
            .filter(|b| b.project_id == project_id)
            .cloned()
            .collect();
        bids.sort_by(|a, b| a.amount.cmp(&b.amount).then(a.created_at.cmp(&b.created_at)));
        Ok(bids)
    }

    async fn list_freelancer_bids(&self, freelancer_id: Uuid) -> Result<Vec<Bid>, StoreError> {
        let tables = self.inner.lock();
        let placed = tables
            .bids
            .iter()
            .filter(|b| b.freelancer_id == freelancer_id)
            .collect();
        Ok(newest_first(placed, |b| b.created_at))
    }

    async fn commit_acceptance(&self, bid_id: Uuid) -> Result<Acceptance, StoreError> {
        let mut guard = self.inner.lock();
        let tables = &mut *guard;
        let now = Utc::now();

        let index = tables.bid_index(bid_id)?;
        let mut bid = tables.bids[index].clone();
        let mut project = tables
            .projects
            .get(&bid.project_id)
            .cloned()
            .ok_or(StoreError::NotFound("project"))?;

        // Work on copies so a failed transition leaves the tables untouched.
        project.assign(&bid, now)?;
        bid.accept(now)?;

        let mut rejected_bids = 0;
        for other in tables
            .bids
            .iter_mut()
            .filter(|b| b.project_id == project.id && b.id != bid.id)
        {
            if other.status == BidStatus::Pending && other.reject(now)? {
                rejected_bids += 1;
            }
        }
        tables.bids[index] = bid.clone();
        tables.projects.insert(project.id, project.clone());

        Ok(Acceptance {
            project,
            bid,
            rejected_bids,
        })
    }

    async fn reject_bid(&self, bid_id: Uuid) -> Result<Bid, StoreError> {
        let mut tables = self.inner.lock();
        let index = tables.bid_index(bid_id)?;
        let project_id = tables.bids[index].project_id;
        tables
            .projects
            .get(&project_id)
            .ok_or(StoreError::NotFound("project"))?
            .ensure_assignable()?;

        let bid = &mut tables.bids[index];
        if bid.status != BidStatus::Pending {
            return Err(StoreError::State(StateError::BidNotPending));
        }
        bid.reject(Utc::now())?;
        Ok(bid.clone())
    }
}
