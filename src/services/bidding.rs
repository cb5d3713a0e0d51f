//! Bid submission, acceptance and rejection.

use std::sync::Arc;
use chrono::Utc;
use uuid::Uuid;

use super::locks::ProjectLocks;
use crate::domain::{Bid, BidDecision, CreateBidRequest, Principal, Project, UpdateBidStatusRequest};
use crate::error::{ApiError, ApiResult};
use crate::store::{Acceptance, MarketplaceStore};

pub struct BidService {
    store: Arc<dyn MarketplaceStore>,
    locks: Arc<ProjectLocks>,
}

/// Outcome of a bid status update
#[derive(Debug, Clone)]
pub enum BidUpdate {
    Accepted(Acceptance),
    Rejected(Bid),
}

impl BidService {
    pub fn new(store: Arc<dyn MarketplaceStore>, locks: Arc<ProjectLocks>) -> Self {
        Self { store, locks }
    }

    async fn project(&self, project_id: Uuid) -> ApiResult<Project> {
        self.store
            .get_project(project_id)
            .await?
            .ok_or_else(|| ApiError::not_found("project not found"))
    }

    async fn bid(&self, bid_id: Uuid) -> ApiResult<Bid> {
        self.store
            .get_bid(bid_id)
            .await?
            .ok_or_else(|| ApiError::not_found("bid not found"))
    }

    /// Place a pending bid on an open project.
    pub async fn submit_bid(
        &self,
        project_id: Uuid,
        actor: &Principal,
        req: CreateBidRequest,
    ) -> ApiResult<Bid> {
        if !actor.is_freelancer() {
            return Err(ApiError::forbidden("only freelancers can place bids"));
        }
        let (amount, proposal) = req.validate()?;

        let project = self.project(project_id).await?;
        project.ensure_assignable()?;

        if self.store.find_bid(project_id, actor.id).await?.is_some() {
            return Err(ApiError::conflict(
                "you have already placed a bid on this project",
            ));
        }

        // The store re-checks the project status and the unique pair.
        let bid = Bid::new(project_id, actor.id, amount, &proposal, Utc::now());
        self.store.insert_bid(&bid).await?;

        tracing::info!(
            bid_id = %bid.id,
            project_id = %project_id,
            principal_id = %actor.id,
            amount_cents = bid.amount.cents(),
            "Bid placed"
        );
        Ok(bid)
    }

    /// Accept a bid: assign the freelancer, adopt the bid amount and reject
    /// every competing pending bid, in one store transaction.
    pub async fn accept_bid(&self, bid_id: Uuid, actor: &Principal) -> ApiResult<Acceptance> {
        let bid = self.bid(bid_id).await?;
        let _guard = self.locks.acquire(bid.project_id).await;

        let project = self.project(bid.project_id).await?;
        if !project.is_owned_by(actor.id) {
            return Err(ApiError::forbidden(
                "only the project owner can accept bids",
            ));
        }
        project.ensure_assignable()?;

        let acceptance = self.store.commit_acceptance(bid_id).await?;

        tracing::info!(
            bid_id = %bid_id,
            project_id = %acceptance.project.id,
            principal_id = %actor.id,
            freelancer_id = %acceptance.bid.freelancer_id,
            budget_cents = acceptance.project.budget.cents(),
            rejected_bids = acceptance.rejected_bids,
            "Bid accepted"
        );
        Ok(acceptance)
    }

    /// Reject a single pending bid on an open project.
    pub async fn reject_bid(&self, bid_id: Uuid, actor: &Principal) -> ApiResult<Bid> {
        let bid = self.bid(bid_id).await?;
        let _guard = self.locks.acquire(bid.project_id).await;

        let project = self.project(bid.project_id).await?;
        if !project.is_owned_by(actor.id) {
            return Err(ApiError::forbidden(
                "only the project owner can reject bids",
            ));
        }
        project.ensure_assignable()?;

        let rejected = self.store.reject_bid(bid_id).await?;

        tracing::info!(
            bid_id = %bid_id,
            project_id = %rejected.project_id,
            principal_id = %actor.id,
            "Bid rejected"
        );
        Ok(rejected)
    }

    /// Apply an `ACCEPTED`/`REJECTED` decision. The status value is
    /// validated before anything is read.
    pub async fn update_status(
        &self,
        bid_id: Uuid,
        actor: &Principal,
        req: &UpdateBidStatusRequest,
    ) -> ApiResult<BidUpdate> {
        match req.decision()? {
            BidDecision::Accept => self.accept_bid(bid_id, actor).await.map(BidUpdate::Accepted),
            BidDecision::Reject => self.reject_bid(bid_id, actor).await.map(BidUpdate::Rejected),
        }
    }

    /// All bids on a project, cheapest first. Owner only.
    pub async fn project_bids(&self, project_id: Uuid, actor: &Principal) -> ApiResult<Vec<Bid>> {
        let project = self.project(project_id).await?;
        if !project.is_owned_by(actor.id) {
            return Err(ApiError::forbidden(
                "only the project owner can view its bids",
            ));
        }
        Ok(self.store.list_project_bids(project_id).await?)
    }

    pub async fn my_bids(&self, actor: &Principal) -> ApiResult<Vec<Bid>> {
        if !actor.is_freelancer() {
            return Err(ApiError::forbidden("only freelancers place bids"));
        }
        Ok(self.store.list_freelancer_bids(actor.id).await?)
    }
}
