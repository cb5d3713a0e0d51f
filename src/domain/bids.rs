use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use super::{Money, StateError, ValidationError};

/// Bid status
///
/// A bid starts `Pending`; `Accepted` and `Rejected` are terminal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BidStatus {
    #[default]
    Pending,
    Accepted,
    Rejected,
}

impl BidStatus {
    pub fn as_db_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
        }
    }

    pub fn from_db(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "accepted" => Some(Self::Accepted),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }
}

impl FromStr for BidStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_db(&s.trim().to_lowercase())
            .ok_or_else(|| ValidationError::new(format!("'{s}' is not a valid bid status")))
    }
}

/// Bid entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bid {
    pub id: Uuid,
    pub project_id: Uuid,
    pub freelancer_id: Uuid,
    pub amount: Money,
    pub proposal: String,
    pub status: BidStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Bid {
    pub fn new(
        project_id: Uuid,
        freelancer_id: Uuid,
        amount: Money,
        proposal: &str,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            project_id,
            freelancer_id,
            amount,
            proposal: proposal.to_string(),
            status: BidStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn accept(&mut self, now: DateTime<Utc>) -> Result<(), StateError> {
        if self.status != BidStatus::Pending {
            return Err(StateError::BidNotPending);
        }
        self.status = BidStatus::Accepted;
        self.updated_at = now;
        Ok(())
    }

    /// Reject a pending bid. Rejecting an already rejected bid is a no-op
    /// and returns `false`.
    pub fn reject(&mut self, now: DateTime<Utc>) -> Result<bool, StateError> {
        match self.status {
            BidStatus::Rejected => Ok(false),
            BidStatus::Accepted => Err(StateError::BidNotPending),
            BidStatus::Pending => {
                self.status = BidStatus::Rejected;
                self.updated_at = now;
                Ok(true)
            }
        }
    }
}

/// Request DTO for creating a bid
#[derive(Debug, Clone, Deserialize)]
pub struct CreateBidRequest {
    pub amount: Decimal,
    #[serde(default)]
    pub proposal: String,
}

impl CreateBidRequest {
    /// Checked amount and trimmed proposal.
    pub fn validate(&self) -> Result<(Money, String), ValidationError> {
        let amount = Money::from_decimal(self.amount)?;
        if !amount.is_positive() {
            return Err(ValidationError::new("bid amount must be greater than zero"));
        }
        let proposal = self.proposal.trim();
        if proposal.is_empty() {
            return Err(ValidationError::new("proposal must not be empty"));
        }
        Ok((amount, proposal.to_string()))
    }
}

/// Request DTO for deciding on a bid
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateBidStatusRequest {
    pub status: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BidDecision {
    Accept,
    Reject,
}

impl UpdateBidStatusRequest {
    pub fn decision(&self) -> Result<BidDecision, ValidationError> {
        match self.status.parse::<BidStatus>()? {
            BidStatus::Accepted => Ok(BidDecision::Accept),
            BidStatus::Rejected => Ok(BidDecision::Reject),
            BidStatus::Pending => Err(ValidationError::new(
                "a bid can only be moved to ACCEPTED or REJECTED",
            )),
        }
    }
}

/// Response DTO for bid
#[derive(Debug, Clone, Serialize)]
pub struct BidResponse {
    pub id: Uuid,
    pub project_id: Uuid,
    pub freelancer_id: Uuid,
    pub amount: Money,
    pub proposal: String,
    pub status: BidStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Bid> for BidResponse {
    fn from(b: Bid) -> Self {
        Self {
            id: b.id,
            project_id: b.project_id,
            freelancer_id: b.freelancer_id,
            amount: b.amount,
            proposal: b.proposal,
            status: b.status,
            created_at: b.created_at,
            updated_at: b.updated_at,
        }
    }
}
