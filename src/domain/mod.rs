//! Domain types for the marketplace
//!
//! Entities, their state machines and the request/response DTOs that
//! cross the HTTP boundary. Nothing in here touches storage or the network.

pub mod bids;
pub mod money;
pub mod payments;
pub mod principals;
pub mod projects;
pub mod skills;

pub use bids::*;
pub use money::Money;
pub use payments::*;
pub use principals::*;
pub use projects::*;
pub use skills::*;

use thiserror::Error;

/// Malformed or missing input. Raised before any state is read or written.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ValidationError(pub String);

impl ValidationError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

/// A project/bid state-machine precondition that does not hold.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    #[error("project not open")]
    ProjectNotOpen,

    #[error("project already assigned to a freelancer")]
    AlreadyAssigned,

    #[error("project is not in progress")]
    NotInProgress,

    #[error("project is already funded")]
    AlreadyFunded,

    #[error("project has not been funded")]
    NotFunded,

    #[error("bid is no longer pending")]
    BidNotPending,

    #[error("bid does not belong to this project")]
    BidProjectMismatch,
}
