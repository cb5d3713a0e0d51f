//! Service layer.
//!
//! Each service owns one group of caller-facing operations, takes the acting
//! principal explicitly and returns [`crate::error::ApiResult`]. Storage and
//! the payment processor sit behind traits so the services run unchanged
//! against Postgres/Stripe in production and in-memory fakes in tests.

pub mod bidding;
pub mod escrow;
pub mod locks;
pub mod matching;
pub mod payments;
pub mod profiles;
pub mod projects;
pub mod skills;

pub use bidding::{BidService, BidUpdate};
pub use escrow::EscrowService;
pub use locks::ProjectLocks;
pub use matching::{MatchingEngine, Ranking};
pub use payments::{PaymentGateway, StripeClient};
pub use profiles::{OnboardingUrls, ProfileService};
pub use projects::ProjectService;
pub use skills::SkillDirectory;
