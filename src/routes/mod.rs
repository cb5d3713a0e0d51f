pub mod bids;
pub mod dashboard;
pub mod health;
pub mod payments;
pub mod profiles;
pub mod projects;
pub mod skills;

use axum::{
    routing::{get, patch, post},
    Router,
};
use std::sync::Arc;

use crate::app::AppState;

/// Build the API router with all routes
pub fn api_router() -> Router<Arc<AppState>> {
    Router::new()
        // Public routes
        .route("/health", get(health::health_check))
        // Profiles
        .route("/register", post(profiles::register))
        .route("/me", get(profiles::get_me).patch(profiles::update_me))
        .route("/profiles/:principal_id", get(profiles::get_profile))
        // Skills
        .route("/skills", get(skills::list_skills).post(skills::create_skill))
        // Projects
        .route("/projects", post(projects::create_project))
        .route("/projects/:project_id", get(projects::get_project))
        .route("/projects/:project_id/submit", patch(projects::submit_work))
        .route("/projects/:project_id/matches", get(projects::match_freelancers))
        // Bids
        .route("/projects/:project_id/bid", post(bids::create_bid))
        .route("/projects/:project_id/bids", get(bids::list_bids))
        .route("/bids/:bid_id", patch(bids::update_bid_status))
        // Escrow
        .route("/projects/:project_id/fund", post(payments::fund_project))
        .route("/projects/:project_id/release", post(payments::release_payment))
        .route("/payments/onboard", post(payments::onboard))
        // Dashboard
        .route("/dashboard/my-projects", get(dashboard::my_projects))
        .route("/dashboard/my-bids", get(dashboard::my_bids))
}
