use axum::{extract::State, response::IntoResponse};
use std::sync::Arc;

use crate::api::ListResponse;
use crate::app::AppState;
use crate::auth::CurrentPrincipal;
use crate::domain::{BidResponse, ProjectResponse};
use crate::error::ApiError;

/// GET /dashboard/my-projects
///
/// Projects the caller owns (client) or is assigned to (freelancer).
pub async fn my_projects(
    principal: CurrentPrincipal,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let projects = state.projects.my_projects(&principal).await?;
    Ok(projects.into_iter().collect::<ListResponse<ProjectResponse>>())
}

/// GET /dashboard/my-bids
pub async fn my_bids(
    principal: CurrentPrincipal,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let bids = state.bids.my_bids(&principal).await?;
    Ok(bids.into_iter().collect::<ListResponse<BidResponse>>())
}
