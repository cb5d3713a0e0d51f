//! Bid routes

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::extract::WithRejection;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::api::{DataResponse, ListResponse, ValidJson};
use crate::app::AppState;
use crate::auth::CurrentPrincipal;
use crate::domain::{BidResponse, CreateBidRequest, ProjectResponse, UpdateBidStatusRequest};
use crate::error::ApiError;
use crate::services::BidUpdate;
use crate::store::Acceptance;

/// Response DTO for an accepted bid
#[derive(Debug, Serialize)]
pub struct AcceptanceResponse {
    pub bid: BidResponse,
    pub project: ProjectResponse,
    pub rejected_bids: u64,
}

impl From<Acceptance> for AcceptanceResponse {
    fn from(a: Acceptance) -> Self {
        Self {
            bid: a.bid.into(),
            project: a.project.into(),
            rejected_bids: a.rejected_bids,
        }
    }
}

/// POST /projects/:project_id/bid
pub async fn create_bid(
    principal: CurrentPrincipal,
    State(state): State<Arc<AppState>>,
    Path(project_id): Path<Uuid>,
    WithRejection(Json(req), _): ValidJson<CreateBidRequest>,
) -> Result<impl IntoResponse, ApiError> {
    tracing::info!(
        user_id = %principal.id,
        project_id = %project_id,
        "Placing bid"
    );

    let bid = state.bids.submit_bid(project_id, &principal, req).await?;
    Ok((
        StatusCode::CREATED,
        Json(DataResponse::new(BidResponse::from(bid))),
    ))
}

/// GET /projects/:project_id/bids
pub async fn list_bids(
    principal: CurrentPrincipal,
    State(state): State<Arc<AppState>>,
    Path(project_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let bids = state.bids.project_bids(project_id, &principal).await?;
    Ok(bids.into_iter().collect::<ListResponse<BidResponse>>())
}

/// PATCH /bids/:bid_id
///
/// Accepting assigns the project and rejects every other pending bid in
/// one step.
pub async fn update_bid_status(
    principal: CurrentPrincipal,
    State(state): State<Arc<AppState>>,
    Path(bid_id): Path<Uuid>,
    WithRejection(Json(req), _): ValidJson<UpdateBidStatusRequest>,
) -> Result<Response, ApiError> {
    tracing::info!(
        user_id = %principal.id,
        bid_id = %bid_id,
        status = %req.status,
        "Updating bid status"
    );

    let response = match state.bids.update_status(bid_id, &principal, &req).await? {
        BidUpdate::Accepted(acceptance) => {
            DataResponse::new(AcceptanceResponse::from(acceptance)).into_response()
        }
        BidUpdate::Rejected(bid) => DataResponse::new(BidResponse::from(bid)).into_response(),
    };
    Ok(response)
}
