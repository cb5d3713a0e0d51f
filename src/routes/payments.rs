//! Escrow funding, release and payout onboarding routes

use axum::{
    extract::{Path, State},
    response::IntoResponse,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::api::DataResponse;
use crate::app::AppState;
use crate::auth::CurrentPrincipal;
use crate::domain::OnboardingResponse;
use crate::error::ApiError;

/// POST /projects/:project_id/fund
///
/// Repeated calls return the intent created by the first one.
pub async fn fund_project(
    principal: CurrentPrincipal,
    State(state): State<Arc<AppState>>,
    Path(project_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    tracing::info!(
        user_id = %principal.id,
        project_id = %project_id,
        "Funding project"
    );

    let funded = state.escrow.fund(project_id, &principal).await?;
    Ok(DataResponse::new(funded))
}

/// POST /projects/:project_id/release
pub async fn release_payment(
    principal: CurrentPrincipal,
    State(state): State<Arc<AppState>>,
    Path(project_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    tracing::info!(
        user_id = %principal.id,
        project_id = %project_id,
        "Releasing payment"
    );

    let released = state.escrow.release(project_id, &principal).await?;
    Ok(DataResponse::new(released))
}

/// POST /payments/onboard
pub async fn onboard(
    principal: CurrentPrincipal,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    tracing::info!(user_id = %principal.id, "Creating payout onboarding link");

    let url = state.profiles.onboard_payments(&principal).await?;
    Ok(DataResponse::new(OnboardingResponse { url }))
}
