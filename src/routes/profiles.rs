//! Principal registration and profile routes

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use axum_extra::extract::WithRejection;
use std::sync::Arc;
use uuid::Uuid;

use crate::api::{DataResponse, ValidJson};
use crate::app::AppState;
use crate::auth::{CurrentPrincipal, RequireAuth};
use crate::domain::{PrincipalResponse, RegisterRequest, UpdateProfileRequest};
use crate::error::ApiError;

/// POST /register
///
/// Register the token's identity as a client or freelancer.
pub async fn register(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    WithRejection(Json(mut req), _): ValidJson<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    tracing::info!(
        user_id = %auth.user_id,
        role = %req.role,
        "Registering principal"
    );

    if req.email.is_none() {
        req.email = auth.email.clone();
    }

    let principal = state.profiles.register(auth.user_id, req).await?;
    Ok((
        StatusCode::CREATED,
        Json(DataResponse::new(PrincipalResponse::from(principal))),
    ))
}

/// GET /me
pub async fn get_me(CurrentPrincipal(principal): CurrentPrincipal) -> impl IntoResponse {
    DataResponse::new(PrincipalResponse::from(principal))
}

/// PATCH /me
///
/// Only the caller's own role fields may be changed.
pub async fn update_me(
    CurrentPrincipal(principal): CurrentPrincipal,
    State(state): State<Arc<AppState>>,
    WithRejection(Json(req), _): ValidJson<UpdateProfileRequest>,
) -> Result<impl IntoResponse, ApiError> {
    tracing::info!(user_id = %principal.id, "Updating profile");

    let updated = state.profiles.update(principal, req).await?;
    Ok(DataResponse::new(PrincipalResponse::from(updated)))
}

/// GET /profiles/:principal_id
///
/// Public view of another principal; contact details are omitted.
pub async fn get_profile(
    _auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(principal_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let principal = state.profiles.get(principal_id).await?;
    Ok(DataResponse::new(PrincipalResponse::public(principal)))
}
