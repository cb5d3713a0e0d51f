use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use axum_extra::extract::WithRejection;
use std::sync::Arc;

use crate::api::{DataResponse, ListResponse, ValidJson};
use crate::app::AppState;
use crate::auth::{CurrentPrincipal, RequireAuth};
use crate::domain::{CreateSkillRequest, Skill};
use crate::error::ApiError;

/// GET /skills
pub async fn list_skills(
    _auth: RequireAuth,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let skills = state.skills.list().await?;
    Ok(ListResponse::<Skill>::new(skills))
}

/// POST /skills
///
/// Names are unique ignoring case and surrounding whitespace.
pub async fn create_skill(
    principal: CurrentPrincipal,
    State(state): State<Arc<AppState>>,
    WithRejection(Json(req), _): ValidJson<CreateSkillRequest>,
) -> Result<impl IntoResponse, ApiError> {
    tracing::info!(user_id = %principal.id, name = %req.name, "Creating skill");

    let skill = state.skills.create(req).await?;
    Ok((StatusCode::CREATED, Json(DataResponse::new(skill))))
}
