//! Project routes

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use axum_extra::extract::WithRejection;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::api::{DataResponse, ListResponse, ValidJson};
use crate::app::AppState;
use crate::auth::{CurrentPrincipal, RequireAuth};
use crate::domain::{CreateProjectRequest, ProjectResponse, SubmitWorkRequest};
use crate::error::ApiError;
use crate::services::matching::MatchResponse;

const DEFAULT_MATCH_LIMIT: usize = 20;
const MAX_MATCH_LIMIT: usize = 100;

#[derive(Debug, Deserialize)]
pub struct MatchQuery {
    pub limit: Option<usize>,
}

impl MatchQuery {
    fn limit(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_MATCH_LIMIT).clamp(1, MAX_MATCH_LIMIT)
    }
}

/// POST /projects
pub async fn create_project(
    principal: CurrentPrincipal,
    State(state): State<Arc<AppState>>,
    WithRejection(Json(req), _): ValidJson<CreateProjectRequest>,
) -> Result<impl IntoResponse, ApiError> {
    tracing::info!(user_id = %principal.id, title = %req.title, "Creating project");

    let project = state.projects.create(&principal, req).await?;
    Ok((
        StatusCode::CREATED,
        Json(DataResponse::new(ProjectResponse::from(project))),
    ))
}

/// GET /projects/:project_id
pub async fn get_project(
    _auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(project_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let project = state.projects.get(project_id).await?;
    Ok(DataResponse::new(ProjectResponse::from(project)))
}

/// PATCH /projects/:project_id/submit
///
/// Assigned freelancer records delivery notes. Status stays `IN_PROGRESS`.
pub async fn submit_work(
    principal: CurrentPrincipal,
    State(state): State<Arc<AppState>>,
    Path(project_id): Path<Uuid>,
    WithRejection(Json(req), _): ValidJson<SubmitWorkRequest>,
) -> Result<impl IntoResponse, ApiError> {
    tracing::info!(
        user_id = %principal.id,
        project_id = %project_id,
        "Submitting work"
    );

    let project = state.projects.submit_work(project_id, &principal, req).await?;
    Ok(DataResponse::new(ProjectResponse::from(project)))
}

/// GET /projects/:project_id/matches
///
/// Freelancers ranked by similarity to the project, best first.
pub async fn match_freelancers(
    _auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(project_id): Path<Uuid>,
    WithRejection(Query(query), _): WithRejection<Query<MatchQuery>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let ranking = state.matching.match_freelancers(project_id).await?;

    tracing::debug!(
        project_id = %project_id,
        candidates = ranking.len(),
        "Ranked freelancers"
    );

    Ok(ranking
        .take(query.limit())
        .collect::<ListResponse<MatchResponse>>())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn match_limit_is_clamped() {
        assert_eq!(MatchQuery { limit: None }.limit(), DEFAULT_MATCH_LIMIT);
        assert_eq!(MatchQuery { limit: Some(0) }.limit(), 1);
        assert_eq!(MatchQuery { limit: Some(5) }.limit(), 5);
        assert_eq!(MatchQuery { limit: Some(10_000) }.limit(), MAX_MATCH_LIMIT);
    }
}
