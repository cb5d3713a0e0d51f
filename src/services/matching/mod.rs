//! Freelancer matching: a hard eligibility filter followed by text
//! similarity ranking.
//!
//! A freelancer is eligible when available and holding at least one of the
//! project's required skills. Eligible candidates are ranked by TF-IDF
//! cosine similarity between the project text and the candidate's profile
//! text. The ranking is recomputed on every call.

pub mod stop_words;
pub mod tfidf;

use serde::Serialize;
use std::sync::Arc;
use std::vec;
use uuid::Uuid;

use crate::domain::{Availability, Principal, PrincipalResponse, Project, Skill};
use crate::error::{ApiError, ApiResult};
use crate::store::MarketplaceStore;

#[derive(Debug, Clone)]
pub struct RankedFreelancer {
    pub freelancer: Principal,
    pub score: f64,
}

/// Ranked candidates, best first. Consumed once.
#[derive(Debug)]
pub struct Ranking {
    inner: vec::IntoIter<RankedFreelancer>,
}

impl Ranking {
    fn new(ranked: Vec<RankedFreelancer>) -> Self {
        Self {
            inner: ranked.into_iter(),
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }
}

impl Iterator for Ranking {
    type Item = RankedFreelancer;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for Ranking {}

/// Response DTO for one match
#[derive(Debug, Clone, Serialize)]
pub struct MatchResponse {
    pub freelancer: PrincipalResponse,
    pub score: f64,
}

impl From<RankedFreelancer> for MatchResponse {
    fn from(r: RankedFreelancer) -> Self {
        Self {
            freelancer: PrincipalResponse::public(r.freelancer),
            score: r.score,
        }
    }
}

fn is_eligible(candidate: &Principal, required: &[Skill]) -> bool {
    match candidate.as_freelancer() {
        Some(f) => {
            f.availability == Availability::Available
                && f.skills.iter().any(|s| required.iter().any(|r| r.id == s.id))
        }
        None => false,
    }
}

fn project_text(project: &Project) -> String {
    let skills: Vec<String> = project
        .required_skill_names()
        .iter()
        .map(|n| n.key().to_string())
        .collect();
    format!("{} {} {}", project.title, project.description, skills.join(" "))
}

fn candidate_text(candidate: &Principal) -> String {
    let skills: Vec<&str> = candidate.skills().iter().map(|s| s.name.as_str()).collect();
    format!(
        "{} {} {}",
        candidate.name,
        candidate.bio.as_deref().unwrap_or_default(),
        skills.join(" ")
    )
}

/// Filter and rank `candidates` for `project`. Ties keep input order.
pub fn rank(project: &Project, required: &[Skill], candidates: Vec<Principal>) -> Vec<RankedFreelancer> {
    let eligible: Vec<Principal> = candidates
        .into_iter()
        .filter(|c| is_eligible(c, required))
        .collect();
    if eligible.is_empty() {
        return Vec::new();
    }

    let documents: Vec<String> = eligible.iter().map(candidate_text).collect();
    let scores = tfidf::similarity_to_query(&project_text(project), &documents)
        .unwrap_or_else(|| {
            tracing::debug!(project_id = %project.id, "Empty vocabulary, scoring all candidates 0");
            vec![0.0; eligible.len()]
        });

    let mut ranked: Vec<RankedFreelancer> = eligible
        .into_iter()
        .zip(scores)
        .map(|(freelancer, score)| RankedFreelancer { freelancer, score })
        .collect();
    ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
    ranked
}

pub struct MatchingEngine {
    store: Arc<dyn MarketplaceStore>,
}

impl MatchingEngine {
    pub fn new(store: Arc<dyn MarketplaceStore>) -> Self {
        Self { store }
    }

    pub async fn match_freelancers(&self, project_id: Uuid) -> ApiResult<Ranking> {
        let project = self
            .store
            .get_project(project_id)
            .await?
            .ok_or_else(|| ApiError::not_found("project not found"))?;

        let names = project.required_skill_names();
        if names.is_empty() {
            return Ok(Ranking::empty());
        }

        let required = self.store.find_skills(&names).await?;
        if required.is_empty() {
            return Ok(Ranking::empty());
        }

        let ids: Vec<Uuid> = required.iter().map(|s| s.id).collect();
        let candidates = self.store.list_freelancers_with_any_skill(&ids).await?;

        let ranked = rank(&project, &required, candidates);
        tracing::debug!(
            project_id = %project_id,
            candidates = ranked.len(),
            "Ranked freelancers"
        );
        Ok(Ranking::new(ranked))
    }
}
