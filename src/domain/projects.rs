use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Bid, BidStatus, Money, SkillName, StateError, ValidationError};

pub const MAX_TITLE_LEN: usize = 255;

/// Project status enum
///
/// `Open -> InProgress` happens once, on bid acceptance.
/// `InProgress -> Completed` happens once, on payment capture.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProjectStatus {
    #[default]
    Open,
    InProgress,
    Completed,
}

impl ProjectStatus {
    pub fn as_db_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
        }
    }

    pub fn from_db(s: &str) -> Option<Self> {
        match s {
            "open" => Some(Self::Open),
            "in_progress" => Some(Self::InProgress),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }
}

/// Project category
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Webdev,
    Design,
    Writing,
    Marketing,
    #[default]
    Other,
}

impl Category {
    pub fn as_db_str(self) -> &'static str {
        match self {
            Self::Webdev => "webdev",
            Self::Design => "design",
            Self::Writing => "writing",
            Self::Marketing => "marketing",
            Self::Other => "other",
        }
    }

    pub fn from_db(s: &str) -> Option<Self> {
        match s {
            "webdev" => Some(Self::Webdev),
            "design" => Some(Self::Design),
            "writing" => Some(Self::Writing),
            "marketing" => Some(Self::Marketing),
            "other" => Some(Self::Other),
            _ => None,
        }
    }
}

/// Project entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    pub id: Uuid,
    pub client_id: Uuid,
    pub freelancer_id: Option<Uuid>,
    pub title: String,
    pub description: String,
    pub category: Category,
    /// Free text, comma separated.
    pub required_skills: String,
    pub budget: Money,
    pub status: ProjectStatus,
    pub payment_intent_id: Option<String>,
    pub submission_notes: Option<String>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    pub fn is_owned_by(&self, principal_id: Uuid) -> bool {
        self.client_id == principal_id
    }

    pub fn is_assigned_to(&self, principal_id: Uuid) -> bool {
        self.freelancer_id == Some(principal_id)
    }

    pub fn is_funded(&self) -> bool {
        self.payment_intent_id.is_some()
    }

    /// Preconditions for accepting a bid, in the order they are reported.
    pub fn ensure_assignable(&self) -> Result<(), StateError> {
        if self.status != ProjectStatus::Open {
            return Err(StateError::ProjectNotOpen);
        }
        if self.freelancer_id.is_some() {
            return Err(StateError::AlreadyAssigned);
        }
        Ok(())
    }

    /// Assign the bidder, adopt the bid amount as the budget and move to
    /// `InProgress`.
    pub fn assign(&mut self, bid: &Bid, now: DateTime<Utc>) -> Result<(), StateError> {
        if bid.project_id != self.id {
            return Err(StateError::BidProjectMismatch);
        }
        self.ensure_assignable()?;
        if bid.status != BidStatus::Pending {
            return Err(StateError::BidNotPending);
        }

        self.freelancer_id = Some(bid.freelancer_id);
        self.budget = bid.amount;
        self.status = ProjectStatus::InProgress;
        self.updated_at = now;
        Ok(())
    }

    pub fn ensure_in_progress(&self) -> Result<(), StateError> {
        match self.status {
            ProjectStatus::InProgress => Ok(()),
            _ => Err(StateError::NotInProgress),
        }
    }

    /// Record the payment-intent handle. Only ever set once.
    pub fn attach_payment_intent(
        &mut self,
        handle: &str,
        now: DateTime<Utc>,
    ) -> Result<(), StateError> {
        self.ensure_in_progress()?;
        if self.payment_intent_id.is_some() {
            return Err(StateError::AlreadyFunded);
        }
        self.payment_intent_id = Some(handle.to_string());
        self.updated_at = now;
        Ok(())
    }

    /// Move a funded project to `Completed`. Returns `false` when it already was.
    pub fn complete(&mut self, now: DateTime<Utc>) -> Result<bool, StateError> {
        match self.status {
            ProjectStatus::Completed => Ok(false),
            ProjectStatus::Open => Err(StateError::NotInProgress),
            ProjectStatus::InProgress => {
                if self.payment_intent_id.is_none() {
                    return Err(StateError::NotFunded);
                }
                self.status = ProjectStatus::Completed;
                self.updated_at = now;
                Ok(true)
            }
        }
    }

    pub fn record_submission(&mut self, notes: &str, now: DateTime<Utc>) -> Result<(), StateError> {
        self.ensure_in_progress()?;
        if self.payment_intent_id.is_none() {
            return Err(StateError::NotFunded);
        }
        self.submission_notes = Some(notes.to_string());
        self.submitted_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// Required skills parsed from the comma-separated text, deduplicated by
    /// normalized key. Blank entries are skipped.
    pub fn required_skill_names(&self) -> Vec<SkillName> {
        let mut names: Vec<SkillName> = Vec::new();
        for token in self.required_skills.split(',') {
            if let Ok(name) = SkillName::parse(token) {
                if !names.iter().any(|n| n.key() == name.key()) {
                    names.push(name);
                }
            }
        }
        names
    }
}

/// Request DTO for creating a project
#[derive(Debug, Clone, Deserialize)]
pub struct CreateProjectRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: Option<Category>,
    #[serde(default)]
    pub required_skills: Option<String>,
    pub budget: Decimal,
}

impl CreateProjectRequest {
    pub fn into_project(self, client_id: Uuid, now: DateTime<Utc>) -> Result<Project, ValidationError> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(ValidationError::new("title must not be empty"));
        }
        if title.chars().count() > MAX_TITLE_LEN {
            return Err(ValidationError::new(format!(
                "title must be at most {MAX_TITLE_LEN} characters"
            )));
        }

        let budget = Money::from_decimal(self.budget)?;
        if !budget.is_positive() {
            return Err(ValidationError::new("budget must be greater than zero"));
        }

        Ok(Project {
            id: Uuid::new_v4(),
            client_id,
            freelancer_id: None,
            title: title.to_string(),
            description: self.description.trim().to_string(),
            category: self.category.unwrap_or_default(),
            required_skills: self.required_skills.unwrap_or_default().trim().to_string(),
            budget,
            status: ProjectStatus::Open,
            payment_intent_id: None,
            submission_notes: None,
            submitted_at: None,
            created_at: now,
            updated_at: now,
        })
    }
}

/// Request DTO for submitting work on an assigned project
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitWorkRequest {
    pub submission_notes: String,
}

/// Response DTO for project
#[derive(Debug, Clone, Serialize)]
pub struct ProjectResponse {
    pub id: Uuid,
    pub client_id: Uuid,
    pub freelancer_id: Option<Uuid>,
    pub title: String,
    pub description: String,
    pub category: Category,
    pub required_skills: String,
    pub budget: Money,
    pub status: ProjectStatus,
    pub payment_intent_id: Option<String>,
    pub submission_notes: Option<String>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Project> for ProjectResponse {
    fn from(p: Project) -> Self {
        Self {
            id: p.id,
            client_id: p.client_id,
            freelancer_id: p.freelancer_id,
            title: p.title,
            description: p.description,
            category: p.category,
            required_skills: p.required_skills,
            budget: p.budget,
            status: p.status,
            payment_intent_id: p.payment_intent_id,
            submission_notes: p.submission_notes,
            submitted_at: p.submitted_at,
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_project(budget: i64) -> Project {
        let now = Utc::now();
        Project {
            id: Uuid::new_v4(),
            client_id: Uuid::new_v4(),
            freelancer_id: None,
            title: "Storefront".into(),
            description: String::new(),
            category: Category::Webdev,
            required_skills: "React, django".into(),
            budget: Money::from_cents(budget),
            status: ProjectStatus::Open,
            payment_intent_id: None,
            submission_notes: None,
            submitted_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn assign_adopts_bid_amount_and_freelancer() {
        let mut project = open_project(10_000);
        let bid = Bid::new(project.id, Uuid::new_v4(), Money::from_cents(9_000), "hi", Utc::now());

        project.assign(&bid, Utc::now()).unwrap();

        assert_eq!(project.status, ProjectStatus::InProgress);
        assert_eq!(project.freelancer_id, Some(bid.freelancer_id));
        assert_eq!(project.budget, Money::from_cents(9_000));
    }

    #[test]
    fn second_assignment_is_rejected_unchanged() {
        let mut project = open_project(10_000);
        let first = Bid::new(project.id, Uuid::new_v4(), Money::from_cents(9_000), "a", Utc::now());
        let second = Bid::new(project.id, Uuid::new_v4(), Money::from_cents(8_000), "b", Utc::now());
        project.assign(&first, Utc::now()).unwrap();
        let snapshot = project.clone();

        assert_eq!(project.assign(&second, Utc::now()), Err(StateError::ProjectNotOpen));
        assert_eq!(project, snapshot);
    }

    #[test]
    fn assigned_but_open_reports_already_assigned() {
        let mut project = open_project(100);
        project.freelancer_id = Some(Uuid::new_v4());
        assert_eq!(project.ensure_assignable(), Err(StateError::AlreadyAssigned));
    }

    #[test]
    fn bid_from_another_project_cannot_assign() {
        let mut project = open_project(100);
        let bid = Bid::new(Uuid::new_v4(), Uuid::new_v4(), Money::from_cents(50), "x", Utc::now());
        assert_eq!(project.assign(&bid, Utc::now()), Err(StateError::BidProjectMismatch));
    }

    #[test]
    fn payment_intent_is_set_once_and_only_in_progress() {
        let mut project = open_project(100);
        assert_eq!(
            project.attach_payment_intent("pi_1", Utc::now()),
            Err(StateError::NotInProgress)
        );

        let bid = Bid::new(project.id, Uuid::new_v4(), Money::from_cents(50), "x", Utc::now());
        project.assign(&bid, Utc::now()).unwrap();
        project.attach_payment_intent("pi_1", Utc::now()).unwrap();
        assert_eq!(
            project.attach_payment_intent("pi_2", Utc::now()),
            Err(StateError::AlreadyFunded)
        );
        assert_eq!(project.payment_intent_id.as_deref(), Some("pi_1"));
    }

    #[test]
    fn completion_is_idempotent_and_requires_funding() {
        let mut project = open_project(100);
        let bid = Bid::new(project.id, Uuid::new_v4(), Money::from_cents(50), "x", Utc::now());
        project.assign(&bid, Utc::now()).unwrap();
        assert_eq!(project.complete(Utc::now()), Err(StateError::NotFunded));

        project.attach_payment_intent("pi_1", Utc::now()).unwrap();
        assert_eq!(project.complete(Utc::now()), Ok(true));
        assert_eq!(project.complete(Utc::now()), Ok(false));
        assert_eq!(project.status, ProjectStatus::Completed);
    }

    #[test]
    fn required_skills_are_normalized_and_deduplicated() {
        let mut project = open_project(100);
        project.required_skills = " React ,django,, REACT,  ".into();
        let keys: Vec<_> = project
            .required_skill_names()
            .iter()
            .map(|n| n.key().to_string())
            .collect();
        assert_eq!(keys, vec!["react", "django"]);

        project.required_skills = String::new();
        assert!(project.required_skill_names().is_empty());
    }

    #[test]
    fn create_request_validates_budget() {
        let req = CreateProjectRequest {
            title: "Logo".into(),
            description: String::new(),
            category: None,
            required_skills: None,
            budget: Decimal::ZERO,
        };
        assert!(req.into_project(Uuid::new_v4(), Utc::now()).is_err());
    }
}
