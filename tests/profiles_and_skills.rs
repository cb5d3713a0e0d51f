mod common;

use assert_matches::assert_matches;
use serde_json::json;

use common::Marketplace;
use gigmarket_backend::domain::{
    Availability, CreateSkillRequest, RegisterRequest, Role, SubmitWorkRequest,
    UpdateProfileRequest,
};
use gigmarket_backend::error::ApiError;

#[tokio::test]
async fn skill_names_are_unique_ignoring_case() {
    let m = Marketplace::new();

    let react = m
        .skills
        .create(CreateSkillRequest { name: "React".into() })
        .await
        .unwrap();
    assert_eq!(react.name, "React");

    let err = m
        .skills
        .create(CreateSkillRequest { name: " react ".into() })
        .await
        .unwrap_err();
    assert_matches!(err, ApiError::Conflict(_));

    let err = m
        .skills
        .create(CreateSkillRequest { name: "   ".into() })
        .await
        .unwrap_err();
    assert_matches!(err, ApiError::Validation(_));

    assert_eq!(m.skills.list().await.unwrap().len(), 1);
}

#[tokio::test]
async fn registration_reuses_existing_skills() {
    let m = Marketplace::new();
    m.skills
        .create(CreateSkillRequest { name: "Django".into() })
        .await
        .unwrap();

    let f = m.freelancer("f1", &["django", "Rust", "rust"]).await;
    let names: Vec<_> = f.skills().iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names.len(), 2);
    assert!(names.contains(&"Django"));
    assert!(names.contains(&"Rust"));

    assert_eq!(m.skills.list().await.unwrap().len(), 2);
}

#[tokio::test]
async fn role_fields_belong_to_their_role() {
    let m = Marketplace::new();

    let client_with_skills: RegisterRequest = serde_json::from_value(json!({
        "username": "acme",
        "name": "Acme",
        "role": "CLIENT",
        "skills": ["react"],
    }))
    .unwrap();
    let err = m
        .profiles
        .register(uuid::Uuid::new_v4(), client_with_skills)
        .await
        .unwrap_err();
    assert_matches!(err, ApiError::Validation(msg) if msg.contains("skills"));

    let freelancer_with_company: RegisterRequest = serde_json::from_value(json!({
        "username": "solo",
        "name": "Solo",
        "role": "FREELANCER",
        "company_name": "Solo LLC",
    }))
    .unwrap();
    let err = m
        .profiles
        .register(uuid::Uuid::new_v4(), freelancer_with_company)
        .await
        .unwrap_err();
    assert_matches!(err, ApiError::Validation(_));

    let client = m.client("acme").await;
    let patch = UpdateProfileRequest {
        availability: Some(Availability::Busy),
        ..Default::default()
    };
    let err = m.profiles.update(client, patch).await.unwrap_err();
    assert_matches!(err, ApiError::Validation(_));
}

#[tokio::test]
async fn usernames_and_identities_register_once() {
    let m = Marketplace::new();
    let first = m.client("acme").await;
    assert_eq!(first.role(), Role::Client);

    let same_name: RegisterRequest = serde_json::from_value(json!({
        "username": "ACME",
        "name": "Other",
        "role": "CLIENT",
    }))
    .unwrap();
    let err = m
        .profiles
        .register(uuid::Uuid::new_v4(), same_name)
        .await
        .unwrap_err();
    assert_matches!(err, ApiError::Conflict(_));

    let same_id: RegisterRequest = serde_json::from_value(json!({
        "username": "acme2",
        "name": "Acme",
        "role": "FREELANCER",
    }))
    .unwrap();
    let err = m.profiles.register(first.id, same_id).await.unwrap_err();
    assert_matches!(err, ApiError::Conflict(_));
}

#[tokio::test]
async fn rejected_registrations_create_no_skills() {
    let m = Marketplace::new();
    let taken = m.freelancer("f1", &[]).await;

    let duplicate: RegisterRequest = serde_json::from_value(json!({
        "username": "F1",
        "name": "Someone Else",
        "role": "FREELANCER",
        "skills": ["elixir", "phoenix"],
    }))
    .unwrap();
    let err = m
        .profiles
        .register(uuid::Uuid::new_v4(), duplicate)
        .await
        .unwrap_err();
    assert_matches!(err, ApiError::Conflict(_));

    let same_id: RegisterRequest = serde_json::from_value(json!({
        "username": "f2",
        "name": "Again",
        "role": "FREELANCER",
        "skills": ["haskell"],
    }))
    .unwrap();
    let err = m.profiles.register(taken.id, same_id).await.unwrap_err();
    assert_matches!(err, ApiError::Conflict(_));

    assert!(m.skills.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn registered_freelancers_keep_their_skills() {
    let m = Marketplace::new();
    let f = m.freelancer("f1", &["go", "kubernetes"]).await;
    assert_eq!(f.skills().len(), 2);

    let stored = m.profiles.get(f.id).await.unwrap();
    let mut names: Vec<_> = stored.skills().iter().map(|s| s.name.clone()).collect();
    names.sort();
    assert_eq!(names, ["go", "kubernetes"]);
}

#[tokio::test]
async fn freelancers_update_their_own_profile() {
    let m = Marketplace::new();
    let f = m.freelancer("f1", &["react"]).await;

    let patch: UpdateProfileRequest = serde_json::from_value(json!({
        "bio": "Frontend specialist",
        "availability": "BUSY",
        "skills": ["vue"],
    }))
    .unwrap();
    let updated = m.profiles.update(f.clone(), patch).await.unwrap();

    let stored = m.profiles.get(f.id).await.unwrap();
    assert_eq!(stored, updated);
    assert_eq!(stored.bio.as_deref(), Some("Frontend specialist"));
    assert_eq!(
        stored.as_freelancer().map(|p| p.availability),
        Some(Availability::Busy)
    );
    let names: Vec<_> = stored.skills().iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["vue"]);

    let role_change = serde_json::from_value::<UpdateProfileRequest>(json!({ "role": "CLIENT" }));
    assert!(role_change.is_err());
}

#[tokio::test]
async fn payout_onboarding_keeps_one_account() {
    let m = Marketplace::new();
    let f = m.freelancer("f1", &["react"]).await;

    let url = m.profiles.onboard_payments(&f).await.unwrap();
    assert!(url.ends_with("acct_1"));

    let f = m.profiles.get(f.id).await.unwrap();
    assert_eq!(f.payment_account(), Some("acct_1"));

    let url = m.profiles.onboard_payments(&f).await.unwrap();
    assert!(url.ends_with("acct_1"));

    let client = m.client("acme").await;
    let err = m.profiles.onboard_payments(&client).await.unwrap_err();
    assert_matches!(err, ApiError::Forbidden(_));
}

#[tokio::test]
async fn only_the_assigned_freelancer_submits_funded_work() {
    let m = Marketplace::new();
    let (client, freelancer, project) = m.assigned_project(9_000).await;
    let notes = || SubmitWorkRequest {
        submission_notes: "Deployed to staging".into(),
    };

    let err = m
        .projects
        .submit_work(project.id, &client, notes())
        .await
        .unwrap_err();
    assert_matches!(err, ApiError::Forbidden(_));

    // Escrow has to be in place before delivery.
    let err = m
        .projects
        .submit_work(project.id, &freelancer, notes())
        .await
        .unwrap_err();
    assert_matches!(err, ApiError::Conflict(_));

    m.escrow.fund(project.id, &client).await.unwrap();
    let submitted = m
        .projects
        .submit_work(project.id, &freelancer, notes())
        .await
        .unwrap();
    assert_eq!(submitted.submission_notes.as_deref(), Some("Deployed to staging"));
    assert!(submitted.submitted_at.is_some());

    let blank = SubmitWorkRequest {
        submission_notes: "  ".into(),
    };
    let err = m
        .projects
        .submit_work(project.id, &freelancer, blank)
        .await
        .unwrap_err();
    assert_matches!(err, ApiError::Validation(_));
}

#[tokio::test]
async fn only_clients_post_projects() {
    let m = Marketplace::new();
    let f = m.freelancer("f1", &["react"]).await;
    let req = gigmarket_backend::domain::CreateProjectRequest {
        title: "Logo".into(),
        description: String::new(),
        category: None,
        required_skills: None,
        budget: common::dollars(1_000),
    };
    let err = m.projects.create(&f, req).await.unwrap_err();
    assert_matches!(err, ApiError::Forbidden(_));
}
