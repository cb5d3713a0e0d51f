mod common;

use assert_matches::assert_matches;

use common::{money, Marketplace};
use gigmarket_backend::domain::{IntentStatus, ProjectStatus};
use gigmarket_backend::error::ApiError;

#[tokio::test]
async fn funding_twice_returns_the_same_intent() {
    let m = Marketplace::new();
    let (client, _, project) = m.assigned_project(9_000).await;

    let first = m.escrow.fund(project.id, &client).await.unwrap();
    assert!(!first.existing);
    assert_eq!(first.amount, money(9_000));
    assert_eq!(first.platform_fee, money(900));
    assert_eq!(first.currency, "usd");

    let second = m.escrow.fund(project.id, &client).await.unwrap();
    assert!(second.existing);
    assert_eq!(second.payment_intent_id, first.payment_intent_id);
    assert_eq!(second.client_secret, first.client_secret);

    assert_eq!(m.gateway.creates(), 1);
    let stored = m.project_now(project.id).await;
    assert_eq!(stored.payment_intent_id.as_deref(), Some(first.payment_intent_id.as_str()));
    assert_eq!(stored.status, ProjectStatus::InProgress);
}

#[tokio::test]
async fn funding_requires_an_assigned_project() {
    let m = Marketplace::new();
    let client = m.client("acme").await;
    let project = m.project(&client, 10_000, "react").await;

    let err = m.escrow.fund(project.id, &client).await.unwrap_err();
    assert_matches!(err, ApiError::Conflict(_));
    assert_eq!(m.gateway.creates(), 0);
}

#[tokio::test]
async fn funding_requires_an_onboarded_freelancer() {
    let m = Marketplace::new();
    let client = m.client("acme").await;
    let freelancer = m.freelancer("f1", &["react"]).await;
    let project = m.project(&client, 10_000, "react").await;
    let bid = m.bid(&freelancer, &project, 9_000).await;
    m.bids.accept_bid(bid.id, &client).await.unwrap();

    let err = m.escrow.fund(project.id, &client).await.unwrap_err();
    assert_matches!(err, ApiError::Conflict(msg) if msg == "freelancer not onboarded");

    assert_eq!(m.gateway.creates(), 0);
    assert_eq!(m.project_now(project.id).await.payment_intent_id, None);
}

#[tokio::test]
async fn only_the_owner_moves_money() {
    let m = Marketplace::new();
    let (_, freelancer, project) = m.assigned_project(9_000).await;
    let stranger = m.client("globex").await;

    let err = m.escrow.fund(project.id, &stranger).await.unwrap_err();
    assert_matches!(err, ApiError::Forbidden(_));

    let err = m.escrow.release(project.id, &freelancer).await.unwrap_err();
    assert_matches!(err, ApiError::Forbidden(_));
}

#[tokio::test]
async fn processor_failure_on_create_leaves_the_project_unfunded() {
    let m = Marketplace::new();
    let (client, _, project) = m.assigned_project(9_000).await;

    *m.gateway.fail_create.lock() = true;
    let err = m.escrow.fund(project.id, &client).await.unwrap_err();
    assert_matches!(err, ApiError::ExternalService(_));
    assert_eq!(m.project_now(project.id).await.payment_intent_id, None);

    *m.gateway.fail_create.lock() = false;
    let funded = m.escrow.fund(project.id, &client).await.unwrap();
    assert!(!funded.existing);
}

#[tokio::test]
async fn unreadable_existing_intent_never_creates_another() {
    let m = Marketplace::new();
    let (client, _, project) = m.assigned_project(9_000).await;
    m.escrow.fund(project.id, &client).await.unwrap();

    *m.gateway.fail_retrieve.lock() = true;
    let err = m.escrow.fund(project.id, &client).await.unwrap_err();
    assert_matches!(err, ApiError::Conflict(_));
    assert_eq!(m.gateway.creates(), 1);
}

#[tokio::test]
async fn release_captures_and_completes_once() {
    let m = Marketplace::new();
    let (client, _, project) = m.assigned_project(9_000).await;
    let funded = m.escrow.fund(project.id, &client).await.unwrap();
    m.gateway.confirm(&funded.payment_intent_id);

    let released = m.escrow.release(project.id, &client).await.unwrap();
    assert!(!released.already_released);
    assert_eq!(released.status, ProjectStatus::Completed);
    assert_eq!(m.gateway.captures(), 1);

    let again = m.escrow.release(project.id, &client).await.unwrap();
    assert!(again.already_released);
    assert_eq!(again.status, ProjectStatus::Completed);
    assert_eq!(m.gateway.captures(), 1);

    assert_eq!(m.project_now(project.id).await.status, ProjectStatus::Completed);
}

#[tokio::test]
async fn release_before_funding_or_confirmation_conflicts() {
    let m = Marketplace::new();
    let (client, _, project) = m.assigned_project(9_000).await;

    let err = m.escrow.release(project.id, &client).await.unwrap_err();
    assert_matches!(err, ApiError::Conflict(_));

    m.escrow.fund(project.id, &client).await.unwrap();
    let err = m.escrow.release(project.id, &client).await.unwrap_err();
    assert_matches!(err, ApiError::Conflict(msg) if msg.contains("requires_payment_method"));

    assert_eq!(m.gateway.captures(), 0);
    assert_eq!(m.project_now(project.id).await.status, ProjectStatus::InProgress);
}

#[tokio::test]
async fn failed_capture_keeps_the_project_in_progress() {
    let m = Marketplace::new();
    let (client, _, project) = m.assigned_project(9_000).await;
    let funded = m.escrow.fund(project.id, &client).await.unwrap();
    m.gateway.confirm(&funded.payment_intent_id);

    *m.gateway.fail_capture.lock() = true;
    let err = m.escrow.release(project.id, &client).await.unwrap_err();
    assert_matches!(err, ApiError::ExternalService(_));
    assert_eq!(m.project_now(project.id).await.status, ProjectStatus::InProgress);
    assert_eq!(
        m.gateway.status_of(&funded.payment_intent_id),
        Some(IntentStatus::RequiresCapture)
    );

    *m.gateway.fail_capture.lock() = false;
    let released = m.escrow.release(project.id, &client).await.unwrap();
    assert_eq!(released.status, ProjectStatus::Completed);
}

#[tokio::test]
async fn capture_seen_remotely_completes_without_capturing_again() {
    let m = Marketplace::new();
    let (client, _, project) = m.assigned_project(9_000).await;
    let funded = m.escrow.fund(project.id, &client).await.unwrap();
    m.gateway.mark_succeeded(&funded.payment_intent_id);

    let released = m.escrow.release(project.id, &client).await.unwrap();
    assert!(released.already_released);
    assert_eq!(released.status, ProjectStatus::Completed);
    assert_eq!(m.gateway.captures(), 0);
}
