//! Shared fixtures: services wired over the in-memory store and a scripted
//! payment gateway.
#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use gigmarket_backend::domain::{
    Bid, CreateBidRequest, CreateProjectRequest, FeePolicy, IntentStatus, Money, NewPaymentIntent,
    PaymentIntent, Principal, Project, RegisterRequest,
};
use gigmarket_backend::services::payments::GatewayError;
use gigmarket_backend::services::{
    BidService, EscrowService, MatchingEngine, OnboardingUrls, PaymentGateway, ProfileService,
    ProjectLocks, ProjectService, SkillDirectory,
};
use gigmarket_backend::store::{InMemoryStore, MarketplaceStore};

/// In-process stand-in for the payment processor.
#[derive(Default)]
pub struct FakeGateway {
    intents: Mutex<HashMap<String, PaymentIntent>>,
    by_key: Mutex<HashMap<String, String>>,
    pub creates: AtomicUsize,
    pub captures: AtomicUsize,
    pub accounts: AtomicUsize,
    pub fail_create: Mutex<bool>,
    pub fail_retrieve: Mutex<bool>,
    pub fail_capture: Mutex<bool>,
}

impl FakeGateway {
    pub fn creates(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    pub fn captures(&self) -> usize {
        self.captures.load(Ordering::SeqCst)
    }

    /// Simulate the payer confirming the charge.
    pub fn confirm(&self, intent_id: &str) {
        if let Some(intent) = self.intents.lock().get_mut(intent_id) {
            intent.status = IntentStatus::RequiresCapture;
        }
    }

    /// Simulate a capture that happened out of band.
    pub fn mark_succeeded(&self, intent_id: &str) {
        if let Some(intent) = self.intents.lock().get_mut(intent_id) {
            intent.status = IntentStatus::Succeeded;
        }
    }

    pub fn status_of(&self, intent_id: &str) -> Option<IntentStatus> {
        self.intents.lock().get(intent_id).map(|i| i.status.clone())
    }

    fn unavailable() -> GatewayError {
        GatewayError::Transport("connection refused".into())
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn create_intent(&self, params: &NewPaymentIntent) -> Result<PaymentIntent, GatewayError> {
        if *self.fail_create.lock() {
            return Err(Self::unavailable());
        }

        let mut by_key = self.by_key.lock();
        let mut intents = self.intents.lock();
        if let Some(id) = by_key.get(&params.idempotency_key) {
            if let Some(existing) = intents.get(id) {
                return Ok(existing.clone());
            }
        }

        let n = self.creates.fetch_add(1, Ordering::SeqCst) + 1;
        let intent = PaymentIntent {
            id: format!("pi_{n}"),
            status: IntentStatus::RequiresPaymentMethod,
            client_secret: Some(format!("pi_{n}_secret")),
            amount: params.amount,
            currency: params.currency.clone(),
        };
        by_key.insert(params.idempotency_key.clone(), intent.id.clone());
        intents.insert(intent.id.clone(), intent.clone());
        Ok(intent)
    }

    async fn retrieve_intent(&self, intent_id: &str) -> Result<PaymentIntent, GatewayError> {
        if *self.fail_retrieve.lock() {
            return Err(Self::unavailable());
        }
        self.intents
            .lock()
            .get(intent_id)
            .cloned()
            .ok_or_else(|| GatewayError::Rejected {
                status: 404,
                message: format!("No such payment_intent: '{intent_id}'"),
            })
    }

    async fn capture_intent(&self, intent_id: &str) -> Result<PaymentIntent, GatewayError> {
        if *self.fail_capture.lock() {
            return Err(Self::unavailable());
        }
        let mut intents = self.intents.lock();
        let intent = intents
            .get_mut(intent_id)
            .ok_or_else(|| GatewayError::Rejected {
                status: 404,
                message: format!("No such payment_intent: '{intent_id}'"),
            })?;
        if intent.status != IntentStatus::RequiresCapture {
            return Err(GatewayError::Rejected {
                status: 400,
                message: format!("payment intent is {}", intent.status),
            });
        }
        self.captures.fetch_add(1, Ordering::SeqCst);
        intent.status = IntentStatus::Succeeded;
        Ok(intent.clone())
    }

    async fn create_connected_account(&self, _email: Option<&str>) -> Result<String, GatewayError> {
        let n = self.accounts.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("acct_{n}"))
    }

    async fn create_onboarding_link(
        &self,
        account_id: &str,
        _refresh_url: &str,
        _return_url: &str,
    ) -> Result<String, GatewayError> {
        Ok(format!("https://connect.test/setup/{account_id}"))
    }
}

/// Every service over one shared store, gateway and lock table.
pub struct Marketplace {
    pub store: Arc<InMemoryStore>,
    pub gateway: Arc<FakeGateway>,
    pub profiles: ProfileService,
    pub skills: SkillDirectory,
    pub projects: ProjectService,
    pub bids: BidService,
    pub escrow: EscrowService,
    pub matching: MatchingEngine,
}

impl Marketplace {
    pub fn new() -> Self {
        let store = Arc::new(InMemoryStore::new());
        let gateway = Arc::new(FakeGateway::default());
        let locks = Arc::new(ProjectLocks::new());

        let dyn_store: Arc<dyn MarketplaceStore> = store.clone();
        let dyn_gateway: Arc<dyn PaymentGateway> = gateway.clone();

        Self {
            profiles: ProfileService::new(
                dyn_store.clone(),
                dyn_gateway.clone(),
                OnboardingUrls {
                    refresh_url: "https://app.test/onboard/refresh".into(),
                    return_url: "https://app.test/onboard/done".into(),
                },
            ),
            skills: SkillDirectory::new(dyn_store.clone()),
            projects: ProjectService::new(dyn_store.clone(), locks.clone()),
            bids: BidService::new(dyn_store.clone(), locks.clone()),
            escrow: EscrowService::new(
                dyn_store.clone(),
                dyn_gateway,
                locks,
                FeePolicy::default(),
                "usd",
            ),
            matching: MatchingEngine::new(dyn_store),
            store,
            gateway,
        }
    }

    pub async fn client(&self, username: &str) -> Principal {
        let req: RegisterRequest = serde_json::from_value(json!({
            "username": username,
            "name": username,
            "role": "CLIENT",
            "email": format!("{username}@example.com"),
        }))
        .unwrap();
        self.profiles
            .register(uuid::Uuid::new_v4(), req)
            .await
            .unwrap()
    }

    pub async fn freelancer(&self, username: &str, skills: &[&str]) -> Principal {
        self.freelancer_with(username, json!({ "skills": skills })).await
    }

    /// Register a freelancer; `extra` is merged into the request body.
    pub async fn freelancer_with(&self, username: &str, extra: serde_json::Value) -> Principal {
        let mut body = json!({
            "username": username,
            "name": username,
            "role": "FREELANCER",
        });
        if let (Some(body), Some(extra)) = (body.as_object_mut(), extra.as_object()) {
            for (k, v) in extra {
                body.insert(k.clone(), v.clone());
            }
        }
        let req: RegisterRequest = serde_json::from_value(body).unwrap();
        self.profiles
            .register(uuid::Uuid::new_v4(), req)
            .await
            .unwrap()
    }

    /// Connect a payout account and return the refreshed principal.
    pub async fn onboarded(&self, freelancer: &Principal) -> Principal {
        self.profiles.onboard_payments(freelancer).await.unwrap();
        self.profiles.get(freelancer.id).await.unwrap()
    }

    pub async fn project(&self, client: &Principal, budget_cents: i64, required: &str) -> Project {
        let req = CreateProjectRequest {
            title: "Storefront rebuild".into(),
            description: "Rebuild the shop frontend".into(),
            category: None,
            required_skills: Some(required.into()),
            budget: dollars(budget_cents),
        };
        self.projects.create(client, req).await.unwrap()
    }

    pub async fn bid(&self, freelancer: &Principal, project: &Project, amount_cents: i64) -> Bid {
        let req = CreateBidRequest {
            amount: dollars(amount_cents),
            proposal: format!("{} can do it", freelancer.username),
        };
        self.bids
            .submit_bid(project.id, freelancer, req)
            .await
            .unwrap()
    }

    /// A project with an accepted bid from an onboarded freelancer.
    pub async fn assigned_project(&self, budget_cents: i64) -> (Principal, Principal, Project) {
        let client = self.client("owner").await;
        let freelancer = self.freelancer("worker", &["react"]).await;
        let freelancer = self.onboarded(&freelancer).await;
        let project = self.project(&client, budget_cents, "react").await;
        let bid = self.bid(&freelancer, &project, budget_cents).await;
        let accepted = self.bids.accept_bid(bid.id, &client).await.unwrap();
        (client, freelancer, accepted.project)
    }

    pub async fn project_now(&self, id: uuid::Uuid) -> Project {
        self.store.get_project(id).await.unwrap().unwrap()
    }
}

pub fn dollars(cents: i64) -> Decimal {
    Decimal::new(cents, 2)
}

pub fn money(cents: i64) -> Money {
    Money::from_cents(cents)
}
