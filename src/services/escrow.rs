//! Escrow orchestration: fund a project with a manual-capture payment
//! intent, then capture it to release the money and complete the project.
//!
//! The project's payment-intent handle is the idempotency anchor. Funding
//! with a handle present is a read; release always asks the processor for
//! the current remote state before capturing, which also repairs a project
//! whose capture succeeded remotely but whose completion was never written.

use std::sync::Arc;
use uuid::Uuid;

use super::locks::ProjectLocks;
use super::payments::PaymentGateway;
use crate::domain::{
    FeePolicy, FundResponse, IntentStatus, NewPaymentIntent, Principal, Project, ProjectStatus,
    ReleaseResponse, StateError,
};
use crate::error::{ApiError, ApiResult};
use crate::store::MarketplaceStore;

pub struct EscrowService {
    store: Arc<dyn MarketplaceStore>,
    payments: Arc<dyn PaymentGateway>,
    locks: Arc<ProjectLocks>,
    fees: FeePolicy,
    currency: String,
}

fn idempotency_key(project_id: Uuid) -> String {
    format!("fund-{project_id}")
}

impl EscrowService {
    pub fn new(
        store: Arc<dyn MarketplaceStore>,
        payments: Arc<dyn PaymentGateway>,
        locks: Arc<ProjectLocks>,
        fees: FeePolicy,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            store,
            payments,
            locks,
            fees,
            currency: currency.into(),
        }
    }

    async fn owned_project(&self, project_id: Uuid, actor: &Principal) -> ApiResult<Project> {
        let project = self
            .store
            .get_project(project_id)
            .await?
            .ok_or_else(|| ApiError::not_found("project not found"))?;

        if !project.is_owned_by(actor.id) {
            return Err(ApiError::forbidden(
                "only the project owner can manage its payment",
            ));
        }
        Ok(project)
    }

    /// Hold the project budget in escrow. Returns the client secret used by
    /// the payer to confirm the charge.
    pub async fn fund(&self, project_id: Uuid, actor: &Principal) -> ApiResult<FundResponse> {
        let _guard = self.locks.acquire(project_id).await;

        let project = self.owned_project(project_id, actor).await?;
        project.ensure_in_progress()?;

        let freelancer_id = project
            .freelancer_id
            .ok_or(StateError::NotInProgress)?;
        let destination = self
            .store
            .get_principal(freelancer_id)
            .await?
            .and_then(|f| f.payment_account().map(str::to_string))
            .ok_or_else(|| ApiError::conflict("freelancer not onboarded"))?;

        if let Some(handle) = project.payment_intent_id.as_deref() {
            // Never create a second intent when the first cannot be read.
            let intent = self.payments.retrieve_intent(handle).await.map_err(|e| {
                ApiError::conflict(format!(
                    "project is already funded but its payment could not be retrieved: {e}"
                ))
            })?;
            let client_secret = intent
                .client_secret
                .ok_or_else(|| ApiError::external("payment intent has no client secret"))?;

            tracing::info!(
                project_id = %project_id,
                principal_id = %actor.id,
                payment_intent_id = %intent.id,
                "Returning existing escrow payment"
            );

            return Ok(FundResponse {
                project_id,
                payment_intent_id: intent.id,
                client_secret,
                amount: intent.amount,
                platform_fee: self.fees.fee_for(intent.amount),
                currency: intent.currency,
                existing: true,
            });
        }

        let amount = project.budget;
        let platform_fee = self.fees.fee_for(amount);
        let params = NewPaymentIntent {
            amount,
            currency: self.currency.clone(),
            destination_account: destination,
            application_fee: platform_fee,
            metadata: vec![
                ("project_id".into(), project_id.to_string()),
                ("client_id".into(), project.client_id.to_string()),
                ("freelancer_id".into(), freelancer_id.to_string()),
            ],
            idempotency_key: idempotency_key(project_id),
        };

        let intent = self.payments.create_intent(&params).await?;
        let client_secret = intent
            .client_secret
            .clone()
            .ok_or_else(|| ApiError::external("payment intent has no client secret"))?;

        self.store
            .attach_payment_intent(project_id, &intent.id)
            .await?;

        tracing::info!(
            project_id = %project_id,
            principal_id = %actor.id,
            payment_intent_id = %intent.id,
            amount_cents = amount.cents(),
            fee_cents = platform_fee.cents(),
            "Project funded"
        );

        Ok(FundResponse {
            project_id,
            payment_intent_id: intent.id,
            client_secret,
            amount,
            platform_fee,
            currency: self.currency.clone(),
            existing: false,
        })
    }

    /// Capture the escrowed payment and complete the project.
    pub async fn release(&self, project_id: Uuid, actor: &Principal) -> ApiResult<ReleaseResponse> {
        let _guard = self.locks.acquire(project_id).await;

        let project = self.owned_project(project_id, actor).await?;
        if project.status == ProjectStatus::Open {
            return Err(StateError::NotInProgress.into());
        }
        let handle = project
            .payment_intent_id
            .clone()
            .ok_or(StateError::NotFunded)?;

        let intent = self.payments.retrieve_intent(&handle).await?;

        match intent.status {
            IntentStatus::Succeeded => {
                let project = self.store.complete_project(project_id).await?;
                tracing::info!(
                    project_id = %project_id,
                    principal_id = %actor.id,
                    payment_intent_id = %handle,
                    "Payment already captured, project completed"
                );
                return Ok(ReleaseResponse {
                    project_id,
                    status: project.status,
                    payment_intent_id: handle,
                    already_released: true,
                    message: "payment already released".into(),
                });
            }
            IntentStatus::RequiresCapture if project.status == ProjectStatus::InProgress => {}
            other => {
                return Err(ApiError::conflict(format!(
                    "payment cannot be released while it is {other}"
                )));
            }
        }

        let captured = self.payments.capture_intent(&handle).await?;
        if captured.status != IntentStatus::Succeeded {
            return Err(ApiError::conflict(format!(
                "capture did not complete, payment is {}",
                captured.status
            )));
        }

        let project = self.store.complete_project(project_id).await?;

        tracing::info!(
            project_id = %project_id,
            principal_id = %actor.id,
            payment_intent_id = %handle,
            amount_cents = captured.amount.cents(),
            "Payment released"
        );

        Ok(ReleaseResponse {
            project_id,
            status: project.status,
            payment_intent_id: handle,
            already_released: false,
            message: "payment released to freelancer".into(),
        })
    }
}
