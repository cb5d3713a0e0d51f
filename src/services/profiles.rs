//! Principal registration, profile edits and payment onboarding.

use std::sync::Arc;
use uuid::Uuid;

use super::payments::PaymentGateway;
use crate::domain::{Principal, RegisterRequest, Role, RoleProfile, Skill, UpdateProfileRequest};
use crate::error::{ApiError, ApiResult};
use crate::store::MarketplaceStore;

/// Where the processor sends a freelancer during and after onboarding.
#[derive(Debug, Clone)]
pub struct OnboardingUrls {
    pub refresh_url: String,
    pub return_url: String,
}

pub struct ProfileService {
    store: Arc<dyn MarketplaceStore>,
    payments: Arc<dyn PaymentGateway>,
    onboarding: OnboardingUrls,
}

fn set_skills(principal: &mut Principal, skills: Vec<Skill>) {
    if let RoleProfile::Freelancer(f) = &mut principal.profile {
        f.skills = skills;
    }
}

impl ProfileService {
    pub fn new(
        store: Arc<dyn MarketplaceStore>,
        payments: Arc<dyn PaymentGateway>,
        onboarding: OnboardingUrls,
    ) -> Self {
        Self {
            store,
            payments,
            onboarding,
        }
    }

    /// Register the authenticated identity `id` as a principal.
    pub async fn register(&self, id: Uuid, req: RegisterRequest) -> ApiResult<Principal> {
        let names = req.skill_names()?;
        let mut principal = Principal::register(id, req, Vec::new())?;

        // Duplicates are rejected before any skill is created.
        self.store.insert_principal(&principal).await?;

        // Only reached for freelancers: clients sending skills fail above.
        if !names.is_empty() {
            let skills = self.store.ensure_skills(&names).await?;
            set_skills(&mut principal, skills);
            self.store.update_principal(&principal).await?;
        }

        tracing::info!(
            principal_id = %principal.id,
            role = %principal.role(),
            "Principal registered"
        );
        Ok(principal)
    }

    pub async fn update(&self, mut actor: Principal, req: UpdateProfileRequest) -> ApiResult<Principal> {
        let names = req.skill_names()?;
        actor.apply_update(req, None)?;

        if let Some(names) = names {
            let skills = self.store.ensure_skills(&names).await?;
            set_skills(&mut actor, skills);
        }

        self.store.update_principal(&actor).await?;

        tracing::info!(principal_id = %actor.id, "Profile updated");
        Ok(actor)
    }

    pub async fn get(&self, id: Uuid) -> ApiResult<Principal> {
        self.store
            .get_principal(id)
            .await?
            .ok_or_else(|| ApiError::not_found("profile not found"))
    }

    /// Make sure the freelancer has a connected account and return a fresh
    /// onboarding link for it.
    pub async fn onboard_payments(&self, actor: &Principal) -> ApiResult<String> {
        if actor.role() != Role::Freelancer {
            return Err(ApiError::forbidden(
                "only freelancers can onboard for payouts",
            ));
        }

        let account = match actor.payment_account() {
            Some(account) => account.to_string(),
            None => {
                let created = self
                    .payments
                    .create_connected_account(actor.email.as_deref())
                    .await?;
                // A concurrent onboarding may have stored its account first.
                let stored = self.store.set_payment_account(actor.id, &created).await?;
                tracing::info!(
                    principal_id = %actor.id,
                    payment_account = %stored,
                    "Connected account created"
                );
                stored
            }
        };

        let url = self
            .payments
            .create_onboarding_link(
                &account,
                &self.onboarding.refresh_url,
                &self.onboarding.return_url,
            )
            .await?;
        Ok(url)
    }
}
