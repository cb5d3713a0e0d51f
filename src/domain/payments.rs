//! Escrow and payment-processor types
//!
//! The processor owns payment intents; a project only stores the handle.

use serde::Serialize;
use std::fmt;
use uuid::Uuid;

use super::money::BPS_DENOMINATOR;
use super::{Money, ProjectStatus, ValidationError};

/// Remote status of a payment intent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntentStatus {
    RequiresPaymentMethod,
    RequiresConfirmation,
    RequiresAction,
    Processing,
    RequiresCapture,
    Canceled,
    Succeeded,
    Other(String),
}

impl IntentStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::RequiresPaymentMethod => "requires_payment_method",
            Self::RequiresConfirmation => "requires_confirmation",
            Self::RequiresAction => "requires_action",
            Self::Processing => "processing",
            Self::RequiresCapture => "requires_capture",
            Self::Canceled => "canceled",
            Self::Succeeded => "succeeded",
            Self::Other(s) => s,
        }
    }
}

impl From<&str> for IntentStatus {
    fn from(s: &str) -> Self {
        match s {
            "requires_payment_method" => Self::RequiresPaymentMethod,
            "requires_confirmation" => Self::RequiresConfirmation,
            "requires_action" => Self::RequiresAction,
            "processing" => Self::Processing,
            "requires_capture" => Self::RequiresCapture,
            "canceled" => Self::Canceled,
            "succeeded" => Self::Succeeded,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for IntentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A payment intent as last reported by the processor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentIntent {
    pub id: String,
    pub status: IntentStatus,
    pub client_secret: Option<String>,
    pub amount: Money,
    pub currency: String,
}

/// Parameters for creating an escrow intent (manual capture).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPaymentIntent {
    pub amount: Money,
    pub currency: String,
    pub destination_account: String,
    pub application_fee: Money,
    pub metadata: Vec<(String, String)>,
    /// Sent as the processor idempotency key so a repeated create for the
    /// same project yields the same remote intent.
    pub idempotency_key: String,
}

/// Platform fee as integer basis points, rounded down in minor units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeePolicy {
    bps: u32,
}

impl FeePolicy {
    pub fn from_bps(bps: u32) -> Result<Self, ValidationError> {
        if i64::from(bps) > BPS_DENOMINATOR {
            return Err(ValidationError::new(format!(
                "platform fee of {bps} bps exceeds 100%"
            )));
        }
        Ok(Self { bps })
    }

    pub fn bps(&self) -> u32 {
        self.bps
    }

    pub fn fee_for(&self, amount: Money) -> Money {
        amount.share_floor(self.bps)
    }
}

impl Default for FeePolicy {
    /// 10%
    fn default() -> Self {
        Self { bps: 1_000 }
    }
}

/// Response DTO for funding a project
#[derive(Debug, Clone, Serialize)]
pub struct FundResponse {
    pub project_id: Uuid,
    pub payment_intent_id: String,
    pub client_secret: String,
    pub amount: Money,
    pub platform_fee: Money,
    pub currency: String,
    /// `true` when an existing intent was returned instead of creating one.
    pub existing: bool,
}

/// Response DTO for releasing escrowed funds
#[derive(Debug, Clone, Serialize)]
pub struct ReleaseResponse {
    pub project_id: Uuid,
    pub status: ProjectStatus,
    pub payment_intent_id: String,
    /// `true` when the processor already reported the payment as captured.
    pub already_released: bool,
    pub message: String,
}

/// Response DTO for processor onboarding
#[derive(Debug, Clone, Serialize)]
pub struct OnboardingResponse {
    pub url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fee_policy_floors_and_caps() {
        let policy = FeePolicy::default();
        assert_eq!(policy.fee_for(Money::from_cents(9_000)), Money::from_cents(900));
        assert_eq!(policy.fee_for(Money::from_cents(12_345)), Money::from_cents(1_234));
        assert!(FeePolicy::from_bps(10_001).is_err());
        assert_eq!(FeePolicy::from_bps(0).unwrap().fee_for(Money::from_cents(500)), Money::ZERO);
    }

    #[test]
    fn unknown_statuses_round_trip() {
        let status = IntentStatus::from("partially_funded");
        assert_eq!(status, IntentStatus::Other("partially_funded".into()));
        assert_eq!(status.to_string(), "partially_funded");
        assert_eq!(IntentStatus::from("requires_capture"), IntentStatus::RequiresCapture);
    }
}
