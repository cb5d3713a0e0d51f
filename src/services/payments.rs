//! Payment processor client (Stripe Connect).
//!
//! Escrow is a manual-capture payment intent whose transfer goes to the
//! freelancer's connected account minus the platform's application fee.
//! Everything behind [`PaymentGateway`] so the services can be exercised
//! without the network.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::{de::DeserializeOwned, Deserialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, instrument};
use url::Url;

use crate::domain::{IntentStatus, Money, NewPaymentIntent, PaymentIntent};

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("payment processor unreachable: {0}")]
    Transport(String),

    #[error("payment processor rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("invalid payment processor response: {0}")]
    InvalidResponse(String),
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create a manual-capture intent. Retried creates carrying the same
    /// idempotency key return the same intent.
    async fn create_intent(&self, params: &NewPaymentIntent) -> Result<PaymentIntent, GatewayError>;

    async fn retrieve_intent(&self, intent_id: &str) -> Result<PaymentIntent, GatewayError>;

    async fn capture_intent(&self, intent_id: &str) -> Result<PaymentIntent, GatewayError>;

    /// Create a connected account able to receive transfers. Returns its id.
    async fn create_connected_account(&self, email: Option<&str>) -> Result<String, GatewayError>;

    /// Hosted onboarding link for a connected account.
    async fn create_onboarding_link(
        &self,
        account_id: &str,
        refresh_url: &str,
        return_url: &str,
    ) -> Result<String, GatewayError>;
}

/// Stripe REST client
#[derive(Clone)]
pub struct StripeClient {
    client: Client,
    base_url: Url,
    secret_key: String,
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    error: StripeErrorDetail,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetail {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    code: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IntentBody {
    id: String,
    status: String,
    #[serde(default)]
    client_secret: Option<String>,
    amount: i64,
    currency: String,
}

impl From<IntentBody> for PaymentIntent {
    fn from(body: IntentBody) -> Self {
        Self {
            id: body.id,
            status: IntentStatus::from(body.status.as_str()),
            client_secret: body.client_secret,
            amount: Money::from_cents(body.amount),
            currency: body.currency,
        }
    }
}

#[derive(Debug, Deserialize)]
struct AccountBody {
    id: String,
}

#[derive(Debug, Deserialize)]
struct AccountLinkBody {
    url: String,
}

impl StripeClient {
    pub fn new(base_url: &str, secret_key: &str, timeout_seconds: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid STRIPE_API_BASE")?;

        tracing::info!(base_url = %base_url, "Payment processor client initialized");

        Ok(Self {
            client,
            base_url,
            secret_key: secret_key.to_string(),
        })
    }

    fn url(&self, path: &str) -> Result<Url, GatewayError> {
        self.base_url
            .join(path)
            .map_err(|e| GatewayError::InvalidResponse(format!("bad endpoint {path}: {e}")))
    }

    fn post(&self, path: &str) -> Result<RequestBuilder, GatewayError> {
        Ok(self
            .client
            .post(self.url(path)?)
            .bearer_auth(&self.secret_key))
    }

    async fn send<R: DeserializeOwned>(&self, req: RequestBuilder) -> Result<R, GatewayError> {
        let response = req.send().await.map_err(|e| {
            error!(error = %e, "Payment processor request failed");
            GatewayError::Transport(e.to_string())
        })?;

        let status = response.status();
        if status.is_success() {
            return response.json::<R>().await.map_err(|e| {
                error!(error = %e, "Failed to parse payment processor response");
                GatewayError::InvalidResponse(e.to_string())
            });
        }

        let detail = response.json::<StripeErrorBody>().await.ok().map(|b| b.error);
        let message = detail
            .as_ref()
            .and_then(|d| d.message.clone().or_else(|| d.code.clone()))
            .unwrap_or_else(|| format!("HTTP {status}"));

        error!(status = %status, message = %message, "Payment processor error");
        Err(GatewayError::Rejected {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl PaymentGateway for StripeClient {
    #[instrument(skip(self, params), fields(amount = params.amount.cents()))]
    async fn create_intent(&self, params: &NewPaymentIntent) -> Result<PaymentIntent, GatewayError> {
        let mut form: Vec<(String, String)> = vec![
            ("amount".into(), params.amount.cents().to_string()),
            ("currency".into(), params.currency.clone()),
            ("capture_method".into(), "manual".into()),
            ("payment_method_types[]".into(), "card".into()),
            (
                "application_fee_amount".into(),
                params.application_fee.cents().to_string(),
            ),
            (
                "transfer_data[destination]".into(),
                params.destination_account.clone(),
            ),
        ];
        for (key, value) in &params.metadata {
            form.push((format!("metadata[{key}]"), value.clone()));
        }

        debug!(idempotency_key = %params.idempotency_key, "Creating payment intent");

        let req = self
            .post("/v1/payment_intents")?
            .header("Idempotency-Key", &params.idempotency_key)
            .form(&form);
        let body: IntentBody = self.send(req).await?;
        Ok(body.into())
    }

    #[instrument(skip(self))]
    async fn retrieve_intent(&self, intent_id: &str) -> Result<PaymentIntent, GatewayError> {
        let req = self
            .client
            .get(self.url(&format!("/v1/payment_intents/{intent_id}"))?)
            .bearer_auth(&self.secret_key);
        let body: IntentBody = self.send(req).await?;
        Ok(body.into())
    }

    #[instrument(skip(self))]
    async fn capture_intent(&self, intent_id: &str) -> Result<PaymentIntent, GatewayError> {
        let req = self.post(&format!("/v1/payment_intents/{intent_id}/capture"))?;
        let body: IntentBody = self.send(req).await?;
        Ok(body.into())
    }

    #[instrument(skip(self, email))]
    async fn create_connected_account(&self, email: Option<&str>) -> Result<String, GatewayError> {
        let mut form: Vec<(&str, &str)> = vec![
            ("type", "express"),
            ("capabilities[transfers][requested]", "true"),
        ];
        if let Some(email) = email {
            form.push(("email", email));
        }

        let req = self.post("/v1/accounts")?.form(&form);
        let body: AccountBody = self.send(req).await?;
        Ok(body.id)
    }

    #[instrument(skip(self, refresh_url, return_url))]
    async fn create_onboarding_link(
        &self,
        account_id: &str,
        refresh_url: &str,
        return_url: &str,
    ) -> Result<String, GatewayError> {
        let form = [
            ("account", account_id),
            ("refresh_url", refresh_url),
            ("return_url", return_url),
            ("type", "account_onboarding"),
        ];

        let req = self.post("/v1/account_links")?.form(&form);
        let body: AccountLinkBody = self.send(req).await?;
        Ok(body.url)
    }
}
