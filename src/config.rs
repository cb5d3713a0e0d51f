use anyhow::{bail, Context, Result};
use std::env;

use crate::domain::FeePolicy;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Dev,
    Staging,
    Prod,
}

impl Environment {
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "prod" | "production" => Self::Prod,
            "staging" => Self::Staging,
            _ => Self::Dev,
        }
    }

    pub fn is_dev(&self) -> bool {
        matches!(self, Self::Dev)
    }

    pub fn is_prod(&self) -> bool {
        matches!(self, Self::Prod)
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub env: Environment,
    pub server_addr: String,

    // Database
    pub database_url: String,
    pub database_max_connections: u32,
    pub database_connect_timeout_seconds: u64,

    // CORS
    pub cors_allow_origins: Vec<String>,

    // Auth
    pub jwt_secret: String,
    pub jwt_issuer: Option<String>,
    pub jwt_audience: Option<String>,

    // Payment processor
    pub stripe_secret_key: String,
    pub stripe_api_base: String,
    pub stripe_timeout_seconds: u64,
    pub payment_currency: String,
    pub platform_fee: FeePolicy,
    pub onboarding_refresh_url: String,
    pub onboarding_return_url: String,
}

fn parsed_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

fn optional(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Platform fee in basis points. Unlike the other knobs, a bad value is a
/// startup error instead of a silent default.
fn platform_fee() -> Result<FeePolicy> {
    match optional("PLATFORM_FEE_BPS") {
        None => Ok(FeePolicy::default()),
        Some(raw) => {
            let bps: u32 = raw
                .parse()
                .with_context(|| format!("PLATFORM_FEE_BPS must be an integer, got '{raw}'"))?;
            match FeePolicy::from_bps(bps) {
                Ok(policy) => Ok(policy),
                Err(e) => bail!("PLATFORM_FEE_BPS: {e}"),
            }
        }
    }
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        let env = Environment::from_str(&env::var("ENV").unwrap_or_else(|_| "dev".to_string()));
        let server_addr = env::var("SERVER_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

        // Database
        let database_url = env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let database_max_connections = parsed_or("DATABASE_MAX_CONNECTIONS", 10);
        let database_connect_timeout_seconds = parsed_or("DATABASE_CONNECT_TIMEOUT_SECONDS", 30);

        // CORS
        let cors_allow_origins = env::var("CORS_ALLOW_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:3000".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        // Auth
        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET must be set")?;
        let jwt_issuer = optional("JWT_ISSUER");
        let jwt_audience = optional("JWT_AUDIENCE");

        // Payment processor
        let stripe_secret_key =
            env::var("STRIPE_SECRET_KEY").context("STRIPE_SECRET_KEY must be set")?;
        let stripe_api_base =
            env::var("STRIPE_API_BASE").unwrap_or_else(|_| "https://api.stripe.com".to_string());
        let stripe_timeout_seconds = parsed_or("STRIPE_TIMEOUT_SECONDS", 30);
        let payment_currency = optional("PAYMENT_CURRENCY")
            .unwrap_or_else(|| "usd".to_string())
            .to_lowercase();
        let platform_fee = platform_fee()?;
        let onboarding_refresh_url = optional("ONBOARDING_REFRESH_URL")
            .unwrap_or_else(|| "http://localhost:3000/payments/onboard/refresh".to_string());
        let onboarding_return_url = optional("ONBOARDING_RETURN_URL")
            .unwrap_or_else(|| "http://localhost:3000/payments/onboard/complete".to_string());

        Ok(Settings {
            env,
            server_addr,
            database_url,
            database_max_connections,
            database_connect_timeout_seconds,
            cors_allow_origins,
            jwt_secret,
            jwt_issuer,
            jwt_audience,
            stripe_secret_key,
            stripe_api_base,
            stripe_timeout_seconds,
            payment_currency,
            platform_fee,
            onboarding_refresh_url,
            onboarding_return_url,
        })
    }
}
