use axum::{http::HeaderValue, Router};
use std::sync::Arc;
use tower_http::{
    cors::{AllowHeaders, AllowMethods, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::auth::TokenVerifier;
use crate::config::Settings;
use crate::middleware::{request_id_layer, X_REQUEST_ID};
use crate::routes;
use crate::services::{
    BidService, EscrowService, MatchingEngine, OnboardingUrls, PaymentGateway, ProfileService,
    ProjectLocks, ProjectService, SkillDirectory,
};
use crate::store::MarketplaceStore;

/// Shared application state
pub struct AppState {
    pub settings: Settings,
    pub verifier: TokenVerifier,
    pub store: Arc<dyn MarketplaceStore>,
    pub profiles: ProfileService,
    pub skills: SkillDirectory,
    pub projects: ProjectService,
    pub bids: BidService,
    pub escrow: EscrowService,
    pub matching: MatchingEngine,
}

impl AppState {
    pub fn new(
        settings: Settings,
        store: Arc<dyn MarketplaceStore>,
        payments: Arc<dyn PaymentGateway>,
    ) -> Arc<Self> {
        let verifier = TokenVerifier::new(
            &settings.jwt_secret,
            settings.jwt_issuer.as_deref(),
            settings.jwt_audience.as_deref(),
        );

        // One lock table shared by every service that mutates a project
        let locks = Arc::new(ProjectLocks::new());

        let onboarding = OnboardingUrls {
            refresh_url: settings.onboarding_refresh_url.clone(),
            return_url: settings.onboarding_return_url.clone(),
        };

        Arc::new(Self {
            verifier,
            profiles: ProfileService::new(store.clone(), payments.clone(), onboarding),
            skills: SkillDirectory::new(store.clone()),
            projects: ProjectService::new(store.clone(), locks.clone()),
            bids: BidService::new(store.clone(), locks.clone()),
            escrow: EscrowService::new(
                store.clone(),
                payments,
                locks,
                settings.platform_fee,
                settings.payment_currency.clone(),
            ),
            matching: MatchingEngine::new(store.clone()),
            store,
            settings,
        })
    }
}

/// Build the complete application with all middleware
pub fn create_app(state: Arc<AppState>) -> Router {
    let cors = build_cors_layer(&state.settings);

    // DEBUG spans keep request logging quiet at INFO
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::DEBUG))
        .on_request(DefaultOnRequest::new().level(Level::DEBUG))
        .on_response(DefaultOnResponse::new().level(Level::DEBUG));

    let (set_request_id, propagate_request_id) = request_id_layer();

    // Routes at root level, no /api prefix
    Router::new()
        .merge(routes::api_router())
        // Middleware stack (applied bottom-up)
        .layer(propagate_request_id)
        .layer(trace_layer)
        .layer(set_request_id)
        .layer(cors)
        .with_state(state)
}

fn build_cors_layer(settings: &Settings) -> CorsLayer {
    let origins: Vec<HeaderValue> = settings
        .cors_allow_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    let max_age = if settings.env.is_dev() {
        std::time::Duration::from_secs(86400)
    } else {
        std::time::Duration::from_secs(3600)
    };

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(AllowMethods::list([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::PATCH,
            axum::http::Method::OPTIONS,
        ]))
        .allow_headers(AllowHeaders::list([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
            axum::http::header::ACCEPT,
            axum::http::HeaderName::from_static(X_REQUEST_ID),
        ]))
        .allow_credentials(true)
        .max_age(max_age)
}
