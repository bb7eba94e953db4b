//! HTTP API Layer
//!
//! REST surface over the claim workflow using Axum.
//!
//! # Architecture
//!
//! - **Handlers**: submission, lookup, history, reprocessing, search, health
//! - **Middleware**: request ids, request logging, tracing
//! - **DTOs**: request/response bodies
//! - **Error Handling**: workflow errors mapped to HTTP statuses
//!
//! # Example
//!
//! ```rust,ignore
//! use interface_api::{create_router, AppState};
//!
//! let app = create_router(AppState::new(workflow, store, config));
//! axum::serve(listener, app).await?;
//! ```

pub mod config;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;

use std::sync::Arc;

use axum::{
    http::HeaderName,
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use claims_engine::ClaimWorkflow;
use core_kernel::HealthCheckable;

use crate::config::ApiConfig;
use crate::handlers::{claims, health};
use crate::middleware::{request_log_middleware, REQUEST_ID_HEADER};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub workflow: Arc<ClaimWorkflow>,
    /// Probed by the readiness endpoint
    pub health: Arc<dyn HealthCheckable>,
    pub config: ApiConfig,
}

impl AppState {
    pub fn new(
        workflow: ClaimWorkflow,
        health: Arc<dyn HealthCheckable>,
        config: ApiConfig,
    ) -> Self {
        Self {
            workflow: Arc::new(workflow),
            health,
            config,
        }
    }
}

/// Creates the main API router
pub fn create_router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check));

    let claims_routes = Router::new()
        .route("/", post(claims::submit_claim).get(claims::search_claims))
        .route("/:id", get(claims::get_claim))
        .route("/:id/history", get(claims::claim_history))
        .route("/:id/reprocess", post(claims::reprocess_claim));

    let api_routes = Router::new()
        .nest("/claims", claims_routes)
        .layer(axum_middleware::from_fn(request_log_middleware));

    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);

    Router::new()
        .merge(public_routes)
        .nest("/api/v1", api_routes)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(request_id.clone(), MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::new(request_id)),
        )
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
