//! HTTP boundary for the contract lifecycle service.
//!
//! The router is exposed as a library function so integration tests can
//! drive the exact production surface against in-memory collaborators.

pub mod audit;
pub mod auth;
mod contracts;
mod error;
mod health;
mod payments;
pub mod state;
mod templates;

pub use audit::AuditSink;
pub use state::AppState;

use axum::routing::{get, post};
use axum::Router;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(health::healthz))
        .route(
            "/templates",
            get(templates::list_templates).post(templates::create_template),
        )
        .route(
            "/contracts",
            get(contracts::list_contracts).post(contracts::create_contract),
        )
        .route("/contracts/{contract_id}", get(contracts::get_contract))
        .route(
            "/contracts/{contract_id}/send-link",
            post(contracts::send_link),
        )
        .route("/contracts/{contract_id}/void", post(contracts::void_contract))
        .route("/public/contracts/{token}", get(contracts::public_view))
        .route(
            "/public/contracts/{token}/otp/request",
            post(contracts::request_otp),
        )
        .route(
            "/public/contracts/{token}/otp/verify",
            post(contracts::verify_otp),
        )
        .route(
            "/payments/invoices/{invoice_id}/intents",
            post(payments::create_intent),
        )
        .route("/payments/{payment_id}", get(payments::get_payment))
        .route(
            "/payments/webhooks/{provider}",
            post(payments::handle_webhook),
        )
        .with_state(state)
}
