//! Shared harness: the production router wired to the in-memory store and
//! cache, plus request helpers and the webhook signing helper.
#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use chrono::Utc;
use hmac::{Hmac, Mac};
use http_body_util::BodyExt;
use pactum_api::{build_router, AppState, AuditSink};
use pactum_core::{Business, Store};
use pactum_platform::{Cache, DomainSettings, MemCache};
use pactum_providers::ProviderRegistry;
use pactum_store::MemStore;
use serde_json::Value;
use sha2::Sha256;
use tower::ServiceExt;
use uuid::Uuid;

pub const CLICK_SECRET: &str = "click_secret_test";
pub const PAYME_SECRET: &str = "payme_secret_test";
pub const OTP_SECRET: &str = "otp_secret_test";
pub const LINK_BASE: &str = "http://localhost:8080/public/contracts";

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemStore>,
    pub cache: Arc<MemCache>,
    pub business_id: Uuid,
    pub user_id: Uuid,
    pub signed_documents_dir: PathBuf,
}

pub async fn spawn_app() -> TestApp {
    let store = Arc::new(MemStore::new());
    let cache = Arc::new(MemCache::default());
    let business_id = Uuid::new_v4();
    let user_id = Uuid::new_v4();

    store
        .seed_business(Business {
            id: business_id,
            name: "Acme Studio".to_string(),
            slug: "acme-studio".to_string(),
            created_at: Utc::now(),
        })
        .await;

    let signed_documents_dir =
        std::env::temp_dir().join(format!("pactum-test-{}", Uuid::new_v4()));
    let settings = DomainSettings {
        public_link_base_url: LINK_BASE.to_string(),
        public_link_ttl_seconds: 120,
        otp_ttl_seconds: 300,
        otp_hash_secret: OTP_SECRET.to_string(),
        click_webhook_secret: CLICK_SECRET.to_string(),
        payme_webhook_secret: PAYME_SECRET.to_string(),
        signed_documents_dir: signed_documents_dir.clone(),
    };

    let store_dyn: Arc<dyn Store> = store.clone();
    let cache_dyn: Arc<dyn Cache> = cache.clone();
    let state = AppState {
        store: store_dyn.clone(),
        cache: cache_dyn,
        providers: ProviderRegistry::new(CLICK_SECRET, PAYME_SECRET),
        settings: Arc::new(settings),
        audit: AuditSink::new(store_dyn),
    };

    TestApp {
        router: build_router(state),
        store,
        cache,
        business_id,
        user_id,
        signed_documents_dir,
    }
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router should handle the request");
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("response body should be readable")
            .to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        (status, body)
    }

    pub async fn authed_post(&self, path: &str, body: Value) -> (StatusCode, Value) {
        self.authed_post_as(self.business_id, self.user_id, path, body)
            .await
    }

    pub async fn authed_post_as(
        &self,
        business_id: Uuid,
        user_id: Uuid,
        path: &str,
        body: Value,
    ) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header(header::CONTENT_TYPE, "application/json")
            .header("x-business-id", business_id.to_string())
            .header("x-user-id", user_id.to_string())
            .header("x-role", "owner")
            .header("x-forwarded-for", "203.0.113.7")
            .body(Body::from(body.to_string()))
            .expect("request should build");
        self.send(request).await
    }

    pub async fn authed_get(&self, path: &str) -> (StatusCode, Value) {
        self.authed_get_as(self.business_id, self.user_id, path).await
    }

    pub async fn authed_get_as(
        &self,
        business_id: Uuid,
        user_id: Uuid,
        path: &str,
    ) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("GET")
            .uri(path)
            .header("x-business-id", business_id.to_string())
            .header("x-user-id", user_id.to_string())
            .header("x-role", "owner")
            .body(Body::empty())
            .expect("request should build");
        self.send(request).await
    }

    pub async fn anon_get(&self, path: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("GET")
            .uri(path)
            .header("x-forwarded-for", "198.51.100.4")
            .body(Body::empty())
            .expect("request should build");
        self.send(request).await
    }

    pub async fn anon_post(&self, path: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header(header::CONTENT_TYPE, "application/json")
            .header("x-forwarded-for", "198.51.100.4")
            .body(Body::from(body.to_string()))
            .expect("request should build");
        self.send(request).await
    }

    pub async fn webhook_post(
        &self,
        provider: &str,
        signature: Option<&str>,
        body: &Value,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method("POST")
            .uri(format!("/payments/webhooks/{provider}"))
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(signature) = signature {
            builder = builder.header("x-webhook-signature", signature);
        }
        let request = builder
            .body(Body::from(body.to_string()))
            .expect("request should build");
        self.send(request).await
    }
}

pub fn webhook_signature(
    secret: &str,
    provider_payment_id: &str,
    status: &str,
    amount_cents: i64,
) -> String {
    type HmacSha256 = Hmac<Sha256>;

    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(format!("{provider_payment_id}|{status}|{amount_cents}").as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Drives template -> contract creation and returns the contract view.
pub async fn create_contract(app: &TestApp, amount_cents: i64, currency: &str) -> Value {
    let (status, template) = app
        .authed_post(
            "/templates",
            serde_json::json!({
                "name": "Service agreement",
                "body": "{{business_name}} agrees to provide services to {{client_name}} for {{amount}} {{currency}}.",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "template creation should succeed");

    let (status, contract) = app
        .authed_post(
            "/contracts",
            serde_json::json!({
                "templateId": template["id"],
                "title": "Design retainer",
                "clientName": "Dana Quinn",
                "clientEmail": "Dana.Quinn@Example.com",
                "clientPhone": "+15550001111",
                "amountCents": amount_cents,
                "currency": currency,
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "contract creation should succeed");
    contract
}

/// Full happy path up to SIGNED; returns (contract view, public token).
pub async fn signed_contract(app: &TestApp) -> (Value, String) {
    let contract = create_contract(app, 150_000, "USD").await;
    let contract_id = contract["id"].as_str().expect("contract id").to_string();
    let token = contract["publicToken"]
        .as_str()
        .expect("public token")
        .to_string();

    let (status, _) = app
        .authed_post(&format!("/contracts/{contract_id}/send-link"), serde_json::json!({}))
        .await;
    assert_eq!(status, StatusCode::OK, "send-link should succeed");

    let (status, otp) = app
        .anon_post(
            &format!("/public/contracts/{token}/otp/request"),
            serde_json::json!({ "phone": "+15550002222" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "OTP request should succeed");
    let code = otp["mockOtpCode"].as_str().expect("mock otp code").to_string();

    let (status, _) = app
        .anon_post(
            &format!("/public/contracts/{token}/otp/verify"),
            serde_json::json!({ "code": code, "signerName": "Dana Quinn" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "OTP verification should sign the contract");

    let (status, signed) = app.authed_get(&format!("/contracts/{contract_id}")).await;
    assert_eq!(status, StatusCode::OK, "contract fetch should succeed");
    (signed, token)
}

/// Signed contract plus a payment intent; returns (invoice id, payment view).
pub async fn intent_for_signed_contract(app: &TestApp, provider: Option<&str>) -> (String, Value) {
    let (signed, _) = signed_contract(app).await;
    let invoice_id = signed["invoice"]["id"]
        .as_str()
        .expect("invoice id")
        .to_string();

    let body = match provider {
        Some(provider) => serde_json::json!({ "provider": provider }),
        None => serde_json::json!({}),
    };
    let (status, payment) = app
        .authed_post(&format!("/payments/invoices/{invoice_id}/intents"), body)
        .await;
    assert_eq!(status, StatusCode::CREATED, "intent creation should succeed");
    (invoice_id, payment)
}
