use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::Utc;
use pactum_core::{
    AuditRecord, DomainError, DomainResult, InvoiceStatus, PaidEntities, Payment, PaymentProvider,
    PaymentStatus, WebhookOutcome,
};
use pactum_platform::{CreateIntentRequest, PaymentView, WebhookAck, WebhookRequest};
use pactum_providers::WebhookFields;
use serde_json::{json, Map, Value};
use tracing::warn;
use uuid::Uuid;

use crate::auth::{client_ip, AuthContext};
use crate::error::error_response;
use crate::state::AppState;

pub async fn create_intent(
    State(state): State<AppState>,
    auth: AuthContext,
    headers: HeaderMap,
    Path(invoice_id): Path<Uuid>,
    Json(payload): Json<CreateIntentRequest>,
) -> Result<(StatusCode, Json<PaymentView>), (StatusCode, String)> {
    let ip = client_ip(&headers);
    create_intent_inner(&state, &auth, ip, invoice_id, payload)
        .await
        .map(|view| (StatusCode::CREATED, Json(view)))
        .map_err(error_response)
}

pub async fn get_payment(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(payment_id): Path<Uuid>,
) -> Result<Json<PaymentView>, (StatusCode, String)> {
    get_payment_inner(&state, &auth, payment_id)
        .await
        .map(Json)
        .map_err(error_response)
}

pub async fn handle_webhook(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    headers: HeaderMap,
    Json(payload): Json<WebhookRequest>,
) -> Result<Json<WebhookAck>, (StatusCode, String)> {
    let ip = client_ip(&headers);
    handle_webhook_inner(&state, &provider, &headers, ip, payload)
        .await
        .map(Json)
        .map_err(error_response)
}

async fn create_intent_inner(
    state: &AppState,
    auth: &AuthContext,
    ip: String,
    invoice_id: Uuid,
    payload: CreateIntentRequest,
) -> DomainResult<PaymentView> {
    let provider = match payload.provider.as_deref() {
        None => PaymentProvider::MockClick,
        Some(raw) => PaymentProvider::parse(raw)
            .ok_or_else(|| DomainError::bad_request("Unsupported provider"))?,
    };
    let adapter = state
        .providers
        .resolve(provider)
        .ok_or_else(|| DomainError::bad_request("Unsupported provider"))?;

    let invoice = state
        .store
        .get_invoice(auth.business_id, invoice_id)
        .await?
        .ok_or_else(|| DomainError::not_found("Invoice not found"))?;
    if invoice.status == InvoiceStatus::Paid {
        return Err(DomainError::invalid_state("Invoice already paid"));
    }

    // Two-phase: the local row exists first, then the provider reference
    // is attached, so an allocation failure never leaves a dangling ref.
    let now = Utc::now();
    let payment = Payment {
        id: Uuid::new_v4(),
        business_id: auth.business_id,
        invoice_id: invoice.id,
        provider,
        provider_payment_id: None,
        amount_cents: invoice.amount_cents,
        currency: invoice.currency.clone(),
        status: PaymentStatus::Initiated,
        checkout_url: None,
        provider_payload: json!({}),
        paid_at: None,
        webhook_verified_at: None,
        created_at: now,
        updated_at: now,
    };
    state.store.insert_payment(&payment).await?;

    let intent = adapter.create_intent(
        payment.id,
        invoice.amount_cents,
        &invoice.currency,
        &invoice.invoice_number,
    );
    state
        .store
        .attach_provider_intent(
            payment.id,
            &intent.provider_payment_id,
            &intent.checkout_url,
            &intent.payload,
            now,
        )
        .await?;

    state.audit.record(AuditRecord {
        action: "PAYMENT_INTENT_CREATE".to_string(),
        entity_type: "payment".to_string(),
        entity_id: Some(payment.id.to_string()),
        business_id: Some(auth.business_id),
        user_id: Some(auth.user_id),
        ip: Some(ip),
        metadata: json!({
            "provider": provider.as_str(),
            "providerPaymentId": intent.provider_payment_id,
        }),
    });

    let stored = state
        .store
        .get_payment(auth.business_id, payment.id)
        .await?
        .ok_or_else(|| DomainError::not_found("Payment not found"))?;
    Ok(payment_view(stored))
}

async fn get_payment_inner(
    state: &AppState,
    auth: &AuthContext,
    payment_id: Uuid,
) -> DomainResult<PaymentView> {
    let payment = state
        .store
        .get_payment(auth.business_id, payment_id)
        .await?
        .ok_or_else(|| DomainError::not_found("Payment not found"))?;
    Ok(payment_view(payment))
}

async fn handle_webhook_inner(
    state: &AppState,
    provider_raw: &str,
    headers: &HeaderMap,
    ip: String,
    payload: WebhookRequest,
) -> DomainResult<WebhookAck> {
    let provider = PaymentProvider::parse(provider_raw)
        .ok_or_else(|| DomainError::bad_request("Unsupported provider"))?;
    let adapter = state
        .providers
        .resolve(provider)
        .ok_or_else(|| DomainError::bad_request("Unsupported provider"))?;

    // One generic rejection for absent and wrong signatures alike.
    let signature = headers
        .get("x-webhook-signature")
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| DomainError::unauthorized("Invalid webhook signature"))?;
    let fields = WebhookFields {
        provider_payment_id: &payload.provider_payment_id,
        status: &payload.status,
        amount_cents: payload.amount_cents,
    };
    if !adapter.verify_signature(&fields, signature) {
        return Err(DomainError::unauthorized("Invalid webhook signature"));
    }

    // The status string was part of the signed bytes; only now is it parsed.
    let reported_status = PaymentStatus::parse(&payload.status)
        .ok_or_else(|| DomainError::bad_request("Unsupported payment status"))?;

    let payment = state
        .store
        .get_payment_by_provider_ref(provider, &payload.provider_payment_id)
        .await?
        .ok_or_else(|| DomainError::not_found("Payment not found"))?;

    let now = Utc::now();

    // Terminal statuses absorb conflicting later reports; the payload trail
    // below still records what the provider claimed.
    let status = if payment.status.is_terminal() && payment.status != reported_status {
        warn!(
            "payment {} is already {}, keeping it over reported {}",
            payment.id,
            payment.status.as_str(),
            reported_status.as_str()
        );
        payment.status
    } else {
        reported_status
    };

    let mut merged = match payment.provider_payload.clone() {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    merged.insert(
        "webhookStatus".to_string(),
        Value::String(payload.status.clone()),
    );
    merged.insert("amountCents".to_string(), json!(payload.amount_cents));
    if let Some(reference) = &payload.reference {
        merged.insert("reference".to_string(), Value::String(reference.clone()));
    }
    merged.insert("receivedAt".to_string(), Value::String(now.to_rfc3339()));

    let mut paid_at = None;
    let mut mark_paid = None;
    if status == PaymentStatus::Succeeded {
        paid_at = Some(now);
        let invoice = state
            .store
            .get_invoice_by_id(payment.invoice_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Invoice not found"))?;
        if invoice.status == InvoiceStatus::Paid {
            if payment.status != PaymentStatus::Succeeded {
                warn!(
                    "invoice {} is already paid, payment {} succeeded without ledger effect",
                    invoice.id, payment.id
                );
            }
        } else {
            mark_paid = Some(PaidEntities {
                invoice_id: invoice.id,
                contract_id: invoice.contract_id,
            });
        }
    }

    state
        .store
        .apply_webhook_outcome(&WebhookOutcome {
            payment_id: payment.id,
            status,
            merged_payload: Value::Object(merged),
            verified_at: now,
            paid_at,
            mark_paid,
        })
        .await?;

    state.audit.record(AuditRecord {
        action: "PAYMENT_WEBHOOK_PROCESSED".to_string(),
        entity_type: "payment".to_string(),
        entity_id: Some(payment.id.to_string()),
        business_id: Some(payment.business_id),
        user_id: None,
        ip: Some(ip),
        metadata: json!({
            "provider": provider.as_str(),
            "providerPaymentId": payload.provider_payment_id,
            "status": payload.status,
        }),
    });

    Ok(WebhookAck { ok: true })
}

fn payment_view(payment: Payment) -> PaymentView {
    PaymentView {
        id: payment.id,
        invoice_id: payment.invoice_id,
        provider: payment.provider,
        provider_payment_id: payment.provider_payment_id,
        amount_cents: payment.amount_cents,
        currency: payment.currency,
        status: payment.status,
        checkout_url: payment.checkout_url,
        paid_at: payment.paid_at,
        webhook_verified_at: payment.webhook_verified_at,
        created_at: payment.created_at,
    }
}
