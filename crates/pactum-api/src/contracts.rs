use anyhow::Context;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::Utc;
use pactum_core::render::render_template;
use pactum_core::signing;
use pactum_core::{
    AuditRecord, Client, Contract, ContractStatus, ContractTemplate, DomainError, DomainResult,
    Invoice, InvoiceStatus,
};
use pactum_platform::{
    ContractView, CreateContractRequest, InvoiceView, PublicContractView, RequestOtpRequest,
    RequestOtpResponse, SendLinkResponse, VerifyOtpRequest,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::auth::{client_ip, AuthContext};
use crate::error::error_response;
use crate::state::AppState;

/// Cached OTP record bound to one contract. The raw code is never stored;
/// only the keyed hash survives until the TTL runs out.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OtpRecord {
    phone: String,
    code_hash: String,
}

fn public_token_key(token: &str) -> String {
    format!("public:contract:{token}")
}

fn otp_key(contract_id: Uuid) -> String {
    format!("otp:contract:{contract_id}")
}

pub async fn create_contract(
    State(state): State<AppState>,
    auth: AuthContext,
    headers: HeaderMap,
    Json(payload): Json<CreateContractRequest>,
) -> Result<(StatusCode, Json<ContractView>), (StatusCode, String)> {
    let ip = client_ip(&headers);
    create_contract_inner(&state, &auth, ip, payload)
        .await
        .map(|view| (StatusCode::CREATED, Json(view)))
        .map_err(error_response)
}

pub async fn list_contracts(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<Vec<ContractView>>, (StatusCode, String)> {
    list_contracts_inner(&state, &auth)
        .await
        .map(Json)
        .map_err(error_response)
}

pub async fn get_contract(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(contract_id): Path<Uuid>,
) -> Result<Json<ContractView>, (StatusCode, String)> {
    get_contract_inner(&state, &auth, contract_id)
        .await
        .map(Json)
        .map_err(error_response)
}

pub async fn send_link(
    State(state): State<AppState>,
    auth: AuthContext,
    headers: HeaderMap,
    Path(contract_id): Path<Uuid>,
) -> Result<Json<SendLinkResponse>, (StatusCode, String)> {
    let ip = client_ip(&headers);
    send_link_inner(&state, &auth, ip, contract_id)
        .await
        .map(Json)
        .map_err(error_response)
}

pub async fn void_contract(
    State(state): State<AppState>,
    auth: AuthContext,
    headers: HeaderMap,
    Path(contract_id): Path<Uuid>,
) -> Result<Json<ContractView>, (StatusCode, String)> {
    let ip = client_ip(&headers);
    void_contract_inner(&state, &auth, ip, contract_id)
        .await
        .map(Json)
        .map_err(error_response)
}

pub async fn public_view(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(token): Path<String>,
) -> Result<Json<PublicContractView>, (StatusCode, String)> {
    let ip = client_ip(&headers);
    public_view_inner(&state, &token, ip)
        .await
        .map(Json)
        .map_err(error_response)
}

pub async fn request_otp(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(token): Path<String>,
    Json(payload): Json<RequestOtpRequest>,
) -> Result<Json<RequestOtpResponse>, (StatusCode, String)> {
    let ip = client_ip(&headers);
    request_otp_inner(&state, &token, ip, payload)
        .await
        .map(Json)
        .map_err(error_response)
}

pub async fn verify_otp(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(token): Path<String>,
    Json(payload): Json<VerifyOtpRequest>,
) -> Result<Json<PublicContractView>, (StatusCode, String)> {
    let ip = client_ip(&headers);
    verify_otp_inner(&state, &token, ip, payload)
        .await
        .map(Json)
        .map_err(error_response)
}

async fn create_contract_inner(
    state: &AppState,
    auth: &AuthContext,
    ip: String,
    payload: CreateContractRequest,
) -> DomainResult<ContractView> {
    let title = payload.title.trim().to_string();
    if title.is_empty() {
        return Err(DomainError::bad_request("Title is required"));
    }
    let client_name = payload.client_name.trim().to_string();
    if client_name.is_empty() {
        return Err(DomainError::bad_request("Client name is required"));
    }
    let client_email = payload.client_email.trim().to_lowercase();
    if client_email.is_empty() || !client_email.contains('@') {
        return Err(DomainError::bad_request("A valid client email is required"));
    }
    if payload.amount_cents <= 0 {
        return Err(DomainError::bad_request(
            "Amount must be a positive number of minor units",
        ));
    }
    let currency = payload.currency.trim().to_uppercase();
    if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(DomainError::bad_request("Currency must be a 3-letter code"));
    }

    let template = fetch_active_template(state, auth.business_id, payload.template_id).await?;
    let business = state
        .store
        .get_business(auth.business_id)
        .await?
        .ok_or_else(|| DomainError::not_found("Business not found"))?;
    let client = resolve_client(
        state,
        auth.business_id,
        &client_name,
        &client_email,
        payload.client_phone.as_deref(),
    )
    .await?;

    let rendered_body = render_template(
        &template.body,
        &client.full_name,
        &business.name,
        payload.amount_cents,
        &currency,
    );

    let now = Utc::now();
    let contract = Contract {
        id: Uuid::new_v4(),
        business_id: auth.business_id,
        client_id: client.id,
        template_id: template.id,
        contract_number: signing::generate_contract_number(now.timestamp_millis()),
        title,
        rendered_body,
        amount_cents: payload.amount_cents,
        currency,
        status: ContractStatus::Created,
        public_token: signing::generate_public_token(),
        sent_at: None,
        viewed_at: None,
        signed_at: None,
        viewer_ip: None,
        signer_ip: None,
        signer_name: None,
        signer_phone: None,
        signed_document_path: None,
        created_by: auth.user_id,
        created_at: now,
        updated_at: now,
    };
    state.store.insert_contract(&contract).await?;

    state.audit.record(AuditRecord {
        action: "CONTRACT_CREATE".to_string(),
        entity_type: "contract".to_string(),
        entity_id: Some(contract.id.to_string()),
        business_id: Some(auth.business_id),
        user_id: Some(auth.user_id),
        ip: Some(ip),
        metadata: json!({
            "contractNumber": contract.contract_number,
            "amountCents": contract.amount_cents,
        }),
    });

    Ok(contract_view(contract, None))
}

async fn list_contracts_inner(
    state: &AppState,
    auth: &AuthContext,
) -> DomainResult<Vec<ContractView>> {
    let contracts = state.store.list_contracts(auth.business_id).await?;
    Ok(contracts
        .into_iter()
        .map(|contract| contract_view(contract, None))
        .collect())
}

async fn get_contract_inner(
    state: &AppState,
    auth: &AuthContext,
    contract_id: Uuid,
) -> DomainResult<ContractView> {
    let contract = state
        .store
        .get_contract(auth.business_id, contract_id)
        .await?
        .ok_or_else(|| DomainError::not_found("Contract not found"))?;
    let invoice = state.store.get_invoice_by_contract(contract.id).await?;
    Ok(contract_view(contract, invoice))
}

async fn send_link_inner(
    state: &AppState,
    auth: &AuthContext,
    ip: String,
    contract_id: Uuid,
) -> DomainResult<SendLinkResponse> {
    let contract = state
        .store
        .get_contract(auth.business_id, contract_id)
        .await?
        .ok_or_else(|| DomainError::not_found("Contract not found"))?;

    match contract.status {
        ContractStatus::Created | ContractStatus::Sent => {}
        ContractStatus::Viewed => {
            return Err(DomainError::invalid_state("Contract has already been viewed"));
        }
        _ => {
            return Err(DomainError::invalid_state(
                "Cannot resend a finalized contract",
            ));
        }
    }

    let moved = state
        .store
        .mark_contract_sent(contract.id, Utc::now())
        .await?;
    if !moved {
        return Err(DomainError::invalid_state(
            "Cannot resend a finalized contract",
        ));
    }

    state
        .cache
        .set(
            &public_token_key(&contract.public_token),
            &contract.id.to_string(),
            Some(state.settings.public_link_ttl_seconds),
        )
        .await?;

    let public_link = format!(
        "{}/{}",
        state.settings.public_link_base_url.trim_end_matches('/'),
        contract.public_token
    );

    state.audit.record(AuditRecord {
        action: "CONTRACT_SEND_LINK".to_string(),
        entity_type: "contract".to_string(),
        entity_id: Some(contract.id.to_string()),
        business_id: Some(auth.business_id),
        user_id: Some(auth.user_id),
        ip: Some(ip),
        metadata: json!({ "publicLink": public_link }),
    });

    Ok(SendLinkResponse { public_link })
}

async fn void_contract_inner(
    state: &AppState,
    auth: &AuthContext,
    ip: String,
    contract_id: Uuid,
) -> DomainResult<ContractView> {
    let contract = state
        .store
        .get_contract(auth.business_id, contract_id)
        .await?
        .ok_or_else(|| DomainError::not_found("Contract not found"))?;

    let voidable = matches!(
        contract.status,
        ContractStatus::Created | ContractStatus::Sent | ContractStatus::Viewed
    );
    if !voidable {
        return Err(DomainError::invalid_state("Contract can no longer be voided"));
    }

    let moved = state
        .store
        .mark_contract_voided(contract.id, Utc::now())
        .await?;
    if !moved {
        return Err(DomainError::invalid_state("Contract can no longer be voided"));
    }

    state.audit.record(AuditRecord {
        action: "CONTRACT_VOID".to_string(),
        entity_type: "contract".to_string(),
        entity_id: Some(contract.id.to_string()),
        business_id: Some(auth.business_id),
        user_id: Some(auth.user_id),
        ip: Some(ip),
        metadata: json!({ "previousStatus": contract.status.as_str() }),
    });

    let voided = state
        .store
        .get_contract(auth.business_id, contract.id)
        .await?
        .ok_or_else(|| DomainError::not_found("Contract not found"))?;
    Ok(contract_view(voided, None))
}

async fn public_view_inner(
    state: &AppState,
    token: &str,
    ip: String,
) -> DomainResult<PublicContractView> {
    let mut contract = resolve_public_contract(state, token).await?;

    if matches!(
        contract.status,
        ContractStatus::Created | ContractStatus::Sent
    ) {
        state
            .store
            .mark_contract_viewed(contract.id, &ip, Utc::now())
            .await?;
        if let Some(updated) = state.store.get_contract_by_id(contract.id).await? {
            contract = updated;
        }
    }

    state.audit.record(AuditRecord {
        action: "CONTRACT_VIEW".to_string(),
        entity_type: "contract".to_string(),
        entity_id: Some(contract.id.to_string()),
        business_id: Some(contract.business_id),
        user_id: None,
        ip: Some(ip),
        metadata: json!({ "status": contract.status.as_str() }),
    });

    Ok(public_snapshot(contract))
}

async fn request_otp_inner(
    state: &AppState,
    token: &str,
    ip: String,
    payload: RequestOtpRequest,
) -> DomainResult<RequestOtpResponse> {
    let contract = resolve_public_contract(state, token).await?;
    if !matches!(contract.status, ContractStatus::Sent | ContractStatus::Viewed) {
        return Err(DomainError::invalid_state(
            "Contract cannot be signed in its current state",
        ));
    }

    let phone = payload.phone.trim().to_string();
    if phone.is_empty() {
        return Err(DomainError::bad_request("Phone number is required"));
    }

    let code = signing::generate_otp_code();
    let record = OtpRecord {
        phone: phone.clone(),
        code_hash: signing::hash_otp_code(&code, &state.settings.otp_hash_secret),
    };
    let serialized = serde_json::to_string(&record).map_err(anyhow::Error::new)?;
    state
        .cache
        .set(
            &otp_key(contract.id),
            &serialized,
            Some(state.settings.otp_ttl_seconds),
        )
        .await?;

    state.audit.record(AuditRecord {
        action: "CONTRACT_OTP_REQUEST".to_string(),
        entity_type: "contract".to_string(),
        entity_id: Some(contract.id.to_string()),
        business_id: Some(contract.business_id),
        user_id: None,
        ip: Some(ip),
        metadata: json!({ "phone": phone, "mockOtpCode": code }),
    });

    Ok(RequestOtpResponse {
        expires_in: state.settings.otp_ttl_seconds,
        mock_otp_code: code,
    })
}

async fn verify_otp_inner(
    state: &AppState,
    token: &str,
    ip: String,
    payload: VerifyOtpRequest,
) -> DomainResult<PublicContractView> {
    let contract = resolve_public_contract(state, token).await?;

    let signer_name = payload.signer_name.trim().to_string();
    if signer_name.is_empty() {
        return Err(DomainError::bad_request("Signer name is required"));
    }

    let key = otp_key(contract.id);
    let raw = state
        .cache
        .get(&key)
        .await?
        .ok_or_else(|| DomainError::unauthorized("OTP expired or missing"))?;
    // An unreadable record fails closed, same as an expired one.
    let record: OtpRecord = serde_json::from_str(&raw)
        .map_err(|_| DomainError::unauthorized("OTP expired or missing"))?;

    let supplied_hash =
        signing::hash_otp_code(payload.code.trim(), &state.settings.otp_hash_secret);
    if !signing::constant_time_eq(supplied_hash.as_bytes(), record.code_hash.as_bytes()) {
        return Err(DomainError::unauthorized("Invalid OTP code"));
    }

    let now = Utc::now();
    let document_path = state
        .settings
        .signed_documents_dir
        .join(format!("{}.pdf", contract.id));

    let moved = state
        .store
        .mark_contract_signed(
            contract.id,
            &signer_name,
            &record.phone,
            &ip,
            &document_path.to_string_lossy(),
            now,
        )
        .await?;
    if !moved {
        return Err(DomainError::invalid_state(
            "Contract cannot be signed in its current state",
        ));
    }

    // The artifact is written only once the transition has landed, so a
    // verify that loses the state race leaves nothing on disk.
    let document = signing::signed_document_bytes(&format!(
        "Contract {} signed at {}",
        contract.contract_number,
        now.to_rfc3339()
    ));
    tokio::fs::create_dir_all(&state.settings.signed_documents_dir)
        .await
        .context("failed to create signed documents directory")?;
    tokio::fs::write(&document_path, &document)
        .await
        .context("failed to persist signed document")?;

    // Single use: the code dies with the first successful verification.
    state.cache.del(&key).await?;

    let invoice = create_for_signed_contract(state, contract.id).await?;

    state.audit.record(AuditRecord {
        action: "CONTRACT_SIGN".to_string(),
        entity_type: "contract".to_string(),
        entity_id: Some(contract.id.to_string()),
        business_id: Some(contract.business_id),
        user_id: None,
        ip: Some(ip),
        metadata: json!({
            "signerName": signer_name,
            "invoiceNumber": invoice.invoice_number,
        }),
    });

    let signed = state
        .store
        .get_contract_by_id(contract.id)
        .await?
        .ok_or_else(|| DomainError::not_found("Contract not found"))?;
    Ok(public_snapshot(signed))
}

/// Invoice creation for the signing flow. Idempotent: a contract that
/// already has an invoice gets the existing one back, and a lost insert
/// race resolves to the winner's row.
async fn create_for_signed_contract(state: &AppState, contract_id: Uuid) -> DomainResult<Invoice> {
    let contract = state
        .store
        .get_contract_by_id(contract_id)
        .await?
        .ok_or_else(|| DomainError::not_found("Contract not found"))?;

    if let Some(existing) = state.store.get_invoice_by_contract(contract.id).await? {
        return Ok(existing);
    }

    let now = Utc::now();
    let invoice = Invoice {
        id: Uuid::new_v4(),
        business_id: contract.business_id,
        contract_id: contract.id,
        invoice_number: signing::generate_invoice_number(now.timestamp_millis()),
        amount_cents: contract.amount_cents,
        currency: contract.currency.clone(),
        status: InvoiceStatus::Pending,
        due_at: None,
        paid_at: None,
        created_at: now,
        updated_at: now,
    };
    match state.store.insert_invoice(&invoice).await {
        Ok(()) => Ok(invoice),
        Err(DomainError::Conflict(_)) => state
            .store
            .get_invoice_by_contract(contract.id)
            .await?
            .ok_or_else(|| DomainError::not_found("Invoice not found")),
        Err(err) => Err(err),
    }
}

/// Two-tier token resolution: cache first, durable store on miss, then
/// repopulate. A cache miss never means the contract does not exist.
async fn resolve_public_contract(state: &AppState, token: &str) -> DomainResult<Contract> {
    let key = public_token_key(token);

    if let Some(cached) = state.cache.get(&key).await? {
        if let Ok(contract_id) = Uuid::parse_str(&cached) {
            if let Some(contract) = state.store.get_contract_by_id(contract_id).await? {
                return Ok(contract);
            }
        }
    }

    let contract = state
        .store
        .get_contract_by_public_token(token)
        .await?
        .ok_or_else(|| DomainError::not_found("Contract not found"))?;
    state
        .cache
        .set(
            &key,
            &contract.id.to_string(),
            Some(state.settings.public_link_ttl_seconds),
        )
        .await?;
    Ok(contract)
}

async fn fetch_active_template(
    state: &AppState,
    business_id: Uuid,
    template_id: Uuid,
) -> DomainResult<ContractTemplate> {
    state
        .store
        .get_template(business_id, template_id)
        .await?
        .filter(|template| template.is_active)
        .ok_or_else(|| DomainError::not_found("Template not found"))
}

/// Create-or-reuse keyed by (business, lower-cased email); an existing
/// record only gains a phone if it had none.
async fn resolve_client(
    state: &AppState,
    business_id: Uuid,
    full_name: &str,
    email: &str,
    phone: Option<&str>,
) -> DomainResult<Client> {
    let phone = phone.map(str::trim).filter(|p| !p.is_empty());

    if let Some(existing) = state.store.find_client_by_email(business_id, email).await? {
        if existing.phone.is_none() {
            if let Some(phone) = phone {
                state
                    .store
                    .update_client_phone(existing.id, phone, Utc::now())
                    .await?;
                return Ok(Client {
                    phone: Some(phone.to_string()),
                    ..existing
                });
            }
        }
        return Ok(existing);
    }

    let now = Utc::now();
    let client = Client {
        id: Uuid::new_v4(),
        business_id,
        full_name: full_name.to_string(),
        email: email.to_string(),
        phone: phone.map(str::to_string),
        created_at: now,
        updated_at: now,
    };
    match state.store.insert_client(&client).await {
        Ok(()) => Ok(client),
        // Concurrent create for the same email; the first row wins.
        Err(DomainError::Conflict(_)) => state
            .store
            .find_client_by_email(business_id, email)
            .await?
            .ok_or_else(|| DomainError::not_found("Client not found")),
        Err(err) => Err(err),
    }
}

fn contract_view(contract: Contract, invoice: Option<Invoice>) -> ContractView {
    ContractView {
        id: contract.id,
        contract_number: contract.contract_number,
        title: contract.title,
        status: contract.status,
        amount_cents: contract.amount_cents,
        currency: contract.currency,
        client_id: contract.client_id,
        template_id: contract.template_id,
        public_token: contract.public_token,
        rendered_body: contract.rendered_body,
        sent_at: contract.sent_at,
        viewed_at: contract.viewed_at,
        signed_at: contract.signed_at,
        signer_name: contract.signer_name,
        signed_document_path: contract.signed_document_path,
        invoice: invoice.map(invoice_view),
        created_at: contract.created_at,
        updated_at: contract.updated_at,
    }
}

fn invoice_view(invoice: Invoice) -> InvoiceView {
    InvoiceView {
        id: invoice.id,
        contract_id: invoice.contract_id,
        invoice_number: invoice.invoice_number,
        amount_cents: invoice.amount_cents,
        currency: invoice.currency,
        status: invoice.status,
        due_at: invoice.due_at,
        paid_at: invoice.paid_at,
        created_at: invoice.created_at,
    }
}

fn public_snapshot(contract: Contract) -> PublicContractView {
    PublicContractView {
        contract_number: contract.contract_number,
        title: contract.title,
        rendered_body: contract.rendered_body,
        status: contract.status,
        amount_cents: contract.amount_cents,
        currency: contract.currency,
        sent_at: contract.sent_at,
        viewed_at: contract.viewed_at,
        signed_at: contract.signed_at,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use pactum_core::{ContractStore, InvoiceStore, Store};
    use pactum_platform::{DomainSettings, MemCache};
    use pactum_providers::ProviderRegistry;
    use pactum_store::MemStore;

    use super::*;
    use crate::audit::AuditSink;

    fn test_state(store: Arc<MemStore>) -> AppState {
        let store_dyn: Arc<dyn Store> = store;
        AppState {
            store: store_dyn.clone(),
            cache: Arc::new(MemCache::default()),
            providers: ProviderRegistry::new("click_secret_test", "payme_secret_test"),
            settings: Arc::new(DomainSettings {
                public_link_base_url: "http://localhost:8080/public/contracts".to_string(),
                public_link_ttl_seconds: 120,
                otp_ttl_seconds: 300,
                otp_hash_secret: "otp_secret_test".to_string(),
                click_webhook_secret: "click_secret_test".to_string(),
                payme_webhook_secret: "payme_secret_test".to_string(),
                signed_documents_dir: std::env::temp_dir()
                    .join(format!("pactum-unit-{}", Uuid::new_v4())),
            }),
            audit: AuditSink::new(store_dyn),
        }
    }

    fn signed_contract_row(business_id: Uuid) -> Contract {
        let now = Utc::now();
        let id = Uuid::new_v4();
        Contract {
            id,
            business_id,
            client_id: Uuid::new_v4(),
            template_id: Uuid::new_v4(),
            contract_number: format!("CTR-{id}"),
            title: "Retainer".to_string(),
            rendered_body: "Body".to_string(),
            amount_cents: 150_000,
            currency: "USD".to_string(),
            status: ContractStatus::Signed,
            public_token: format!("token-{id}"),
            sent_at: Some(now),
            viewed_at: Some(now),
            signed_at: Some(now),
            viewer_ip: None,
            signer_ip: Some("198.51.100.4".to_string()),
            signer_name: Some("Dana Quinn".to_string()),
            signer_phone: Some("+15550002222".to_string()),
            signed_document_path: None,
            created_by: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn invoice_creation_for_a_signed_contract_is_idempotent() {
        let store = Arc::new(MemStore::new());
        let state = test_state(store.clone());
        let contract = signed_contract_row(Uuid::new_v4());
        store.insert_contract(&contract).await.unwrap();

        let first = create_for_signed_contract(&state, contract.id)
            .await
            .unwrap();
        let second = create_for_signed_contract(&state, contract.id)
            .await
            .unwrap();

        assert_eq!(first.id, second.id, "both calls must yield the same invoice");
        assert_eq!(first.invoice_number, second.invoice_number);
        assert_eq!(first.created_at, second.created_at, "the existing row comes back unchanged");
        assert_eq!(second.amount_cents, contract.amount_cents);
        assert_eq!(second.status, InvoiceStatus::Pending);

        // The ledger holds exactly the one row the first call created.
        let stored = store
            .get_invoice_by_contract(contract.id)
            .await
            .unwrap()
            .expect("invoice should exist");
        assert_eq!(stored.id, first.id);
    }
}
