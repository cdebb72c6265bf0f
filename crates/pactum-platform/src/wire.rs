use chrono::{DateTime, Utc};
use pactum_core::model::{ContractStatus, InvoiceStatus, PaymentProvider, PaymentStatus};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTemplateRequest {
    pub name: String,
    pub body: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateView {
    pub id: Uuid,
    pub name: String,
    pub body: String,
    pub version: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateContractRequest {
    pub template_id: Uuid,
    pub title: String,
    pub client_name: String,
    pub client_email: String,
    pub client_phone: Option<String>,
    pub amount_cents: i64,
    pub currency: String,
}

/// Tenant-facing contract representation, including the public token the
/// tenant shares with the counterparty.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractView {
    pub id: Uuid,
    pub contract_number: String,
    pub title: String,
    pub status: ContractStatus,
    pub amount_cents: i64,
    pub currency: String,
    pub client_id: Uuid,
    pub template_id: Uuid,
    pub public_token: String,
    pub rendered_body: String,
    pub sent_at: Option<DateTime<Utc>>,
    pub viewed_at: Option<DateTime<Utc>>,
    pub signed_at: Option<DateTime<Utc>>,
    pub signer_name: Option<String>,
    pub signed_document_path: Option<String>,
    pub invoice: Option<InvoiceView>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// What the anonymous holder of a public link is allowed to see. No ids,
/// no token echo, no tenant internals.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicContractView {
    pub contract_number: String,
    pub title: String,
    pub rendered_body: String,
    pub status: ContractStatus,
    pub amount_cents: i64,
    pub currency: String,
    pub sent_at: Option<DateTime<Utc>>,
    pub viewed_at: Option<DateTime<Utc>>,
    pub signed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendLinkResponse {
    pub public_link: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestOtpRequest {
    pub phone: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestOtpResponse {
    pub expires_in: u64,
    /// Stand-in for the SMS dispatch this system does not perform.
    pub mock_otp_code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyOtpRequest {
    pub code: String,
    pub signer_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceView {
    pub id: Uuid,
    pub contract_id: Uuid,
    pub invoice_number: String,
    pub amount_cents: i64,
    pub currency: String,
    pub status: InvoiceStatus,
    pub due_at: Option<DateTime<Utc>>,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateIntentRequest {
    /// Defaults to MOCK_CLICK when absent; unknown values are rejected.
    pub provider: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentView {
    pub id: Uuid,
    pub invoice_id: Uuid,
    pub provider: PaymentProvider,
    pub provider_payment_id: Option<String>,
    pub amount_cents: i64,
    pub currency: String,
    pub status: PaymentStatus,
    pub checkout_url: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub webhook_verified_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Provider callback body. `status` stays a raw string here: the signature
/// covers the exact bytes the provider sent, so parsing happens only after
/// verification.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookRequest {
    pub provider_payment_id: String,
    pub status: String,
    pub amount_cents: i64,
    pub reference: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookAck {
    pub ok: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub database: String,
    pub cache: String,
}
