use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

use crate::error::DomainResult;
use crate::model::{
    AuditRecord, Business, Client, Contract, ContractTemplate, Invoice, Payment, PaymentProvider,
    PaymentStatus,
};

/// Everything the webhook handler needs persisted in one atomic step. When
/// `mark_paid` is set the store flips the invoice and contract along with
/// the payment row; either all three land or none do.
#[derive(Debug, Clone)]
pub struct WebhookOutcome {
    pub payment_id: Uuid,
    pub status: PaymentStatus,
    /// Full replacement value; the merge with the prior payload happens
    /// before this struct is built.
    pub merged_payload: Value,
    pub verified_at: DateTime<Utc>,
    /// Applied with coalesce semantics so replays keep the first timestamp.
    pub paid_at: Option<DateTime<Utc>>,
    pub mark_paid: Option<PaidEntities>,
}

#[derive(Debug, Clone)]
pub struct PaidEntities {
    pub invoice_id: Uuid,
    pub contract_id: Uuid,
}

#[async_trait]
pub trait HealthStore: Send + Sync {
    async fn ping(&self) -> DomainResult<()>;
}

#[async_trait]
pub trait BusinessStore: Send + Sync {
    async fn get_business(&self, business_id: Uuid) -> DomainResult<Option<Business>>;
}

#[async_trait]
pub trait TemplateStore: Send + Sync {
    async fn insert_template(&self, template: &ContractTemplate) -> DomainResult<()>;
    async fn get_template(
        &self,
        business_id: Uuid,
        template_id: Uuid,
    ) -> DomainResult<Option<ContractTemplate>>;
    async fn list_templates(&self, business_id: Uuid) -> DomainResult<Vec<ContractTemplate>>;
}

#[async_trait]
pub trait ClientStore: Send + Sync {
    async fn find_client_by_email(
        &self,
        business_id: Uuid,
        email: &str,
    ) -> DomainResult<Option<Client>>;
    /// Fails with `Conflict` when (business, email) already exists.
    async fn insert_client(&self, client: &Client) -> DomainResult<()>;
    async fn update_client_phone(
        &self,
        client_id: Uuid,
        phone: &str,
        now: DateTime<Utc>,
    ) -> DomainResult<()>;
}

/// Contract persistence. The `mark_*` methods are conditional updates that
/// only fire from the states named in the lifecycle graph and report
/// whether a row was changed, so a lost race can never regress a status.
#[async_trait]
pub trait ContractStore: Send + Sync {
    async fn insert_contract(&self, contract: &Contract) -> DomainResult<()>;
    async fn get_contract(
        &self,
        business_id: Uuid,
        contract_id: Uuid,
    ) -> DomainResult<Option<Contract>>;
    async fn get_contract_by_id(&self, contract_id: Uuid) -> DomainResult<Option<Contract>>;
    async fn get_contract_by_public_token(&self, token: &str) -> DomainResult<Option<Contract>>;
    async fn list_contracts(&self, business_id: Uuid) -> DomainResult<Vec<Contract>>;
    /// CREATED | SENT -> SENT; restamps `sent_at` on re-send.
    async fn mark_contract_sent(
        &self,
        contract_id: Uuid,
        now: DateTime<Utc>,
    ) -> DomainResult<bool>;
    /// CREATED | SENT -> VIEWED.
    async fn mark_contract_viewed(
        &self,
        contract_id: Uuid,
        viewer_ip: &str,
        now: DateTime<Utc>,
    ) -> DomainResult<bool>;
    /// SENT | VIEWED -> SIGNED.
    async fn mark_contract_signed(
        &self,
        contract_id: Uuid,
        signer_name: &str,
        signer_phone: &str,
        signer_ip: &str,
        document_path: &str,
        now: DateTime<Utc>,
    ) -> DomainResult<bool>;
    /// CREATED | SENT | VIEWED -> VOIDED.
    async fn mark_contract_voided(
        &self,
        contract_id: Uuid,
        now: DateTime<Utc>,
    ) -> DomainResult<bool>;
}

#[async_trait]
pub trait InvoiceStore: Send + Sync {
    /// Fails with `Conflict` when the contract already has an invoice.
    async fn insert_invoice(&self, invoice: &Invoice) -> DomainResult<()>;
    async fn get_invoice(
        &self,
        business_id: Uuid,
        invoice_id: Uuid,
    ) -> DomainResult<Option<Invoice>>;
    async fn get_invoice_by_id(&self, invoice_id: Uuid) -> DomainResult<Option<Invoice>>;
    async fn get_invoice_by_contract(&self, contract_id: Uuid) -> DomainResult<Option<Invoice>>;
}

#[async_trait]
pub trait PaymentStore: Send + Sync {
    async fn insert_payment(&self, payment: &Payment) -> DomainResult<()>;
    /// Fails with `Conflict` when (provider, reference) is already taken.
    async fn attach_provider_intent(
        &self,
        payment_id: Uuid,
        provider_payment_id: &str,
        checkout_url: &str,
        payload: &Value,
        now: DateTime<Utc>,
    ) -> DomainResult<()>;
    async fn get_payment(
        &self,
        business_id: Uuid,
        payment_id: Uuid,
    ) -> DomainResult<Option<Payment>>;
    async fn get_payment_by_provider_ref(
        &self,
        provider: PaymentProvider,
        provider_payment_id: &str,
    ) -> DomainResult<Option<Payment>>;
    async fn apply_webhook_outcome(&self, outcome: &WebhookOutcome) -> DomainResult<()>;
}

#[async_trait]
pub trait AuditStore: Send + Sync {
    async fn record_audit(&self, record: &AuditRecord) -> DomainResult<()>;
}

pub trait Store:
    HealthStore
    + BusinessStore
    + TemplateStore
    + ClientStore
    + ContractStore
    + InvoiceStore
    + PaymentStore
    + AuditStore
{
}

impl<T> Store for T where
    T: HealthStore
        + BusinessStore
        + TemplateStore
        + ClientStore
        + ContractStore
        + InvoiceStore
        + PaymentStore
        + AuditStore
{
}
