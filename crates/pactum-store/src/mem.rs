//! In-memory implementation of the storage traits, for tests and local
//! development without Postgres. Mirrors the Postgres semantics: the same
//! uniqueness conflicts and the same guarded status transitions.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::RwLock;
use uuid::Uuid;

use pactum_core::{
    AuditRecord, AuditStore, Business, BusinessStore, Client, ClientStore, Contract,
    ContractStatus, ContractStore, ContractTemplate, DomainError, DomainResult, HealthStore,
    Invoice, InvoiceStatus, InvoiceStore, Payment, PaymentProvider, PaymentStore, TemplateStore,
    WebhookOutcome,
};

#[derive(Default)]
pub struct MemStore {
    businesses: RwLock<HashMap<Uuid, Business>>,
    clients: RwLock<HashMap<Uuid, Client>>,
    templates: RwLock<HashMap<Uuid, ContractTemplate>>,
    contracts: RwLock<HashMap<Uuid, Contract>>,
    invoices: RwLock<HashMap<Uuid, Invoice>>,
    payments: RwLock<HashMap<Uuid, Payment>>,
    audit_entries: RwLock<Vec<AuditRecord>>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn seed_business(&self, business: Business) {
        self.businesses.write().await.insert(business.id, business);
    }

    /// Snapshot of recorded audit entries, oldest first.
    pub async fn audit_log(&self) -> Vec<AuditRecord> {
        self.audit_entries.read().await.clone()
    }
}

#[async_trait]
impl HealthStore for MemStore {
    async fn ping(&self) -> DomainResult<()> {
        Ok(())
    }
}

#[async_trait]
impl BusinessStore for MemStore {
    async fn get_business(&self, business_id: Uuid) -> DomainResult<Option<Business>> {
        Ok(self.businesses.read().await.get(&business_id).cloned())
    }
}

#[async_trait]
impl TemplateStore for MemStore {
    async fn insert_template(&self, template: &ContractTemplate) -> DomainResult<()> {
        self.templates
            .write()
            .await
            .insert(template.id, template.clone());
        Ok(())
    }

    async fn get_template(
        &self,
        business_id: Uuid,
        template_id: Uuid,
    ) -> DomainResult<Option<ContractTemplate>> {
        Ok(self
            .templates
            .read()
            .await
            .get(&template_id)
            .filter(|template| template.business_id == business_id)
            .cloned())
    }

    async fn list_templates(&self, business_id: Uuid) -> DomainResult<Vec<ContractTemplate>> {
        let mut templates: Vec<ContractTemplate> = self
            .templates
            .read()
            .await
            .values()
            .filter(|template| template.business_id == business_id)
            .cloned()
            .collect();
        templates.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(templates)
    }
}

#[async_trait]
impl ClientStore for MemStore {
    async fn find_client_by_email(
        &self,
        business_id: Uuid,
        email: &str,
    ) -> DomainResult<Option<Client>> {
        Ok(self
            .clients
            .read()
            .await
            .values()
            .find(|client| client.business_id == business_id && client.email == email)
            .cloned())
    }

    async fn insert_client(&self, client: &Client) -> DomainResult<()> {
        let mut clients = self.clients.write().await;
        let duplicate = clients
            .values()
            .any(|existing| existing.business_id == client.business_id && existing.email == client.email);
        if duplicate {
            return Err(DomainError::conflict(
                "client email already exists for this business",
            ));
        }
        clients.insert(client.id, client.clone());
        Ok(())
    }

    async fn update_client_phone(
        &self,
        client_id: Uuid,
        phone: &str,
        now: DateTime<Utc>,
    ) -> DomainResult<()> {
        if let Some(client) = self.clients.write().await.get_mut(&client_id) {
            client.phone = Some(phone.to_string());
            client.updated_at = now;
        }
        Ok(())
    }
}

#[async_trait]
impl ContractStore for MemStore {
    async fn insert_contract(&self, contract: &Contract) -> DomainResult<()> {
        let mut contracts = self.contracts.write().await;
        let taken = contracts.values().any(|existing| {
            existing.contract_number == contract.contract_number
                || existing.public_token == contract.public_token
        });
        if taken {
            return Err(DomainError::conflict("contract identifier already allocated"));
        }
        contracts.insert(contract.id, contract.clone());
        Ok(())
    }

    async fn get_contract(
        &self,
        business_id: Uuid,
        contract_id: Uuid,
    ) -> DomainResult<Option<Contract>> {
        Ok(self
            .contracts
            .read()
            .await
            .get(&contract_id)
            .filter(|contract| contract.business_id == business_id)
            .cloned())
    }

    async fn get_contract_by_id(&self, contract_id: Uuid) -> DomainResult<Option<Contract>> {
        Ok(self.contracts.read().await.get(&contract_id).cloned())
    }

    async fn get_contract_by_public_token(&self, token: &str) -> DomainResult<Option<Contract>> {
        Ok(self
            .contracts
            .read()
            .await
            .values()
            .find(|contract| contract.public_token == token)
            .cloned())
    }

    async fn list_contracts(&self, business_id: Uuid) -> DomainResult<Vec<Contract>> {
        let mut contracts: Vec<Contract> = self
            .contracts
            .read()
            .await
            .values()
            .filter(|contract| contract.business_id == business_id)
            .cloned()
            .collect();
        contracts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(contracts)
    }

    async fn mark_contract_sent(
        &self,
        contract_id: Uuid,
        now: DateTime<Utc>,
    ) -> DomainResult<bool> {
        let mut contracts = self.contracts.write().await;
        let Some(contract) = contracts.get_mut(&contract_id) else {
            return Ok(false);
        };
        if !matches!(contract.status, ContractStatus::Created | ContractStatus::Sent) {
            return Ok(false);
        }
        contract.status = ContractStatus::Sent;
        contract.sent_at = Some(now);
        contract.updated_at = now;
        Ok(true)
    }

    async fn mark_contract_viewed(
        &self,
        contract_id: Uuid,
        viewer_ip: &str,
        now: DateTime<Utc>,
    ) -> DomainResult<bool> {
        let mut contracts = self.contracts.write().await;
        let Some(contract) = contracts.get_mut(&contract_id) else {
            return Ok(false);
        };
        if !matches!(contract.status, ContractStatus::Created | ContractStatus::Sent) {
            return Ok(false);
        }
        contract.status = ContractStatus::Viewed;
        contract.viewed_at = Some(now);
        contract.viewer_ip = Some(viewer_ip.to_string());
        contract.updated_at = now;
        Ok(true)
    }

    async fn mark_contract_signed(
        &self,
        contract_id: Uuid,
        signer_name: &str,
        signer_phone: &str,
        signer_ip: &str,
        document_path: &str,
        now: DateTime<Utc>,
    ) -> DomainResult<bool> {
        let mut contracts = self.contracts.write().await;
        let Some(contract) = contracts.get_mut(&contract_id) else {
            return Ok(false);
        };
        if !matches!(contract.status, ContractStatus::Sent | ContractStatus::Viewed) {
            return Ok(false);
        }
        contract.status = ContractStatus::Signed;
        contract.signed_at = Some(now);
        contract.signer_name = Some(signer_name.to_string());
        contract.signer_phone = Some(signer_phone.to_string());
        contract.signer_ip = Some(signer_ip.to_string());
        contract.signed_document_path = Some(document_path.to_string());
        contract.updated_at = now;
        Ok(true)
    }

    async fn mark_contract_voided(
        &self,
        contract_id: Uuid,
        now: DateTime<Utc>,
    ) -> DomainResult<bool> {
        let mut contracts = self.contracts.write().await;
        let Some(contract) = contracts.get_mut(&contract_id) else {
            return Ok(false);
        };
        let voidable = matches!(
            contract.status,
            ContractStatus::Created | ContractStatus::Sent | ContractStatus::Viewed
        );
        if !voidable {
            return Ok(false);
        }
        contract.status = ContractStatus::Voided;
        contract.updated_at = now;
        Ok(true)
    }
}

#[async_trait]
impl InvoiceStore for MemStore {
    async fn insert_invoice(&self, invoice: &Invoice) -> DomainResult<()> {
        let mut invoices = self.invoices.write().await;
        let duplicate = invoices.values().any(|existing| {
            existing.contract_id == invoice.contract_id
                || existing.invoice_number == invoice.invoice_number
        });
        if duplicate {
            return Err(DomainError::conflict(
                "invoice already exists for this contract",
            ));
        }
        invoices.insert(invoice.id, invoice.clone());
        Ok(())
    }

    async fn get_invoice(
        &self,
        business_id: Uuid,
        invoice_id: Uuid,
    ) -> DomainResult<Option<Invoice>> {
        Ok(self
            .invoices
            .read()
            .await
            .get(&invoice_id)
            .filter(|invoice| invoice.business_id == business_id)
            .cloned())
    }

    async fn get_invoice_by_id(&self, invoice_id: Uuid) -> DomainResult<Option<Invoice>> {
        Ok(self.invoices.read().await.get(&invoice_id).cloned())
    }

    async fn get_invoice_by_contract(&self, contract_id: Uuid) -> DomainResult<Option<Invoice>> {
        Ok(self
            .invoices
            .read()
            .await
            .values()
            .find(|invoice| invoice.contract_id == contract_id)
            .cloned())
    }
}

#[async_trait]
impl PaymentStore for MemStore {
    async fn insert_payment(&self, payment: &Payment) -> DomainResult<()> {
        let mut payments = self.payments.write().await;
        if let Some(reference) = &payment.provider_payment_id {
            let taken = payments.values().any(|existing| {
                existing.provider == payment.provider
                    && existing.provider_payment_id.as_deref() == Some(reference.as_str())
            });
            if taken {
                return Err(DomainError::conflict(
                    "provider payment reference already recorded",
                ));
            }
        }
        payments.insert(payment.id, payment.clone());
        Ok(())
    }

    async fn attach_provider_intent(
        &self,
        payment_id: Uuid,
        provider_payment_id: &str,
        checkout_url: &str,
        payload: &Value,
        now: DateTime<Utc>,
    ) -> DomainResult<()> {
        let mut payments = self.payments.write().await;
        let provider = match payments.get(&payment_id) {
            Some(payment) => payment.provider,
            None => return Ok(()),
        };
        let taken = payments.values().any(|existing| {
            existing.id != payment_id
                && existing.provider == provider
                && existing.provider_payment_id.as_deref() == Some(provider_payment_id)
        });
        if taken {
            return Err(DomainError::conflict(
                "provider payment reference already recorded",
            ));
        }
        if let Some(payment) = payments.get_mut(&payment_id) {
            payment.provider_payment_id = Some(provider_payment_id.to_string());
            payment.checkout_url = Some(checkout_url.to_string());
            payment.provider_payload = payload.clone();
            payment.updated_at = now;
        }
        Ok(())
    }

    async fn get_payment(
        &self,
        business_id: Uuid,
        payment_id: Uuid,
    ) -> DomainResult<Option<Payment>> {
        Ok(self
            .payments
            .read()
            .await
            .get(&payment_id)
            .filter(|payment| payment.business_id == business_id)
            .cloned())
    }

    async fn get_payment_by_provider_ref(
        &self,
        provider: PaymentProvider,
        provider_payment_id: &str,
    ) -> DomainResult<Option<Payment>> {
        Ok(self
            .payments
            .read()
            .await
            .values()
            .find(|payment| {
                payment.provider == provider
                    && payment.provider_payment_id.as_deref() == Some(provider_payment_id)
            })
            .cloned())
    }

    async fn apply_webhook_outcome(&self, outcome: &WebhookOutcome) -> DomainResult<()> {
        // Lock order matches the transaction's statement order in Postgres.
        let mut payments = self.payments.write().await;
        let mut invoices = self.invoices.write().await;
        let mut contracts = self.contracts.write().await;

        if let Some(payment) = payments.get_mut(&outcome.payment_id) {
            payment.status = outcome.status;
            payment.provider_payload = outcome.merged_payload.clone();
            payment.webhook_verified_at = Some(outcome.verified_at);
            payment.paid_at = payment.paid_at.or(outcome.paid_at);
            payment.updated_at = outcome.verified_at;
        }

        if let Some(paid) = &outcome.mark_paid {
            if let Some(invoice) = invoices.get_mut(&paid.invoice_id) {
                invoice.status = InvoiceStatus::Paid;
                invoice.paid_at = invoice.paid_at.or(Some(outcome.verified_at));
                invoice.updated_at = outcome.verified_at;
            }
            if let Some(contract) = contracts.get_mut(&paid.contract_id) {
                if contract.status == ContractStatus::Signed {
                    contract.status = ContractStatus::Paid;
                    contract.updated_at = outcome.verified_at;
                }
            }
        }

        Ok(())
    }
}

#[async_trait]
impl AuditStore for MemStore {
    async fn record_audit(&self, record: &AuditRecord) -> DomainResult<()> {
        self.audit_entries.write().await.push(record.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pactum_core::{PaidEntities, PaymentStatus};
    use serde_json::json;

    fn contract_fixture(business_id: Uuid, status: ContractStatus) -> Contract {
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
            status,
            public_token: format!("token-{id}"),
            sent_at: None,
            viewed_at: None,
            signed_at: None,
            viewer_ip: None,
            signer_ip: None,
            signer_name: None,
            signer_phone: None,
            signed_document_path: None,
            created_by: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
        }
    }

    fn invoice_fixture(contract: &Contract) -> Invoice {
        let now = Utc::now();
        let id = Uuid::new_v4();
        Invoice {
            id,
            business_id: contract.business_id,
            contract_id: contract.id,
            invoice_number: format!("INV-{id}"),
            amount_cents: contract.amount_cents,
            currency: contract.currency.clone(),
            status: InvoiceStatus::Pending,
            due_at: None,
            paid_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn payment_fixture(invoice: &Invoice) -> Payment {
        let now = Utc::now();
        Payment {
            id: Uuid::new_v4(),
            business_id: invoice.business_id,
            invoice_id: invoice.id,
            provider: PaymentProvider::MockClick,
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
        }
    }

    #[tokio::test]
    async fn sent_transition_refuses_viewed_contracts() {
        let store = MemStore::new();
        let contract = contract_fixture(Uuid::new_v4(), ContractStatus::Viewed);
        store.insert_contract(&contract).await.unwrap();

        let moved = store
            .mark_contract_sent(contract.id, Utc::now())
            .await
            .unwrap();
        assert!(!moved);

        let stored = store.get_contract_by_id(contract.id).await.unwrap().unwrap();
        assert_eq!(stored.status, ContractStatus::Viewed);
    }

    #[tokio::test]
    async fn second_invoice_for_contract_is_a_conflict() {
        let store = MemStore::new();
        let contract = contract_fixture(Uuid::new_v4(), ContractStatus::Signed);
        store.insert_contract(&contract).await.unwrap();
        store.insert_invoice(&invoice_fixture(&contract)).await.unwrap();

        let err = store
            .insert_invoice(&invoice_fixture(&contract))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[tokio::test]
    async fn attach_rejects_reference_taken_by_sibling_payment() {
        let store = MemStore::new();
        let contract = contract_fixture(Uuid::new_v4(), ContractStatus::Signed);
        let invoice = invoice_fixture(&contract);
        store.insert_contract(&contract).await.unwrap();
        store.insert_invoice(&invoice).await.unwrap();

        let first = payment_fixture(&invoice);
        let second = payment_fixture(&invoice);
        store.insert_payment(&first).await.unwrap();
        store.insert_payment(&second).await.unwrap();

        store
            .attach_provider_intent(first.id, "click_abc", "https://x/pay/click_abc", &json!({}), Utc::now())
            .await
            .unwrap();
        let err = store
            .attach_provider_intent(second.id, "click_abc", "https://x/pay/click_abc", &json!({}), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[tokio::test]
    async fn webhook_outcome_flips_payment_invoice_and_contract_together() {
        let store = MemStore::new();
        let mut contract = contract_fixture(Uuid::new_v4(), ContractStatus::Signed);
        contract.signed_at = Some(Utc::now());
        let invoice = invoice_fixture(&contract);
        let payment = payment_fixture(&invoice);
        store.insert_contract(&contract).await.unwrap();
        store.insert_invoice(&invoice).await.unwrap();
        store.insert_payment(&payment).await.unwrap();

        let verified_at = Utc::now();
        store
            .apply_webhook_outcome(&WebhookOutcome {
                payment_id: payment.id,
                status: PaymentStatus::Succeeded,
                merged_payload: json!({"webhookStatus": "SUCCEEDED"}),
                verified_at,
                paid_at: Some(verified_at),
                mark_paid: Some(PaidEntities {
                    invoice_id: invoice.id,
                    contract_id: contract.id,
                }),
            })
            .await
            .unwrap();

        let stored_payment = store
            .get_payment(payment.business_id, payment.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored_payment.status, PaymentStatus::Succeeded);
        assert_eq!(stored_payment.paid_at, Some(verified_at));

        let stored_invoice = store.get_invoice_by_id(invoice.id).await.unwrap().unwrap();
        assert_eq!(stored_invoice.status, InvoiceStatus::Paid);

        let stored_contract = store.get_contract_by_id(contract.id).await.unwrap().unwrap();
        assert_eq!(stored_contract.status, ContractStatus::Paid);
    }

    #[tokio::test]
    async fn replay_keeps_the_first_paid_timestamp() {
        let store = MemStore::new();
        let contract = contract_fixture(Uuid::new_v4(), ContractStatus::Signed);
        let invoice = invoice_fixture(&contract);
        let payment = payment_fixture(&invoice);
        store.insert_contract(&contract).await.unwrap();
        store.insert_invoice(&invoice).await.unwrap();
        store.insert_payment(&payment).await.unwrap();

        let first_at = Utc::now();
        let outcome = WebhookOutcome {
            payment_id: payment.id,
            status: PaymentStatus::Succeeded,
            merged_payload: json!({}),
            verified_at: first_at,
            paid_at: Some(first_at),
            mark_paid: Some(PaidEntities {
                invoice_id: invoice.id,
                contract_id: contract.id,
            }),
        };
        store.apply_webhook_outcome(&outcome).await.unwrap();

        let later_at = first_at + chrono::Duration::seconds(90);
        let replay = WebhookOutcome {
            verified_at: later_at,
            paid_at: Some(later_at),
            ..outcome
        };
        store.apply_webhook_outcome(&replay).await.unwrap();

        let stored_payment = store
            .get_payment(payment.business_id, payment.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored_payment.paid_at, Some(first_at));
        assert_eq!(stored_payment.webhook_verified_at, Some(later_at));

        let stored_invoice = store.get_invoice_by_id(invoice.id).await.unwrap().unwrap();
        assert_eq!(stored_invoice.paid_at, Some(first_at));
    }
}
