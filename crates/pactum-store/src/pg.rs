//! Postgres implementation of the storage traits.

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use pactum_core::{
    AuditRecord, AuditStore, Business, BusinessStore, Client, ClientStore, Contract,
    ContractStatus, ContractStore, ContractTemplate, DomainError, DomainResult, HealthStore,
    Invoice, InvoiceStatus, InvoiceStore, Payment, PaymentProvider, PaymentStatus, PaymentStore,
    TemplateStore, WebhookOutcome,
};

/// Storage backed by a Postgres connection pool.
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn storage_error(err: sqlx::Error) -> DomainError {
    DomainError::Internal(anyhow::Error::new(err).context("storage query failed"))
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}

fn insert_error(err: sqlx::Error, conflict_message: &str) -> DomainError {
    if is_unique_violation(&err) {
        DomainError::Conflict(conflict_message.to_string())
    } else {
        storage_error(err)
    }
}

fn business_from_row(row: &PgRow) -> DomainResult<Business> {
    Ok(Business {
        id: row.try_get("id").map_err(storage_error)?,
        name: row.try_get("name").map_err(storage_error)?,
        slug: row.try_get("slug").map_err(storage_error)?,
        created_at: row.try_get("created_at").map_err(storage_error)?,
    })
}

fn client_from_row(row: &PgRow) -> DomainResult<Client> {
    Ok(Client {
        id: row.try_get("id").map_err(storage_error)?,
        business_id: row.try_get("business_id").map_err(storage_error)?,
        full_name: row.try_get("full_name").map_err(storage_error)?,
        email: row.try_get("email").map_err(storage_error)?,
        phone: row.try_get("phone").map_err(storage_error)?,
        created_at: row.try_get("created_at").map_err(storage_error)?,
        updated_at: row.try_get("updated_at").map_err(storage_error)?,
    })
}

fn template_from_row(row: &PgRow) -> DomainResult<ContractTemplate> {
    Ok(ContractTemplate {
        id: row.try_get("id").map_err(storage_error)?,
        business_id: row.try_get("business_id").map_err(storage_error)?,
        name: row.try_get("name").map_err(storage_error)?,
        body: row.try_get("body").map_err(storage_error)?,
        version: row.try_get("version").map_err(storage_error)?,
        is_active: row.try_get("is_active").map_err(storage_error)?,
        created_at: row.try_get("created_at").map_err(storage_error)?,
        updated_at: row.try_get("updated_at").map_err(storage_error)?,
    })
}

fn contract_status_from_row(row: &PgRow) -> DomainResult<ContractStatus> {
    let raw: String = row.try_get("status").map_err(storage_error)?;
    ContractStatus::parse(&raw)
        .ok_or_else(|| DomainError::Internal(anyhow!("unknown contract status '{raw}' in storage")))
}

fn contract_from_row(row: &PgRow) -> DomainResult<Contract> {
    Ok(Contract {
        id: row.try_get("id").map_err(storage_error)?,
        business_id: row.try_get("business_id").map_err(storage_error)?,
        client_id: row.try_get("client_id").map_err(storage_error)?,
        template_id: row.try_get("template_id").map_err(storage_error)?,
        contract_number: row.try_get("contract_number").map_err(storage_error)?,
        title: row.try_get("title").map_err(storage_error)?,
        rendered_body: row.try_get("rendered_body").map_err(storage_error)?,
        amount_cents: row.try_get("amount_cents").map_err(storage_error)?,
        currency: row.try_get("currency").map_err(storage_error)?,
        status: contract_status_from_row(row)?,
        public_token: row.try_get("public_token").map_err(storage_error)?,
        sent_at: row.try_get("sent_at").map_err(storage_error)?,
        viewed_at: row.try_get("viewed_at").map_err(storage_error)?,
        signed_at: row.try_get("signed_at").map_err(storage_error)?,
        viewer_ip: row.try_get("viewer_ip").map_err(storage_error)?,
        signer_ip: row.try_get("signer_ip").map_err(storage_error)?,
        signer_name: row.try_get("signer_name").map_err(storage_error)?,
        signer_phone: row.try_get("signer_phone").map_err(storage_error)?,
        signed_document_path: row.try_get("signed_document_path").map_err(storage_error)?,
        created_by: row.try_get("created_by").map_err(storage_error)?,
        created_at: row.try_get("created_at").map_err(storage_error)?,
        updated_at: row.try_get("updated_at").map_err(storage_error)?,
    })
}

fn invoice_from_row(row: &PgRow) -> DomainResult<Invoice> {
    let raw_status: String = row.try_get("status").map_err(storage_error)?;
    let status = InvoiceStatus::parse(&raw_status).ok_or_else(|| {
        DomainError::Internal(anyhow!("unknown invoice status '{raw_status}' in storage"))
    })?;
    Ok(Invoice {
        id: row.try_get("id").map_err(storage_error)?,
        business_id: row.try_get("business_id").map_err(storage_error)?,
        contract_id: row.try_get("contract_id").map_err(storage_error)?,
        invoice_number: row.try_get("invoice_number").map_err(storage_error)?,
        amount_cents: row.try_get("amount_cents").map_err(storage_error)?,
        currency: row.try_get("currency").map_err(storage_error)?,
        status,
        due_at: row.try_get("due_at").map_err(storage_error)?,
        paid_at: row.try_get("paid_at").map_err(storage_error)?,
        created_at: row.try_get("created_at").map_err(storage_error)?,
        updated_at: row.try_get("updated_at").map_err(storage_error)?,
    })
}

fn payment_from_row(row: &PgRow) -> DomainResult<Payment> {
    let raw_provider: String = row.try_get("provider").map_err(storage_error)?;
    let provider = PaymentProvider::parse(&raw_provider).ok_or_else(|| {
        DomainError::Internal(anyhow!("unknown payment provider '{raw_provider}' in storage"))
    })?;
    let raw_status: String = row.try_get("status").map_err(storage_error)?;
    let status = PaymentStatus::parse(&raw_status).ok_or_else(|| {
        DomainError::Internal(anyhow!("unknown payment status '{raw_status}' in storage"))
    })?;
    Ok(Payment {
        id: row.try_get("id").map_err(storage_error)?,
        business_id: row.try_get("business_id").map_err(storage_error)?,
        invoice_id: row.try_get("invoice_id").map_err(storage_error)?,
        provider,
        provider_payment_id: row.try_get("provider_payment_id").map_err(storage_error)?,
        amount_cents: row.try_get("amount_cents").map_err(storage_error)?,
        currency: row.try_get("currency").map_err(storage_error)?,
        status,
        checkout_url: row.try_get("checkout_url").map_err(storage_error)?,
        provider_payload: row.try_get("provider_payload").map_err(storage_error)?,
        paid_at: row.try_get("paid_at").map_err(storage_error)?,
        webhook_verified_at: row.try_get("webhook_verified_at").map_err(storage_error)?,
        created_at: row.try_get("created_at").map_err(storage_error)?,
        updated_at: row.try_get("updated_at").map_err(storage_error)?,
    })
}

const CONTRACT_COLUMNS: &str = "id, business_id, client_id, template_id, contract_number, title, \
     rendered_body, amount_cents, currency, status, public_token, sent_at, viewed_at, signed_at, \
     viewer_ip, signer_ip, signer_name, signer_phone, signed_document_path, created_by, \
     created_at, updated_at";

const INVOICE_COLUMNS: &str = "id, business_id, contract_id, invoice_number, amount_cents, \
     currency, status, due_at, paid_at, created_at, updated_at";

const PAYMENT_COLUMNS: &str = "id, business_id, invoice_id, provider, provider_payment_id, \
     amount_cents, currency, status, checkout_url, provider_payload, paid_at, \
     webhook_verified_at, created_at, updated_at";

#[async_trait]
impl HealthStore for PgStore {
    async fn ping(&self) -> DomainResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(storage_error)?;
        Ok(())
    }
}

#[async_trait]
impl BusinessStore for PgStore {
    async fn get_business(&self, business_id: Uuid) -> DomainResult<Option<Business>> {
        let row = sqlx::query("SELECT id, name, slug, created_at FROM businesses WHERE id = $1")
            .bind(business_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_error)?;
        row.as_ref().map(business_from_row).transpose()
    }
}

#[async_trait]
impl TemplateStore for PgStore {
    async fn insert_template(&self, template: &ContractTemplate) -> DomainResult<()> {
        sqlx::query(
            r#"
            INSERT INTO contract_templates
                (id, business_id, name, body, version, is_active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(template.id)
        .bind(template.business_id)
        .bind(&template.name)
        .bind(&template.body)
        .bind(template.version)
        .bind(template.is_active)
        .bind(template.created_at)
        .bind(template.updated_at)
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;
        Ok(())
    }

    async fn get_template(
        &self,
        business_id: Uuid,
        template_id: Uuid,
    ) -> DomainResult<Option<ContractTemplate>> {
        let row = sqlx::query(
            r#"
            SELECT id, business_id, name, body, version, is_active, created_at, updated_at
            FROM contract_templates
            WHERE business_id = $1 AND id = $2
            "#,
        )
        .bind(business_id)
        .bind(template_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_error)?;
        row.as_ref().map(template_from_row).transpose()
    }

    async fn list_templates(&self, business_id: Uuid) -> DomainResult<Vec<ContractTemplate>> {
        let rows = sqlx::query(
            r#"
            SELECT id, business_id, name, body, version, is_active, created_at, updated_at
            FROM contract_templates
            WHERE business_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(business_id)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error)?;
        rows.iter().map(template_from_row).collect()
    }
}

#[async_trait]
impl ClientStore for PgStore {
    async fn find_client_by_email(
        &self,
        business_id: Uuid,
        email: &str,
    ) -> DomainResult<Option<Client>> {
        let row = sqlx::query(
            r#"
            SELECT id, business_id, full_name, email, phone, created_at, updated_at
            FROM clients
            WHERE business_id = $1 AND email = $2
            "#,
        )
        .bind(business_id)
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_error)?;
        row.as_ref().map(client_from_row).transpose()
    }

    async fn insert_client(&self, client: &Client) -> DomainResult<()> {
        sqlx::query(
            r#"
            INSERT INTO clients
                (id, business_id, full_name, email, phone, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(client.id)
        .bind(client.business_id)
        .bind(&client.full_name)
        .bind(&client.email)
        .bind(&client.phone)
        .bind(client.created_at)
        .bind(client.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|err| insert_error(err, "client email already exists for this business"))?;
        Ok(())
    }

    async fn update_client_phone(
        &self,
        client_id: Uuid,
        phone: &str,
        now: DateTime<Utc>,
    ) -> DomainResult<()> {
        sqlx::query("UPDATE clients SET phone = $2, updated_at = $3 WHERE id = $1")
            .bind(client_id)
            .bind(phone)
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(storage_error)?;
        Ok(())
    }
}

#[async_trait]
impl ContractStore for PgStore {
    async fn insert_contract(&self, contract: &Contract) -> DomainResult<()> {
        sqlx::query(
            r#"
            INSERT INTO contracts
                (id, business_id, client_id, template_id, contract_number, title,
                 rendered_body, amount_cents, currency, status, public_token, sent_at,
                 viewed_at, signed_at, viewer_ip, signer_ip, signer_name, signer_phone,
                 signed_document_path, created_by, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12,
                    $13, $14, $15, $16, $17, $18, $19, $20, $21, $22)
            "#,
        )
        .bind(contract.id)
        .bind(contract.business_id)
        .bind(contract.client_id)
        .bind(contract.template_id)
        .bind(&contract.contract_number)
        .bind(&contract.title)
        .bind(&contract.rendered_body)
        .bind(contract.amount_cents)
        .bind(&contract.currency)
        .bind(contract.status.as_str())
        .bind(&contract.public_token)
        .bind(contract.sent_at)
        .bind(contract.viewed_at)
        .bind(contract.signed_at)
        .bind(&contract.viewer_ip)
        .bind(&contract.signer_ip)
        .bind(&contract.signer_name)
        .bind(&contract.signer_phone)
        .bind(&contract.signed_document_path)
        .bind(contract.created_by)
        .bind(contract.created_at)
        .bind(contract.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|err| insert_error(err, "contract identifier already allocated"))?;
        Ok(())
    }

    async fn get_contract(
        &self,
        business_id: Uuid,
        contract_id: Uuid,
    ) -> DomainResult<Option<Contract>> {
        let query = format!(
            "SELECT {CONTRACT_COLUMNS} FROM contracts WHERE business_id = $1 AND id = $2"
        );
        let row = sqlx::query(&query)
            .bind(business_id)
            .bind(contract_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_error)?;
        row.as_ref().map(contract_from_row).transpose()
    }

    async fn get_contract_by_id(&self, contract_id: Uuid) -> DomainResult<Option<Contract>> {
        let query = format!("SELECT {CONTRACT_COLUMNS} FROM contracts WHERE id = $1");
        let row = sqlx::query(&query)
            .bind(contract_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_error)?;
        row.as_ref().map(contract_from_row).transpose()
    }

    async fn get_contract_by_public_token(&self, token: &str) -> DomainResult<Option<Contract>> {
        let query = format!("SELECT {CONTRACT_COLUMNS} FROM contracts WHERE public_token = $1");
        let row = sqlx::query(&query)
            .bind(token)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_error)?;
        row.as_ref().map(contract_from_row).transpose()
    }

    async fn list_contracts(&self, business_id: Uuid) -> DomainResult<Vec<Contract>> {
        let query = format!(
            "SELECT {CONTRACT_COLUMNS} FROM contracts WHERE business_id = $1 ORDER BY created_at DESC"
        );
        let rows = sqlx::query(&query)
            .bind(business_id)
            .fetch_all(&self.pool)
            .await
            .map_err(storage_error)?;
        rows.iter().map(contract_from_row).collect()
    }

    async fn mark_contract_sent(
        &self,
        contract_id: Uuid,
        now: DateTime<Utc>,
    ) -> DomainResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE contracts
            SET status = 'SENT', sent_at = $2, updated_at = $2
            WHERE id = $1 AND status IN ('CREATED', 'SENT')
            "#,
        )
        .bind(contract_id)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn mark_contract_viewed(
        &self,
        contract_id: Uuid,
        viewer_ip: &str,
        now: DateTime<Utc>,
    ) -> DomainResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE contracts
            SET status = 'VIEWED', viewed_at = $3, viewer_ip = $2, updated_at = $3
            WHERE id = $1 AND status IN ('CREATED', 'SENT')
            "#,
        )
        .bind(contract_id)
        .bind(viewer_ip)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;
        Ok(result.rows_affected() > 0)
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
        let result = sqlx::query(
            r#"
            UPDATE contracts
            SET status = 'SIGNED', signed_at = $6, signer_name = $2, signer_phone = $3,
                signer_ip = $4, signed_document_path = $5, updated_at = $6
            WHERE id = $1 AND status IN ('SENT', 'VIEWED')
            "#,
        )
        .bind(contract_id)
        .bind(signer_name)
        .bind(signer_phone)
        .bind(signer_ip)
        .bind(document_path)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn mark_contract_voided(
        &self,
        contract_id: Uuid,
        now: DateTime<Utc>,
    ) -> DomainResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE contracts
            SET status = 'VOIDED', updated_at = $2
            WHERE id = $1 AND status IN ('CREATED', 'SENT', 'VIEWED')
            "#,
        )
        .bind(contract_id)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl InvoiceStore for PgStore {
    async fn insert_invoice(&self, invoice: &Invoice) -> DomainResult<()> {
        sqlx::query(
            r#"
            INSERT INTO invoices
                (id, business_id, contract_id, invoice_number, amount_cents, currency,
                 status, due_at, paid_at, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(invoice.id)
        .bind(invoice.business_id)
        .bind(invoice.contract_id)
        .bind(&invoice.invoice_number)
        .bind(invoice.amount_cents)
        .bind(&invoice.currency)
        .bind(invoice.status.as_str())
        .bind(invoice.due_at)
        .bind(invoice.paid_at)
        .bind(invoice.created_at)
        .bind(invoice.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|err| insert_error(err, "invoice already exists for this contract"))?;
        Ok(())
    }

    async fn get_invoice(
        &self,
        business_id: Uuid,
        invoice_id: Uuid,
    ) -> DomainResult<Option<Invoice>> {
        let query =
            format!("SELECT {INVOICE_COLUMNS} FROM invoices WHERE business_id = $1 AND id = $2");
        let row = sqlx::query(&query)
            .bind(business_id)
            .bind(invoice_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_error)?;
        row.as_ref().map(invoice_from_row).transpose()
    }

    async fn get_invoice_by_id(&self, invoice_id: Uuid) -> DomainResult<Option<Invoice>> {
        let query = format!("SELECT {INVOICE_COLUMNS} FROM invoices WHERE id = $1");
        let row = sqlx::query(&query)
            .bind(invoice_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_error)?;
        row.as_ref().map(invoice_from_row).transpose()
    }

    async fn get_invoice_by_contract(&self, contract_id: Uuid) -> DomainResult<Option<Invoice>> {
        let query = format!("SELECT {INVOICE_COLUMNS} FROM invoices WHERE contract_id = $1");
        let row = sqlx::query(&query)
            .bind(contract_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_error)?;
        row.as_ref().map(invoice_from_row).transpose()
    }
}

#[async_trait]
impl PaymentStore for PgStore {
    async fn insert_payment(&self, payment: &Payment) -> DomainResult<()> {
        sqlx::query(
            r#"
            INSERT INTO payments
                (id, business_id, invoice_id, provider, provider_payment_id, amount_cents,
                 currency, status, checkout_url, provider_payload, paid_at,
                 webhook_verified_at, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(payment.id)
        .bind(payment.business_id)
        .bind(payment.invoice_id)
        .bind(payment.provider.as_str())
        .bind(&payment.provider_payment_id)
        .bind(payment.amount_cents)
        .bind(&payment.currency)
        .bind(payment.status.as_str())
        .bind(&payment.checkout_url)
        .bind(&payment.provider_payload)
        .bind(payment.paid_at)
        .bind(payment.webhook_verified_at)
        .bind(payment.created_at)
        .bind(payment.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|err| insert_error(err, "provider payment reference already recorded"))?;
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
        sqlx::query(
            r#"
            UPDATE payments
            SET provider_payment_id = $2, checkout_url = $3, provider_payload = $4,
                updated_at = $5
            WHERE id = $1
            "#,
        )
        .bind(payment_id)
        .bind(provider_payment_id)
        .bind(checkout_url)
        .bind(payload)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|err| insert_error(err, "provider payment reference already recorded"))?;
        Ok(())
    }

    async fn get_payment(
        &self,
        business_id: Uuid,
        payment_id: Uuid,
    ) -> DomainResult<Option<Payment>> {
        let query =
            format!("SELECT {PAYMENT_COLUMNS} FROM payments WHERE business_id = $1 AND id = $2");
        let row = sqlx::query(&query)
            .bind(business_id)
            .bind(payment_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_error)?;
        row.as_ref().map(payment_from_row).transpose()
    }

    async fn get_payment_by_provider_ref(
        &self,
        provider: PaymentProvider,
        provider_payment_id: &str,
    ) -> DomainResult<Option<Payment>> {
        let query = format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE provider = $1 AND provider_payment_id = $2"
        );
        let row = sqlx::query(&query)
            .bind(provider.as_str())
            .bind(provider_payment_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_error)?;
        row.as_ref().map(payment_from_row).transpose()
    }

    async fn apply_webhook_outcome(&self, outcome: &WebhookOutcome) -> DomainResult<()> {
        let mut tx = self.pool.begin().await.map_err(storage_error)?;

        sqlx::query(
            r#"
            UPDATE payments
            SET status = $2, provider_payload = $3, webhook_verified_at = $4,
                paid_at = COALESCE(paid_at, $5), updated_at = $4
            WHERE id = $1
            "#,
        )
        .bind(outcome.payment_id)
        .bind(outcome.status.as_str())
        .bind(&outcome.merged_payload)
        .bind(outcome.verified_at)
        .bind(outcome.paid_at)
        .execute(&mut *tx)
        .await
        .map_err(storage_error)?;

        if let Some(paid) = &outcome.mark_paid {
            sqlx::query(
                r#"
                UPDATE invoices
                SET status = 'PAID', paid_at = COALESCE(paid_at, $2), updated_at = $2
                WHERE id = $1
                "#,
            )
            .bind(paid.invoice_id)
            .bind(outcome.verified_at)
            .execute(&mut *tx)
            .await
            .map_err(storage_error)?;

            sqlx::query(
                r#"
                UPDATE contracts
                SET status = 'PAID', updated_at = $2
                WHERE id = $1 AND status = 'SIGNED'
                "#,
            )
            .bind(paid.contract_id)
            .bind(outcome.verified_at)
            .execute(&mut *tx)
            .await
            .map_err(storage_error)?;
        }

        tx.commit().await.map_err(storage_error)?;
        Ok(())
    }
}

#[async_trait]
impl AuditStore for PgStore {
    async fn record_audit(&self, record: &AuditRecord) -> DomainResult<()> {
        sqlx::query(
            r#"
            INSERT INTO audit_logs
                (business_id, user_id, action, entity_type, entity_id, ip, metadata, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(record.business_id)
        .bind(record.user_id)
        .bind(&record.action)
        .bind(&record.entity_type)
        .bind(&record.entity_id)
        .bind(&record.ip)
        .bind(&record.metadata)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;
        Ok(())
    }
}
