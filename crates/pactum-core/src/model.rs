use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Contract lifecycle. Transitions are forward-only; `Voided` absorbs any
/// pre-signature state and `Paid`/`Voided` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContractStatus {
    Created,
    Sent,
    Viewed,
    Signed,
    Paid,
    Voided,
}

impl ContractStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContractStatus::Created => "CREATED",
            ContractStatus::Sent => "SENT",
            ContractStatus::Viewed => "VIEWED",
            ContractStatus::Signed => "SIGNED",
            ContractStatus::Paid => "PAID",
            ContractStatus::Voided => "VOIDED",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "CREATED" => Some(ContractStatus::Created),
            "SENT" => Some(ContractStatus::Sent),
            "VIEWED" => Some(ContractStatus::Viewed),
            "SIGNED" => Some(ContractStatus::Signed),
            "PAID" => Some(ContractStatus::Paid),
            "VOIDED" => Some(ContractStatus::Voided),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ContractStatus::Paid | ContractStatus::Voided)
    }

    /// The full edge set of the lifecycle graph. Self-loops for idempotent
    /// operations (re-send, repeat view) are not edges; callers treat them
    /// as no-ops before consulting this table.
    pub fn may_transition(self, next: ContractStatus) -> bool {
        use ContractStatus::*;

        matches!(
            (self, next),
            (Created, Sent)
                | (Created, Viewed)
                | (Sent, Viewed)
                | (Sent, Signed)
                | (Viewed, Signed)
                | (Signed, Paid)
                | (Created, Voided)
                | (Sent, Voided)
                | (Viewed, Voided)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvoiceStatus {
    Pending,
    Paid,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Pending => "PENDING",
            InvoiceStatus::Paid => "PAID",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "PENDING" => Some(InvoiceStatus::Pending),
            "PAID" => Some(InvoiceStatus::Paid),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Initiated,
    Succeeded,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Initiated => "INITIATED",
            PaymentStatus::Succeeded => "SUCCEEDED",
            PaymentStatus::Failed => "FAILED",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "INITIATED" => Some(PaymentStatus::Initiated),
            "SUCCEEDED" => Some(PaymentStatus::Succeeded),
            "FAILED" => Some(PaymentStatus::Failed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PaymentStatus::Succeeded | PaymentStatus::Failed)
    }
}

/// The fixed set of supported mock payment processors. Adding a provider
/// means adding a variant plus an adapter; there is no runtime plugin path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentProvider {
    MockClick,
    MockPayme,
}

impl PaymentProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentProvider::MockClick => "MOCK_CLICK",
            PaymentProvider::MockPayme => "MOCK_PAYME",
        }
    }

    /// Case-insensitive parse, used for route segments and request bodies.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "MOCK_CLICK" => Some(PaymentProvider::MockClick),
            "MOCK_PAYME" => Some(PaymentProvider::MockPayme),
            _ => None,
        }
    }
}

/// Tenant row. Managed by the identity side of the platform; this system
/// only reads it for rendering and scoping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Business {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Client {
    pub id: Uuid,
    pub business_id: Uuid,
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractTemplate {
    pub id: Uuid,
    pub business_id: Uuid,
    pub name: String,
    pub body: String,
    pub version: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contract {
    pub id: Uuid,
    pub business_id: Uuid,
    pub client_id: Uuid,
    pub template_id: Uuid,
    pub contract_number: String,
    pub title: String,
    /// Placeholder-substituted snapshot taken at creation, never recomputed.
    pub rendered_body: String,
    pub amount_cents: i64,
    pub currency: String,
    pub status: ContractStatus,
    /// Sole bearer credential for the public flow; unique and never reused.
    pub public_token: String,
    pub sent_at: Option<DateTime<Utc>>,
    pub viewed_at: Option<DateTime<Utc>>,
    pub signed_at: Option<DateTime<Utc>>,
    pub viewer_ip: Option<String>,
    pub signer_ip: Option<String>,
    pub signer_name: Option<String>,
    pub signer_phone: Option<String>,
    pub signed_document_path: Option<String>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    pub id: Uuid,
    pub business_id: Uuid,
    pub contract_id: Uuid,
    pub invoice_number: String,
    pub amount_cents: i64,
    pub currency: String,
    pub status: InvoiceStatus,
    pub due_at: Option<DateTime<Utc>>,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: Uuid,
    pub business_id: Uuid,
    pub invoice_id: Uuid,
    pub provider: PaymentProvider,
    /// Allocated by the provider adapter after the row exists; NULL until
    /// then so the (provider, reference) unique key only binds real refs.
    pub provider_payment_id: Option<String>,
    pub amount_cents: i64,
    pub currency: String,
    pub status: PaymentStatus,
    pub checkout_url: Option<String>,
    /// Opaque audit trail; webhook bodies merge into it, never replace it.
    pub provider_payload: Value,
    pub paid_at: Option<DateTime<Utc>>,
    pub webhook_verified_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input shape for the fire-and-forget audit sink. The store assigns the
/// row id and timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    pub action: String,
    pub entity_type: String,
    pub entity_id: Option<String>,
    pub business_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub ip: Option<String>,
    pub metadata: Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contract_status_round_trips_through_text() {
        for status in [
            ContractStatus::Created,
            ContractStatus::Sent,
            ContractStatus::Viewed,
            ContractStatus::Signed,
            ContractStatus::Paid,
            ContractStatus::Voided,
        ] {
            assert_eq!(ContractStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(ContractStatus::parse("SHIPPED"), None);
    }

    #[test]
    fn lifecycle_edges_are_forward_only() {
        use ContractStatus::*;

        assert!(Created.may_transition(Sent));
        assert!(Sent.may_transition(Viewed));
        assert!(Viewed.may_transition(Signed));
        assert!(Signed.may_transition(Paid));
        assert!(Viewed.may_transition(Voided));

        // No regression edges exist anywhere in the graph.
        for from in [Sent, Viewed, Signed, Paid, Voided] {
            assert!(!from.may_transition(Created));
        }
        assert!(!Signed.may_transition(Sent));
        assert!(!Viewed.may_transition(Sent));
        assert!(!Paid.may_transition(Signed));
    }

    #[test]
    fn terminal_states_have_no_outgoing_edges() {
        use ContractStatus::*;

        for terminal in [Paid, Voided] {
            assert!(terminal.is_terminal());
            for next in [Created, Sent, Viewed, Signed, Paid, Voided] {
                assert!(!terminal.may_transition(next));
            }
        }
    }

    #[test]
    fn signed_contracts_cannot_be_voided() {
        assert!(!ContractStatus::Signed.may_transition(ContractStatus::Voided));
        assert!(!ContractStatus::Paid.may_transition(ContractStatus::Voided));
    }

    #[test]
    fn provider_parse_is_case_insensitive() {
        assert_eq!(
            PaymentProvider::parse("mock_click"),
            Some(PaymentProvider::MockClick)
        );
        assert_eq!(
            PaymentProvider::parse(" MOCK_PAYME "),
            Some(PaymentProvider::MockPayme)
        );
        assert_eq!(PaymentProvider::parse("stripe"), None);
    }

    #[test]
    fn status_enums_serialize_screaming_snake() {
        assert_eq!(
            serde_json::to_string(&ContractStatus::Viewed).unwrap(),
            "\"VIEWED\""
        );
        assert_eq!(
            serde_json::to_string(&PaymentStatus::Succeeded).unwrap(),
            "\"SUCCEEDED\""
        );
        assert_eq!(
            serde_json::to_string(&PaymentProvider::MockPayme).unwrap(),
            "\"MOCK_PAYME\""
        );
    }
}
