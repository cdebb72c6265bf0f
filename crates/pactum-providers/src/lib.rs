use std::collections::HashMap;
use std::sync::Arc;

use hmac::{Hmac, Mac};
use pactum_core::model::PaymentProvider;
use serde_json::{Value, json};
use sha2::Sha256;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

/// Result of a mock intent allocation. No network is involved; the mock
/// providers mint their reference and checkout URL locally.
#[derive(Debug, Clone)]
pub struct PaymentIntent {
    pub provider_payment_id: String,
    pub checkout_url: String,
    pub payload: Value,
}

/// The canonical webhook fields every provider signs, in fixed order.
#[derive(Debug, Clone, Copy)]
pub struct WebhookFields<'a> {
    pub provider_payment_id: &'a str,
    pub status: &'a str,
    pub amount_cents: i64,
}

/// One capability per mock payment processor: allocate an intent, verify a
/// callback. Verification never errors; any malformed input is just an
/// invalid signature.
pub trait ProviderAdapter: Send + Sync {
    fn provider(&self) -> PaymentProvider;
    fn create_intent(
        &self,
        payment_id: Uuid,
        amount_cents: i64,
        currency: &str,
        invoice_number: &str,
    ) -> PaymentIntent;
    fn verify_signature(&self, fields: &WebhookFields<'_>, supplied_signature: &str) -> bool;
}

fn canonical_payload(fields: &WebhookFields<'_>) -> String {
    format!(
        "{}|{}|{}",
        fields.provider_payment_id, fields.status, fields.amount_cents
    )
}

fn verify_hmac(secret: &str, fields: &WebhookFields<'_>, supplied_signature: &str) -> bool {
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(canonical_payload(fields).as_bytes());

    let Ok(supplied) = hex::decode(supplied_signature) else {
        return false;
    };
    // verify_slice is constant-time and rejects length mismatches.
    mac.verify_slice(&supplied).is_ok()
}

pub struct MockClickAdapter {
    secret: String,
}

impl MockClickAdapter {
    pub fn new(secret: &str) -> Self {
        Self {
            secret: secret.to_string(),
        }
    }
}

impl ProviderAdapter for MockClickAdapter {
    fn provider(&self) -> PaymentProvider {
        PaymentProvider::MockClick
    }

    fn create_intent(
        &self,
        _payment_id: Uuid,
        _amount_cents: i64,
        _currency: &str,
        invoice_number: &str,
    ) -> PaymentIntent {
        let provider_payment_id = format!("click_{}", Uuid::new_v4());

        PaymentIntent {
            checkout_url: format!("https://checkout.mock-click.local/pay/{provider_payment_id}"),
            payload: json!({ "invoice": invoice_number }),
            provider_payment_id,
        }
    }

    fn verify_signature(&self, fields: &WebhookFields<'_>, supplied_signature: &str) -> bool {
        verify_hmac(&self.secret, fields, supplied_signature)
    }
}

pub struct MockPaymeAdapter {
    secret: String,
}

impl MockPaymeAdapter {
    pub fn new(secret: &str) -> Self {
        Self {
            secret: secret.to_string(),
        }
    }
}

impl ProviderAdapter for MockPaymeAdapter {
    fn provider(&self) -> PaymentProvider {
        PaymentProvider::MockPayme
    }

    fn create_intent(
        &self,
        _payment_id: Uuid,
        _amount_cents: i64,
        _currency: &str,
        invoice_number: &str,
    ) -> PaymentIntent {
        let provider_payment_id = format!("payme_{}", Uuid::new_v4());

        PaymentIntent {
            checkout_url: format!("https://checkout.mock-payme.local/pay/{provider_payment_id}"),
            payload: json!({ "invoice": invoice_number }),
            provider_payment_id,
        }
    }

    fn verify_signature(&self, fields: &WebhookFields<'_>, supplied_signature: &str) -> bool {
        verify_hmac(&self.secret, fields, supplied_signature)
    }
}

/// Provider lookup table, built once at startup from configured secrets.
/// Dispatch is a map probe on the enum; there is no reflective path.
#[derive(Clone)]
pub struct ProviderRegistry {
    adapters: HashMap<PaymentProvider, Arc<dyn ProviderAdapter>>,
}

impl ProviderRegistry {
    pub fn new(click_secret: &str, payme_secret: &str) -> Self {
        let mut adapters: HashMap<PaymentProvider, Arc<dyn ProviderAdapter>> = HashMap::new();
        adapters.insert(
            PaymentProvider::MockClick,
            Arc::new(MockClickAdapter::new(click_secret)),
        );
        adapters.insert(
            PaymentProvider::MockPayme,
            Arc::new(MockPaymeAdapter::new(payme_secret)),
        );

        Self { adapters }
    }

    pub fn resolve(&self, provider: PaymentProvider) -> Option<Arc<dyn ProviderAdapter>> {
        self.adapters.get(&provider).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compute_signature(secret: &str, fields: &WebhookFields<'_>) -> String {
        let mut mac =
            HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
        mac.update(
            format!(
                "{}|{}|{}",
                fields.provider_payment_id, fields.status, fields.amount_cents
            )
            .as_bytes(),
        );
        hex::encode(mac.finalize().into_bytes())
    }

    fn sample_fields() -> WebhookFields<'static> {
        WebhookFields {
            provider_payment_id: "click_7f3a2b10-aaaa-bbbb-cccc-000000000001",
            status: "SUCCEEDED",
            amount_cents: 150000,
        }
    }

    #[test]
    fn valid_signature_is_accepted() {
        let adapter = MockClickAdapter::new("click_secret_test");
        let fields = sample_fields();
        let signature = compute_signature("click_secret_test", &fields);

        assert!(adapter.verify_signature(&fields, &signature));
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let adapter = MockClickAdapter::new("click_secret_test");
        let fields = sample_fields();
        let signature = compute_signature("another_secret", &fields);

        assert!(!adapter.verify_signature(&fields, &signature));
    }

    #[test]
    fn tampered_amount_is_rejected() {
        let adapter = MockPaymeAdapter::new("payme_secret_test");
        let fields = sample_fields();
        let signature = compute_signature("payme_secret_test", &fields);

        let tampered = WebhookFields {
            amount_cents: 150001,
            ..fields
        };
        assert!(!adapter.verify_signature(&tampered, &signature));
    }

    #[test]
    fn single_bit_flip_is_rejected() {
        let adapter = MockClickAdapter::new("click_secret_test");
        let fields = sample_fields();
        let mut signature = compute_signature("click_secret_test", &fields);

        // Flip the low bit of the last hex digit.
        let last = signature.pop().unwrap();
        let flipped = match last {
            '0' => '1',
            _ => '0',
        };
        signature.push(flipped);

        assert!(!adapter.verify_signature(&fields, &signature));
    }

    #[test]
    fn malformed_signatures_are_rejected_without_panicking() {
        let adapter = MockClickAdapter::new("click_secret_test");
        let fields = sample_fields();

        assert!(!adapter.verify_signature(&fields, ""));
        assert!(!adapter.verify_signature(&fields, "not-hex-at-all"));
        assert!(!adapter.verify_signature(&fields, "deadbeef"));
        assert!(!adapter.verify_signature(&fields, "zz"));
    }

    #[test]
    fn canonical_order_is_id_status_amount() {
        let adapter = MockClickAdapter::new("s");
        let fields = sample_fields();

        // Signature over the fields in a different order must not verify.
        let mut mac = HmacSha256::new_from_slice(b"s").unwrap();
        mac.update(
            format!(
                "{}|{}|{}",
                fields.status, fields.provider_payment_id, fields.amount_cents
            )
            .as_bytes(),
        );
        let reordered = hex::encode(mac.finalize().into_bytes());

        assert!(!adapter.verify_signature(&fields, &reordered));
        assert!(adapter.verify_signature(&fields, &compute_signature("s", &fields)));
    }

    #[test]
    fn click_intents_mint_unique_prefixed_references() {
        let adapter = MockClickAdapter::new("s");
        let first = adapter.create_intent(Uuid::new_v4(), 1000, "USD", "INV-1-1");
        let second = adapter.create_intent(Uuid::new_v4(), 1000, "USD", "INV-1-1");

        assert!(first.provider_payment_id.starts_with("click_"));
        assert_ne!(first.provider_payment_id, second.provider_payment_id);
        assert!(
            first
                .checkout_url
                .contains("checkout.mock-click.local/pay/click_")
        );
        assert_eq!(first.payload, json!({ "invoice": "INV-1-1" }));
    }

    #[test]
    fn payme_intents_use_their_own_host_and_prefix() {
        let adapter = MockPaymeAdapter::new("s");
        let intent = adapter.create_intent(Uuid::new_v4(), 2500, "EUR", "INV-2-2");

        assert!(intent.provider_payment_id.starts_with("payme_"));
        assert!(
            intent
                .checkout_url
                .starts_with("https://checkout.mock-payme.local/pay/payme_")
        );
    }

    #[test]
    fn registry_resolves_each_variant_to_its_own_secret() {
        let registry = ProviderRegistry::new("click_secret_test", "payme_secret_test");
        let fields = sample_fields();
        let click_signature = compute_signature("click_secret_test", &fields);

        let click = registry.resolve(PaymentProvider::MockClick).unwrap();
        let payme = registry.resolve(PaymentProvider::MockPayme).unwrap();

        assert_eq!(click.provider(), PaymentProvider::MockClick);
        assert_eq!(payme.provider(), PaymentProvider::MockPayme);
        assert!(click.verify_signature(&fields, &click_signature));
        assert!(!payme.verify_signature(&fields, &click_signature));
    }
}
