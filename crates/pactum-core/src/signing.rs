use rand::Rng;
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Allocates the public bearer token for a contract: 48 hex characters
/// (192 bits) built from two random UUIDs. Uniqueness is additionally
/// enforced by the durable store's unique key.
pub fn generate_public_token() -> String {
    let head = Uuid::new_v4().simple().to_string();
    let tail = Uuid::new_v4().simple().to_string();
    format!("{head}{}", &tail[..16])
}

pub fn generate_contract_number(now_millis: i64) -> String {
    reference_number("CTR", now_millis)
}

pub fn generate_invoice_number(now_millis: i64) -> String {
    reference_number("INV", now_millis)
}

fn reference_number(prefix: &str, now_millis: i64) -> String {
    let suffix: u32 = rand::thread_rng().gen_range(0..1000);
    format!("{prefix}-{now_millis}-{suffix}")
}

/// Six numeric digits, zero-padded.
pub fn generate_otp_code() -> String {
    let code: u32 = rand::thread_rng().gen_range(0..1_000_000);
    format!("{code:06}")
}

/// Keyed hash stored in place of the raw code: sha256("{code}:{secret}")
/// hex-encoded. The raw code never reaches durable storage.
pub fn hash_otp_code(code: &str, secret: &str) -> String {
    let digest = Sha256::digest(format!("{code}:{secret}").as_bytes());
    hex::encode(digest)
}

/// Length check plus XOR fold; runtime does not depend on where the inputs
/// diverge.
pub fn constant_time_eq(left: &[u8], right: &[u8]) -> bool {
    if left.len() != right.len() {
        return false;
    }

    let mut diff = 0u8;
    for (l, r) in left.iter().zip(right.iter()) {
        diff |= l ^ r;
    }
    diff == 0
}

/// Minimal single-page PDF carrying one line of text. Fidelity is a
/// non-goal; this only needs to be a well-formed artifact that records the
/// signing event.
pub fn signed_document_bytes(content: &str) -> Vec<u8> {
    let text: String = content
        .chars()
        .filter(|c| !matches!(c, '(' | ')' | '\\'))
        .collect();

    let pdf = format!(
        "%PDF-1.1\n\
         1 0 obj<</Type/Catalog/Pages 2 0 R>>endobj\n\
         2 0 obj<</Type/Pages/Count 1/Kids[3 0 R]>>endobj\n\
         3 0 obj<</Type/Page/Parent 2 0 R/MediaBox[0 0 612 792]/Contents 4 0 R/Resources<</Font<</F1 5 0 R>>>>>>endobj\n\
         4 0 obj<</Length {}>>stream\nBT /F1 11 Tf 40 760 Td ({text}) Tj ET\nendstream endobj\n\
         5 0 obj<</Type/Font/Subtype/Type1/BaseFont/Helvetica>>endobj\n\
         xref\n0 6\n\
         0000000000 65535 f \n\
         0000000010 00000 n \n\
         0000000060 00000 n \n\
         0000000117 00000 n \n\
         0000000244 00000 n \n\
         0000000348 00000 n \n\
         trailer<</Size 6/Root 1 0 R>>\nstartxref\n408\n%%EOF",
        text.len() + 50,
    );

    pdf.into_bytes()
}
