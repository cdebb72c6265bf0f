use std::path::PathBuf;

use anyhow::{Context, Result};

/// Immutable domain configuration threaded into components at construction.
/// Nothing below the HTTP boundary reads the environment directly.
#[derive(Clone, Debug)]
pub struct DomainSettings {
    /// Prefix of the shareable link; the public token is appended to it.
    pub public_link_base_url: String,
    /// TTL of the cached token -> contract-id mapping. The durable store
    /// remains the source of truth after expiry.
    pub public_link_ttl_seconds: u64,
    pub otp_ttl_seconds: u64,
    /// Server-side key folded into the OTP hash.
    pub otp_hash_secret: String,
    pub click_webhook_secret: String,
    pub payme_webhook_secret: String,
    pub signed_documents_dir: PathBuf,
}

#[derive(Clone, Debug)]
pub struct ServiceConfig {
    pub database_url: String,
    pub redis_url: String,
    pub http_addr: String,
    pub domain: DomainSettings,
}

impl ServiceConfig {
    pub fn from_env(default_http_addr: &str) -> Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL is required")?;
        let redis_url = std::env::var("REDIS_URL").context("REDIS_URL is required")?;
        let http_addr =
            std::env::var("HTTP_ADDR").unwrap_or_else(|_| default_http_addr.to_string());

        Ok(Self {
            database_url,
            redis_url,
            http_addr,
            domain: DomainSettings::from_env()?,
        })
    }
}

impl DomainSettings {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            public_link_base_url: env_or(
                "PUBLIC_LINK_BASE_URL",
                "http://localhost:8080/public/contracts",
            ),
            public_link_ttl_seconds: env_seconds("PUBLIC_LINK_TTL_SECONDS", 120)?,
            otp_ttl_seconds: env_seconds("OTP_TTL_SECONDS", 300)?,
            otp_hash_secret: env_or("OTP_HASH_SECRET", "otp_secret_dev"),
            click_webhook_secret: env_or("CLICK_WEBHOOK_SECRET", "click_secret_dev"),
            payme_webhook_secret: env_or("PAYME_WEBHOOK_SECRET", "payme_secret_dev"),
            signed_documents_dir: PathBuf::from(env_or(
                "SIGNED_DOCUMENTS_DIR",
                "storage/signed-contracts",
            )),
        })
    }
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn env_seconds(name: &str, default: u64) -> Result<u64> {
    match std::env::var(name) {
        Ok(raw) => raw
            .parse()
            .with_context(|| format!("{name} must be a number of seconds")),
        Err(_) => Ok(default),
    }
}
