use std::sync::Arc;

use pactum_core::Store;
use pactum_platform::{Cache, DomainSettings};
use pactum_providers::ProviderRegistry;

use crate::audit::AuditSink;

/// Shared handler state. Everything is cheaply cloneable; the store and
/// cache are behind trait objects so tests can run the real router against
/// the in-memory implementations.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub cache: Arc<dyn Cache>,
    pub providers: ProviderRegistry,
    pub settings: Arc<DomainSettings>,
    pub audit: AuditSink,
}
