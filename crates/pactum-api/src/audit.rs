use std::sync::Arc;

use pactum_core::{AuditRecord, Store};
use tracing::warn;

/// Fire-and-forget audit trail. Writes happen on a spawned task so the
/// primary operation never waits on, or fails because of, the trail.
#[derive(Clone)]
pub struct AuditSink {
    store: Arc<dyn Store>,
}

impl AuditSink {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub fn record(&self, record: AuditRecord) {
        let store = self.store.clone();
        tokio::spawn(async move {
            if let Err(err) = store.record_audit(&record).await {
                warn!("audit write for {} failed: {err}", record.action);
            }
        });
    }
}
