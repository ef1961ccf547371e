use std::sync::Arc;

use crate::gateway::PaymentGateway;
use crate::notify::Notifier;
use crate::services::settlement::SettlementService;
use crate::store::Store;

/// Shared by every handler; cloning only bumps reference counts.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub settlement: Arc<SettlementService>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn Store>,
        gateway: Arc<dyn PaymentGateway>,
        notifier: Notifier,
        callback_url: impl Into<String>,
    ) -> Self {
        let settlement = SettlementService::new(store.clone(), gateway, notifier, callback_url);
        Self {
            store,
            settlement: Arc::new(settlement),
        }
    }
}
