use std::sync::Arc;

use crate::gateway::CollectionGateway;

#[derive(Debug, Clone, axum::extract::FromRef)]
pub struct AppState {
    pub gateway: Arc<dyn CollectionGateway>,
}

impl AppState {
    pub fn new(gateway: Arc<dyn CollectionGateway>) -> Self {
        Self { gateway }
    }
}
