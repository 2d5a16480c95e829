use std::sync::Arc;

use crate::errors::AppError;
use crate::services::background_service::DiscoveryService;

#[derive(Clone)]
pub struct AppState {
    /// `None` when the service could not be constructed; routes then answer 503.
    pub discovery: Option<Arc<DiscoveryService>>,
}

impl AppState {
    pub fn service(&self) -> Result<&DiscoveryService, AppError> {
        self.discovery.as_deref().ok_or(AppError::Unavailable)
    }
}
