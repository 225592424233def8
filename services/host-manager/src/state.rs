//! Application state shared across request handlers.

use std::sync::Arc;

use crate::service::HostService;

/// Shared application state.
///
/// This is passed to all request handlers via Axum's state extractor.
#[derive(Clone)]
pub struct AppState {
    hosts: Arc<HostService>,
}

impl AppState {
    pub fn new(hosts: Arc<HostService>) -> Self {
        Self { hosts }
    }

    pub fn hosts(&self) -> &HostService {
        &self.hosts
    }
}
