//! Shared application state for all routes.

use crate::bootstrap::Databases;
use crate::init::InitReport;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub databases: Arc<Databases>,
    /// Outcome of startup initialization, one entry per connection.
    pub report: Arc<InitReport>,
}

impl AppState {
    pub fn new(databases: Databases, report: InitReport) -> Self {
        AppState {
            databases: Arc::new(databases),
            report: Arc::new(report),
        }
    }
}
