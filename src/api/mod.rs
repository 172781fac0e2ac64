//! HTTP trigger for the payout job
//!
//! - `GET /api/cron/payout` runs one scan and reports what it did
//! - `GET /health` reports liveness and whether a scan is in flight

mod handlers;

pub use handlers::{create_api_router, ErrorBody, PayoutResponse};

use std::sync::Arc;

use crate::orchestrator::ScanOrchestrator;

/// Shared state for API handlers
#[derive(Clone)]
pub struct ApiState {
    pub orchestrator: Arc<ScanOrchestrator>,
    /// Bearer token the cron scheduler must present, when set
    pub cron_secret: Option<String>,
}

impl ApiState {
    pub fn new(orchestrator: Arc<ScanOrchestrator>, cron_secret: Option<String>) -> Arc<Self> {
        Arc::new(Self {
            orchestrator,
            cron_secret,
        })
    }
}
