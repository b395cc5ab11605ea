//! Receipts Core - client-side receipt lifecycle and spending analytics
//!
//! This crate follows a hexagonal layout:
//!
//! - **domain**: Receipts, drafts, filters, the analytics aggregate
//! - **ports**: Trait definitions for the remote receipt service
//! - **services**: The collection store and the edit, upload and analytics flows
//! - **adapters**: HTTP client for the receipt service, demo gateway

pub mod adapters;
pub mod config;
pub mod domain;
mod log_migrations;
pub mod ports;
pub mod services;

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;

use adapters::demo::DemoGateway;
use adapters::http::HttpGateway;
use config::Config;
use ports::{AuthGateway, ReceiptGateway};
use services::*;

// Re-export commonly used types at crate root
pub use domain::result::{Error, ErrorCategory, OperationResult};
pub use domain::{
    AnalyticsAggregate, AnalyticsFilter, Draft, ImageFile, Receipt, ReceiptField, SearchFilter,
    SessionState, StatusMessage, User,
};
pub use services::{LogEntry, LogEvent, LoggingService};

/// Main context for receipt operations
///
/// Wires one gateway into every flow. All flows share the same
/// `ReceiptStore`.
pub struct ReceiptsContext {
    pub config: Config,
    pub gateway: Arc<dyn ReceiptGateway>,
    pub store: Arc<ReceiptStore>,
    pub collection_service: CollectionService,
    pub edit_session: EditSession,
    pub upload_flow: UploadFlow,
    pub analytics_service: AnalyticsService,
    pub auth_service: AuthService,
}

impl ReceiptsContext {
    /// Create a context from the settings in `receipts_dir`
    ///
    /// Demo mode uses the demo gateway persisted in `receipts_dir`;
    /// otherwise the HTTP gateway for the configured service.
    pub fn new(receipts_dir: &Path) -> Result<Self> {
        let config = Config::load(receipts_dir)?;

        if config.demo_mode {
            let demo = Arc::new(DemoGateway::open(receipts_dir)?);
            Ok(Self::with_gateways(config, demo.clone(), demo))
        } else {
            let http = Arc::new(HttpGateway::new_with_base_url(
                &config.api_base_url,
                config.request_timeout,
            )?);
            Ok(Self::with_gateways(config, http.clone(), http))
        }
    }

    /// Create a context over explicit gateways
    pub fn with_gateways(
        config: Config,
        gateway: Arc<dyn ReceiptGateway>,
        auth_gateway: Arc<dyn AuthGateway>,
    ) -> Self {
        let store = Arc::new(ReceiptStore::new());

        let collection_service = CollectionService::new(Arc::clone(&gateway), Arc::clone(&store));
        let edit_session = EditSession::new(Arc::clone(&gateway), Arc::clone(&store));
        let upload_flow = UploadFlow::new(Arc::clone(&gateway), Arc::clone(&store));
        let analytics_service = AnalyticsService::new(Arc::clone(&gateway), Arc::clone(&store));
        let auth_service = AuthService::new(auth_gateway);

        Self {
            config,
            gateway,
            store,
            collection_service,
            edit_session,
            upload_flow,
            analytics_service,
            auth_service,
        }
    }

    /// Name of the gateway in use ("http" or "demo")
    pub fn gateway_name(&self) -> &str {
        self.gateway.name()
    }
}
