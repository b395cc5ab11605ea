//! Remote gateway port - receipt service abstraction

use async_trait::async_trait;
use serde::Serialize;

use crate::domain::result::Result;
use crate::domain::{
    AnalyticsAggregate, AnalyticsFilter, ImageFile, LoginRedirect, Receipt, Session, User,
};

/// Outcome of a successful upload
///
/// The service answers with the new id, and some deployments echo the full
/// record. A `Receipt` is only ever built from a server response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReceiptCreated {
    pub receipt_id: Option<i64>,
    pub receipt: Option<Receipt>,
    pub message: Option<String>,
}

/// Receipt service abstraction
///
/// Every call is a suspension point; implementations classify failures into
/// the core `Error` taxonomy and never retry.
#[async_trait]
pub trait ReceiptGateway: Send + Sync {
    /// Gateway name (e.g., "http", "demo")
    fn name(&self) -> &str;

    /// Submit a receipt image for processing
    ///
    /// Callers must have checked that the file is an image.
    async fn upload(&self, image: &ImageFile) -> Result<ReceiptCreated>;

    /// Fetch the full receipt collection
    async fn list_receipts(&self) -> Result<Vec<Receipt>>;

    /// Search receipts with a pre-encoded query string, passed through as-is
    async fn search_receipts(&self, query: &str) -> Result<Vec<Receipt>>;

    /// Update a receipt's fields
    ///
    /// Returns the stored record when the service echoes it, `None` when it
    /// only confirms.
    async fn update_receipt(&self, id: i64, fields: &Receipt) -> Result<Option<Receipt>>;

    /// Delete a receipt
    async fn delete_receipt(&self, id: i64) -> Result<()>;

    /// Fetch the precomputed spending aggregate
    async fn fetch_analytics(&self, filter: &AnalyticsFilter) -> Result<AnalyticsAggregate>;
}

/// Authentication endpoints
///
/// Credentials are carried by the transport (session cookie); this port only
/// asks for them to be included.
#[async_trait]
pub trait AuthGateway: Send + Sync {
    /// URL to send the user to for sign-in
    async fn login_redirect_url(&self) -> Result<LoginRedirect>;

    /// Current session user; `Error::Unauthenticated` when signed out
    async fn session_user(&self) -> Result<User>;

    /// End the current session
    async fn logout(&self) -> Result<()>;

    /// Exchange an authorization code for a session
    async fn exchange_auth_code(&self, code: &str) -> Result<Session>;
}
