//! Service layer - flows and orchestration
//!
//! Each flow owns its own slice of state. `ReceiptStore` is the one shared
//! resource and is only written after the gateway confirms.

mod analytics;
mod auth;
mod collection;
mod demo;
mod edit;
pub mod logging;
mod upload;

#[cfg(test)]
pub(crate) mod test_support;

pub use analytics::{
    compare, AnalyticsReport, AnalyticsService, AnalyticsSource, Mismatch, VerificationReport,
    AMOUNT_TOLERANCE,
};
pub use auth::AuthService;
pub use collection::{CollectionService, ReceiptStore, SearchQuery};
pub use demo::DemoService;
pub use edit::{EditSession, EditState};
pub use logging::{EventCount, LogEntry, LogEvent, LoggingService};
pub use upload::{
    load_image_file, UploadFlow, UploadState, REJECTED_FILE_MESSAGE, UPLOAD_FAILED_MESSAGE,
    UPLOAD_SUCCESS_MESSAGE,
};
