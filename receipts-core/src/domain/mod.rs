//! Core domain entities
//!
//! Receipt data, the derived analytics aggregate, and the small value types
//! the flows pass around. Pure data with validation - no I/O.

pub mod analytics;
pub mod filter;
mod receipt;
pub mod result;
mod status;
mod upload;
mod user;
pub mod view;

pub use analytics::{AnalyticsAggregate, VendorShare, VendorSummary, VendorTotal};
pub use filter::{AnalyticsFilter, SearchFilter};
pub use receipt::{normalize_location, parse_amount, Draft, Receipt, ReceiptField, MISSING_LOCATION};
pub use status::{StatusKind, StatusMessage};
pub use upload::{content_type_for, ImageFile};
pub use user::{LoginRedirect, Session, SessionState, User};
