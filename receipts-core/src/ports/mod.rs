//! Port definitions (hexagonal architecture)
//!
//! Ports define the interfaces for external dependencies. The flows and
//! services depend only on these traits, not on concrete implementations.

mod gateway;

pub use gateway::{AuthGateway, ReceiptCreated, ReceiptGateway};
