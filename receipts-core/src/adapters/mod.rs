//! Adapter implementations
//!
//! Adapters implement the port traits with concrete technologies:
//! - reqwest HTTP client for the receipt service
//! - Local demo gateway for trying the client without a backend

pub mod demo;
pub mod http;

#[cfg(test)]
pub mod mock_server;
