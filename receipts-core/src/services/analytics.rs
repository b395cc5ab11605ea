//! Analytics service - server aggregate or client-side computation
//!
//! The server aggregate is used verbatim by default. When it cannot be
//! fetched, the aggregate is computed from the receipt collection with the
//! same filter applied locally. `verify` computes both and compares them.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::result::{Error, Result};
use crate::domain::{AnalyticsAggregate, AnalyticsFilter};
use crate::ports::ReceiptGateway;

use super::collection::ReceiptStore;

/// Amounts closer than this are considered equal when verifying
pub const AMOUNT_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Where the aggregate comes from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalyticsSource {
    #[default]
    Server,
    Client,
}

impl fmt::Display for AnalyticsSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalyticsSource::Server => f.write_str("server"),
            AnalyticsSource::Client => f.write_str("client"),
        }
    }
}

impl FromStr for AnalyticsSource {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "server" => Ok(AnalyticsSource::Server),
            "client" => Ok(AnalyticsSource::Client),
            other => Err(Error::validation(format!("Unknown analytics source: {}", other))),
        }
    }
}

/// An aggregate and the source it actually came from
#[derive(Debug, Clone, Serialize)]
pub struct AnalyticsReport {
    pub source: AnalyticsSource,
    /// Set when the server was asked but the client computed instead
    pub fell_back: bool,
    pub aggregate: AnalyticsAggregate,
}

/// One disagreement between server and client aggregates
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Mismatch {
    pub field: String,
    pub server: String,
    pub client: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct VerificationReport {
    pub server: AnalyticsAggregate,
    pub client: AnalyticsAggregate,
    pub mismatches: Vec<Mismatch>,
}

impl VerificationReport {
    pub fn is_consistent(&self) -> bool {
        self.mismatches.is_empty()
    }
}

pub struct AnalyticsService {
    gateway: Arc<dyn ReceiptGateway>,
    store: Arc<ReceiptStore>,
}

impl AnalyticsService {
    pub fn new(gateway: Arc<dyn ReceiptGateway>, store: Arc<ReceiptStore>) -> Self {
        Self { gateway, store }
    }

    /// Aggregate from the requested source
    ///
    /// A server failure falls back to client computation; if that also
    /// fails, the server error is returned.
    pub async fn fetch(
        &self,
        source: AnalyticsSource,
        filter: &AnalyticsFilter,
    ) -> Result<AnalyticsReport> {
        match source {
            AnalyticsSource::Client => Ok(AnalyticsReport {
                source,
                fell_back: false,
                aggregate: self.compute(filter).await?,
            }),
            AnalyticsSource::Server => match self.gateway.fetch_analytics(filter).await {
                Ok(aggregate) => Ok(AnalyticsReport {
                    source,
                    fell_back: false,
                    aggregate,
                }),
                Err(server_error) => match self.compute(filter).await {
                    Ok(aggregate) => Ok(AnalyticsReport {
                        source: AnalyticsSource::Client,
                        fell_back: true,
                        aggregate,
                    }),
                    Err(_) => Err(server_error),
                },
            },
        }
    }

    /// Compute the aggregate from the collection
    ///
    /// An empty local collection is loaded from the gateway first.
    pub async fn compute(&self, filter: &AnalyticsFilter) -> Result<AnalyticsAggregate> {
        if self.store.is_empty() {
            let receipts = self.gateway.list_receipts().await?;
            self.store.replace_all(receipts);
        }
        let receipts = self.store.get();
        Ok(AnalyticsAggregate::from_receipts(
            receipts.iter().filter(|r| filter.matches(r)),
        ))
    }

    /// Compare the server aggregate against a client computation
    pub async fn verify(&self, filter: &AnalyticsFilter) -> Result<VerificationReport> {
        let server = self.gateway.fetch_analytics(filter).await?;
        let client = self.compute(filter).await?;
        let mismatches = compare(&server, &client);
        Ok(VerificationReport {
            server,
            client,
            mismatches,
        })
    }
}

/// Counts must match exactly; amounts within one cent
pub fn compare(server: &AnalyticsAggregate, client: &AnalyticsAggregate) -> Vec<Mismatch> {
    let mut mismatches = Vec::new();
    let mut push = |field: &str, server: String, client: String| {
        mismatches.push(Mismatch {
            field: field.to_string(),
            server,
            client,
        })
    };

    if server.receipt_count != client.receipt_count {
        push(
            "receipt_count",
            server.receipt_count.to_string(),
            client.receipt_count.to_string(),
        );
    }
    if !amounts_match(server.total_spent, client.total_spent) {
        push(
            "total_spent",
            server.total_spent.to_string(),
            client.total_spent.to_string(),
        );
    }
    let averages_match = match (server.average_amount, client.average_amount) {
        (Some(a), Some(b)) => amounts_match(a, b),
        (None, None) => true,
        _ => false,
    };
    if !averages_match {
        push(
            "average_amount",
            format_optional(server.average_amount),
            format_optional(client.average_amount),
        );
    }

    for (vendor, client_totals) in client.vendor_summary.iter() {
        match server.vendor_summary.get(vendor) {
            Some(server_totals) => {
                if server_totals.count != client_totals.count
                    || !amounts_match(server_totals.total, client_totals.total)
                {
                    push(
                        &format!("vendor_summary.{}", vendor),
                        format!("{} / {}", server_totals.count, server_totals.total),
                        format!("{} / {}", client_totals.count, client_totals.total),
                    );
                }
            }
            None => push(
                &format!("vendor_summary.{}", vendor),
                "-".to_string(),
                format!("{} / {}", client_totals.count, client_totals.total),
            ),
        }
    }
    for (vendor, server_totals) in server.vendor_summary.iter() {
        if client.vendor_summary.get(vendor).is_none() {
            push(
                &format!("vendor_summary.{}", vendor),
                format!("{} / {}", server_totals.count, server_totals.total),
                "-".to_string(),
            );
        }
    }

    mismatches
}

fn amounts_match(a: Decimal, b: Decimal) -> bool {
    (a - b).abs() <= AMOUNT_TOLERANCE
}

fn format_optional(value: Option<Decimal>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}
