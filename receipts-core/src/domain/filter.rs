//! Search and analytics filters
//!
//! Both encode to the query strings the receipt service understands.
//! `AnalyticsFilter` can also be applied locally so client-side analytics
//! cover the same receipts as the server would.

use chrono::Datelike;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use url::form_urlencoded;

use super::receipt::Receipt;

/// Filters accepted by the receipt search endpoint
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchFilter {
    pub vendor: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub bill_type: Option<String>,
    /// Exact calendar date, `YYYY-MM-DD`
    pub date: Option<String>,
    pub min_amount: Option<Decimal>,
    pub max_amount: Option<Decimal>,
}

impl SearchFilter {
    pub fn is_empty(&self) -> bool {
        self.to_query_string().is_empty()
    }

    /// Percent-encoded query string, empty values omitted
    pub fn to_query_string(&self) -> String {
        let min = self.min_amount.map(|a| a.to_string());
        let max = self.max_amount.map(|a| a.to_string());
        encode(&[
            ("vendor", self.vendor.as_deref()),
            ("city", self.city.as_deref()),
            ("state", self.state.as_deref()),
            ("country", self.country.as_deref()),
            ("bill_type", self.bill_type.as_deref()),
            ("date", self.date.as_deref()),
            ("min_amount", min.as_deref()),
            ("max_amount", max.as_deref()),
        ])
    }

    /// Parse a query string produced by `to_query_string`
    ///
    /// Unknown keys and unparseable amounts are ignored.
    pub fn from_query_string(query: &str) -> Self {
        let mut filter = Self::default();
        for (key, value) in form_urlencoded::parse(query.trim_start_matches('?').as_bytes()) {
            let value = value.trim().to_string();
            if value.is_empty() {
                continue;
            }
            match key.as_ref() {
                "vendor" => filter.vendor = Some(value),
                "city" => filter.city = Some(value),
                "state" => filter.state = Some(value),
                "country" => filter.country = Some(value),
                "bill_type" => filter.bill_type = Some(value),
                "date" => filter.date = Some(value),
                "min_amount" => filter.min_amount = value.parse().ok(),
                "max_amount" => filter.max_amount = value.parse().ok(),
                _ => {}
            }
        }
        filter
    }

    /// Local equivalent of the server-side search
    pub fn matches(&self, receipt: &Receipt) -> bool {
        if let Some(date) = self.date.as_deref().map(str::trim).filter(|d| !d.is_empty()) {
            if receipt.display_date() != date {
                return false;
            }
        }
        if self.min_amount.is_some_and(|min| receipt.total_amount < min) {
            return false;
        }
        if self.max_amount.is_some_and(|max| receipt.total_amount > max) {
            return false;
        }

        contains(&receipt.vendor_name, self.vendor.as_deref())
            && contains(&receipt.city, self.city.as_deref())
            && contains(&receipt.state, self.state.as_deref())
            && contains(&receipt.country, self.country.as_deref())
            && contains(&receipt.bill_type, self.bill_type.as_deref())
    }
}

/// Filters accepted by the analytics endpoint
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsFilter {
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub vendor_name: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub bill_type: Option<String>,
}

impl AnalyticsFilter {
    pub fn is_empty(&self) -> bool {
        self.to_query_string().is_empty()
    }

    pub fn to_query_string(&self) -> String {
        let year = self.year.map(|y| y.to_string());
        let month = self.month.map(|m| m.to_string());
        encode(&[
            ("year", year.as_deref()),
            ("month", month.as_deref()),
            ("vendor_name", self.vendor_name.as_deref()),
            ("city", self.city.as_deref()),
            ("state", self.state.as_deref()),
            ("country", self.country.as_deref()),
            ("bill_type", self.bill_type.as_deref()),
        ])
    }

    /// Whether a receipt falls inside this filter
    ///
    /// Text filters are case-insensitive substring matches; year and month
    /// match the receipt date exactly. A receipt without a parseable date
    /// never matches a date filter.
    pub fn matches(&self, receipt: &Receipt) -> bool {
        if self.year.is_some() || self.month.is_some() {
            let Some(date) = receipt.date() else {
                return false;
            };
            if self.year.is_some_and(|y| date.year() != y) {
                return false;
            }
            if self.month.is_some_and(|m| date.month() != m) {
                return false;
            }
        }

        contains(&receipt.vendor_name, self.vendor_name.as_deref())
            && contains(&receipt.city, self.city.as_deref())
            && contains(&receipt.state, self.state.as_deref())
            && contains(&receipt.country, self.country.as_deref())
            && contains(&receipt.bill_type, self.bill_type.as_deref())
    }
}

/// Case-insensitive substring match on the stored value
///
/// Locations are matched as stored, `"nan"` included, the same way the
/// server's `ilike` sees them.
fn contains(value: &str, needle: Option<&str>) -> bool {
    match needle.map(str::trim).filter(|n| !n.is_empty()) {
        Some(n) => value.to_lowercase().contains(&n.to_lowercase()),
        None => true,
    }
}

fn encode(pairs: &[(&str, Option<&str>)]) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, value) in pairs {
        if let Some(v) = value.map(str::trim).filter(|v| !v.is_empty()) {
            serializer.append_pair(key, v);
        }
    }
    serializer.finish()
}
