//! Spending aggregate over a set of receipts

use std::fmt;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::receipt::{deserialize_amount, serialize_amount, Receipt};

/// Per-vendor receipt count and spend
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VendorTotal {
    pub count: u64,
    #[serde(deserialize_with = "deserialize_amount", serialize_with = "serialize_amount")]
    pub total: Decimal,
}

/// Vendor name to totals, in first-encountered order
///
/// Order matters: it is the tie-breaker when two vendors have the same
/// total, so this is a list rather than a hash map.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VendorSummary {
    entries: Vec<(String, VendorTotal)>,
}

impl VendorSummary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one receipt's amount to a vendor, appending the vendor if new
    pub fn record(&mut self, vendor: &str, amount: Decimal) {
        match self.entries.iter_mut().find(|(name, _)| name == vendor) {
            Some((_, totals)) => {
                totals.count += 1;
                totals.total += amount;
            }
            None => self.entries.push((
                vendor.to_string(),
                VendorTotal {
                    count: 1,
                    total: amount,
                },
            )),
        }
    }

    pub fn get(&self, vendor: &str) -> Option<&VendorTotal> {
        self.entries
            .iter()
            .find(|(name, _)| name == vendor)
            .map(|(_, totals)| totals)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &VendorTotal)> {
        self.entries.iter().map(|(name, totals)| (name.as_str(), totals))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Vendors by total spend, highest first
    ///
    /// The sort is stable, so vendors with equal totals keep their
    /// first-encountered order.
    pub fn ranked(&self) -> Vec<(&str, &VendorTotal)> {
        let mut ranked: Vec<_> = self.iter().collect();
        ranked.sort_by(|(_, a), (_, b)| b.total.cmp(&a.total));
        ranked
    }

    pub fn top_vendor(&self) -> Option<&str> {
        self.ranked().first().map(|(name, _)| *name)
    }

    fn push(&mut self, vendor: String, totals: VendorTotal) {
        self.entries.push((vendor, totals));
    }
}

impl Serialize for VendorSummary {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, totals) in &self.entries {
            map.serialize_entry(name, totals)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for VendorSummary {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct SummaryVisitor;

        impl<'de> Visitor<'de> for SummaryVisitor {
            type Value = VendorSummary;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of vendor name to {count, total}")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut summary = VendorSummary::new();
                while let Some((name, totals)) = access.next_entry::<String, VendorTotal>()? {
                    summary.push(name, totals);
                }
                Ok(summary)
            }
        }

        deserializer.deserialize_map(SummaryVisitor)
    }
}

/// Derived spending statistics over a receipt set
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsAggregate {
    #[serde(deserialize_with = "deserialize_amount", serialize_with = "serialize_amount")]
    pub total_spent: Decimal,
    /// Absent when there are no receipts
    #[serde(default, deserialize_with = "deserialize_average")]
    pub average_amount: Option<Decimal>,
    pub receipt_count: u64,
    #[serde(default)]
    pub vendor_summary: VendorSummary,
}

impl AnalyticsAggregate {
    /// Compute the aggregate in a single pass over the receipts
    pub fn from_receipts<'a>(receipts: impl IntoIterator<Item = &'a Receipt>) -> Self {
        let mut total_spent = Decimal::ZERO;
        let mut receipt_count = 0u64;
        let mut vendor_summary = VendorSummary::new();

        for receipt in receipts {
            total_spent += receipt.total_amount;
            receipt_count += 1;
            vendor_summary.record(&receipt.vendor_name, receipt.total_amount);
        }

        let average_amount = if receipt_count > 0 {
            total_spent.checked_div(Decimal::from(receipt_count))
        } else {
            None
        };

        Self {
            total_spent,
            average_amount,
            receipt_count,
            vendor_summary,
        }
    }

    /// Clear a server-reported average for an empty set
    ///
    /// The service reports `0` for the average of nothing; treat that as absent.
    pub fn normalized(mut self) -> Self {
        if self.receipt_count == 0 {
            self.average_amount = None;
        }
        self
    }

    pub fn top_vendor(&self) -> Option<&str> {
        self.vendor_summary.top_vendor()
    }

    /// Vendor share of total spend, in percent, full precision
    pub fn share_of(&self, vendor: &str) -> Option<Decimal> {
        let totals = self.vendor_summary.get(vendor)?;
        share(totals.total, self.total_spent)
    }

    /// Per-vendor breakdown in summary order
    pub fn breakdown(&self) -> Vec<VendorShare> {
        self.vendor_summary
            .iter()
            .map(|(name, totals)| VendorShare {
                vendor: name.to_string(),
                count: totals.count,
                total: totals.total,
                share_percent: share(totals.total, self.total_spent),
            })
            .collect()
    }

    /// Per-vendor breakdown, highest spend first
    pub fn ranked_breakdown(&self) -> Vec<VendorShare> {
        let mut shares = self.breakdown();
        shares.sort_by(|a, b| b.total.cmp(&a.total));
        shares
    }
}

fn share(part: Decimal, whole: Decimal) -> Option<Decimal> {
    if whole.is_zero() {
        return None;
    }
    part.checked_div(whole).map(|ratio| ratio * Decimal::ONE_HUNDRED)
}

/// One vendor's line in the spending breakdown
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VendorShare {
    pub vendor: String,
    pub count: u64,
    #[serde(serialize_with = "serialize_amount")]
    pub total: Decimal,
    #[serde(serialize_with = "serialize_share")]
    pub share_percent: Option<Decimal>,
}

impl VendorShare {
    /// Share rounded to one decimal place, e.g. `57.1%`
    pub fn display_share(&self) -> String {
        format_percent(self.share_percent)
    }
}

/// Render a percentage with one decimal place, half away from zero
pub fn format_percent(percent: Option<Decimal>) -> String {
    match percent {
        Some(p) => format!(
            "{:.1}%",
            p.round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero)
        ),
        None => "-".to_string(),
    }
}

fn deserialize_average<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<serde_json::Value> = Option::deserialize(deserializer)?;
    match value {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(v) => deserialize_amount(v).map(Some).map_err(serde::de::Error::custom),
    }
}

fn serialize_share<S: Serializer>(share: &Option<Decimal>, serializer: S) -> Result<S::Ok, S::Error> {
    match share {
        Some(value) => serialize_amount(value, serializer),
        None => serializer.serialize_none(),
    }
}
