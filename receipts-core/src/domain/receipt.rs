//! Receipt domain model

use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value as JsonValue;

use super::result::{Error, Result};

/// Value the receipt service stores for an unknown location part
pub const MISSING_LOCATION: &str = "nan";

/// A parsed expense record as served by the receipt service
///
/// `id` is assigned by the server and never changes. Location fields keep
/// the raw server value; use the `display_*` accessors for presentation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Receipt {
    pub id: i64,
    #[serde(default, deserialize_with = "deserialize_text")]
    pub vendor_name: String,
    #[serde(
        default,
        deserialize_with = "deserialize_amount",
        serialize_with = "serialize_amount"
    )]
    pub total_amount: Decimal,
    /// ISO-8601 date-time string
    #[serde(default, deserialize_with = "deserialize_text")]
    pub date_time: String,
    #[serde(default, deserialize_with = "deserialize_text")]
    pub bill_type: String,
    #[serde(default, deserialize_with = "deserialize_text")]
    pub city: String,
    #[serde(default, deserialize_with = "deserialize_text")]
    pub state: String,
    #[serde(default, deserialize_with = "deserialize_text")]
    pub country: String,
}

impl Receipt {
    pub fn new(id: i64, vendor_name: impl Into<String>, total_amount: Decimal) -> Self {
        Self {
            id,
            vendor_name: vendor_name.into(),
            total_amount,
            date_time: String::new(),
            bill_type: String::new(),
            city: String::new(),
            state: String::new(),
            country: String::new(),
        }
    }

    pub fn with_date_time(mut self, date_time: impl Into<String>) -> Self {
        self.date_time = date_time.into();
        self
    }

    pub fn with_bill_type(mut self, bill_type: impl Into<String>) -> Self {
        self.bill_type = bill_type.into();
        self
    }

    pub fn with_location(
        mut self,
        city: impl Into<String>,
        state: impl Into<String>,
        country: impl Into<String>,
    ) -> Self {
        self.city = city.into();
        self.state = state.into();
        self.country = country.into();
        self
    }

    /// Date portion of `date_time`, the unit receipts are displayed in
    pub fn display_date(&self) -> &str {
        self.date_time
            .split_once('T')
            .map(|(date, _)| date)
            .unwrap_or(&self.date_time)
    }

    /// Parsed calendar date, if `date_time` is well formed
    pub fn date(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(self.display_date(), "%Y-%m-%d").ok()
    }

    pub fn display_city(&self) -> &str {
        normalize_location(&self.city)
    }

    pub fn display_state(&self) -> &str {
        normalize_location(&self.state)
    }

    pub fn display_country(&self) -> &str {
        normalize_location(&self.country)
    }
}

/// Map the server's missing-location sentinel to an empty string
pub fn normalize_location(value: &str) -> &str {
    if value.eq_ignore_ascii_case(MISSING_LOCATION) {
        ""
    } else {
        value
    }
}

/// Editable receipt field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReceiptField {
    VendorName,
    TotalAmount,
    DateTime,
    BillType,
    City,
    State,
    Country,
}

impl ReceiptField {
    pub const ALL: [ReceiptField; 7] = [
        ReceiptField::VendorName,
        ReceiptField::TotalAmount,
        ReceiptField::DateTime,
        ReceiptField::BillType,
        ReceiptField::City,
        ReceiptField::State,
        ReceiptField::Country,
    ];

    /// Wire name of the field
    pub fn as_str(&self) -> &'static str {
        match self {
            ReceiptField::VendorName => "vendor_name",
            ReceiptField::TotalAmount => "total_amount",
            ReceiptField::DateTime => "date_time",
            ReceiptField::BillType => "bill_type",
            ReceiptField::City => "city",
            ReceiptField::State => "state",
            ReceiptField::Country => "country",
        }
    }
}

impl fmt::Display for ReceiptField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReceiptField {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "vendor_name" | "vendor" => Ok(ReceiptField::VendorName),
            "total_amount" | "amount" => Ok(ReceiptField::TotalAmount),
            "date_time" | "date" => Ok(ReceiptField::DateTime),
            "bill_type" => Ok(ReceiptField::BillType),
            "city" => Ok(ReceiptField::City),
            "state" => Ok(ReceiptField::State),
            "country" => Ok(ReceiptField::Country),
            other => Err(Error::validation(format!("Unknown receipt field: {}", other))),
        }
    }
}

/// Uncommitted copy of a receipt under edit
///
/// Keyed by the id of the record it shadows. Location sentinels are cleared
/// when the draft is created so they never round-trip back to the server.
#[derive(Debug, Clone, PartialEq)]
pub struct Draft {
    record: Receipt,
}

impl Draft {
    pub fn from_receipt(receipt: &Receipt) -> Self {
        let mut record = receipt.clone();
        record.city = normalize_location(&record.city).to_string();
        record.state = normalize_location(&record.state).to_string();
        record.country = normalize_location(&record.country).to_string();
        Self { record }
    }

    pub fn id(&self) -> i64 {
        self.record.id
    }

    pub fn receipt(&self) -> &Receipt {
        &self.record
    }

    pub fn into_receipt(self) -> Receipt {
        self.record
    }

    /// Set one field from its text form
    ///
    /// Amounts must parse as a non-negative decimal and dates as either
    /// `YYYY-MM-DD` or an ISO date-time.
    pub fn set(&mut self, field: ReceiptField, value: &str) -> Result<()> {
        match field {
            ReceiptField::VendorName => self.record.vendor_name = value.to_string(),
            ReceiptField::TotalAmount => self.record.total_amount = parse_amount(value)?,
            ReceiptField::DateTime => {
                let value = value.trim();
                if !is_iso_date(value) {
                    return Err(Error::validation(format!("Invalid date: {}", value)));
                }
                self.record.date_time = value.to_string();
            }
            ReceiptField::BillType => self.record.bill_type = value.to_string(),
            ReceiptField::City => self.record.city = value.to_string(),
            ReceiptField::State => self.record.state = value.to_string(),
            ReceiptField::Country => self.record.country = value.to_string(),
        }
        Ok(())
    }
}

/// Parse a user-entered amount
pub fn parse_amount(value: &str) -> Result<Decimal> {
    let amount = value
        .trim()
        .parse::<Decimal>()
        .map_err(|_| Error::validation(format!("Invalid amount: {}", value.trim())))?;
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(Error::validation("Amount cannot be negative"));
    }
    Ok(amount)
}

fn is_iso_date(value: &str) -> bool {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok()
        || NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S").is_ok()
        || NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f").is_ok()
        || chrono::DateTime::parse_from_rfc3339(value).is_ok()
}

/// Deserialize a nullable string column as an empty string
fn deserialize_text<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<JsonValue> = Option::deserialize(deserializer)?;
    Ok(match value {
        Some(JsonValue::String(s)) => s,
        Some(JsonValue::Null) | None => String::new(),
        Some(other) => other.to_string(),
    })
}

/// Deserialize an amount that can be number, string or null
pub(crate) fn deserialize_amount<'de, D>(deserializer: D) -> std::result::Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error as _;
    let value: Option<JsonValue> = Option::deserialize(deserializer)?;
    match value {
        Some(JsonValue::Number(n)) => decimal_from_str(&n.to_string())
            .ok_or_else(|| D::Error::custom(format!("invalid decimal: {}", n))),
        Some(JsonValue::String(s)) if s.trim().is_empty() => Ok(Decimal::ZERO),
        Some(JsonValue::String(s)) => decimal_from_str(s.trim())
            .ok_or_else(|| D::Error::custom(format!("invalid decimal: {}", s))),
        Some(JsonValue::Null) | None => Ok(Decimal::ZERO),
        _ => Err(D::Error::custom("expected number or string for amount")),
    }
}

fn decimal_from_str(s: &str) -> Option<Decimal> {
    s.parse::<Decimal>()
        .or_else(|_| Decimal::from_scientific(s))
        .ok()
}

/// Amounts go over the wire as JSON numbers
pub(crate) fn serialize_amount<S>(amount: &Decimal, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_f64(amount.to_f64().unwrap_or_default())
}
