//! Demo receipt gateway
//!
//! Serves a deterministic set of sample receipts so the client works
//! without a backend. Writes go to an in-memory list, optionally persisted
//! to `demo_receipts.json` so changes survive between CLI invocations.
//! The demo session is always signed in.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::result::{Error, Result};
use crate::domain::{
    AnalyticsAggregate, AnalyticsFilter, ImageFile, LoginRedirect, Receipt, SearchFilter,
    Session, User, MISSING_LOCATION,
};
use crate::ports::{AuthGateway, ReceiptCreated, ReceiptGateway};

/// File the demo receipts are persisted to
pub const DEMO_RECEIPTS_FILE: &str = "demo_receipts.json";

const DEMO_RECEIPT_COUNT: i64 = 24;

// (vendor, bill type, city, state, country, typical amount in cents)
const DEMO_VENDORS: &[(&str, &str, &str, &str, &str, i64)] = &[
    ("Green Grocer", "Groceries", "Austin", "TX", "USA", 6420),
    ("Blue Bottle Coffee", "Dining", "Oakland", "CA", "USA", 875),
    ("Shell", "Fuel", "Austin", "TX", "USA", 4810),
    ("Corner Bistro", "Dining", "nan", "nan", "USA", 3650),
    ("City Pharmacy", "Health", "Denver", "CO", "USA", 2299),
    ("Hardware Depot", "Home", "Austin", "TX", "USA", 11840),
];

/// Generate the demo receipt set
///
/// Deterministic: the same call always produces the same receipts, dated
/// backwards from today.
pub fn generate_demo_receipts() -> Vec<Receipt> {
    let today = Utc::now().date_naive();
    generate_demo_receipts_from(today)
}

fn generate_demo_receipts_from(today: NaiveDate) -> Vec<Receipt> {
    let mut rng = SimpleRng::new(42);

    (1..=DEMO_RECEIPT_COUNT)
        .map(|id| {
            let (vendor, bill_type, city, state, country, cents) =
                DEMO_VENDORS[(rng.next() * DEMO_VENDORS.len() as f64) as usize % DEMO_VENDORS.len()];
            // Vary the amount +/-25% around the vendor's typical spend
            let factor = 0.75 + rng.next() * 0.5;
            let amount = Decimal::new((cents as f64 * factor).round() as i64, 2);
            let date = today - Duration::days(id * 4 + (rng.next() * 3.0) as i64);

            Receipt::new(id, vendor, amount)
                .with_date_time(format!("{}T12:00:00", date))
                .with_bill_type(bill_type)
                .with_location(city, state, country)
        })
        .collect()
}

/// Simple deterministic random number generator (LCG)
struct SimpleRng {
    state: u64,
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    /// Next value in `0.0..1.0`
    fn next(&mut self) -> f64 {
        self.state = self
            .state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        (self.state >> 32) as f64 / (u32::MAX as f64 + 1.0)
    }
}

/// Receipts plus the id counter, as written to `demo_receipts.json`
///
/// `next_id` only grows, so a deleted id is never handed out again.
#[derive(Debug, Serialize, Deserialize)]
struct DemoStore {
    next_id: i64,
    receipts: Vec<Receipt>,
}

impl DemoStore {
    fn new(receipts: Vec<Receipt>) -> Self {
        let next_id = receipts.iter().map(|r| r.id).max().unwrap_or(0) + 1;
        Self { next_id, receipts }
    }

    fn allocate_id(&mut self) -> i64 {
        // A hand-edited file may hold ids past the counter
        let floor = self.receipts.iter().map(|r| r.id + 1).max().unwrap_or(1);
        let id = self.next_id.max(floor);
        self.next_id = id + 1;
        id
    }
}

/// Demo gateway
///
/// Implements `ReceiptGateway` and `AuthGateway` over local sample data.
pub struct DemoGateway {
    store: Mutex<DemoStore>,
    store_path: Option<PathBuf>,
}

impl DemoGateway {
    /// In-memory gateway seeded with the demo receipts
    pub fn new() -> Self {
        Self::with_receipts(generate_demo_receipts())
    }

    /// In-memory gateway over the given receipts
    pub fn with_receipts(receipts: Vec<Receipt>) -> Self {
        Self {
            store: Mutex::new(DemoStore::new(receipts)),
            store_path: None,
        }
    }

    /// Gateway persisted in `dir`, seeded on first use
    pub fn open(dir: &Path) -> Result<Self> {
        let store_path = dir.join(DEMO_RECEIPTS_FILE);
        let store = if store_path.exists() {
            let content = std::fs::read_to_string(&store_path)?;
            serde_json::from_str(&content)?
        } else {
            DemoStore::new(generate_demo_receipts())
        };

        let gateway = Self {
            store: Mutex::new(store),
            store_path: Some(store_path),
        };
        gateway.persist(&gateway.lock())?;
        Ok(gateway)
    }

    /// Reset the persisted demo data in `dir` to the generated set
    pub fn reset(dir: &Path) -> Result<()> {
        let store_path = dir.join(DEMO_RECEIPTS_FILE);
        if store_path.exists() {
            std::fs::remove_file(&store_path)?;
        }
        Self::open(dir).map(|_| ())
    }

    fn lock(&self) -> MutexGuard<'_, DemoStore> {
        self.store.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn persist(&self, store: &DemoStore) -> Result<()> {
        if let Some(path) = &self.store_path {
            let content = serde_json::to_string_pretty(store)?;
            std::fs::write(path, content)?;
        }
        Ok(())
    }
}

impl Default for DemoGateway {
    fn default() -> Self {
        Self::new()
    }
}

fn demo_user() -> User {
    User {
        id: Some("demo".to_string()),
        email: "demo@example.com".to_string(),
        name: Some("Demo User".to_string()),
        picture: None,
    }
}

#[async_trait]
impl ReceiptGateway for DemoGateway {
    fn name(&self) -> &str {
        "demo"
    }

    async fn upload(&self, image: &ImageFile) -> Result<ReceiptCreated> {
        if image.bytes.is_empty() {
            return Err(Error::upload_rejected("Empty image"));
        }

        let mut store = self.lock();
        let id = store.allocate_id();

        // Stand-in for server-side extraction: vendor from the file stem
        let vendor = image
            .file_name
            .rsplit_once('.')
            .map(|(stem, _)| stem)
            .unwrap_or(&image.file_name)
            .replace(['_', '-'], " ");
        let cents = (image.bytes.len() as i64 % 9000) + 500;
        let receipt = Receipt::new(id, vendor.trim(), Decimal::new(cents, 2))
            .with_date_time(format!("{}", Utc::now().format("%Y-%m-%dT%H:%M:%S")))
            .with_bill_type("Other")
            .with_location(MISSING_LOCATION, MISSING_LOCATION, MISSING_LOCATION);

        store.receipts.push(receipt.clone());
        self.persist(&store)?;

        Ok(ReceiptCreated {
            receipt_id: Some(id),
            receipt: Some(receipt),
            message: Some("Receipt processed".to_string()),
        })
    }

    async fn list_receipts(&self) -> Result<Vec<Receipt>> {
        Ok(self.lock().receipts.clone())
    }

    async fn search_receipts(&self, query: &str) -> Result<Vec<Receipt>> {
        let filter = SearchFilter::from_query_string(query);
        Ok(self
            .lock()
            .receipts
            .iter()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect())
    }

    async fn update_receipt(&self, id: i64, fields: &Receipt) -> Result<Option<Receipt>> {
        let mut store = self.lock();
        let Some(stored) = store.receipts.iter_mut().find(|r| r.id == id) else {
            return Err(Error::not_found(format!("Receipt {} not found", id)));
        };

        *stored = Receipt {
            id,
            ..fields.clone()
        };
        let updated = stored.clone();
        self.persist(&store)?;
        Ok(Some(updated))
    }

    async fn delete_receipt(&self, id: i64) -> Result<()> {
        let mut store = self.lock();
        let before = store.receipts.len();
        store.receipts.retain(|r| r.id != id);
        if store.receipts.len() == before {
            return Err(Error::not_found(format!("Receipt {} not found", id)));
        }
        self.persist(&store)
    }

    async fn fetch_analytics(&self, filter: &AnalyticsFilter) -> Result<AnalyticsAggregate> {
        let store = self.lock();
        Ok(AnalyticsAggregate::from_receipts(
            store.receipts.iter().filter(|r| filter.matches(r)),
        ))
    }
}

#[async_trait]
impl AuthGateway for DemoGateway {
    async fn login_redirect_url(&self) -> Result<LoginRedirect> {
        Ok(LoginRedirect {
            auth_url: "https://example.com/demo-login".to_string(),
        })
    }

    async fn session_user(&self) -> Result<User> {
        Ok(demo_user())
    }

    async fn logout(&self) -> Result<()> {
        Ok(())
    }

    async fn exchange_auth_code(&self, code: &str) -> Result<Session> {
        if code.trim().is_empty() {
            return Err(Error::auth("Authorization code missing"));
        }
        Ok(Session {
            user: demo_user(),
            token: None,
        })
    }
}
