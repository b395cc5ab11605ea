//! Receipt collection - the committed, in-memory receipt set
//!
//! `ReceiptStore` is the one piece of state shared between flows. Every
//! write to it follows a confirmed gateway response; nothing here mutates
//! speculatively.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::domain::result::Result;
use crate::domain::{Receipt, SearchFilter};
use crate::ports::ReceiptGateway;

/// Insertion-ordered receipts, unique by id
#[derive(Debug, Default)]
pub struct ReceiptStore {
    receipts: Mutex<Vec<Receipt>>,
}

impl ReceiptStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Receipt>> {
        self.receipts.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Replace the whole collection
    ///
    /// A duplicate id in `records` keeps the first position and the last value.
    pub fn replace_all(&self, records: Vec<Receipt>) {
        let mut deduped: Vec<Receipt> = Vec::with_capacity(records.len());
        for record in records {
            upsert_into(&mut deduped, record);
        }
        *self.lock() = deduped;
    }

    /// Replace the record with the same id in place, or append it
    pub fn upsert(&self, record: Receipt) {
        upsert_into(&mut self.lock(), record);
    }

    /// Remove a record; an absent id is a no-op
    ///
    /// Returns whether a record was removed.
    pub fn remove_by_id(&self, id: i64) -> bool {
        let mut receipts = self.lock();
        let before = receipts.len();
        receipts.retain(|r| r.id != id);
        receipts.len() != before
    }

    /// Snapshot of the collection in order
    pub fn get(&self) -> Vec<Receipt> {
        self.lock().clone()
    }

    pub fn find(&self, id: i64) -> Option<Receipt> {
        self.lock().iter().find(|r| r.id == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

fn upsert_into(receipts: &mut Vec<Receipt>, record: Receipt) {
    match receipts.iter_mut().find(|r| r.id == record.id) {
        Some(existing) => *existing = record,
        None => receipts.push(record),
    }
}

/// Receipt query used for a search
#[derive(Debug, Clone, PartialEq)]
pub enum SearchQuery {
    Filter(SearchFilter),
    /// Already-encoded query string, sent unmodified
    Raw(String),
}

impl SearchQuery {
    pub fn encoded(&self) -> String {
        match self {
            SearchQuery::Filter(filter) => filter.to_query_string(),
            SearchQuery::Raw(query) => query.clone(),
        }
    }
}

/// Loads, searches and deletes receipts against the gateway
pub struct CollectionService {
    gateway: Arc<dyn ReceiptGateway>,
    store: Arc<ReceiptStore>,
}

impl CollectionService {
    pub fn new(gateway: Arc<dyn ReceiptGateway>, store: Arc<ReceiptStore>) -> Self {
        Self { gateway, store }
    }

    pub fn store(&self) -> &Arc<ReceiptStore> {
        &self.store
    }

    /// Fetch the full collection and replace the local copy
    pub async fn refresh(&self) -> Result<Vec<Receipt>> {
        let receipts = self.gateway.list_receipts().await?;
        self.store.replace_all(receipts);
        Ok(self.store.get())
    }

    /// Run a search; the results replace the local copy
    pub async fn search(&self, query: &SearchQuery) -> Result<Vec<Receipt>> {
        let receipts = self.gateway.search_receipts(&query.encoded()).await?;
        self.store.replace_all(receipts);
        Ok(self.store.get())
    }

    /// Delete on the server, then drop the local record
    ///
    /// On failure the collection is left untouched.
    pub async fn delete(&self, id: i64) -> Result<()> {
        self.gateway.delete_receipt(id).await?;
        self.store.remove_by_id(id);
        Ok(())
    }
}
