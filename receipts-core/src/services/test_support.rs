//! Scripted gateway for flow tests

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::adapters::demo::DemoGateway;
use crate::domain::result::{Error, Result};
use crate::domain::{AnalyticsAggregate, AnalyticsFilter, ImageFile, Receipt};
use crate::ports::{ReceiptCreated, ReceiptGateway};

/// Demo-backed gateway that yields before answering and can be told to fail
///
/// Queued failures are returned by the next mutating or analytics call.
/// Yielding lets a second caller run while the first is suspended.
pub struct ScriptedGateway {
    inner: DemoGateway,
    failures: Mutex<VecDeque<Error>>,
    calls: AtomicUsize,
    /// Answer updates with a bare confirmation instead of the record
    pub confirm_only: bool,
}

impl ScriptedGateway {
    pub fn new(receipts: Vec<Receipt>) -> Self {
        Self {
            inner: DemoGateway::with_receipts(receipts),
            failures: Mutex::new(VecDeque::new()),
            calls: AtomicUsize::new(0),
            confirm_only: false,
        }
    }

    pub fn confirm_only(mut self) -> Self {
        self.confirm_only = true;
        self
    }

    pub fn fail_next(&self, error: Error) {
        self.failures.lock().unwrap().push_back(error);
    }

    /// Number of remote calls made
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn enter(&self) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        let failure = self.failures.lock().unwrap().pop_front();
        match failure {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ReceiptGateway for ScriptedGateway {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn upload(&self, image: &ImageFile) -> Result<ReceiptCreated> {
        self.enter().await?;
        self.inner.upload(image).await
    }

    async fn list_receipts(&self) -> Result<Vec<Receipt>> {
        self.enter().await?;
        self.inner.list_receipts().await
    }

    async fn search_receipts(&self, query: &str) -> Result<Vec<Receipt>> {
        self.enter().await?;
        self.inner.search_receipts(query).await
    }

    async fn update_receipt(&self, id: i64, fields: &Receipt) -> Result<Option<Receipt>> {
        self.enter().await?;
        let updated = self.inner.update_receipt(id, fields).await?;
        Ok(if self.confirm_only { None } else { updated })
    }

    async fn delete_receipt(&self, id: i64) -> Result<()> {
        self.enter().await?;
        self.inner.delete_receipt(id).await
    }

    async fn fetch_analytics(&self, filter: &AnalyticsFilter) -> Result<AnalyticsAggregate> {
        self.enter().await?;
        self.inner.fetch_analytics(filter).await
    }
}
