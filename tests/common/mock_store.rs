//! In-memory product store for testing.
//!
//! Applies the same "changed" predicate as the SQLite store. Earlier pages
//! can be made to answer slower than later ones, so page tasks complete in
//! reverse order.

use change_relay::error::RelayError;
use change_relay::store::{RecordStore, StoreFuture};
use change_relay::{ChangedRecord, Product, Watermark};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;

/// A recorded fetch_page() call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct PageRequest {
    pub offset: usize,
    pub limit: usize,
}

#[derive(Default)]
pub struct MemoryStore {
    rows: RwLock<Vec<Product>>,
    page_requests: RwLock<Vec<PageRequest>>,
    counts: RwLock<Vec<Option<Watermark>>>,
    /// Delay per page still ahead of this one (page 0 waits longest)
    stagger: Option<Duration>,
    fail_count: AtomicBool,
}

impl MemoryStore {
    pub fn new(rows: Vec<Product>) -> Self {
        Self {
            rows: RwLock::new(rows),
            ..Default::default()
        }
    }

    /// Make earlier pages slower, so completion order is reversed.
    pub fn with_stagger(mut self, step: Duration) -> Self {
        self.stagger = Some(step);
        self
    }

    pub fn fail_count(&self, fail: bool) {
        self.fail_count.store(fail, Ordering::SeqCst);
    }

    /// Replace a product by key, or append it.
    pub async fn upsert(&self, product: Product) {
        let mut rows = self.rows.write().await;
        match rows.iter_mut().find(|p| p.key_id == product.key_id) {
            Some(existing) => *existing = product,
            None => rows.push(product),
        }
    }

    /// Page requests, sorted by offset.
    pub async fn page_requests(&self) -> Vec<PageRequest> {
        let mut requests = self.page_requests.read().await.clone();
        requests.sort();
        requests
    }

    /// Watermarks passed to count(), in call order.
    pub async fn count_calls(&self) -> Vec<Option<Watermark>> {
        self.counts.read().await.clone()
    }

    async fn changed(&self, since: Option<Watermark>) -> Vec<Product> {
        self.rows
            .read()
            .await
            .iter()
            .filter(|p| p.is_priced())
            .filter(|p| match (since, p.modified_at()) {
                (None, _) => true,
                (Some(w), Some(stamp)) => stamp > w.instant(),
                (Some(_), None) => false,
            })
            .cloned()
            .collect()
    }
}

impl RecordStore for MemoryStore {
    type Record = Product;

    fn count(&self, since: Option<Watermark>) -> StoreFuture<'_, u64> {
        Box::pin(async move {
            self.counts.write().await.push(since);
            if self.fail_count.load(Ordering::SeqCst) {
                return Err(RelayError::query_msg("count", "database is unavailable"));
            }
            Ok(self.changed(since).await.len() as u64)
        })
    }

    fn fetch_page(&self, since: Option<Watermark>, limit: usize, offset: usize) -> StoreFuture<'_, Vec<Product>> {
        Box::pin(async move {
            self.page_requests.write().await.push(PageRequest { offset, limit });
            let changed = self.changed(since).await;

            if let Some(step) = self.stagger {
                let pages_after = changed.len().saturating_sub(offset) / limit.max(1);
                tokio::time::sleep(step * pages_after as u32).await;
            }

            Ok(changed.into_iter().skip(offset).take(limit).collect())
        })
    }
}
