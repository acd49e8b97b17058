// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Record store gateway.
//!
//! The relay reads changed records through [`RecordStore`], which only has
//! to answer two questions: how many records changed since a watermark, and
//! one page of them. [`fetch_all_since`] turns that into a concurrent paged
//! fetch:
//!
//! ```text
//! count(since) = 450, page_size = 200  →  pages_needed = 3
//!
//! ┌─ task: fetch_page(since, 200,   0) ─┐
//! ├─ task: fetch_page(since, 200, 200) ─┼──▶ page map {0: [..], 1: [..], 2: [..]}
//! └─ task: fetch_page(since, 200, 400) ─┘         │
//!                                                 ▼
//!                                 concat in page order (0, 1, 2)
//! ```
//!
//! Pages complete in any order; the merge re-imposes page-index order. A page
//! that fails is logged and contributes nothing. A failing count fails the
//! whole fetch.

pub mod sqlite;

pub use sqlite::SqliteRecordStore;

use crate::error::Result;
use crate::metrics;
use crate::record::{ChangedRecord, Watermark};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tracing::{debug, info, instrument, warn};

/// Records requested per page.
pub const PAGE_SIZE: usize = 200;

/// Type alias for boxed async futures returned by stores.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// Read access to changed records.
///
/// "Changed" means the store's fixed business predicate holds and, when a
/// watermark is given, the record was modified strictly after it. `None`
/// means all time.
pub trait RecordStore: Send + Sync + 'static {
    type Record: ChangedRecord;

    /// Number of changed records.
    fn count(&self, since: Option<Watermark>) -> StoreFuture<'_, u64>;

    /// Up to `limit` changed records in the store's natural order, skipping
    /// the first `offset`.
    fn fetch_page(
        &self,
        since: Option<Watermark>,
        limit: usize,
        offset: usize,
    ) -> StoreFuture<'_, Vec<Self::Record>>;
}

/// Pages needed to cover `count` records.
pub fn pages_needed(count: u64, page_size: usize) -> usize {
    debug_assert!(page_size > 0, "page size must be positive");
    let page_size = page_size.max(1) as u64;
    count.div_ceil(page_size) as usize
}

/// Fetch every changed record since `since`, one concurrent task per page.
///
/// Returns records in the store's natural order. Every page task is joined
/// before the merge.
#[instrument(skip(store, since), fields(since = ?since.map(|w| w.to_wire())))]
pub async fn fetch_all_since<S: RecordStore>(
    store: &Arc<S>,
    since: Option<Watermark>,
    page_size: usize,
) -> Result<Vec<S::Record>> {
    let start = Instant::now();
    let page_size = page_size.max(1);

    let count = store.count(since).await?;
    let pages = pages_needed(count, page_size);
    if pages == 0 {
        debug!("No changed records");
        metrics::record_fetch(0, 0, 0, start.elapsed());
        return Ok(Vec::new());
    }

    debug!(count, pages, page_size, "Fetching changed records");

    let page_map: Arc<Mutex<HashMap<usize, Vec<S::Record>>>> =
        Arc::new(Mutex::new(HashMap::with_capacity(pages)));
    let mut join_set = JoinSet::new();

    for page in 0..pages {
        let store = Arc::clone(store);
        let page_map = Arc::clone(&page_map);
        join_set.spawn(async move {
            let offset = page * page_size;
            match store.fetch_page(since, page_size, offset).await {
                Ok(records) => {
                    page_map.lock().await.insert(page, records);
                    true
                }
                Err(e) => {
                    warn!(page, offset, error = %e, "Page fetch failed, skipping page");
                    metrics::record_page_failure();
                    false
                }
            }
        });
    }

    let mut failed_pages = 0;
    while let Some(joined) = join_set.join_next().await {
        match joined {
            Ok(true) => {}
            Ok(false) => failed_pages += 1,
            Err(e) => {
                warn!(error = %e, "Page fetch task failed (JoinError)");
                metrics::record_page_failure();
                failed_pages += 1;
            }
        }
    }

    let mut page_map = std::mem::take(&mut *page_map.lock().await);
    let mut records = Vec::with_capacity(page_map.values().map(Vec::len).sum());
    for page in 0..pages {
        if let Some(batch) = page_map.remove(&page) {
            records.extend(batch);
        }
    }

    let duration = start.elapsed();
    metrics::record_fetch(records.len(), pages, failed_pages, duration);

    info!(
        count,
        fetched = records.len(),
        pages,
        failed_pages,
        duration_ms = duration.as_millis() as u64,
        "Fetched changed records"
    );

    Ok(records)
}
