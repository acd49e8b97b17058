// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! SQLite-backed product store.
//!
//! Holds the `items` table the relay watches. A product is "changed" when all
//! three retail prices are positive and, given a watermark, its `sync_stamp`
//! is strictly later.
//!
//! # Timestamps
//!
//! `sync_stamp` is stored as TEXT in RFC 3339 UTC with fixed microsecond
//! precision (`2024-01-01T00:00:00.000000Z`). Fixed width means SQLite's
//! string comparison matches chronological order, so `sync_stamp > ?` works
//! without date functions.
//!
//! # Natural order
//!
//! Pages are ordered by `rowid` (insertion order). Upserts keep a product's
//! original row, so an updated product keeps its position.
//!
//! # SQLite Busy Handling
//!
//! Every statement goes through `execute_with_retry`, which retries
//! SQLITE_BUSY/SQLITE_LOCKED with exponential backoff (10ms doubling up to
//! 500ms, 5 attempts).

use super::{RecordStore, StoreFuture};
use crate::error::{RelayError, Result};
use crate::record::{format_timestamp, parse_timestamp, Product, Watermark};
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, warn};

const SQLITE_RETRY_MAX_ATTEMPTS: u32 = 5;
const SQLITE_RETRY_BASE_DELAY_MS: u64 = 10;
const SQLITE_RETRY_MAX_DELAY_MS: u64 = 500;

const PRODUCT_COLUMNS: &str = "key_id, description, short_name, retail_price_1, \
     retail_price_2, retail_price_3, current_stock, sync_stamp";

type ProductRow = (String, String, String, f64, f64, f64, f64, Option<String>);

/// Check if an error is a retryable SQLite busy/locked error
fn is_sqlite_busy_error(e: &sqlx::Error) -> bool {
    match e {
        sqlx::Error::Database(db_err) => {
            // SQLITE_BUSY = 5, SQLITE_LOCKED = 6
            if let Some(code) = db_err.code() {
                return code == "5" || code == "6";
            }
            let msg = db_err.message().to_lowercase();
            msg.contains("database is locked") || msg.contains("database is busy")
        }
        _ => false,
    }
}

/// Execute a database operation with retry on SQLITE_BUSY/SQLITE_LOCKED
async fn execute_with_retry<F, Fut, T>(operation: &str, mut f: F) -> std::result::Result<T, sqlx::Error>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = std::result::Result<T, sqlx::Error>>,
{
    let mut attempts = 0;
    let mut delay_ms = SQLITE_RETRY_BASE_DELAY_MS;

    loop {
        attempts += 1;
        match f().await {
            Ok(result) => {
                if attempts > 1 {
                    debug!(operation, attempts, "SQLite operation succeeded after retry");
                }
                return Ok(result);
            }
            Err(e) if is_sqlite_busy_error(&e) && attempts < SQLITE_RETRY_MAX_ATTEMPTS => {
                warn!(
                    operation,
                    attempts,
                    max_attempts = SQLITE_RETRY_MAX_ATTEMPTS,
                    delay_ms,
                    "SQLite busy, retrying"
                );
                crate::metrics::record_store_retry(operation);
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                delay_ms = (delay_ms * 2).min(SQLITE_RETRY_MAX_DELAY_MS);
            }
            Err(e) => return Err(e),
        }
    }
}

/// `WHERE` clause assembled from AND-ed conditions and their bound values.
#[derive(Debug, Default)]
struct Conditions {
    clauses: Vec<&'static str>,
    binds: Vec<String>,
}

impl Conditions {
    /// The fixed "changed" predicate, optionally bounded by a watermark.
    fn changed_since(since: Option<Watermark>) -> Self {
        let mut conditions = Self::default()
            .and("retail_price_1 > 0")
            .and("retail_price_2 > 0")
            .and("retail_price_3 > 0");
        if let Some(since) = since {
            conditions = conditions.and_bound("sync_stamp > ?", since.to_wire());
        }
        conditions
    }

    fn and(mut self, clause: &'static str) -> Self {
        self.clauses.push(clause);
        self
    }

    fn and_bound(mut self, clause: &'static str, value: String) -> Self {
        self.clauses.push(clause);
        self.binds.push(value);
        self
    }

    fn sql(&self) -> String {
        if self.clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", self.clauses.join(" AND "))
        }
    }
}

fn product_from_row(row: ProductRow) -> Product {
    let (key_id, description, short_name, p1, p2, p3, stock, stamp) = row;
    let sync_stamp = stamp.as_deref().and_then(|s| {
        let parsed = parse_timestamp(s);
        if parsed.is_none() {
            warn!(key_id = %key_id, sync_stamp = %s, "Unparseable sync_stamp, treating as unset");
        }
        parsed
    });

    Product {
        key_id,
        description,
        short_name,
        retail_price_1: p1,
        retail_price_2: p2,
        retail_price_3: p3,
        current_stock: stock,
        sync_stamp,
    }
}

/// Product store backed by SQLite.
pub struct SqliteRecordStore {
    pool: SqlitePool,
    path: String,
}

impl SqliteRecordStore {
    /// Open (or create) the store at `path`.
    ///
    /// Creates the `items` table if it doesn't exist.
    pub async fn new(path: impl AsRef<Path>, max_connections: u32) -> Result<Self> {
        let path_str = path.as_ref().to_string_lossy().to_string();
        info!(path = %path_str, max_connections, "Opening record store");

        let options = SqliteConnectOptions::from_str(&format!("sqlite://{}?mode=rwc", path_str))
            .map_err(|e| RelayError::Config(format!("Invalid SQLite path: {}", e)))?
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect_with(options)
            .await
            .map_err(|e| RelayError::query("connect", e))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS items (
                key_id TEXT PRIMARY KEY,
                description TEXT NOT NULL DEFAULT '',
                short_name TEXT NOT NULL DEFAULT '',
                retail_price_1 REAL NOT NULL DEFAULT 0,
                retail_price_2 REAL NOT NULL DEFAULT 0,
                retail_price_3 REAL NOT NULL DEFAULT 0,
                current_stock REAL NOT NULL DEFAULT 0,
                sync_stamp TEXT
            )
            "#,
        )
        .execute(&pool)
        .await
        .map_err(|e| RelayError::query("create_table", e))?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_items_sync_stamp ON items (sync_stamp)")
            .execute(&pool)
            .await
            .map_err(|e| RelayError::query("create_index", e))?;

        Ok(Self { pool, path: path_str })
    }

    /// Database path (for diagnostics).
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Count changed products.
    pub async fn count_changed(&self, since: Option<Watermark>) -> Result<u64> {
        let conditions = Conditions::changed_since(since);
        let sql = format!("SELECT COUNT(*) FROM items {}", conditions.sql());
        let pool = &self.pool;

        let count: i64 = execute_with_retry("count", || {
            let mut query = sqlx::query_scalar::<_, i64>(&sql);
            for value in &conditions.binds {
                query = query.bind(value);
            }
            query.fetch_one(pool)
        })
        .await
        .map_err(|e| RelayError::query("count", e))?;

        Ok(count.max(0) as u64)
    }

    /// One page of changed products in insertion order.
    pub async fn fetch_changed_page(
        &self,
        since: Option<Watermark>,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Product>> {
        let conditions = Conditions::changed_since(since);
        let sql = format!(
            "SELECT {} FROM items {} ORDER BY rowid LIMIT ? OFFSET ?",
            PRODUCT_COLUMNS,
            conditions.sql()
        );
        let pool = &self.pool;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let offset = i64::try_from(offset).unwrap_or(i64::MAX);

        let rows: Vec<ProductRow> = execute_with_retry("fetch_page", || {
            let mut query = sqlx::query_as::<_, ProductRow>(&sql);
            for value in &conditions.binds {
                query = query.bind(value);
            }
            query.bind(limit).bind(offset).fetch_all(pool)
        })
        .await
        .map_err(|e| RelayError::query("fetch_page", e))?;

        Ok(rows.into_iter().map(product_from_row).collect())
    }

    /// Insert or update a product.
    ///
    /// The stored `sync_stamp` is the product's own, or now if unset. An
    /// existing product keeps its row (and so its position in fetch order).
    pub async fn upsert(&self, product: &Product) -> Result<()> {
        let stamp = format_timestamp(&product.sync_stamp.unwrap_or_else(Utc::now));
        let pool = &self.pool;

        execute_with_retry("upsert", || {
            sqlx::query(
                r#"
                INSERT INTO items (key_id, description, short_name, retail_price_1,
                                   retail_price_2, retail_price_3, current_stock, sync_stamp)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(key_id) DO UPDATE SET
                    description = excluded.description,
                    short_name = excluded.short_name,
                    retail_price_1 = excluded.retail_price_1,
                    retail_price_2 = excluded.retail_price_2,
                    retail_price_3 = excluded.retail_price_3,
                    current_stock = excluded.current_stock,
                    sync_stamp = excluded.sync_stamp
                "#,
            )
            .bind(&product.key_id)
            .bind(&product.description)
            .bind(&product.short_name)
            .bind(product.retail_price_1)
            .bind(product.retail_price_2)
            .bind(product.retail_price_3)
            .bind(product.current_stock)
            .bind(&stamp)
            .execute(pool)
        })
        .await
        .map_err(|e| RelayError::query("upsert", e))?;

        debug!(key_id = %product.key_id, sync_stamp = %stamp, "Product upserted");
        Ok(())
    }

    /// Look up one product by key, regardless of price or stamp.
    pub async fn get_by_key(&self, key_id: &str) -> Result<Option<Product>> {
        let sql = format!("SELECT {} FROM items WHERE key_id = ?", PRODUCT_COLUMNS);
        let pool = &self.pool;

        let row: Option<ProductRow> = execute_with_retry("get_by_key", || {
            sqlx::query_as::<_, ProductRow>(&sql)
                .bind(key_id)
                .fetch_optional(pool)
        })
        .await
        .map_err(|e| RelayError::query("get_by_key", e))?;

        Ok(row.map(product_from_row))
    }

    /// Look up several products by key. Missing keys are skipped; results
    /// come back in insertion order.
    pub async fn get_by_keys(&self, key_ids: &[String]) -> Result<Vec<Product>> {
        if key_ids.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; key_ids.len()].join(", ");
        let sql = format!(
            "SELECT {} FROM items WHERE key_id IN ({}) ORDER BY rowid",
            PRODUCT_COLUMNS, placeholders
        );
        let pool = &self.pool;

        let rows: Vec<ProductRow> = execute_with_retry("get_by_keys", || {
            let mut query = sqlx::query_as::<_, ProductRow>(&sql);
            for key in key_ids {
                query = query.bind(key);
            }
            query.fetch_all(pool)
        })
        .await
        .map_err(|e| RelayError::query("get_by_keys", e))?;

        Ok(rows.into_iter().map(product_from_row).collect())
    }

    /// Close the connection pool, checkpointing the WAL first.
    pub async fn close(&self) {
        let pool = &self.pool;
        let checkpoint = execute_with_retry("checkpoint", || {
            sqlx::query("PRAGMA wal_checkpoint(TRUNCATE)").execute(pool)
        })
        .await;
        if let Err(e) = checkpoint {
            warn!(error = %e, "Failed to checkpoint WAL on close");
        }
        self.pool.close().await;
        info!(path = %self.path, "Record store closed");
    }
}

impl RecordStore for SqliteRecordStore {
    type Record = Product;

    fn count(&self, since: Option<Watermark>) -> StoreFuture<'_, u64> {
        Box::pin(self.count_changed(since))
    }

    fn fetch_page(
        &self,
        since: Option<Watermark>,
        limit: usize,
        offset: usize,
    ) -> StoreFuture<'_, Vec<Product>> {
        Box::pin(self.fetch_changed_page(since, limit, offset))
    }
}
