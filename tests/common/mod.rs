//! Shared test utilities for integration tests.
//!
//! This module provides:
//! - A scripted broker that records every call
//! - An in-memory product store with slow, out-of-order pages
//! - Product fixtures

pub mod mock_broker;
pub mod mock_store;

pub use mock_broker::*;
pub use mock_store::*;

use change_relay::Product;
use chrono::{DateTime, Duration, TimeZone, Utc};

/// Fixed reference instant for tests.
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 7, 1, 12, 0, 0).unwrap()
}

/// `count` priced products `SKU-0000..`, stamped one second apart from `stamp`.
pub fn products(count: usize, stamp: DateTime<Utc>) -> Vec<Product> {
    (0..count)
        .map(|i| {
            let mut product = Product::priced(format!("SKU-{:04}", i), 9.99);
            product.current_stock = i as f64;
            product.sync_stamp = Some(stamp + Duration::seconds(i as i64));
            product
        })
        .collect()
}
