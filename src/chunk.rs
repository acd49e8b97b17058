// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Partitioning of outbound messages into broker-sized batches.

/// Broker-imposed cap on entries per batch-publish call.
pub const MAX_BATCH_ENTRIES: usize = 10;

/// Split `items` into consecutive groups of at most `size`, preserving order.
///
/// The last group may be smaller. `size` must be non-zero; a zero size is
/// treated as 1 in release builds.
pub fn chunk<T>(items: Vec<T>, size: usize) -> Vec<Vec<T>> {
    debug_assert!(size > 0, "chunk size must be positive");
    let size = size.max(1);

    let mut chunks = Vec::with_capacity(items.len().div_ceil(size));
    let mut current = Vec::with_capacity(size.min(items.len()));

    for item in items {
        current.push(item);
        if current.len() == size {
            chunks.push(std::mem::replace(&mut current, Vec::with_capacity(size)));
        }
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}
