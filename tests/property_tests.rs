//! Property-based tests using proptest.
//!
//! These tests verify invariants that should hold for all inputs,
//! helping catch edge cases that unit tests might miss.

use change_relay::batch::PendingSet;
use change_relay::broker::{BatchResponse, Failed, Succeeded};
use change_relay::chunk::chunk;
use change_relay::record::{format_timestamp, parse_timestamp};
use change_relay::store::pages_needed;
use change_relay::OutboundMessage;
use chrono::{TimeZone, Utc};
use proptest::prelude::*;

// =============================================================================
// Paging Properties
// =============================================================================

proptest! {
    /// Page count is the ceiling of count / page size
    #[test]
    fn pages_needed_is_ceiling(count in 0u64..100_000u64, page_size in 1usize..1000usize) {
        let pages = pages_needed(count, page_size) as u64;
        let page_size = page_size as u64;

        prop_assert!(pages * page_size >= count);
        if count > 0 {
            prop_assert!((pages - 1) * page_size < count);
        } else {
            prop_assert_eq!(pages, 0);
        }
    }
}

// =============================================================================
// Chunking Properties
// =============================================================================

proptest! {
    /// Chunking keeps every item, in order, in groups of at most `size`
    #[test]
    fn chunk_preserves_order_and_bounds(
        items in proptest::collection::vec(any::<u32>(), 0..300),
        size in 1usize..=10usize,
    ) {
        let chunks = chunk(items.clone(), size);

        prop_assert_eq!(chunks.len(), items.len().div_ceil(size));
        prop_assert!(chunks.iter().all(|c| !c.is_empty() && c.len() <= size));
        // Only the last group may be short
        if let Some((_, full)) = chunks.split_last() {
            prop_assert!(full.iter().all(|c| c.len() == size));
        }
        prop_assert_eq!(chunks.concat(), items);
    }
}

// =============================================================================
// Pending Set Properties
// =============================================================================

fn pending_set(n: usize) -> PendingSet {
    PendingSet::new(
        (0..n)
            .map(|i| OutboundMessage::new(format!("{{\"n\":{}}}", i), format!("key-{}", i)))
            .collect(),
    )
}

proptest! {
    /// Applying responses never grows the pending set, and confirmed ids
    /// are never sent again
    #[test]
    fn pending_set_only_shrinks(
        n in 1usize..=10usize,
        rounds in proptest::collection::vec(proptest::collection::vec(any::<bool>(), 10), 1..6),
    ) {
        let mut set = pending_set(n);
        let mut confirmed_ids: Vec<String> = Vec::new();

        for outcomes in rounds {
            let before = set.pending_count();
            let entries = set.pending_entries();

            for entry in &entries {
                prop_assert!(!confirmed_ids.contains(&entry.id));
            }

            let mut response = BatchResponse::default();
            for (entry, ok) in entries.iter().zip(outcomes) {
                if ok {
                    confirmed_ids.push(entry.id.clone());
                    response.succeeded.push(Succeeded { id: entry.id.clone(), message_id: "m".to_string() });
                } else {
                    response.failed.push(Failed { id: entry.id.clone(), reason: "nope".to_string() });
                }
            }

            let (confirmed, rejected) = set.apply(&response);
            prop_assert_eq!(confirmed + rejected, before);
            prop_assert_eq!(set.pending_count(), before - confirmed);
        }

        prop_assert_eq!(set.pending_count() + confirmed_ids.len(), n);
        let errors = set.into_errors(1, None);
        prop_assert_eq!(errors.len(), n);
        prop_assert_eq!(errors.iter().filter(|e| e.is_none()).count(), confirmed_ids.len());
    }
}

// =============================================================================
// Timestamp Properties
// =============================================================================

proptest! {
    /// Wire timestamps sort the same way as the instants they encode
    #[test]
    fn wire_timestamps_sort_chronologically(
        a in 0i64..4_000_000_000i64,
        b in 0i64..4_000_000_000i64,
        micros_a in 0u32..1_000_000u32,
        micros_b in 0u32..1_000_000u32,
    ) {
        let ta = Utc.timestamp_opt(a, micros_a * 1000).unwrap();
        let tb = Utc.timestamp_opt(b, micros_b * 1000).unwrap();

        let (wa, wb) = (format_timestamp(&ta), format_timestamp(&tb));
        prop_assert_eq!(wa.cmp(&wb), ta.cmp(&tb));
        prop_assert_eq!(parse_timestamp(&wa), Some(ta));
    }
}
