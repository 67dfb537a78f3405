// crates/shorewatch-core/tests/proptest_cursor.rs
// ============================================================================
// Module: Cursor Property Tests
// Description: Property tests for cursor round-trips and binding.
// Purpose: Validate decode(encode(c)) = c over generated cursors.
// Dependencies: proptest, serde_json, shorewatch-core
// ============================================================================

//! ## Overview
//! Generates cursors over arbitrary sort values, page sizes, and
//! fingerprints and asserts round-trip identity plus fingerprint binding.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only assertions."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use proptest::prelude::*;
use serde_json::json;
use shorewatch_core::CursorError;
use shorewatch_core::PaginationCursor;

// ============================================================================
// SECTION: Strategies
// ============================================================================

/// Strategy over representative sort values.
fn sort_value() -> impl Strategy<Value = serde_json::Value> {
    prop_oneof![
        any::<i64>().prop_map(|n| json!(n)),
        "[a-z0-9-]{1,24}".prop_map(|s| json!(s)),
    ]
}

proptest! {
    #[test]
    fn round_trip_is_identity(
        sort_field in "[a-z@._]{1,20}",
        value in sort_value(),
        tiebreak in "[a-zA-Z0-9-]{1,32}",
        page_size in 1u32..10_000,
        fingerprint in "[a-f0-9]{16}",
    ) {
        let cursor = PaginationCursor {
            sort_field,
            last_sort_value: value,
            tiebreak_id: tiebreak,
            page_size,
            query_fingerprint: fingerprint,
        };
        let token = cursor.encode().expect("encode");
        let decoded = PaginationCursor::decode(&token).expect("decode");
        prop_assert_eq!(decoded, cursor);
    }

    #[test]
    fn foreign_fingerprints_are_rejected(
        fingerprint in "[a-f0-9]{16}",
        other in "[a-f0-9]{16}",
    ) {
        prop_assume!(fingerprint != other);
        let cursor = PaginationCursor {
            sort_field: "@timestamp".to_string(),
            last_sort_value: json!(0),
            tiebreak_id: "d-1".to_string(),
            page_size: 100,
            query_fingerprint: fingerprint,
        };
        prop_assert_eq!(
            cursor.verify_fingerprint(&other),
            Err(CursorError::FingerprintMismatch)
        );
    }
}
