// crates/shorewatch-core/src/cursor.rs
// ============================================================================
// Module: Pagination Cursors
// Description: Opaque, fingerprint-bound pagination tokens.
// Purpose: Encode resumable positions that cannot cross queries.
// Dependencies: base64, serde, serde_json, sha2
// ============================================================================

//! ## Overview
//! A cursor encodes the position after the last returned document: the sort
//! field, the last sort value, the tiebreak document id, the page size, and
//! the fingerprint of the query that produced it. Tokens are opaque base64
//! with an embedded checksum. A token presented against a different query
//! fingerprint fails with [`CursorError::FingerprintMismatch`]; a tampered
//! token fails the checksum before any field is trusted and surfaces the
//! same mismatch, because a token that fails integrity cannot be bound to
//! any query.
//! Security posture: cursor tokens arrive from untrusted clients and must
//! be integrity-checked before decoding.

// ============================================================================
// SECTION: Imports
// ============================================================================

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use sha2::Digest;
use sha2::Sha256;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Checksum length in bytes appended to the encoded payload.
const CHECKSUM_BYTES: usize = 8;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Cursor encoding and validation errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CursorError {
    /// Token is not valid base64 or not valid cursor JSON.
    #[error("cursor token is malformed")]
    Malformed,
    /// Token does not match this query: the embedded fingerprint
    /// disagrees, or the checksum failed and no binding can be trusted.
    #[error("cursor does not match this query")]
    FingerprintMismatch,
}

// ============================================================================
// SECTION: Cursor
// ============================================================================

/// Decoded pagination cursor.
///
/// # Invariants
/// - A cursor is valid only against the `query_fingerprint` that minted it.
/// - `page_size` is the size in effect when the cursor was minted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaginationCursor {
    /// Sort field the position refers to.
    pub sort_field: String,
    /// Last observed sort value.
    pub last_sort_value: Value,
    /// Last observed document id (sort tiebreaker).
    pub tiebreak_id: String,
    /// Page size in effect.
    pub page_size: u32,
    /// Fingerprint of the producing query.
    pub query_fingerprint: String,
}

impl PaginationCursor {
    /// Encodes the cursor into an opaque token.
    ///
    /// # Errors
    ///
    /// Returns [`CursorError::Malformed`] when the payload cannot be
    /// serialized (a non-string-keyed map in `last_sort_value`).
    pub fn encode(&self) -> Result<String, CursorError> {
        let payload = serde_json::to_vec(self).map_err(|_| CursorError::Malformed)?;
        let digest = Sha256::digest(&payload);
        let mut framed = payload;
        framed.extend_from_slice(&digest[..CHECKSUM_BYTES]);
        Ok(URL_SAFE_NO_PAD.encode(framed))
    }

    /// Decodes and integrity-checks an opaque token.
    ///
    /// # Errors
    ///
    /// Returns [`CursorError::Malformed`] on undecodable tokens and
    /// [`CursorError::FingerprintMismatch`] when the checksum does not
    /// match: a tampered token cannot be bound to any query.
    pub fn decode(token: &str) -> Result<Self, CursorError> {
        let framed = URL_SAFE_NO_PAD.decode(token).map_err(|_| CursorError::Malformed)?;
        if framed.len() <= CHECKSUM_BYTES {
            return Err(CursorError::Malformed);
        }
        let (payload, checksum) = framed.split_at(framed.len() - CHECKSUM_BYTES);
        let digest = Sha256::digest(payload);
        if digest[..CHECKSUM_BYTES] != *checksum {
            return Err(CursorError::FingerprintMismatch);
        }
        serde_json::from_slice(payload).map_err(|_| CursorError::Malformed)
    }

    /// Verifies the cursor against the fingerprint of the consuming query.
    ///
    /// # Errors
    ///
    /// Returns [`CursorError::FingerprintMismatch`] when the fingerprints
    /// disagree.
    pub fn verify_fingerprint(&self, fingerprint: &str) -> Result<(), CursorError> {
        if self.query_fingerprint == fingerprint {
            Ok(())
        } else {
            Err(CursorError::FingerprintMismatch)
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
