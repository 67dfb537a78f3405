// crates/shorewatch-siem/src/stream.rs
// ============================================================================
// Module: Event Streaming
// Description: Lazy chunked streaming with session-preserving boundaries.
// Purpose: Deliver large result sets without splitting sessions.
// Dependencies: serde, shorewatch-core
// ============================================================================

//! ## Overview
//! Streams are lazy and finite: each `next_chunk` call consumes state and
//! fetches at most a page from the backend. A stream identifier can be
//! registered so an interrupted consumer may resume within the configured
//! TTL. Session-context streaming groups events into sessions (same key
//! fields, no gap over `max_session_gap`) and never splits a session
//! across chunks: chunks are packed from whole sessions, and a single
//! oversized session stretches its chunk rather than splitting.
//! Back-pressure is the caller's: nothing is fetched until the next chunk
//! is requested.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use std::time::Instant;

use serde::Serialize;
use serde_json::Value;
use shorewatch_core::AnalyticError;
use shorewatch_core::ErrorKind;
use shorewatch_core::SecurityEvent;

use crate::executor::EventQueryService;
use crate::executor::QueryRequest;

// ============================================================================
// SECTION: Stream Chunks
// ============================================================================

/// Event annotated with its session metadata.
///
/// # Invariants
/// - `session_event_count` counts every event sharing the session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionEvent {
    /// The underlying event.
    pub event: SecurityEvent,
    /// Session key the event belongs to.
    pub session_key: String,
    /// Session duration in seconds.
    pub session_duration_seconds: i64,
    /// Number of events in the session.
    pub session_event_count: usize,
}

/// One chunk of a stream.
///
/// # Invariants
/// - `next_cursor` is `None` exactly when the stream is exhausted.
#[derive(Debug, Clone, Serialize)]
pub struct StreamChunk {
    /// Events in this chunk.
    pub events: Vec<SessionEvent>,
    /// Estimated total matching events for the stream.
    pub total_estimate: u64,
    /// Cursor for resuming after this chunk, when more remain.
    pub next_cursor: Option<String>,
}

// ============================================================================
// SECTION: Plain Event Stream
// ============================================================================

/// Lazy cursor-driven event stream.
///
/// # Invariants
/// - Non-restartable: every `next_page` consumes the cursor state.
pub struct EventStream {
    /// Query service executing pages.
    service: EventQueryService,
    /// Template request; pagination fields are overwritten per page.
    request: QueryRequest,
    /// Cursor for the next page; `None` before the first fetch.
    cursor: Option<String>,
    /// True once the backend reports no further pages.
    finished: bool,
    /// Total estimate from the last response.
    total_estimate: u64,
}

impl EventStream {
    /// Creates a stream over a query request.
    ///
    /// The request's `page`/`cursor` fields are ignored; the stream manages
    /// its own position.
    #[must_use]
    pub fn new(service: EventQueryService, request: QueryRequest) -> Self {
        Self {
            service,
            request,
            cursor: None,
            finished: false,
            total_estimate: 0,
        }
    }

    /// Returns the estimated stream total observed so far.
    #[must_use]
    pub const fn total_estimate(&self) -> u64 {
        self.total_estimate
    }

    /// Returns the cursor that resumes after the last fetched page.
    #[must_use]
    pub fn resume_cursor(&self) -> Option<&str> {
        self.cursor.as_deref()
    }

    /// Restores the stream position from a persisted cursor.
    pub fn seek(&mut self, cursor: Option<String>) {
        self.cursor = cursor;
        self.finished = false;
    }

    /// Fetches the next page of events; `None` when exhausted.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticError`] on backend or cursor failures.
    pub async fn next_page(&mut self) -> Result<Option<Vec<SecurityEvent>>, AnalyticError> {
        if self.finished {
            return Ok(None);
        }
        let mut request = self.request.clone();
        match self.cursor.take() {
            Some(cursor) => {
                request.page = None;
                request.cursor = Some(cursor);
            }
            None => {
                request.page = Some(1);
                request.cursor = None;
            }
        }
        let page = self.service.query_events(&request).await?;
        self.total_estimate = page.pagination.total_count;
        self.cursor = page.pagination.next_cursor.clone();
        if self.cursor.is_none() {
            self.finished = true;
        }
        if page.events.is_empty() {
            return Ok(None);
        }
        Ok(Some(page.events))
    }
}

// ============================================================================
// SECTION: Sessionization
// ============================================================================

/// One materialized session.
///
/// # Invariants
/// - `events` is non-empty and ordered by timestamp ascending.
#[derive(Debug, Clone)]
pub struct Session {
    /// Session key (joined key-field values).
    pub key: String,
    /// Member events in time order.
    pub events: Vec<SecurityEvent>,
}

impl Session {
    /// Returns the session duration in seconds.
    #[must_use]
    pub fn duration_seconds(&self) -> i64 {
        match (self.events.first(), self.events.last()) {
            (Some(first), Some(last)) => (last.timestamp - first.timestamp).whole_seconds(),
            _ => 0,
        }
    }
}

/// Default session key fields.
pub const DEFAULT_SESSION_FIELDS: &[&str] = &["source_ip", "destination_ip", "user", "session_id"];

/// Builds the session key for one event.
fn session_key(event: &SecurityEvent, fields: &[String]) -> String {
    let mut parts = Vec::with_capacity(fields.len());
    for field in fields {
        let part = match field.as_str() {
            "source_ip" => event.source_ip.map(|ip| ip.to_string()),
            "destination_ip" => event.destination_ip.map(|ip| ip.to_string()),
            "user" => event.raw.get("user").map(raw_string),
            "session_id" => event
                .raw
                .get("session")
                .or_else(|| event.raw.get("session.id"))
                .map(raw_string),
            other => event.raw.get(other).map(raw_string),
        };
        parts.push(part.unwrap_or_else(|| "-".to_string()));
    }
    parts.join("|")
}

/// Renders a raw value as a key fragment.
fn raw_string(value: &Value) -> String {
    value.as_str().map_or_else(|| value.to_string(), ToString::to_string)
}

/// Groups time-ordered events into sessions.
///
/// A session is a maximal run of events sharing the key fields whose
/// consecutive gaps never exceed `max_gap`. Input order does not matter;
/// events are sorted per key before splitting.
#[must_use]
pub fn sessionize(
    events: Vec<SecurityEvent>,
    session_fields: &[String],
    max_gap: Duration,
) -> Vec<Session> {
    let mut by_key: BTreeMap<String, Vec<SecurityEvent>> = BTreeMap::new();
    for event in events {
        let key = session_key(&event, session_fields);
        by_key.entry(key).or_default().push(event);
    }
    let max_gap = time::Duration::seconds_f64(max_gap.as_secs_f64());
    let mut sessions = Vec::new();
    for (key, mut members) in by_key {
        members.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then(a.id.cmp(&b.id)));
        let mut current: Vec<SecurityEvent> = Vec::new();
        for event in members {
            let split = current
                .last()
                .is_some_and(|previous| event.timestamp - previous.timestamp > max_gap);
            if split {
                sessions.push(Session {
                    key: key.clone(),
                    events: std::mem::take(&mut current),
                });
            }
            current.push(event);
        }
        if !current.is_empty() {
            sessions.push(Session {
                key,
                events: current,
            });
        }
    }
    // Chunks are packed in start-time order across keys.
    sessions.sort_by(|a, b| {
        let a_start = a.events.first().map(|event| event.timestamp);
        let b_start = b.events.first().map(|event| event.timestamp);
        a_start.cmp(&b_start)
    });
    sessions
}

/// Packs whole sessions into chunks bounded by `chunk_size`.
///
/// A session never splits: a chunk accepts the next session only while the
/// combined size stays within `chunk_size`, and a session larger than the
/// cap occupies a chunk alone, stretching it rather than splitting.
#[must_use]
pub fn pack_sessions(sessions: Vec<Session>, chunk_size: usize) -> Vec<Vec<SessionEvent>> {
    let mut chunks: Vec<Vec<SessionEvent>> = Vec::new();
    let mut current: Vec<SessionEvent> = Vec::new();
    for session in sessions {
        if !current.is_empty() && current.len() + session.events.len() > chunk_size {
            chunks.push(std::mem::take(&mut current));
        }
        let duration = session.duration_seconds();
        let count = session.events.len();
        for event in session.events {
            current.push(SessionEvent {
                event,
                session_key: session.key.clone(),
                session_duration_seconds: duration,
                session_event_count: count,
            });
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

// ============================================================================
// SECTION: Session Stream
// ============================================================================

/// Parameters for session-context streaming.
///
/// # Invariants
/// - `chunk_size` is greater than zero.
#[derive(Debug, Clone)]
pub struct SessionStreamRequest {
    /// Base query request (pagination fields are managed by the stream).
    pub query: QueryRequest,
    /// Soft cap on events per chunk.
    pub chunk_size: usize,
    /// Fields whose values form the session key.
    pub session_fields: Vec<String>,
    /// Gap that forces a session boundary.
    pub max_session_gap: Duration,
}

/// Lazy session-context stream.
///
/// # Invariants
/// - Emitted chunks contain whole sessions only.
pub struct SessionStream {
    /// Underlying page stream.
    inner: EventStream,
    /// Streaming parameters.
    request: SessionStreamRequest,
    /// Buffered events awaiting sessionization.
    buffer: Vec<SecurityEvent>,
    /// Chunks ready for delivery.
    ready: Vec<Vec<SessionEvent>>,
    /// True once the backend is exhausted.
    drained: bool,
}

impl SessionStream {
    /// Creates a session stream over a query service.
    #[must_use]
    pub fn new(service: EventQueryService, request: SessionStreamRequest) -> Self {
        let mut query = request.query.clone();
        // Session grouping needs ascending time order.
        query.sort_order = shorewatch_core::SortOrder::Asc;
        Self {
            inner: EventStream::new(service, query),
            request,
            buffer: Vec::new(),
            ready: Vec::new(),
            drained: false,
        }
    }

    /// Returns the cursor that resumes after the last fetched page.
    #[must_use]
    pub fn resume_cursor(&self) -> Option<&str> {
        self.inner.resume_cursor()
    }

    /// Restores the underlying stream position from a persisted cursor.
    pub fn seek(&mut self, cursor: Option<String>) {
        self.inner.seek(cursor);
        self.drained = false;
    }

    /// Returns the next session-preserving chunk; `None` when exhausted.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticError`] on backend failures.
    pub async fn next_chunk(&mut self) -> Result<Option<StreamChunk>, AnalyticError> {
        loop {
            if let Some(events) = self.pop_ready() {
                return Ok(Some(StreamChunk {
                    events,
                    total_estimate: self.inner.total_estimate(),
                    next_cursor: self.inner.resume_cursor().map(ToString::to_string),
                }));
            }
            if self.drained {
                if self.buffer.is_empty() {
                    return Ok(None);
                }
                self.flush_buffer();
                continue;
            }
            match self.inner.next_page().await? {
                Some(page) => {
                    self.buffer.extend(page);
                    // Keep pulling until enough whole sessions are buffered
                    // to fill a chunk with margin for open sessions.
                    if self.buffer.len() >= self.request.chunk_size * 2 {
                        self.flush_buffer();
                    }
                }
                None => {
                    self.drained = true;
                }
            }
        }
    }

    /// Sessionizes the buffer and stages ready chunks.
    ///
    /// When the backend is not yet drained, only closed sessions are
    /// emitted: a session whose last event lies within `max_session_gap`
    /// of the buffer horizon may still grow on later pages (events arrive
    /// in ascending time order) and is returned to the buffer instead.
    fn flush_buffer(&mut self) {
        let events = std::mem::take(&mut self.buffer);
        let horizon = events.iter().map(|event| event.timestamp).max();
        let sessions =
            sessionize(events, &self.request.session_fields, self.request.max_session_gap);
        let max_gap = time::Duration::seconds_f64(self.request.max_session_gap.as_secs_f64());
        let mut closed = Vec::new();
        for session in sessions {
            let still_open = !self.drained
                && horizon.is_some_and(|horizon| {
                    session
                        .events
                        .last()
                        .is_some_and(|last| horizon - last.timestamp < max_gap)
                });
            if still_open {
                self.buffer.extend(session.events);
            } else {
                closed.push(session);
            }
        }
        let chunks = pack_sessions(closed, self.request.chunk_size);
        self.ready.extend(chunks);
    }

    /// Pops the oldest staged chunk.
    fn pop_ready(&mut self) -> Option<Vec<SessionEvent>> {
        if self.ready.is_empty() {
            None
        } else {
            Some(self.ready.remove(0))
        }
    }
}

// ============================================================================
// SECTION: Stream Registry
// ============================================================================

/// Persisted position for a resumable stream.
#[derive(Debug, Clone)]
struct StoredStream {
    /// Cursor for the next page; `None` when the stream was exhausted.
    cursor: Option<String>,
    /// Expiry instant.
    expires_at: Instant,
}

/// Registry of resumable streams with TTL eviction.
///
/// # Invariants
/// - Entries past their TTL are treated as unknown.
pub struct StreamRegistry {
    /// TTL applied to saved positions.
    ttl: Duration,
    /// Guarded positions keyed by stream id.
    streams: Mutex<HashMap<String, StoredStream>>,
}

impl StreamRegistry {
    /// Creates a registry with the given TTL.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            streams: Mutex::new(HashMap::new()),
        }
    }

    /// Saves the resume position for a stream.
    pub fn save(&self, stream_id: &str, cursor: Option<String>) {
        let Ok(mut streams) = self.streams.lock() else {
            return;
        };
        let now = Instant::now();
        streams.retain(|_, stored| stored.expires_at > now);
        streams.insert(
            stream_id.to_string(),
            StoredStream {
                cursor,
                expires_at: now + self.ttl,
            },
        );
    }

    /// Loads the resume position for a stream.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticError`] with kind `ResourceNotFound` when the
    /// stream is unknown or its TTL has elapsed.
    pub fn load(&self, stream_id: &str) -> Result<Option<String>, AnalyticError> {
        let Ok(mut streams) = self.streams.lock() else {
            return Err(AnalyticError::internal("stream registry mutex poisoned"));
        };
        let now = Instant::now();
        streams.retain(|_, stored| stored.expires_at > now);
        streams.get(stream_id).map(|stored| stored.cursor.clone()).ok_or_else(|| {
            AnalyticError::new(
                ErrorKind::ResourceNotFound,
                format!("stream {stream_id} is unknown or expired"),
            )
        })
    }

    /// Removes a completed stream.
    pub fn remove(&self, stream_id: &str) {
        if let Ok(mut streams) = self.streams.lock() {
            streams.remove(stream_id);
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
