// crates/shorewatch-store-sqlite/src/store.rs
// ============================================================================
// Module: SQLite Cache Store
// Description: Bounded-writer key/value cache over per-domain databases.
// Purpose: Implement the persistent cache seam with atomic replacement.
// Dependencies: rusqlite, serde_json, shorewatch-core, time
// ============================================================================

//! ## Overview
//! One database file per cache domain, one writer thread for the whole
//! store. Writers never contend with readers: the writer owns the only
//! mutable connections, readers open read-only handles per call. The write
//! queue is bounded and drops the oldest pending entry on overflow.
//! Expired rows are swept at startup and filtered on every read.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::collections::VecDeque;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Condvar;
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use rusqlite::Connection;
use rusqlite::OpenFlags;
use rusqlite::OptionalExtension;
use rusqlite::params;
use serde_json::Value;
use shorewatch_core::AnalyticError;
use shorewatch_core::ErrorKind;
use shorewatch_core::store::PersistentCacheStore;
use thiserror::Error;
use time::OffsetDateTime;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Schema version recorded via `user_version`.
const SCHEMA_VERSION: i64 = 1;
/// Default busy timeout for connections (ms).
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Default writer queue capacity.
const DEFAULT_QUEUE_CAPACITY: usize = 1_024;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// `SQLite` cache store errors.
///
/// # Invariants
/// - Messages never embed cached values.
#[derive(Debug, Error, Clone)]
pub enum SqliteCacheError {
    /// Store I/O error.
    #[error("sqlite cache io error: {0}")]
    Io(String),
    /// `SQLite` engine error.
    #[error("sqlite cache db error: {0}")]
    Db(String),
    /// Invalid store input.
    #[error("sqlite cache invalid data: {0}")]
    Invalid(String),
    /// Writer thread has shut down.
    #[error("sqlite cache writer stopped")]
    WriterStopped,
}

impl From<SqliteCacheError> for AnalyticError {
    fn from(error: SqliteCacheError) -> Self {
        match error {
            SqliteCacheError::Invalid(message) => Self::new(ErrorKind::Validation, message),
            SqliteCacheError::WriterStopped => {
                Self::new(ErrorKind::ResourceUnavailable, "cache writer stopped")
            }
            other => Self::new(ErrorKind::ResourceUnavailable, other.to_string()),
        }
    }
}

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// `SQLite` cache store configuration.
///
/// # Invariants
/// - `directory` is created on open; databases live directly inside it.
/// - `writer_queue_capacity` is greater than zero.
#[derive(Debug, Clone)]
pub struct SqliteCacheConfig {
    /// Directory holding the per-domain database files.
    pub directory: PathBuf,
    /// Busy timeout in milliseconds.
    pub busy_timeout_ms: u64,
    /// Writer queue capacity.
    pub writer_queue_capacity: usize,
}

impl SqliteCacheConfig {
    /// Creates a configuration with defaults for the given directory.
    #[must_use]
    pub fn new(directory: PathBuf) -> Self {
        Self {
            directory,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            writer_queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

// ============================================================================
// SECTION: Write Queue
// ============================================================================

/// One queued write.
#[derive(Debug)]
struct WriteCommand {
    /// Cache domain.
    domain: String,
    /// Entry key.
    key: String,
    /// Serialized JSON value.
    value_json: String,
    /// Expiry as unix seconds.
    expires_at: i64,
}

/// Shared queue state between submitters and the writer thread.
#[derive(Debug, Default)]
struct QueueState {
    /// Pending writes, oldest first.
    pending: VecDeque<WriteCommand>,
    /// True once the store is shutting down.
    shutdown: bool,
    /// Count of writes dropped due to overflow.
    dropped: u64,
}

/// Bounded write queue with drop-oldest overflow behavior.
#[derive(Debug)]
struct WriteQueue {
    /// Guarded queue state.
    state: Mutex<QueueState>,
    /// Writer wake-up signal.
    signal: Condvar,
    /// Maximum pending writes.
    capacity: usize,
}

impl WriteQueue {
    /// Creates an empty queue with the given capacity.
    fn new(capacity: usize) -> Self {
        Self {
            state: Mutex::new(QueueState::default()),
            signal: Condvar::new(),
            capacity: capacity.max(1),
        }
    }

    /// Enqueues a write, dropping the oldest pending entry on overflow.
    fn push(&self, command: WriteCommand) -> Result<(), SqliteCacheError> {
        let Ok(mut state) = self.state.lock() else {
            return Err(SqliteCacheError::Io("write queue mutex poisoned".to_string()));
        };
        if state.shutdown {
            return Err(SqliteCacheError::WriterStopped);
        }
        if state.pending.len() == self.capacity {
            state.pending.pop_front();
            state.dropped += 1;
        }
        state.pending.push_back(command);
        drop(state);
        self.signal.notify_one();
        Ok(())
    }

    /// Pops the next write, blocking until one arrives or shutdown.
    fn pop(&self) -> Option<WriteCommand> {
        let Ok(mut state) = self.state.lock() else {
            return None;
        };
        loop {
            if let Some(command) = state.pending.pop_front() {
                return Some(command);
            }
            if state.shutdown {
                return None;
            }
            state = self.signal.wait(state).ok()?;
        }
    }

    /// Signals shutdown and wakes the writer.
    fn shutdown(&self) {
        if let Ok(mut state) = self.state.lock() {
            state.shutdown = true;
        }
        self.signal.notify_all();
    }

    /// Returns the drop counter.
    fn dropped(&self) -> u64 {
        self.state.lock().map(|state| state.dropped).unwrap_or(0)
    }
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// `SQLite`-backed persistent cache store.
///
/// # Invariants
/// - All mutations flow through the single writer thread.
/// - Domain names are restricted to `[a-z0-9_-]`.
#[derive(Clone)]
pub struct SqliteCacheStore {
    /// Store configuration.
    config: SqliteCacheConfig,
    /// Shared write queue.
    queue: Arc<WriteQueue>,
    /// Writer join handle, held for shutdown.
    writer: Arc<Mutex<Option<thread::JoinHandle<()>>>>,
}

impl SqliteCacheStore {
    /// Opens the store, creating the directory and starting the writer.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteCacheError`] when the directory cannot be created.
    pub fn open(config: SqliteCacheConfig) -> Result<Self, SqliteCacheError> {
        std::fs::create_dir_all(&config.directory)
            .map_err(|err| SqliteCacheError::Io(err.to_string()))?;
        let queue = Arc::new(WriteQueue::new(config.writer_queue_capacity));
        let writer_queue = Arc::clone(&queue);
        let writer_config = config.clone();
        let handle = thread::Builder::new()
            .name("shorewatch-cache-writer".to_string())
            .spawn(move || writer_loop(&writer_config, &writer_queue))
            .map_err(|err| SqliteCacheError::Io(err.to_string()))?;
        Ok(Self {
            config,
            queue,
            writer: Arc::new(Mutex::new(Some(handle))),
        })
    }

    /// Returns the number of writes dropped due to queue overflow.
    #[must_use]
    pub fn dropped_writes(&self) -> u64 {
        self.queue.dropped()
    }

    /// Waits until the write queue is empty (test support).
    pub fn flush(&self) {
        loop {
            let empty = self
                .queue
                .state
                .lock()
                .map(|state| state.pending.is_empty())
                .unwrap_or(true);
            if empty {
                // One more beat for the in-flight command.
                thread::sleep(Duration::from_millis(10));
                return;
            }
            thread::sleep(Duration::from_millis(5));
        }
    }

    /// Returns the database path for a domain.
    fn domain_path(&self, domain: &str) -> Result<PathBuf, SqliteCacheError> {
        validate_domain(domain)?;
        Ok(self.config.directory.join(format!("{domain}.db")))
    }
}

impl Drop for SqliteCacheStore {
    fn drop(&mut self) {
        // Idempotent teardown: only the final clone joins the writer.
        let Ok(mut writer) = self.writer.lock() else {
            return;
        };
        if Arc::strong_count(&self.queue) <= 2
            && let Some(handle) = writer.take()
        {
            self.queue.shutdown();
            let _ = handle.join();
        }
    }
}

impl PersistentCacheStore for SqliteCacheStore {
    fn get(&self, domain: &str, key: &str) -> Result<Option<Value>, AnalyticError> {
        let path = self.domain_path(domain).map_err(AnalyticError::from)?;
        if !path.exists() {
            return Ok(None);
        }
        let connection = open_read_only(&path, self.config.busy_timeout_ms)
            .map_err(AnalyticError::from)?;
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let row: Option<String> = connection
            .query_row(
                "SELECT value_json FROM entries WHERE key = ?1 AND expires_at > ?2",
                params![key, now],
                |row| row.get(0),
            )
            .optional()
            .map_err(|err| AnalyticError::from(SqliteCacheError::Db(err.to_string())))?;
        let Some(raw) = row else {
            return Ok(None);
        };
        // A corrupt value degrades to a miss.
        Ok(serde_json::from_str(&raw).ok())
    }

    fn put(
        &self,
        domain: &str,
        key: &str,
        value: &Value,
        ttl: Duration,
    ) -> Result<(), AnalyticError> {
        validate_domain(domain).map_err(AnalyticError::from)?;
        let expires_at = OffsetDateTime::now_utc().unix_timestamp()
            + i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);
        self.queue
            .push(WriteCommand {
                domain: domain.to_string(),
                key: key.to_string(),
                value_json: value.to_string(),
                expires_at,
            })
            .map_err(AnalyticError::from)
    }

    fn sweep_expired(&self) -> Result<u64, AnalyticError> {
        let mut removed: u64 = 0;
        let entries = std::fs::read_dir(&self.config.directory)
            .map_err(|err| AnalyticError::from(SqliteCacheError::Io(err.to_string())))?;
        let now = OffsetDateTime::now_utc().unix_timestamp();
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().is_none_or(|ext| ext != "db") {
                continue;
            }
            let mut connection = open_writable(&path, self.config.busy_timeout_ms)
                .map_err(AnalyticError::from)?;
            let tx = connection
                .transaction()
                .map_err(|err| AnalyticError::from(SqliteCacheError::Db(err.to_string())))?;
            let count = tx
                .execute("DELETE FROM entries WHERE expires_at <= ?1", params![now])
                .map_err(|err| AnalyticError::from(SqliteCacheError::Db(err.to_string())))?;
            tx.commit()
                .map_err(|err| AnalyticError::from(SqliteCacheError::Db(err.to_string())))?;
            removed += u64::try_from(count).unwrap_or(0);
        }
        Ok(removed)
    }

    fn readiness(&self) -> Result<(), AnalyticError> {
        let probe = self.config.directory.join(".ready");
        std::fs::write(&probe, b"ok")
            .and_then(|()| std::fs::remove_file(&probe))
            .map_err(|err| AnalyticError::from(SqliteCacheError::Io(err.to_string())))
    }
}

// ============================================================================
// SECTION: Writer Thread
// ============================================================================

/// Consumes the write queue until shutdown.
fn writer_loop(config: &SqliteCacheConfig, queue: &WriteQueue) {
    let mut connections: HashMap<String, Connection> = HashMap::new();
    while let Some(command) = queue.pop() {
        let connection = match connections.entry(command.domain.clone()) {
            std::collections::hash_map::Entry::Occupied(entry) => entry.into_mut(),
            std::collections::hash_map::Entry::Vacant(entry) => {
                let path = config.directory.join(format!("{}.db", command.domain));
                match open_writable(&path, config.busy_timeout_ms) {
                    Ok(connection) => entry.insert(connection),
                    Err(_) => continue,
                }
            }
        };
        let _ = apply_write(connection, &command);
    }
}

/// Applies one write inside a transaction (atomic replace per key).
fn apply_write(connection: &mut Connection, command: &WriteCommand) -> Result<(), SqliteCacheError> {
    let tx = connection.transaction().map_err(|err| SqliteCacheError::Db(err.to_string()))?;
    tx.execute(
        "INSERT INTO entries (key, value_json, expires_at) VALUES (?1, ?2, ?3)
         ON CONFLICT(key) DO UPDATE SET value_json = excluded.value_json,
         expires_at = excluded.expires_at",
        params![command.key, command.value_json, command.expires_at],
    )
    .map_err(|err| SqliteCacheError::Db(err.to_string()))?;
    tx.commit().map_err(|err| SqliteCacheError::Db(err.to_string()))
}

// ============================================================================
// SECTION: Connections
// ============================================================================

/// Opens (and initializes) a writable domain database.
fn open_writable(path: &Path, busy_timeout_ms: u64) -> Result<Connection, SqliteCacheError> {
    let connection =
        Connection::open(path).map_err(|err| SqliteCacheError::Io(err.to_string()))?;
    initialize(&connection, busy_timeout_ms)?;
    Ok(connection)
}

/// Opens a read-only connection to an existing domain database.
fn open_read_only(path: &Path, busy_timeout_ms: u64) -> Result<Connection, SqliteCacheError> {
    let connection = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)
        .map_err(|err| SqliteCacheError::Io(err.to_string()))?;
    connection
        .busy_timeout(Duration::from_millis(busy_timeout_ms))
        .map_err(|err| SqliteCacheError::Db(err.to_string()))?;
    Ok(connection)
}

/// Applies pragmas and the schema to a writable connection.
fn initialize(connection: &Connection, busy_timeout_ms: u64) -> Result<(), SqliteCacheError> {
    connection
        .busy_timeout(Duration::from_millis(busy_timeout_ms))
        .map_err(|err| SqliteCacheError::Db(err.to_string()))?;
    connection
        .pragma_update(None, "journal_mode", "wal")
        .map_err(|err| SqliteCacheError::Db(err.to_string()))?;
    connection
        .pragma_update(None, "user_version", SCHEMA_VERSION)
        .map_err(|err| SqliteCacheError::Db(err.to_string()))?;
    connection
        .execute(
            "CREATE TABLE IF NOT EXISTS entries (
                key TEXT PRIMARY KEY,
                value_json TEXT NOT NULL,
                expires_at INTEGER NOT NULL
            )",
            [],
        )
        .map_err(|err| SqliteCacheError::Db(err.to_string()))?;
    Ok(())
}

/// Restricts domain names to a filesystem-safe alphabet.
fn validate_domain(domain: &str) -> Result<(), SqliteCacheError> {
    if domain.is_empty()
        || !domain.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-')
    {
        return Err(SqliteCacheError::Invalid(format!("invalid cache domain: {domain}")));
    }
    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================
