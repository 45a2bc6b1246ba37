/*!
 * Bounded conversion cache.
 *
 * External file-to-Markdown conversion is expensive, so converted documents
 * are kept in a process-wide, capacity-bounded store keyed by a fingerprint
 * of (file content, converter options). The cache is purely in-memory and
 * holds nothing across process restarts.
 *
 * Concurrent misses for the same fingerprint are coalesced: the first caller
 * converts, later callers wait on a per-key in-flight marker and pick up the
 * finished entry. At most one conversion runs per key at any instant.
 */

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::debug;
use parking_lot::Mutex;
use tokio::sync::watch;

use crate::document::{Document, Fingerprint};
use crate::errors::AppError;

/// Default number of converted documents kept in memory
pub const DEFAULT_CACHE_CAPACITY: usize = 10;

/// One cached conversion result
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The converted document; callers treat this as an immutable snapshot
    pub document: Arc<Document>,
    /// When the entry was inserted
    pub inserted_at: DateTime<Utc>,
}

struct CacheInner {
    entries: HashMap<Fingerprint, CacheEntry>,
    /// Insertion order, oldest first; drives eviction
    order: VecDeque<Fingerprint>,
    /// Keys with a conversion currently running; waiters subscribe here
    in_flight: HashMap<Fingerprint, watch::Receiver<()>>,
    hits: usize,
    misses: usize,
}

impl CacheInner {
    fn insert(&mut self, fingerprint: Fingerprint, document: Arc<Document>, capacity: usize) {
        if self.entries.contains_key(&fingerprint) {
            // Re-insertion refreshes the entry's position in eviction order
            self.order.retain(|k| *k != fingerprint);
        } else {
            while self.entries.len() >= capacity {
                match self.order.pop_front() {
                    Some(oldest) => {
                        self.entries.remove(&oldest);
                        debug!("Conversion cache evicted {}", oldest);
                    }
                    None => break,
                }
            }
        }
        self.entries.insert(
            fingerprint.clone(),
            CacheEntry {
                document,
                inserted_at: Utc::now(),
            },
        );
        self.order.push_back(fingerprint);
    }
}

/// Process-wide store of conversion results, shared across workflows
pub struct ConversionCache {
    capacity: usize,
    inner: Mutex<CacheInner>,
}

enum MissAction {
    Wait(watch::Receiver<()>),
    Convert(watch::Sender<()>),
}

impl ConversionCache {
    /// Create a cache with the default capacity
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CACHE_CAPACITY)
    }

    /// Create a cache bounded to `capacity` entries
    pub fn with_capacity(capacity: usize) -> Self {
        ConversionCache {
            capacity: capacity.max(1),
            inner: Mutex::new(CacheInner {
                entries: HashMap::new(),
                order: VecDeque::new(),
                in_flight: HashMap::new(),
                hits: 0,
                misses: 0,
            }),
        }
    }

    /// Look up a converted document by fingerprint
    pub fn get(&self, fingerprint: &Fingerprint) -> Option<Arc<Document>> {
        let mut inner = self.inner.lock();
        match inner.entries.get(fingerprint) {
            Some(entry) => {
                let document = entry.document.clone();
                inner.hits += 1;
                Some(document)
            }
            None => {
                inner.misses += 1;
                None
            }
        }
    }

    /// Insert a converted document, evicting the oldest entry when full
    pub fn put(&self, fingerprint: Fingerprint, document: Document) -> Arc<Document> {
        let document = Arc::new(document);
        let mut inner = self.inner.lock();
        inner.insert(fingerprint, document.clone(), self.capacity);
        document
    }

    /// Return the cached document for `fingerprint`, running `convert` on a
    /// miss.
    ///
    /// Under concurrent misses for the same key only one caller converts;
    /// the rest wait for its result. If the conversion fails the error goes
    /// to the converting caller and the in-flight marker is cleared, so a
    /// waiter may start a fresh attempt — still never more than one at a
    /// time.
    pub async fn get_or_convert<F, Fut>(
        &self,
        fingerprint: Fingerprint,
        convert: F,
    ) -> Result<Arc<Document>, AppError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Document, AppError>>,
    {
        let mut convert = Some(convert);
        loop {
            let action = {
                let mut inner = self.inner.lock();
                if let Some(entry) = inner.entries.get(&fingerprint) {
                    let document = entry.document.clone();
                    inner.hits += 1;
                    return Ok(document);
                }
                match inner.in_flight.get(&fingerprint) {
                    Some(rx) => MissAction::Wait(rx.clone()),
                    None => {
                        inner.misses += 1;
                        let (tx, rx) = watch::channel(());
                        inner.in_flight.insert(fingerprint.clone(), rx);
                        MissAction::Convert(tx)
                    }
                }
            };

            match action {
                MissAction::Wait(mut rx) => {
                    // Wakes on completion; a closed channel means the
                    // converting caller failed and we should re-check.
                    let _ = rx.changed().await;
                }
                MissAction::Convert(tx) => {
                    let convert = match convert.take() {
                        Some(f) => f,
                        // A caller converts at most once per call; waiting
                        // iterations never consume the closure.
                        None => {
                            return Err(AppError::Unknown(
                                "conversion closure consumed twice".to_string(),
                            ));
                        }
                    };
                    let result = convert().await;
                    let outcome = {
                        let mut inner = self.inner.lock();
                        inner.in_flight.remove(&fingerprint);
                        match result {
                            Ok(document) => {
                                let document = Arc::new(document);
                                inner.insert(fingerprint.clone(), document.clone(), self.capacity);
                                Ok(document)
                            }
                            Err(e) => Err(e),
                        }
                    };
                    // Wake waiters after the lock is released; on failure the
                    // sender drop closes the channel with the same effect.
                    let _ = tx.send(());
                    return outcome;
                }
            }
        }
    }

    /// Number of ready entries
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    /// Whether the cache currently holds no entries
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// (hits, misses) counters since construction
    pub fn stats(&self) -> (usize, usize) {
        let inner = self.inner.lock();
        (inner.hits, inner.misses)
    }

    /// Drop all entries and reset counters
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.entries.clear();
        inner.order.clear();
        inner.hits = 0;
        inner.misses = 0;
    }
}

impl Default for ConversionCache {
    fn default() -> Self {
        Self::new()
    }
}
