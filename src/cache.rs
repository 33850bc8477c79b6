//! Single-slot station cache.
//!
//! Only the full resolved station list is cached. Replacing it swaps one
//! `Arc<Vec<Station>>`, so readers either see the old list or the new one.
//! The lock is never held across an `.await`.

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::Instant;

use crate::model::{DataSource, Station};

#[derive(Debug, Clone)]
struct Entry {
    stations: Arc<Vec<Station>>,
    source: DataSource,
    fetched_at: Instant,
    fetched_wall: DateTime<Utc>,
}

/// Point-in-time view of the cache for status reporting.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheSnapshot {
    pub stations: usize,
    pub source: Option<DataSource>,
    pub last_fetch: Option<DateTime<Utc>>,
    pub age: Option<Duration>,
    pub valid: bool,
}

/// The cached station list with a fixed time-to-live.
#[derive(Debug)]
pub struct StationCache {
    slot: RwLock<Option<Entry>>,
    duration: Duration,
}

impl StationCache {
    pub fn new(duration: Duration) -> Self {
        Self {
            slot: RwLock::new(None),
            duration,
        }
    }

    /// The cached list and its source, if still within the TTL.
    pub fn get(&self) -> Option<(Arc<Vec<Station>>, DataSource)> {
        let slot = self.slot.read().unwrap_or_else(PoisonError::into_inner);
        slot.as_ref()
            .filter(|entry| entry.fetched_at.elapsed() < self.duration)
            .map(|entry| (Arc::clone(&entry.stations), entry.source))
    }

    /// Replace the cached list, returning the shared handle now cached.
    pub fn store(&self, stations: Vec<Station>, source: DataSource) -> Arc<Vec<Station>> {
        let stations = Arc::new(stations);
        let entry = Entry {
            stations: Arc::clone(&stations),
            source,
            fetched_at: Instant::now(),
            fetched_wall: Utc::now(),
        };
        *self.slot.write().unwrap_or_else(PoisonError::into_inner) = Some(entry);
        stations
    }

    pub fn clear(&self) {
        *self.slot.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub fn snapshot(&self) -> CacheSnapshot {
        let slot = self.slot.read().unwrap_or_else(PoisonError::into_inner);
        match slot.as_ref() {
            Some(entry) => {
                let age = entry.fetched_at.elapsed();
                CacheSnapshot {
                    stations: entry.stations.len(),
                    source: Some(entry.source),
                    last_fetch: Some(entry.fetched_wall),
                    age: Some(age),
                    valid: age < self.duration,
                }
            }
            None => CacheSnapshot {
                stations: 0,
                source: None,
                last_fetch: None,
                age: None,
                valid: false,
            },
        }
    }
}
