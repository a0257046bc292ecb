//! Daily generation quota.
//!
//! One [`QuotaRecord`] lives in storage. It is checked and, on day rollover,
//! replaced lazily on every access; nothing runs in the background. The
//! tracker never fails: unreadable or malformed state is treated as absent,
//! which means a full allowance for today.

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

use crate::storage::QuotaStorage;

/// Storage key holding the JSON-encoded quota record
pub const QUOTA_STORAGE_KEY: &str = "cardgen.quota";

/// Default number of successful generations allowed per day
pub const DEFAULT_DAILY_LIMIT: u32 = 3;

/// Persisted daily counter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaRecord {
    /// Successful generations recorded on `date`
    pub count: u32,
    /// Calendar day in the tracker's local timezone
    pub date: NaiveDate,
}

impl QuotaRecord {
    pub fn fresh(date: NaiveDate) -> Self {
        Self { count: 0, date }
    }
}

/// Source of "today" for the reset boundary
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// Local-timezone wall clock
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalClock;

impl Clock for LocalClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// Clock pinned to a settable date
#[derive(Debug)]
pub struct FixedClock {
    date: Mutex<NaiveDate>,
}

impl FixedClock {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date: Mutex::new(date),
        }
    }

    pub fn set(&self, date: NaiveDate) {
        *self.date.lock().unwrap_or_else(|p| p.into_inner()) = date;
    }
}

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        *self.date.lock().unwrap_or_else(|p| p.into_inner())
    }
}

/// Tracks successful generations per day against a fixed limit
#[derive(Clone)]
pub struct QuotaTracker {
    storage: Arc<dyn QuotaStorage>,
    clock: Arc<dyn Clock>,
    limit: u32,
}

impl QuotaTracker {
    pub fn new(storage: Arc<dyn QuotaStorage>, clock: Arc<dyn Clock>, limit: u32) -> Self {
        Self {
            storage,
            clock,
            limit,
        }
    }

    /// Daily generation limit
    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Generations still allowed today. Never negative.
    pub fn remaining(&self) -> u32 {
        let record = self.current_record();
        self.remaining_for(&record)
    }

    /// Records one successful generation and returns the new remaining count
    pub fn record_success(&self) -> u32 {
        let mut record = self.current_record();
        record.count = record.count.saturating_add(1);
        self.write(&record);

        log::debug!(
            "Recorded generation {} of {} for {}",
            record.count,
            self.limit,
            record.date
        );

        self.remaining_for(&record)
    }

    /// Current record after the rollover check
    pub fn snapshot(&self) -> QuotaRecord {
        self.current_record()
    }

    fn remaining_for(&self, record: &QuotaRecord) -> u32 {
        self.limit.saturating_sub(record.count)
    }

    /// Reads the stored record, replacing it when absent, unreadable or stale
    fn current_record(&self) -> QuotaRecord {
        let today = self.clock.today();

        match self.read() {
            Some(record) if record.date == today => record,
            Some(stale) => {
                log::info!(
                    "Quota day rolled over ({} -> {}), resetting count",
                    stale.date,
                    today
                );
                let fresh = QuotaRecord::fresh(today);
                self.write(&fresh);
                fresh
            }
            None => {
                let fresh = QuotaRecord::fresh(today);
                self.write(&fresh);
                fresh
            }
        }
    }

    fn read(&self) -> Option<QuotaRecord> {
        let raw = match self.storage.get(QUOTA_STORAGE_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                log::warn!("Quota storage unavailable, assuming full quota: {}", e);
                return None;
            }
        };

        match serde_json::from_str::<QuotaRecord>(&raw) {
            Ok(record) => Some(record),
            Err(e) => {
                log::warn!("Malformed quota record, reinitializing: {}", e);
                None
            }
        }
    }

    fn write(&self, record: &QuotaRecord) {
        let raw = match serde_json::to_string(record) {
            Ok(raw) => raw,
            Err(e) => {
                log::warn!("Failed to encode quota record: {}", e);
                return;
            }
        };

        if let Err(e) = self.storage.set(QUOTA_STORAGE_KEY, &raw) {
            log::warn!("Failed to persist quota record: {}", e);
        }
    }
}

impl std::fmt::Debug for QuotaTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuotaTracker")
            .field("limit", &self.limit)
            .finish_non_exhaustive()
    }
}
