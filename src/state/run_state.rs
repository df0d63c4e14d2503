use crate::storage::UpsertOutcome;
use std::fmt;
use std::time::{Duration, Instant};

/// Why a record ended up failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Transient fetch error that outlived the retry budget
    Transient,

    /// Non-retryable HTTP failure (4xx, unreadable response)
    Fetch,

    /// Detail page layout did not match
    Parse,

    /// Store write failed twice
    Store,

    /// Fetch task died before reporting
    Panicked,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Transient => "transient",
            Self::Fetch => "fetch",
            Self::Parse => "parse",
            Self::Store => "store",
            Self::Panicked => "panicked",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Failure counters broken down by kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FailureCounts {
    pub transient: u64,
    pub fetch: u64,
    pub parse: u64,
    pub store: u64,
    pub panicked: u64,
}

impl FailureCounts {
    fn bump(&mut self, kind: FailureKind) {
        match kind {
            FailureKind::Transient => self.transient += 1,
            FailureKind::Fetch => self.fetch += 1,
            FailureKind::Parse => self.parse += 1,
            FailureKind::Store => self.store += 1,
            FailureKind::Panicked => self.panicked += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.transient + self.fetch + self.parse + self.store + self.panicked
    }

    /// Non-zero counters, in a fixed order
    pub fn non_zero(&self) -> Vec<(FailureKind, u64)> {
        [
            (FailureKind::Transient, self.transient),
            (FailureKind::Fetch, self.fetch),
            (FailureKind::Parse, self.parse),
            (FailureKind::Store, self.store),
            (FailureKind::Panicked, self.panicked),
        ]
        .into_iter()
        .filter(|(_, count)| *count > 0)
        .collect()
    }
}

/// Counters for one pipeline execution
///
/// Owned by the coordinator. Counters move only on terminal outcomes, so
/// retried attempts are never counted as failures.
#[derive(Debug, Clone)]
pub struct RunState {
    /// Next listing page to request (1-based)
    pub page_cursor: u32,

    pub pages_fetched: u32,
    pub records_attempted: u64,
    pub records_stored: u64,
    pub records_new: u64,
    pub records_updated: u64,
    pub failures: FailureCounts,

    /// Extra attempts spent on retries, across all requests
    pub retries: u64,

    /// Stop requesting pages once this many records were attempted
    pub record_cap: Option<u64>,

    /// Why paging stopped early, if it did
    pub aborted: Option<String>,

    started_at: Instant,
}

impl RunState {
    pub fn new(record_cap: Option<u64>) -> Self {
        Self {
            page_cursor: 1,
            pages_fetched: 0,
            records_attempted: 0,
            records_stored: 0,
            records_new: 0,
            records_updated: 0,
            failures: FailureCounts::default(),
            retries: 0,
            record_cap,
            aborted: None,
            started_at: Instant::now(),
        }
    }

    /// Records still allowed under the cap; None when unbounded
    pub fn remaining_capacity(&self) -> Option<u64> {
        self.record_cap
            .map(|cap| cap.saturating_sub(self.records_attempted))
    }

    pub fn cap_reached(&self) -> bool {
        self.remaining_capacity() == Some(0)
    }

    pub fn records_failed(&self) -> u64 {
        self.failures.total()
    }

    /// Records dispatched but without a terminal outcome yet
    pub fn records_pending(&self) -> u64 {
        self.records_attempted - self.records_stored - self.records_failed()
    }

    pub fn record_page(&mut self) {
        self.pages_fetched += 1;
        self.page_cursor += 1;
    }

    pub fn record_dispatched(&mut self, count: u64) {
        self.records_attempted += count;
    }

    pub fn record_stored(&mut self, outcome: UpsertOutcome) {
        self.records_stored += 1;
        match outcome {
            UpsertOutcome::Inserted => self.records_new += 1,
            UpsertOutcome::Replaced => self.records_updated += 1,
            UpsertOutcome::Stale => {}
        }
    }

    pub fn record_failure(&mut self, kind: FailureKind) {
        self.failures.bump(kind);
    }

    pub fn record_retries(&mut self, extra_attempts: u32) {
        self.retries += u64::from(extra_attempts);
    }

    pub fn abort(&mut self, reason: impl Into<String>) {
        self.aborted = Some(reason.into());
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Freezes the counters into a summary
    pub fn statistics(&self) -> RunStatistics {
        RunStatistics {
            pages_fetched: self.pages_fetched,
            records_attempted: self.records_attempted,
            records_stored: self.records_stored,
            records_new: self.records_new,
            records_updated: self.records_updated,
            records_failed: self.records_failed(),
            failures: self.failures,
            retries: self.retries,
            elapsed: self.elapsed(),
            aborted: self.aborted.clone(),
        }
    }
}

/// Final statistics of a scrape run
#[derive(Debug, Clone, PartialEq)]
pub struct RunStatistics {
    pub pages_fetched: u32,
    pub records_attempted: u64,
    pub records_stored: u64,
    pub records_new: u64,
    pub records_updated: u64,
    pub records_failed: u64,
    pub failures: FailureCounts,
    pub retries: u64,
    pub elapsed: Duration,
    pub aborted: Option<String>,
}
