//! Rate-limited dispatcher for detail fetches
//!
//! This module handles:
//! - Global concurrency limiting via a semaphore
//! - Minimum spacing between successive request starts (shared pacing clock)
//! - Retrying transient failures under a `RetryPolicy`
//! - Delivering exactly one outcome per submitted task, even on panic

use crate::pipeline::retry::RetryPolicy;
use crate::state::FailureKind;
use crate::FetchError;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, Semaphore};
use tokio::time::Instant;

/// Spaces successive request starts by a minimum delay
///
/// Clones share the same clock, so listing and detail requests are spaced
/// against each other.
#[derive(Debug, Clone)]
pub struct Pacer {
    delay: Duration,
    next_slot: Arc<Mutex<Option<Instant>>>,
}

impl Pacer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            next_slot: Arc::new(Mutex::new(None)),
        }
    }

    /// Waits for the next start slot
    ///
    /// Slots are reserved under the lock and handed out in call order, each
    /// at least `delay` after the previous one.
    pub async fn wait(&self) {
        let slot = {
            let mut next = self
                .next_slot
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            let now = Instant::now();
            let slot = match *next {
                Some(reserved) if reserved > now => reserved,
                _ => now,
            };
            *next = Some(slot + self.delay);
            slot
        };

        tokio::time::sleep_until(slot).await;
    }
}

/// Why a dispatched task did not produce a value
#[derive(Debug, Clone, Error)]
pub enum TaskError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("task for {0} panicked before reporting")]
    Panicked(String),
}

impl TaskError {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Fetch(error) => error.kind(),
            Self::Panicked(_) => FailureKind::Panicked,
        }
    }
}

/// Terminal outcome of one submitted task
#[derive(Debug)]
pub struct TaskOutcome<T> {
    pub id: u64,
    pub label: String,
    pub result: Result<T, TaskError>,

    /// Attempts made, including the first one
    pub attempts: u32,
}

impl<T> TaskOutcome<T> {
    pub fn retries(&self) -> u32 {
        self.attempts.saturating_sub(1)
    }
}

/// Handle for a submitted task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskHandle {
    id: u64,
}

impl TaskHandle {
    pub fn id(&self) -> u64 {
        self.id
    }
}

/// Sends a panic outcome if the task is dropped before reporting
struct OutcomeGuard<T> {
    id: u64,
    label: String,
    tx: mpsc::UnboundedSender<TaskOutcome<T>>,
    sent: bool,
}

impl<T> OutcomeGuard<T> {
    fn send(mut self, result: Result<T, TaskError>, attempts: u32) {
        self.sent = true;
        let _ = self.tx.send(TaskOutcome {
            id: self.id,
            label: std::mem::take(&mut self.label),
            result,
            attempts,
        });
    }
}

impl<T> Drop for OutcomeGuard<T> {
    fn drop(&mut self) {
        if !self.sent {
            let _ = self.tx.send(TaskOutcome {
                id: self.id,
                label: self.label.clone(),
                result: Err(TaskError::Panicked(self.label.clone())),
                attempts: 1,
            });
        }
    }
}

/// Dispatcher bounding concurrent tasks and spacing their starts
///
/// Each attempt holds a semaphore permit for its duration only; backoff
/// sleeps between attempts do not occupy a slot.
pub struct Dispatcher<T> {
    semaphore: Arc<Semaphore>,
    pacer: Pacer,
    policy: RetryPolicy,
    tx: mpsc::UnboundedSender<TaskOutcome<T>>,
    rx: mpsc::UnboundedReceiver<TaskOutcome<T>>,
    next_id: u64,
    in_flight: usize,
}

impl<T: Send + 'static> Dispatcher<T> {
    /// Creates a new dispatcher
    ///
    /// # Arguments
    ///
    /// * `max_concurrency` - Maximum attempts in flight (at least 1)
    /// * `pacer` - Pacing clock, possibly shared with other request sources
    /// * `policy` - Retry policy applied to every task
    pub fn new(max_concurrency: usize, pacer: Pacer, policy: RetryPolicy) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrency.max(1))),
            pacer,
            policy,
            tx,
            rx,
            next_id: 0,
            in_flight: 0,
        }
    }

    /// Submits a task
    ///
    /// `factory` is called once per attempt and must build a fresh future.
    pub fn submit<F, Fut>(&mut self, label: impl Into<String>, mut factory: F) -> TaskHandle
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, FetchError>> + Send + 'static,
    {
        let id = self.next_id;
        self.next_id += 1;
        self.in_flight += 1;

        let guard = OutcomeGuard {
            id,
            label: label.into(),
            tx: self.tx.clone(),
            sent: false,
        };
        let semaphore = Arc::clone(&self.semaphore);
        let pacer = self.pacer.clone();
        let policy = self.policy;

        tokio::spawn(async move {
            let retried = policy
                .run(|_attempt| {
                    let semaphore = Arc::clone(&semaphore);
                    let pacer = pacer.clone();
                    let attempt = factory();
                    async move {
                        let _permit = semaphore.acquire_owned().await.map_err(|_| {
                            FetchError::Fatal {
                                url: String::new(),
                                reason: "dispatcher closed".to_string(),
                            }
                        })?;
                        pacer.wait().await;
                        attempt.await
                    }
                })
                .await;

            guard.send(retried.result.map_err(TaskError::from), retried.attempts);
        });

        TaskHandle { id }
    }

    /// Number of submitted tasks whose outcome has not been taken yet
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Waits for the next outcome; None once every outcome was taken
    pub async fn next_outcome(&mut self) -> Option<TaskOutcome<T>> {
        if self.in_flight == 0 {
            return None;
        }
        let outcome = self.rx.recv().await?;
        self.in_flight -= 1;
        Some(outcome)
    }

    /// Takes an outcome that is already available, without waiting
    pub fn try_next_outcome(&mut self) -> Option<TaskOutcome<T>> {
        if self.in_flight == 0 {
            return None;
        }
        let outcome = self.rx.try_recv().ok()?;
        self.in_flight -= 1;
        Some(outcome)
    }

    /// Waits for every remaining outcome
    pub async fn drain(&mut self) -> Vec<TaskOutcome<T>> {
        let mut outcomes = Vec::with_capacity(self.in_flight);
        while let Some(outcome) = self.next_outcome().await {
            outcomes.push(outcome);
        }
        outcomes
    }
}
