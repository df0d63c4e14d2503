//! Pipeline coordinator - main scrape orchestration logic
//!
//! This module contains the scrape loop that ties everything together:
//! - Paging through the listing, newest projects first
//! - Fanning detail fetches out through the dispatcher
//! - Fanning outcomes back in and upserting them (single store owner)
//! - Enforcing the record cap and tracking run statistics

use crate::config::{config_fingerprint, Config};
use crate::pipeline::client::build_http_client;
use crate::pipeline::detail::DetailFetcher;
use crate::pipeline::dispatcher::{Dispatcher, Pacer, TaskOutcome};
use crate::pipeline::listing::{clamp_page_size, ListingFetcher, ListingPage, MAX_PAGE_SIZE};
use crate::pipeline::retry::RetryPolicy;
use crate::record::EnrichedRecord;
use crate::state::{FailureKind, PipelinePhase, RunState, RunStatistics};
use crate::storage::{RecordStore, RunStatus, StoreResult, UpsertOutcome};
use crate::{FetchError, HarvestError, Result};
use std::time::Duration;

/// Main pipeline coordinator
///
/// Owns the store for the whole run; fetch tasks never touch it.
pub struct Pipeline<S: RecordStore> {
    store: S,
    listing: ListingFetcher,
    detail: DetailFetcher,
    dispatcher: Dispatcher<EnrichedRecord>,
    pacer: Pacer,
    listing_policy: RetryPolicy,
    page_size: u32,
    backlog_limit: usize,
    config_hash: String,
    state: RunState,
    phase: PipelinePhase,
}

impl<S: RecordStore> Pipeline<S> {
    /// Creates a new pipeline
    ///
    /// # Arguments
    ///
    /// * `config` - Effective configuration (file values plus CLI overrides)
    /// * `store` - Record store the run writes into
    ///
    /// # Returns
    ///
    /// * `Ok(Pipeline)` - Ready to run
    /// * `Err(HarvestError)` - The HTTP client or detail URL could not be set up
    pub fn new(config: &Config, store: S) -> Result<Self> {
        let client = build_http_client(&config.client, &config.source)?;
        let listing = ListingFetcher::new(client.clone(), config.source.listing_url.clone());
        let detail = DetailFetcher::new(client, &config.source.detail_url)?;

        let (page_size, truncated) = clamp_page_size(config.scrape.page_size);
        if truncated {
            tracing::warn!(
                "Page size {} truncated to the service maximum of {}",
                config.scrape.page_size,
                MAX_PAGE_SIZE
            );
        }

        let max_concurrency = config.scrape.max_concurrency.max(1) as usize;
        let pacer = Pacer::new(Duration::from_millis(config.scrape.delay_ms));
        let policy = RetryPolicy::from_config(&config.retry);

        Ok(Self {
            store,
            listing,
            detail,
            dispatcher: Dispatcher::new(max_concurrency, pacer.clone(), policy),
            pacer,
            listing_policy: policy,
            page_size,
            backlog_limit: 2 * max_concurrency,
            config_hash: config_fingerprint(config)?,
            state: RunState::new(config.scrape.max_records),
            phase: PipelinePhase::Paging,
        })
    }

    /// Runs the pipeline to completion and records the run
    ///
    /// Per-record failures are counted, not returned. Only a failure to reach
    /// the first listing page (or to open the run) is an error.
    pub async fn run(&mut self) -> Result<RunStatistics> {
        let run_id = self.store.create_run(&self.config_hash)?;
        tracing::info!("Starting scrape run {}", run_id);

        let result = self.execute().await;

        let (status, stats) = match &result {
            Ok(stats) if stats.aborted.is_some() => (RunStatus::Aborted, stats.clone()),
            Ok(stats) => (RunStatus::Completed, stats.clone()),
            Err(_) => (RunStatus::Failed, self.state.statistics()),
        };

        if let Err(e) = self.store.finish_run(run_id, status, &stats) {
            tracing::warn!("Failed to record the end of run {}: {}", run_id, e);
        }

        result
    }

    /// Current phase
    pub fn phase(&self) -> PipelinePhase {
        self.phase
    }

    /// Counters so far
    pub fn state(&self) -> &RunState {
        &self.state
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    async fn execute(&mut self) -> Result<RunStatistics> {
        loop {
            if self.state.cap_reached() {
                tracing::info!("Record cap reached, no further pages requested");
                self.transition(PipelinePhase::Draining)?;
                break;
            }

            let page_index = self.state.page_cursor;
            let page = match self.fetch_listing_page(page_index).await {
                Ok(page) => page,
                Err(e) if self.state.pages_fetched == 0 => {
                    tracing::error!("Listing unreachable on page {}: {}", page_index, e);
                    return Err(HarvestError::ListingUnreachable {
                        page: page_index,
                        source: e,
                    });
                }
                Err(e) => {
                    tracing::warn!("Stopping pagination at page {}: {}", page_index, e);
                    self.state
                        .abort(format!("listing page {} failed: {}", page_index, e));
                    self.transition(PipelinePhase::Draining)?;
                    break;
                }
            };
            self.state.record_page();

            if page.records.is_empty() && !page.has_more {
                tracing::info!("Listing exhausted at page {}", page_index);
                self.transition(PipelinePhase::Draining)?;
                break;
            }

            let has_more = page.has_more;
            self.transition(PipelinePhase::Dispatching)?;
            let dispatched = self.dispatch_page(page);

            self.transition(PipelinePhase::Persisting)?;
            self.persist_ready();
            while self.dispatcher.in_flight() > self.backlog_limit {
                if let Some(outcome) = self.dispatcher.next_outcome().await {
                    self.handle_outcome(outcome);
                }
            }

            tracing::info!(
                "Page {}: dispatched {} records ({} stored, {} failed, {} pending)",
                page_index,
                dispatched,
                self.state.records_stored,
                self.state.records_failed(),
                self.state.records_pending()
            );

            if !has_more || self.state.cap_reached() {
                self.transition(PipelinePhase::Draining)?;
                break;
            }
            self.transition(PipelinePhase::Paging)?;
        }

        while let Some(outcome) = self.dispatcher.next_outcome().await {
            self.handle_outcome(outcome);
        }
        self.transition(PipelinePhase::Done)?;

        let stats = self.state.statistics();
        tracing::info!(
            "Scrape finished: {} attempted, {} stored, {} failed in {:.1}s",
            stats.records_attempted,
            stats.records_stored,
            stats.records_failed,
            stats.elapsed.as_secs_f64()
        );
        Ok(stats)
    }

    /// Fetches one listing page under the retry policy and pacing clock
    async fn fetch_listing_page(
        &mut self,
        page_index: u32,
    ) -> std::result::Result<ListingPage, FetchError> {
        let listing = &self.listing;
        let pacer = &self.pacer;
        let page_size = self.page_size;

        let retried = self
            .listing_policy
            .run(|_| async move {
                pacer.wait().await;
                listing.fetch_page(page_index, page_size).await
            })
            .await;

        self.state.record_retries(retried.retries());
        retried.result
    }

    /// Submits detail fetches for a page, truncated to the remaining cap
    fn dispatch_page(&mut self, page: ListingPage) -> usize {
        let mut records = page.records;
        if let Some(remaining) = self.state.remaining_capacity() {
            if records.len() as u64 > remaining {
                tracing::debug!(
                    "Truncating page {} from {} to {} records for the cap",
                    page.page,
                    records.len(),
                    remaining
                );
                records.truncate(remaining as usize);
            }
        }

        self.state.record_dispatched(records.len() as u64);
        let count = records.len();

        for summary in records {
            let fetcher = self.detail.clone();
            let label = summary.identifier().to_string();
            self.dispatcher.submit(label, move || {
                let fetcher = fetcher.clone();
                let summary = summary.clone();
                async move { fetcher.fetch_detail(&summary).await }
            });
        }

        count
    }

    /// Persists every outcome that is already available
    fn persist_ready(&mut self) {
        while let Some(outcome) = self.dispatcher.try_next_outcome() {
            self.handle_outcome(outcome);
        }
    }

    fn handle_outcome(&mut self, outcome: TaskOutcome<EnrichedRecord>) {
        self.state.record_retries(outcome.retries());

        match outcome.result {
            Ok(record) => match self.upsert_with_retry(&record) {
                Ok(result) => {
                    tracing::debug!("Stored {} ({:?})", outcome.label, result);
                    self.state.record_stored(result);
                }
                Err(e) => {
                    tracing::warn!("Failed to store {}: {}", outcome.label, e);
                    self.state.record_failure(FailureKind::Store);
                }
            },
            Err(e) => {
                tracing::warn!("Skipping {}: {}", outcome.label, e);
                self.state.record_failure(e.kind());
            }
        }
    }

    /// Upserts a record, retrying a failed write once
    fn upsert_with_retry(&mut self, record: &EnrichedRecord) -> StoreResult<UpsertOutcome> {
        match self.store.upsert(record) {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                tracing::debug!("Retrying write for {}: {}", record.identifier(), e);
                self.store.upsert(record)
            }
        }
    }

    fn transition(&mut self, next: PipelinePhase) -> Result<()> {
        if !self.phase.can_transition_to(next) {
            return Err(HarvestError::InvalidTransition {
                from: self.phase,
                to: next,
            });
        }
        tracing::trace!("Phase {} -> {}", self.phase, next);
        self.phase = next;
        Ok(())
    }
}
