//! One production pass: plan, dispatch, index.
//!
//! ```text
//! Catalog ──► TileJoiner ──► Backlog ──► Dispatcher ──► TaskResult ──► ResultIndexer ──► Catalog
//! ```
//!
//! The catalog is only touched from the orchestrating task: read while
//! planning, appended to as each result arrives.

use std::sync::Arc;

use futures::StreamExt;
use tracing::{error, info};

use crate::catalog::Catalog;
use crate::config::WoflConfig;
use crate::dispatch::Dispatcher;
use crate::error::WoflError;
use crate::executor::TaskExecutor;
use crate::indexer::{IndexOutcome, ResultIndexer};
use crate::planner::{PlanQuery, TileJoiner};
use crate::task::{TaskFailure, TaskResult};
use crate::telemetry::DispatchMetrics;

/// Counts from one [`WoflPipeline::run`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Tasks in the planned backlog.
    pub planned: usize,
    /// Tasks whose output was written and indexed.
    pub succeeded: usize,
    /// Tasks that failed, excluding outputs that already existed.
    pub failed: usize,
    /// Tasks skipped because their output was already on disk.
    pub already_existed: usize,
}

impl RunSummary {
    /// Results harvested so far.
    pub fn completed(&self) -> usize {
        self.succeeded + self.failed + self.already_existed
    }
}

/// Planner, dispatcher and indexer wired to one catalog and executor.
pub struct WoflPipeline {
    joiner: TileJoiner,
    dispatcher: Dispatcher,
    indexer: ResultIndexer,
}

impl WoflPipeline {
    /// Build a pipeline from a validated configuration.
    pub fn new(
        config: &WoflConfig,
        catalog: Arc<dyn Catalog>,
        executor: Arc<dyn TaskExecutor>,
    ) -> Result<Self, WoflError> {
        config.validate()?;
        Ok(Self {
            joiner: TileJoiner::new(Arc::clone(&catalog), config),
            dispatcher: Dispatcher::new(executor, config.backlog_depth),
            indexer: ResultIndexer::new(catalog),
        })
    }

    /// Dispatch counters, shared with the running pass.
    pub fn metrics(&self) -> Arc<DispatchMetrics> {
        self.dispatcher.metrics()
    }

    /// Run one pass over `query`.
    ///
    /// Failed tasks are counted and skipped. The pass stops early with an
    /// error on an inconsistent catalog, on an output that violates the
    /// observation contract, or when the catalog rejects a record.
    pub async fn run(&self, query: &PlanQuery) -> Result<RunSummary, WoflError> {
        let backlog = self.joiner.plan(query)?;
        let mut summary = RunSummary {
            planned: backlog.len(),
            ..Default::default()
        };

        info!(
            tasks = summary.planned,
            backlog_depth = self.dispatcher.backlog_depth(),
            "Starting dispatch"
        );

        let results = self.dispatcher.dispatch(backlog);
        futures::pin_mut!(results);

        while let Some(result) = results.next().await {
            if let TaskResult::Failure { key, error: failure, .. } = &result {
                match failure {
                    TaskFailure::InvariantViolation(violation) => {
                        error!(
                            key = %key,
                            error = %violation,
                            "Output violates observation contract, stopping"
                        );
                        return Err(WoflError::InvariantViolation(*violation));
                    }
                    TaskFailure::OutputAlreadyExists { .. } => summary.already_existed += 1,
                    _ => summary.failed += 1,
                }
            }

            if let IndexOutcome::Indexed(_) = self.indexer.index(result)? {
                summary.succeeded += 1;
            }
        }

        info!(
            planned = summary.planned,
            succeeded = summary.succeeded,
            failed = summary.failed,
            already_existed = summary.already_existed,
            "Pass complete"
        );
        Ok(summary)
    }

    /// Run one pass on a fresh multi-threaded runtime.
    ///
    /// For callers outside any async context.
    pub fn run_blocking(&self, query: &PlanQuery) -> Result<RunSummary, WoflError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .map_err(|e| WoflError::Runtime(e.to_string()))?;
        runtime.block_on(self.run(query))
    }
}
