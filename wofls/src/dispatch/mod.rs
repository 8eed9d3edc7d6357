//! Bounded-concurrency task dispatch.
//!
//! The [`Dispatcher`] keeps a sliding window of at most `backlog_depth`
//! tasks on tokio's blocking pool:
//!
//! 1. Submit tasks until the window is full or the backlog is empty
//! 2. Wait for whichever task finishes first
//! 3. Refill the freed slot from the backlog, then yield the result
//!
//! Results therefore arrive in completion order, not backlog order. A task
//! that errors or panics still yields exactly one [`TaskResult`] and still
//! frees its slot.

use std::any::Any;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};
use futures::stream::{self, FuturesUnordered, Stream, StreamExt};
use tokio::task::JoinError;
use tracing::{debug, warn};

use crate::executor::TaskExecutor;
use crate::planner::Backlog;
use crate::task::{TaskDescriptor, TaskFailure, TaskResult};
use crate::telemetry::DispatchMetrics;

/// Runs a backlog through a [`TaskExecutor`] with bounded concurrency.
pub struct Dispatcher {
    executor: Arc<dyn TaskExecutor>,
    backlog_depth: usize,
    metrics: Arc<DispatchMetrics>,
}

impl Dispatcher {
    /// Create a dispatcher keeping at most `backlog_depth` tasks in flight.
    ///
    /// A depth of zero is treated as one.
    pub fn new(executor: Arc<dyn TaskExecutor>, backlog_depth: usize) -> Self {
        Self {
            executor,
            backlog_depth: backlog_depth.max(1),
            metrics: Arc::new(DispatchMetrics::new()),
        }
    }

    /// Report into a shared metrics instance.
    pub fn with_metrics(mut self, metrics: Arc<DispatchMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn backlog_depth(&self) -> usize {
        self.backlog_depth
    }

    pub fn metrics(&self) -> Arc<DispatchMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Streams the result of every task in `backlog`, in completion order.
    ///
    /// Nothing is submitted until the stream is first polled. The stream
    /// ends once the backlog is drained and every submitted task has been
    /// harvested. Dropping it early stops further submissions; tasks already
    /// running finish in the background and their results are discarded.
    ///
    /// Must be polled from within a tokio runtime.
    pub fn dispatch(&self, backlog: Backlog) -> impl Stream<Item = TaskResult> + Send + 'static {
        let window = Window {
            executor: Arc::clone(&self.executor),
            metrics: Arc::clone(&self.metrics),
            depth: self.backlog_depth,
            backlog,
            in_flight: FuturesUnordered::new(),
        };

        stream::unfold(window, |mut window| async move {
            window.fill();
            let result = window.in_flight.next().await?;
            window.metrics.task_completed(result.is_success());
            window.fill();
            Some((result, window))
        })
    }
}

/// The sliding window state carried between stream items.
struct Window {
    executor: Arc<dyn TaskExecutor>,
    metrics: Arc<DispatchMetrics>,
    depth: usize,
    backlog: Backlog,
    in_flight: FuturesUnordered<BoxFuture<'static, TaskResult>>,
}

impl Window {
    fn fill(&mut self) {
        while self.in_flight.len() < self.depth {
            match self.backlog.next() {
                Some(task) => self.submit(task),
                None => break,
            }
        }
    }

    fn submit(&mut self, task: TaskDescriptor) {
        let key = task.key;
        let output_location = task.output_location.clone();
        let executor = Arc::clone(&self.executor);

        debug!(key = %key, in_flight = self.in_flight.len() + 1, "Submitting task");
        self.metrics.task_submitted();

        let handle = tokio::task::spawn_blocking(move || {
            let outcome = executor.execute(&task);
            TaskResult::from_outcome(&task, outcome)
        });

        self.in_flight.push(
            async move {
                match handle.await {
                    Ok(result) => result,
                    Err(e) => {
                        let error = join_failure(e);
                        warn!(key = %key, error = %error, "Task aborted");
                        TaskResult::Failure {
                            key,
                            output_location,
                            error,
                        }
                    }
                }
            }
            .boxed(),
        );
    }
}

/// Only a panicking task is reported as a panic; cancellation is an
/// ordinary execution failure.
fn join_failure(err: JoinError) -> TaskFailure {
    if err.is_panic() {
        TaskFailure::Panicked {
            message: panic_message(err.into_panic()),
        }
    } else {
        TaskFailure::execution(err)
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
