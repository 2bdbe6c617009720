//! In-process runtime: scheduler loop and bounded worker pool.
//!
//! Two tasks, mirroring the two stages:
//! - The scheduler task ticks on a fixed interval and awaits each slicing
//!   tick to completion, so ticks never overlap and slicing stays
//!   single-writer. Missed ticks are skipped, not queued.
//! - The dispatcher task drains queue deliveries and processes each range
//!   on a [`JoinSet`] bounded at the configured worker count. Ranges are
//!   disjoint, so workers share nothing but the checkpoint store.
//!
//! A failed delivery is retried with an incremented attempt counter up to
//! the configured maximum, then dead-lettered: logged at error level and
//! dropped, leaving the range's `PENDING` summary in the store for
//! operators to find. Retries travel back through the worker's join result
//! into a dispatcher-local backlog, never through the delivery channel: a
//! worker's completion must not depend on channel capacity, or a sink
//! outage with a standing backlog would wedge the dispatcher against its
//! own blocked workers.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, warn};

use crate::config::ExporterConfig;
use crate::processor::BatchProcessor;
use crate::range::CursorRange;
use crate::slicer::CursorSlicer;

/// How long shutdown waits for the stage tasks to finish.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// One at-least-once delivery of a cursor range.
#[derive(Debug, Clone)]
pub struct Delivery {
    /// The range to process.
    pub range: CursorRange,
    /// 1-based delivery attempt.
    pub attempt: u32,
}

impl Delivery {
    /// The first delivery of a range.
    #[must_use]
    pub fn first(range: CursorRange) -> Self {
        Self { range, attempt: 1 }
    }

    /// The next redelivery of this range.
    #[must_use]
    pub fn retry(self) -> Self {
        Self {
            range: self.range,
            attempt: self.attempt + 1,
        }
    }
}

/// The assembled export pipeline.
pub struct ExportPipeline;

impl ExportPipeline {
    /// Spawn the scheduler and dispatcher tasks and return a handle.
    ///
    /// `deliveries` is the consuming end of the work queue feeding the
    /// dispatcher. Retries stay inside the dispatcher; nothing is ever
    /// published back into the queue.
    #[must_use]
    pub fn start(
        slicer: CursorSlicer,
        processor: Arc<BatchProcessor>,
        deliveries: mpsc::Receiver<Delivery>,
        config: &ExporterConfig,
    ) -> PipelineHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let scheduler = tokio::spawn(run_scheduler(
            slicer,
            shutdown_rx.clone(),
            config.tick_interval,
        ));
        let dispatcher = tokio::spawn(run_dispatcher(
            processor,
            deliveries,
            shutdown_rx,
            config.worker_count.max(1),
            config.max_deliveries,
        ));
        PipelineHandle {
            shutdown: shutdown_tx,
            scheduler,
            dispatcher,
        }
    }
}

/// Handle for stopping a running pipeline.
pub struct PipelineHandle {
    shutdown: watch::Sender<bool>,
    scheduler: JoinHandle<()>,
    dispatcher: JoinHandle<()>,
}

impl PipelineHandle {
    /// Signal both stages to stop and wait for them to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        for task in [self.scheduler, self.dispatcher] {
            let _ = tokio::time::timeout(SHUTDOWN_TIMEOUT, task).await;
        }
    }
}

/// Scheduler loop: one slicing tick per interval, ticks never overlap.
async fn run_scheduler(
    slicer: CursorSlicer,
    mut shutdown: watch::Receiver<bool>,
    interval: Duration,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = shutdown.changed() => {
                debug!("scheduler stopping");
                break;
            }
            _ = ticker.tick() => {
                match slicer.run_tick().await {
                    Ok(report) => debug!(
                        ranges = report.ranges_emitted,
                        resume = %report.resume_cursor,
                        "tick finished"
                    ),
                    Err(e) => error!(error = %e, "slicing tick failed"),
                }
            }
        }
    }
}

/// Dispatcher loop: drain deliveries into a bounded worker set.
///
/// New work is only pulled from the channel while a worker slot is free, so
/// channel capacity backpressures the slicer. A worker that wants a retry
/// hands it back through its join result; the retry waits in a local
/// backlog and takes the next free slot ahead of channel work.
async fn run_dispatcher(
    processor: Arc<BatchProcessor>,
    mut deliveries: mpsc::Receiver<Delivery>,
    mut shutdown: watch::Receiver<bool>,
    worker_count: usize,
    max_deliveries: u32,
) {
    let mut workers: JoinSet<Option<Delivery>> = JoinSet::new();
    let mut retries: VecDeque<Delivery> = VecDeque::new();

    loop {
        while workers.len() < worker_count {
            let Some(delivery) = retries.pop_front() else {
                break;
            };
            let processor = Arc::clone(&processor);
            workers.spawn(async move {
                process_delivery(&processor, delivery, max_deliveries).await
            });
        }

        tokio::select! {
            _ = shutdown.changed() => {
                debug!("dispatcher stopping");
                break;
            }
            Some(finished) = workers.join_next(), if !workers.is_empty() => {
                if let Ok(Some(retry)) = finished {
                    retries.push_back(retry);
                }
            }
            delivery = deliveries.recv(), if workers.len() < worker_count => {
                let Some(delivery) = delivery else {
                    debug!("delivery channel closed");
                    break;
                };
                let processor = Arc::clone(&processor);
                workers.spawn(async move {
                    process_delivery(&processor, delivery, max_deliveries).await
                });
            }
        }
    }

    // Retries still pending at shutdown are dropped; their ranges stay
    // PENDING in the store and are re-sliced on the next start.
    while workers.join_next().await.is_some() {}
}

/// Process one delivery, returning the retry to schedule if it failed with
/// attempts remaining.
async fn process_delivery(
    processor: &BatchProcessor,
    delivery: Delivery,
    max_deliveries: u32,
) -> Option<Delivery> {
    let Err(e) = processor.process(&delivery.range).await else {
        return None;
    };
    if delivery.attempt < max_deliveries {
        warn!(
            range = %delivery.range,
            attempt = delivery.attempt,
            error = %e,
            "batch failed, retrying"
        );
        Some(delivery.retry())
    } else {
        error!(
            range = %delivery.range,
            attempts = delivery.attempt,
            error = %e,
            "delivery attempts exhausted, range stays pending"
        );
        None
    }
}
