use std::time::Duration;

use chrono::Utc;
use tokio::time::interval;
use tracing::{debug, info, warn};

use crate::backend::QueueBackend;
use crate::engine::{PublishQueue, WorkerHandle};
use crate::types::{Transition, TransportEvent};
use crate::PublishResult;

/// Error message recorded on entries failed by the reaper
pub const DISPATCH_TIMED_OUT: &str = "dispatch timed out";

/// Fails entries stuck in progress past the dispatch timeout
pub struct DispatchReaper<B: QueueBackend> {
    queue: PublishQueue<B>,
    interval: Duration,
    timeout: chrono::Duration,
}

impl<B: QueueBackend + 'static> DispatchReaper<B> {
    pub fn new(queue: PublishQueue<B>) -> Self {
        let interval = queue.config().reaper_interval;
        let timeout = queue.config().dispatch_timeout_chrono();
        Self { queue, interval, timeout }
    }

    /// Create reaper with custom interval
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Start the reaper background task
    pub fn spawn(self) -> WorkerHandle {
        WorkerHandle::spawn(move |mut shutdown_rx| async move {
            let mut ticker = interval(self.interval);
            info!("Starting dispatch reaper with interval: {:?}", self.interval);

            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => {
                        info!("Dispatch reaper stopped");
                        return Ok(());
                    }
                    _ = ticker.tick() => {
                        match self.reap_overdue().await {
                            Ok(0) => debug!("No overdue dispatches"),
                            Ok(count) => info!("Timed out {} dispatches", count),
                            Err(e) => warn!("Error during dispatch reaping: {}", e),
                        }
                    }
                }
            }
        })
    }

    /// Run one reaper cycle
    pub async fn reap_overdue(&self) -> PublishResult<usize> {
        let cutoff = Utc::now() - self.timeout;
        let overdue = self.queue.backend().in_progress_before(cutoff).await?;

        let mut timed_out = 0;
        for queue_id in overdue {
            let event = TransportEvent::failure(queue_id.clone(), DISPATCH_TIMED_OUT);
            // The transport may have reported in the meantime
            match self.queue.apply_transport_event(event).await {
                Ok(Transition::Applied) => {
                    warn!(%queue_id, "Dispatch timed out");
                    self.queue.metrics().record_timed_out();
                    timed_out += 1;
                }
                Ok(Transition::Duplicate) => {}
                Err(e) => debug!(%queue_id, "Overdue entry already settled: {}", e),
            }
        }
        Ok(timed_out)
    }
}
