use async_trait::async_trait;
use tracing::debug;

use super::{CompletionReporter, Delivery, Transport};
use crate::types::TransportKind;
use crate::PublishResult;

/// Subscribers fetch the payload themselves; acceptance is delivery
#[derive(Debug, Clone, Default)]
pub struct PullTransport;

impl PullTransport {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Transport for PullTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Pull
    }

    async fn send(&self, delivery: Delivery, reporter: CompletionReporter) -> PublishResult<()> {
        debug!(queue_id = %delivery.queue_id, "Payload available for pull");
        reporter.success(delivery.queue_id);
        Ok(())
    }
}
