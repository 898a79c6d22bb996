use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tracing::{debug, warn};

use super::{CompletionReporter, Delivery, Transport};
use crate::types::{DestinationConfig, TransportKind};
use crate::{PublishError, PublishResult};

const HTTP_PUSH_ERROR: u32 = 15000;
const HTTP_PUSH_REJECTED: u32 = 15001;

/// POSTs the payload to the destination's resource service
#[derive(Debug, Clone, Default)]
pub struct HttpPushTransport {
    client: Client,
}

impl HttpPushTransport {
    pub fn new() -> Self {
        Self { client: Client::new() }
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpPushTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::HttpPush
    }

    async fn send(&self, delivery: Delivery, reporter: CompletionReporter) -> PublishResult<()> {
        let resource_url = match &delivery.destination.delivery {
            DestinationConfig::HttpPush(config) => config.resource_url.clone(),
            other => {
                return Err(PublishError::Transport(format!(
                    "http push transport cannot deliver to a {} destination",
                    other.kind()
                )))
            }
        };

        let body = json!({
            "guid": delivery.queue_id.as_str(),
            "unique_name": delivery.unique_name,
            "format": delivery.formatted_item.format(),
            "content": delivery.formatted_item.content(),
        });
        let client = self.client.clone();

        tokio::spawn(async move {
            let queue_id = delivery.queue_id.clone();
            match client.post(&resource_url).json(&body).send().await {
                Ok(response) if response.status().is_success() => {
                    debug!(%queue_id, status = %response.status(), "Pushed payload");
                    reporter.success(queue_id);
                }
                Ok(response) => {
                    let status = response.status();
                    warn!(%queue_id, %status, "Resource service rejected push");
                    reporter.failure(queue_id, format!("resource service returned {status}"), Some(HTTP_PUSH_REJECTED));
                }
                Err(e) => {
                    warn!(%queue_id, "HTTP push failed: {}", e);
                    reporter.failure(queue_id, e.to_string(), Some(HTTP_PUSH_ERROR));
                }
            }
        });

        Ok(())
    }
}
