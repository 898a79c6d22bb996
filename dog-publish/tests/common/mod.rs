#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use dog_publish::transport::RecordingTransport;
use dog_publish::{
    ContentFilterEvaluator, ContentItem, Destination, DestinationConfig, FilterCatalogue, FilterRule,
    MemoryBackend, PublishQueue, PublishingAction, QueueId, QueueItem, QueueState, Subscriber, SubscriberId,
    SubscriberType, TransportKind, TransportRegistry,
};
use dog_publish::types::{FtpConfig, PullConfig};

pub type Queue = PublishQueue<MemoryBackend>;

/// Queue whose pull transport accepts entries and never reports back
pub fn holding_queue() -> (Queue, RecordingTransport) {
    let transport = RecordingTransport::holding(TransportKind::Pull);
    let mut transports = TransportRegistry::new();
    transports.register(transport.clone());

    let catalogue = FilterCatalogue::new()
        .with_filter("sport", FilterRule::Keyword("sport".into()))
        .with_global_filter("embargoed", FilterRule::HeadlineContains("embargo".into()));
    let queue = PublishQueue::new(MemoryBackend::new(), ContentFilterEvaluator::new(Arc::new(catalogue)))
        .with_transports(transports);
    (queue, transport)
}

pub fn pull_destination() -> Destination {
    Destination::new("pull", "text", DestinationConfig::Pull(PullConfig {}))
}

pub fn ftp_destination(name: &str, format: &str) -> Destination {
    Destination::new(
        name,
        format,
        DestinationConfig::Ftp(FtpConfig {
            host: "ftp.partner.example".into(),
            port: 21,
            username: Some("feed".into()),
            password: None,
            path: "/incoming".into(),
            passive: true,
        }),
    )
}

pub fn save_subscriber(queue: &Queue, name: &str) -> SubscriberId {
    queue
        .directory()
        .save(Subscriber::new(name, SubscriberType::Wire).with_destination(pull_destination()))
        .expect("subscriber saves")
        .id
}

pub fn story(n: usize) -> ContentItem {
    ContentItem::new(format!("urn:story:{n}"), 1, format!("AAP-{n}"), format!("Story number {n}"))
        .with_body("Body text.")
}

pub async fn enqueue(queue: &Queue, subscriber_id: &SubscriberId, n: usize) -> QueueItem {
    queue
        .enqueue(&story(n), subscriber_id, "pull", PublishingAction::Publish)
        .await
        .expect("item admitted")
}

pub async fn wait_for_state(queue: &Queue, queue_id: &QueueId, state: QueueState) -> QueueItem {
    for _ in 0..100 {
        let entry = queue.get(queue_id).await.expect("entry exists");
        if entry.state == state {
            return entry;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("entry {queue_id} never reached {state}");
}

/// Enqueue and drive an entry to a terminal state through transport events
pub async fn settled_entry(queue: &Queue, subscriber_id: &SubscriberId, n: usize, state: QueueState) -> QueueItem {
    use dog_publish::TransportEvent;

    let entry = enqueue(queue, subscriber_id, n).await;
    wait_for_state(queue, &entry.queue_id, QueueState::InProgress).await;
    match state {
        QueueState::Success => {
            queue.apply_transport_event(TransportEvent::success(entry.queue_id.clone())).await.unwrap();
        }
        QueueState::Error => {
            queue
                .apply_transport_event(TransportEvent::failure(entry.queue_id.clone(), "550 permission denied"))
                .await
                .unwrap();
        }
        QueueState::Canceled => {
            let outcome = queue.cancel(&[entry.queue_id.clone()]).await;
            assert!(outcome.is_complete_success());
        }
        QueueState::InProgress => {}
        QueueState::Pending => panic!("dispatch always moves entries past pending"),
    }
    queue.get(&entry.queue_id).await.unwrap()
}
