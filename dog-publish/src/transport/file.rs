use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, warn};

use super::{CompletionReporter, Delivery, Transport};
use crate::types::{DestinationConfig, TransportKind};
use crate::{PublishError, PublishResult};

const FILE_PUBLISH_ERROR: u32 = 14000;
const PATH_NOT_WRITABLE: u32 = 14001;

/// Drops the payload into a directory as `{unique_name}-{queue_id}.{ext}`
#[derive(Debug, Clone, Default)]
pub struct FileTransport;

impl FileTransport {
    pub fn new() -> Self {
        Self
    }

    /// Path of the payload file; always directly inside the configured directory
    pub fn target_path(delivery: &Delivery) -> PublishResult<PathBuf> {
        let dir = match &delivery.destination.delivery {
            DestinationConfig::File(config) => PathBuf::from(&config.path),
            other => {
                return Err(PublishError::Transport(format!(
                    "file transport cannot deliver to a {} destination",
                    other.kind()
                )))
            }
        };

        let name = delivery.file_name();
        if !is_plain_file_name(&name) {
            return Err(PublishError::Transport(format!("refusing unsafe file name {name:?}")));
        }
        let target = dir.join(&name);
        if target.parent() != Some(dir.as_path()) {
            return Err(PublishError::Transport(format!(
                "{} escapes destination directory {}",
                target.display(),
                dir.display()
            )));
        }
        Ok(target)
    }
}

/// A single normal path component with no separators of either platform
fn is_plain_file_name(name: &str) -> bool {
    if name.contains(['/', '\\']) {
        return false;
    }
    let mut components = Path::new(name).components();
    matches!((components.next(), components.next()), (Some(Component::Normal(_)), None))
}

#[async_trait]
impl Transport for FileTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::File
    }

    async fn send(&self, delivery: Delivery, reporter: CompletionReporter) -> PublishResult<()> {
        let target = Self::target_path(&delivery)?;

        tokio::spawn(async move {
            let queue_id = delivery.queue_id.clone();
            if let Some(parent) = target.parent() {
                if !tokio::fs::try_exists(parent).await.unwrap_or(false) {
                    warn!(%queue_id, path = %parent.display(), "File destination path missing");
                    reporter.failure(
                        queue_id,
                        format!("destination path {} does not exist", parent.display()),
                        Some(PATH_NOT_WRITABLE),
                    );
                    return;
                }
            }

            match tokio::fs::write(&target, delivery.formatted_item.content()).await {
                Ok(()) => {
                    debug!(%queue_id, path = %target.display(), "Wrote payload");
                    reporter.success(queue_id);
                }
                Err(e) => {
                    warn!(%queue_id, "File delivery failed: {}", e);
                    reporter.failure(queue_id, e.to_string(), Some(FILE_PUBLISH_ERROR));
                }
            }
        });

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Destination, FileConfig, FormattedItem, PullConfig, QueueId, QueueState};

    fn delivery(path: &str) -> Delivery {
        Delivery {
            queue_id: QueueId::from("q-7"),
            unique_name: "AAP-17".into(),
            formatted_item: FormattedItem::new("text", "Floods close highway\n"),
            destination: Destination::new("drop", "text", DestinationConfig::File(FileConfig { path: path.into() })),
            file_extension: "txt".into(),
        }
    }

    #[tokio::test]
    async fn test_writes_payload_and_reports_success() {
        let dir = std::env::temp_dir().join(format!("dog-publish-file-{}", QueueId::new()));
        std::fs::create_dir_all(&dir).unwrap();
        let (reporter, mut rx) = CompletionReporter::channel();

        FileTransport::new()
            .send(delivery(dir.to_str().unwrap()), reporter)
            .await
            .unwrap();

        let event = rx.recv().await.unwrap();
        assert_eq!(event.state, QueueState::Success);
        let written = std::fs::read_to_string(dir.join("AAP-17-q-7.txt")).unwrap();
        assert_eq!(written, "Floods close highway\n");
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn test_missing_directory_reports_failure() {
        let (reporter, mut rx) = CompletionReporter::channel();
        FileTransport::new()
            .send(delivery("/nonexistent/dog-publish/drop"), reporter)
            .await
            .unwrap();

        let event = rx.recv().await.unwrap();
        assert_eq!(event.state, QueueState::Error);
        assert_eq!(event.error_code, Some(PATH_NOT_WRITABLE));
    }

    #[tokio::test]
    async fn test_refuses_names_leaving_the_directory() {
        let root = std::env::temp_dir().join(format!("dog-publish-escape-{}", QueueId::new()));
        let inner = root.join("inner");
        std::fs::create_dir_all(&inner).unwrap();

        for unique_name in ["../escaped", "AAP/17", "..\\escaped", "/etc/passwd"] {
            let mut bad = delivery(inner.to_str().unwrap());
            bad.unique_name = unique_name.into();
            assert!(
                matches!(FileTransport::target_path(&bad), Err(PublishError::Transport(_))),
                "{unique_name} accepted"
            );

            let (reporter, _rx) = CompletionReporter::channel();
            let result = FileTransport::new().send(bad, reporter).await;
            assert!(matches!(result, Err(PublishError::Transport(_))));
        }

        assert!(!root.join("escaped-q-7.txt").exists());
        assert_eq!(std::fs::read_dir(&inner).unwrap().count(), 0);
        std::fs::remove_dir_all(&root).unwrap();
    }

    #[tokio::test]
    async fn test_refuses_other_destination_kinds() {
        let mut wrong = delivery("/tmp");
        wrong.destination = Destination::new("pull", "text", DestinationConfig::Pull(PullConfig {}));
        let (reporter, _rx) = CompletionReporter::channel();
        let result = FileTransport::new().send(wrong, reporter).await;
        assert!(matches!(result, Err(PublishError::Transport(_))));
    }
}
