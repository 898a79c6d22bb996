//! Read side of the external content repository.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::types::ContentItem;
use crate::{PublishError, PublishResult};

/// Source of finalized content items
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Fetch one version of an item; a missing item or version is `NotFound`
    async fn get_item(&self, item_id: &str, version: u32) -> PublishResult<ContentItem>;
}

/// Content store kept in process memory
#[derive(Default)]
pub struct MemoryContentStore {
    items: RwLock<HashMap<(String, u32), ContentItem>>,
}

impl MemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, item: ContentItem) {
        self.items.write().insert((item.item_id.clone(), item.version), item);
    }

    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }
}

#[async_trait]
impl ContentStore for MemoryContentStore {
    async fn get_item(&self, item_id: &str, version: u32) -> PublishResult<ContentItem> {
        self.items
            .read()
            .get(&(item_id.to_string(), version))
            .cloned()
            .ok_or_else(|| PublishError::not_found(format!("content item {item_id} v{version}")))
    }
}
