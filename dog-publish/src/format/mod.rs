pub mod ninjs;
pub mod text;

use std::collections::HashMap;
use std::sync::Arc;

use crate::types::{ContentItem, FormattedItem, PublishingAction};
use crate::{PublishError, PublishResult};

/// Turns a content item into a transport-ready payload
pub trait ItemFormatter: Send + Sync {
    /// Format tag destinations refer to
    fn format_id(&self) -> &'static str;

    /// Extension used when the payload is written to a file
    fn file_extension(&self) -> &'static str;

    fn format(&self, item: &ContentItem, action: PublishingAction) -> PublishResult<FormattedItem>;
}

/// Registry of formatters keyed by format tag
#[derive(Clone)]
pub struct FormatterRegistry {
    formatters: HashMap<String, Arc<dyn ItemFormatter>>,
}

impl FormatterRegistry {
    /// Create a registry with the built-in ninjs, anpa and text formatters
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register(Arc::new(ninjs::NinjsFormatter));
        registry.register(Arc::new(text::AnpaFormatter));
        registry.register(Arc::new(text::TextFormatter));
        registry
    }

    pub fn empty() -> Self {
        Self { formatters: HashMap::new() }
    }

    /// Register a formatter, replacing any previous one for the same tag
    pub fn register(&mut self, formatter: Arc<dyn ItemFormatter>) {
        self.formatters.insert(formatter.format_id().to_string(), formatter);
    }

    pub fn get(&self, format_id: &str) -> PublishResult<Arc<dyn ItemFormatter>> {
        self.formatters
            .get(format_id)
            .cloned()
            .ok_or_else(|| PublishError::Format(format!("no formatter registered for {format_id}")))
    }

    pub fn format(
        &self,
        format_id: &str,
        item: &ContentItem,
        action: PublishingAction,
    ) -> PublishResult<FormattedItem> {
        self.get(format_id)?.format(item, action)
    }

    /// File extension for a format tag, `txt` when unknown
    pub fn file_extension(&self, format_id: &str) -> &'static str {
        self.formatters
            .get(format_id)
            .map(|f| f.file_extension())
            .unwrap_or("txt")
    }

    pub fn available_formats(&self) -> Vec<String> {
        let mut formats: Vec<String> = self.formatters.keys().cloned().collect();
        formats.sort();
        formats
    }
}

impl Default for FormatterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_formats() {
        let registry = FormatterRegistry::new();
        assert_eq!(registry.available_formats(), vec!["anpa", "ninjs", "text"]);
        assert_eq!(registry.file_extension("ninjs"), "json");
        assert_eq!(registry.file_extension("nitf"), "txt");
    }

    #[test]
    fn test_unknown_format_is_an_error() {
        let registry = FormatterRegistry::new();
        let item = ContentItem::new("urn:1", 1, "AAP-1", "Headline");
        let result = registry.format("nitf", &item, PublishingAction::Publish);
        assert!(matches!(result, Err(PublishError::Format(_))));
    }
}
