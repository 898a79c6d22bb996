//! Content filter evaluation.
//!
//! Filter definitions live outside the queue; a [`FilterMatcher`] answers
//! whether an item matches a given filter. The [`ContentFilterEvaluator`]
//! combines that with the subscriber's own binding and its global filter
//! opt-ins to make the admission decision.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::{ContentItem, FilterType, Subscriber};
use crate::{PublishError, PublishResult};

/// Source of content filter definitions
pub trait FilterMatcher: Send + Sync {
    /// Check if `item` matches the filter; unknown filters are `NotFound`
    fn matches(&self, filter_id: &str, item: &ContentItem) -> PublishResult<bool>;

    /// Ids of the globally defined (blocking) filters
    fn global_filters(&self) -> Vec<String>;
}

/// Admission decision for one item and one subscriber
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    Admitted,
    Rejected(String),
}

impl Admission {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Self::Admitted)
    }
}

/// Decides whether an item may be dispatched to a subscriber
#[derive(Clone)]
pub struct ContentFilterEvaluator {
    matcher: Arc<dyn FilterMatcher>,
}

impl ContentFilterEvaluator {
    pub fn new(matcher: Arc<dyn FilterMatcher>) -> Self {
        Self { matcher }
    }

    pub fn matcher(&self) -> &Arc<dyn FilterMatcher> {
        &self.matcher
    }

    /// Boolean form of [`evaluate`](Self::evaluate)
    pub fn admit(&self, item: &ContentItem, subscriber: &Subscriber) -> PublishResult<bool> {
        Ok(self.evaluate(item, subscriber)?.is_admitted())
    }

    /// Run capability checks, the bound filter and every opted-in global filter
    pub fn evaluate(&self, item: &ContentItem, subscriber: &Subscriber) -> PublishResult<Admission> {
        if !subscriber.is_active {
            return Ok(Admission::Rejected(format!("subscriber {} is inactive", subscriber.name)));
        }
        if !subscriber.accepts_content_type(&item.content_type) {
            return Ok(Admission::Rejected(format!(
                "subscriber {} does not accept content type {}",
                subscriber.name, item.content_type
            )));
        }
        if let Some(restriction) = &item.geographic_restriction {
            if subscriber.geographic_restriction.as_ref() != Some(restriction) {
                return Ok(Admission::Rejected(format!(
                    "item is restricted to {restriction}"
                )));
            }
        }

        if let Some(binding) = &subscriber.content_filter {
            let matched = self.matcher.matches(&binding.filter_id, item)?;
            match binding.filter_type {
                FilterType::Blocking if matched => {
                    return Ok(Admission::Rejected(format!(
                        "blocked by content filter {}",
                        binding.filter_id
                    )));
                }
                FilterType::Permitting if !matched => {
                    return Ok(Admission::Rejected(format!(
                        "not permitted by content filter {}",
                        binding.filter_id
                    )));
                }
                _ => {}
            }
        }

        for filter_id in self.matcher.global_filters() {
            if !subscriber.uses_global_filter(&filter_id) {
                continue;
            }
            if self.matcher.matches(&filter_id, item)? {
                return Ok(Admission::Rejected(format!("blocked by global filter {filter_id}")));
            }
        }

        debug!(item_id = %item.item_id, subscriber = %subscriber.name, "Item admitted");
        Ok(Admission::Admitted)
    }
}

/// Condition a content item must meet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "snake_case")]
pub enum FilterRule {
    ContentType(String),
    Keyword(String),
    /// Case-insensitive headline substring
    HeadlineContains(String),
    Any(Vec<FilterRule>),
    All(Vec<FilterRule>),
}

impl FilterRule {
    pub fn matches(&self, item: &ContentItem) -> bool {
        match self {
            Self::ContentType(content_type) => item.content_type == *content_type,
            Self::Keyword(keyword) => item.keywords.iter().any(|k| k.eq_ignore_ascii_case(keyword)),
            Self::HeadlineContains(text) => {
                item.headline.to_lowercase().contains(&text.to_lowercase())
            }
            Self::Any(rules) => rules.iter().any(|rule| rule.matches(item)),
            Self::All(rules) => rules.iter().all(|rule| rule.matches(item)),
        }
    }
}

#[derive(Debug, Clone)]
struct CatalogueEntry {
    rule: FilterRule,
    global: bool,
}

/// In-process filter definitions
#[derive(Debug, Clone, Default)]
pub struct FilterCatalogue {
    filters: HashMap<String, CatalogueEntry>,
}

impl FilterCatalogue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_filter(mut self, filter_id: impl Into<String>, rule: FilterRule) -> Self {
        self.filters.insert(filter_id.into(), CatalogueEntry { rule, global: false });
        self
    }

    pub fn with_global_filter(mut self, filter_id: impl Into<String>, rule: FilterRule) -> Self {
        self.filters.insert(filter_id.into(), CatalogueEntry { rule, global: true });
        self
    }
}

impl FilterMatcher for FilterCatalogue {
    fn matches(&self, filter_id: &str, item: &ContentItem) -> PublishResult<bool> {
        self.filters
            .get(filter_id)
            .map(|entry| entry.rule.matches(item))
            .ok_or_else(|| PublishError::not_found(format!("content filter {filter_id}")))
    }

    fn global_filters(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .filters
            .iter()
            .filter(|(_, entry)| entry.global)
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        ids
    }
}
