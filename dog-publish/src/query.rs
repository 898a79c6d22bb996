//! Query/filter layer over the queue.
//!
//! Filters combine conjunctively; the text filter matches either a headline
//! substring or the exact unique name. Pages are 1-indexed. A [`QueueView`]
//! carries the filter, page and multi-selection state of one listing and
//! drops the selection whenever the visible rows change.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::types::{BulkActions, QueueId, QueueItem, QueueState, Subscriber, SubscriberId};
use crate::{PublishError, PublishResult};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueFilters {
    pub subscriber_id: Option<SubscriberId>,
    pub state: Option<QueueState>,
    pub text: Option<String>,
}

impl QueueFilters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscriber(mut self, subscriber_id: SubscriberId) -> Self {
        self.subscriber_id = Some(subscriber_id);
        self
    }

    pub fn state(mut self, state: QueueState) -> Self {
        self.state = Some(state);
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn matches(&self, entry: &QueueItem) -> bool {
        if let Some(subscriber_id) = &self.subscriber_id {
            if &entry.subscriber_id != subscriber_id {
                return false;
            }
        }
        if let Some(state) = self.state {
            if entry.state != state {
                return false;
            }
        }
        match self.text.as_deref().map(str::trim) {
            Some(text) if !text.is_empty() => {
                entry.headline.to_lowercase().contains(&text.to_lowercase()) || entry.unique_name == text
            }
            _ => true,
        }
    }
}

/// One page request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueQuery {
    pub filters: QueueFilters,
    /// 1-indexed
    pub page: usize,
    pub page_size: usize,
}

impl QueueQuery {
    pub fn new(filters: QueueFilters, page: usize, page_size: usize) -> Self {
        Self { filters, page, page_size }
    }

    pub fn validate(&self, max_page_size: usize) -> PublishResult<()> {
        if self.page == 0 {
            return Err(PublishError::validation("page numbers start at 1"));
        }
        if self.page_size == 0 || self.page_size > max_page_size {
            return Err(PublishError::validation(format!(
                "page size must be between 1 and {max_page_size}"
            )));
        }
        Ok(())
    }

    pub fn offset(&self) -> usize {
        self.page.saturating_sub(1).saturating_mul(self.page_size)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryPage {
    pub items: Vec<QueueItem>,
    /// Matches across all pages
    pub total_count: usize,
    pub page: usize,
    pub page_size: usize,
    pub max_page: usize,
}

impl QueryPage {
    pub fn new(items: Vec<QueueItem>, total_count: usize, query: &QueueQuery) -> Self {
        Self {
            items,
            total_count,
            page: query.page,
            page_size: query.page_size,
            max_page: page_count(total_count, query.page_size),
        }
    }

    pub fn has_next(&self) -> bool {
        self.page < self.max_page
    }
}

/// `ceil(total / page_size)`
pub fn page_count(total: usize, page_size: usize) -> usize {
    if page_size == 0 {
        0
    } else {
        total.div_ceil(page_size)
    }
}

/// Filter, page and selection state of one queue listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueView {
    filters: QueueFilters,
    page: usize,
    page_size: usize,
    selection: BTreeSet<QueueId>,
}

impl QueueView {
    pub fn new(page_size: usize) -> Self {
        Self {
            filters: QueueFilters::default(),
            page: 1,
            page_size,
            selection: BTreeSet::new(),
        }
    }

    pub fn filters(&self) -> &QueueFilters {
        &self.filters
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn query(&self) -> QueueQuery {
        QueueQuery::new(self.filters.clone(), self.page, self.page_size)
    }

    /// Replace the filters; resets to page 1 and clears the selection
    pub fn set_filters(&mut self, filters: QueueFilters) {
        self.filters = filters;
        self.page = 1;
        self.selection.clear();
    }

    pub fn filter_subscriber(&mut self, subscriber_id: Option<SubscriberId>) {
        let filters = QueueFilters { subscriber_id, ..self.filters.clone() };
        self.set_filters(filters);
    }

    pub fn filter_state(&mut self, state: Option<QueueState>) {
        let filters = QueueFilters { state, ..self.filters.clone() };
        self.set_filters(filters);
    }

    pub fn search(&mut self, text: Option<String>) {
        let filters = QueueFilters { text, ..self.filters.clone() };
        self.set_filters(filters);
    }

    /// Move to another page; the selection only covers visible rows so it is cleared
    pub fn go_to_page(&mut self, page: usize) {
        self.page = page.max(1);
        self.selection.clear();
    }

    pub fn select(&mut self, queue_id: QueueId) {
        self.selection.insert(queue_id);
    }

    pub fn deselect(&mut self, queue_id: &QueueId) {
        self.selection.remove(queue_id);
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    pub fn selection(&self) -> Vec<QueueId> {
        self.selection.iter().cloned().collect()
    }

    /// Bulk actions for the selection, judged on the given page's states
    pub fn actions(&self, page: &QueryPage) -> BulkActions {
        BulkActions::for_states(
            page.items
                .iter()
                .filter(|entry| self.selection.contains(&entry.queue_id))
                .map(|entry| entry.state),
        )
    }
}

/// Subscribers and the current queue page, loaded together
#[derive(Debug, Clone, PartialEq)]
pub struct Dashboard {
    pub subscribers: Vec<Subscriber>,
    pub page: QueryPage,
    pub actions: BulkActions,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ContentItem, Destination, DestinationConfig, FormattedItem, PublishingAction, PullConfig};

    fn entry(subscriber: &str, headline: &str, unique_name: &str) -> QueueItem {
        QueueItem::new(
            &ContentItem::new("urn:x", 1, unique_name, headline),
            SubscriberId::from(subscriber),
            Destination::new("pull", "text", DestinationConfig::Pull(PullConfig {})),
            PublishingAction::Publish,
            FormattedItem::new("text", headline),
        )
    }

    #[test]
    fn test_filters_are_conjunctive() {
        let mut failed = entry("reuters", "Budget passes senate", "AAP-9");
        failed.state = QueueState::Error;

        let filters = QueueFilters::new().subscriber("reuters".into()).state(QueueState::Error);
        assert!(filters.matches(&failed));
        assert!(!filters.matches(&entry("reuters", "Budget passes senate", "AAP-9")));
        assert!(!QueueFilters::new().subscriber("aap".into()).matches(&failed));
    }

    #[test]
    fn test_text_matches_headline_or_unique_name() {
        let story = entry("reuters", "Budget passes Senate", "AAP-9");
        assert!(QueueFilters::new().text("senate").matches(&story));
        assert!(QueueFilters::new().text("AAP-9").matches(&story));
        assert!(!QueueFilters::new().text("aap-9").matches(&story));
        assert!(QueueFilters::new().text("  ").matches(&story));
    }

    #[test]
    fn test_query_validation() {
        assert!(QueueQuery::new(QueueFilters::new(), 0, 25).validate(200).is_err());
        assert!(QueueQuery::new(QueueFilters::new(), 1, 201).validate(200).is_err());
        let query = QueueQuery::new(QueueFilters::new(), 3, 25);
        assert!(query.validate(200).is_ok());
        assert_eq!(query.offset(), 50);
    }

    #[test]
    fn test_page_count() {
        assert_eq!(page_count(0, 25), 0);
        assert_eq!(page_count(25, 25), 1);
        assert_eq!(page_count(26, 25), 2);
    }

    #[test]
    fn test_filter_change_resets_page_and_selection() {
        let mut view = QueueView::new(25);
        view.go_to_page(3);
        view.select(QueueId::from("q-1"));

        view.filter_state(Some(QueueState::Error));

        assert_eq!(view.page(), 1);
        assert!(view.selection().is_empty());
        assert_eq!(view.query().filters.state, Some(QueueState::Error));
    }

    #[test]
    fn test_actions_follow_selection() {
        let mut done = entry("s", "One", "A-1");
        done.state = QueueState::Success;
        let pending = entry("s", "Two", "A-2");
        let query = QueueQuery::new(QueueFilters::new(), 1, 25);
        let page = QueryPage::new(vec![done.clone(), pending.clone()], 2, &query);

        let mut view = QueueView::new(25);
        assert_eq!(view.actions(&page), BulkActions::default());

        view.select(done.queue_id.clone());
        assert_eq!(view.actions(&page), BulkActions { resend: true, cancel: false });

        view.select(pending.queue_id.clone());
        assert_eq!(view.actions(&page), BulkActions::default());

        view.deselect(&done.queue_id);
        assert_eq!(view.actions(&page), BulkActions { resend: false, cancel: true });
    }
}
