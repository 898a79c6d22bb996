use serde::{Deserialize, Serialize};
use std::fmt;

/// Action that produced the queue entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PublishingAction {
    Publish,
    Correct,
    Kill,
}

impl PublishingAction {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Publish => "publish",
            Self::Correct => "correct",
            Self::Kill => "kill",
        }
    }
}

impl fmt::Display for PublishingAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Finalized content item as served by the content store.
///
/// The queue only ever reads items; the store owns them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    pub item_id: String,
    pub version: u32,
    pub unique_name: String,
    pub headline: String,
    /// Content type such as `text`, `picture` or `composite`
    pub content_type: String,
    #[serde(default)]
    pub slugline: Option<String>,
    #[serde(default)]
    pub byline: Option<String>,
    #[serde(default)]
    pub body: String,
    /// Restricts the item to subscribers carrying the same tag
    #[serde(default)]
    pub geographic_restriction: Option<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
}

impl ContentItem {
    pub fn new(
        item_id: impl Into<String>,
        version: u32,
        unique_name: impl Into<String>,
        headline: impl Into<String>,
    ) -> Self {
        Self {
            item_id: item_id.into(),
            version,
            unique_name: unique_name.into(),
            headline: headline.into(),
            content_type: "text".to_string(),
            slugline: None,
            byline: None,
            body: String::new(),
            geographic_restriction: None,
            keywords: Vec::new(),
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_slugline(mut self, slugline: impl Into<String>) -> Self {
        self.slugline = Some(slugline.into());
        self
    }

    pub fn with_geographic_restriction(mut self, tag: impl Into<String>) -> Self {
        self.geographic_restriction = Some(tag.into());
        self
    }

    pub fn with_keywords(mut self, keywords: Vec<String>) -> Self {
        self.keywords = keywords;
        self
    }
}
