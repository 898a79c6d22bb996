use serde::Serialize;

use crate::format::ItemFormatter;
use crate::types::{ContentItem, FormattedItem, PublishingAction};
use crate::PublishResult;

/// ninjs (News in JSON) formatter
#[derive(Debug, Clone)]
pub struct NinjsFormatter;

#[derive(Serialize)]
struct NinjsDocument<'a> {
    guid: &'a str,
    version: String,
    #[serde(rename = "type")]
    item_type: &'a str,
    pubstatus: &'static str,
    headline: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    slugline: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    byline: Option<&'a str>,
    body_text: &'a str,
    #[serde(skip_serializing_if = "no_keywords")]
    keywords: &'a [String],
}

fn no_keywords(keywords: &&[String]) -> bool {
    keywords.is_empty()
}

impl ItemFormatter for NinjsFormatter {
    fn format_id(&self) -> &'static str {
        "ninjs"
    }

    fn file_extension(&self) -> &'static str {
        "json"
    }

    fn format(&self, item: &ContentItem, action: PublishingAction) -> PublishResult<FormattedItem> {
        let document = NinjsDocument {
            guid: &item.item_id,
            version: item.version.to_string(),
            item_type: &item.content_type,
            pubstatus: match action {
                PublishingAction::Kill => "canceled",
                PublishingAction::Publish | PublishingAction::Correct => "usable",
            },
            headline: &item.headline,
            slugline: item.slugline.as_deref(),
            byline: item.byline.as_deref(),
            body_text: &item.body,
            keywords: &item.keywords,
        };
        Ok(FormattedItem::new(self.format_id(), serde_json::to_string(&document)?))
    }
}
