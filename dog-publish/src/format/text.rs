use crate::format::ItemFormatter;
use crate::types::{ContentItem, FormattedItem, PublishingAction};
use crate::PublishResult;

/// Plain text: headline, blank line, body
#[derive(Debug, Clone)]
pub struct TextFormatter;

impl ItemFormatter for TextFormatter {
    fn format_id(&self) -> &'static str {
        "text"
    }

    fn file_extension(&self) -> &'static str {
        "txt"
    }

    fn format(&self, item: &ContentItem, _action: PublishingAction) -> PublishResult<FormattedItem> {
        Ok(FormattedItem::new(self.format_id(), format!("{}\n\n{}\n", item.headline, item.body)))
    }
}

/// Wire-style text with a routing header line
#[derive(Debug, Clone)]
pub struct AnpaFormatter;

impl ItemFormatter for AnpaFormatter {
    fn format_id(&self) -> &'static str {
        "anpa"
    }

    fn file_extension(&self) -> &'static str {
        "tst"
    }

    fn format(&self, item: &ContentItem, action: PublishingAction) -> PublishResult<FormattedItem> {
        let mut out = String::with_capacity(item.body.len() + 128);
        out.push_str(&format!("{} {} v{}\n", item.unique_name, action.name().to_uppercase(), item.version));
        if let Some(slugline) = &item.slugline {
            out.push_str(slugline);
            out.push('\n');
        }
        out.push_str(&item.headline);
        out.push_str("\n\n");
        if let Some(byline) = &item.byline {
            out.push_str(byline);
            out.push('\n');
        }
        out.push_str(&item.body);
        out.push_str("\nENDS\n");
        Ok(FormattedItem::new(self.format_id(), out))
    }
}
