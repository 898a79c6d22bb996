use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use super::{Destination, SubscriberId};
use crate::{PublishError, PublishResult};

/// Subscriber type, which decides the output formats a destination may use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriberType {
    Wire,
    Digital,
    All,
}

impl SubscriberType {
    pub fn allowed_formats(&self) -> &'static [&'static str] {
        match self {
            Self::Wire => &["anpa", "nitf", "text"],
            Self::Digital => &["ninjs", "newsmlg2", "text"],
            Self::All => &["anpa", "nitf", "ninjs", "newsmlg2", "text"],
        }
    }

    pub fn supports(&self, format: &str) -> bool {
        self.allowed_formats().contains(&format)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Wire => "wire",
            Self::Digital => "digital",
            Self::All => "all",
        }
    }
}

impl fmt::Display for SubscriberType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How a bound content filter decides admission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterType {
    /// Matching items are rejected
    #[default]
    Blocking,
    /// Only matching items are admitted
    Permitting,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentFilterBinding {
    pub filter_id: String,
    #[serde(default)]
    pub filter_type: FilterType,
}

impl ContentFilterBinding {
    pub fn blocking(filter_id: impl Into<String>) -> Self {
        Self { filter_id: filter_id.into(), filter_type: FilterType::Blocking }
    }

    pub fn permitting(filter_id: impl Into<String>) -> Self {
        Self { filter_id: filter_id.into(), filter_type: FilterType::Permitting }
    }
}

/// External recipient of published content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscriber {
    pub id: SubscriberId,
    pub name: String,
    pub subscriber_type: SubscriberType,
    #[serde(default = "default_active")]
    pub is_active: bool,
    /// Allowed content types; empty admits every type
    #[serde(default)]
    pub content_types: Vec<String>,
    #[serde(default)]
    pub destinations: Vec<Destination>,
    #[serde(default)]
    pub content_filter: Option<ContentFilterBinding>,
    /// Opt in/out per global filter id
    #[serde(default)]
    pub global_filters: BTreeMap<String, bool>,
    /// Transport error codes that deactivate the subscriber
    #[serde(default)]
    pub critical_errors: BTreeSet<u32>,
    #[serde(default)]
    pub geographic_restriction: Option<String>,
}

fn default_active() -> bool {
    true
}

impl Subscriber {
    pub fn new(name: impl Into<String>, subscriber_type: SubscriberType) -> Self {
        Self {
            id: SubscriberId::new(),
            name: name.into(),
            subscriber_type,
            is_active: true,
            content_types: Vec::new(),
            destinations: Vec::new(),
            content_filter: None,
            global_filters: BTreeMap::new(),
            critical_errors: BTreeSet::new(),
            geographic_restriction: None,
        }
    }

    pub fn with_destination(mut self, destination: Destination) -> Self {
        self.destinations.push(destination);
        self
    }

    pub fn with_content_filter(mut self, binding: ContentFilterBinding) -> Self {
        self.content_filter = Some(binding);
        self
    }

    pub fn with_content_types(mut self, content_types: Vec<String>) -> Self {
        self.content_types = content_types;
        self
    }

    pub fn with_critical_errors(mut self, codes: impl IntoIterator<Item = u32>) -> Self {
        self.critical_errors = codes.into_iter().collect();
        self
    }

    pub fn with_geographic_restriction(mut self, tag: impl Into<String>) -> Self {
        self.geographic_restriction = Some(tag.into());
        self
    }

    pub fn with_global_filter(mut self, filter_id: impl Into<String>, opted_in: bool) -> Self {
        self.global_filters.insert(filter_id.into(), opted_in);
        self
    }

    pub fn destination(&self, name: &str) -> Option<&Destination> {
        self.destinations.iter().find(|d| d.name == name)
    }

    /// Names of destinations whose format is missing or not allowed for the type
    pub fn unsupported_destinations(&self) -> Vec<String> {
        self.destinations
            .iter()
            .filter(|d| match &d.format {
                Some(format) => !self.subscriber_type.supports(format),
                None => true,
            })
            .map(|d| d.name.clone())
            .collect()
    }

    pub fn validate_destinations(&self) -> PublishResult<()> {
        let destinations = self.unsupported_destinations();
        if destinations.is_empty() {
            Ok(())
        } else {
            Err(self.format_mismatch(destinations))
        }
    }

    /// Switch the subscriber type.
    ///
    /// Destinations whose format the new type does not support have their
    /// format cleared and are reported through `FormatMismatch`; the caller
    /// must re-assign them before the subscriber can be saved.
    pub fn change_type(&mut self, new_type: SubscriberType) -> PublishResult<()> {
        let old_type = self.subscriber_type;
        self.subscriber_type = new_type;

        if old_type == new_type || old_type.allowed_formats() == new_type.allowed_formats() {
            return Ok(());
        }

        let mut cleared = Vec::new();
        for destination in &mut self.destinations {
            let supported = destination
                .format
                .as_deref()
                .map(|format| new_type.supports(format))
                .unwrap_or(false);
            if !supported {
                destination.format = None;
                cleared.push(destination.name.clone());
            }
        }

        if cleared.is_empty() {
            Ok(())
        } else {
            Err(self.format_mismatch(cleared))
        }
    }

    fn format_mismatch(&self, destinations: Vec<String>) -> PublishError {
        PublishError::FormatMismatch {
            subscriber: self.name.clone(),
            subscriber_type: self.subscriber_type.to_string(),
            destinations,
        }
    }

    /// Global filters default to opt-in until recorded otherwise
    pub fn uses_global_filter(&self, filter_id: &str) -> bool {
        self.global_filters.get(filter_id).copied().unwrap_or(true)
    }

    /// Record opt-in for every global filter not yet known to the subscriber
    pub fn init_global_filters<'a>(&mut self, filter_ids: impl IntoIterator<Item = &'a str>) {
        for id in filter_ids {
            self.global_filters.entry(id.to_string()).or_insert(true);
        }
    }

    pub fn accepts_content_type(&self, content_type: &str) -> bool {
        self.content_types.is_empty() || self.content_types.iter().any(|t| t == content_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DestinationConfig, FtpConfig};

    fn ftp(name: &str, format: &str) -> Destination {
        Destination::new(
            name,
            format,
            DestinationConfig::Ftp(FtpConfig {
                host: "ftp.reuters.example".into(),
                port: 21,
                username: None,
                password: None,
                path: "/in".into(),
                passive: true,
            }),
        )
    }

    #[test]
    fn test_change_type_clears_unsupported_formats() {
        let mut subscriber = Subscriber::new("Reuters-FTP", SubscriberType::Digital)
            .with_destination(ftp("main", "ninjs"))
            .with_destination(ftp("backup", "text"));

        let result = subscriber.change_type(SubscriberType::Wire);

        match result {
            Err(PublishError::FormatMismatch { destinations, .. }) => {
                assert_eq!(destinations, vec!["main".to_string()]);
            }
            other => panic!("expected FormatMismatch, got {other:?}"),
        }
        assert_eq!(subscriber.subscriber_type, SubscriberType::Wire);
        assert_eq!(subscriber.destination("main").unwrap().format, None);
        assert_eq!(subscriber.destination("backup").unwrap().format.as_deref(), Some("text"));
        assert!(subscriber.validate_destinations().is_err());
    }

    #[test]
    fn test_change_type_to_superset_keeps_formats() {
        let mut subscriber = Subscriber::new("AAP", SubscriberType::Wire)
            .with_destination(ftp("main", "anpa"));

        assert!(subscriber.change_type(SubscriberType::All).is_ok());
        assert_eq!(subscriber.destination("main").unwrap().format.as_deref(), Some("anpa"));
    }

    #[test]
    fn test_global_filters_default_to_opt_in() {
        let mut subscriber = Subscriber::new("AAP", SubscriberType::Wire).with_global_filter("embargo", false);
        assert!(!subscriber.uses_global_filter("embargo"));
        assert!(subscriber.uses_global_filter("sports-only"));

        subscriber.init_global_filters(["embargo", "sports-only"]);
        assert_eq!(subscriber.global_filters.get("embargo"), Some(&false));
        assert_eq!(subscriber.global_filters.get("sports-only"), Some(&true));
    }
}
