use std::collections::HashMap;

use parking_lot::RwLock;
use tracing::{info, warn};

use crate::transport::is_known_error_code;
use crate::types::{Destination, Subscriber, SubscriberId, SubscriberType};
use crate::{PublishError, PublishResult};

/// Owns subscriber records; the only way to create or change them
#[derive(Default)]
pub struct SubscriberDirectory {
    subscribers: RwLock<HashMap<SubscriberId, Subscriber>>,
}

impl SubscriberDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.subscribers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.read().is_empty()
    }

    /// All subscribers, sorted by name
    pub fn list(&self) -> Vec<Subscriber> {
        let mut all: Vec<Subscriber> = self.subscribers.read().values().cloned().collect();
        all.sort_by_key(|s| s.name.to_lowercase());
        all
    }

    pub fn get(&self, id: &SubscriberId) -> PublishResult<Subscriber> {
        self.subscribers
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| PublishError::not_found(format!("subscriber {id}")))
    }

    /// Case-insensitive substring match on name; empty text returns all
    pub fn lookup_by_keyword(&self, text: &str) -> Vec<Subscriber> {
        let needle = text.trim().to_lowercase();
        if needle.is_empty() {
            return self.list();
        }
        self.list()
            .into_iter()
            .filter(|s| s.name.to_lowercase().contains(&needle))
            .collect()
    }

    /// Exact id match in input order; unknown ids are skipped
    pub fn lookup_by_ids(&self, ids: &[SubscriberId]) -> Vec<Subscriber> {
        let subscribers = self.subscribers.read();
        let mut seen = Vec::with_capacity(ids.len());
        ids.iter()
            .filter(|id| {
                if seen.contains(id) {
                    false
                } else {
                    seen.push(*id);
                    true
                }
            })
            .filter_map(|id| subscribers.get(id).cloned())
            .collect()
    }

    /// Check every destination's schema and that its format suits the subscriber type
    pub fn validate_destinations(&self, subscriber: &Subscriber) -> PublishResult<()> {
        for destination in &subscriber.destinations {
            destination.validate()?;
        }
        subscriber.validate_destinations()
    }

    /// Create or update a subscriber.
    ///
    /// An update keeps the stored activation state; use [`activate`](Self::activate),
    /// [`deactivate`](Self::deactivate) or [`SubscriberDraft::set_active`] to change it.
    pub fn save(&self, subscriber: Subscriber) -> PublishResult<Subscriber> {
        self.store(subscriber, None)
    }

    fn store(&self, mut subscriber: Subscriber, activation: Option<bool>) -> PublishResult<Subscriber> {
        if subscriber
            .content_filter
            .as_ref()
            .map(|binding| binding.filter_id.trim().is_empty())
            .unwrap_or(false)
        {
            subscriber.content_filter = None;
        }

        subscriber.name = subscriber.name.trim().to_string();
        if subscriber.name.is_empty() {
            return Err(PublishError::validation("subscriber name is required"));
        }
        if subscriber.destinations.is_empty() {
            return Err(PublishError::NoDestination(subscriber.name.clone()));
        }

        let mut names: Vec<&str> = subscriber.destinations.iter().map(|d| d.name.as_str()).collect();
        names.sort_unstable();
        if let Some(pair) = names.windows(2).find(|pair| pair[0] == pair[1]) {
            return Err(PublishError::validation(format!("duplicate destination name {}", pair[0])));
        }

        self.validate_destinations(&subscriber)?;

        if let Some(code) = subscriber.critical_errors.iter().find(|code| !is_known_error_code(**code)) {
            return Err(PublishError::validation(format!("unknown publish error code {code}")));
        }

        let mut subscribers = self.subscribers.write();
        let lowered = subscriber.name.to_lowercase();
        if subscribers
            .values()
            .any(|existing| existing.id != subscriber.id && existing.name.to_lowercase() == lowered)
        {
            return Err(PublishError::DuplicateName(subscriber.name.clone()));
        }

        let created = match subscribers.get(&subscriber.id) {
            Some(existing) => {
                subscriber.is_active = activation.unwrap_or(existing.is_active);
                false
            }
            None => {
                if let Some(active) = activation {
                    subscriber.is_active = active;
                }
                true
            }
        };
        subscribers.insert(subscriber.id.clone(), subscriber.clone());
        info!(subscriber = %subscriber.name, created, "Saved subscriber");
        Ok(subscriber)
    }

    /// Persist a draft's pending edits
    pub fn save_draft(&self, draft: SubscriberDraft) -> PublishResult<Subscriber> {
        let activation = draft.activation;
        self.store(draft.into_subscriber(), activation)
    }

    /// Open an edit session for an existing subscriber
    pub fn edit(&self, id: &SubscriberId, global_filter_ids: &[String]) -> PublishResult<SubscriberDraft> {
        Ok(SubscriberDraft::new(self.get(id)?, global_filter_ids))
    }

    /// Mark a subscriber active again; returns false if it already was
    pub fn activate(&self, id: &SubscriberId) -> PublishResult<bool> {
        let mut subscribers = self.subscribers.write();
        let subscriber = subscribers
            .get_mut(id)
            .ok_or_else(|| PublishError::not_found(format!("subscriber {id}")))?;
        if subscriber.is_active {
            return Ok(false);
        }
        subscriber.is_active = true;
        info!(subscriber = %subscriber.name, "Subscriber activated");
        Ok(true)
    }

    /// Mark a subscriber inactive; returns false if it already was
    pub fn deactivate(&self, id: &SubscriberId, reason: &str) -> PublishResult<bool> {
        let mut subscribers = self.subscribers.write();
        let subscriber = subscribers
            .get_mut(id)
            .ok_or_else(|| PublishError::not_found(format!("subscriber {id}")))?;
        if !subscriber.is_active {
            return Ok(false);
        }
        subscriber.is_active = false;
        warn!(subscriber = %subscriber.name, reason, "Subscriber deactivated");
        Ok(true)
    }
}

/// Pending edits to a subscriber, persisted only by [`SubscriberDirectory::save_draft`]
#[derive(Debug, Clone)]
pub struct SubscriberDraft {
    subscriber: Subscriber,
    /// Explicit activation change made in this session
    activation: Option<bool>,
}

impl SubscriberDraft {
    /// Start editing; global filters not yet recorded default to opt-in
    pub fn new(mut subscriber: Subscriber, global_filter_ids: &[String]) -> Self {
        subscriber.init_global_filters(global_filter_ids.iter().map(String::as_str));
        Self {
            subscriber,
            activation: None,
        }
    }

    /// Draft for a subscriber that does not exist yet
    pub fn create(name: impl Into<String>, subscriber_type: SubscriberType, global_filter_ids: &[String]) -> Self {
        Self::new(Subscriber::new(name, subscriber_type), global_filter_ids)
    }

    pub fn subscriber(&self) -> &Subscriber {
        &self.subscriber
    }

    pub fn subscriber_mut(&mut self) -> &mut Subscriber {
        &mut self.subscriber
    }

    pub fn destinations(&self) -> &[Destination] {
        &self.subscriber.destinations
    }

    pub fn add_destination(&mut self, destination: Destination) -> PublishResult<()> {
        destination.validate()?;
        if self.subscriber.destination(&destination.name).is_some() {
            return Err(PublishError::validation(format!(
                "duplicate destination name {}",
                destination.name
            )));
        }
        self.subscriber.destinations.push(destination);
        Ok(())
    }

    /// Remove a destination from the pending set; false if absent
    pub fn delete_destination(&mut self, name: &str) -> bool {
        let before = self.subscriber.destinations.len();
        self.subscriber.destinations.retain(|d| d.name != name);
        self.subscriber.destinations.len() != before
    }

    /// Activate or deactivate on save; without this the stored state is kept
    pub fn set_active(&mut self, active: bool) {
        self.subscriber.is_active = active;
        self.activation = Some(active);
    }

    /// See [`Subscriber::change_type`]
    pub fn change_type(&mut self, subscriber_type: SubscriberType) -> PublishResult<()> {
        self.subscriber.change_type(subscriber_type)
    }

    /// Re-assign a destination's format
    pub fn set_destination_format(&mut self, name: &str, format: &str) -> PublishResult<()> {
        let subscriber_type = self.subscriber.subscriber_type;
        if !subscriber_type.supports(format) {
            return Err(PublishError::validation(format!(
                "format {format} is not supported by subscriber type {subscriber_type}"
            )));
        }
        let destination = self
            .subscriber
            .destinations
            .iter_mut()
            .find(|d| d.name == name)
            .ok_or_else(|| PublishError::not_found(format!("destination {name}")))?;
        destination.format = Some(format.to_string());
        Ok(())
    }

    pub fn into_subscriber(self) -> Subscriber {
        self.subscriber
    }
}
