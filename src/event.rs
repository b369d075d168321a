//! Life-cycle signals emitted by [`Settings`](crate::Settings).
//!
//! The store only produces these; nothing depends on a subscriber existing.

use tracing::trace;

/// Payload of a [`SettingsEvent::Modified`] signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingChange {
    pub section: String,
    pub key: String,
    pub new_value: String,
    pub previous_value: String,
    /// Host-defined id attached to the setting when it was declared.
    pub notification_id: Option<i32>,
}

/// `section: None` means the operation covered every section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingsEvent {
    Loaded,
    Saved,
    Applied { section: Option<String> },
    Reverted { section: Option<String> },
    ResetToDefaults { section: Option<String> },
    Modified(SettingChange),
}

impl SettingsEvent {
    pub fn name(&self) -> &'static str {
        match self {
            SettingsEvent::Loaded => "Loaded",
            SettingsEvent::Saved => "Saved",
            SettingsEvent::Applied { .. } => "Applied",
            SettingsEvent::Reverted { .. } => "Reverted",
            SettingsEvent::ResetToDefaults { .. } => "ResetToDefaults",
            SettingsEvent::Modified(_) => "Modified",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Box<dyn Fn(&SettingsEvent) + Send + Sync>;

/// Synchronous fan-out to registered listeners, in subscription order.
#[derive(Default)]
pub struct EventBus {
    next_id: u64,
    listeners: Vec<(SubscriptionId, Listener)>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: Fn(&SettingsEvent) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Returns `false` if `id` was not subscribed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(existing, _)| *existing != id);
        self.listeners.len() != before
    }

    pub fn emit(&self, event: &SettingsEvent) {
        trace!(event = event.name(), listeners = self.listeners.len(), "emitting");
        for (_, listener) in &self.listeners {
            listener(event);
        }
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn unsubscribed_listeners_stop_receiving() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut bus = EventBus::new();

        let sink = Arc::clone(&seen);
        let id = bus.subscribe(move |event| sink.lock().unwrap().push(event.name()));

        bus.emit(&SettingsEvent::Loaded);
        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
        bus.emit(&SettingsEvent::Saved);

        assert_eq!(*seen.lock().unwrap(), vec!["Loaded"]);
        assert!(bus.is_empty());
    }
}
