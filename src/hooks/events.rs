//! Notification events.
//!
//! Observers registered on the [`EventBus`] are told about state changes
//! after they happen. They cannot alter results; a failing handler is logged
//! and the remaining handlers still run.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::storage::{LinkRecord, OptionValue};

/// Typed event payloads, one variant per notification point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    /// A link is about to be inserted.
    LinkCreating {
        url: String,
        keyword: String,
        title: String,
    },
    /// A link was inserted.
    LinkCreated { record: LinkRecord },
    /// An edit is about to be applied.
    LinkEditing {
        keyword: String,
        new_keyword: String,
        new_url: String,
    },
    /// An edit was applied.
    LinkEdited {
        keyword: String,
        new_keyword: String,
        new_url: String,
        new_title: String,
    },
    /// A link was removed.
    LinkDeleted { keyword: String },
    /// A click counter changed. `clicks` carries the absolute value when one
    /// was set, `None` for a server-side increment.
    ClickRecorded {
        keyword: String,
        clicks: Option<u64>,
    },
    /// A creation attempt tripped the flood window.
    FloodDetected { ip: String, elapsed_seconds: u64 },
    OptionAdded { name: String, value: OptionValue },
    OptionUpdated {
        name: String,
        old_value: Option<OptionValue>,
        new_value: OptionValue,
    },
    OptionDeleted { name: String },
}

impl Event {
    /// Short name of the notification point, for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Event::LinkCreating { .. } => "link_creating",
            Event::LinkCreated { .. } => "link_created",
            Event::LinkEditing { .. } => "link_editing",
            Event::LinkEdited { .. } => "link_edited",
            Event::LinkDeleted { .. } => "link_deleted",
            Event::ClickRecorded { .. } => "click_recorded",
            Event::FloodDetected { .. } => "flood_detected",
            Event::OptionAdded { .. } => "option_added",
            Event::OptionUpdated { .. } => "option_updated",
            Event::OptionDeleted { .. } => "option_deleted",
        }
    }
}

/// An event plus delivery metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub event: Event,
}

impl Notification {
    pub fn new(event: Event) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            event,
        }
    }
}

/// Observer interface.
#[async_trait::async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(
        &self,
        notification: &Notification,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    /// Handler name, for logs.
    fn name(&self) -> &str;
}

/// Observer registry.
#[derive(Default)]
pub struct EventBus {
    handlers: RwLock<Vec<Arc<dyn EventHandler>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, handler: Arc<dyn EventHandler>) {
        self.handlers.write().push(handler);
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.read().len()
    }

    /// Deliver an event to every registered handler in registration order.
    pub async fn publish(&self, event: Event) {
        let handlers: Vec<Arc<dyn EventHandler>> = self.handlers.read().clone();
        if handlers.is_empty() {
            return;
        }

        let notification = Notification::new(event);
        for handler in handlers {
            if let Err(e) = handler.handle(&notification).await {
                error!(
                    "Event handler '{}' failed on '{}': {}",
                    handler.name(),
                    notification.event.kind(),
                    e
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    struct Counter {
        seen: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl EventHandler for Counter {
        async fn handle(
            &self,
            _notification: &Notification,
        ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
            self.seen.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn name(&self) -> &str {
            "counter"
        }
    }

    struct Failing;

    #[async_trait::async_trait]
    impl EventHandler for Failing {
        async fn handle(
            &self,
            _notification: &Notification,
        ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
            Err("boom".into())
        }

        fn name(&self) -> &str {
            "failing"
        }
    }

    #[tokio::test]
    async fn failing_handler_does_not_block_the_rest() {
        let bus = EventBus::new();
        let counter = Arc::new(Counter {
            seen: AtomicUsize::new(0),
        });
        bus.register(Arc::new(Failing));
        bus.register(counter.clone());

        bus.publish(Event::LinkDeleted {
            keyword: "abc".into(),
        })
        .await;

        assert_eq!(counter.seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn event_kinds_are_stable() {
        let e = Event::FloodDetected {
            ip: "1.2.3.4".into(),
            elapsed_seconds: 2,
        };
        assert_eq!(e.kind(), "flood_detected");
    }
}
