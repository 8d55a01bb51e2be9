//! Migration lifecycle notifications.
//!
//! # Responsibility
//! - Publish the three migration phase events under stable names.
//! - Keep an explicit, ordered observer registry.
//!
//! # Invariants
//! - Delivery is synchronous, on the publishing thread, in registration
//!   order.
//! - Events carry no payload beyond their kind.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub const WILL_BEGIN_MIGRATION: &str = "WillBeginMigration";
pub const DID_COMPLETE_MIGRATION: &str = "DidCompleteMigration";
pub const DID_FAIL_MIGRATION: &str = "DidFailMigration";

/// Migration phase transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MigrationEvent {
    #[serde(rename = "WillBeginMigration")]
    WillBegin,
    #[serde(rename = "DidCompleteMigration")]
    DidComplete,
    #[serde(rename = "DidFailMigration")]
    DidFail,
}

impl MigrationEvent {
    pub const ALL: [MigrationEvent; 3] = [
        MigrationEvent::WillBegin,
        MigrationEvent::DidComplete,
        MigrationEvent::DidFail,
    ];

    /// Published event name observers subscribe with.
    pub fn name(self) -> &'static str {
        match self {
            Self::WillBegin => WILL_BEGIN_MIGRATION,
            Self::DidComplete => DID_COMPLETE_MIGRATION,
            Self::DidFail => DID_FAIL_MIGRATION,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|event| event.name() == name)
    }
}

impl Display for MigrationEvent {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Receiver of migration lifecycle events.
pub trait MigrationObserver: Send {
    fn on_migration_event(&self, event: MigrationEvent);
}

impl<F> MigrationObserver for F
where
    F: Fn(MigrationEvent) + Send,
{
    fn on_migration_event(&self, event: MigrationEvent) {
        self(event)
    }
}

/// Registration handle returned by `subscribe`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObserverId(u64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventError {
    UnknownEventName(String),
}

impl Display for EventError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownEventName(name) => write!(
                f,
                "unknown migration event `{name}`; expected {WILL_BEGIN_MIGRATION}|{DID_COMPLETE_MIGRATION}|{DID_FAIL_MIGRATION}"
            ),
        }
    }
}

impl Error for EventError {}

struct Subscription {
    filter: Option<MigrationEvent>,
    observer: Box<dyn MigrationObserver>,
}

/// Ordered observer registry.
#[derive(Default)]
pub struct MigrationObservers {
    next_id: u64,
    subscriptions: BTreeMap<ObserverId, Subscription>,
}

impl MigrationObservers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an observer for every migration event.
    pub fn subscribe(&mut self, observer: impl MigrationObserver + 'static) -> ObserverId {
        self.insert(None, Box::new(observer))
    }

    /// Registers an observer for one event, identified by its published name.
    pub fn subscribe_to(
        &mut self,
        event_name: &str,
        observer: impl MigrationObserver + 'static,
    ) -> Result<ObserverId, EventError> {
        let event = MigrationEvent::from_name(event_name.trim())
            .ok_or_else(|| EventError::UnknownEventName(event_name.trim().to_string()))?;
        Ok(self.insert(Some(event), Box::new(observer)))
    }

    /// Removes one registration. Returns `false` when `id` is not registered.
    pub fn unsubscribe(&mut self, id: ObserverId) -> bool {
        self.subscriptions.remove(&id).is_some()
    }

    pub fn clear(&mut self) {
        self.subscriptions.clear();
    }

    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    pub(crate) fn publish(&self, event: MigrationEvent) {
        for subscription in self.subscriptions.values() {
            if subscription.filter.map_or(true, |filter| filter == event) {
                subscription.observer.on_migration_event(event);
            }
        }
    }

    fn insert(
        &mut self,
        filter: Option<MigrationEvent>,
        observer: Box<dyn MigrationObserver>,
    ) -> ObserverId {
        // Ids are never reused, so a stale id cannot remove a newer observer.
        let id = ObserverId(self.next_id);
        self.next_id += 1;
        self.subscriptions
            .insert(id, Subscription { filter, observer });
        id
    }
}

#[cfg(test)]
mod tests {
    use super::{EventError, MigrationEvent, MigrationObservers};
    use std::sync::{Arc, Mutex};

    fn recorder() -> (
        Arc<Mutex<Vec<(&'static str, MigrationEvent)>>>,
        impl Fn(&'static str) -> Box<dyn Fn(MigrationEvent) + Send>,
    ) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&log);
        let make = move |tag: &'static str| {
            let sink = Arc::clone(&sink);
            Box::new(move |event: MigrationEvent| sink.lock().unwrap().push((tag, event)))
                as Box<dyn Fn(MigrationEvent) + Send>
        };
        (log, make)
    }

    #[test]
    fn names_round_trip() {
        for event in MigrationEvent::ALL {
            assert_eq!(MigrationEvent::from_name(event.name()), Some(event));
        }
        assert_eq!(MigrationEvent::from_name("willbeginmigration"), None);
    }

    #[test]
    fn serde_uses_published_names() {
        let json = serde_json::to_string(&MigrationEvent::DidFail).unwrap();
        assert_eq!(json, "\"DidFailMigration\"");
    }

    #[test]
    fn delivers_in_registration_order() {
        let (log, make) = recorder();
        let mut observers = MigrationObservers::new();
        observers.subscribe(make("first"));
        observers.subscribe(make("second"));

        observers.publish(MigrationEvent::WillBegin);
        observers.publish(MigrationEvent::DidComplete);

        assert_eq!(
            *log.lock().unwrap(),
            vec![
                ("first", MigrationEvent::WillBegin),
                ("second", MigrationEvent::WillBegin),
                ("first", MigrationEvent::DidComplete),
                ("second", MigrationEvent::DidComplete),
            ]
        );
    }

    #[test]
    fn named_subscription_filters_other_events() {
        let (log, make) = recorder();
        let mut observers = MigrationObservers::new();
        observers
            .subscribe_to(" DidFailMigration ", make("fail"))
            .expect("published name should subscribe");

        for event in MigrationEvent::ALL {
            observers.publish(event);
        }

        assert_eq!(*log.lock().unwrap(), vec![("fail", MigrationEvent::DidFail)]);
    }

    #[test]
    fn rejects_unknown_event_name() {
        let mut observers = MigrationObservers::new();
        let err = observers
            .subscribe_to("MigrationDone", |_event: MigrationEvent| {})
            .expect_err("unknown name must be rejected");
        assert_eq!(err, EventError::UnknownEventName("MigrationDone".to_string()));
        assert!(observers.is_empty());
    }

    #[test]
    fn unsubscribe_stops_delivery_and_is_idempotent() {
        let (log, make) = recorder();
        let mut observers = MigrationObservers::new();
        let id = observers.subscribe(make("gone"));
        observers.subscribe(make("kept"));

        assert!(observers.unsubscribe(id));
        assert!(!observers.unsubscribe(id));
        assert_eq!(observers.len(), 1);

        observers.publish(MigrationEvent::WillBegin);
        assert_eq!(
            *log.lock().unwrap(),
            vec![("kept", MigrationEvent::WillBegin)]
        );
    }
}
