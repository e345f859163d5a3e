//--------------------------------------------------------------------------------------------------
// STRUCTS & ENUMS
//--------------------------------------------------------------------------------------------------
// | Name          | Description                                       | Key Methods          |
// |---------------|---------------------------------------------------|----------------------|
// | MapEvent      | Entry change on a named map                       | into_lite, value     |
// | LiveEvent     | Lifecycle / topology notification                 | builder accessors    |
// | GridEvent     | What an observer callback receives                | event_type           |
// | MapCreated    | Notification that a map now exists in a session   | from_live_event      |
//--------------------------------------------------------------------------------------------------

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::types::{EventCategory, EventType};

/// Entry-changed notification raised by a named map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapEvent {
    /// Name of the map that changed
    pub map_name: String,
    /// Service owning the map, possibly scope-qualified
    pub service_name: String,
    /// One of the [`EventCategory::Map`] event types
    pub event_type: EventType,
    pub key: Value,
    pub old_value: Option<Value>,
    pub new_value: Option<Value>,
    /// Timestamp when the event occurred
    pub timestamp: DateTime<Utc>,
}

impl MapEvent {
    pub fn inserted(map_name: &str, service_name: &str, key: Value, value: Value) -> Self {
        Self::new(map_name, service_name, EventType::MapInserted, key, None, Some(value))
    }

    pub fn updated(
        map_name: &str,
        service_name: &str,
        key: Value,
        old_value: Value,
        new_value: Value,
    ) -> Self {
        Self::new(
            map_name,
            service_name,
            EventType::MapUpdated,
            key,
            Some(old_value),
            Some(new_value),
        )
    }

    pub fn deleted(map_name: &str, service_name: &str, key: Value, old_value: Value) -> Self {
        Self::new(map_name, service_name, EventType::MapDeleted, key, Some(old_value), None)
    }

    fn new(
        map_name: &str,
        service_name: &str,
        event_type: EventType,
        key: Value,
        old_value: Option<Value>,
        new_value: Option<Value>,
    ) -> Self {
        debug_assert_eq!(event_type.category(), EventCategory::Map);
        Self {
            map_name: map_name.to_string(),
            service_name: service_name.to_string(),
            event_type,
            key,
            old_value,
            new_value,
            timestamp: Utc::now(),
        }
    }

    /// Strips old and new values, as delivered to lite listeners.
    pub fn into_lite(self) -> Self {
        Self {
            old_value: None,
            new_value: None,
            ..self
        }
    }

    /// The value a filter should look at: the new value when there is one,
    /// otherwise the old value (deletes).
    pub fn value(&self) -> Option<&Value> {
        self.new_value.as_ref().or(self.old_value.as_ref())
    }
}

/// Lifecycle or topology notification raised by a live event source.
///
/// Fields that do not apply to a given event type are left unset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveEvent {
    pub event_type: EventType,
    /// Scope of the cache factory the event was raised from, when known
    pub scope_name: Option<String>,
    pub service_name: Option<String>,
    pub cache_name: Option<String>,
    pub session_name: Option<String>,
    /// Federation participant the event concerns
    pub participant: Option<String>,
    /// Type name of the entry processor being executed
    pub processor: Option<String>,
    pub payload: Option<Value>,
    /// Timestamp when the event occurred
    pub timestamp: DateTime<Utc>,
}

impl LiveEvent {
    pub fn new(event_type: EventType) -> Self {
        Self {
            event_type,
            scope_name: None,
            service_name: None,
            cache_name: None,
            session_name: None,
            participant: None,
            processor: None,
            payload: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_scope(mut self, scope_name: impl Into<String>) -> Self {
        self.scope_name = Some(scope_name.into());
        self
    }

    pub fn with_service(mut self, service_name: impl Into<String>) -> Self {
        self.service_name = Some(service_name.into());
        self
    }

    pub fn with_cache(mut self, cache_name: impl Into<String>) -> Self {
        self.cache_name = Some(cache_name.into());
        self
    }

    pub fn with_session(mut self, session_name: impl Into<String>) -> Self {
        self.session_name = Some(session_name.into());
        self
    }

    pub fn with_participant(mut self, participant: impl Into<String>) -> Self {
        self.participant = Some(participant.into());
        self
    }

    pub fn with_processor(mut self, processor: impl Into<String>) -> Self {
        self.processor = Some(processor.into());
        self
    }

    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn category(&self) -> EventCategory {
        self.event_type.category()
    }
}

/// The single argument every observer callback receives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GridEvent {
    Map(MapEvent),
    Live(LiveEvent),
}

impl GridEvent {
    pub fn event_type(&self) -> EventType {
        match self {
            Self::Map(event) => event.event_type,
            Self::Live(event) => event.event_type,
        }
    }

    pub fn as_map_event(&self) -> Option<&MapEvent> {
        match self {
            Self::Map(event) => Some(event),
            Self::Live(_) => None,
        }
    }

    pub fn as_live_event(&self) -> Option<&LiveEvent> {
        match self {
            Self::Live(event) => Some(event),
            Self::Map(_) => None,
        }
    }
}

/// A map has been created (or first touched) in a session; subscriptions matching
/// it should now be registered as map listeners.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapCreated {
    /// Owning service, possibly scope-qualified (`scope:Service`)
    pub service_name: String,
    pub map_name: String,
    pub scope_name: Option<String>,
    pub session_name: String,
}

impl MapCreated {
    pub fn new(
        service_name: impl Into<String>,
        map_name: impl Into<String>,
        session_name: impl Into<String>,
    ) -> Self {
        Self {
            service_name: service_name.into(),
            map_name: map_name.into(),
            scope_name: None,
            session_name: session_name.into(),
        }
    }

    pub fn with_scope(mut self, scope_name: impl Into<String>) -> Self {
        self.scope_name = Some(scope_name.into());
        self
    }

    /// Derives the notification from a cache-lifecycle `Created` event. Returns `None`
    /// for any other event or when the event lacks the cache, service or session name.
    pub fn from_live_event(event: &LiveEvent) -> Option<Self> {
        if event.event_type != EventType::CacheCreated {
            return None;
        }
        Some(Self {
            service_name: event.service_name.clone()?,
            map_name: event.cache_name.clone()?,
            scope_name: event.scope_name.clone(),
            session_name: event.session_name.clone()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_lite_event_drops_values() {
        let event = MapEvent::updated("orders", "svc", json!(1), json!("a"), json!("b")).into_lite();
        assert_eq!(event.old_value, None);
        assert_eq!(event.new_value, None);
        assert_eq!(event.key, json!(1));
    }

    #[test]
    fn test_filter_value_falls_back_to_old_value() {
        let deleted = MapEvent::deleted("orders", "svc", json!(1), json!("gone"));
        assert_eq!(deleted.value(), Some(&json!("gone")));
    }

    #[test]
    fn test_map_created_from_cache_created_event() {
        let event = LiveEvent::new(EventType::CacheCreated)
            .with_cache("orders")
            .with_service("scope:svc")
            .with_session("default");
        let created = MapCreated::from_live_event(&event).expect("created notification");
        assert_eq!(created.map_name, "orders");
        assert_eq!(created.service_name, "scope:svc");

        let destroyed = LiveEvent::new(EventType::CacheDestroyed).with_cache("orders");
        assert!(MapCreated::from_live_event(&destroyed).is_none());
    }
}
