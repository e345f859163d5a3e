use std::collections::BTreeSet;
use std::sync::Arc;

use serde_json::Value;

use crate::domain::models::{EventCategory, EventType, MapEvent};

use super::{Filter, MapEventTransformer, ResolvedFilter};

/// Accepts every value.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysFilter;

impl Filter for AlwaysFilter {
    fn evaluate(&self, _value: &Value) -> bool {
        true
    }
}

/// Rejects every value.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverFilter;

impl Filter for NeverFilter {
    fn evaluate(&self, _value: &Value) -> bool {
        false
    }
}

/// Accepts a value only if every inner filter does.
#[derive(Debug, Clone)]
pub struct AllFilter {
    filters: Vec<Arc<dyn Filter>>,
}

impl AllFilter {
    pub fn new(filters: Vec<Arc<dyn Filter>>) -> Self {
        Self { filters }
    }
}

impl Filter for AllFilter {
    fn evaluate(&self, value: &Value) -> bool {
        self.filters.iter().all(|filter| filter.evaluate(value))
    }
}

/// Accepts JSON objects whose top-level `field` equals `expected`.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyEqualsFilter {
    field: String,
    expected: Value,
}

impl PropertyEqualsFilter {
    pub fn new(field: impl Into<String>, expected: Value) -> Self {
        Self {
            field: field.into(),
            expected,
        }
    }
}

impl Filter for PropertyEqualsFilter {
    fn evaluate(&self, value: &Value) -> bool {
        value.get(&self.field) == Some(&self.expected)
    }
}

/// Restricts delivery to a set of map event types and, optionally, to entries whose
/// value passes a filter.
///
/// Inserts are tested against the new value, deletes against the old value, and
/// updates pass if either side matches.
#[derive(Debug, Clone)]
pub struct MapEventFilter {
    mask: BTreeSet<EventType>,
    filter: Option<Arc<dyn Filter>>,
}

impl MapEventFilter {
    /// All map event types, constrained by `filter`.
    pub fn all(filter: Arc<dyn Filter>) -> Self {
        Self {
            mask: EventCategory::Map.all_event_types(),
            filter: Some(filter),
        }
    }

    /// Only the given event types, with no value constraint.
    pub fn of_types(types: impl IntoIterator<Item = EventType>) -> Self {
        Self {
            mask: types.into_iter().collect(),
            filter: None,
        }
    }

    pub fn mask(&self) -> &BTreeSet<EventType> {
        &self.mask
    }

    pub fn evaluate(&self, event: &MapEvent) -> bool {
        if !self.mask.contains(&event.event_type) {
            return false;
        }
        let Some(filter) = &self.filter else {
            return true;
        };
        let old = event.old_value.as_ref().is_some_and(|v| filter.evaluate(v));
        let new = event.new_value.as_ref().is_some_and(|v| filter.evaluate(v));
        match event.event_type {
            EventType::MapInserted => new,
            EventType::MapDeleted => old,
            _ => old || new,
        }
    }
}

/// The composed criteria passed to a map together with a listener.
#[derive(Debug, Clone)]
pub enum DeliveryFilter {
    /// Plain event filtering.
    Event(MapEventFilter),
    /// Optional event filtering followed by a transformation.
    Transforming {
        filter: Option<MapEventFilter>,
        transformer: Arc<dyn MapEventTransformer>,
    },
}

impl DeliveryFilter {
    /// Composes the delivery criteria for a listener. A value filter is wrapped so it
    /// applies to every map event type; a transformer is layered on top.
    ///
    /// Returns `None` when there is neither a filter nor a transformer.
    pub fn compose(
        filter: Option<ResolvedFilter>,
        transformer: Option<Arc<dyn MapEventTransformer>>,
    ) -> Option<Self> {
        let filter = filter.map(|filter| match filter {
            ResolvedFilter::Event(event_filter) => event_filter,
            ResolvedFilter::Value(value_filter) => MapEventFilter::all(value_filter),
        });

        match (filter, transformer) {
            (filter, Some(transformer)) => Some(Self::Transforming { filter, transformer }),
            (Some(filter), None) => Some(Self::Event(filter)),
            (None, None) => None,
        }
    }

    /// Applies the criteria, returning the event to deliver or `None` to drop it.
    pub fn apply(&self, event: MapEvent) -> Option<MapEvent> {
        match self {
            Self::Event(filter) => filter.evaluate(&event).then_some(event),
            Self::Transforming { filter, transformer } => {
                if let Some(filter) = filter {
                    if !filter.evaluate(&event) {
                        return None;
                    }
                }
                transformer.transform(event)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug)]
    struct Uppercase;

    impl MapEventTransformer for Uppercase {
        fn transform(&self, mut event: MapEvent) -> Option<MapEvent> {
            event.new_value = event
                .new_value
                .map(|v| Value::String(v.as_str().unwrap_or_default().to_uppercase()));
            Some(event)
        }
    }

    fn active() -> Arc<dyn Filter> {
        Arc::new(PropertyEqualsFilter::new("active", json!(true)))
    }

    #[test]
    fn test_value_filter_is_wrapped_for_all_map_types() {
        let delivery = DeliveryFilter::compose(Some(ResolvedFilter::Value(active())), None)
            .expect("delivery filter");
        let DeliveryFilter::Event(filter) = &delivery else {
            panic!("expected an event filter");
        };
        assert_eq!(filter.mask(), &EventCategory::Map.all_event_types());

        let hit = MapEvent::inserted("m", "s", json!(1), json!({"active": true}));
        let miss = MapEvent::inserted("m", "s", json!(2), json!({"active": false}));
        assert!(delivery.apply(hit).is_some());
        assert!(delivery.apply(miss).is_none());
    }

    #[test]
    fn test_event_filter_is_not_rewrapped() {
        let only_deletes = MapEventFilter::of_types([EventType::MapDeleted]);
        let delivery = DeliveryFilter::compose(Some(ResolvedFilter::Event(only_deletes)), None)
            .expect("delivery filter");
        let inserted = MapEvent::inserted("m", "s", json!(1), json!(1));
        let deleted = MapEvent::deleted("m", "s", json!(1), json!(1));
        assert!(delivery.apply(inserted).is_none());
        assert!(delivery.apply(deleted).is_some());
    }

    #[test]
    fn test_update_matches_either_side() {
        let filter = MapEventFilter::all(active());
        let leaving = MapEvent::updated("m", "s", json!(1), json!({"active": true}), json!({"active": false}));
        let unrelated =
            MapEvent::updated("m", "s", json!(1), json!({"active": false}), json!({"active": false}));
        assert!(filter.evaluate(&leaving));
        assert!(!filter.evaluate(&unrelated));
    }

    #[test]
    fn test_transformer_layers_on_filter() {
        let delivery = DeliveryFilter::compose(
            Some(ResolvedFilter::Value(Arc::new(AlwaysFilter))),
            Some(Arc::new(Uppercase)),
        )
        .expect("delivery filter");
        let out = delivery
            .apply(MapEvent::inserted("m", "s", json!(1), json!("abc")))
            .expect("delivered");
        assert_eq!(out.new_value, Some(json!("ABC")));

        let never = DeliveryFilter::compose(
            Some(ResolvedFilter::Value(Arc::new(NeverFilter))),
            Some(Arc::new(Uppercase)),
        )
        .expect("delivery filter");
        assert!(never.apply(MapEvent::inserted("m", "s", json!(1), json!("abc"))).is_none());
    }

    #[test]
    fn test_nothing_to_compose() {
        assert!(DeliveryFilter::compose(None, None).is_none());
    }
}
