use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::{Value, json};

use crate::domain::models::{Binding, CallbackError, CallbackRef, EventCategory, EventTag, GridEvent, MapCreated, Qualifier};
use crate::domain::services::criteria::{FactoryFilterResolver, FactoryTransformerResolver, ResolutionError};
use crate::domain::services::dispatch::{DispatchError, InlineExecutor, Invoker};
use crate::domain::services::subscriptions::{QualifierResolver, Subscription, SubscriptionRegistry};

use super::{LocalSessions, MapListenerRegistrar};

type Received = Arc<Mutex<Vec<GridEvent>>>;

struct Fixture {
    sessions: Arc<LocalSessions>,
    executor: Arc<InlineExecutor>,
}

impl Fixture {
    fn new() -> Self {
        let sessions = Arc::new(LocalSessions::new());
        sessions.add_session("default", "DistributedCache", Some("app"));
        Self {
            sessions,
            executor: Arc::new(InlineExecutor::new()),
        }
    }

    fn registrar(&self, subscriptions: Vec<Arc<Subscription>>) -> MapListenerRegistrar {
        MapListenerRegistrar::new(
            Arc::new(SubscriptionRegistry::build(subscriptions)),
            self.sessions.clone(),
            Arc::new(FactoryFilterResolver::with_defaults()),
            Arc::new(FactoryTransformerResolver::new()),
            Invoker::new(self.executor.clone()),
        )
    }

    fn created(&self, map: &str) -> MapCreated {
        self.sessions
            .local_session("default")
            .expect("default session")
            .map_created(map)
    }

    fn map(&self, map: &str) -> Arc<super::LocalMap> {
        self.sessions
            .local_session("default")
            .expect("default session")
            .ensure_map(map)
    }
}

fn recording(qualifiers: &[Qualifier]) -> (Arc<Subscription>, Received) {
    let received: Received = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&received);
    let callback = CallbackRef::from_fn("Recorder", "on_map_event", move |event| {
        sink.lock().push(event.clone());
        Ok(())
    });
    let subscription = Arc::new(QualifierResolver::resolve(EventCategory::Map, qualifiers, callback));
    (subscription, received)
}

fn new_values(received: &Received) -> Vec<Option<Value>> {
    received
        .lock()
        .iter()
        .filter_map(GridEvent::as_map_event)
        .map(|event| event.new_value.clone())
        .collect()
}

#[test]
fn test_scope_prefix_is_stripped_for_lookup() {
    let fixture = Fixture::new();
    let (orders, received) = recording(&[
        Qualifier::ServiceName("DistributedCache".into()),
        Qualifier::CacheName("orders".into()),
    ]);
    let registrar = fixture.registrar(vec![orders]);

    let created = fixture.created("orders");
    assert_eq!(created.service_name, "app:DistributedCache");
    let report = registrar.on_map_created(&created).unwrap();
    assert_eq!(report.registered.len(), 1);
    assert!(report.is_clean());

    fixture.map("orders").put("1", json!({"qty": 2})).unwrap();
    assert_eq!(received.lock().len(), 1);
}

#[test]
fn test_scope_and_session_constraints() {
    let fixture = Fixture::new();
    let (in_scope, _) = recording(&[Qualifier::ScopeName("app".into())]);
    let (other_scope, _) = recording(&[Qualifier::ScopeName("other".into())]);
    let (other_session, _) = recording(&[Qualifier::SessionName("tenant".into())]);
    let (same_session, _) = recording(&[Qualifier::SessionName("default".into())]);
    let registrar = fixture.registrar(vec![
        Arc::clone(&in_scope),
        Arc::clone(&other_scope),
        Arc::clone(&other_session),
        Arc::clone(&same_session),
    ]);

    let report = registrar.on_map_created(&fixture.created("orders")).unwrap();
    let mut registered = report.registered.clone();
    registered.sort();
    let mut expected = vec![in_scope.id(), same_session.id()];
    expected.sort();
    assert_eq!(registered, expected);
    assert_eq!(report.skipped.len(), 2);
    assert_eq!(fixture.map("orders").listener_count(), 2);
}

#[test]
fn test_value_filter_applies_to_map_events() {
    let fixture = Fixture::new();
    let (open_only, received) = recording(&[Qualifier::Filter(Binding::with_value(
        "property-equals",
        "status=\"open\"",
    ))]);
    let registrar = fixture.registrar(vec![open_only]);
    registrar.on_map_created(&fixture.created("orders")).unwrap();

    let map = fixture.map("orders");
    map.put("1", json!({"status": "open"})).unwrap();
    map.put("2", json!({"status": "closed"})).unwrap();
    map.put("2", json!({"status": "open"})).unwrap();
    assert_eq!(
        new_values(&received),
        vec![Some(json!({"status": "open"})), Some(json!({"status": "open"}))]
    );
}

#[test]
fn test_extractor_and_lite_delivery() {
    let fixture = Fixture::new();
    let (names, received_names) = recording(&[Qualifier::Extractor(Binding::with_value("property", "name"))]);
    let (lite, received_lite) = recording(&[Qualifier::Lite, Qualifier::On(EventTag::Deleted)]);
    let registrar = fixture.registrar(vec![names, lite]);
    registrar.on_map_created(&fixture.created("people")).unwrap();

    let map = fixture.map("people");
    map.put("ada", json!({"name": "Ada", "born": 1815})).unwrap();
    map.remove("ada").unwrap();

    assert_eq!(new_values(&received_names), vec![Some(json!("Ada")), None]);
    let lite_events = received_lite.lock();
    assert_eq!(lite_events.len(), 1);
    let deleted = lite_events[0].as_map_event().unwrap();
    assert_eq!(deleted.old_value, None);
    assert_eq!(deleted.key, json!("ada"));
}

#[test]
fn test_resolution_failure_is_isolated() {
    let fixture = Fixture::new();
    let (broken, _) = recording(&[Qualifier::Filter(Binding::new("no-such-filter"))]);
    let (healthy, received) = recording(&[]);
    let registrar = fixture.registrar(vec![Arc::clone(&broken), healthy]);

    let report = registrar.on_map_created(&fixture.created("orders")).unwrap();
    assert_eq!(report.registered.len(), 1);
    assert_eq!(
        report.failures,
        vec![DispatchError::Resolution {
            subscription: broken.id(),
            source: ResolutionError::UnknownBinding("no-such-filter".into()),
        }]
    );
    fixture.map("orders").put("k", json!(1)).unwrap();
    assert_eq!(received.lock().len(), 1);
}

#[test]
fn test_registration_failure_is_reported_per_candidate() {
    let fixture = Fixture::new();
    let (first, _) = recording(&[]);
    let (second, _) = recording(&[]);
    let registrar = fixture.registrar(vec![first, second]);
    fixture.map("locked").refuse_listeners(Some("read only"));

    let report = registrar.on_map_created(&fixture.created("locked")).unwrap();
    assert!(report.registered.is_empty());
    assert_eq!(report.failures.len(), 2);
    assert!(
        report
            .failures
            .iter()
            .all(|err| matches!(err, DispatchError::Registration { map, .. } if map == "locked"))
    );
}

#[test]
fn test_missing_session_fails_only_with_candidates() {
    let fixture = Fixture::new();
    let (orders, _) = recording(&[Qualifier::CacheName("orders".into())]);
    let registrar = fixture.registrar(vec![orders]);

    let unknown = MapCreated::new("DistributedCache", "orders", "ghost");
    assert_eq!(
        registrar.on_map_created(&unknown).unwrap_err(),
        DispatchError::SessionNotFound("ghost".into())
    );

    let unmatched = MapCreated::new("DistributedCache", "invoices", "ghost");
    let report = registrar.on_map_created(&unmatched).unwrap();
    assert!(report.registered.is_empty() && report.failures.is_empty());
}

#[test]
fn test_synchronous_listener_error_reaches_mutator() {
    let fixture = Fixture::new();
    let callback = CallbackRef::from_fn("Strict", "reject", |_| Err(CallbackError::new("rejected")));
    let strict = Arc::new(QualifierResolver::resolve(
        EventCategory::Map,
        &[Qualifier::Synchronous],
        callback,
    ));
    let registrar = fixture.registrar(vec![strict]);
    registrar.on_map_created(&fixture.created("orders")).unwrap();

    let map = fixture.map("orders");
    assert!(matches!(
        map.put("1", json!(1)),
        Err(DispatchError::Delivery { .. })
    ));
    // The entry is stored and the listener stays registered.
    assert_eq!(map.get("1"), Some(json!(1)));
    assert_eq!(map.listener_count(), 1);
}

#[test]
fn test_register_eagerly() {
    let fixture = Fixture::new();
    let (known, received) = recording(&[
        Qualifier::SessionName("default".into()),
        Qualifier::CacheName("orders".into()),
    ]);
    let (unknown_session, _) = recording(&[
        Qualifier::SessionName("ghost".into()),
        Qualifier::CacheName("orders".into()),
    ]);
    let (wildcard, _) = recording(&[Qualifier::SessionName("default".into())]);
    let registrar = fixture.registrar(vec![known, Arc::clone(&unknown_session), wildcard]);

    let report = registrar.register_eagerly();
    assert_eq!(report.registered.len(), 1);
    assert_eq!(report.failures, vec![DispatchError::SessionNotFound("ghost".into())]);

    fixture.map("orders").put("1", json!("x")).unwrap();
    assert_eq!(received.lock().len(), 1);
}
