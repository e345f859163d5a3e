use std::collections::BTreeSet;
use std::sync::Arc;

use crate::domain::models::{Binding, CallbackRef, EventCategory, EventTag, EventType, NamePattern, Qualifier};

use super::{QualifierResolver, Subscription, SubscriptionRegistry};

fn callback(method: &str) -> CallbackRef {
    CallbackRef::from_fn("TestListener", method, |_| Ok(()))
}

fn map_subscription(service: &str, map: &str) -> Arc<Subscription> {
    Arc::new(QualifierResolver::resolve(
        EventCategory::Map,
        &[
            Qualifier::ServiceName(service.to_string()),
            Qualifier::MapName(map.to_string()),
        ],
        callback(&format!("{service}_{map}")),
    ))
}

fn ids(subscriptions: &[Arc<Subscription>]) -> BTreeSet<uuid::Uuid> {
    subscriptions.iter().map(|s| s.id()).collect()
}

#[test]
fn test_missing_names_default_to_wildcard() {
    let subscription = QualifierResolver::resolve(EventCategory::Map, &[], callback("any"));
    assert_eq!(subscription.map_name(), &NamePattern::Any);
    assert_eq!(subscription.service_name(), &NamePattern::Any);
    assert_eq!(subscription.scope_name(), None);
    assert_eq!(subscription.session_name(), None);
    assert!(subscription.event_types().is_empty());
    assert!(!subscription.is_lite());
    assert!(!subscription.is_synchronous());
}

#[test]
fn test_last_same_purpose_qualifier_wins() {
    let subscription = QualifierResolver::resolve(
        EventCategory::Map,
        &[
            Qualifier::CacheName("first".into()),
            Qualifier::MapName("second".into()),
            Qualifier::ServiceName("A".into()),
            Qualifier::ServiceName("B".into()),
        ],
        callback("conflict"),
    );
    assert_eq!(subscription.map_name(), &NamePattern::new("second"));
    assert_eq!(subscription.service_name(), &NamePattern::new("B"));
}

#[test]
fn test_event_tags_are_unioned_within_category() {
    let subscription = QualifierResolver::resolve(
        EventCategory::Transaction,
        &[
            Qualifier::On(EventTag::Committing),
            Qualifier::On(EventTag::Committed),
            Qualifier::On(EventTag::Inserted),
        ],
        callback("tx"),
    );
    let expected: BTreeSet<_> = [EventType::TransactionCommitting, EventType::TransactionCommitted]
        .into_iter()
        .collect();
    assert_eq!(subscription.event_types(), &expected);
    assert_eq!(subscription.registration_types(), expected);
}

#[test]
fn test_empty_event_types_mean_whole_category() {
    let subscription = QualifierResolver::resolve(EventCategory::Transfer, &[], callback("transfer"));
    assert_eq!(
        subscription.registration_types(),
        EventCategory::Transfer.all_event_types()
    );
    assert!(subscription.accepts(EventType::TransferLost));
    assert!(!subscription.accepts(EventType::MapInserted));
}

#[test]
fn test_flags_bindings_and_unknown_tags() {
    let subscription = QualifierResolver::resolve(
        EventCategory::Map,
        &[
            Qualifier::Other("Deprecated".into()),
            Qualifier::Synchronous,
            Qualifier::Lite,
            Qualifier::Filter(Binding::new("always")),
            Qualifier::Filter(Binding::new("always")),
            Qualifier::Filter(Binding::with_value("property-equals", "a=1")),
            Qualifier::Extractor(Binding::with_value("property", "name")),
        ],
        callback("flags"),
    );
    assert!(subscription.is_synchronous());
    assert!(subscription.is_lite());
    assert_eq!(subscription.filter_bindings().len(), 2);
    assert_eq!(subscription.extractor_bindings().len(), 1);
    assert!(subscription.transformer_bindings().is_empty());
}

#[test]
fn test_session_lifecycle_accepts_name_and_session_name() {
    let by_name = QualifierResolver::resolve(
        EventCategory::SessionLifecycle,
        &[Qualifier::Name("alpha".into())],
        callback("by_name"),
    );
    assert_eq!(by_name.session_name(), Some("alpha"));

    let overridden = QualifierResolver::resolve(
        EventCategory::SessionLifecycle,
        &[Qualifier::Name("alpha".into()), Qualifier::SessionName("beta".into())],
        callback("overridden"),
    );
    assert_eq!(overridden.session_name(), Some("beta"));

    let grid = QualifierResolver::resolve(
        EventCategory::GridLifecycle,
        &[Qualifier::Name("grid-1".into())],
        callback("grid"),
    );
    assert_eq!(grid.name(), Some("grid-1"));
    assert_eq!(grid.session_name(), None);
}

#[test]
fn test_four_way_lookup() {
    let any_any = map_subscription("*", "*");
    let any_orders = map_subscription("*", "orders");
    let svc_any = map_subscription("svcA", "*");
    let svc_orders = map_subscription("svcA", "orders");
    let registry = SubscriptionRegistry::build([
        Arc::clone(&any_any),
        Arc::clone(&any_orders),
        Arc::clone(&svc_any),
        Arc::clone(&svc_orders),
    ]);

    assert_eq!(
        ids(&registry.lookup("svcA", "orders")),
        ids(&[any_any.clone(), any_orders.clone(), svc_any.clone(), svc_orders.clone()])
    );
    assert_eq!(
        ids(&registry.lookup("svcA", "invoices")),
        ids(&[any_any.clone(), svc_any.clone()])
    );
    assert_eq!(
        ids(&registry.lookup("svcB", "orders")),
        ids(&[any_any.clone(), any_orders.clone()])
    );
    assert_eq!(ids(&registry.lookup("never", "seen")), ids(&[any_any]));
}

#[test]
fn test_lookup_has_no_duplicates() {
    let wildcard = map_subscription("*", "*");
    let registry = SubscriptionRegistry::build([Arc::clone(&wildcard)]);
    // "*" parses to the wildcard so every candidate key hits the same bucket.
    let found = registry.lookup("*", "*");
    assert_eq!(found.len(), 1);
    assert_eq!(registry.len(), 1);
}

#[test]
fn test_concrete_lookup_is_exact() {
    let orders = map_subscription("svc", "orders");
    let registry = SubscriptionRegistry::build([orders]);
    assert_eq!(registry.lookup("svc", "orders").len(), 1);
    assert!(registry.lookup("svc", "invoices").is_empty());
    assert!(registry.lookup("other", "orders").is_empty());
}

#[test]
fn test_all_concrete_is_ordered() {
    let make = |session: &str, service: &str, map: &str| {
        Arc::new(QualifierResolver::resolve(
            EventCategory::Map,
            &[
                Qualifier::SessionName(session.into()),
                Qualifier::ServiceName(service.into()),
                Qualifier::CacheName(map.into()),
            ],
            callback(map),
        ))
    };
    let registry = SubscriptionRegistry::build([
        make("s2", "svc", "a"),
        make("s1", "svc", "b"),
        make("s1", "svc", "*"),
        make("s1", "alpha", "b"),
        map_subscription("svc", "no-session"),
    ]);

    let order: Vec<_> = registry
        .all_concrete()
        .iter()
        .map(|s| {
            format!(
                "{}/{}/{}",
                s.session_name().unwrap_or_default(),
                s.map_name(),
                s.service_name()
            )
        })
        .collect();
    assert_eq!(order, vec!["s1/b/alpha", "s1/b/svc", "s2/a/svc"]);
}

#[test]
fn test_empty_registry() {
    let registry = SubscriptionRegistry::new();
    assert!(registry.is_empty());
    assert!(registry.lookup("svc", "map").is_empty());
    assert!(registry.all_concrete().is_empty());
}
