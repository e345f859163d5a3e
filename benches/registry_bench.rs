use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use serde_json::json;

use grid_dispatch::domain::services::criteria::{FactoryFilterResolver, FactoryTransformerResolver};
use grid_dispatch::domain::services::handlers::build_handlers;
use grid_dispatch::{
    CallbackRef, EventCategory, EventType, InlineExecutor, Invoker, LiveEvent, LocalEventSource, LocalSessions,
    MapListenerRegistrar, Qualifier, QualifierResolver, Subscription, SubscriptionRegistry,
};

fn noop() -> CallbackRef {
    CallbackRef::from_fn("Bench", "noop", |_| Ok(()))
}

/// `services * maps` exact subscriptions plus one of each wildcard shape per service.
fn subscriptions(services: usize, maps: usize) -> Vec<Arc<Subscription>> {
    let mut all = Vec::with_capacity(services * (maps + 1) + 1);
    for s in 0..services {
        for m in 0..maps {
            all.push(Arc::new(QualifierResolver::resolve(
                EventCategory::Map,
                &[
                    Qualifier::ServiceName(format!("svc-{s}")),
                    Qualifier::MapName(format!("map-{m}")),
                ],
                noop(),
            )));
        }
        all.push(Arc::new(QualifierResolver::resolve(
            EventCategory::Map,
            &[Qualifier::ServiceName(format!("svc-{s}"))],
            noop(),
        )));
    }
    all.push(Arc::new(QualifierResolver::resolve(EventCategory::Map, &[], noop())));
    all
}

fn registry_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("registry_lookup");

    for &(services, maps) in &[(4, 16), (16, 64), (64, 256)] {
        let registry = SubscriptionRegistry::build(subscriptions(services, maps));
        group.bench_with_input(
            BenchmarkId::new("lookup", registry.len()),
            &registry,
            |b, registry| {
                b.iter(|| registry.lookup(black_box("svc-1"), black_box("map-3")));
            },
        );
    }

    group.bench_function("build_16x64", |b| {
        let subs = subscriptions(16, 64);
        b.iter(|| SubscriptionRegistry::build(black_box(subs.clone())));
    });

    group.finish();
}

fn delivery_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("delivery");
    let invoker = Invoker::new(Arc::new(InlineExecutor::new()));

    group.bench_function("fire_transfer_event", |b| {
        let live = vec![Arc::new(QualifierResolver::resolve(EventCategory::Transfer, &[], noop()))];
        let handlers = build_handlers(live, &invoker);
        let source = LocalEventSource::partitioned_service("DistributedCache", None);
        for handler in &handlers {
            handler.introduce_source(&source);
        }
        b.iter(|| source.fire(black_box(LiveEvent::new(EventType::TransferArrived))));
    });

    group.bench_function("map_put", |b| {
        let sessions = Arc::new(LocalSessions::new());
        let session = sessions.add_session("default", "DistributedCache", None);
        let registrar = MapListenerRegistrar::new(
            Arc::new(SubscriptionRegistry::build(subscriptions(1, 1))),
            sessions.clone(),
            Arc::new(FactoryFilterResolver::with_defaults()),
            Arc::new(FactoryTransformerResolver::new()),
            invoker.clone(),
        );
        let _ = registrar.on_map_created(&session.map_created("orders"));
        let map = session.ensure_map("orders");
        b.iter(|| map.put(black_box("k"), json!({"qty": 1})));
    });

    group.finish();
}

criterion_group!(benches, registry_benchmark, delivery_benchmark);
criterion_main!(benches);
