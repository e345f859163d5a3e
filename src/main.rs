use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::json;
use tracing::info;

use grid_dispatch::domain::models::GridEvent;
use grid_dispatch::{
    Binding, CallbackCandidate, CallbackRef, DispatchConfig, DispatchEngine, EventCategory, EventTag, EventType,
    ExecutorKind, LiveEvent, LocalEventSource, LocalSessions, Qualifier, init_tracing,
};

/// Command line arguments for the dispatch demo
#[derive(Parser, Debug)]
#[command(author, version, about = "Walks a few events through the grid dispatch engine")]
struct Args {
    /// Worker threads for asynchronous delivery (overrides the environment)
    #[arg(short, long)]
    workers: Option<usize>,

    /// `threads` or `tokio` (overrides the environment)
    #[arg(short, long)]
    executor: Option<ExecutorKind>,

    /// Session the demo maps live in
    #[arg(short, long, default_value = "default")]
    session: String,
}

/// Callback that prints whatever it receives
fn printer(method: &str) -> CallbackRef {
    let label = method.to_string();
    CallbackRef::from_fn("Demo", method, move |event: &GridEvent| {
        match event {
            GridEvent::Map(map_event) => println!(
                "[{label}] {} {}/{} key={} old={:?} new={:?}",
                map_event.event_type,
                map_event.service_name,
                map_event.map_name,
                map_event.key,
                map_event.old_value,
                map_event.new_value
            ),
            GridEvent::Live(live) => println!(
                "[{label}] {} service={:?} participant={:?}",
                live.event_type, live.service_name, live.participant
            ),
        }
        Ok(())
    })
}

fn candidates() -> Vec<CallbackCandidate> {
    vec![
        // Every map of every service
        CallbackCandidate::for_category(printer("all_maps"), EventCategory::Map, vec![]),
        CallbackCandidate::for_category(
            printer("open_orders"),
            EventCategory::Map,
            vec![
                Qualifier::MapName("orders".into()),
                Qualifier::Synchronous,
                Qualifier::Filter(Binding::with_value("property-equals", "status=\"open\"")),
            ],
        ),
        CallbackCandidate::for_category(
            printer("order_status"),
            EventCategory::Map,
            vec![
                Qualifier::MapName("orders".into()),
                Qualifier::Extractor(Binding::with_value("property", "status")),
                Qualifier::On(EventTag::Updated),
            ],
        ),
        CallbackCandidate::for_category(
            printer("arrivals"),
            EventCategory::Transfer,
            vec![Qualifier::On(EventTag::Arrived)],
        ),
        CallbackCandidate::for_category(
            printer("east_changes"),
            EventCategory::FederatedChange,
            vec![Qualifier::ParticipantName("east".into())],
        ),
    ]
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = DispatchConfig::try_from_env().context("loading configuration")?;
    if let Some(workers) = args.workers {
        config.async_workers = workers.max(1);
    }
    if let Some(executor) = args.executor {
        config.executor = executor;
    }
    config.default_session = args.session.clone();
    init_tracing(&config);
    info!(?config, "Starting grid dispatch demo");

    let sessions = Arc::new(LocalSessions::new());
    let session = sessions.add_session(&args.session, "DistributedCache", Some("demo"));

    let engine = DispatchEngine::builder(config)
        .sessions(sessions.clone())
        .discover(candidates())
        .context("discovering callbacks")?;

    let service = LocalEventSource::partitioned_service("DistributedCache", Some("demo"));
    let attached = engine.introduce_source(&service);
    println!("{attached} handler(s) attached to the partitioned service");

    let report = engine
        .on_map_created(&session.map_created("orders"))
        .context("registering listeners for orders")?;
    println!(
        "orders: {} listener(s) registered, {} skipped, {} failed",
        report.registered.len(),
        report.skipped.len(),
        report.failures.len()
    );

    let orders = session.ensure_map("orders");
    orders.put("o-1", json!({"status": "open", "qty": 5}))?;
    orders.put("o-1", json!({"status": "filled", "qty": 5}))?;
    orders.remove("o-1")?;

    service.fire(LiveEvent::new(EventType::TransferArrived))?;
    service.fire(LiveEvent::new(EventType::CommittingLocal).with_participant("east"))?;
    service.fire(LiveEvent::new(EventType::CommittingLocal).with_participant("west"))?;

    // Allow asynchronous deliveries to finish
    tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

    println!("\nDemo completed!");
    Ok(())
}
