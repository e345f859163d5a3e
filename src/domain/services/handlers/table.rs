use std::sync::Arc;

use tracing::{debug, info};

use crate::domain::models::EventCategory;
use crate::domain::services::dispatch::{DispatchError, DispatchResult, Invoker};
use crate::domain::services::subscriptions::Subscription;

use super::handler::EventHandler;
use super::scopes::{
    CacheScope, FederationScope, HandlerScope, LifecycleKind, LifecycleScope, ServiceScope, event_participant,
};

/// Builds the category-specific scope of a handler from its subscription.
pub type HandlerConstructor = fn(&Subscription) -> HandlerScope;

/// Handler variant per live-event category. Map subscriptions are served by map
/// listeners instead and have no entry.
pub static DISPATCH_TABLE: &[(EventCategory, HandlerConstructor)] = &[
    (EventCategory::GridLifecycle, grid_lifecycle),
    (EventCategory::SessionLifecycle, session_lifecycle),
    (EventCategory::Lifecycle, cache_factory_lifecycle),
    (EventCategory::CacheLifecycle, cache),
    (EventCategory::Entry, cache),
    (EventCategory::EntryProcessor, entry_processor),
    (EventCategory::Transfer, service),
    (EventCategory::Transaction, service),
    (EventCategory::UnsolicitedCommit, service),
    (EventCategory::FederatedChange, federation),
    (EventCategory::FederatedConnection, federation),
    (EventCategory::FederatedPartition, federation),
];

/// Looks up the constructor for a category.
pub fn constructor_for(category: EventCategory) -> Option<HandlerConstructor> {
    DISPATCH_TABLE
        .iter()
        .find(|(entry, _)| *entry == category)
        .map(|(_, constructor)| *constructor)
}

/// Builds the handler for one live-event subscription.
pub fn build_handler(subscription: Arc<Subscription>, invoker: Invoker) -> DispatchResult<EventHandler> {
    let category = subscription.category();
    let constructor = constructor_for(category).ok_or(DispatchError::UnsupportedCategory(category))?;
    let scope = constructor(&subscription);
    Ok(EventHandler::new(subscription, scope, invoker))
}

/// Builds one handler per live-event subscription. Map subscriptions are skipped.
pub fn build_handlers(
    subscriptions: impl IntoIterator<Item = Arc<Subscription>>,
    invoker: &Invoker,
) -> Vec<Arc<EventHandler>> {
    let handlers: Vec<_> = subscriptions
        .into_iter()
        .filter_map(|subscription| match build_handler(subscription, invoker.clone()) {
            Ok(handler) => Some(Arc::new(handler)),
            Err(err) => {
                debug!(error = %err, "Skipping subscription without handler");
                None
            }
        })
        .collect();
    info!(handlers = handlers.len(), "Built event handlers");
    handlers
}

fn grid_lifecycle(subscription: &Subscription) -> HandlerScope {
    HandlerScope::Lifecycle(LifecycleScope {
        kind: LifecycleKind::Grid,
        name: subscription.name().map(str::to_string),
    })
}

fn session_lifecycle(subscription: &Subscription) -> HandlerScope {
    HandlerScope::Lifecycle(LifecycleScope {
        kind: LifecycleKind::Session,
        name: subscription.session_name().map(str::to_string),
    })
}

fn cache_factory_lifecycle(_subscription: &Subscription) -> HandlerScope {
    HandlerScope::Lifecycle(LifecycleScope {
        kind: LifecycleKind::CacheFactory,
        name: None,
    })
}

fn cache_scope(subscription: &Subscription) -> CacheScope {
    CacheScope {
        map_name: subscription.map_name().as_exact().map(str::to_string),
        service_name: subscription.service_name().as_exact().map(str::to_string),
        session_name: subscription.session_name().map(str::to_string),
        processor: None,
    }
}

fn cache(subscription: &Subscription) -> HandlerScope {
    HandlerScope::Cache(cache_scope(subscription))
}

fn entry_processor(subscription: &Subscription) -> HandlerScope {
    HandlerScope::Cache(CacheScope {
        processor: subscription.processor().map(str::to_string),
        ..cache_scope(subscription)
    })
}

fn service_scope(subscription: &Subscription) -> ServiceScope {
    ServiceScope {
        service_name: subscription.service_name().as_exact().map(str::to_string),
    }
}

fn service(subscription: &Subscription) -> HandlerScope {
    HandlerScope::Service(service_scope(subscription))
}

fn federation(subscription: &Subscription) -> HandlerScope {
    HandlerScope::Federation(FederationScope {
        service: service_scope(subscription),
        participant_name: subscription.participant_name().map(str::to_string),
        participant_of: event_participant,
    })
}
