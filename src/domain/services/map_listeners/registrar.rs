//--------------------------------------------------------------------------------------------------
// STRUCTS
//--------------------------------------------------------------------------------------------------
// | Name                  | Description                                      | Key Methods        |
// |-----------------------|--------------------------------------------------|--------------------|
// | RegistrationReport    | Outcome of one registration pass                 | is_clean           |
// | MapListenerRegistrar  | Registers map subscriptions on concrete maps     | on_map_created     |
// |                       |                                                  | register_eagerly   |
//--------------------------------------------------------------------------------------------------

use std::fmt;
use std::sync::Arc;

use tracing::{debug, error, info};
use uuid::Uuid;

use crate::domain::models::{MapCreated, unqualified_service_name};
use crate::domain::services::criteria::{
    DeliveryFilter, FilterResolver, TransformerResolver, resolve_filter, resolve_transformer,
};
use crate::domain::services::dispatch::{DispatchError, DispatchResult, Invoker};
use crate::domain::services::subscriptions::{Subscription, SubscriptionRegistry};

use super::grid::{NamedMap, SessionLookup};
use super::MapListener;

/// What happened to each candidate of a registration pass.
#[derive(Debug, Default)]
pub struct RegistrationReport {
    /// Subscriptions now listening on the map
    pub registered: Vec<Uuid>,
    /// Candidates whose scope or session did not match
    pub skipped: Vec<Uuid>,
    /// One entry per candidate that failed
    pub failures: Vec<DispatchError>,
}

impl RegistrationReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Turns map subscriptions into listeners on concrete maps.
pub struct MapListenerRegistrar {
    registry: Arc<SubscriptionRegistry>,
    sessions: Arc<dyn SessionLookup>,
    filters: Arc<dyn FilterResolver>,
    transformers: Arc<dyn TransformerResolver>,
    invoker: Invoker,
}

impl MapListenerRegistrar {
    pub fn new(
        registry: Arc<SubscriptionRegistry>,
        sessions: Arc<dyn SessionLookup>,
        filters: Arc<dyn FilterResolver>,
        transformers: Arc<dyn TransformerResolver>,
        invoker: Invoker,
    ) -> Self {
        Self {
            registry,
            sessions,
            filters,
            transformers,
            invoker,
        }
    }

    /// Registers every matching subscription on a newly created map.
    ///
    /// Candidates are found with the unqualified service name, have their criteria
    /// resolved, and are kept when their scope and session constraints match the
    /// notification. Resolution and registration failures are reported per
    /// candidate and do not stop the others.
    ///
    /// # Errors
    /// [`DispatchError::SessionNotFound`] when candidates remain but the notification's
    /// session does not exist.
    pub fn on_map_created(&self, created: &MapCreated) -> DispatchResult<RegistrationReport> {
        let service = unqualified_service_name(&created.service_name);
        let candidates = self.registry.lookup(service, &created.map_name);
        debug!(
            service,
            map = %created.map_name,
            session = %created.session_name,
            candidates = candidates.len(),
            "Map created"
        );

        let mut report = RegistrationReport::default();
        let mut survivors = Vec::new();
        for subscription in candidates {
            let delivery = match self.criteria(&subscription) {
                Ok(delivery) => delivery,
                Err(err) => {
                    self.log_failure(&subscription, &created.map_name, &err);
                    report.failures.push(err);
                    continue;
                }
            };
            if matches_context(&subscription, created) {
                survivors.push((subscription, delivery));
            } else {
                debug!(subscription = %subscription.id(), "Scope or session does not match");
                report.skipped.push(subscription.id());
            }
        }
        if survivors.is_empty() {
            return Ok(report);
        }

        let session = self
            .sessions
            .session(&created.session_name)
            .ok_or_else(|| DispatchError::SessionNotFound(created.session_name.clone()))?;
        let map = session.map(&created.map_name).map_err(|err| err.to_string());

        for (subscription, delivery) in survivors {
            let outcome = match &map {
                Ok(map) => self.attach(&subscription, map.as_ref(), delivery),
                Err(reason) => Err(registration_error(&subscription, &created.map_name, reason.clone())),
            };
            self.record(&mut report, &subscription, &created.map_name, outcome);
        }
        info!(
            map = %created.map_name,
            registered = report.registered.len(),
            failed = report.failures.len(),
            "Registered map listeners"
        );
        Ok(report)
    }

    /// Registers every subscription naming a concrete map and session against that
    /// map, for maps that already exist at start-up.
    pub fn register_eagerly(&self) -> RegistrationReport {
        let mut report = RegistrationReport::default();
        for subscription in self.registry.all_concrete() {
            let (Some(session_name), Some(map_name)) =
                (subscription.session_name(), subscription.map_name().as_exact())
            else {
                continue;
            };
            let outcome = self.criteria(&subscription).and_then(|delivery| {
                let session = self
                    .sessions
                    .session(session_name)
                    .ok_or_else(|| DispatchError::SessionNotFound(session_name.to_string()))?;
                let map = session
                    .map(map_name)
                    .map_err(|err| registration_error(&subscription, map_name, err.to_string()))?;
                self.attach(&subscription, map.as_ref(), delivery)
            });
            self.record(&mut report, &subscription, map_name, outcome);
        }
        info!(
            registered = report.registered.len(),
            failed = report.failures.len(),
            "Eager map listener registration finished"
        );
        report
    }

    fn criteria(&self, subscription: &Subscription) -> DispatchResult<Option<DeliveryFilter>> {
        let resolution = |source| DispatchError::Resolution {
            subscription: subscription.id(),
            source,
        };
        let filter = resolve_filter(subscription, self.filters.as_ref()).map_err(resolution)?;
        let transformer = resolve_transformer(subscription, self.transformers.as_ref()).map_err(resolution)?;
        Ok(DeliveryFilter::compose(filter, transformer))
    }

    fn attach(
        &self,
        subscription: &Arc<Subscription>,
        map: &dyn NamedMap,
        delivery: Option<DeliveryFilter>,
    ) -> DispatchResult<()> {
        let listener = Arc::new(MapListener::new(Arc::clone(subscription), self.invoker.clone()));
        map.add_map_listener(listener, delivery, subscription.is_lite())
            .map_err(|err| registration_error(subscription, map.name(), err.to_string()))
    }

    fn record(
        &self,
        report: &mut RegistrationReport,
        subscription: &Subscription,
        map_name: &str,
        outcome: DispatchResult<()>,
    ) {
        match outcome {
            Ok(()) => report.registered.push(subscription.id()),
            Err(err) => {
                self.log_failure(subscription, map_name, &err);
                report.failures.push(err);
            }
        }
    }

    fn log_failure(&self, subscription: &Subscription, map_name: &str, err: &DispatchError) {
        error!(
            subscription = %subscription.id(),
            callback = %subscription.callback(),
            service = %subscription.service_name(),
            map = map_name,
            error = %err,
            "Map listener registration failed"
        );
    }
}

fn matches_context(subscription: &Subscription, created: &MapCreated) -> bool {
    let scope_ok = subscription
        .scope_name()
        .is_none_or(|scope| created.scope_name.as_deref() == Some(scope));
    let session_ok = subscription
        .session_name()
        .is_none_or(|session| session == created.session_name);
    scope_ok && session_ok
}

fn registration_error(subscription: &Subscription, map: &str, reason: String) -> DispatchError {
    DispatchError::Registration {
        subscription: subscription.id(),
        map: map.to_string(),
        reason,
    }
}

impl fmt::Debug for MapListenerRegistrar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapListenerRegistrar")
            .field("subscriptions", &self.registry.len())
            .finish_non_exhaustive()
    }
}
