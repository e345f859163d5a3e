//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// Wires discovery, the subscription registry, live-event handlers and map listener
// registration behind one entry point.
//
// | Component             | Description                                              |
// |-----------------------|----------------------------------------------------------|
// | DispatchEngineBuilder | Collects collaborators, then validates and discovers     |
// | DispatchEngine        | introduce_source, on_map_created, register_eagerly       |
//--------------------------------------------------------------------------------------------------


use std::fmt;
use std::sync::Arc;

use tracing::{debug, info};

use crate::config::{ConfigError, DispatchConfig};
use crate::domain::models::{CallbackCandidate, EventCategory, MapCreated};
use crate::domain::services::criteria::{
    FactoryFilterResolver, FactoryTransformerResolver, FilterResolver, TransformerResolver,
};
use crate::domain::services::dispatch::{DispatchError, DispatchResult, Invoker, TaskExecutor};
use crate::domain::services::handlers::{EventHandler, EventSource, build_handlers};
use crate::domain::services::map_listeners::{
    LocalSessions, MapListenerRegistrar, RegistrationReport, SessionLookup,
};
use crate::domain::services::subscriptions::{QualifierResolver, Subscription, SubscriptionRegistry};

/// Builder for [`DispatchEngine`].
pub struct DispatchEngineBuilder {
    config: DispatchConfig,
    executor: Option<Arc<dyn TaskExecutor>>,
    sessions: Arc<dyn SessionLookup>,
    filters: Arc<dyn FilterResolver>,
    transformers: Arc<dyn TransformerResolver>,
}

impl DispatchEngineBuilder {
    pub fn new(config: DispatchConfig) -> Self {
        Self {
            config,
            executor: None,
            sessions: Arc::new(LocalSessions::new()),
            filters: Arc::new(FactoryFilterResolver::with_defaults()),
            transformers: Arc::new(FactoryTransformerResolver::new()),
        }
    }

    /// Overrides the executor the configuration would build.
    pub fn executor(mut self, executor: Arc<dyn TaskExecutor>) -> Self {
        self.executor = Some(executor);
        self
    }

    pub fn sessions(mut self, sessions: Arc<dyn SessionLookup>) -> Self {
        self.sessions = sessions;
        self
    }

    pub fn filters(mut self, filters: Arc<dyn FilterResolver>) -> Self {
        self.filters = filters;
        self
    }

    pub fn transformers(mut self, transformers: Arc<dyn TransformerResolver>) -> Self {
        self.transformers = transformers;
        self
    }

    /// Validates every candidate and builds the engine.
    ///
    /// # Errors
    /// [`DispatchError::Configuration`] naming the first callback whose signature is
    /// not a single map-event or live-event parameter.
    pub fn discover(self, candidates: impl IntoIterator<Item = CallbackCandidate>) -> DispatchResult<DispatchEngine> {
        let executor = match self.executor {
            Some(executor) => executor,
            None => self.config.build_executor().map_err(|err: ConfigError| DispatchError::Configuration {
                callback: "<executor>".to_string(),
                reason: err.to_string(),
            })?,
        };
        let invoker = Invoker::new(executor);

        let subscriptions = candidates
            .into_iter()
            .map(subscription_for)
            .collect::<DispatchResult<Vec<_>>>()?;

        let (map_subscriptions, live_subscriptions): (Vec<_>, Vec<_>) = subscriptions
            .into_iter()
            .partition(|subscription| subscription.category() == EventCategory::Map);

        let registry = Arc::new(SubscriptionRegistry::build(map_subscriptions));
        let handlers = build_handlers(live_subscriptions, &invoker);
        let registrar = MapListenerRegistrar::new(
            Arc::clone(&registry),
            self.sessions,
            self.filters,
            self.transformers,
            invoker.clone(),
        );
        info!(
            map_subscriptions = registry.len(),
            handlers = handlers.len(),
            "Dispatch engine ready"
        );
        Ok(DispatchEngine {
            config: self.config,
            registry,
            handlers,
            registrar,
            invoker,
        })
    }
}

fn subscription_for(candidate: CallbackCandidate) -> DispatchResult<Arc<Subscription>> {
    let category = candidate
        .event_category()
        .ok_or_else(|| DispatchError::Configuration {
            callback: candidate.callback.id(),
            reason: format!(
                "expected exactly one map event or live event parameter, found {:?}",
                candidate.parameters
            ),
        })?;
    debug!(callback = %candidate.callback, %category, "Discovered callback");
    Ok(Arc::new(QualifierResolver::resolve(
        category,
        &candidate.qualifiers,
        candidate.callback,
    )))
}

/// Subscription matching and dispatch for one set of discovered callbacks.
pub struct DispatchEngine {
    config: DispatchConfig,
    registry: Arc<SubscriptionRegistry>,
    handlers: Vec<Arc<EventHandler>>,
    registrar: MapListenerRegistrar,
    invoker: Invoker,
}

impl DispatchEngine {
    pub fn builder(config: DispatchConfig) -> DispatchEngineBuilder {
        DispatchEngineBuilder::new(config)
    }

    /// Offers a live source to every handler.
    ///
    /// # Returns
    /// The number of handlers that attached to the source.
    pub fn introduce_source(&self, source: &dyn EventSource) -> usize {
        let attached = self
            .handlers
            .iter()
            .filter(|handler| handler.introduce_source(source))
            .count();
        debug!(source = %source.id(), attached, "Introduced source");
        attached
    }

    /// Registers map listeners for a newly created map. A notification without a
    /// session name is taken to concern the configured default session.
    pub fn on_map_created(&self, created: &MapCreated) -> DispatchResult<RegistrationReport> {
        if created.session_name.is_empty() {
            let created = MapCreated {
                session_name: self.config.default_session.clone(),
                ..created.clone()
            };
            return self.registrar.on_map_created(&created);
        }
        self.registrar.on_map_created(created)
    }

    pub fn register_eagerly(&self) -> RegistrationReport {
        self.registrar.register_eagerly()
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<SubscriptionRegistry> {
        &self.registry
    }

    pub fn handlers(&self) -> &[Arc<EventHandler>] {
        &self.handlers
    }

    pub fn invoker(&self) -> &Invoker {
        &self.invoker
    }
}

impl fmt::Debug for DispatchEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchEngine")
            .field("config", &self.config)
            .field("map_subscriptions", &self.registry.len())
            .field("handlers", &self.handlers.len())
            .finish()
    }
}
