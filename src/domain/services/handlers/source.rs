//--------------------------------------------------------------------------------------------------
// STRUCTS & TRAITS
//--------------------------------------------------------------------------------------------------
// | Name             | Description                                        | Key Methods        |
// |------------------|----------------------------------------------------|--------------------|
// | SourceKind       | What kind of live dispatcher a source is           | scope_name         |
// | EventSource      | A live dispatcher handlers can attach to           | add_interceptor    |
// | LocalEventSource | In-memory dispatcher used by the engine and tests  | fire               |
//--------------------------------------------------------------------------------------------------

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::domain::models::{EventCategory, EventType, LiveEvent};
use crate::domain::services::dispatch::DispatchResult;

use super::EventHandler;

/// The kind of live dispatcher, with the names it is scoped by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceKind {
    /// A grid instance.
    Grid { name: String },
    /// A session.
    Session { name: String },
    /// A cache factory, optionally scoped.
    CacheFactory { scope_name: Option<String> },
    /// A single cache within a service.
    Cache {
        scope_name: Option<String>,
        service_name: String,
        cache_name: String,
    },
    /// A partitioned service. `scope_name` is unset when the service has no cache factory.
    PartitionedService {
        service_name: String,
        scope_name: Option<String>,
    },
}

impl SourceKind {
    pub fn scope_name(&self) -> Option<&str> {
        match self {
            Self::CacheFactory { scope_name }
            | Self::Cache { scope_name, .. }
            | Self::PartitionedService { scope_name, .. } => scope_name.as_deref(),
            Self::Grid { .. } | Self::Session { .. } => None,
        }
    }

    /// Event categories this kind of source raises.
    pub fn categories(&self) -> &'static [EventCategory] {
        match self {
            Self::Grid { .. } => &[EventCategory::GridLifecycle],
            Self::Session { .. } => &[EventCategory::SessionLifecycle],
            Self::CacheFactory { .. } => &[EventCategory::Lifecycle],
            Self::Cache { .. } => &[
                EventCategory::CacheLifecycle,
                EventCategory::Entry,
                EventCategory::EntryProcessor,
            ],
            Self::PartitionedService { .. } => &[
                EventCategory::Transfer,
                EventCategory::Transaction,
                EventCategory::UnsolicitedCommit,
                EventCategory::FederatedChange,
                EventCategory::FederatedConnection,
                EventCategory::FederatedPartition,
            ],
        }
    }
}

/// A live event dispatcher that handlers are introduced to.
pub trait EventSource: Send + Sync {
    fn id(&self) -> Uuid;

    fn kind(&self) -> &SourceKind;

    /// Event types this source can raise.
    fn supported_types(&self) -> &BTreeSet<EventType>;

    /// Attaches `handler` for the given event types.
    fn add_interceptor(&self, id: &str, handler: Arc<EventHandler>, types: BTreeSet<EventType>);
}

struct Interceptor {
    id: String,
    handler: Arc<EventHandler>,
    types: BTreeSet<EventType>,
}

/// In-memory [`EventSource`] that delivers fired events to its interceptors on the
/// calling thread.
pub struct LocalEventSource {
    id: Uuid,
    kind: SourceKind,
    supported: BTreeSet<EventType>,
    interceptors: RwLock<Vec<Interceptor>>,
}

impl LocalEventSource {
    /// A source supporting every event type of its kind's categories.
    pub fn new(kind: SourceKind) -> Self {
        let supported = kind
            .categories()
            .iter()
            .flat_map(|category| category.event_types().iter().copied())
            .collect();
        Self::with_supported_types(kind, supported)
    }

    pub fn with_supported_types(kind: SourceKind, supported: BTreeSet<EventType>) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            supported,
            interceptors: RwLock::new(Vec::new()),
        }
    }

    pub fn grid(name: impl Into<String>) -> Self {
        Self::new(SourceKind::Grid { name: name.into() })
    }

    pub fn session(name: impl Into<String>) -> Self {
        Self::new(SourceKind::Session { name: name.into() })
    }

    pub fn cache_factory(scope_name: Option<&str>) -> Self {
        Self::new(SourceKind::CacheFactory {
            scope_name: scope_name.map(str::to_string),
        })
    }

    pub fn cache(scope_name: Option<&str>, service_name: &str, cache_name: &str) -> Self {
        Self::new(SourceKind::Cache {
            scope_name: scope_name.map(str::to_string),
            service_name: service_name.to_string(),
            cache_name: cache_name.to_string(),
        })
    }

    pub fn partitioned_service(service_name: &str, scope_name: Option<&str>) -> Self {
        Self::new(SourceKind::PartitionedService {
            service_name: service_name.to_string(),
            scope_name: scope_name.map(str::to_string),
        })
    }

    /// Ids of the interceptors attached so far, in attachment order.
    pub fn interceptor_ids(&self) -> Vec<String> {
        self.interceptors.read().iter().map(|i| i.id.clone()).collect()
    }

    /// Event types the interceptor with `id` is attached for.
    pub fn interceptor_types(&self, id: &str) -> Option<BTreeSet<EventType>> {
        self.interceptors
            .read()
            .iter()
            .find(|i| i.id == id)
            .map(|i| i.types.clone())
    }

    /// Raises `event` to every interceptor attached for its type.
    ///
    /// Names the event does not carry are filled in from the source. The first
    /// synchronous delivery error stops the dispatch and is returned.
    pub fn fire(&self, event: LiveEvent) -> DispatchResult<()> {
        let event = self.stamp(event);
        let targets: Vec<_> = self
            .interceptors
            .read()
            .iter()
            .filter(|i| i.types.contains(&event.event_type))
            .map(|i| Arc::clone(&i.handler))
            .collect();
        debug!(source = %self.id, event_type = %event.event_type, interceptors = targets.len(), "Firing event");
        for handler in targets {
            handler.on_event(&event)?;
        }
        Ok(())
    }

    fn stamp(&self, mut event: LiveEvent) -> LiveEvent {
        if event.scope_name.is_none() {
            event.scope_name = self.kind.scope_name().map(str::to_string);
        }
        match &self.kind {
            SourceKind::Cache {
                service_name,
                cache_name,
                ..
            } => {
                event.service_name.get_or_insert_with(|| service_name.clone());
                event.cache_name.get_or_insert_with(|| cache_name.clone());
            }
            SourceKind::PartitionedService { service_name, .. } => {
                event.service_name.get_or_insert_with(|| service_name.clone());
            }
            SourceKind::Session { name } => {
                event.session_name.get_or_insert_with(|| name.clone());
            }
            SourceKind::Grid { .. } | SourceKind::CacheFactory { .. } => {}
        }
        event
    }
}

impl EventSource for LocalEventSource {
    fn id(&self) -> Uuid {
        self.id
    }

    fn kind(&self) -> &SourceKind {
        &self.kind
    }

    fn supported_types(&self) -> &BTreeSet<EventType> {
        &self.supported
    }

    fn add_interceptor(&self, id: &str, handler: Arc<EventHandler>, types: BTreeSet<EventType>) {
        debug!(source = %self.id, interceptor = id, ?types, "Adding interceptor");
        self.interceptors.write().push(Interceptor {
            id: id.to_string(),
            handler,
            types,
        });
    }
}

impl fmt::Debug for LocalEventSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalEventSource")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("interceptors", &self.interceptors.read().len())
            .finish()
    }
}
