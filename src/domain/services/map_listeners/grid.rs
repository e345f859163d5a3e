//--------------------------------------------------------------------------------------------------
// STRUCTS & TRAITS
//--------------------------------------------------------------------------------------------------
// | Name          | Description                                           | Key Methods         |
// |---------------|-------------------------------------------------------|---------------------|
// | SessionLookup | Finds a session by name                               | session             |
// | Session       | Hands out named maps                                  | map                 |
// | NamedMap      | Accepts map listeners                                 | add_map_listener    |
// | LocalSessions | In-memory SessionLookup                               | add_session         |
// | LocalSession  | In-memory Session bound to one service                | ensure_map          |
// | LocalMap      | In-memory NamedMap raising entry events               | put, remove         |
//--------------------------------------------------------------------------------------------------

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

use crate::domain::models::{MapCreated, MapEvent};
use crate::domain::services::criteria::DeliveryFilter;
use crate::domain::services::dispatch::DispatchResult;

use super::MapListener;

/// Failures raised by session and map collaborators
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GridError {
    /// The map cannot be obtained from the session
    #[error("Map {0} is unavailable")]
    MapUnavailable(String),

    /// The map refused a listener
    #[error("Listener rejected by map {map}: {reason}")]
    ListenerRejected { map: String, reason: String },
}

/// Type alias for Result with GridError
pub type GridResult<T> = Result<T, GridError>;

/// Resolves sessions by name.
pub trait SessionLookup: Send + Sync {
    fn session(&self, name: &str) -> Option<Arc<dyn Session>>;
}

pub trait Session: Send + Sync {
    fn name(&self) -> &str;

    fn map(&self, map_name: &str) -> GridResult<Arc<dyn NamedMap>>;
}

pub trait NamedMap: Send + Sync {
    fn name(&self) -> &str;

    /// Registers `listener`. Events pass through `filter` when one is given and are
    /// stripped of their values when `lite` is set.
    fn add_map_listener(
        &self,
        listener: Arc<MapListener>,
        filter: Option<DeliveryFilter>,
        lite: bool,
    ) -> GridResult<()>;
}

/// In-memory session registry.
#[derive(Default)]
pub struct LocalSessions {
    sessions: RwLock<HashMap<String, Arc<LocalSession>>>,
}

impl LocalSessions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates (or returns the existing) session serving maps of one service.
    pub fn add_session(&self, name: &str, service_name: &str, scope_name: Option<&str>) -> Arc<LocalSession> {
        let mut sessions = self.sessions.write();
        let session = sessions
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(LocalSession::new(name, service_name, scope_name)));
        Arc::clone(session)
    }

    pub fn local_session(&self, name: &str) -> Option<Arc<LocalSession>> {
        self.sessions.read().get(name).cloned()
    }
}

impl SessionLookup for LocalSessions {
    fn session(&self, name: &str) -> Option<Arc<dyn Session>> {
        self.local_session(name).map(|session| session as Arc<dyn Session>)
    }
}

impl fmt::Debug for LocalSessions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.sessions.read().keys().cloned().collect();
        names.sort();
        f.debug_struct("LocalSessions").field("sessions", &names).finish()
    }
}

/// In-memory session. Maps are created on first use and belong to the session's
/// service, qualified by its scope (`scope:Service`) when it has one.
pub struct LocalSession {
    name: String,
    service_name: String,
    scope_name: Option<String>,
    maps: RwLock<HashMap<String, Arc<LocalMap>>>,
}

impl LocalSession {
    pub fn new(name: &str, service_name: &str, scope_name: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            service_name: service_name.to_string(),
            scope_name: scope_name.map(str::to_string),
            maps: RwLock::new(HashMap::new()),
        }
    }

    /// The physical service name, scope-qualified when the session is scoped.
    pub fn qualified_service_name(&self) -> String {
        match &self.scope_name {
            Some(scope) => format!("{scope}:{}", self.service_name),
            None => self.service_name.clone(),
        }
    }

    /// Returns the map, creating it if needed.
    pub fn ensure_map(&self, map_name: &str) -> Arc<LocalMap> {
        let mut maps = self.maps.write();
        let map = maps.entry(map_name.to_string()).or_insert_with(|| {
            info!(session = %self.name, map = map_name, "Created map");
            Arc::new(LocalMap::new(map_name, &self.qualified_service_name()))
        });
        Arc::clone(map)
    }

    /// The notification announcing `map_name` in this session.
    pub fn map_created(&self, map_name: &str) -> MapCreated {
        let created = MapCreated::new(self.qualified_service_name(), map_name, self.name.as_str());
        match &self.scope_name {
            Some(scope) => created.with_scope(scope.as_str()),
            None => created,
        }
    }
}

impl Session for LocalSession {
    fn name(&self) -> &str {
        &self.name
    }

    fn map(&self, map_name: &str) -> GridResult<Arc<dyn NamedMap>> {
        let map: Arc<dyn NamedMap> = self.ensure_map(map_name);
        Ok(map)
    }
}

impl fmt::Debug for LocalSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalSession")
            .field("name", &self.name)
            .field("service", &self.qualified_service_name())
            .finish_non_exhaustive()
    }
}

struct Registration {
    listener: Arc<MapListener>,
    filter: Option<DeliveryFilter>,
    lite: bool,
}

/// In-memory map raising entry events to its listeners on the mutating thread.
pub struct LocalMap {
    name: String,
    service_name: String,
    entries: RwLock<BTreeMap<String, Value>>,
    listeners: RwLock<Vec<Registration>>,
    refusal: RwLock<Option<String>>,
}

impl LocalMap {
    pub fn new(name: &str, service_name: &str) -> Self {
        Self {
            name: name.to_string(),
            service_name: service_name.to_string(),
            entries: RwLock::new(BTreeMap::new()),
            listeners: RwLock::new(Vec::new()),
            refusal: RwLock::new(None),
        }
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    /// Makes every later `add_map_listener` call fail with `reason`; `None` accepts again.
    pub fn refuse_listeners(&self, reason: Option<&str>) {
        *self.refusal.write() = reason.map(str::to_string);
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.entries.read().get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Stores `value` and raises an insert or update event.
    ///
    /// # Returns
    /// The previous value, or the first error a synchronous listener raised.
    pub fn put(&self, key: &str, value: Value) -> DispatchResult<Option<Value>> {
        let previous = self.entries.write().insert(key.to_string(), value.clone());
        let event = match &previous {
            Some(old) => MapEvent::updated(&self.name, &self.service_name, Value::from(key), old.clone(), value),
            None => MapEvent::inserted(&self.name, &self.service_name, Value::from(key), value),
        };
        self.dispatch(event)?;
        Ok(previous)
    }

    /// Removes `key`, raising a delete event when it was present.
    pub fn remove(&self, key: &str) -> DispatchResult<Option<Value>> {
        let previous = self.entries.write().remove(key);
        if let Some(old) = &previous {
            self.dispatch(MapEvent::deleted(&self.name, &self.service_name, Value::from(key), old.clone()))?;
        }
        Ok(previous)
    }

    fn dispatch(&self, event: MapEvent) -> DispatchResult<()> {
        let targets: Vec<_> = self
            .listeners
            .read()
            .iter()
            .map(|r| (Arc::clone(&r.listener), r.filter.clone(), r.lite))
            .collect();
        debug!(map = %self.name, event_type = %event.event_type, listeners = targets.len(), "Dispatching map event");
        for (listener, filter, lite) in targets {
            let delivered = match &filter {
                Some(filter) => filter.apply(event.clone()),
                None => Some(event.clone()),
            };
            if let Some(delivered) = delivered {
                let delivered = if lite { delivered.into_lite() } else { delivered };
                listener.on_map_event(delivered)?;
            }
        }
        Ok(())
    }
}

impl NamedMap for LocalMap {
    fn name(&self) -> &str {
        &self.name
    }

    fn add_map_listener(
        &self,
        listener: Arc<MapListener>,
        filter: Option<DeliveryFilter>,
        lite: bool,
    ) -> GridResult<()> {
        if let Some(reason) = self.refusal.read().clone() {
            return Err(GridError::ListenerRejected {
                map: self.name.clone(),
                reason,
            });
        }
        debug!(map = %self.name, listener = ?listener, filtered = filter.is_some(), lite, "Added map listener");
        self.listeners.write().push(Registration { listener, filter, lite });
        Ok(())
    }
}

impl fmt::Debug for LocalMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalMap")
            .field("name", &self.name)
            .field("service_name", &self.service_name)
            .field("entries", &self.len())
            .field("listeners", &self.listener_count())
            .finish()
    }
}
