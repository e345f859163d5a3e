//--------------------------------------------------------------------------------------------------
// ENUMS & STRUCTS
//--------------------------------------------------------------------------------------------------
// | Name             | Description                                         | Applies to        |
// |------------------|-----------------------------------------------------|-------------------|
// | LifecycleScope   | Grid / session / cache-factory dispatchers          | Base variant      |
// | CacheScope       | Cache dispatchers, by scope, map and service        | Cache-scoped      |
// | ServiceScope     | Partitioned services, by scope and service          | Service-scoped    |
// | FederationScope  | ServiceScope + supported types + participant        | Federation-scoped |
// | HandlerScope     | One of the above                                    |                   |
//--------------------------------------------------------------------------------------------------

use std::collections::BTreeSet;
use std::fmt;

use crate::domain::models::{EventType, LiveEvent, unqualified_service_name};

use super::source::{EventSource, SourceKind};

/// Extracts the federation participant an event concerns.
pub type ParticipantExtractor = fn(&LiveEvent) -> Option<&str>;

pub fn event_participant(event: &LiveEvent) -> Option<&str> {
    event.participant.as_deref()
}

fn unset_or_equal(constraint: Option<&str>, actual: &str) -> bool {
    constraint.is_none_or(|expected| expected == actual)
}

/// Which lifecycle dispatcher a base handler attaches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleKind {
    Grid,
    Session,
    CacheFactory,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleScope {
    pub kind: LifecycleKind,
    /// Grid or session name; unset matches any.
    pub name: Option<String>,
}

impl LifecycleScope {
    fn is_applicable(&self, source: &SourceKind) -> bool {
        match (self.kind, source) {
            (LifecycleKind::Grid, SourceKind::Grid { name })
            | (LifecycleKind::Session, SourceKind::Session { name }) => {
                unset_or_equal(self.name.as_deref(), name)
            }
            (LifecycleKind::CacheFactory, SourceKind::CacheFactory { .. }) => true,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheScope {
    pub map_name: Option<String>,
    pub service_name: Option<String>,
    pub session_name: Option<String>,
    /// Entry processor type name, only set for entry processor handlers.
    pub processor: Option<String>,
}

impl CacheScope {
    fn is_applicable(&self, scope_name: Option<&str>, source: &SourceKind) -> bool {
        let SourceKind::Cache {
            scope_name: source_scope,
            service_name,
            cache_name,
        } = source
        else {
            return false;
        };
        let scope_matches = match scope_name {
            None => true,
            Some(expected) => source_scope.as_deref() == Some(expected),
        };
        scope_matches
            && unset_or_equal(self.map_name.as_deref(), cache_name)
            && unset_or_equal(self.service_name.as_deref(), unqualified_service_name(service_name))
    }

    fn should_fire(&self, event: &LiveEvent) -> bool {
        match &self.processor {
            None => true,
            Some(expected) => event.processor.as_deref() == Some(expected.as_str()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceScope {
    pub service_name: Option<String>,
}

impl ServiceScope {
    fn is_applicable(&self, scope_name: Option<&str>, source: &SourceKind) -> bool {
        let SourceKind::PartitionedService {
            service_name,
            scope_name: source_scope,
        } = source
        else {
            return false;
        };
        let scope_matches = match (source_scope, scope_name) {
            (None, _) | (_, None) => true,
            (Some(actual), Some(expected)) => actual == expected,
        };
        scope_matches && unset_or_equal(self.service_name.as_deref(), unqualified_service_name(service_name))
    }
}

#[derive(Clone)]
pub struct FederationScope {
    pub service: ServiceScope,
    pub participant_name: Option<String>,
    pub participant_of: ParticipantExtractor,
}

impl FederationScope {
    fn is_applicable(
        &self,
        scope_name: Option<&str>,
        types: &BTreeSet<EventType>,
        source: &dyn EventSource,
    ) -> bool {
        let supported = source.supported_types();
        types.iter().any(|t| supported.contains(t)) && self.service.is_applicable(scope_name, source.kind())
    }

    fn should_fire(&self, event: &LiveEvent) -> bool {
        match &self.participant_name {
            None => true,
            Some(expected) => (self.participant_of)(event) == Some(expected.as_str()),
        }
    }
}

impl fmt::Debug for FederationScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FederationScope")
            .field("service", &self.service)
            .field("participant_name", &self.participant_name)
            .finish_non_exhaustive()
    }
}

/// Category-specific state and predicates of an event handler.
#[derive(Debug, Clone)]
pub enum HandlerScope {
    Lifecycle(LifecycleScope),
    Cache(CacheScope),
    Service(ServiceScope),
    Federation(FederationScope),
}

impl HandlerScope {
    /// Whether a handler with this scope should attach to `source`.
    ///
    /// # Arguments
    /// * `scope_name` - The handler's scope constraint
    /// * `types` - The event types the handler would register for
    /// * `source` - The candidate source
    pub fn is_applicable(
        &self,
        scope_name: Option<&str>,
        types: &BTreeSet<EventType>,
        source: &dyn EventSource,
    ) -> bool {
        match self {
            Self::Lifecycle(scope) => scope.is_applicable(source.kind()),
            Self::Cache(scope) => scope.is_applicable(scope_name, source.kind()),
            Self::Service(scope) => scope.is_applicable(scope_name, source.kind()),
            Self::Federation(scope) => scope.is_applicable(scope_name, types, source),
        }
    }

    /// Category guard evaluated before any delivery.
    pub fn should_fire(&self, event: &LiveEvent) -> bool {
        match self {
            Self::Cache(scope) => scope.should_fire(event),
            Self::Federation(scope) => scope.should_fire(event),
            Self::Lifecycle(_) | Self::Service(_) => true,
        }
    }
}
