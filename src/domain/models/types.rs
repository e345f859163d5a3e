//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// Core value types shared by the subscription registry, the handler variants and the
// map listener registrar.
//
// | Section            | Description                                                      |
// |--------------------|------------------------------------------------------------------|
// | NAMES              | Wildcard-aware names and the (service, map) dispatch key.        |
// | EVENT TAXONOMY     | Event categories and the flat set of concrete event types.       |
// | QUALIFIERS         | Declarative tags attached to a callback.                         |
// | TESTS              | Unit tests for the types above.                                  |
//--------------------------------------------------------------------------------------------------

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The literal used by declarations to mean "any name".
pub const WILDCARD: &str = "*";

//--------------------------------------------------------------------------------------------------
//  NAMES
//--------------------------------------------------------------------------------------------------
// | Name          | Description                                         |
// |---------------|-----------------------------------------------------|
// | NamePattern   | Either a concrete name or the wildcard.             |
// | DispatchKey   | (service, map) pair used to index subscriptions.    |
//--------------------------------------------------------------------------------------------------

/// A map or service name as declared by a subscription.
///
/// `Any` is the wildcard. It renders as `*` and parsing `"*"` produces it, so the
/// sentinel string never leaks into matching logic.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NamePattern {
    /// Matches every name.
    Any,
    /// Matches exactly this name.
    Exact(String),
}

impl NamePattern {
    /// Builds a pattern from a declared name, mapping `"*"` to [`NamePattern::Any`].
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        if name == WILDCARD {
            Self::Any
        } else {
            Self::Exact(name)
        }
    }

    pub fn is_wildcard(&self) -> bool {
        matches!(self, Self::Any)
    }

    /// Returns the concrete name, if any.
    pub fn as_exact(&self) -> Option<&str> {
        match self {
            Self::Any => None,
            Self::Exact(name) => Some(name),
        }
    }

    /// Returns `true` if `name` is matched by this pattern.
    pub fn matches(&self, name: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Exact(expected) => expected == name,
        }
    }
}

impl Default for NamePattern {
    fn default() -> Self {
        Self::Any
    }
}

impl fmt::Display for NamePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str(WILDCARD),
            Self::Exact(name) => f.write_str(name),
        }
    }
}

impl From<&str> for NamePattern {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for NamePattern {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

/// Key of the two-level subscription index.
///
/// Ordering and equality are purely structural: `(*, *)`, `(*, X)`, `(S, *)` and
/// `(S, X)` are four different keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DispatchKey {
    pub service: NamePattern,
    pub map: NamePattern,
}

impl DispatchKey {
    pub fn new(service: impl Into<NamePattern>, map: impl Into<NamePattern>) -> Self {
        Self {
            service: service.into(),
            map: map.into(),
        }
    }

    /// The four keys whose buckets may hold subscriptions for a concrete pair,
    /// most general first.
    pub fn candidates(service: &str, map: &str) -> [DispatchKey; 4] {
        [
            DispatchKey::new(NamePattern::Any, NamePattern::Any),
            DispatchKey::new(NamePattern::Any, NamePattern::new(map)),
            DispatchKey::new(NamePattern::new(service), NamePattern::Any),
            DispatchKey::new(NamePattern::new(service), NamePattern::new(map)),
        ]
    }
}

impl fmt::Display for DispatchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.service, self.map)
    }
}

/// Removes the scope prefix from a physically qualified service name.
///
/// `"scope:Service"` becomes `"Service"`; names without a `:` are returned as-is.
pub fn unqualified_service_name(service_name: &str) -> &str {
    match service_name.find(':') {
        Some(index) => &service_name[index + 1..],
        None => service_name,
    }
}

//--------------------------------------------------------------------------------------------------
//  EVENT TAXONOMY
//--------------------------------------------------------------------------------------------------
// | Name          | Description                                         |
// |---------------|-----------------------------------------------------|
// | EventCategory | Family of events a callback declares it receives.   |
// | EventType     | Concrete sub-type, owned by exactly one category.   |
// | EventTag      | Declarative sub-type tag, shared across categories. |
//--------------------------------------------------------------------------------------------------

/// Families of notifications a callback can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventCategory {
    /// Entry-changed notifications on a named map.
    Map,
    /// The grid instance itself starting or stopping.
    GridLifecycle,
    /// A session starting or stopping.
    SessionLifecycle,
    /// A cache factory being activated or disposed.
    Lifecycle,
    /// A cache being created, destroyed or truncated.
    CacheLifecycle,
    /// Server-side entry mutation interception.
    Entry,
    /// Entry processor execution.
    EntryProcessor,
    /// Partition transfer between members.
    Transfer,
    /// Partition-level transactions.
    Transaction,
    /// Changes committed without a client request (e.g. eviction).
    UnsolicitedCommit,
    /// Federated change replication.
    FederatedChange,
    /// Federation connection state.
    FederatedConnection,
    /// Federated partition synchronisation.
    FederatedPartition,
}

impl EventCategory {
    pub const ALL: [EventCategory; 13] = [
        EventCategory::Map,
        EventCategory::GridLifecycle,
        EventCategory::SessionLifecycle,
        EventCategory::Lifecycle,
        EventCategory::CacheLifecycle,
        EventCategory::Entry,
        EventCategory::EntryProcessor,
        EventCategory::Transfer,
        EventCategory::Transaction,
        EventCategory::UnsolicitedCommit,
        EventCategory::FederatedChange,
        EventCategory::FederatedConnection,
        EventCategory::FederatedPartition,
    ];

    /// Every event type belonging to this category.
    pub fn event_types(self) -> &'static [EventType] {
        use EventType::*;
        match self {
            Self::Map => &[MapInserted, MapUpdated, MapDeleted],
            Self::GridLifecycle => &[GridStarting, GridStarted, GridStopping, GridStopped],
            Self::SessionLifecycle => &[
                SessionStarting,
                SessionStarted,
                SessionStopping,
                SessionStopped,
            ],
            Self::Lifecycle => &[Activating, Activated, Disposing],
            Self::CacheLifecycle => &[CacheCreated, CacheDestroyed, CacheTruncated],
            Self::Entry => &[
                EntryInserting,
                EntryInserted,
                EntryUpdating,
                EntryUpdated,
                EntryRemoving,
                EntryRemoved,
            ],
            Self::EntryProcessor => &[ProcessorExecuting, ProcessorExecuted],
            Self::Transfer => &[
                TransferAssigned,
                TransferArrived,
                TransferDeparting,
                TransferDeparted,
                TransferLost,
                TransferRecovered,
                TransferRollback,
            ],
            Self::Transaction => &[TransactionCommitting, TransactionCommitted],
            Self::UnsolicitedCommit => &[UnsolicitedCommitted],
            Self::FederatedChange => &[CommittingLocal, CommittingRemote, Replicating],
            Self::FederatedConnection => &[
                Connecting,
                Disconnected,
                BacklogExcessive,
                BacklogNormal,
                ConnectionError,
            ],
            Self::FederatedPartition => &[Syncing, Synced],
        }
    }

    /// Every event type of this category as a set.
    pub fn all_event_types(self) -> BTreeSet<EventType> {
        self.event_types().iter().copied().collect()
    }

    /// Maps a declarative tag onto this category's event type, if the tag applies.
    pub fn event_type_for(self, tag: EventTag) -> Option<EventType> {
        use EventTag as T;
        use EventType::*;
        let event_type = match (self, tag) {
            (Self::Map, T::Inserted) => MapInserted,
            (Self::Map, T::Updated) => MapUpdated,
            (Self::Map, T::Deleted) => MapDeleted,

            (Self::GridLifecycle, T::Starting) => GridStarting,
            (Self::GridLifecycle, T::Started) => GridStarted,
            (Self::GridLifecycle, T::Stopping) => GridStopping,
            (Self::GridLifecycle, T::Stopped) => GridStopped,

            (Self::SessionLifecycle, T::Starting) => SessionStarting,
            (Self::SessionLifecycle, T::Started) => SessionStarted,
            (Self::SessionLifecycle, T::Stopping) => SessionStopping,
            (Self::SessionLifecycle, T::Stopped) => SessionStopped,

            (Self::Lifecycle, T::Activating) => Activating,
            (Self::Lifecycle, T::Activated) => Activated,
            (Self::Lifecycle, T::Disposing) => Disposing,

            (Self::CacheLifecycle, T::Created) => CacheCreated,
            (Self::CacheLifecycle, T::Destroyed) => CacheDestroyed,
            (Self::CacheLifecycle, T::Truncated) => CacheTruncated,

            (Self::Entry, T::Inserting) => EntryInserting,
            (Self::Entry, T::Inserted) => EntryInserted,
            (Self::Entry, T::Updating) => EntryUpdating,
            (Self::Entry, T::Updated) => EntryUpdated,
            (Self::Entry, T::Removing) => EntryRemoving,
            (Self::Entry, T::Removed) => EntryRemoved,

            (Self::EntryProcessor, T::Executing) => ProcessorExecuting,
            (Self::EntryProcessor, T::Executed) => ProcessorExecuted,

            (Self::Transfer, T::Assigned) => TransferAssigned,
            (Self::Transfer, T::Arrived) => TransferArrived,
            (Self::Transfer, T::Departing) => TransferDeparting,
            (Self::Transfer, T::Departed) => TransferDeparted,
            (Self::Transfer, T::Lost) => TransferLost,
            (Self::Transfer, T::Recovered) => TransferRecovered,
            (Self::Transfer, T::Rollback) => TransferRollback,

            (Self::Transaction, T::Committing) => TransactionCommitting,
            (Self::Transaction, T::Committed) => TransactionCommitted,

            (Self::UnsolicitedCommit, T::Committed) => UnsolicitedCommitted,

            (Self::FederatedChange, T::CommittingLocal) => CommittingLocal,
            (Self::FederatedChange, T::CommittingRemote) => CommittingRemote,
            (Self::FederatedChange, T::Replicating) => Replicating,

            (Self::FederatedConnection, T::Connecting) => Connecting,
            (Self::FederatedConnection, T::Disconnected) => Disconnected,
            (Self::FederatedConnection, T::BacklogExcessive) => BacklogExcessive,
            (Self::FederatedConnection, T::BacklogNormal) => BacklogNormal,
            (Self::FederatedConnection, T::Error) => ConnectionError,

            (Self::FederatedPartition, T::Syncing) => Syncing,
            (Self::FederatedPartition, T::Synced) => Synced,

            _ => return None,
        };
        Some(event_type)
    }
}

impl fmt::Display for EventCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Concrete event sub-types. Each variant belongs to exactly one [`EventCategory`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventType {
    MapInserted,
    MapUpdated,
    MapDeleted,

    GridStarting,
    GridStarted,
    GridStopping,
    GridStopped,

    SessionStarting,
    SessionStarted,
    SessionStopping,
    SessionStopped,

    Activating,
    Activated,
    Disposing,

    CacheCreated,
    CacheDestroyed,
    CacheTruncated,

    EntryInserting,
    EntryInserted,
    EntryUpdating,
    EntryUpdated,
    EntryRemoving,
    EntryRemoved,

    ProcessorExecuting,
    ProcessorExecuted,

    TransferAssigned,
    TransferArrived,
    TransferDeparting,
    TransferDeparted,
    TransferLost,
    TransferRecovered,
    TransferRollback,

    TransactionCommitting,
    TransactionCommitted,

    UnsolicitedCommitted,

    CommittingLocal,
    CommittingRemote,
    Replicating,

    Connecting,
    Disconnected,
    BacklogExcessive,
    BacklogNormal,
    ConnectionError,

    Syncing,
    Synced,
}

impl EventType {
    pub fn category(self) -> EventCategory {
        use EventType::*;
        match self {
            MapInserted | MapUpdated | MapDeleted => EventCategory::Map,
            GridStarting | GridStarted | GridStopping | GridStopped => EventCategory::GridLifecycle,
            SessionStarting | SessionStarted | SessionStopping | SessionStopped => {
                EventCategory::SessionLifecycle
            }
            Activating | Activated | Disposing => EventCategory::Lifecycle,
            CacheCreated | CacheDestroyed | CacheTruncated => EventCategory::CacheLifecycle,
            EntryInserting | EntryInserted | EntryUpdating | EntryUpdated | EntryRemoving
            | EntryRemoved => EventCategory::Entry,
            ProcessorExecuting | ProcessorExecuted => EventCategory::EntryProcessor,
            TransferAssigned | TransferArrived | TransferDeparting | TransferDeparted
            | TransferLost | TransferRecovered | TransferRollback => EventCategory::Transfer,
            TransactionCommitting | TransactionCommitted => EventCategory::Transaction,
            UnsolicitedCommitted => EventCategory::UnsolicitedCommit,
            CommittingLocal | CommittingRemote | Replicating => EventCategory::FederatedChange,
            Connecting | Disconnected | BacklogExcessive | BacklogNormal | ConnectionError => {
                EventCategory::FederatedConnection
            }
            Syncing | Synced => EventCategory::FederatedPartition,
        }
    }

    /// Pre-events are raised before the grid applies the change they describe and are
    /// always delivered on the raising thread.
    pub fn is_pre_event(self) -> bool {
        use EventType::*;
        matches!(
            self,
            GridStarting
                | GridStopping
                | SessionStarting
                | SessionStopping
                | Activating
                | Disposing
                | EntryInserting
                | EntryUpdating
                | EntryRemoving
                | ProcessorExecuting
                | TransferDeparting
                | TransactionCommitting
                | CommittingLocal
                | CommittingRemote
                | Replicating
                | Connecting
                | Syncing
        )
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Declarative sub-type tag. The same tag may select event types in several
/// categories (`Committed` applies to transactions and unsolicited commits).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventTag {
    Inserting,
    Inserted,
    Updating,
    Updated,
    Removing,
    Removed,
    Deleted,
    Created,
    Destroyed,
    Truncated,
    Executing,
    Executed,
    Starting,
    Started,
    Stopping,
    Stopped,
    Activating,
    Activated,
    Disposing,
    Assigned,
    Arrived,
    Departing,
    Departed,
    Lost,
    Recovered,
    Rollback,
    Committing,
    Committed,
    CommittingLocal,
    CommittingRemote,
    Replicating,
    Connecting,
    Disconnected,
    BacklogExcessive,
    BacklogNormal,
    Error,
    Syncing,
    Synced,
}

//--------------------------------------------------------------------------------------------------
//  QUALIFIERS
//--------------------------------------------------------------------------------------------------
// | Name          | Description                                         |
// |---------------|-----------------------------------------------------|
// | Binding       | Reference to a filter/transformer/extractor factory |
// | Qualifier     | One declarative tag on a callback                   |
//--------------------------------------------------------------------------------------------------

/// An opaque reference to a filter, transformer or extractor factory, plus the
/// argument the declaration passed to it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Binding {
    pub name: String,
    pub value: Option<String>,
}

impl Binding {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: None,
        }
    }

    pub fn with_value(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: Some(value.into()),
        }
    }
}

impl fmt::Display for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(value) => write!(f, "{}({})", self.name, value),
            None => f.write_str(&self.name),
        }
    }
}

/// A declarative tag attached to a callback.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Qualifier {
    CacheName(String),
    /// Same purpose as [`Qualifier::CacheName`].
    MapName(String),
    ServiceName(String),
    ScopeName(String),
    SessionName(String),
    /// Grid or session instance name for lifecycle subscriptions.
    Name(String),
    ParticipantName(String),
    /// Type name of the entry processor a subscription is interested in.
    Processor(String),
    Synchronous,
    Lite,
    On(EventTag),
    Filter(Binding),
    Transformer(Binding),
    Extractor(Binding),
    /// Anything this crate does not recognise. Ignored during resolution.
    Other(String),
}
