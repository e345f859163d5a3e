// Expose the modules
pub mod config;
pub mod domain;

// Re-export key types for easier usage
pub use config::{ConfigError, DispatchConfig, ExecutorKind, init_tracing};
pub use domain::models::{
    Binding, CallbackCandidate, CallbackError, CallbackRef, DispatchKey, EventCategory, EventTag, EventType,
    GridEvent, LiveEvent, MapCreated, MapEvent, NamePattern, ParameterKind, Qualifier,
};
pub use domain::services::dispatch::{
    DeliveryMode, DispatchError, DispatchResult, InlineExecutor, Invoker, TaskExecutor, ThreadPoolExecutor,
    TokioExecutor,
};
pub use domain::services::engine::{DispatchEngine, DispatchEngineBuilder};
pub use domain::services::handlers::{EventHandler, EventSource, LocalEventSource, SourceKind};
pub use domain::services::map_listeners::{LocalSessions, MapListenerRegistrar, RegistrationReport};
pub use domain::services::subscriptions::{QualifierResolver, Subscription, SubscriptionRegistry};
