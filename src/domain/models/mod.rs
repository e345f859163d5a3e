pub mod callback;
pub mod events;
pub mod types;

pub use callback::{CallbackCandidate, CallbackError, CallbackRef, FnObserver, Observer, ParameterKind};
pub use events::{GridEvent, LiveEvent, MapCreated, MapEvent};
pub use types::{
    Binding, DispatchKey, EventCategory, EventTag, EventType, NamePattern, Qualifier, WILDCARD,
    unqualified_service_name,
};
