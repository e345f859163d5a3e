//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// Filters and transformers narrow or reshape the map events a subscription receives.
// Subscriptions only carry declarative bindings; executable criteria are produced by the
// resolvers below on first use and memoized on the subscription.
//
// | Component                | Description                                                |
// |--------------------------|------------------------------------------------------------|
// | Filter                   | Predicate over an entry value                              |
// | MapEventTransformer      | Rewrites (or suppresses) a map event before delivery       |
// | FilterResolver           | Turns filter bindings into one filter                      |
// | TransformerResolver      | Turns transformer / extractor bindings into a transformer  |
// | MapEventFilter           | Event-type mask combined with an optional value filter     |
// | DeliveryFilter           | What is handed to a map when registering a listener        |
// | Memo / resolve_*         | Idempotent, race-tolerant lazy resolution                  |
//--------------------------------------------------------------------------------------------------

mod factories;
mod filters;
mod lazy;

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

use crate::domain::models::{Binding, MapEvent};

pub use factories::{
    ExtractorEventTransformer, FactoryFilterResolver, FactoryTransformerResolver, FilterFactory,
    PropertyExtractor, TransformerFactory,
};
pub use filters::{AllFilter, AlwaysFilter, DeliveryFilter, MapEventFilter, NeverFilter, PropertyEqualsFilter};
pub use lazy::{Memo, resolve_filter, resolve_transformer};

/// Errors raised while turning bindings into executable criteria.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolutionError {
    /// No factory is registered under the binding's name
    #[error("No factory registered for binding: {0}")]
    UnknownBinding(String),

    /// A factory rejected the binding's argument
    #[error("Invalid binding {binding}: {reason}")]
    InvalidBinding { binding: String, reason: String },

    /// Any other resolver failure
    #[error("Resolution failed: {0}")]
    Failed(String),
}

/// Type alias for Result with ResolutionError
pub type ResolutionResult<T> = Result<T, ResolutionError>;

/// Predicate evaluated against an entry value.
pub trait Filter: Send + Sync + fmt::Debug {
    fn evaluate(&self, value: &Value) -> bool;
}

/// Rewrites a map event before delivery. Returning `None` suppresses the event.
pub trait MapEventTransformer: Send + Sync + fmt::Debug {
    fn transform(&self, event: MapEvent) -> Option<MapEvent>;
}

/// Outcome of filter resolution: either a plain value filter, or a filter that is
/// already shaped for map events.
#[derive(Debug, Clone)]
pub enum ResolvedFilter {
    Value(Arc<dyn Filter>),
    Event(MapEventFilter),
}

/// Resolves declarative filter bindings into an executable filter.
///
/// Implementations must be free of side effects: concurrent first uses of the same
/// subscription may call `resolve` more than once and all but one result is dropped.
#[cfg_attr(test, mockall::automock)]
pub trait FilterResolver: Send + Sync {
    fn resolve(&self, bindings: &[Binding]) -> ResolutionResult<ResolvedFilter>;
}

/// Resolves transformer or extractor bindings into a map event transformer.
#[cfg_attr(test, mockall::automock)]
pub trait TransformerResolver: Send + Sync {
    /// Builds a transformer from transformer-factory bindings.
    fn resolve_transformer(&self, bindings: &[Binding]) -> ResolutionResult<Arc<dyn MapEventTransformer>>;

    /// Builds a transformer that applies the value extractors named by `bindings`.
    fn resolve_extractor(&self, bindings: &[Binding]) -> ResolutionResult<Arc<dyn MapEventTransformer>>;
}
