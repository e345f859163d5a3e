//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// Delivery of events to callbacks. Synchronous callbacks and pre-events run on the thread
// that raised the event; everything else is handed to a task executor and forgotten.
//
// | Component            | Description                                                |
// |----------------------|------------------------------------------------------------|
// | DispatchError        | Every failure the engine reports                           |
// | TaskExecutor         | Injectable fire-and-forget primitive                       |
// | ThreadPoolExecutor   | Worker threads fed by an unbounded crossbeam channel       |
// | TokioExecutor        | Blocking tasks on a tokio runtime                          |
// | InlineExecutor       | Runs tasks immediately and keeps their errors              |
// | Invoker              | Sync / async delivery policy                               |
//--------------------------------------------------------------------------------------------------

mod executor;
mod invoker;


use thiserror::Error;
use uuid::Uuid;

use crate::domain::models::{CallbackError, EventCategory};
use crate::domain::services::criteria::ResolutionError;

pub use executor::{InlineExecutor, Task, TaskExecutor, ThreadPoolExecutor, TokioExecutor};
pub use invoker::{DeliveryMode, Invoker};

/// Errors reported by the subscription and dispatch engine
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// A discovered callback cannot be turned into a subscription
    #[error("Invalid callback {callback}: {reason}")]
    Configuration { callback: String, reason: String },

    /// Filter or transformer bindings could not be resolved
    #[error("Failed to resolve criteria for subscription {subscription}: {source}")]
    Resolution {
        subscription: Uuid,
        #[source]
        source: ResolutionError,
    },

    /// A map listener could not be registered
    #[error("Failed to register subscription {subscription} on map {map}: {reason}")]
    Registration {
        subscription: Uuid,
        map: String,
        reason: String,
    },

    /// A synchronous callback returned an error
    #[error("Callback {callback} failed: {source}")]
    Delivery {
        callback: String,
        #[source]
        source: CallbackError,
    },

    /// The session named by a map notification does not exist
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// No handler variant exists for the category
    #[error("No handler for event category {0}")]
    UnsupportedCategory(EventCategory),
}

/// Type alias for Result with DispatchError
pub type DispatchResult<T> = Result<T, DispatchError>;
