use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::domain::models::{CallbackRef, EventType, GridEvent};

use super::{DispatchError, DispatchResult, TaskExecutor};

/// Where a callback runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryMode {
    /// On the thread that raised the event; callback errors reach the caller.
    Synchronous,
    /// On the executor; callback errors are only logged.
    Asynchronous,
}

impl DeliveryMode {
    /// Synchronous when the subscription asked for it or the event is a pre-event.
    pub fn for_event(synchronous: bool, event_type: EventType) -> Self {
        if synchronous || event_type.is_pre_event() {
            Self::Synchronous
        } else {
            Self::Asynchronous
        }
    }
}

/// Calls callbacks according to a [`DeliveryMode`].
#[derive(Clone)]
pub struct Invoker {
    executor: Arc<dyn TaskExecutor>,
}

impl Invoker {
    pub fn new(executor: Arc<dyn TaskExecutor>) -> Self {
        Self { executor }
    }

    pub fn executor(&self) -> &Arc<dyn TaskExecutor> {
        &self.executor
    }

    /// Delivers `event` to `callback`.
    ///
    /// # Returns
    /// The callback's error for synchronous delivery. Asynchronous delivery returns
    /// `Ok(())` as soon as the task is queued.
    pub fn invoke(&self, callback: &CallbackRef, event: GridEvent, mode: DeliveryMode) -> DispatchResult<()> {
        match mode {
            DeliveryMode::Synchronous => call(callback, &event),
            DeliveryMode::Asynchronous => {
                debug!(callback = %callback, event_type = %event.event_type(), "Queueing delivery");
                let callback = callback.clone();
                self.executor.submit(Box::new(move || call(&callback, &event)));
                Ok(())
            }
        }
    }
}

fn call(callback: &CallbackRef, event: &GridEvent) -> DispatchResult<()> {
    callback.notify(event).map_err(|source| DispatchError::Delivery {
        callback: callback.id(),
        source,
    })
}

impl fmt::Debug for Invoker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Invoker").finish_non_exhaustive()
    }
}
