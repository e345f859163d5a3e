//--------------------------------------------------------------------------------------------------
// STRUCTS
//--------------------------------------------------------------------------------------------------
// | Name         | Description                                           | Key Methods         |
// |--------------|-------------------------------------------------------|---------------------|
// | HandlerCore  | Subscription, scope constraint and registration types | in_scope            |
// | EventHandler | One live-event subscription attached to sources       | introduce_source    |
// |              |                                                       | on_event            |
//--------------------------------------------------------------------------------------------------

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use crate::domain::models::{EventCategory, EventType, GridEvent, LiveEvent};
use crate::domain::services::dispatch::{DeliveryMode, DispatchResult, Invoker};
use crate::domain::services::subscriptions::Subscription;

use super::scopes::HandlerScope;
use super::source::EventSource;

/// State shared by every handler variant.
#[derive(Debug)]
pub struct HandlerCore {
    subscription: Arc<Subscription>,
    types: BTreeSet<EventType>,
}

impl HandlerCore {
    pub fn new(subscription: Arc<Subscription>) -> Self {
        let types = subscription.registration_types();
        Self { subscription, types }
    }

    pub fn subscription(&self) -> &Arc<Subscription> {
        &self.subscription
    }

    pub fn scope_name(&self) -> Option<&str> {
        self.subscription.scope_name()
    }

    /// Declared event types, or every type of the category when none were declared.
    pub fn registration_types(&self) -> &BTreeSet<EventType> {
        &self.types
    }

    /// Passes when either side has no scope or both scopes are equal.
    pub fn in_scope(&self, event: &LiveEvent) -> bool {
        match (self.scope_name(), event.scope_name.as_deref()) {
            (Some(expected), Some(actual)) => expected == actual,
            _ => true,
        }
    }
}

/// Delivers live events of one category to one subscription's callback.
pub struct EventHandler {
    core: HandlerCore,
    scope: HandlerScope,
    invoker: Invoker,
    registrations: Mutex<Vec<Uuid>>,
}

impl EventHandler {
    pub fn new(subscription: Arc<Subscription>, scope: HandlerScope, invoker: Invoker) -> Self {
        Self {
            core: HandlerCore::new(subscription),
            scope,
            invoker,
            registrations: Mutex::new(Vec::new()),
        }
    }

    /// Interceptor id, the callback's `owner::method`.
    pub fn id(&self) -> String {
        self.core.subscription.callback().id()
    }

    pub fn subscription(&self) -> &Arc<Subscription> {
        self.core.subscription()
    }

    pub fn category(&self) -> EventCategory {
        self.core.subscription.category()
    }

    pub fn scope(&self) -> &HandlerScope {
        &self.scope
    }

    pub fn registration_types(&self) -> &BTreeSet<EventType> {
        self.core.registration_types()
    }

    pub fn is_applicable(&self, source: &dyn EventSource) -> bool {
        self.scope
            .is_applicable(self.core.scope_name(), self.core.registration_types(), source)
    }

    pub fn should_fire(&self, event: &LiveEvent) -> bool {
        self.scope.should_fire(event)
    }

    /// Offers a live source to this handler.
    ///
    /// # Returns
    /// `true` when the handler attached itself to the source. A source the handler
    /// is already attached to is not attached twice.
    pub fn introduce_source(self: &Arc<Self>, source: &dyn EventSource) -> bool {
        if !self.is_applicable(source) {
            debug!(handler = %self.id(), source = %source.id(), "Source not applicable");
            return false;
        }
        {
            let mut registrations = self.registrations.lock();
            if registrations.contains(&source.id()) {
                debug!(handler = %self.id(), source = %source.id(), "Already attached");
                return false;
            }
            registrations.push(source.id());
        }
        let types = self.core.registration_types().clone();
        info!(
            handler = %self.id(),
            source = %source.id(),
            category = %self.category(),
            types = types.len(),
            "Attached handler to source"
        );
        source.add_interceptor(&self.id(), Arc::clone(self), types);
        true
    }

    /// Sources this handler has attached to.
    pub fn registered_sources(&self) -> Vec<Uuid> {
        self.registrations.lock().clone()
    }

    /// Handles an event raised by an attached source.
    ///
    /// Synchronous subscriptions and pre-events run here and report callback errors.
    /// Other events are queued and this returns at once.
    pub fn on_event(&self, event: &LiveEvent) -> DispatchResult<()> {
        if !self.should_fire(event) {
            debug!(handler = %self.id(), event_type = %event.event_type, "Guard rejected event");
            return Ok(());
        }
        if !self.core.in_scope(event) {
            debug!(handler = %self.id(), scope = ?event.scope_name, "Event outside handler scope");
            return Ok(());
        }
        let mode = DeliveryMode::for_event(self.core.subscription.is_synchronous(), event.event_type);
        self.invoker
            .invoke(self.core.subscription.callback(), GridEvent::Live(event.clone()), mode)
    }
}

impl fmt::Debug for EventHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventHandler")
            .field("id", &self.id())
            .field("category", &self.category())
            .field("scope", &self.scope)
            .field("types", self.core.registration_types())
            .finish()
    }
}
