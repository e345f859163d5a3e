use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::domain::models::{GridEvent, MapEvent};
use crate::domain::services::dispatch::{DeliveryMode, DispatchResult, Invoker};
use crate::domain::services::subscriptions::Subscription;

/// Adapts a map subscription to a map's listener interface.
pub struct MapListener {
    subscription: Arc<Subscription>,
    invoker: Invoker,
}

impl MapListener {
    pub fn new(subscription: Arc<Subscription>, invoker: Invoker) -> Self {
        Self { subscription, invoker }
    }

    pub fn subscription(&self) -> &Arc<Subscription> {
        &self.subscription
    }

    pub fn is_synchronous(&self) -> bool {
        self.subscription.is_synchronous()
    }

    /// Delivers an entry change, dropping event types the subscription did not ask for.
    pub fn on_map_event(&self, event: MapEvent) -> DispatchResult<()> {
        if !self.subscription.accepts(event.event_type) {
            debug!(
                subscription = %self.subscription.id(),
                event_type = %event.event_type,
                "Event type not subscribed"
            );
            return Ok(());
        }
        let mode = DeliveryMode::for_event(self.subscription.is_synchronous(), event.event_type);
        self.invoker
            .invoke(self.subscription.callback(), GridEvent::Map(event), mode)
    }
}

impl fmt::Debug for MapListener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapListener")
            .field("subscription", &self.subscription.id())
            .field("callback", self.subscription.callback())
            .finish()
    }
}
