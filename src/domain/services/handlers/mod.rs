//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// Live (non-map) events are delivered through handlers. A static table maps each event
// category to the scope variant that decides which sources a handler attaches to and
// which events it lets through.
//
// | Component         | Description                                                 |
// |-------------------|-------------------------------------------------------------|
// | EventSource       | Live dispatcher trait, plus an in-memory implementation     |
// | HandlerScope      | Lifecycle / cache / service / federation predicates         |
// | EventHandler      | Subscription + scope + invoker, registered on sources       |
// | DISPATCH_TABLE    | Category -> scope constructor                               |
// | build_handlers    | One handler per live-event subscription                     |
//--------------------------------------------------------------------------------------------------

mod handler;
mod scopes;
mod source;
mod table;


pub use handler::{EventHandler, HandlerCore};
pub use scopes::{
    CacheScope, FederationScope, HandlerScope, LifecycleKind, LifecycleScope, ParticipantExtractor, ServiceScope,
    event_participant,
};
pub use source::{EventSource, LocalEventSource, SourceKind};
pub use table::{DISPATCH_TABLE, HandlerConstructor, build_handler, build_handlers, constructor_for};
