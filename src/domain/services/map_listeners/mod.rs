//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// Map subscriptions become listeners on concrete maps once the map exists. The registrar
// looks up candidates in the subscription registry, resolves their criteria, checks scope
// and session, and attaches a listener with the composed delivery filter.
//
// | Component             | Description                                               |
// |-----------------------|-----------------------------------------------------------|
// | MapListener           | Delivers entry events of one subscription                 |
// | SessionLookup etc.    | Session / map collaborators, with in-memory versions      |
// | MapListenerRegistrar  | on_map_created and eager registration                     |
//--------------------------------------------------------------------------------------------------

mod grid;
mod listener;
mod registrar;

#[cfg(test)]
mod tests;

pub use grid::{GridError, GridResult, LocalMap, LocalSession, LocalSessions, NamedMap, Session, SessionLookup};
pub use listener::MapListener;
pub use registrar::{MapListenerRegistrar, RegistrationReport};
