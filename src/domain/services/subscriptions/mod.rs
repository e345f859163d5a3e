//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// Subscriptions describe what a callback wants to hear about. They are produced once from
// the callback's qualifiers, indexed by (service, map) for map events, and shared read-only
// afterwards.
//
// | Component            | Description                                                  |
// |----------------------|--------------------------------------------------------------|
// | Subscription         | Immutable descriptor plus memoized filter / transformer      |
// | QualifierResolver    | Qualifier tags -> Subscription                               |
// | SubscriptionRegistry | Wildcard-aware two-level index with a four-way lookup        |
//--------------------------------------------------------------------------------------------------

mod descriptor;
mod qualifiers;
mod registry;

#[cfg(test)]
mod tests;

pub use descriptor::Subscription;
pub use qualifiers::QualifierResolver;
pub use registry::SubscriptionRegistry;
