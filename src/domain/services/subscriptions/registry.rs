//--------------------------------------------------------------------------------------------------
// STRUCTS
//--------------------------------------------------------------------------------------------------
// | Name                 | Description                                       | Key Methods       |
// |----------------------|---------------------------------------------------|-------------------|
// | SubscriptionRegistry | service -> (map -> subscriptions) index           | insert, lookup    |
// |                      |                                                   | all_concrete      |
//--------------------------------------------------------------------------------------------------

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::debug;

use crate::domain::models::{DispatchKey, NamePattern};

use super::Subscription;

/// Index of map subscriptions by `(service, map)`.
///
/// Built once during discovery (insert only) and then shared read-only. Lookups
/// never fail; no match is an empty result.
#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    buckets: HashMap<NamePattern, HashMap<NamePattern, Vec<Arc<Subscription>>>>,
    len: usize,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a registry holding every given subscription.
    pub fn build(subscriptions: impl IntoIterator<Item = Arc<Subscription>>) -> Self {
        let mut registry = Self::new();
        for subscription in subscriptions {
            registry.insert(subscription);
        }
        debug!(subscriptions = registry.len, "Built subscription registry");
        registry
    }

    /// Appends the subscription to the bucket for its `(service, map)` key.
    pub fn insert(&mut self, subscription: Arc<Subscription>) {
        self.buckets
            .entry(subscription.service_name().clone())
            .or_default()
            .entry(subscription.map_name().clone())
            .or_default()
            .push(subscription);
        self.len += 1;
    }

    /// Every subscription interested in the concrete `(service, map)` pair: the union
    /// of the `(*, *)`, `(*, map)`, `(service, *)` and `(service, map)` buckets.
    ///
    /// Each subscription appears once. Callers must not rely on the order.
    pub fn lookup(&self, service: &str, map: &str) -> Vec<Arc<Subscription>> {
        let mut seen = HashSet::new();
        let matches: Vec<_> = DispatchKey::candidates(service, map)
            .iter()
            .filter_map(|key| self.bucket(key))
            .flatten()
            .filter(|subscription| seen.insert(subscription.id()))
            .cloned()
            .collect();
        debug!(service, map, matches = matches.len(), "Subscription lookup");
        matches
    }

    /// Every subscription naming a concrete map and a session, ordered by
    /// `(session, map, service)`.
    pub fn all_concrete(&self) -> Vec<Arc<Subscription>> {
        let mut concrete: Vec<_> = self
            .buckets
            .values()
            .flat_map(HashMap::values)
            .flatten()
            .filter(|s| !s.map_name().is_wildcard() && s.session_name().is_some())
            .cloned()
            .collect();
        concrete.sort_by(|a, b| {
            (a.session_name(), a.map_name(), a.service_name())
                .cmp(&(b.session_name(), b.map_name(), b.service_name()))
        });
        concrete
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn bucket(&self, key: &DispatchKey) -> Option<&Vec<Arc<Subscription>>> {
        self.buckets.get(&key.service)?.get(&key.map)
    }
}
