use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::domain::services::subscriptions::Subscription;

use super::{FilterResolver, MapEventTransformer, ResolutionResult, ResolvedFilter, TransformerResolver};

/// A write-once cell.
///
/// The value is computed outside the lock. When two threads race on the first
/// initialisation the first value stored wins and the loser's value is dropped.
/// A failed computation stores nothing, so a later call retries.
pub struct Memo<T> {
    cell: RwLock<Option<T>>,
}

impl<T: Clone> Memo<T> {
    pub fn new() -> Self {
        Self { cell: RwLock::new(None) }
    }

    pub fn get(&self) -> Option<T> {
        self.cell.read().clone()
    }

    pub fn is_set(&self) -> bool {
        self.cell.read().is_some()
    }

    pub fn get_or_try_init<E>(&self, init: impl FnOnce() -> Result<T, E>) -> Result<T, E> {
        if let Some(value) = self.get() {
            return Ok(value);
        }
        let value = init()?;
        let mut cell = self.cell.write();
        Ok(cell.get_or_insert(value).clone())
    }
}

impl<T: Clone> Default for Memo<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: fmt::Debug> fmt::Debug for Memo<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Memo").field(&*self.cell.read()).finish()
    }
}

/// Resolves and memoizes the subscription's filter.
///
/// # Returns
/// `Ok(None)` when the subscription declares no filter bindings; otherwise the
/// memoized filter. The resolver is only consulted while the memo is empty.
pub fn resolve_filter(
    subscription: &Subscription,
    resolver: &dyn FilterResolver,
) -> ResolutionResult<Option<ResolvedFilter>> {
    if subscription.filter_bindings().is_empty() {
        return Ok(None);
    }
    subscription
        .filter_memo()
        .get_or_try_init(|| {
            debug!(subscription = %subscription.id(), "Resolving filter bindings");
            resolver.resolve(subscription.filter_bindings())
        })
        .map(Some)
}

/// Resolves and memoizes the subscription's transformer. Transformer bindings take
/// precedence over extractor bindings.
pub fn resolve_transformer(
    subscription: &Subscription,
    resolver: &dyn TransformerResolver,
) -> ResolutionResult<Option<Arc<dyn MapEventTransformer>>> {
    let transformers = subscription.transformer_bindings();
    let extractors = subscription.extractor_bindings();
    if transformers.is_empty() && extractors.is_empty() {
        return Ok(None);
    }
    subscription
        .transformer_memo()
        .get_or_try_init(|| {
            debug!(subscription = %subscription.id(), "Resolving transformer bindings");
            if transformers.is_empty() {
                resolver.resolve_extractor(extractors)
            } else {
                resolver.resolve_transformer(transformers)
            }
        })
        .map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    use serde_json::json;

    use crate::domain::models::{Binding, CallbackRef, EventCategory, Qualifier};
    use crate::domain::services::criteria::{
        AlwaysFilter, ExtractorEventTransformer, MockFilterResolver, MockTransformerResolver,
        PropertyEqualsFilter, PropertyExtractor, ResolutionError,
    };
    use crate::domain::services::subscriptions::QualifierResolver;

    fn subscription(qualifiers: Vec<Qualifier>) -> Subscription {
        let callback = CallbackRef::from_fn("Listener", "on_change", |_| Ok(()));
        QualifierResolver::resolve(EventCategory::Map, &qualifiers, callback)
    }

    fn extractor() -> Arc<dyn MapEventTransformer> {
        Arc::new(ExtractorEventTransformer::new(PropertyExtractor::new("name")))
    }

    #[test]
    fn test_filter_resolved_once() {
        let sub = subscription(vec![Qualifier::Filter(Binding::new("always"))]);
        let mut resolver = MockFilterResolver::new();
        resolver
            .expect_resolve()
            .times(1)
            .returning(|_| Ok(ResolvedFilter::Value(Arc::new(AlwaysFilter))));

        assert!(resolve_filter(&sub, &resolver).unwrap().is_some());
        assert!(resolve_filter(&sub, &resolver).unwrap().is_some());
        assert!(sub.resolved_filter().is_some());
    }

    #[test]
    fn test_no_bindings_never_calls_resolver() {
        let sub = subscription(vec![]);
        let mut filters = MockFilterResolver::new();
        filters.expect_resolve().times(0);
        let mut transformers = MockTransformerResolver::new();
        transformers.expect_resolve_transformer().times(0);
        transformers.expect_resolve_extractor().times(0);

        assert!(resolve_filter(&sub, &filters).unwrap().is_none());
        assert!(resolve_transformer(&sub, &transformers).unwrap().is_none());
    }

    #[test]
    fn test_failed_resolution_is_retried() {
        let sub = subscription(vec![Qualifier::Filter(Binding::new("flaky"))]);
        let calls = AtomicUsize::new(0);
        let mut resolver = MockFilterResolver::new();
        resolver.expect_resolve().times(2).returning(move |_| {
            if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(ResolutionError::Failed("not yet".into()))
            } else {
                Ok(ResolvedFilter::Value(Arc::new(AlwaysFilter)))
            }
        });

        assert!(resolve_filter(&sub, &resolver).is_err());
        assert!(sub.resolved_filter().is_none());
        assert!(resolve_filter(&sub, &resolver).unwrap().is_some());
    }

    #[test]
    fn test_transformer_bindings_take_precedence() {
        let sub = subscription(vec![
            Qualifier::Extractor(Binding::with_value("property", "name")),
            Qualifier::Transformer(Binding::new("custom")),
        ]);
        let mut resolver = MockTransformerResolver::new();
        resolver.expect_resolve_transformer().times(1).returning(|_| Ok(extractor()));
        resolver.expect_resolve_extractor().times(0);

        assert!(resolve_transformer(&sub, &resolver).unwrap().is_some());
        assert!(resolve_transformer(&sub, &resolver).unwrap().is_some());
    }

    #[test]
    fn test_extractor_used_without_transformer() {
        let sub = subscription(vec![Qualifier::Extractor(Binding::with_value("property", "name"))]);
        let mut resolver = MockTransformerResolver::new();
        resolver.expect_resolve_transformer().times(0);
        resolver.expect_resolve_extractor().times(1).returning(|_| Ok(extractor()));

        assert!(resolve_transformer(&sub, &resolver).unwrap().is_some());
        assert!(sub.resolved_transformer().is_some());
    }

    struct Numbered(AtomicUsize);

    impl FilterResolver for Numbered {
        fn resolve(&self, _bindings: &[Binding]) -> ResolutionResult<ResolvedFilter> {
            let n = self.0.fetch_add(1, Ordering::SeqCst);
            thread::sleep(std::time::Duration::from_millis(5));
            Ok(ResolvedFilter::Value(Arc::new(PropertyEqualsFilter::new("n", json!(n)))))
        }
    }

    #[test]
    fn test_concurrent_first_use_keeps_one_value() {
        let sub = Arc::new(subscription(vec![Qualifier::Filter(Binding::new("numbered"))]));
        let resolver = Arc::new(Numbered(AtomicUsize::new(0)));

        let seen: Vec<String> = (0..8)
            .map(|_| {
                let sub = Arc::clone(&sub);
                let resolver = Arc::clone(&resolver);
                thread::spawn(move || {
                    let resolved = resolve_filter(&sub, resolver.as_ref()).unwrap().unwrap();
                    format!("{resolved:?}")
                })
            })
            .collect::<Vec<_>>()
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .collect();

        let kept = format!("{:?}", sub.resolved_filter().unwrap());
        assert!(seen.iter().all(|value| *value == kept));
    }
}
