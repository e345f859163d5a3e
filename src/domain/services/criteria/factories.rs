//--------------------------------------------------------------------------------------------------
// STRUCTS
//--------------------------------------------------------------------------------------------------
// | Name                       | Description                                  | Key Methods     |
// |----------------------------|----------------------------------------------|-----------------|
// | FactoryFilterResolver      | Named filter factories                       | register        |
// | FactoryTransformerResolver | Named transformer factories + extractors     | register        |
// | PropertyExtractor          | Dotted-path extraction from a JSON value     | extract         |
// | ExtractorEventTransformer  | Applies an extractor to old and new values   | transform       |
//--------------------------------------------------------------------------------------------------

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::domain::models::{Binding, MapEvent};

use super::filters::{AllFilter, AlwaysFilter, NeverFilter, PropertyEqualsFilter};
use super::{Filter, FilterResolver, MapEventTransformer, ResolutionError, ResolutionResult, ResolvedFilter, TransformerResolver};

/// Builds a filter from one binding.
pub type FilterFactory = Arc<dyn Fn(&Binding) -> ResolutionResult<Arc<dyn Filter>> + Send + Sync>;

/// Builds a transformer from one binding.
pub type TransformerFactory =
    Arc<dyn Fn(&Binding) -> ResolutionResult<Arc<dyn MapEventTransformer>> + Send + Sync>;

/// Filter resolver backed by a table of named factories.
///
/// No bindings resolve to [`AlwaysFilter`], a single binding to its filter, several
/// bindings to an [`AllFilter`] over all of them.
#[derive(Clone, Default)]
pub struct FactoryFilterResolver {
    factories: HashMap<String, FilterFactory>,
}

impl FactoryFilterResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolver pre-loaded with `always`, `never` and `property-equals`
    /// (`field=json-value`, the value falls back to a string when it is not JSON).
    pub fn with_defaults() -> Self {
        let mut resolver = Self::new();
        resolver.register("always", Arc::new(|_| Ok(Arc::new(AlwaysFilter) as Arc<dyn Filter>)));
        resolver.register("never", Arc::new(|_| Ok(Arc::new(NeverFilter) as Arc<dyn Filter>)));
        resolver.register("property-equals", Arc::new(property_equals));
        resolver
    }

    pub fn register(&mut self, name: impl Into<String>, factory: FilterFactory) {
        self.factories.insert(name.into(), factory);
    }
}

impl fmt::Debug for FactoryFilterResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.factories.keys().collect();
        names.sort();
        f.debug_struct("FactoryFilterResolver").field("factories", &names).finish()
    }
}

impl FilterResolver for FactoryFilterResolver {
    fn resolve(&self, bindings: &[Binding]) -> ResolutionResult<ResolvedFilter> {
        let mut filters = bindings
            .iter()
            .map(|binding| {
                let factory = self
                    .factories
                    .get(&binding.name)
                    .ok_or_else(|| ResolutionError::UnknownBinding(binding.to_string()))?;
                factory(binding)
            })
            .collect::<ResolutionResult<Vec<_>>>()?;

        debug!(count = filters.len(), "Resolved filter bindings");
        let filter: Arc<dyn Filter> = match filters.len() {
            0 => Arc::new(AlwaysFilter),
            1 => filters.remove(0),
            _ => Arc::new(AllFilter::new(filters)),
        };
        Ok(ResolvedFilter::Value(filter))
    }
}

fn property_equals(binding: &Binding) -> ResolutionResult<Arc<dyn Filter>> {
    let invalid = |reason: &str| ResolutionError::InvalidBinding {
        binding: binding.to_string(),
        reason: reason.to_string(),
    };
    let argument = binding.value.as_deref().ok_or_else(|| invalid("expected field=value"))?;
    let (field, raw) = argument.split_once('=').ok_or_else(|| invalid("expected field=value"))?;
    let field = field.trim();
    if field.is_empty() {
        return Err(invalid("empty field name"));
    }
    let raw = raw.trim();
    let expected = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    Ok(Arc::new(PropertyEqualsFilter::new(field, expected)))
}

/// Extracts a nested property from a JSON value by a dotted path (`"address.city"`).
/// Missing properties extract as `null`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyExtractor {
    path: Vec<String>,
}

impl PropertyExtractor {
    pub fn new(path: &str) -> Self {
        Self {
            path: path.split('.').map(str::to_string).collect(),
        }
    }

    /// Chains several extractors so each applies to the previous result.
    pub fn chain(extractors: impl IntoIterator<Item = PropertyExtractor>) -> Self {
        Self {
            path: extractors.into_iter().flat_map(|e| e.path).collect(),
        }
    }

    pub fn extract(&self, value: &Value) -> Value {
        self.path
            .iter()
            .try_fold(value, |current, segment| current.get(segment))
            .cloned()
            .unwrap_or(Value::Null)
    }
}

/// Replaces the old and new values of a map event with an extracted property.
#[derive(Debug, Clone)]
pub struct ExtractorEventTransformer {
    extractor: PropertyExtractor,
}

impl ExtractorEventTransformer {
    pub fn new(extractor: PropertyExtractor) -> Self {
        Self { extractor }
    }
}

impl MapEventTransformer for ExtractorEventTransformer {
    fn transform(&self, mut event: MapEvent) -> Option<MapEvent> {
        event.old_value = event.old_value.map(|v| self.extractor.extract(&v));
        event.new_value = event.new_value.map(|v| self.extractor.extract(&v));
        Some(event)
    }
}

/// Transformer resolver backed by a table of named factories. Extractor bindings are
/// `property` bindings whose value is a dotted path; several are chained in order.
#[derive(Clone, Default)]
pub struct FactoryTransformerResolver {
    factories: HashMap<String, TransformerFactory>,
}

impl FactoryTransformerResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, factory: TransformerFactory) {
        self.factories.insert(name.into(), factory);
    }
}

impl fmt::Debug for FactoryTransformerResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.factories.keys().collect();
        names.sort();
        f.debug_struct("FactoryTransformerResolver").field("factories", &names).finish()
    }
}

impl TransformerResolver for FactoryTransformerResolver {
    fn resolve_transformer(&self, bindings: &[Binding]) -> ResolutionResult<Arc<dyn MapEventTransformer>> {
        // The first transformer binding wins, as a listener can only carry one.
        let binding = bindings
            .first()
            .ok_or_else(|| ResolutionError::Failed("no transformer binding".to_string()))?;
        let factory = self
            .factories
            .get(&binding.name)
            .ok_or_else(|| ResolutionError::UnknownBinding(binding.to_string()))?;
        factory(binding)
    }

    fn resolve_extractor(&self, bindings: &[Binding]) -> ResolutionResult<Arc<dyn MapEventTransformer>> {
        if bindings.is_empty() {
            return Err(ResolutionError::Failed("no extractor binding".to_string()));
        }
        let extractors = bindings
            .iter()
            .map(|binding| match (binding.name.as_str(), binding.value.as_deref()) {
                ("property", Some(path)) if !path.is_empty() => Ok(PropertyExtractor::new(path)),
                ("property", _) => Err(ResolutionError::InvalidBinding {
                    binding: binding.to_string(),
                    reason: "expected a property path".to_string(),
                }),
                _ => Err(ResolutionError::UnknownBinding(binding.to_string())),
            })
            .collect::<ResolutionResult<Vec<_>>>()?;
        Ok(Arc::new(ExtractorEventTransformer::new(PropertyExtractor::chain(extractors))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn value_filter(resolved: ResolvedFilter) -> Arc<dyn Filter> {
        match resolved {
            ResolvedFilter::Value(filter) => filter,
            ResolvedFilter::Event(_) => panic!("expected a value filter"),
        }
    }

    #[test]
    fn test_no_bindings_resolve_to_always() {
        let filter = value_filter(FactoryFilterResolver::with_defaults().resolve(&[]).unwrap());
        assert!(filter.evaluate(&json!(null)));
    }

    #[test]
    fn test_property_equals_binding() {
        let resolver = FactoryFilterResolver::with_defaults();
        let filter = value_filter(
            resolver
                .resolve(&[Binding::with_value("property-equals", "status=\"open\"")])
                .unwrap(),
        );
        assert!(filter.evaluate(&json!({"status": "open"})));
        assert!(!filter.evaluate(&json!({"status": "closed"})));

        let bare = value_filter(
            resolver
                .resolve(&[Binding::with_value("property-equals", "status=open")])
                .unwrap(),
        );
        assert!(bare.evaluate(&json!({"status": "open"})));
    }

    #[test]
    fn test_several_bindings_are_combined() {
        let resolver = FactoryFilterResolver::with_defaults();
        let filter = value_filter(
            resolver
                .resolve(&[
                    Binding::with_value("property-equals", "a=1"),
                    Binding::with_value("property-equals", "b=2"),
                ])
                .unwrap(),
        );
        assert!(filter.evaluate(&json!({"a": 1, "b": 2})));
        assert!(!filter.evaluate(&json!({"a": 1, "b": 3})));
    }

    #[test]
    fn test_unknown_and_invalid_bindings() {
        let resolver = FactoryFilterResolver::with_defaults();
        assert!(matches!(
            resolver.resolve(&[Binding::new("where")]),
            Err(ResolutionError::UnknownBinding(_))
        ));
        assert!(matches!(
            resolver.resolve(&[Binding::new("property-equals")]),
            Err(ResolutionError::InvalidBinding { .. })
        ));
    }

    #[test]
    fn test_extractor_chain() {
        let resolver = FactoryTransformerResolver::new();
        let transformer = resolver
            .resolve_extractor(&[
                Binding::with_value("property", "address"),
                Binding::with_value("property", "city"),
            ])
            .unwrap();
        let event = MapEvent::inserted("m", "s", json!(1), json!({"address": {"city": "Lisbon"}}));
        let out = transformer.transform(event).unwrap();
        assert_eq!(out.new_value, Some(json!("Lisbon")));
    }

    #[test]
    fn test_missing_property_extracts_null() {
        assert_eq!(PropertyExtractor::new("a.b").extract(&json!({"a": {}})), Value::Null);
    }

    #[test]
    fn test_transformer_factory_lookup() {
        let mut resolver = FactoryTransformerResolver::new();
        resolver.register(
            "name-only",
            Arc::new(|_| {
                Ok(Arc::new(ExtractorEventTransformer::new(PropertyExtractor::new("name")))
                    as Arc<dyn MapEventTransformer>)
            }),
        );
        assert!(resolver.resolve_transformer(&[Binding::new("name-only")]).is_ok());
        assert!(matches!(
            resolver.resolve_transformer(&[Binding::new("missing")]),
            Err(ResolutionError::UnknownBinding(_))
        ));
    }
}
