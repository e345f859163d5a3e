use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use uuid::Uuid;

use crate::domain::models::{Binding, CallbackRef, DispatchKey, EventCategory, EventType, NamePattern};
use crate::domain::services::criteria::{MapEventTransformer, Memo, ResolvedFilter};

/// Everything a callback declared about the events it wants.
///
/// All fields are fixed at construction. The only interior mutability is the pair of
/// memo cells holding the lazily resolved filter and transformer.
#[derive(Debug)]
pub struct Subscription {
    pub(super) id: Uuid,
    pub(super) callback: CallbackRef,
    pub(super) category: EventCategory,
    pub(super) map_name: NamePattern,
    pub(super) service_name: NamePattern,
    pub(super) scope_name: Option<String>,
    pub(super) session_name: Option<String>,
    pub(super) name: Option<String>,
    pub(super) participant_name: Option<String>,
    pub(super) processor: Option<String>,
    /// Empty means every event type of the category
    pub(super) event_types: BTreeSet<EventType>,
    pub(super) lite: bool,
    pub(super) synchronous: bool,
    pub(super) filter_bindings: Vec<Binding>,
    pub(super) transformer_bindings: Vec<Binding>,
    pub(super) extractor_bindings: Vec<Binding>,
    pub(super) filter: Memo<ResolvedFilter>,
    pub(super) transformer: Memo<Arc<dyn MapEventTransformer>>,
}

impl Subscription {
    pub(super) fn new(callback: CallbackRef, category: EventCategory) -> Self {
        Self {
            id: Uuid::new_v4(),
            callback,
            category,
            map_name: NamePattern::Any,
            service_name: NamePattern::Any,
            scope_name: None,
            session_name: None,
            name: None,
            participant_name: None,
            processor: None,
            event_types: BTreeSet::new(),
            lite: false,
            synchronous: false,
            filter_bindings: Vec::new(),
            transformer_bindings: Vec::new(),
            extractor_bindings: Vec::new(),
            filter: Memo::new(),
            transformer: Memo::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn callback(&self) -> &CallbackRef {
        &self.callback
    }

    pub fn category(&self) -> EventCategory {
        self.category
    }

    pub fn map_name(&self) -> &NamePattern {
        &self.map_name
    }

    pub fn service_name(&self) -> &NamePattern {
        &self.service_name
    }

    pub fn dispatch_key(&self) -> DispatchKey {
        DispatchKey::new(self.service_name.clone(), self.map_name.clone())
    }

    pub fn scope_name(&self) -> Option<&str> {
        self.scope_name.as_deref()
    }

    pub fn session_name(&self) -> Option<&str> {
        self.session_name.as_deref()
    }

    /// Grid or session instance name for lifecycle subscriptions.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn participant_name(&self) -> Option<&str> {
        self.participant_name.as_deref()
    }

    pub fn processor(&self) -> Option<&str> {
        self.processor.as_deref()
    }

    /// The declared event types. Empty means every type of the category.
    pub fn event_types(&self) -> &BTreeSet<EventType> {
        &self.event_types
    }

    /// The event types to register for: the declared set, or the whole category when
    /// nothing was declared.
    pub fn registration_types(&self) -> BTreeSet<EventType> {
        if self.event_types.is_empty() {
            self.category.all_event_types()
        } else {
            self.event_types.clone()
        }
    }

    pub fn accepts(&self, event_type: EventType) -> bool {
        if self.event_types.is_empty() {
            event_type.category() == self.category
        } else {
            self.event_types.contains(&event_type)
        }
    }

    pub fn is_lite(&self) -> bool {
        self.lite
    }

    pub fn is_synchronous(&self) -> bool {
        self.synchronous
    }

    pub fn filter_bindings(&self) -> &[Binding] {
        &self.filter_bindings
    }

    pub fn transformer_bindings(&self) -> &[Binding] {
        &self.transformer_bindings
    }

    pub fn extractor_bindings(&self) -> &[Binding] {
        &self.extractor_bindings
    }

    /// The memoized filter, if it has been resolved.
    pub fn resolved_filter(&self) -> Option<ResolvedFilter> {
        self.filter.get()
    }

    /// The memoized transformer, if it has been resolved.
    pub fn resolved_transformer(&self) -> Option<Arc<dyn MapEventTransformer>> {
        self.transformer.get()
    }

    pub(crate) fn filter_memo(&self) -> &Memo<ResolvedFilter> {
        &self.filter
    }

    pub(crate) fn transformer_memo(&self) -> &Memo<Arc<dyn MapEventTransformer>> {
        &self.transformer
    }
}

impl PartialEq for Subscription {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Subscription {}

impl fmt::Display for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{} on {}/{}]",
            self.callback, self.category, self.service_name, self.map_name
        )
    }
}
