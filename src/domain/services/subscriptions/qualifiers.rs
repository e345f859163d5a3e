use tracing::debug;

use crate::domain::models::{Binding, CallbackRef, EventCategory, NamePattern, Qualifier};

use super::Subscription;

/// Turns the qualifier tags declared on a callback into a [`Subscription`].
///
/// Tags are applied in declaration order, so when two tags set the same field the
/// last one wins. `CacheName` and `MapName` set the same field. Event tags that do
/// not belong to the category, and unknown tags, are ignored.
pub struct QualifierResolver;

impl QualifierResolver {
    pub fn resolve(category: EventCategory, qualifiers: &[Qualifier], callback: CallbackRef) -> Subscription {
        let mut subscription = Subscription::new(callback, category);

        for qualifier in qualifiers {
            match qualifier {
                Qualifier::CacheName(name) | Qualifier::MapName(name) => {
                    subscription.map_name = NamePattern::new(name.as_str());
                }
                Qualifier::ServiceName(name) => {
                    subscription.service_name = NamePattern::new(name.as_str());
                }
                Qualifier::ScopeName(name) => subscription.scope_name = non_empty(name),
                Qualifier::SessionName(name) => subscription.session_name = non_empty(name),
                Qualifier::Name(name) if category == EventCategory::SessionLifecycle => {
                    subscription.session_name = non_empty(name);
                }
                Qualifier::Name(name) => subscription.name = non_empty(name),
                Qualifier::ParticipantName(name) => subscription.participant_name = non_empty(name),
                Qualifier::Processor(name) => subscription.processor = non_empty(name),
                Qualifier::Synchronous => subscription.synchronous = true,
                Qualifier::Lite => subscription.lite = true,
                Qualifier::On(tag) => match category.event_type_for(*tag) {
                    Some(event_type) => {
                        subscription.event_types.insert(event_type);
                    }
                    None => debug!(?tag, %category, "Ignoring event tag outside category"),
                },
                Qualifier::Filter(binding) => push_unique(&mut subscription.filter_bindings, binding),
                Qualifier::Transformer(binding) => {
                    push_unique(&mut subscription.transformer_bindings, binding)
                }
                Qualifier::Extractor(binding) => push_unique(&mut subscription.extractor_bindings, binding),
                Qualifier::Other(tag) => debug!(tag = %tag, "Ignoring unknown qualifier"),
            }
        }

        debug!(
            subscription = %subscription.id,
            callback = %subscription.callback,
            %category,
            service = %subscription.service_name,
            map = %subscription.map_name,
            "Resolved subscription"
        );
        subscription
    }
}

fn non_empty(name: &str) -> Option<String> {
    (!name.is_empty()).then(|| name.to_string())
}

fn push_unique(bindings: &mut Vec<Binding>, binding: &Binding) {
    if !bindings.contains(binding) {
        bindings.push(binding.clone());
    }
}
