//--------------------------------------------------------------------------------------------------
// STRUCTS & TRAITS
//--------------------------------------------------------------------------------------------------
// | Name              | Description                                       | Key Methods       |
// |-------------------|---------------------------------------------------|-------------------|
// | Observer          | Target of a subscription                          | notify            |
// | FnObserver        | Observer backed by a closure                      | new               |
// | CallbackRef       | Identity plus invocation target                   | id, notify        |
// | CallbackCandidate | One callback produced by discovery                | event_category    |
// | CallbackError     | Error returned by a callback                      |                   |
//--------------------------------------------------------------------------------------------------

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use super::events::GridEvent;
use super::types::{EventCategory, Qualifier};

/// Error raised by an observer callback.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct CallbackError(pub String);

impl CallbackError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl From<anyhow::Error> for CallbackError {
    fn from(err: anyhow::Error) -> Self {
        Self(format!("{err:#}"))
    }
}

/// Something that wants to be told about grid events.
pub trait Observer: Send + Sync {
    fn notify(&self, event: &GridEvent) -> Result<(), CallbackError>;
}

/// Adapts a closure into an [`Observer`].
pub struct FnObserver<F>(F);

impl<F> FnObserver<F>
where
    F: Fn(&GridEvent) -> Result<(), CallbackError> + Send + Sync + 'static,
{
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F> Observer for FnObserver<F>
where
    F: Fn(&GridEvent) -> Result<(), CallbackError> + Send + Sync,
{
    fn notify(&self, event: &GridEvent) -> Result<(), CallbackError> {
        (self.0)(event)
    }
}

/// Opaque reference to a callback: who owns it, which method it is, and how to call it.
#[derive(Clone)]
pub struct CallbackRef {
    owner: String,
    method: String,
    target: Arc<dyn Observer>,
}

impl CallbackRef {
    pub fn new(owner: impl Into<String>, method: impl Into<String>, target: Arc<dyn Observer>) -> Self {
        Self {
            owner: owner.into(),
            method: method.into(),
            target,
        }
    }

    /// Convenience constructor wrapping a closure.
    pub fn from_fn<F>(owner: impl Into<String>, method: impl Into<String>, f: F) -> Self
    where
        F: Fn(&GridEvent) -> Result<(), CallbackError> + Send + Sync + 'static,
    {
        Self::new(owner, method, Arc::new(FnObserver::new(f)))
    }

    /// Stable identifier, `owner::method`.
    pub fn id(&self) -> String {
        format!("{}::{}", self.owner, self.method)
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn notify(&self, event: &GridEvent) -> Result<(), CallbackError> {
        self.target.notify(event)
    }
}

impl fmt::Debug for CallbackRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackRef")
            .field("owner", &self.owner)
            .field("method", &self.method)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for CallbackRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.owner, self.method)
    }
}

/// Declared type of one callback parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParameterKind {
    /// An entry-changed map event.
    MapEvent,
    /// A live event of the given category.
    Event(EventCategory),
    /// Anything else, by type name.
    Other(String),
}

/// A callback found by discovery, before validation.
#[derive(Clone)]
pub struct CallbackCandidate {
    pub callback: CallbackRef,
    pub parameters: Vec<ParameterKind>,
    pub qualifiers: Vec<Qualifier>,
}

impl CallbackCandidate {
    pub fn new(callback: CallbackRef, parameters: Vec<ParameterKind>, qualifiers: Vec<Qualifier>) -> Self {
        Self {
            callback,
            parameters,
            qualifiers,
        }
    }

    /// Candidate taking exactly one argument of the given category.
    pub fn for_category(callback: CallbackRef, category: EventCategory, qualifiers: Vec<Qualifier>) -> Self {
        let parameter = match category {
            EventCategory::Map => ParameterKind::MapEvent,
            other => ParameterKind::Event(other),
        };
        Self::new(callback, vec![parameter], qualifiers)
    }

    /// The event category this callback receives, or `None` when its signature is
    /// not a single map-event or live-event argument.
    pub fn event_category(&self) -> Option<EventCategory> {
        match self.parameters.as_slice() {
            [ParameterKind::MapEvent] => Some(EventCategory::Map),
            [ParameterKind::Event(EventCategory::Map)] => Some(EventCategory::Map),
            [ParameterKind::Event(category)] => Some(*category),
            _ => None,
        }
    }
}

impl fmt::Debug for CallbackCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackCandidate")
            .field("callback", &self.callback)
            .field("parameters", &self.parameters)
            .field("qualifiers", &self.qualifiers)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop() -> CallbackRef {
        CallbackRef::from_fn("Owner", "method", |_| Ok(()))
    }

    #[test]
    fn test_callback_id() {
        assert_eq!(noop().id(), "Owner::method");
    }

    #[test]
    fn test_event_category_requires_single_event_argument() {
        let map = CallbackCandidate::new(noop(), vec![ParameterKind::MapEvent], vec![]);
        assert_eq!(map.event_category(), Some(EventCategory::Map));

        let transfer = CallbackCandidate::for_category(noop(), EventCategory::Transfer, vec![]);
        assert_eq!(transfer.event_category(), Some(EventCategory::Transfer));

        let none = CallbackCandidate::new(noop(), vec![], vec![]);
        assert_eq!(none.event_category(), None);

        let two = CallbackCandidate::new(
            noop(),
            vec![ParameterKind::MapEvent, ParameterKind::MapEvent],
            vec![],
        );
        assert_eq!(two.event_category(), None);

        let other = CallbackCandidate::new(noop(), vec![ParameterKind::Other("String".into())], vec![]);
        assert_eq!(other.event_category(), None);
    }
}
