use serde::Serialize;

use crate::types::RequestId;

use super::PropertyEntry;

/// The lifecycle state of a single cached property.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum PropertyState {
    /// The cached value (if any) is stale and has to be reloaded.
    #[default]
    Invalidated,
    /// A load for the property is in flight.
    Loading,
    /// The cached value is the result of the latest request.
    Fulfilled,
}

/// One cached property.
///
/// When `state` is [`Fulfilled`](PropertyState::Fulfilled), `value` holds the result of request
/// `request_id`, which was the highest request touching this property when it was written.
#[derive(Debug, Clone)]
pub(crate) struct PropertySlot<V> {
    pub value: Option<PropertyEntry<V>>,
    pub request_id: RequestId,
    pub state: PropertyState,
}

// Not derived, as that would require `V: Default`.
impl<V> Default for PropertySlot<V> {
    fn default() -> Self {
        Self {
            value: None,
            request_id: RequestId::ZERO,
            state: PropertyState::Invalidated,
        }
    }
}
