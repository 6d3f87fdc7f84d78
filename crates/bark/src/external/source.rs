use crate::types::Listener;

/// An event source outside this crate, such as a UI element's native event
/// target, that [`ExternalEmitter`](super::ExternalEmitter) registers on.
///
/// The source owns dispatch. It is expected to behave like a DOM event
/// target:
///
/// - Call subscribed listeners with its own scope, the one built from the
///   `Arc` handed to `ExternalEmitter::new`.
/// - Ignore a `subscribe` for a listener that is already subscribed to that
///   event type (identity, see [`Listener::ptr_eq`]).
/// - Remove only by identity in `unsubscribe`, and ignore unknown listeners.
/// - Not hold internal locks while a listener runs, since listeners may
///   subscribe or unsubscribe from inside a dispatch.
pub trait EventSource<A>: Send + Sync {
    fn subscribe(&self, event_type: &str, listener: Listener<A>);

    fn unsubscribe(&self, event_type: &str, listener: &Listener<A>);
}
