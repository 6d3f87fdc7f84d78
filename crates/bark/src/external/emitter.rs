//! ExternalEmitter — the emitter/bond API over an [`EventSource`].
//!
//! Registrations without a scope (or scoped to the source itself) hand the
//! caller's listener straight to the source, so the source's own
//! identity-based duplicate suppression applies. Any other scope needs a
//! scope-binding adapter, and because the source can only unsubscribe the
//! exact listener it was given, the emitter keeps every live bond in a list
//! keyed on {event type, listener, scope} that remembers what was actually
//! subscribed.

use std::fmt;
use std::sync::{Arc, OnceLock, Weak};

use parking_lot::Mutex;

use crate::bond::{Bond, NullBond, Owner, Registrar};
use crate::emitter::RemoveChain;
use crate::types::{Listener, Scope};

use super::EventSource;

// ============================================================================
// ExternalBond
// ============================================================================

struct Subscription<A> {
    listener: Listener<A>,
    /// What the source actually holds: `listener` itself or its adapter.
    subscribed: Listener<A>,
    /// Self-removing listener subscribed by `destroy_on_use`.
    sentinel: Option<Listener<A>>,
}

struct ExternalCore<A> {
    event_type: String,
    /// `Some` only for registrations that went through an adapter.
    scope: Option<Scope>,
    /// `None` once destroyed.
    subscription: Mutex<Option<Subscription<A>>>,
    source: Arc<dyn EventSource<A>>,
    owner: Owner<A>,
    emitter: Weak<ExternalShared<A>>,
}

impl<A> ExternalCore<A> {
    fn matches(&self, event_type: &str, listener: &Listener<A>, scope: Option<&Scope>) -> bool {
        let same_scope = match (&self.scope, scope) {
            (None, None) => true,
            (Some(own), Some(scope)) => own.ptr_eq(scope),
            _ => false,
        };
        self.event_type == event_type
            && same_scope
            && self
                .subscription
                .lock()
                .as_ref()
                .is_some_and(|sub| sub.listener.ptr_eq(listener))
    }

    fn is_live(&self) -> bool {
        self.subscription.lock().is_some()
    }

    fn destroy(&self) {
        let Some(subscription) = self.subscription.lock().take() else {
            return;
        };
        self.source
            .unsubscribe(&self.event_type, &subscription.subscribed);
        if let Some(sentinel) = &subscription.sentinel {
            self.source.unsubscribe(&self.event_type, sentinel);
        }
        if let Some(emitter) = self.emitter.upgrade() {
            emitter.forget(self);
        }
        tracing::trace!(event_type = %self.event_type, "external bond destroyed");
    }
}

impl<A: 'static> ExternalCore<A> {
    fn destroy_on_use(self: &Arc<Self>) {
        let sentinel = {
            let mut guard = self.subscription.lock();
            let Some(subscription) = guard.as_mut() else {
                return;
            };
            if subscription.sentinel.is_some() {
                return;
            }
            let core = Arc::downgrade(self);
            let sentinel = Listener::new(move |_, _| {
                if let Some(core) = core.upgrade() {
                    core.destroy();
                }
            });
            subscription.sentinel = Some(sentinel.clone());
            sentinel
        };
        self.source.subscribe(&self.event_type, sentinel.clone());
        // Destroyed while `subscribe` ran, e.g. the source dispatched
        // synchronously and the sentinel fired; take it back out.
        if !self.is_live() {
            self.source.unsubscribe(&self.event_type, &sentinel);
        }
    }
}

/// The bond for a listener registered through an [`ExternalEmitter`].
pub struct ExternalBond<A> {
    core: Arc<ExternalCore<A>>,
}

impl<A> ExternalBond<A> {
    pub fn event_type(&self) -> &str {
        &self.core.event_type
    }

    pub fn is_destroyed(&self) -> bool {
        !self.core.is_live()
    }

    pub(crate) fn destroy(&self) {
        self.core.destroy();
    }

    pub(crate) fn owner(&self) -> &Owner<A> {
        &self.core.owner
    }

    pub(crate) fn ptr_eq(&self, other: &ExternalBond<A>) -> bool {
        Arc::ptr_eq(&self.core, &other.core)
    }
}

impl<A: 'static> ExternalBond<A> {
    pub(crate) fn destroy_on_use(&self) {
        self.core.destroy_on_use();
    }
}

impl<A> Clone for ExternalBond<A> {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
        }
    }
}

impl<A> fmt::Debug for ExternalBond<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ExternalBond(destroyed={})", self.is_destroyed())
    }
}

// ============================================================================
// Shared state
// ============================================================================

struct ExternalShared<A> {
    source: Arc<dyn EventSource<A>>,
    /// The source itself, as a scope.
    target_scope: Scope,
    /// Live bonds, in registration order.
    registrations: Mutex<Vec<ExternalBond<A>>>,
    null_bond: OnceLock<NullBond<A>>,
    this: Weak<ExternalShared<A>>,
}

impl<A> ExternalShared<A> {
    /// Scopes equal to the source are the same as no scope at all.
    fn explicit<'s>(&self, scope: Option<&'s Scope>) -> Option<&'s Scope> {
        scope.filter(|scope| !scope.ptr_eq(&self.target_scope))
    }

    fn forget(&self, core: &ExternalCore<A>) {
        self.registrations
            .lock()
            .retain(|bond| !std::ptr::eq(Arc::as_ptr(&bond.core), core));
    }

    fn unregister(&self, event_type: &str, listener: &Listener<A>, scope: Option<&Scope>) {
        let scope = self.explicit(scope);
        let removed = {
            let mut registrations = self.registrations.lock();
            registrations
                .iter()
                .position(|bond| bond.core.matches(event_type, listener, scope))
                .map(|index| registrations.remove(index))
        };
        match removed {
            Some(bond) => {
                bond.destroy();
                tracing::trace!(%event_type, "listener removed");
            }
            // Not ours, but the source may still know it by identity.
            None if scope.is_none() => self.source.unsubscribe(event_type, listener),
            None => {}
        }
    }
}

impl<A: 'static> ExternalShared<A> {
    fn owner(&self) -> Owner<A> {
        let owner: Owner<A> = self.this.clone();
        owner
    }

    fn bond(
        &self,
        event_type: &str,
        scope: Option<Scope>,
        listener: Listener<A>,
        subscribed: Listener<A>,
    ) -> ExternalBond<A> {
        ExternalBond {
            core: Arc::new(ExternalCore {
                event_type: event_type.to_owned(),
                scope,
                subscription: Mutex::new(Some(Subscription {
                    listener,
                    subscribed,
                    sentinel: None,
                })),
                source: Arc::clone(&self.source),
                owner: self.owner(),
                emitter: self.this.clone(),
            }),
        }
    }
}

impl<A: 'static> Registrar<A> for ExternalShared<A> {
    fn register(
        &self,
        event_type: &str,
        listener: Option<Listener<A>>,
        scope: Option<Scope>,
    ) -> Bond<A> {
        let Some(listener) = listener else {
            tracing::debug!(%event_type, "null listener; returning null bond");
            let null = self
                .null_bond
                .get_or_init(|| NullBond::new(self.owner()))
                .clone();
            return Bond::Null(null);
        };

        let scope = self.explicit(scope.as_ref()).cloned();

        let (bond, subscribed) = {
            let mut registrations = self.registrations.lock();
            let existing = registrations
                .iter()
                .find(|bond| bond.core.matches(event_type, &listener, scope.as_ref()))
                .cloned();
            if let Some(existing) = existing {
                tracing::trace!(%event_type, "duplicate registration; returning existing bond");
                // The source may have dropped an unscoped listener behind this
                // emitter's back (another emitter removed it), so hand it over
                // again and let the source's own identity check dedupe it.
                if scope.is_some() {
                    return Bond::External(existing);
                }
                (existing, listener.clone())
            } else {
                let subscribed = match &scope {
                    Some(scope) => listener.bind(scope.clone()),
                    None => listener.clone(),
                };
                let bond = self.bond(event_type, scope, listener, subscribed.clone());
                registrations.push(bond.clone());
                (bond, subscribed)
            }
        };
        self.source.subscribe(event_type, subscribed);
        tracing::trace!(
            %event_type,
            adapted = bond.core.scope.is_some(),
            "listener subscribed"
        );
        Bond::External(bond)
    }
}

// ============================================================================
// ExternalEmitter
// ============================================================================

/// A wrapper around an external [`EventSource`] offering the same
/// registration and bond API as [`Emitter`](crate::Emitter).
///
/// It has no `emit`: the source dispatches on its own.
pub struct ExternalEmitter<A> {
    shared: Arc<ExternalShared<A>>,
}

impl<A: 'static> ExternalEmitter<A> {
    pub fn new<S: EventSource<A> + 'static>(target: Arc<S>) -> Self {
        let target_scope = Scope::from_arc(Arc::clone(&target));
        let source: Arc<dyn EventSource<A>> = target;
        let shared = Arc::new_cyclic(|this: &Weak<ExternalShared<A>>| ExternalShared {
            source,
            target_scope,
            registrations: Mutex::new(Vec::new()),
            null_bond: OnceLock::new(),
            this: this.clone(),
        });
        Self { shared }
    }

    /// Subscribe `listener` to the source for `event_type`, as is.
    pub fn add(&self, event_type: &str, listener: impl Into<Option<Listener<A>>>) -> Bond<A> {
        self.shared.register(event_type, listener.into(), None)
    }

    /// Subscribe `listener` so that it is called with `scope`.
    pub fn add_with_scope(
        &self,
        event_type: &str,
        listener: impl Into<Option<Listener<A>>>,
        scope: Scope,
    ) -> Bond<A> {
        self.shared.register(event_type, listener.into(), Some(scope))
    }

    pub fn remove(&self, event_type: &str, listener: &Listener<A>) -> RemoveChain<'_, Self> {
        self.shared.unregister(event_type, listener, None);
        RemoveChain { target: self }
    }

    pub fn remove_with_scope(
        &self,
        event_type: &str,
        listener: &Listener<A>,
        scope: &Scope,
    ) -> RemoveChain<'_, Self> {
        self.shared.unregister(event_type, listener, Some(scope));
        RemoveChain { target: self }
    }
}

impl<A> ExternalEmitter<A> {
    /// The source as a scope: what unscoped listeners are called with.
    pub fn target_scope(&self) -> &Scope {
        &self.shared.target_scope
    }

    /// Number of live registrations made through this emitter.
    pub fn registration_count(&self) -> usize {
        self.shared.registrations.lock().len()
    }
}

impl<A> Clone for ExternalEmitter<A> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<A> fmt::Debug for ExternalEmitter<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExternalEmitter")
            .field("target_scope", &self.shared.target_scope)
            .field("registrations", &self.registration_count())
            .finish()
    }
}

impl<'a, A: 'static> RemoveChain<'a, ExternalEmitter<A>> {
    pub fn remove(
        self,
        event_type: &str,
        listener: &Listener<A>,
    ) -> RemoveChain<'a, ExternalEmitter<A>> {
        self.target.remove(event_type, listener)
    }

    pub fn remove_with_scope(
        self,
        event_type: &str,
        listener: &Listener<A>,
        scope: &Scope,
    ) -> RemoveChain<'a, ExternalEmitter<A>> {
        self.target.remove_with_scope(event_type, listener, scope)
    }
}
