//! Emitter — named channels with synchronous, in-order notification.
//!
//! Each event type maps to a *bundle*: the bonds registered for it, in
//! registration order. Emission walks a snapshot of the bundle, which means:
//!   - A listener added *during* emission is NOT called until the next emit.
//!   - A listener removed *during* emission is still called in that round if
//!     it had not been reached yet; never again afterward.
//!   - A bond armed with `destroy_on_use` mid-emission fires once more (if it
//!     has not been reached) and is then gone.
//!
//! Panics inside a listener propagate to the caller and skip the rest of the
//! snapshot. [`Emitter::try_emit`] turns that panic into an [`EmitError`].
//!
//! All methods take `&self` and no lock is held while a listener runs, so
//! listeners may call `add`/`remove`/`emit`/`destroy` on the same emitter.
//!
//! None of `add`, `emit` or `remove` fail: unknown event types, null
//! listeners and unmatched removals all degrade to no-ops.

use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, OnceLock, Weak};

use parking_lot::Mutex;

use crate::bond::listener::{prune_if_empty, BondCore, Bundle, Bundles};
use crate::bond::{Bond, ListenerBond, NullBond, Owner, Registrar};
use crate::error::{panic_message, EmitError};
use crate::types::{EmitterOptions, Listener, Scope};

// ============================================================================
// Shared state
// ============================================================================

struct Shared<A> {
    default_scope: Scope,
    /// Entries whose bundle empties out are dropped again.
    bundles: Arc<Bundles<A>>,
    /// Created on the first null registration, then handed out every time.
    null_bond: OnceLock<NullBond<A>>,
    this: Weak<Shared<A>>,
}

impl<A: 'static> Shared<A> {
    fn owner(&self) -> Owner<A> {
        let owner: Owner<A> = self.this.clone();
        owner
    }

    fn null_bond(&self) -> NullBond<A> {
        self.null_bond
            .get_or_init(|| NullBond::new(self.owner()))
            .clone()
    }
}

impl<A> Shared<A> {
    fn bundle(&self, event_type: &str) -> Option<Arc<Bundle<A>>> {
        self.bundles.lock().get(event_type).cloned()
    }

    fn dispatch(&self, event_type: &str, args: &A) {
        let Some(bundle) = self.bundle(event_type) else {
            return;
        };
        // A lone bond is taken without building a snapshot vector.
        let (head, tail) = {
            let bonds = bundle.lock();
            let Some((first, rest)) = bonds.split_first() else {
                return;
            };
            (
                first.pending(),
                rest.iter().filter_map(BondCore::pending).collect::<Vec<_>>(),
            )
        };
        // Lock released: listeners may re-enter.
        tracing::trace!(
            %event_type,
            listeners = usize::from(head.is_some()) + tail.len(),
            "emitting"
        );
        for pending in head.into_iter().chain(tail) {
            pending.invoke(args);
        }
    }

    fn unregister(&self, event_type: &str, listener: &Listener<A>, scope: Option<&Scope>) {
        let scope = scope.unwrap_or(&self.default_scope);
        let Some(bundle) = self.bundle(event_type) else {
            return;
        };
        let removed = {
            let mut bonds = bundle.lock();
            bonds
                .iter()
                .position(|bond| bond.matches(listener, scope))
                .map(|index| bonds.remove(index))
        };
        // Duplicates are refused at registration, so one match is all there is.
        if let Some(bond) = removed {
            bond.tear_down();
            prune_if_empty(&self.bundles, event_type, &bundle);
            tracing::trace!(%event_type, "listener removed");
        }
    }
}

impl<A: 'static> Registrar<A> for Shared<A> {
    fn register(
        &self,
        event_type: &str,
        listener: Option<Listener<A>>,
        scope: Option<Scope>,
    ) -> Bond<A> {
        let Some(listener) = listener else {
            tracing::debug!(%event_type, "null listener; returning null bond");
            return Bond::Null(self.null_bond());
        };
        let scope = scope.unwrap_or_else(|| self.default_scope.clone());
        // The map stays locked until the bond is in its bundle, so an empty
        // bundle cannot be pruned out from under this registration.
        let mut bundles = self.bundles.lock();
        let bundle = Arc::clone(bundles.entry(event_type.to_owned()).or_default());

        let mut bonds = bundle.lock();
        if let Some(existing) = bonds.iter().find(|bond| bond.matches(&listener, &scope)) {
            tracing::trace!(%event_type, "duplicate registration; returning existing bond");
            return Bond::Listener(ListenerBond::from_core(Arc::clone(existing)));
        }
        let core = BondCore::new(
            event_type,
            listener,
            scope,
            Arc::downgrade(&bundle),
            Arc::downgrade(&self.bundles),
            self.owner(),
        );
        bonds.push(Arc::clone(&core));
        tracing::trace!(%event_type, listeners = bonds.len(), "listener added");
        drop(bonds);
        drop(bundles);
        Bond::Listener(ListenerBond::from_core(core))
    }
}

// ============================================================================
// EmitterRef
// ============================================================================

/// The value behind an emitter's own default scope.
///
/// Listeners registered without a scope are called with
/// [`Emitter::default_scope`]; downcast it to `EmitterRef<A>` to get back to
/// the emitter. Holds the emitter weakly.
pub struct EmitterRef<A>(Weak<Shared<A>>);

impl<A> EmitterRef<A> {
    pub fn upgrade(&self) -> Option<Emitter<A>> {
        self.0.upgrade().map(|shared| Emitter { shared })
    }
}

// ============================================================================
// Emitter
// ============================================================================

/// An object listeners register to, keyed by event type.
///
/// Cloning yields another handle to the same emitter.
pub struct Emitter<A> {
    shared: Arc<Shared<A>>,
}

impl<A: 'static> Emitter<A> {
    /// Create an emitter whose default scope is the emitter itself.
    pub fn new() -> Self {
        Self::from_options(EmitterOptions::default())
    }

    /// Create an emitter whose listeners default to `scope`.
    pub fn with_scope(scope: Scope) -> Self {
        Self::from_options(EmitterOptions::new().with_default_scope(scope))
    }

    pub fn from_options(options: EmitterOptions) -> Self {
        let shared = Arc::new_cyclic(|this: &Weak<Shared<A>>| Shared {
            default_scope: options
                .default_scope
                .unwrap_or_else(|| Scope::new(EmitterRef(this.clone()))),
            bundles: Arc::new(Mutex::new(HashMap::new())),
            null_bond: OnceLock::new(),
            this: this.clone(),
        });
        Self { shared }
    }

    /// Register `listener` for `event_type`, called with the default scope.
    ///
    /// Registering a listener that is already registered for this type in
    /// the same scope returns the existing bond and adds nothing. A `None`
    /// listener returns this emitter's shared [`NullBond`].
    pub fn add(&self, event_type: &str, listener: impl Into<Option<Listener<A>>>) -> Bond<A> {
        self.shared.register(event_type, listener.into(), None)
    }

    /// Register `listener` for `event_type`, called with `scope`.
    ///
    /// The same listener in different scopes yields independent bonds.
    pub fn add_with_scope(
        &self,
        event_type: &str,
        listener: impl Into<Option<Listener<A>>>,
        scope: Scope,
    ) -> Bond<A> {
        self.shared.register(event_type, listener.into(), Some(scope))
    }

    /// Notify every listener of `event_type`, in registration order.
    pub fn emit(&self, event_type: &str, args: &A) -> EmitChain<'_, A> {
        self.shared.dispatch(event_type, args);
        EmitChain { emitter: self }
    }

    /// Like [`Emitter::emit`], but a panicking listener is reported instead
    /// of unwinding into the caller. Listeners after it still do not run.
    pub fn try_emit(&self, event_type: &str, args: &A) -> Result<EmitChain<'_, A>, EmitError> {
        panic::catch_unwind(AssertUnwindSafe(|| self.shared.dispatch(event_type, args))).map_err(
            |payload| {
                let message = panic_message(payload.as_ref());
                tracing::warn!(%event_type, %message, "listener panicked during emit");
                EmitError::ListenerPanicked {
                    event_type: event_type.to_owned(),
                    message,
                }
            },
        )?;
        Ok(EmitChain { emitter: self })
    }

    /// Remove the registration of `listener` made in the default scope.
    pub fn remove(&self, event_type: &str, listener: &Listener<A>) -> RemoveChain<'_, Self> {
        self.shared.unregister(event_type, listener, None);
        RemoveChain { target: self }
    }

    /// Remove the registration of `listener` made in `scope`.
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

impl<A> Emitter<A> {
    /// Scope used for registrations that do not name one.
    pub fn default_scope(&self) -> &Scope {
        &self.shared.default_scope
    }

    pub fn listener_count(&self, event_type: &str) -> usize {
        self.shared
            .bundle(event_type)
            .map_or(0, |bundle| bundle.lock().len())
    }

    pub fn has_listeners(&self, event_type: &str) -> bool {
        self.listener_count(event_type) > 0
    }

    /// Event types with at least one listener, sorted.
    pub fn event_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self
            .shared
            .bundles
            .lock()
            .iter()
            .filter(|(_, bundle)| !bundle.lock().is_empty())
            .map(|(event_type, _)| event_type.clone())
            .collect();
        types.sort();
        types
    }

    /// Whether both handles refer to the same emitter.
    pub fn ptr_eq(&self, other: &Emitter<A>) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }
}

impl<A: 'static> Default for Emitter<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A> Clone for Emitter<A> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<A> fmt::Debug for Emitter<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Emitter")
            .field("event_types", &self.event_types())
            .finish()
    }
}

// ============================================================================
// Chain handles
// ============================================================================

/// Returned by `emit`; only offers `emit`, so emissions can be chained:
/// `emitter.emit("a", &x).emit("b", &y)`.
pub struct EmitChain<'a, A> {
    emitter: &'a Emitter<A>,
}

impl<'a, A: 'static> EmitChain<'a, A> {
    pub fn emit(self, event_type: &str, args: &A) -> EmitChain<'a, A> {
        self.emitter.emit(event_type, args)
    }
}

/// Returned by `remove`; only offers `remove`, so removals can be chained.
pub struct RemoveChain<'a, E> {
    pub(crate) target: &'a E,
}

impl<'a, A: 'static> RemoveChain<'a, Emitter<A>> {
    pub fn remove(self, event_type: &str, listener: &Listener<A>) -> RemoveChain<'a, Emitter<A>> {
        self.target.remove(event_type, listener)
    }

    pub fn remove_with_scope(
        self,
        event_type: &str,
        listener: &Listener<A>,
        scope: &Scope,
    ) -> RemoveChain<'a, Emitter<A>> {
        self.target.remove_with_scope(event_type, listener, scope)
    }
}
