//! ListenerBond — one listener registered in one emitter bundle.
//!
//! The bundle owns the bond core (`Arc`); the core only points back at the
//! bundle weakly so that `destroy` can splice itself out. Tear-down takes the
//! registration out of the core, which is what makes every later `destroy`
//! a no-op.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::types::{Listener, Scope};

use super::Owner;

/// A listener pre-bound to its resolved scope. This is what emission calls.
pub(crate) type Callable<A> = Arc<dyn Fn(&A) + Send + Sync>;

/// The ordered bonds for one event type.
pub(crate) type Bundle<A> = Mutex<Vec<Arc<BondCore<A>>>>;

/// Every bundle of one emitter, keyed by event type.
pub(crate) type Bundles<A> = Mutex<HashMap<String, Arc<Bundle<A>>>>;

/// Drop `bundle` from the map if it is still the entry for `event_type` and
/// has no bonds left. Takes the map lock before the bundle lock, the same
/// order registration uses, so a concurrent `add` either lands in the bundle
/// first (nothing is pruned) or creates a fresh one afterwards.
pub(crate) fn prune_if_empty<A>(bundles: &Bundles<A>, event_type: &str, bundle: &Arc<Bundle<A>>) {
    let mut map = bundles.lock();
    let empty = map
        .get(event_type)
        .is_some_and(|current| Arc::ptr_eq(current, bundle) && current.lock().is_empty());
    if empty {
        map.remove(event_type);
        tracing::trace!(%event_type, "empty bundle dropped");
    }
}

fn bind<A: 'static>(listener: &Listener<A>, scope: &Scope) -> Callable<A> {
    let listener = listener.clone();
    let scope = scope.clone();
    Arc::new(move |args: &A| listener.call(&scope, args))
}

// ============================================================================
// BondCore
// ============================================================================

struct Registration<A> {
    listener: Listener<A>,
    scope: Scope,
    call: Callable<A>,
    /// `call` already destroys the bond after running once.
    destroy_on_use: bool,
}

pub(crate) struct BondCore<A> {
    event_type: String,
    /// `None` once torn down.
    registration: Mutex<Option<Registration<A>>>,
    bundle: Weak<Bundle<A>>,
    bundles: Weak<Bundles<A>>,
    owner: Owner<A>,
    /// Set by the destroy-on-use wrapper on its one run.
    used: AtomicBool,
}

/// Destroys its bond when dropped, so a used destroy-on-use bond is gone
/// whether its listener returned or unwound.
struct DestroyOnDrop<A>(Arc<BondCore<A>>);

impl<A> Drop for DestroyOnDrop<A> {
    fn drop(&mut self) {
        self.0.destroy();
    }
}

/// A bond captured by an emission snapshot, together with the callable it
/// had at snapshot time.
pub(crate) struct Pending<A> {
    core: Arc<BondCore<A>>,
    call: Callable<A>,
}

impl<A> Pending<A> {
    /// Run the bond's current callable, or the snapshot one if the bond was
    /// torn down after the snapshot was taken. A bond that destroy-on-use
    /// already fired (say, in a nested emission) is skipped.
    pub(crate) fn invoke(self, args: &A) {
        match self.core.callable() {
            Some(call) => call(args),
            None if self.core.used.load(Ordering::Acquire) => {}
            None => (self.call)(args),
        }
    }
}

impl<A: 'static> BondCore<A> {
    pub(crate) fn new(
        event_type: &str,
        listener: Listener<A>,
        scope: Scope,
        bundle: Weak<Bundle<A>>,
        bundles: Weak<Bundles<A>>,
        owner: Owner<A>,
    ) -> Arc<Self> {
        let call = bind(&listener, &scope);
        Arc::new(Self {
            event_type: event_type.to_owned(),
            registration: Mutex::new(Some(Registration {
                listener,
                scope,
                call,
                destroy_on_use: false,
            })),
            bundle,
            bundles,
            owner,
            used: AtomicBool::new(false),
        })
    }

    /// Arrange for the bond to destroy itself right after its next call.
    ///
    /// The wrapper runs at most once, even when an outer emission's snapshot
    /// still holds it after a nested emission used it up.
    pub(crate) fn destroy_on_use(self: &Arc<Self>) {
        let mut guard = self.registration.lock();
        let Some(reg) = guard.as_mut() else {
            return;
        };
        if reg.destroy_on_use {
            return;
        }
        let original = Arc::clone(&reg.call);
        let bond = Arc::downgrade(self);
        reg.call = Arc::new(move |args: &A| {
            let Some(core) = bond.upgrade() else {
                return;
            };
            if core.used.swap(true, Ordering::AcqRel) {
                return;
            }
            let _destroy = DestroyOnDrop(core);
            original(args);
        });
        reg.destroy_on_use = true;
    }
}

impl<A> BondCore<A> {
    /// Whether this live bond was registered for exactly `listener` in `scope`.
    pub(crate) fn matches(&self, listener: &Listener<A>, scope: &Scope) -> bool {
        self.registration
            .lock()
            .as_ref()
            .is_some_and(|reg| reg.listener.ptr_eq(listener) && reg.scope.ptr_eq(scope))
    }

    pub(crate) fn callable(&self) -> Option<Callable<A>> {
        self.registration
            .lock()
            .as_ref()
            .map(|reg| Arc::clone(&reg.call))
    }

    pub(crate) fn pending(self: &Arc<Self>) -> Option<Pending<A>> {
        self.callable().map(|call| Pending {
            core: Arc::clone(self),
            call,
        })
    }

    pub(crate) fn is_live(&self) -> bool {
        self.registration.lock().is_some()
    }

    pub(crate) fn owner(&self) -> &Owner<A> {
        &self.owner
    }

    /// Drop the registration. Returns `false` if it was already gone.
    pub(crate) fn tear_down(&self) -> bool {
        // Dropped after the guard: the listener's captures may re-enter.
        let registration = self.registration.lock().take();
        registration.is_some()
    }

    /// Tear down and remove this bond from its bundle.
    pub(crate) fn destroy(&self) {
        if !self.tear_down() {
            return;
        }
        if let Some(bundle) = self.bundle.upgrade() {
            let emptied = {
                let mut bonds = bundle.lock();
                if let Some(index) = bonds
                    .iter()
                    .rposition(|bond| std::ptr::eq(Arc::as_ptr(bond), self))
                {
                    bonds.remove(index);
                }
                bonds.is_empty()
            };
            if emptied {
                if let Some(bundles) = self.bundles.upgrade() {
                    prune_if_empty(&bundles, &self.event_type, &bundle);
                }
            }
        }
        tracing::trace!(event_type = %self.event_type, "bond destroyed");
    }
}

// ============================================================================
// ListenerBond
// ============================================================================

/// The bond for a listener registered on an [`Emitter`](crate::Emitter).
pub struct ListenerBond<A> {
    pub(crate) core: Arc<BondCore<A>>,
}

impl<A> ListenerBond<A> {
    pub(crate) fn from_core(core: Arc<BondCore<A>>) -> Self {
        Self { core }
    }

    pub fn is_destroyed(&self) -> bool {
        !self.core.is_live()
    }
}

impl<A> Clone for ListenerBond<A> {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
        }
    }
}

impl<A> fmt::Debug for ListenerBond<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Bond(destroyed={})", self.is_destroyed())
    }
}
