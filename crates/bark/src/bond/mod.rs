//! Bonds — cancellable handles to listener registrations.
//!
//! # Variants
//!
//! - [`ListenerBond`]: a listener living in an [`Emitter`](crate::Emitter) bundle.
//! - [`NullBond`]: returned for a null listener; every operation is a no-op.
//! - [`CompositeBond`]: two bonds destroyed (or armed) as one, built by chaining `add`.
//! - `ExternalBond`: a subscription on an external event source (feature `external`).
//!
//! Every variant supports the same three operations: `add`, `destroy` and
//! `destroy_on_use`. All of them are idempotent and none of them fail.
//!
//! Dropping a `Bond` handle does **not** unregister anything: the emitter
//! owns the registration, the bond is only the means to cancel it.

mod composite;
pub(crate) mod listener;
mod null;

use std::fmt;
use std::sync::{Arc, Weak};

use crate::error::BondError;
#[cfg(feature = "external")]
use crate::external::ExternalBond;
use crate::types::{Listener, Scope};

pub use composite::CompositeBond;
pub use listener::ListenerBond;
pub use null::NullBond;

/// Registration entry point shared by both emitter kinds; bonds hold it
/// weakly to forward chained `add` calls.
pub(crate) trait Registrar<A>: Send + Sync {
    fn register(
        &self,
        event_type: &str,
        listener: Option<Listener<A>>,
        scope: Option<Scope>,
    ) -> Bond<A>;
}

pub(crate) type Owner<A> = Weak<dyn Registrar<A>>;

fn register<A>(
    owner: &Owner<A>,
    event_type: &str,
    listener: Option<Listener<A>>,
    scope: Option<Scope>,
) -> Result<Bond<A>, BondError> {
    let owner = owner.upgrade().ok_or_else(|| BondError::EmitterDropped {
        event_type: event_type.to_owned(),
    })?;
    Ok(owner.register(event_type, listener, scope))
}

// ============================================================================
// Bond
// ============================================================================

/// A handle to one or more listener registrations.
pub enum Bond<A> {
    Listener(ListenerBond<A>),
    Null(NullBond<A>),
    Composite(CompositeBond<A>),
    #[cfg(feature = "external")]
    External(ExternalBond<A>),
}

impl<A: 'static> Bond<A> {
    /// Unregister. The listener will not be notified of later emissions.
    /// Bonds cannot be revived; calling this again does nothing.
    pub fn destroy(&self) {
        match self {
            Bond::Listener(bond) => bond.core.destroy(),
            Bond::Null(_) => {}
            Bond::Composite(pair) => {
                pair.first().destroy();
                pair.second().destroy();
            }
            #[cfg(feature = "external")]
            Bond::External(bond) => bond.destroy(),
        }
    }

    /// Destroy the bond right after the listener's next notification.
    ///
    /// Whether an emission is already in progress does not matter: the first
    /// use after this call is the last one. Returns this same bond.
    pub fn destroy_on_use(&self) -> Bond<A> {
        match self {
            Bond::Listener(bond) => bond.core.destroy_on_use(),
            Bond::Null(_) => {}
            Bond::Composite(pair) => {
                pair.first().destroy_on_use();
                pair.second().destroy_on_use();
            }
            #[cfg(feature = "external")]
            Bond::External(bond) => bond.destroy_on_use(),
        }
        self.clone()
    }

    /// Register `listener` on the emitter this bond belongs to and return a
    /// bond covering both this bond and the new registration.
    ///
    /// If the emitter is gone there is nothing to register on and this bond
    /// is returned unchanged; see [`Bond::try_add`].
    pub fn add(&self, event_type: &str, listener: impl Into<Option<Listener<A>>>) -> Bond<A> {
        self.add_or_self(event_type, listener.into(), None)
    }

    /// Like [`Bond::add`], calling the listener with `scope`.
    pub fn add_with_scope(
        &self,
        event_type: &str,
        listener: impl Into<Option<Listener<A>>>,
        scope: Scope,
    ) -> Bond<A> {
        self.add_or_self(event_type, listener.into(), Some(scope))
    }

    /// Like [`Bond::add`], but reports a dropped emitter.
    pub fn try_add(
        &self,
        event_type: &str,
        listener: impl Into<Option<Listener<A>>>,
    ) -> Result<Bond<A>, BondError> {
        self.chain(event_type, listener.into(), None)
    }

    /// Like [`Bond::add_with_scope`], but reports a dropped emitter.
    pub fn try_add_with_scope(
        &self,
        event_type: &str,
        listener: impl Into<Option<Listener<A>>>,
        scope: Scope,
    ) -> Result<Bond<A>, BondError> {
        self.chain(event_type, listener.into(), Some(scope))
    }

    fn add_or_self(
        &self,
        event_type: &str,
        listener: Option<Listener<A>>,
        scope: Option<Scope>,
    ) -> Bond<A> {
        self.chain(event_type, listener, scope).unwrap_or_else(|err| {
            tracing::debug!(%event_type, error = %err, "chained add ignored");
            self.clone()
        })
    }

    fn chain(
        &self,
        event_type: &str,
        listener: Option<Listener<A>>,
        scope: Option<Scope>,
    ) -> Result<Bond<A>, BondError> {
        let added = match self {
            Bond::Null(bond) => return register(bond.owner(), event_type, listener, scope),
            Bond::Composite(pair) => {
                let second = pair.second().chain(event_type, listener, scope)?;
                return Ok(Bond::Composite(CompositeBond::new(
                    pair.first().clone(),
                    second,
                )));
            }
            Bond::Listener(bond) => register(bond.core.owner(), event_type, listener, scope)?,
            #[cfg(feature = "external")]
            Bond::External(bond) => register(bond.owner(), event_type, listener, scope)?,
        };
        Ok(Bond::Composite(CompositeBond::new(self.clone(), added)))
    }
}

impl<A> Bond<A> {
    /// Whether no registration behind this handle is live any more.
    /// Always true for a null bond.
    pub fn is_destroyed(&self) -> bool {
        match self {
            Bond::Listener(bond) => bond.is_destroyed(),
            Bond::Null(_) => true,
            Bond::Composite(pair) => pair.first().is_destroyed() && pair.second().is_destroyed(),
            #[cfg(feature = "external")]
            Bond::External(bond) => bond.is_destroyed(),
        }
    }

    /// Whether both handles refer to the same bond.
    pub fn ptr_eq(&self, other: &Bond<A>) -> bool {
        match (self, other) {
            (Bond::Listener(a), Bond::Listener(b)) => Arc::ptr_eq(&a.core, &b.core),
            (Bond::Null(a), Bond::Null(b)) => a.ptr_eq(b),
            (Bond::Composite(a), Bond::Composite(b)) => a.ptr_eq(b),
            #[cfg(feature = "external")]
            (Bond::External(a), Bond::External(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl<A> Clone for Bond<A> {
    fn clone(&self) -> Self {
        match self {
            Bond::Listener(bond) => Bond::Listener(bond.clone()),
            Bond::Null(bond) => Bond::Null(bond.clone()),
            Bond::Composite(pair) => Bond::Composite(pair.clone()),
            #[cfg(feature = "external")]
            Bond::External(bond) => Bond::External(bond.clone()),
        }
    }
}

impl<A> fmt::Debug for Bond<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bond::Listener(bond) => fmt::Debug::fmt(bond, f),
            Bond::Null(bond) => fmt::Debug::fmt(bond, f),
            Bond::Composite(pair) => fmt::Debug::fmt(pair, f),
            #[cfg(feature = "external")]
            Bond::External(bond) => fmt::Debug::fmt(bond, f),
        }
    }
}
