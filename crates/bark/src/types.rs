//! Listener and scope handles, plus emitter construction options.
//!
//! Both handles compare by identity rather than by value: a registration is
//! keyed on *which* closure and *which* scope object were supplied, the same
//! way a native event target keys on function identity. Clone a handle to
//! refer to the same listener or scope again.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Address of the shared allocation behind an `Arc`, with any vtable dropped.
fn data_addr<T: ?Sized>(arc: &Arc<T>) -> *const () {
    Arc::as_ptr(arc).cast::<()>()
}

// ============================================================================
// Scope
// ============================================================================

/// The invocation context a listener is called with.
///
/// Two scopes are the same scope only when they share one allocation, so
/// `Scope::new(1)` and another `Scope::new(1)` are distinct.
#[derive(Clone)]
pub struct Scope(Arc<dyn Any + Send + Sync>);

impl Scope {
    /// Wrap `value` in a fresh scope with its own identity.
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self(Arc::new(value))
    }

    /// Create a scope that shares identity with an existing `Arc`.
    ///
    /// Two scopes built from clones of the same `Arc` are the same scope.
    pub fn from_arc<T: Any + Send + Sync>(value: Arc<T>) -> Self {
        Self(value)
    }

    /// Borrow the scope's value if it is a `T`.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }

    /// Identity comparison.
    pub fn ptr_eq(&self, other: &Scope) -> bool {
        data_addr(&self.0) == data_addr(&other.0)
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Scope({:p})", data_addr(&self.0))
    }
}

// ============================================================================
// Listener
// ============================================================================

/// Closure type behind a [`Listener`].
pub type ListenerFn<A> = dyn Fn(&Scope, &A) + Send + Sync;

/// A callable registered against an event type.
///
/// Called with the scope it was bound to and a shared reference to the
/// emitted payload. Identity is the identity of the wrapped closure: clones
/// are the same listener, two `Listener::new` calls never are.
pub struct Listener<A>(Arc<ListenerFn<A>>);

impl<A> Listener<A> {
    pub fn new(callback: impl Fn(&Scope, &A) + Send + Sync + 'static) -> Self {
        Self(Arc::new(callback))
    }

    /// Invoke the listener directly.
    pub fn call(&self, scope: &Scope, args: &A) {
        (self.0)(scope, args)
    }

    /// Identity comparison.
    pub fn ptr_eq(&self, other: &Listener<A>) -> bool {
        data_addr(&self.0) == data_addr(&other.0)
    }
}

impl<A: 'static> Listener<A> {
    /// A new listener, with its own identity, that ignores the scope it is
    /// called with and always forwards `scope` instead.
    pub fn bind(&self, scope: Scope) -> Listener<A> {
        let inner = self.clone();
        Listener::new(move |_, args| inner.call(&scope, args))
    }
}

impl<A> Clone for Listener<A> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<A> fmt::Debug for Listener<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Listener({:p})", data_addr(&self.0))
    }
}

// ============================================================================
// EmitterOptions
// ============================================================================

/// Options for [`Emitter::from_options`](crate::Emitter::from_options).
#[derive(Debug, Clone, Default)]
pub struct EmitterOptions {
    /// Scope for registrations that do not name one. `None` means the
    /// emitter itself (see [`Emitter::default_scope`](crate::Emitter::default_scope)).
    pub default_scope: Option<Scope>,
}

impl EmitterOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default_scope(mut self, scope: Scope) -> Self {
        self.default_scope = Some(scope);
        self
    }
}

// ============================================================================
// Tests
// ============================================================================
