//! NullBond — what registering a null listener returns.

use std::fmt;
use std::sync::Arc;

use super::Owner;

struct NullCore<A> {
    owner: Owner<A>,
}

/// A bond with nothing to destroy. Each emitter hands out a single shared
/// one; chaining `add` on it registers directly on that emitter.
pub struct NullBond<A> {
    core: Arc<NullCore<A>>,
}

impl<A> NullBond<A> {
    pub(crate) fn new(owner: Owner<A>) -> Self {
        Self {
            core: Arc::new(NullCore { owner }),
        }
    }

    pub(crate) fn owner(&self) -> &Owner<A> {
        &self.core.owner
    }

    pub(crate) fn ptr_eq(&self, other: &NullBond<A>) -> bool {
        Arc::ptr_eq(&self.core, &other.core)
    }
}

impl<A> Clone for NullBond<A> {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
        }
    }
}

impl<A> fmt::Debug for NullBond<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("NullBond")
    }
}
