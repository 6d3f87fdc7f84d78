//! CompositeBond — two bonds handled as one.

use std::fmt;
use std::sync::Arc;

use super::Bond;

struct Pair<A> {
    first: Bond<A>,
    second: Bond<A>,
}

/// Fans every operation out to `first`, then `second`.
///
/// Returned by chained `add` calls. Chains nest to the right: adding to a
/// composite replaces `second` with `second.add(..)`, so one `destroy` on the
/// outermost bond reaches every registration in the chain.
pub struct CompositeBond<A> {
    pair: Arc<Pair<A>>,
}

impl<A> CompositeBond<A> {
    pub(crate) fn new(first: Bond<A>, second: Bond<A>) -> Self {
        Self {
            pair: Arc::new(Pair { first, second }),
        }
    }

    pub fn first(&self) -> &Bond<A> {
        &self.pair.first
    }

    pub fn second(&self) -> &Bond<A> {
        &self.pair.second
    }

    pub(crate) fn ptr_eq(&self, other: &CompositeBond<A>) -> bool {
        Arc::ptr_eq(&self.pair, &other.pair)
    }
}

impl<A> Clone for CompositeBond<A> {
    fn clone(&self) -> Self {
        Self {
            pair: Arc::clone(&self.pair),
        }
    }
}

impl<A> fmt::Debug for CompositeBond<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CompositeBond(firstBond={:?}, secondBond={:?})",
            self.pair.first, self.pair.second
        )
    }
}
