//! External event sources.
//!
//! [`ExternalEmitter`] puts the emitter/bond API in front of an event source
//! that dispatches on its own and only understands
//! `subscribe`/`unsubscribe` by listener identity (see [`EventSource`]).

mod emitter;
mod source;

pub use emitter::{ExternalBond, ExternalEmitter};
pub use source::EventSource;
