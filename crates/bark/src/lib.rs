pub mod bond;
pub mod emitter;
pub mod error;
#[cfg(feature = "external")]
pub mod external;
pub mod types;

pub use bond::{Bond, CompositeBond, ListenerBond, NullBond};
pub use emitter::{EmitChain, Emitter, EmitterRef, RemoveChain};
pub use error::{BondError, EmitError};
#[cfg(feature = "external")]
pub use external::{EventSource, ExternalBond, ExternalEmitter};
pub use types::{EmitterOptions, Listener, ListenerFn, Scope};
