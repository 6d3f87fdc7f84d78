use std::any::Any;

use thiserror::Error;

// ---------------------------------------------------------------------------
// EmitError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum EmitError {
    /// A listener panicked; listeners after it in the same emission did not run.
    #[error("Listener for \"{event_type}\" panicked: {message}")]
    ListenerPanicked { event_type: String, message: String },
}

// ---------------------------------------------------------------------------
// BondError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum BondError {
    #[error("Cannot register \"{event_type}\": the emitter owning this bond was dropped")]
    EmitterDropped { event_type: String },
}

/// Best-effort text of a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
