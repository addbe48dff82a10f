//! Common error types.

use std::error::Error;
use std::sync::Arc;
use thiserror::Error;

/// Shared pointer to an arbitrary error.
pub type ErrorPtr = Arc<dyn Error + Send + Sync>;

/// Owned pointer to an arbitrary error, as returned by actions.
pub type BoxError = Box<dyn Error + Send + Sync>;

pub(crate) fn convert_error<E: Error + Send + Sync + 'static>(error: E) -> ErrorPtr {
    Arc::new(error) as ErrorPtr
}

/// Error representing a panic caught while running controller code.
#[derive(Error, Clone, Eq, PartialEq, Debug)]
#[error("Controller panicked: {message}")]
pub struct ControllerPanic {
    pub message: String,
}

impl ControllerPanic {
    pub(crate) fn from_payload(payload: Box<dyn std::any::Any + Send>) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .map(|message| message.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic payload".to_string());

        Self { message }
    }
}

#[cfg(test)]
mod tests {
    use crate::error::ControllerPanic;

    #[test]
    fn should_extract_panic_messages() {
        assert_eq!(
            ControllerPanic::from_payload(Box::new("static")).message,
            "static"
        );
        assert_eq!(
            ControllerPanic::from_payload(Box::new("owned".to_string())).message,
            "owned"
        );
        assert_eq!(
            ControllerPanic::from_payload(Box::new(5)).message,
            "unknown panic payload"
        );
    }
}
