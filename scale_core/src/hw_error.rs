//! Maps `Box<dyn Error>` from the transport trait boundary to typed `ScaleError`.
//!
//! The traits in `scale_traits` use `Box<dyn Error + Send + Sync>` so any backend
//! can plug in; this module converts those to our typed error enum, with an
//! optional feature-gated path for `scale_hardware::HwError` downcasting.

use crate::error::ScaleError;

/// Map a trait-boundary error to a typed `ScaleError`.
///
/// Attempts to downcast known hardware error types first, then falls back
/// to a generic transport error carrying the message.
pub fn map_hw_error(e: &(dyn std::error::Error + 'static)) -> ScaleError {
    #[cfg(feature = "hardware-errors")]
    {
        use scale_hardware::error::HwError;
        if let Some(hw) = e.downcast_ref::<HwError>() {
            return match hw {
                HwError::PortUnavailable { port, detail } => ScaleError::TransportUnavailable {
                    port: port.clone(),
                    detail: detail.clone(),
                },
                other => ScaleError::Transport(other.to_string()),
            };
        }
    }

    if let Some(se) = e.downcast_ref::<ScaleError>() {
        return se.clone();
    }
    ScaleError::Transport(e.to_string())
}

/// Any failure while opening `port` makes the port unavailable for this attempt.
pub fn map_open_error(port: &str, e: &(dyn std::error::Error + 'static)) -> ScaleError {
    match map_hw_error(e) {
        unavailable @ ScaleError::TransportUnavailable { .. } => unavailable,
        ScaleError::Transport(detail) => ScaleError::TransportUnavailable {
            port: port.to_string(),
            detail,
        },
        other => ScaleError::TransportUnavailable {
            port: port.to_string(),
            detail: other.to_string(),
        },
    }
}
