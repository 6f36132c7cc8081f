//! Error taxonomy and the sticky last-error record.
//!
//! Every public operation returns `Result<_, SplatError>`.  On failure the
//! error's message is also stored in a thread-local slot so callers that
//! only see a success/failure signal (bindings, C shims) can fetch the
//! description afterwards with [`last_error`].

use std::cell::RefCell;
use std::fmt::Display;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SplatError {
    #[error("{op}: invalid parameter: {reason}")]
    BadParameter { op: &'static str, reason: String },
    #[error("{op}: handles belong to different canvases")]
    CrossCanvas { op: &'static str },
    #[error("{op}: {kind} not found")]
    NotFound { op: &'static str, kind: &'static str },
    #[error("driver failure in {site}: {message}")]
    DriverFailure { site: &'static str, message: String },
    #[error("no active canvas")]
    NoActiveCanvas,
    #[error("pixel surface is not true color (24 or 32-bit), got {bytes_per_pixel} bytes per pixel")]
    UnsupportedFormat { bytes_per_pixel: u8 },
}

impl SplatError {
    pub fn bad_parameter(op: &'static str, reason: impl Into<String>) -> Self {
        SplatError::BadParameter {
            op,
            reason: reason.into(),
        }
    }

    pub fn not_found(op: &'static str, kind: &'static str) -> Self {
        SplatError::NotFound { op, kind }
    }
}

thread_local! {
    static LAST_ERROR: RefCell<Option<String>> = const { RefCell::new(None) };
}

/// Record `err` as the last error and hand it back, ready for `Err(...)`.
pub fn raise(err: SplatError) -> SplatError {
    record(&err);
    err
}

/// Record any displayable failure as the last error.
pub fn record(err: &impl Display) {
    let message = err.to_string();
    log::debug!("splat error: {message}");
    LAST_ERROR.with(|slot| *slot.borrow_mut() = Some(message));
}

/// The message of the most recent failure on this thread, if any.
pub fn last_error() -> Option<String> {
    LAST_ERROR.with(|slot| slot.borrow().clone())
}

pub fn clear_last_error() {
    LAST_ERROR.with(|slot| *slot.borrow_mut() = None);
}

// ===================================================================
// Tests
// ===================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raise_records_message() {
        clear_last_error();
        let err = raise(SplatError::NoActiveCanvas);
        assert_eq!(err, SplatError::NoActiveCanvas);
        assert_eq!(last_error().as_deref(), Some("no active canvas"));
    }

    #[test]
    fn test_last_error_is_sticky_until_cleared() {
        clear_last_error();
        raise(SplatError::not_found("destroy_layer", "layer"));
        assert_eq!(
            last_error().as_deref(),
            Some("destroy_layer: layer not found")
        );
        // Reading does not consume.
        assert!(last_error().is_some());
        clear_last_error();
        assert!(last_error().is_none());
    }

    #[test]
    fn test_driver_failure_message_names_site() {
        let err = SplatError::DriverFailure {
            site: "present pass",
            message: "lost device".into(),
        };
        assert_eq!(err.to_string(), "driver failure in present pass: lost device");
    }
}
