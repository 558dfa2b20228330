//! Unified error type for the holeswitch-lib crate.
//!
//! [`HoleswitchError`] wraps module-specific errors (`ServiceError`, `GpioError`),
//! configuration problems and signal handler setup. `From` impls allow `?` to
//! propagate across module boundaries.

use std::fmt;

use crate::gpio::GpioError;
use crate::service::{ServiceError, ServiceState};

/// Unified error type for holeswitch-lib operations.
#[derive(Debug)]
pub enum HoleswitchError {
    /// Pi-hole command error (spawn, exit status, timeout, output).
    Service(ServiceError),
    /// GPIO setup error.
    Gpio(GpioError),
    /// The shutdown signal handler could not be installed.
    Signal(String),
    /// Configuration validation error.
    Config(String),
    /// A command ran but the service did not reach the requested state.
    StateMismatch {
        requested: ServiceState,
        observed: ServiceState,
    },
}

impl fmt::Display for HoleswitchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HoleswitchError::Service(e) => write!(f, "{e}"),
            HoleswitchError::Gpio(e) => write!(f, "{e}"),
            HoleswitchError::Signal(e) => write!(f, "Signal handler error: {e}"),
            HoleswitchError::Config(e) => write!(f, "Config error: {e}"),
            HoleswitchError::StateMismatch {
                requested,
                observed,
            } => write!(
                f,
                "Pi-hole blocking is still {observed} after requesting {requested}"
            ),
        }
    }
}

impl std::error::Error for HoleswitchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            HoleswitchError::Service(e) => Some(e),
            HoleswitchError::Gpio(e) => Some(e),
            HoleswitchError::Config(_)
            | HoleswitchError::Signal(_)
            | HoleswitchError::StateMismatch { .. } => None,
        }
    }
}

impl From<ServiceError> for HoleswitchError {
    fn from(e: ServiceError) -> Self {
        HoleswitchError::Service(e)
    }
}

impl From<GpioError> for HoleswitchError {
    fn from(e: GpioError) -> Self {
        HoleswitchError::Gpio(e)
    }
}

/// Crate-level Result alias using [`HoleswitchError`].
pub type Result<T> = std::result::Result<T, HoleswitchError>;
