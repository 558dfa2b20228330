//! holeswitch — push-button and status LED control for Pi-hole blocking.

pub mod button;
pub mod config;
pub mod error;
pub mod event_loop;
pub mod gpio;
pub mod reconcile;
pub mod service;

pub use error::HoleswitchError;
