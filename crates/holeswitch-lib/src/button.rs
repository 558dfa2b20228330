//! Press debouncing for the toggle button.
//!
//! Mechanical contacts bounce for a few milliseconds after each press, which
//! the interrupt layer reports as a burst of edges. [`PressDebouncer`] accepts
//! the first edge and suppresses everything else until the window has elapsed
//! since that accepted edge.

use std::time::{Duration, Instant};

/// Callback invoked once per accepted press.
pub type PressHandler = Box<dyn FnMut() + Send + 'static>;

/// Debounce state for a single button.
///
/// Idle → edge → fired (window armed) → window expires → Idle.
/// Suppressed edges do not extend the window.
#[derive(Debug, Clone)]
pub struct PressDebouncer {
    window: Duration,
    last_accepted: Option<Instant>,
}

impl PressDebouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_accepted: None,
        }
    }

    /// Feed an edge observed at `now`. Returns `true` if it counts as a press.
    pub fn accept(&mut self, now: Instant) -> bool {
        if self.is_armed(now) {
            return false;
        }
        self.last_accepted = Some(now);
        true
    }

    /// Whether an edge at `now` would be suppressed.
    pub fn is_armed(&self, now: Instant) -> bool {
        match self.last_accepted {
            Some(last) => now.saturating_duration_since(last) < self.window,
            None => false,
        }
    }
}

/// Wrap `on_press` so that it only runs for edges the debouncer accepts.
///
/// The returned closure takes the edge timestamp; hardware backends pass
/// `Instant::now()` from the interrupt thread.
pub fn debounced(window: Duration, mut on_press: PressHandler) -> impl FnMut(Instant) + Send {
    let mut debouncer = PressDebouncer::new(window);
    move |now| {
        if debouncer.accept(now) {
            on_press();
        } else {
            log::trace!("button edge suppressed (bounce)");
        }
    }
}
